use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The headline performance metrics for a set of journal trades.
///
/// This struct is the output of `AnalysisService::core_kpis` and is what the
/// session keeps as its KPI result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    // I. Core Profitability Metrics
    pub total_net_profit: Decimal,
    pub gross_profit: Decimal,
    pub gross_loss: Decimal,
    pub profit_factor: Option<Decimal>, // Option<> because it can be infinite if GrossLoss is 0
    pub total_return_pct: Decimal,
    pub avg_trade_pnl: Decimal,

    // II. Risk and Drawdown
    pub max_drawdown: Decimal,
    pub max_drawdown_pct: Decimal,
    pub sharpe_ratio: Option<Decimal>, // Option<> for cases with no stdev
    pub sortino_ratio: Option<Decimal>, // Option<> when there are no losing periods
    pub calmar_ratio: Option<Decimal>, // Option<> for cases with no drawdown

    // III. Trade-Level Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub win_rate_pct: Option<Decimal>,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub payoff_ratio: Option<Decimal>, // Option<> because avg_loss can be 0
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    // IV. Benchmark Comparison
    pub benchmark_ticker: Option<String>,
    pub benchmark_return_pct: Option<Decimal>,
    /// Strategy return minus benchmark return, in percentage points.
    pub excess_return_pct: Option<Decimal>,

    // V. Inputs the report was computed with
    pub risk_free_rate: Decimal,
    pub initial_capital: Decimal,
}

impl KpiReport {
    /// Creates a new, zeroed-out report.
    pub fn new(risk_free_rate: Decimal, initial_capital: Decimal) -> Self {
        Self {
            total_net_profit: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            gross_loss: Decimal::ZERO,
            profit_factor: None,
            total_return_pct: Decimal::ZERO,
            avg_trade_pnl: Decimal::ZERO,
            max_drawdown: Decimal::ZERO,
            max_drawdown_pct: Decimal::ZERO,
            sharpe_ratio: None,
            sortino_ratio: None,
            calmar_ratio: None,
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            breakeven_trades: 0,
            win_rate_pct: None,
            average_win: Decimal::ZERO,
            average_loss: Decimal::ZERO,
            payoff_ratio: None,
            largest_win: Decimal::ZERO,
            largest_loss: Decimal::ZERO,
            max_consecutive_wins: 0,
            max_consecutive_losses: 0,
            benchmark_ticker: None,
            benchmark_return_pct: None,
            excess_return_pct: None,
            risk_free_rate,
            initial_capital,
        }
    }
}

/// KPIs that support bootstrapped confidence intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiMetric {
    AvgTradePnl,
    WinRate,
    SharpeRatio,
    ProfitFactor,
}

impl KpiMetric {
    pub fn key(&self) -> &'static str {
        match self {
            KpiMetric::AvgTradePnl => "avg_trade_pnl",
            KpiMetric::WinRate => "win_rate",
            KpiMetric::SharpeRatio => "sharpe_ratio",
            KpiMetric::ProfitFactor => "profit_factor",
        }
    }
}

impl fmt::Display for KpiMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for KpiMetric {
    type Err = crate::AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avg_trade_pnl" => Ok(KpiMetric::AvgTradePnl),
            "win_rate" => Ok(KpiMetric::WinRate),
            "sharpe_ratio" => Ok(KpiMetric::SharpeRatio),
            "profit_factor" => Ok(KpiMetric::ProfitFactor),
            other => Err(crate::AnalyticsError::InvalidInput(format!("unknown KPI metric '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: Decimal,
    pub upper: Decimal,
}

pub type ConfidenceIntervals = BTreeMap<KpiMetric, ConfidenceInterval>;

/// One peak-to-recovery excursion of the equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownPeriod {
    pub peak_date: NaiveDateTime,
    pub peak_value: Decimal,
    pub trough_date: NaiveDateTime,
    pub trough_value: Decimal,
    /// `None` while the curve has not regained the peak.
    pub recovery_date: Option<NaiveDateTime>,
    pub depth: Decimal,
    /// Only defined for positive peaks.
    pub depth_pct: Option<Decimal>,
    /// Peak to recovery, or peak to the last observation when unrecovered.
    pub duration_days: i64,
    /// Trough to recovery.
    pub recovery_days: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    pub max_drawdown_details: Option<DrawdownPeriod>,
    pub periods: Vec<DrawdownPeriod>,
    /// Distance of the last observation below the running peak.
    pub current_drawdown: Decimal,
    pub longest_duration_days: i64,
}
