use crate::error::AnalyticsError;
use crate::report::KpiReport;
use crate::stats;
use core_types::{ReturnSeries, TradeTable};
use rust_decimal::Decimal;

/// Tunables for the calculations that need more than the trade table.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Used to annualise per-trade Sharpe and Sortino ratios.
    pub periods_per_year: u32,
    pub bootstrap_iterations: usize,
    pub confidence_level: Decimal,
    /// Fixes the resampling sequence. `None` seeds from OS entropy.
    pub bootstrap_seed: Option<u64>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            periods_per_year: 252,
            bootstrap_iterations: 1000,
            confidence_level: Decimal::new(95, 2),
            bootstrap_seed: None,
        }
    }
}

/// A stateless calculator for deriving performance metrics from a trade journal.
#[derive(Debug, Default, Clone)]
pub struct AnalyticsEngine {
    pub(crate) settings: EngineSettings,
}

impl AnalyticsEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Calculates the headline KPIs for `table`.
    ///
    /// # Arguments
    ///
    /// * `table` - The filtered trade table, ordered by date.
    /// * `risk_free_rate` - Annual rate as a fraction, spread evenly over `periods_per_year`.
    /// * `benchmark` - Optional daily benchmark returns for the comparison section.
    /// * `initial_capital` - The account size the PnL figures are measured against.
    pub fn calculate(
        &self,
        table: &TradeTable,
        risk_free_rate: Decimal,
        benchmark: Option<&ReturnSeries>,
        initial_capital: Decimal,
    ) -> Result<KpiReport, AnalyticsError> {
        if table.is_empty() {
            return Err(AnalyticsError::NotEnoughData(
                "the trade table has no rows".to_string(),
            ));
        }
        if initial_capital <= Decimal::ZERO {
            return Err(AnalyticsError::InvalidInput(format!(
                "initial capital must be positive, got {initial_capital}"
            )));
        }

        let mut report = KpiReport::new(risk_free_rate, initial_capital);
        let pnl = table.pnl_values();

        self.calculate_profitability(&pnl, initial_capital, &mut report)?;
        self.calculate_streaks(&pnl, &mut report);
        self.calculate_drawdown(table, initial_capital, &mut report)?;
        self.calculate_ratios(&pnl, initial_capital, risk_free_rate, &mut report);
        self.calculate_benchmark(benchmark, &mut report);

        Ok(report)
    }

    /// Calculates all profitability-related metrics.
    fn calculate_profitability(
        &self,
        pnl: &[Decimal],
        initial_capital: Decimal,
        report: &mut KpiReport,
    ) -> Result<(), AnalyticsError> {
        report.total_trades = pnl.len();

        for &value in pnl {
            report.total_net_profit = checked(report.total_net_profit.checked_add(value), "total net profit")?;

            if value > Decimal::ZERO {
                report.gross_profit = checked(report.gross_profit.checked_add(value), "gross profit")?;
                report.winning_trades += 1;
                report.largest_win = report.largest_win.max(value);
            } else if value < Decimal::ZERO {
                report.gross_loss = checked(report.gross_loss.checked_add(value.abs()), "gross loss")?;
                report.losing_trades += 1;
                report.largest_loss = report.largest_loss.min(value);
            } else {
                report.breakeven_trades += 1;
            }
        }

        // --- Ratios ---
        if report.gross_loss > Decimal::ZERO {
            report.profit_factor = report.gross_profit.checked_div(report.gross_loss);
        }

        report.avg_trade_pnl = report.total_net_profit / Decimal::from(report.total_trades);
        report.win_rate_pct = Some(
            (Decimal::from(report.winning_trades) / Decimal::from(report.total_trades))
                * Decimal::ONE_HUNDRED,
        );

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / Decimal::from(report.winning_trades);
        }

        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / Decimal::from(report.losing_trades);
            report.payoff_ratio = report.average_win.checked_div(report.average_loss);
        }

        report.total_return_pct = checked(
            report
                .total_net_profit
                .checked_div(initial_capital)
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED)),
            "total return",
        )?;
        Ok(())
    }

    /// Longest runs of consecutive wins and losses. Breakeven trades end both runs.
    fn calculate_streaks(&self, pnl: &[Decimal], report: &mut KpiReport) {
        let (mut wins, mut losses) = (0usize, 0usize);
        for &value in pnl {
            if value > Decimal::ZERO {
                wins += 1;
                losses = 0;
            } else if value < Decimal::ZERO {
                losses += 1;
                wins = 0;
            } else {
                wins = 0;
                losses = 0;
            }
            report.max_consecutive_wins = report.max_consecutive_wins.max(wins);
            report.max_consecutive_losses = report.max_consecutive_losses.max(losses);
        }
    }

    /// Calculates maximum drawdown of the account equity (capital plus cumulative PnL).
    fn calculate_drawdown(
        &self,
        table: &TradeTable,
        initial_capital: Decimal,
        report: &mut KpiReport,
    ) -> Result<(), AnalyticsError> {
        let mut peak_equity = initial_capital;
        let mut max_drawdown = Decimal::ZERO;
        let mut max_drawdown_pct = Decimal::ZERO;

        for (_date, cumulative) in table.equity_series() {
            let equity = checked(initial_capital.checked_add(cumulative), "account equity")?;
            if equity > peak_equity {
                peak_equity = equity;
            }
            let drawdown = checked(peak_equity.checked_sub(equity), "drawdown")?;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
            if peak_equity > Decimal::ZERO {
                let pct = drawdown
                    .checked_div(peak_equity)
                    .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED));
                max_drawdown_pct = max_drawdown_pct.max(checked(pct, "drawdown percentage")?);
            }
        }

        report.max_drawdown = max_drawdown;
        report.max_drawdown_pct = max_drawdown_pct;
        Ok(())
    }

    /// Calculates Sharpe, Sortino and Calmar ratios from per-trade returns on equity.
    fn calculate_ratios(
        &self,
        pnl: &[Decimal],
        initial_capital: Decimal,
        risk_free_rate: Decimal,
        report: &mut KpiReport,
    ) {
        if report.max_drawdown_pct > Decimal::ZERO {
            report.calmar_ratio = report.total_return_pct.checked_div(report.max_drawdown_pct);
        }

        // Each trade's return relative to the equity it was taken with.
        let mut equity = initial_capital;
        let mut returns = Vec::with_capacity(pnl.len());
        for &value in pnl {
            if equity <= Decimal::ZERO {
                tracing::debug!("Equity depleted; ratio metrics are undefined.");
                return;
            }
            let (Some(ret), Some(next)) = (value.checked_div(equity), equity.checked_add(value)) else {
                tracing::debug!("Per-trade returns out of range; ratio metrics are undefined.");
                return;
            };
            returns.push(ret);
            equity = next;
        }

        let periods = self.settings.periods_per_year.max(1);
        let per_period_rate = risk_free_rate / Decimal::from(periods);

        if let Some(sd) = stats::std_dev(&returns) {
            report.sharpe_ratio = stats::annualised_ratio(&returns, per_period_rate, sd, periods);
        }
        if let Some(dd) = stats::downside_deviation(&returns, per_period_rate) {
            report.sortino_ratio = stats::annualised_ratio(&returns, per_period_rate, dd, periods);
        }
    }

    fn calculate_benchmark(&self, benchmark: Option<&ReturnSeries>, report: &mut KpiReport) {
        let Some(series) = benchmark.filter(|s| !s.is_empty()) else {
            return;
        };
        report.benchmark_ticker = Some(series.ticker.clone());
        report.benchmark_return_pct = series.total_return().checked_mul(Decimal::ONE_HUNDRED);
        report.excess_return_pct = report
            .benchmark_return_pct
            .and_then(|pct| report.total_return_pct.checked_sub(pct));
    }
}

/// Turns a failed checked operation into an error naming the quantity.
fn checked(value: Option<Decimal>, quantity: &str) -> Result<Decimal, AnalyticsError> {
    value.ok_or_else(|| AnalyticsError::InvalidInput(format!("{quantity} is outside the representable range")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_types::{ConceptualColumn, TradeRecord};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn table(pnls: &[Decimal]) -> TradeTable {
        let rows = pnls
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64);
                TradeRecord::new(date.and_hms_opt(16, 0, 0).unwrap(), *p)
            })
            .collect();
        TradeTable::from_records(rows, vec![ConceptualColumn::Date, ConceptualColumn::Pnl]).unwrap()
    }

    #[test]
    fn profitability_metrics() {
        let engine = AnalyticsEngine::default();
        let report = engine
            .calculate(&table(&[dec!(100), dec!(-50), dec!(200), dec!(0), dec!(-50)]), dec!(0), None, dec!(1000))
            .unwrap();

        assert_eq!(report.total_trades, 5);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.losing_trades, 2);
        assert_eq!(report.breakeven_trades, 1);
        assert_eq!(report.total_net_profit, dec!(200));
        assert_eq!(report.gross_profit, dec!(300));
        assert_eq!(report.gross_loss, dec!(100));
        assert_eq!(report.profit_factor, Some(dec!(3)));
        assert_eq!(report.win_rate_pct, Some(dec!(40)));
        assert_eq!(report.avg_trade_pnl, dec!(40));
        assert_eq!(report.payoff_ratio, Some(dec!(3)));
        assert_eq!(report.total_return_pct, dec!(20));
        assert_eq!(report.largest_win, dec!(200));
        assert_eq!(report.largest_loss, dec!(-50));
    }

    #[test]
    fn drawdown_is_measured_on_account_equity() {
        let engine = AnalyticsEngine::default();
        // equity: 1100, 900, 1000 -> peak 1100, trough 900
        let report = engine
            .calculate(&table(&[dec!(100), dec!(-200), dec!(100)]), dec!(0), None, dec!(1000))
            .unwrap();

        assert_eq!(report.max_drawdown, dec!(200));
        assert_eq!(report.max_drawdown_pct.round_dp(4), dec!(18.1818));
        assert!(report.calmar_ratio.is_some());
        assert_eq!(report.max_consecutive_losses, 1);
    }

    #[test]
    fn constant_returns_have_no_sharpe() {
        let engine = AnalyticsEngine::default();
        let report = engine.calculate(&table(&[dec!(0), dec!(0), dec!(0)]), dec!(0), None, dec!(1000)).unwrap();
        assert!(report.sharpe_ratio.is_none());
    }

    #[test]
    fn higher_risk_free_rate_lowers_sharpe() {
        let engine = AnalyticsEngine::default();
        let trades = table(&[dec!(10), dec!(-5), dec!(12), dec!(-3), dec!(8)]);
        let low = engine.calculate(&trades, dec!(0), None, dec!(1000)).unwrap();
        let high = engine.calculate(&trades, dec!(0.5), None, dec!(1000)).unwrap();
        assert!(high.sharpe_ratio.unwrap() < low.sharpe_ratio.unwrap());
    }

    #[test]
    fn benchmark_comparison_is_filled_when_series_present() {
        let engine = AnalyticsEngine::default();
        let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let series = ReturnSeries::new("SPY", BTreeMap::from([(day(2), dec!(0.1)), (day(3), dec!(0))]));

        let report = engine
            .calculate(&table(&[dec!(200)]), dec!(0), Some(&series), dec!(1000))
            .unwrap();

        assert_eq!(report.benchmark_ticker.as_deref(), Some("SPY"));
        assert_eq!(report.benchmark_return_pct, Some(dec!(10)));
        assert_eq!(report.excess_return_pct, Some(dec!(10)));
    }

    #[test]
    fn gross_totals_out_of_range_are_errors() {
        let engine = AnalyticsEngine::default();
        // The running total stays small but the gross profit does not.
        let big = Decimal::from_i128_with_scale(5 * 10_i128.pow(28), 0);
        let swings = table(&[big, -big, big, -big]);
        assert!(matches!(
            engine.calculate(&swings, dec!(0), None, dec!(1000)),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }

    #[test]
    fn empty_table_and_bad_capital_are_errors() {
        let engine = AnalyticsEngine::default();
        assert!(matches!(
            engine.calculate(&TradeTable::default(), dec!(0), None, dec!(1000)),
            Err(AnalyticsError::NotEnoughData(_))
        ));
        assert!(matches!(
            engine.calculate(&table(&[dec!(1)]), dec!(0), None, dec!(0)),
            Err(AnalyticsError::InvalidInput(_))
        ));
    }
}
