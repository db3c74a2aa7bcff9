use crate::engine::AnalyticsEngine;
use crate::error::AnalyticsError;
use crate::report::{ConfidenceIntervals, DrawdownAnalysis, KpiMetric, KpiReport};
use chrono::NaiveDateTime;
use core_types::{ReturnSeries, TradeTable};
use rust_decimal::Decimal;

/// The analysis contract consumed by the session pipeline.
///
/// Implementations are expected to be pure functions of their inputs; the
/// pipeline relies on that to skip recomputation when inputs are unchanged.
pub trait AnalysisService {
    fn core_kpis(
        &self,
        table: &TradeTable,
        risk_free_rate: Decimal,
        benchmark: Option<&ReturnSeries>,
        initial_capital: Decimal,
    ) -> Result<KpiReport, AnalyticsError>;

    fn bootstrapped_kpi_cis(
        &self,
        table: &TradeTable,
        metrics: &[KpiMetric],
    ) -> Result<ConfidenceIntervals, AnalyticsError>;

    fn advanced_drawdown(
        &self,
        equity: &[(NaiveDateTime, Decimal)],
    ) -> Result<DrawdownAnalysis, AnalyticsError>;
}

impl AnalysisService for AnalyticsEngine {
    fn core_kpis(
        &self,
        table: &TradeTable,
        risk_free_rate: Decimal,
        benchmark: Option<&ReturnSeries>,
        initial_capital: Decimal,
    ) -> Result<KpiReport, AnalyticsError> {
        self.calculate(table, risk_free_rate, benchmark, initial_capital)
    }

    fn bootstrapped_kpi_cis(
        &self,
        table: &TradeTable,
        metrics: &[KpiMetric],
    ) -> Result<ConfidenceIntervals, AnalyticsError> {
        self.bootstrap_intervals(&table.pnl_values(), metrics)
    }

    fn advanced_drawdown(
        &self,
        equity: &[(NaiveDateTime, Decimal)],
    ) -> Result<DrawdownAnalysis, AnalyticsError> {
        self.drawdown_analysis(equity)
    }
}
