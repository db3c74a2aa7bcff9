#![allow(dead_code)]

use analytics::{
    AnalysisService, AnalyticsEngine, AnalyticsError, ConfidenceIntervals, DrawdownAnalysis,
    EngineSettings, KpiMetric, KpiReport,
};
use async_trait::async_trait;
use auth::AuthenticatedUser;
use chrono::{Days, NaiveDate, NaiveDateTime};
use configuration::AnalysisSettings;
use core_types::{ColumnMapping, ConceptualColumn, ReturnSeries, TradeTable, UploadedFile};
use ingest::{CsvDataService, DataService, IngestError, TradeFilters};
use market_data::{BenchmarkSource, error::MarketDataError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use session::{Pipeline, RunInput, SessionState};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Call counter shared between a fake service and the test.
#[derive(Debug, Default)]
pub struct Counter(AtomicUsize);

impl Counter {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// The CSV data service with per-call counters.
#[derive(Default)]
pub struct CountingData {
    inner: CsvDataService,
    pub headers: Counter,
    pub processed: Counter,
    pub filtered: Counter,
}

impl DataService for CountingData {
    fn read_headers(&self, bytes: &[u8]) -> Result<Vec<String>, IngestError> {
        self.headers.hit();
        self.inner.read_headers(bytes)
    }

    fn processed_trading_data(
        &self,
        bytes: &[u8],
        mapping: &ColumnMapping,
        file_name: &str,
    ) -> Result<TradeTable, IngestError> {
        self.processed.hit();
        self.inner.processed_trading_data(bytes, mapping, file_name)
    }

    fn filter_data(&self, table: &TradeTable, filters: &TradeFilters) -> Result<TradeTable, IngestError> {
        self.filtered.hit();
        self.inner.filter_data(table, filters)
    }
}

/// The analytics engine with per-call counters.
pub struct CountingAnalysis {
    inner: AnalyticsEngine,
    pub kpis: Counter,
    pub cis: Counter,
    pub drawdowns: Counter,
}

impl Default for CountingAnalysis {
    fn default() -> Self {
        Self {
            inner: AnalyticsEngine::new(EngineSettings {
                periods_per_year: 252,
                bootstrap_iterations: 200,
                confidence_level: dec!(0.95),
                bootstrap_seed: Some(7),
            }),
            kpis: Counter::default(),
            cis: Counter::default(),
            drawdowns: Counter::default(),
        }
    }
}

impl AnalysisService for CountingAnalysis {
    fn core_kpis(
        &self,
        table: &TradeTable,
        risk_free_rate: Decimal,
        benchmark: Option<&ReturnSeries>,
        initial_capital: Decimal,
    ) -> Result<KpiReport, AnalyticsError> {
        self.kpis.hit();
        self.inner.core_kpis(table, risk_free_rate, benchmark, initial_capital)
    }

    fn bootstrapped_kpi_cis(
        &self,
        table: &TradeTable,
        metrics: &[KpiMetric],
    ) -> Result<ConfidenceIntervals, AnalyticsError> {
        self.cis.hit();
        self.inner.bootstrapped_kpi_cis(table, metrics)
    }

    fn advanced_drawdown(
        &self,
        equity: &[(NaiveDateTime, Decimal)],
    ) -> Result<DrawdownAnalysis, AnalyticsError> {
        self.drawdowns.hit();
        self.inner.advanced_drawdown(equity)
    }
}

/// A benchmark that returns a flat 0.1% per day for every known ticker.
#[derive(Default)]
pub struct FakeBenchmark {
    pub calls: Counter,
    pub fail: bool,
}

#[async_trait]
impl BenchmarkSource for FakeBenchmark {
    async fn daily_returns(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<ReturnSeries>, MarketDataError> {
        self.calls.hit();
        if self.fail {
            return Err(MarketDataError::InvalidData("offline".to_string()));
        }
        if ticker == "UNKNOWN" {
            return Ok(None);
        }
        let mut points = BTreeMap::new();
        let mut day = start;
        while day <= end {
            points.insert(day, dec!(0.001));
            day = day.checked_add_days(Days::new(1)).expect("date in range");
        }
        Ok(Some(ReturnSeries::new(ticker, points)))
    }
}

pub struct Harness {
    pub data: Arc<CountingData>,
    pub analysis: Arc<CountingAnalysis>,
    pub benchmark: Arc<FakeBenchmark>,
    pub pipeline: Pipeline,
    pub state: SessionState,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_benchmark(FakeBenchmark::default())
    }

    pub fn with_benchmark(benchmark: FakeBenchmark) -> Self {
        let data = Arc::new(CountingData::default());
        let analysis = Arc::new(CountingAnalysis::default());
        let benchmark = Arc::new(benchmark);
        let settings = AnalysisSettings::default();
        let pipeline = Pipeline::new(data.clone(), analysis.clone(), benchmark.clone(), settings.clone());

        let mut state = SessionState::from_settings(&settings);
        state.sign_in(AuthenticatedUser {
            username: "tester".to_string(),
            email: None,
            full_name: None,
            disabled: false,
        });

        Self {
            data,
            analysis,
            benchmark,
            pipeline,
            state,
        }
    }
}

/// A `TradeDate`/`Profit` journal with `rows` trades on consecutive days.
pub fn journal(rows: usize) -> UploadedFile {
    let mut csv = String::from("TradeDate,Profit,Symbol\n");
    let pnl = [120, -40, 75, -60, 30, 15, -25, 90, -10, 45, 5, -35];
    for i in 0..rows {
        let symbol = if i % 2 == 0 { "AAPL" } else { "MSFT" };
        csv.push_str(&format!("2024-02-{:02},{},{}\n", i + 1, pnl[i % pnl.len()], symbol));
    }
    UploadedFile::new("journal.csv", "text/csv", csv.into_bytes())
}

pub fn trade_mapping() -> ColumnMapping {
    ColumnMapping::new()
        .with(ConceptualColumn::Date, "TradeDate")
        .with(ConceptualColumn::Pnl, "Profit")
        .with(ConceptualColumn::Symbol, "Symbol")
}

/// The first evaluation of a new upload, with the mapping submitted.
pub fn first_run(upload: UploadedFile) -> RunInput {
    RunInput {
        upload: Some(upload),
        mapping_submission: Some(trade_mapping()),
        ..RunInput::default()
    }
}
