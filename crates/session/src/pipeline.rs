use crate::graph::Node;
use crate::state::{SessionState, UserMessage};
use analytics::{AnalysisService, KpiMetric};
use configuration::AnalysisSettings;
use core_types::{ColumnMapping, ConceptualColumn, UploadedFile};
use ingest::{DataService, TradeFilters, suggest_mapping};
use market_data::{BenchmarkSource, is_disabled_ticker};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Metrics that get bootstrapped confidence intervals.
const CI_METRICS: [KpiMetric; 3] = [KpiMetric::AvgTradePnl, KpiMetric::WinRate, KpiMetric::SharpeRatio];

/// The units of work the pipeline can execute in one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    ReadHeaders,
    ConfirmMapping,
    Process,
    Filter,
    FetchBenchmark,
    Kpis,
    ConfidenceIntervals,
    Drawdown,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ReadHeaders => "read_headers",
            Stage::ConfirmMapping => "confirm_mapping",
            Stage::Process => "process",
            Stage::Filter => "filter",
            Stage::FetchBenchmark => "fetch_benchmark",
            Stage::Kpis => "kpis",
            Stage::ConfidenceIntervals => "confidence_intervals",
            Stage::Drawdown => "drawdown",
        };
        f.write_str(name)
    }
}

/// What the user did since the last evaluation. `None` fields keep the
/// session's current value.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    /// The file currently in the uploader. `None` means the uploader is empty.
    pub upload: Option<UploadedFile>,
    pub mapping_submission: Option<ColumnMapping>,
    pub filters: Option<TradeFilters>,
    pub risk_free_rate: Option<Decimal>,
    pub benchmark_ticker: Option<String>,
    pub initial_capital: Option<Decimal>,
}

impl RunInput {
    pub fn with_upload(upload: UploadedFile) -> Self {
        Self {
            upload: Some(upload),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RunOutcome {
    /// Nothing runs until the session is authenticated.
    LoginRequired,
    /// No file has been uploaded.
    Welcome,
    /// Headers are known; the user has to confirm which column is which.
    AwaitingMapping {
        headers: Vec<String>,
        suggested: ColumnMapping,
    },
    /// A stage stopped the evaluation. The messages say why.
    Halted,
    /// Every stage is up to date.
    Ready,
}

/// The result of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub messages: Vec<UserMessage>,
    pub stages_run: Vec<Stage>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            outcome: RunOutcome::Ready,
            messages: Vec::new(),
            stages_run: Vec::new(),
        }
    }

    fn finish(mut self, outcome: RunOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    fn push(&mut self, message: UserMessage) {
        self.messages.push(message);
    }

    fn ran(&mut self, stage: Stage, started: Instant) {
        tracing::debug!(%stage, elapsed_ms = started.elapsed().as_millis() as u64, "Stage finished.");
        self.stages_run.push(stage);
    }

    pub fn ran_stage(&self, stage: Stage) -> bool {
        self.stages_run.contains(&stage)
    }
}

/// Sequences upload, mapping, processing, filtering, benchmark fetch and
/// analysis over a `SessionState`, re-running only stale stages.
pub struct Pipeline {
    // --- Services ---
    data: Arc<dyn DataService + Send + Sync>,
    analysis: Arc<dyn AnalysisService + Send + Sync>,
    benchmarks: Arc<dyn BenchmarkSource>,

    // --- Configuration ---
    settings: AnalysisSettings,
    synonyms: BTreeMap<ConceptualColumn, Vec<String>>,
}

impl Pipeline {
    pub fn new(
        data: Arc<dyn DataService + Send + Sync>,
        analysis: Arc<dyn AnalysisService + Send + Sync>,
        benchmarks: Arc<dyn BenchmarkSource>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            data,
            analysis,
            benchmarks,
            settings,
            synonyms: ingest::default_synonyms(),
        }
    }

    /// Replaces the header synonyms used to suggest a mapping.
    pub fn with_synonyms(mut self, synonyms: BTreeMap<ConceptualColumn, Vec<String>>) -> Self {
        self.synonyms = synonyms;
        self
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    /// Brings `state` up to date with `input`.
    pub async fn evaluate(&self, state: &mut SessionState, input: RunInput) -> RunReport {
        let mut report = RunReport::new();

        if !state.auth.is_authenticated() {
            return report.finish(RunOutcome::LoginRequired);
        }

        self.apply_parameters(state, &input);

        let Some(upload) = input.upload else {
            if state.file.is_some() && state.processed.is_some() {
                tracing::info!("File uploader is now empty. Resetting all data-dependent session state.");
                state.reset_data();
            }
            return report.finish(RunOutcome::Welcome);
        };

        if let Some(outcome) = self.prepare_upload(state, &upload, input.mapping_submission, &mut report) {
            return report.finish(outcome);
        }
        if let Some(outcome) = self.process(state, &mut report) {
            return report.finish(outcome);
        }
        if let Some(outcome) = self.filter(state, &mut report) {
            return report.finish(outcome);
        }
        self.fetch_benchmark(state, &mut report).await;
        let outcome = self.analyse(state, &mut report);
        report.finish(outcome)
    }

    fn apply_parameters(&self, state: &mut SessionState, input: &RunInput) {
        if let Some(rate) = input.risk_free_rate {
            if state.set_risk_free_rate(rate) {
                tracing::info!(%rate, "Risk-free rate updated.");
            }
        }
        if let Some(ticker) = &input.benchmark_ticker {
            if state.set_benchmark_ticker(ticker) {
                tracing::info!(ticker = %ticker, display = %self.settings.benchmark_display_name(ticker), "Benchmark ticker updated.");
            }
        }
        if let Some(capital) = input.initial_capital {
            if state.set_initial_capital(capital) {
                tracing::info!(%capital, "Initial capital updated.");
            }
        }
        if let Some(filters) = &input.filters {
            if state.set_filters(filters.clone()) {
                tracing::info!("Filters updated.");
            }
        }
    }

    /// Header and mapping stages. Returns an outcome when the evaluation
    /// cannot continue past them.
    fn prepare_upload(
        &self,
        state: &mut SessionState,
        upload: &UploadedFile,
        submission: Option<ColumnMapping>,
        report: &mut RunReport,
    ) -> Option<RunOutcome> {
        if state.set_upload(upload) {
            tracing::info!(file = %upload.name, size = upload.bytes.len(), "New file for mapping. Resetting dependent state.");
        }

        if state.graph().is_stale(Node::Headers) {
            let Some(bytes) = state.file_bytes.as_deref() else {
                tracing::warn!(file = %upload.name, "Uploaded file was already rejected as unreadable.");
                report.push(UserMessage::error(
                    "Error reading the uploaded file. Please ensure it's a valid CSV and try again.",
                ));
                return Some(RunOutcome::Halted);
            };
            let started = Instant::now();
            let result = self.data.read_headers(bytes);
            report.ran(Stage::ReadHeaders, started);
            match result {
                Ok(headers) => {
                    state.suggested_mapping = Some(suggest_mapping(&headers, &self.synonyms));
                    state.headers = Some(headers);
                    state.mark_computed(Node::Headers);
                }
                Err(e) => {
                    tracing::error!(file = %upload.name, error = %e, "Could not read CSV headers.");
                    report.push(UserMessage::error(format!(
                        "Error reading from '{}': {e}. Please ensure it's a valid CSV file.",
                        upload.name
                    )));
                    state.headers = None;
                    state.suggested_mapping = None;
                    state.file_bytes = None;
                    return Some(RunOutcome::Halted);
                }
            }
        }

        if state.mapping_confirmed {
            return None;
        }

        let headers = state.headers.clone().unwrap_or_default();
        if let Some(mapping) = submission {
            let started = Instant::now();
            let validated = mapping.validate(&headers);
            report.ran(Stage::ConfirmMapping, started);
            match validated {
                Ok(()) => {
                    tracing::info!(columns = mapping.len(), "Column mapping confirmed.");
                    state.confirm_mapping(mapping);
                    return None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected column mapping.");
                    report.push(UserMessage::error(format!("Invalid column mapping: {e}")));
                }
            }
        }

        Some(RunOutcome::AwaitingMapping {
            suggested: state.suggested_mapping.clone().unwrap_or_default(),
            headers,
        })
    }

    fn process(&self, state: &mut SessionState, report: &mut RunReport) -> Option<RunOutcome> {
        if !state.graph().is_stale(Node::ProcessedData) && state.processed.is_some() {
            return None;
        }
        let name = state.file_name().unwrap_or_default().to_string();
        let (Some(bytes), Some(mapping)) = (state.file_bytes.as_deref(), state.mapping.as_ref()) else {
            tracing::warn!(file = %name, "Processing requested without file bytes or mapping.");
            return Some(RunOutcome::Halted);
        };

        let started = Instant::now();
        let result = self.data.processed_trading_data(bytes, mapping, &name);
        report.ran(Stage::Process, started);

        match result {
            Ok(table) => {
                if table.is_empty() {
                    report.push(UserMessage::warning(format!(
                        "Processing of '{name}' resulted in an empty dataset. Please check your CSV file content and column mapping."
                    )));
                } else {
                    report.push(UserMessage::success(format!(
                        "Successfully processed '{name}'. You can now explore the analysis."
                    )));
                }
                state.processed = Some(table);
                state.mark_computed(Node::ProcessedData);
                None
            }
            Err(e) => {
                tracing::error!(file = %name, error = %e, "Processing failed. Forcing re-mapping.");
                report.push(UserMessage::error(format!(
                    "Failed to process '{name}': {e}. Please check your column mapping. Ensure critical columns are correctly mapped and data types are appropriate."
                )));
                state.clear_node(Node::Mapping);
                state.invalidate(Node::Mapping);
                Some(RunOutcome::AwaitingMapping {
                    headers: state.headers.clone().unwrap_or_default(),
                    suggested: state.suggested_mapping.clone().unwrap_or_default(),
                })
            }
        }
    }

    fn filter(&self, state: &mut SessionState, report: &mut RunReport) -> Option<RunOutcome> {
        let processed_empty = state.processed.as_ref().is_none_or(|t| t.is_empty());
        if processed_empty {
            return Some(RunOutcome::Halted);
        }

        if state.graph().is_stale(Node::FilteredData) || state.filtered.is_none() {
            let processed = state.processed.as_ref()?;
            let started = Instant::now();
            let result = self.data.filter_data(processed, &state.filters);
            report.ran(Stage::Filter, started);

            match result {
                Ok(filtered) => {
                    tracing::info!(rows = filtered.len(), "Data filtered.");
                    state.filtered = Some(filtered);
                    state.mark_computed(Node::FilteredData);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Filtering failed.");
                    report.push(UserMessage::error(format!("Could not apply the filters: {e}")));
                    state.invalidate(Node::FilteredData);
                    state.discard(Node::FilteredData);
                    return Some(RunOutcome::Halted);
                }
            }
        }

        if state.filtered.as_ref().is_none_or(|t| t.is_empty()) {
            report.push(UserMessage::info(
                "No data matches the current filter criteria. Adjust filters or upload a new file.",
            ));
            for node in [Node::Kpis, Node::ConfidenceIntervals, Node::Drawdown] {
                state.discard(node);
            }
            return Some(RunOutcome::Halted);
        }
        None
    }

    async fn fetch_benchmark(&self, state: &mut SessionState, report: &mut RunReport) {
        if !state.graph().is_stale(Node::Benchmark) {
            return;
        }
        let ticker = state.benchmark_ticker.clone();

        if is_disabled_ticker(&ticker) {
            state.benchmark = None;
            state.mark_computed(Node::Benchmark);
            return;
        }

        let range = state.filtered.as_ref().and_then(|t| t.date_range());
        let fetched = match range {
            Some((start, end)) => {
                let started = Instant::now();
                let result = self.benchmarks.daily_returns(&ticker, start, end).await;
                report.ran(Stage::FetchBenchmark, started);
                match result {
                    Ok(series) => series.filter(|s| !s.is_empty()),
                    Err(e) => {
                        tracing::error!(ticker = %ticker, error = %e, "Benchmark fetch failed.");
                        None
                    }
                }
            }
            None => {
                tracing::warn!(ticker = %ticker, "Cannot fetch benchmark due to invalid/missing date range in filtered data.");
                None
            }
        };

        if fetched.is_none() && range.is_some() {
            report.push(UserMessage::warning(format!(
                "Could not fetch benchmark data for {ticker} or no data returned for the period. Ensure ticker is valid and data exists for the date range."
            )));
        }

        state.benchmark = fetched;
        state.mark_computed(Node::Benchmark);
    }

    fn analyse(&self, state: &mut SessionState, report: &mut RunReport) -> RunOutcome {
        let Some(filtered) = state.filtered.clone() else {
            return RunOutcome::Halted;
        };

        if state.graph().is_stale(Node::Kpis) || state.kpis.is_none() {
            tracing::info!("Recalculating KPIs due to state change.");
            let started = Instant::now();
            let result = self.analysis.core_kpis(
                &filtered,
                state.risk_free_rate,
                state.benchmark.as_ref(),
                state.initial_capital,
            );
            report.ran(Stage::Kpis, started);

            match result {
                Ok(kpis) => {
                    state.kpis = Some(kpis);
                    state.mark_computed(Node::Kpis);
                }
                Err(e) => {
                    tracing::error!(error = %e, "KPI calculation failed.");
                    report.push(UserMessage::error(format!(
                        "KPI calculation error: {e}. Please check data and mappings."
                    )));
                    for node in [Node::Kpis, Node::ConfidenceIntervals, Node::Drawdown] {
                        state.discard(node);
                    }
                    return RunOutcome::Halted;
                }
            }
        }

        if state.graph().is_stale(Node::Drawdown) {
            let equity = filtered.equity_series();
            state.drawdown = if equity.len() >= self.settings.min_drawdown_points {
                let started = Instant::now();
                let result = self.analysis.advanced_drawdown(&equity);
                report.ran(Stage::Drawdown, started);
                result
                    .inspect_err(|e| tracing::warn!(error = %e, "Advanced drawdown analysis error."))
                    .ok()
            } else {
                tracing::info!(points = equity.len(), "Skipping advanced drawdown: not enough equity points.");
                None
            };
            state.mark_computed(Node::Drawdown);
        }

        if state.graph().is_stale(Node::ConfidenceIntervals) {
            state.confidence_intervals = if filtered.len() >= self.settings.min_ci_points {
                let started = Instant::now();
                let result = self.analysis.bootstrapped_kpi_cis(&filtered, &CI_METRICS);
                report.ran(Stage::ConfidenceIntervals, started);
                result
                    .inspect_err(|e| tracing::warn!(error = %e, "Confidence interval calculation error."))
                    .unwrap_or_default()
            } else {
                tracing::info!(points = filtered.len(), "Skipping KPI confidence intervals: not enough PnL points.");
                Default::default()
            };
            state.mark_computed(Node::ConfidenceIntervals);
        }

        RunOutcome::Ready
    }
}
