use crate::graph::{DependencyGraph, Node};
use analytics::{ConfidenceIntervals, DrawdownAnalysis, KpiReport};
use configuration::AnalysisSettings;
use core_types::{ColumnMapping, FileIdentity, ReturnSeries, TradeTable, UploadedFile};
use ingest::TradeFilters;
use rust_decimal::Decimal;
use serde::Serialize;

/// Severity of a message shown to the user after an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub level: MessageLevel,
    pub text: String,
}

impl UserMessage {
    pub fn new(level: MessageLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageLevel::Error, text)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated { username: String },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            AuthState::Authenticated { username } => Some(username),
            AuthState::Unauthenticated => None,
        }
    }
}

/// Analysis parameters a fresh session starts with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub risk_free_rate: Decimal,
    pub initial_capital: Decimal,
    pub benchmark_ticker: String,
}

impl From<&AnalysisSettings> for SessionDefaults {
    fn from(settings: &AnalysisSettings) -> Self {
        Self {
            risk_free_rate: settings.risk_free_rate,
            initial_capital: settings.initial_capital,
            benchmark_ticker: settings.default_benchmark.clone(),
        }
    }
}

/// Everything one user's session keeps between evaluations.
///
/// Inputs are changed through the setters, which bump the node's version and
/// clear every dependent result. Derived slots are written by the pipeline.
#[derive(Debug, Clone)]
pub struct SessionState {
    defaults: SessionDefaults,
    graph: DependencyGraph,

    // --- Upload & mapping ---
    pub(crate) file: Option<FileIdentity>,
    pub(crate) file_bytes: Option<Vec<u8>>,
    pub(crate) headers: Option<Vec<String>>,
    pub(crate) suggested_mapping: Option<ColumnMapping>,
    pub(crate) mapping: Option<ColumnMapping>,
    pub(crate) mapping_confirmed: bool,

    // --- Sidebar inputs ---
    pub(crate) filters: TradeFilters,
    pub(crate) risk_free_rate: Decimal,
    pub(crate) initial_capital: Decimal,
    pub(crate) benchmark_ticker: String,

    // --- Derived results ---
    pub(crate) processed: Option<TradeTable>,
    pub(crate) filtered: Option<TradeTable>,
    pub(crate) benchmark: Option<ReturnSeries>,
    pub(crate) kpis: Option<KpiReport>,
    pub(crate) confidence_intervals: ConfidenceIntervals,
    pub(crate) drawdown: Option<DrawdownAnalysis>,

    // --- Authentication ---
    pub(crate) auth: AuthState,
    pub(crate) login_error: Option<String>,
    pub(crate) registration_message: Option<UserMessage>,
    pub(crate) show_registration_form: bool,
}

impl SessionState {
    pub fn new(defaults: SessionDefaults) -> Self {
        Self {
            graph: DependencyGraph::new(),
            file: None,
            file_bytes: None,
            headers: None,
            suggested_mapping: None,
            mapping: None,
            mapping_confirmed: false,
            filters: TradeFilters::default(),
            risk_free_rate: defaults.risk_free_rate,
            initial_capital: defaults.initial_capital,
            benchmark_ticker: defaults.benchmark_ticker.clone(),
            processed: None,
            filtered: None,
            benchmark: None,
            kpis: None,
            confidence_intervals: ConfidenceIntervals::new(),
            drawdown: None,
            auth: AuthState::Unauthenticated,
            login_error: None,
            registration_message: None,
            show_registration_form: false,
            defaults,
        }
    }

    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self::new(SessionDefaults::from(settings))
    }

    // --- Read access ---

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn defaults(&self) -> &SessionDefaults {
        &self.defaults
    }

    pub fn file(&self) -> Option<&FileIdentity> {
        self.file.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file.as_ref().map(|f| f.name.as_str())
    }

    pub fn file_bytes(&self) -> Option<&[u8]> {
        self.file_bytes.as_deref()
    }

    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    pub fn suggested_mapping(&self) -> Option<&ColumnMapping> {
        self.suggested_mapping.as_ref()
    }

    pub fn mapping(&self) -> Option<&ColumnMapping> {
        self.mapping.as_ref()
    }

    pub fn mapping_confirmed(&self) -> bool {
        self.mapping_confirmed
    }

    pub fn filters(&self) -> &TradeFilters {
        &self.filters
    }

    pub fn risk_free_rate(&self) -> Decimal {
        self.risk_free_rate
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    pub fn benchmark_ticker(&self) -> &str {
        &self.benchmark_ticker
    }

    pub fn processed(&self) -> Option<&TradeTable> {
        self.processed.as_ref()
    }

    pub fn filtered(&self) -> Option<&TradeTable> {
        self.filtered.as_ref()
    }

    pub fn benchmark(&self) -> Option<&ReturnSeries> {
        self.benchmark.as_ref()
    }

    pub fn kpis(&self) -> Option<&KpiReport> {
        self.kpis.as_ref()
    }

    pub fn confidence_intervals(&self) -> &ConfidenceIntervals {
        &self.confidence_intervals
    }

    pub fn drawdown(&self) -> Option<&DrawdownAnalysis> {
        self.drawdown.as_ref()
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn login_error(&self) -> Option<&str> {
        self.login_error.as_deref()
    }

    pub fn registration_message(&self) -> Option<&UserMessage> {
        self.registration_message.as_ref()
    }

    pub fn show_registration_form(&self) -> bool {
        self.show_registration_form
    }

    // --- Inputs ---

    /// Stores a newly uploaded file. Returns false when it has the same
    /// identity as the current one, in which case nothing changes.
    pub fn set_upload(&mut self, upload: &UploadedFile) -> bool {
        let identity = upload.identity();
        if self.file.as_ref() == Some(&identity) {
            return false;
        }
        self.file = Some(identity);
        self.file_bytes = Some(upload.bytes.clone());
        self.set_input(Node::Upload);
        true
    }

    /// Confirms a column mapping the user submitted.
    pub fn confirm_mapping(&mut self, mapping: ColumnMapping) {
        self.mapping = Some(mapping);
        self.mapping_confirmed = true;
        self.set_input(Node::Mapping);
    }

    pub fn set_filters(&mut self, filters: TradeFilters) -> bool {
        if self.filters == filters {
            return false;
        }
        self.filters = filters;
        self.set_input(Node::Filters);
        true
    }

    pub fn set_risk_free_rate(&mut self, rate: Decimal) -> bool {
        if self.risk_free_rate == rate {
            return false;
        }
        self.risk_free_rate = rate;
        self.set_input(Node::RiskFreeRate);
        true
    }

    pub fn set_initial_capital(&mut self, capital: Decimal) -> bool {
        if self.initial_capital == capital {
            return false;
        }
        self.initial_capital = capital;
        self.set_input(Node::InitialCapital);
        true
    }

    pub fn set_benchmark_ticker(&mut self, ticker: &str) -> bool {
        if self.benchmark_ticker == ticker {
            return false;
        }
        self.benchmark_ticker = ticker.to_string();
        self.set_input(Node::BenchmarkTicker);
        true
    }

    // --- Invalidation ---

    fn set_input(&mut self, node: Node) {
        let cleared = self.graph.set_input(node);
        self.clear_all(&cleared);
    }

    /// Records a recomputed derived node and clears its dependents.
    pub(crate) fn mark_computed(&mut self, node: Node) {
        let cleared = self.graph.mark_computed(node);
        self.clear_all(&cleared);
    }

    /// Clears `node`'s value and forces it to be recomputed.
    pub(crate) fn discard(&mut self, node: Node) {
        self.clear_node(node);
        self.graph.forget(node);
    }

    /// Clears every transitive dependent of `node`.
    pub fn invalidate(&mut self, node: Node) {
        let cleared = self.graph.invalidate(node);
        self.clear_all(&cleared);
    }

    fn clear_all(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.clear_node(*node);
        }
    }

    /// Resets the value held for `node` to its default.
    pub fn clear_node(&mut self, node: Node) {
        match node {
            Node::Upload => {
                self.file = None;
                self.file_bytes = None;
            }
            Node::Headers => {
                self.headers = None;
                self.suggested_mapping = None;
            }
            Node::Mapping => {
                self.mapping = None;
                self.mapping_confirmed = false;
            }
            Node::Filters => self.filters = TradeFilters::default(),
            Node::RiskFreeRate => self.risk_free_rate = self.defaults.risk_free_rate,
            Node::InitialCapital => self.initial_capital = self.defaults.initial_capital,
            Node::BenchmarkTicker => self.benchmark_ticker = self.defaults.benchmark_ticker.clone(),
            Node::ProcessedData => self.processed = None,
            Node::FilteredData => self.filtered = None,
            Node::Benchmark => self.benchmark = None,
            Node::Kpis => self.kpis = None,
            Node::ConfidenceIntervals => self.confidence_intervals.clear(),
            Node::Drawdown => self.drawdown = None,
        }
    }

    /// Drops the upload and everything derived from it. Analysis parameters
    /// and authentication are kept.
    pub fn reset_data(&mut self) {
        self.invalidate(Node::Upload);
        self.discard(Node::Upload);
        self.set_filters(TradeFilters::default());
    }

    /// True when no upload-related data is held.
    pub fn has_default_data(&self) -> bool {
        self.file.is_none()
            && self.file_bytes.is_none()
            && self.headers.is_none()
            && self.suggested_mapping.is_none()
            && self.mapping.is_none()
            && !self.mapping_confirmed
            && self.filters == TradeFilters::default()
            && self.processed.is_none()
            && self.filtered.is_none()
            && self.benchmark.is_none()
            && self.kpis.is_none()
            && self.confidence_intervals.is_empty()
            && self.drawdown.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ConceptualColumn;
    use rust_decimal_macros::dec;

    fn state() -> SessionState {
        SessionState::new(SessionDefaults {
            risk_free_rate: dec!(0.02),
            initial_capital: dec!(100000),
            benchmark_ticker: "SPY".to_string(),
        })
    }

    fn upload(name: &str) -> UploadedFile {
        UploadedFile::new(name, "text/csv", b"Date,PnL\n2024-01-01,1\n".to_vec())
    }

    #[test]
    fn fresh_state_uses_defaults() {
        let state = state();
        assert!(state.has_default_data());
        assert_eq!(state.risk_free_rate(), dec!(0.02));
        assert_eq!(state.benchmark_ticker(), "SPY");
        assert!(!state.auth().is_authenticated());
    }

    #[test]
    fn same_upload_identity_is_not_a_change() {
        let mut state = state();
        assert!(state.set_upload(&upload("a.csv")));
        assert!(!state.set_upload(&upload("a.csv")));
        assert!(state.set_upload(&upload("b.csv")));
    }

    #[test]
    fn new_upload_clears_mapping_and_results() {
        let mut state = state();
        state.set_upload(&upload("a.csv"));
        state.headers = Some(vec!["Date".into(), "PnL".into()]);
        state.mark_computed(Node::Headers);
        state.confirm_mapping(
            ColumnMapping::new()
                .with(ConceptualColumn::Date, "Date")
                .with(ConceptualColumn::Pnl, "PnL"),
        );
        state.processed = Some(TradeTable::default());
        state.mark_computed(Node::ProcessedData);

        state.set_upload(&upload("b.csv"));

        assert!(state.headers().is_none());
        assert!(state.mapping().is_none());
        assert!(!state.mapping_confirmed());
        assert!(state.processed().is_none());
        assert!(state.graph().is_stale(Node::Headers));
    }

    #[test]
    fn parameter_change_clears_only_kpis() {
        let mut state = state();
        state.kpis = Some(KpiReport::new(dec!(0.02), dec!(100000)));
        state.drawdown = Some(DrawdownAnalysis::default());

        assert!(!state.set_risk_free_rate(dec!(0.02)));
        assert!(state.kpis().is_some());

        assert!(state.set_risk_free_rate(dec!(0.03)));
        assert!(state.kpis().is_none());
        assert!(state.drawdown().is_some());
    }

    #[test]
    fn reset_data_keeps_parameters() {
        let mut state = state();
        state.set_upload(&upload("a.csv"));
        state.set_initial_capital(dec!(5000));
        state.processed = Some(TradeTable::default());

        state.reset_data();

        assert!(state.has_default_data());
        assert_eq!(state.initial_capital(), dec!(5000));
    }
}
