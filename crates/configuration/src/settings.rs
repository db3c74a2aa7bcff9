use core_types::ConceptualColumn;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppSettings,
    pub analysis: AnalysisSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub market_data: MarketDataSettings,
    pub logging: LoggingSettings,
    pub columns: ColumnSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub title: String,
}

/// Defaults and thresholds for the analysis stages of the pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Annual risk-free rate as a fraction (0.02 is 2%).
    pub risk_free_rate: Decimal,
    pub initial_capital: Decimal,
    /// Ticker fetched when the user has not picked one. `NONE` disables the benchmark.
    pub default_benchmark: String,
    /// Display name -> ticker.
    pub available_benchmarks: BTreeMap<String, String>,
    /// Minimum equity points before the advanced drawdown analysis runs.
    pub min_drawdown_points: usize,
    /// Minimum PnL observations before bootstrap confidence intervals run.
    pub min_ci_points: usize,
    pub bootstrap_iterations: usize,
    pub confidence_level: Decimal,
    /// Fixes the bootstrap resampling for reproducible intervals.
    pub bootstrap_seed: Option<u64>,
    /// Used to annualise per-trade Sharpe and Sortino ratios.
    pub periods_per_year: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
}

/// Which user store backs the authentication service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AuthBackend {
    Memory,
    #[default]
    Sqlite,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub backend: AuthBackend,
    /// Provision `default_users` into an empty store on startup. Off unless
    /// explicitly enabled.
    pub seed_default_users: bool,
    pub default_users: Vec<SeedUser>,
}

/// An account provisioned on first startup when seeding is enabled.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// An `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    pub level: String,
    /// When set, logs are also written to daily-rolling files in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

/// Per-column header synonyms. Columns absent here use the built-in list.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ColumnSettings {
    pub synonyms: BTreeMap<ConceptualColumn, Vec<String>>,
}

impl ColumnSettings {
    pub fn synonyms_for(&self, column: ConceptualColumn) -> Vec<String> {
        match self.synonyms.get(&column) {
            Some(configured) => configured.clone(),
            None => column
                .default_synonyms()
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// --- Default Implementations ---
// This allows a user to omit any section from their toml
// and still have it work with sensible defaults.

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            title: "Trade Journal".to_string(),
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        let available_benchmarks = [
            ("S&P 500 (SPY)", "SPY"),
            ("Nasdaq 100 (QQQ)", "QQQ"),
            ("Dow Jones (DIA)", "DIA"),
            ("Russell 2000 (IWM)", "IWM"),
            ("Gold (GLD)", "GLD"),
            ("None", "NONE"),
        ]
        .into_iter()
        .map(|(name, ticker)| (name.to_string(), ticker.to_string()))
        .collect();

        Self {
            risk_free_rate: dec!(0.02),
            initial_capital: dec!(100000),
            default_benchmark: "SPY".to_string(),
            available_benchmarks,
            min_drawdown_points: 5,
            min_ci_points: 10,
            bootstrap_iterations: 1000,
            confidence_level: dec!(0.95),
            bootstrap_seed: None,
            periods_per_year: 252,
        }
    }
}

impl AnalysisSettings {
    /// Reverse lookup of the display name for a ticker, `"None"` when unknown.
    pub fn benchmark_display_name(&self, ticker: &str) -> String {
        self.available_benchmarks
            .iter()
            .find(|(_, t)| t.eq_ignore_ascii_case(ticker))
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| "None".to_string())
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://trade_journal.db".to_string(),
            max_connections: 5,
        }
    }
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 20,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "trade-journal.log".to_string(),
        }
    }
}
