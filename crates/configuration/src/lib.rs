use crate::error::ConfigError;
use rust_decimal::Decimal;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AnalysisSettings, AppSettings, AuthBackend, AuthSettings, ColumnSettings, Config, DatabaseSettings,
    LoggingSettings, MarketDataSettings, SeedUser,
};

/// Loads the application configuration.
///
/// Reads `path` if it exists, then layers environment variables prefixed with
/// `JOURNAL__` on top (e.g. `JOURNAL__DATABASE__URL`). Every section has
/// defaults, so a missing file yields a usable configuration.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix("JOURNAL")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    let analysis = &config.analysis;
    if analysis.confidence_level <= Decimal::ZERO || analysis.confidence_level >= Decimal::ONE {
        return Err(ConfigError::ValidationError(format!(
            "analysis.confidence_level must be between 0 and 1, got {}",
            analysis.confidence_level
        )));
    }
    if analysis.initial_capital <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "analysis.initial_capital must be positive".to_string(),
        ));
    }
    if analysis.bootstrap_iterations == 0 {
        return Err(ConfigError::ValidationError(
            "analysis.bootstrap_iterations must be at least 1".to_string(),
        ));
    }
    if config.database.max_connections == 0 {
        return Err(ConfigError::ValidationError(
            "database.max_connections must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ConceptualColumn;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.analysis.risk_free_rate, dec!(0.02));
        assert_eq!(config.analysis.default_benchmark, "SPY");
        assert_eq!(config.auth.backend, AuthBackend::Sqlite);
        assert!(!config.auth.seed_default_users);
        assert!(config.auth.default_users.is_empty());
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[analysis]
risk_free_rate = 0.05
min_ci_points = 20

[auth]
backend = "memory"
seed_default_users = true

[[auth.default_users]]
username = "demo"
password = "demo-password"

[columns.synonyms]
pnl = ["net result"]
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.analysis.risk_free_rate, dec!(0.05));
        assert_eq!(config.analysis.min_ci_points, 20);
        assert_eq!(config.analysis.min_drawdown_points, 5);
        assert_eq!(config.auth.backend, AuthBackend::Memory);
        assert_eq!(config.auth.default_users[0].username, "demo");
        assert_eq!(
            config.columns.synonyms_for(ConceptualColumn::Pnl),
            vec!["net result".to_string()]
        );
        assert!(config.columns.synonyms_for(ConceptualColumn::Date).contains(&"trade date".to_string()));
    }

    #[test]
    fn out_of_range_confidence_level_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[analysis]\nconfidence_level = 1.5").unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn benchmark_display_name_is_reverse_lookup() {
        let analysis = AnalysisSettings::default();
        assert_eq!(analysis.benchmark_display_name("QQQ"), "Nasdaq 100 (QQQ)");
        assert_eq!(analysis.benchmark_display_name("XYZ"), "None");
    }
}
