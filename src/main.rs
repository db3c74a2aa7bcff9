use analytics::{AnalyticsEngine, ConfidenceIntervals, DrawdownAnalysis, EngineSettings, KpiReport};
use anyhow::{Context, bail};
use auth::{AuthService, InMemoryUserStore, SqlUserStore, UserStore};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use configuration::{AuthBackend, Config};
use core_types::{ColumnMapping, ConceptualColumn, TradeSide, UploadedFile};
use database::UserRepository;
use indicatif::{ProgressBar, ProgressStyle};
use ingest::{CsvDataService, TradeFilters};
use market_data::YahooClient;
use rust_decimal::Decimal;
use session::{MessageLevel, Pipeline, RegistrationForm, RunInput, RunOutcome, SessionState};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The main entry point for the trade journal analyser.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; every setting has a default.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = configuration::load_config(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = configuration::init_tracing(&config.logging)?;

    let backend = cli.store.unwrap_or(config.auth.backend);
    let auth = build_auth_service(&config, backend).await?;

    match cli.command {
        Commands::Register(args) => handle_register(args, &config, &auth).await,
        Commands::Login(args) => handle_login(args, &config, &auth).await,
        Commands::Headers(args) => handle_headers(args, &config),
        Commands::Analyze(args) => handle_analyze(args, &config, &auth).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Analyses an exported trade journal: KPIs, confidence intervals and drawdowns.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. A missing file uses defaults.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Overrides the user store configured under `auth.backend`.
    #[arg(long, global = true, value_enum)]
    store: Option<AuthBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a dashboard account.
    Register(RegisterArgs),
    /// Check a username and password.
    Login(Credentials),
    /// Print a file's headers and the suggested column mapping.
    Headers(HeadersArgs),
    /// Run the full analysis pipeline over a journal file.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct Credentials {
    #[arg(long, short)]
    username: String,

    #[arg(long, short, env = "JOURNAL_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Parser)]
struct RegisterArgs {
    #[command(flatten)]
    credentials: Credentials,

    /// Must match the password.
    #[arg(long)]
    confirm_password: String,

    #[arg(long)]
    email: Option<String>,

    #[arg(long)]
    full_name: Option<String>,
}

#[derive(Parser)]
struct HeadersArgs {
    /// The CSV journal to inspect.
    file: PathBuf,
}

#[derive(Parser)]
struct AnalyzeArgs {
    #[command(flatten)]
    credentials: Credentials,

    /// The CSV journal to analyse.
    file: PathBuf,

    /// Maps a column to a header, e.g. `--map pnl="Net Profit"`. Repeatable.
    #[arg(long = "map", value_parser = parse_mapping_entry)]
    mappings: Vec<(ConceptualColumn, String)>,

    /// Accept the suggested mapping when no `--map` is given.
    #[arg(long)]
    auto_map: bool,

    /// Annual risk-free rate as a fraction, e.g. 0.02.
    #[arg(long)]
    risk_free_rate: Option<Decimal>,

    #[arg(long)]
    initial_capital: Option<Decimal>,

    /// Benchmark ticker. `NONE` disables the benchmark.
    #[arg(long)]
    benchmark: Option<String>,

    /// First trade date to include (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last trade date to include (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Keep only these symbols. Repeatable.
    #[arg(long = "symbol")]
    symbols: Vec<String>,

    /// Keep only these strategies. Repeatable.
    #[arg(long = "strategy")]
    strategies: Vec<String>,

    /// Keep only long or short trades.
    #[arg(long, value_parser = parse_side)]
    side: Option<TradeSide>,
}

impl AnalyzeArgs {
    fn filters(&self) -> TradeFilters {
        TradeFilters {
            start_date: self.from,
            end_date: self.to,
            symbols: self.symbols.iter().cloned().collect::<BTreeSet<_>>(),
            strategies: self.strategies.iter().cloned().collect::<BTreeSet<_>>(),
            side: self.side,
        }
    }

    fn mapping(&self) -> Option<ColumnMapping> {
        if self.mappings.is_empty() {
            return None;
        }
        let mut mapping = ColumnMapping::new();
        for (column, header) in &self.mappings {
            mapping.insert(*column, header.clone());
        }
        Some(mapping)
    }
}

fn parse_mapping_entry(s: &str) -> Result<(ConceptualColumn, String), String> {
    let (column, header) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=HEADER, got '{s}'"))?;
    let column = column.parse::<ConceptualColumn>().map_err(|e| e.to_string())?;
    let header = header.trim();
    if header.is_empty() {
        return Err(format!("no header given for column '{column}'"));
    }
    Ok((column, header.to_string()))
}

fn parse_side(s: &str) -> Result<TradeSide, String> {
    s.parse::<TradeSide>().map_err(|e| e.to_string())
}

// ==============================================================================
// Service Wiring
// ==============================================================================

/// Opens the configured user store and seeds it when explicitly enabled.
async fn build_auth_service(config: &Config, backend: AuthBackend) -> anyhow::Result<AuthService> {
    let store: Arc<dyn UserStore> = match backend {
        AuthBackend::Memory => {
            tracing::warn!("Using the in-memory user store; accounts are lost on exit.");
            Arc::new(InMemoryUserStore::new())
        }
        AuthBackend::Sqlite => {
            let pool = database::connect(&config.database)
                .await
                .context("failed to connect to the user database")?;
            database::run_migrations(&pool)
                .await
                .context("failed to run database migrations")?;
            Arc::new(SqlUserStore::new(UserRepository::new(pool)))
        }
    };

    let service = AuthService::new(store);
    if config.auth.seed_default_users {
        let seeded = service.seed_defaults(&config.auth.default_users).await?;
        if seeded > 0 {
            tracing::info!(seeded, "Provisioned default accounts.");
        }
    }
    Ok(service)
}

fn build_pipeline(config: &Config) -> anyhow::Result<Pipeline> {
    let analysis = &config.analysis;
    let engine = AnalyticsEngine::new(EngineSettings {
        periods_per_year: analysis.periods_per_year,
        bootstrap_iterations: analysis.bootstrap_iterations,
        confidence_level: analysis.confidence_level,
        bootstrap_seed: analysis.bootstrap_seed,
    });
    let benchmarks = YahooClient::new(&config.market_data)?;
    Ok(Pipeline::new(
        Arc::new(CsvDataService::new()),
        Arc::new(engine),
        Arc::new(benchmarks),
        analysis.clone(),
    )
    .with_synonyms(header_synonyms(config)))
}

fn header_synonyms(config: &Config) -> BTreeMap<ConceptualColumn, Vec<String>> {
    ConceptualColumn::ALL
        .into_iter()
        .map(|column| (column, config.columns.synonyms_for(column)))
        .collect()
}

fn read_upload(path: &Path) -> anyhow::Result<UploadedFile> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(UploadedFile::new(name, "text/csv", bytes))
}

// ==============================================================================
// Command Handlers
// ==============================================================================

async fn handle_register(args: RegisterArgs, config: &Config, auth: &AuthService) -> anyhow::Result<()> {
    let mut state = SessionState::from_settings(&config.analysis);
    let form = RegistrationForm {
        username: args.credentials.username,
        password: args.credentials.password,
        confirm_password: args.confirm_password,
        email: args.email,
        full_name: args.full_name,
    };

    let created = state.register(auth, &form).await;
    if let Some(message) = state.registration_message() {
        println!("{}", message.text);
    }
    if !created {
        bail!("registration failed");
    }
    Ok(())
}

async fn handle_login(args: Credentials, config: &Config, auth: &AuthService) -> anyhow::Result<()> {
    let mut state = SessionState::from_settings(&config.analysis);
    if !state.login(auth, &args.username, &args.password).await {
        bail!("{}", state.login_error().unwrap_or("Login failed."));
    }
    println!("Logged in as {}.", args.username);
    Ok(())
}

fn handle_headers(args: HeadersArgs, config: &Config) -> anyhow::Result<()> {
    let upload = read_upload(&args.file)?;
    let headers = ingest::read_headers(&upload.bytes)?;
    let suggested = ingest::suggest_mapping(&headers, &header_synonyms(config));

    println!("Headers: {}", headers.join(", "));
    print_mapping(&suggested);
    Ok(())
}

async fn handle_analyze(args: AnalyzeArgs, config: &Config, auth: &AuthService) -> anyhow::Result<()> {
    let mut state = SessionState::from_settings(&config.analysis);
    if !state.login(auth, &args.credentials.username, &args.credentials.password).await {
        bail!("{}", state.login_error().unwrap_or("Login failed."));
    }

    let pipeline = build_pipeline(config)?;
    let upload = read_upload(&args.file)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner.set_message(format!("Analysing {}...", upload.name));

    let input = RunInput {
        upload: Some(upload),
        mapping_submission: args.mapping(),
        filters: Some(args.filters()),
        risk_free_rate: args.risk_free_rate,
        benchmark_ticker: args.benchmark.clone(),
        initial_capital: args.initial_capital,
    };
    let mut report = pipeline.evaluate(&mut state, input.clone()).await;

    if let RunOutcome::AwaitingMapping { suggested, .. } = &report.outcome
        && args.auto_map
        && input.mapping_submission.is_none()
    {
        spinner.set_message("Applying the suggested column mapping...");
        let retry = RunInput {
            mapping_submission: Some(suggested.clone()),
            ..input
        };
        report = pipeline.evaluate(&mut state, retry).await;
    }
    spinner.finish_and_clear();

    for message in &report.messages {
        let tag = match message.level {
            MessageLevel::Info => "info",
            MessageLevel::Success => "ok",
            MessageLevel::Warning => "warning",
            MessageLevel::Error => "error",
        };
        eprintln!("[{tag}] {}", message.text);
    }

    match report.outcome {
        RunOutcome::Ready => {
            let ticker = state.benchmark_ticker().to_string();
            if let Some(kpis) = state.kpis() {
                println!("{}", kpi_table(kpis, &config.analysis.benchmark_display_name(&ticker)));
            }
            if !state.confidence_intervals().is_empty() {
                println!("{}", ci_table(state.confidence_intervals()));
            }
            if let Some(drawdown) = state.drawdown() {
                println!("{}", drawdown_table(drawdown));
            }
            Ok(())
        }
        RunOutcome::AwaitingMapping { headers, suggested } => {
            println!("Headers: {}", headers.join(", "));
            print_mapping(&suggested);
            bail!("map the date and pnl columns with --map, or pass --auto-map to accept the suggestion")
        }
        RunOutcome::Halted => bail!("analysis stopped before completion"),
        RunOutcome::Welcome | RunOutcome::LoginRequired => bail!("nothing to analyse"),
    }
}

// ==============================================================================
// Report Rendering
// ==============================================================================

fn print_mapping(mapping: &ColumnMapping) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Column", "Header"]);
    for column in ConceptualColumn::ALL {
        let header = mapping.header_for(column).unwrap_or("-");
        let label = if column.is_critical() {
            format!("{} *", column.label())
        } else {
            column.label().to_string()
        };
        table.add_row(vec![label, header.to_string()]);
    }
    println!("{table}");
}

fn fixed(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn pct(value: Decimal) -> String {
    format!("{:.2}%", value.round_dp(2))
}

fn opt(value: Option<Decimal>, render: fn(Decimal) -> String) -> String {
    value.map(render).unwrap_or_else(|| "N/A".to_string())
}

fn kpi_table(kpis: &KpiReport, benchmark_name: &str) -> Table {
    let rows: Vec<(&str, String)> = vec![
        ("Total Net Profit", fixed(kpis.total_net_profit)),
        ("Gross Profit", fixed(kpis.gross_profit)),
        ("Gross Loss", fixed(kpis.gross_loss)),
        ("Profit Factor", opt(kpis.profit_factor, fixed)),
        ("Total Return", pct(kpis.total_return_pct)),
        ("Avg Trade PnL", fixed(kpis.avg_trade_pnl)),
        ("Max Drawdown", fixed(kpis.max_drawdown)),
        ("Max Drawdown %", pct(kpis.max_drawdown_pct)),
        ("Sharpe Ratio", opt(kpis.sharpe_ratio, fixed)),
        ("Sortino Ratio", opt(kpis.sortino_ratio, fixed)),
        ("Calmar Ratio", opt(kpis.calmar_ratio, fixed)),
        ("Total Trades", kpis.total_trades.to_string()),
        ("Winning Trades", kpis.winning_trades.to_string()),
        ("Losing Trades", kpis.losing_trades.to_string()),
        ("Breakeven Trades", kpis.breakeven_trades.to_string()),
        ("Win Rate", opt(kpis.win_rate_pct, pct)),
        ("Average Win", fixed(kpis.average_win)),
        ("Average Loss", fixed(kpis.average_loss)),
        ("Payoff Ratio", opt(kpis.payoff_ratio, fixed)),
        ("Largest Win", fixed(kpis.largest_win)),
        ("Largest Loss", fixed(kpis.largest_loss)),
        ("Max Consecutive Wins", kpis.max_consecutive_wins.to_string()),
        ("Max Consecutive Losses", kpis.max_consecutive_losses.to_string()),
        ("Benchmark", benchmark_name.to_string()),
        ("Benchmark Return", opt(kpis.benchmark_return_pct, pct)),
        ("Excess Return", opt(kpis.excess_return_pct, pct)),
    ];

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["KPI", "Value"]);
    for (name, value) in rows {
        table.add_row(vec![name.to_string(), value]);
    }
    table
}

fn ci_table(intervals: &ConfidenceIntervals) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Lower", "Upper"]);
    for (metric, interval) in intervals {
        table.add_row(vec![metric.to_string(), fixed(interval.lower), fixed(interval.upper)]);
    }
    table
}

fn drawdown_table(analysis: &DrawdownAnalysis) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Peak", "Trough", "Recovery", "Depth", "Depth %", "Days"]);
    for period in &analysis.periods {
        table.add_row(vec![
            period.peak_date.date().to_string(),
            period.trough_date.date().to_string(),
            period
                .recovery_date
                .map(|d| d.date().to_string())
                .unwrap_or_else(|| "ongoing".to_string()),
            fixed(period.depth),
            opt(period.depth_pct, pct),
            period.duration_days.to_string(),
        ]);
    }
    table
}
