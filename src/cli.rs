//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::jsonl_journal::JsonlJournal;
use crate::adapters::llm_adapter::{self, LlmSettings};
use crate::adapters::synthetic_adapter::SyntheticDataAdapter;
use crate::domain::agent::{Agent, AgentConfig, RunSummary};
use crate::domain::config_validation::validate_agent_config;
use crate::domain::decision::DecisionThresholds;
use crate::domain::error::AgentError;
use crate::domain::ohlcv::Interval;
use crate::domain::risk::RiskConfig;
use crate::logging::{init_tracing, LoggingSettings};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::journal_port::{DiscardJournal, TradeJournal};
use crate::ports::suggestion_port::{DisabledSuggestions, SuggestionPort};

pub const DEFAULT_ASSETS: [&str; 2] = ["BTC", "ETH"];
pub const DEFAULT_JOURNAL_PATH: &str = "trades_log.jsonl";
pub const DEFAULT_SEED: i64 = 42;

#[derive(Parser, Debug)]
#[command(name = "tradeagent", about = "Indicator-driven trading agent simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the agent loop against the simulated portfolio
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated asset list, overrides [agent] assets
        #[arg(long, value_delimiter = ',')]
        assets: Option<Vec<String>>,
        #[arg(long)]
        interval: Option<String>,
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        starting_funds: Option<f64>,
    },
    /// Print the decision for one asset as JSON
    Analyze {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        asset: String,
    },
    /// Print the initial allocation as JSON
    Allocate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that take precedence over the `[agent]` section.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub assets: Option<Vec<String>>,
    pub interval: Option<String>,
    pub iterations: Option<usize>,
    pub starting_funds: Option<f64>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            assets,
            interval,
            iterations,
            starting_funds,
        } => run_agent(
            &config,
            &RunOverrides {
                assets,
                interval,
                iterations,
                starting_funds,
            },
        ),
        Command::Analyze { config, asset } => run_analyze(&config, &asset),
        Command::Allocate { config } => run_allocate(&config),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Loads, validates and installs logging. Shared first stage of every
/// command that builds an agent.
fn prepare(config_path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    let adapter = load_config(config_path)?;
    if let Err(e) = validate_agent_config(&adapter) {
        eprintln!("error: {e}");
        return Err((&e).into());
    }
    init_tracing(&build_logging_settings(&adapter));
    Ok(adapter)
}

fn run_agent(config_path: &PathBuf, overrides: &RunOverrides) -> ExitCode {
    let adapter = match prepare(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let journal = match JsonlJournal::open(journal_path(&adapter)) {
        Ok(j) => j,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let journal_file = journal.path().to_path_buf();

    let mut agent = match build_agent(&adapter, overrides, Box::new(journal)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    info!(
        assets = ?agent.config().assets,
        interval = %agent.config().interval,
        iterations = agent.config().iterations,
        journal = %journal_file.display(),
        "starting agent"
    );

    match agent.run() {
        Ok(summary) => {
            print_summary(&summary, &agent);
            eprintln!("journal written to {}", journal_file.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_analyze(config_path: &PathBuf, asset: &str) -> ExitCode {
    let adapter = match prepare(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let agent = match build_agent(&adapter, &RunOverrides::default(), Box::new(DiscardJournal)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let record = match agent.decide(&asset.trim().to_uppercase()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    print_json(&record)
}

fn run_allocate(config_path: &PathBuf) -> ExitCode {
    let adapter = match prepare(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let agent = match build_agent(&adapter, &RunOverrides::default(), Box::new(DiscardJournal)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    print_json(&agent.plan_allocation())
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_agent_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let config = match build_agent_config(&adapter, &RunOverrides::default()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let llm = build_llm_settings(&adapter);

    eprintln!("\nAgent:");
    eprintln!("  assets:         {}", config.assets.join(", "));
    eprintln!("  interval:       {}", config.interval);
    eprintln!("  lookback:       {}", config.lookback);
    eprintln!("  iterations:     {}", config.iterations);
    eprintln!("  starting funds: {:.2}", config.starting_funds);
    eprintln!(
        "  data source:    {}",
        adapter
            .get_string("agent", "data_source")
            .unwrap_or_else(|| "synthetic".to_string())
    );
    eprintln!("  journal:        {}", journal_path(&adapter).display());
    eprintln!("\nSuggestion provider:");
    if llm.enabled {
        eprintln!("  {} via {}", llm.model, llm.endpoint());
    } else {
        eprintln!("  disabled (signal thresholds decide)");
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: cannot encode output: {e}");
            ExitCode::from(1)
        }
    }
}

fn print_summary(summary: &RunSummary, agent: &Agent) {
    let state = agent.simulator().state();
    let change = summary.final_value - summary.starting_funds;
    let change_pct = if summary.starting_funds > 0.0 {
        change / summary.starting_funds * 100.0
    } else {
        0.0
    };

    println!("Cycles:         {}", summary.cycles);
    println!("Trades:         {}", summary.trades);
    println!("Starting funds: {:.2}", summary.starting_funds);
    println!("Final value:    {:.2} ({:+.2}%)", summary.final_value, change_pct);
    println!("Cash:           {:.2}", state.cash);
    for (asset, position) in &state.positions {
        println!(
            "  {:<8} {:>14.6} units @ {:>12.4}  value {:>12.2}  unrealized {:>+10.2}",
            asset,
            position.size,
            position.last_price,
            position.usd_value,
            position.unrealized_pnl(position.last_price)
        );
    }
}

/// Wires every port from the configuration into a ready agent.
pub fn build_agent(
    adapter: &dyn ConfigPort,
    overrides: &RunOverrides,
    journal: Box<dyn TradeJournal>,
) -> Result<Agent, AgentError> {
    let config = build_agent_config(adapter, overrides)?;
    let risk = build_risk_config(adapter);
    let thresholds = build_decision_thresholds(adapter);
    let data = build_data_port(adapter)?;
    let provider = build_suggestion_port(&build_llm_settings(adapter))?;
    Ok(Agent::new(config, risk, &thresholds, data, provider, journal))
}

pub fn build_agent_config(
    adapter: &dyn ConfigPort,
    overrides: &RunOverrides,
) -> Result<AgentConfig, AgentError> {
    let defaults = AgentConfig::default();

    let assets = resolve_assets(overrides.assets.as_deref(), adapter);
    if assets.is_empty() {
        return Err(AgentError::ConfigMissing {
            section: "agent".into(),
            key: "assets".into(),
        });
    }

    let interval = overrides
        .interval
        .clone()
        .or_else(|| adapter.get_string("agent", "interval"))
        .map(|label| Interval::parse(&label))
        .unwrap_or(defaults.interval);

    let starting_funds = overrides
        .starting_funds
        .unwrap_or_else(|| adapter.get_double("agent", "starting_funds", defaults.starting_funds));
    if !(starting_funds.is_finite() && starting_funds > 0.0) {
        return Err(AgentError::ConfigInvalid {
            section: "agent".into(),
            key: "starting_funds".into(),
            reason: "starting_funds must be positive".into(),
        });
    }

    let iterations = match overrides.iterations {
        Some(n) => n,
        None => adapter
            .get_int("agent", "iterations", defaults.iterations as i64)
            .max(0) as usize,
    };
    if iterations == 0 {
        return Err(AgentError::ConfigInvalid {
            section: "agent".into(),
            key: "iterations".into(),
            reason: "iterations must be at least 1".into(),
        });
    }

    Ok(AgentConfig {
        assets,
        interval,
        lookback: adapter
            .get_int("agent", "lookback", defaults.lookback as i64)
            .max(0) as usize,
        starting_funds,
        iterations,
        cycle_delay: Duration::from_millis(adapter.get_int("agent", "cycle_delay_ms", 0).max(0) as u64),
        initial_allocation: adapter.get_bool(
            "agent",
            "initial_allocation",
            defaults.initial_allocation,
        ),
    })
}

pub fn build_risk_config(adapter: &dyn ConfigPort) -> RiskConfig {
    let defaults = RiskConfig::default();
    RiskConfig {
        max_position_size: adapter.get_double("risk", "max_position_size", defaults.max_position_size),
        max_total_risk: adapter.get_double("risk", "max_total_risk", defaults.max_total_risk),
        kelly_fraction: adapter.get_double("risk", "kelly_fraction", defaults.kelly_fraction),
        avg_win: adapter.get_double("risk", "avg_win", defaults.avg_win),
        avg_loss: adapter.get_double("risk", "avg_loss", defaults.avg_loss),
    }
}

pub fn build_decision_thresholds(adapter: &dyn ConfigPort) -> DecisionThresholds {
    let defaults = DecisionThresholds::default();
    DecisionThresholds {
        strong: adapter.get_double("decision", "strong_threshold", defaults.strong),
        weak: adapter.get_double("decision", "weak_threshold", defaults.weak),
        fallback_confidence: adapter.get_double(
            "decision",
            "fallback_confidence",
            defaults.fallback_confidence,
        ),
        fallback_position_pct: adapter.get_double(
            "decision",
            "fallback_position_pct",
            defaults.fallback_position_pct,
        ),
    }
}

pub fn build_llm_settings(adapter: &dyn ConfigPort) -> LlmSettings {
    let defaults = LlmSettings::default();
    LlmSettings {
        enabled: adapter.get_bool("llm", "enabled", defaults.enabled),
        base_url: adapter
            .get_string("llm", "base_url")
            .unwrap_or(defaults.base_url),
        api_key: resolve_api_key(
            adapter.get_string("llm", "api_key"),
            std::env::var(llm_adapter::API_KEY_ENV).ok(),
        ),
        model: adapter.get_string("llm", "model").unwrap_or(defaults.model),
        timeout: Duration::from_millis(
            adapter
                .get_int("llm", "timeout_ms", llm_adapter::DEFAULT_TIMEOUT_MS as i64)
                .max(1) as u64,
        ),
    }
}

/// Configured key first, then the environment. Blank values count as unset.
pub fn resolve_api_key(configured: Option<String>, env: Option<String>) -> Option<String> {
    configured
        .filter(|k| !k.trim().is_empty())
        .or_else(|| env.filter(|k| !k.trim().is_empty()))
        .map(|k| k.trim().to_string())
}

pub fn build_logging_settings(adapter: &dyn ConfigPort) -> LoggingSettings {
    let defaults = LoggingSettings::default();
    LoggingSettings {
        level: adapter.get_string("logging", "level").unwrap_or(defaults.level),
        json: adapter.get_bool("logging", "json", defaults.json),
    }
}

pub fn build_data_port(adapter: &dyn ConfigPort) -> Result<Box<dyn DataPort>, AgentError> {
    let source = adapter
        .get_string("agent", "data_source")
        .unwrap_or_else(|| "synthetic".to_string());
    match source.trim().to_lowercase().as_str() {
        "synthetic" => {
            let seed = adapter.get_int("agent", "seed", DEFAULT_SEED) as u64;
            Ok(Box::new(SyntheticDataAdapter::new(seed)))
        }
        "csv" => {
            let dir = adapter
                .get_string("agent", "data_dir")
                .filter(|d| !d.trim().is_empty())
                .ok_or_else(|| AgentError::ConfigMissing {
                    section: "agent".into(),
                    key: "data_dir".into(),
                })?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(dir))))
        }
        other => Err(AgentError::ConfigInvalid {
            section: "agent".into(),
            key: "data_source".into(),
            reason: format!("unknown data source '{other}'"),
        }),
    }
}

pub fn build_suggestion_port(settings: &LlmSettings) -> Result<Arc<dyn SuggestionPort>, AgentError> {
    if !settings.enabled {
        return Ok(Arc::new(DisabledSuggestions));
    }

    #[cfg(feature = "llm")]
    {
        let adapter = llm_adapter::OpenAiCompatAdapter::new(settings)?;
        info!(model = %settings.model, endpoint = %settings.endpoint(), "suggestion provider enabled");
        Ok(Arc::new(adapter))
    }

    #[cfg(not(feature = "llm"))]
    {
        warn!("llm enabled in config but the llm feature is not compiled in; using signal thresholds");
        Ok(Arc::new(DisabledSuggestions))
    }
}

pub fn journal_path(adapter: &dyn ConfigPort) -> PathBuf {
    adapter
        .get_string("agent", "journal_path")
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_JOURNAL_PATH))
}

/// Override list first, then `[agent] assets`, then the default pair.
/// Names are uppercased and duplicates dropped, keeping first occurrence.
pub fn resolve_assets(asset_override: Option<&[String]>, config: &dyn ConfigPort) -> Vec<String> {
    let raw: Vec<String> = match asset_override {
        Some(list) => list.to_vec(),
        None => match config.get_list("agent", "assets") {
            Some(list) => list,
            None => DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
        },
    };

    let mut assets: Vec<String> = Vec::new();
    for asset in raw {
        let asset = asset.trim().to_uppercase();
        if asset.is_empty() {
            continue;
        }
        if assets.contains(&asset) {
            warn!(asset = %asset, "duplicate asset ignored");
            continue;
        }
        assets.push(asset);
    }
    assets
}
