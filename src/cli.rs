//! CLI definition, process bootstrap and dispatch.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::env_config_adapter::EnvConfigAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::http_broker::HttpBroker;
use crate::adapters::linear_classifier::LinearClassifier;
use crate::adapters::web::{AppState, build_router};
use crate::domain::config::AppConfig;
use crate::domain::detector::PatternEngine;
use crate::domain::error::{ErrorCode, TradeError};
use crate::domain::execution::{ExecutionResult, OrderSubmitter};
use crate::domain::features::BarFeatureExtractor;
use crate::domain::filter::SignalFilter;
use crate::domain::pipeline::{Decision, DecisionPipeline, TradeRequest, log_failure};
use crate::domain::signal::SignalSynthesizer;
use crate::domain::sizing::PositionSizer;

#[derive(Parser, Debug)]
#[command(name = "smctrader", about = "Structure-based trade decision service")]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP service
    Serve {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [web] listen
        #[arg(long)]
        listen: Option<String>,
    },
    /// Run one trade decision and print the result as JSON
    Decide {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long)]
        timeframe: String,
        #[arg(long)]
        balance: f64,
        #[arg(long)]
        risk_pct: Option<f64>,
        /// Stop before submitting to the broker
        #[arg(long)]
        dry_run: bool,
    },
    /// Check configuration, classifier artifact and market data directory
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("error: {e}");
        return ExitCode::from(2);
    }
    match cli.command {
        Command::Serve { config, listen } => run_serve(&config, listen),
        Command::Decide {
            config,
            symbol,
            timeframe,
            balance,
            risk_pct,
            dry_run,
        } => {
            let request = TradeRequest {
                symbol,
                timeframe,
                account_balance: balance,
                risk_pct,
            };
            run_decide(&config, &request, dry_run)
        }
        Command::Validate { config } => run_validate(&config),
    }
}

/// `RUST_LOG` wins over `--log-level`. Safe to call more than once.
pub fn init_tracing(log_level: &str) -> Result<(), String> {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

/// INI file overlaid by `SMCTRADER_*` environment variables.
pub fn load_config(path: &Path) -> Result<AppConfig, TradeError> {
    let file = FileConfigAdapter::from_file(path).map_err(|e| TradeError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    AppConfig::from_port(&EnvConfigAdapter::from_env(file))
}

/// Wires the production adapters. Loads the classifier eagerly so a bad
/// artifact fails startup. Must run outside the tokio runtime.
pub fn build_pipeline(config: &AppConfig) -> Result<DecisionPipeline, TradeError> {
    let classifier = LinearClassifier::from_file(&config.model_path)?;
    let broker = HttpBroker::new(
        &config.broker.endpoint,
        &config.broker.api_key,
        config.broker.timeout,
    )?;
    tracing::info!(
        endpoint = broker.endpoint(),
        csv_dir = %config.csv_dir.display(),
        "pipeline configured"
    );

    Ok(DecisionPipeline::new(
        Arc::new(CsvAdapter::new(config.csv_dir.clone())),
        PatternEngine::from_config(&config.detector),
        SignalSynthesizer::new(config.signal.clone()),
        SignalFilter::new(
            Arc::new(BarFeatureExtractor::new(config.feature_window)),
            Arc::new(classifier),
        ),
        PositionSizer::new(config.risk.clone()),
        OrderSubmitter::new(Arc::new(broker), config.broker.retry.clone()),
    ))
}

fn fail(err: &TradeError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

fn exit_code_for(code: ErrorCode) -> ExitCode {
    match code {
        ErrorCode::InsufficientData => ExitCode::from(3),
        ErrorCode::InvalidRiskParameters => ExitCode::from(4),
        ErrorCode::ClassifierUnavailable => ExitCode::from(5),
        ErrorCode::BrokerRejected | ErrorCode::BrokerUnreachable => ExitCode::from(6),
        ErrorCode::InternalFault => ExitCode::from(1),
    }
}

fn print_json(value: &serde_json::Value) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{s}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&TradeError::internal(format!("failed to render output: {e}"))),
    }
}

fn run_serve(config_path: &Path, listen: Option<String>) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let raw_addr = listen.unwrap_or_else(|| config.listen.clone());
    let addr: SocketAddr = match raw_addr.parse() {
        Ok(a) => a,
        Err(e) => {
            return fail(&TradeError::ConfigInvalid {
                section: "web".into(),
                key: "listen".into(),
                reason: format!("{raw_addr}: {e}"),
            });
        }
    };

    // Built before the runtime; this handle keeps the last drop of the
    // blocking HTTP client outside async context.
    let pipeline = match build_pipeline(&config) {
        Ok(p) => Arc::new(p),
        Err(e) => return fail(&e),
    };
    let router = build_router(AppState {
        pipeline: Arc::clone(&pipeline),
    });

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => return fail(&TradeError::Io(e)),
    };

    let served = runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(%addr, "listening");
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("shutdown requested");
            })
            .await
    });
    drop(runtime);
    drop(pipeline);

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => fail(&TradeError::Io(e)),
    }
}

fn run_decide(config_path: &Path, request: &TradeRequest, dry_run: bool) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let pipeline = match build_pipeline(&config) {
        Ok(p) => p,
        Err(e) => return fail(&e),
    };

    let order = match pipeline.prepare(request) {
        Ok(Decision::Submit(order)) => order,
        Ok(Decision::NoTrade(reason)) => {
            return print_json(&json!({
                "status": "no_trade",
                "details": ExecutionResult::no_trade(reason),
            }));
        }
        Err(e) => {
            log_failure(&e, request);
            return fail(&e);
        }
    };

    if dry_run {
        return print_json(&json!({ "status": "dry_run", "order": order }));
    }

    let result = pipeline.execute(order);
    let status = if result.is_executed() { "executed" } else { "failed" };
    let printed = print_json(&json!({ "status": status, "details": &result }));
    match result.error {
        Some(code) => exit_code_for(code),
        None => printed,
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    if let Err(e) = LinearClassifier::from_file(&config.model_path) {
        return fail(&e);
    }
    eprintln!("  classifier: {}", config.model_path.display());
    eprintln!("  broker:     {}", config.broker.endpoint);
    eprintln!(
        "  risk:       {}% per trade{}",
        config.risk.risk_pct,
        config
            .risk
            .max_lot_size
            .map(|cap| format!(", max {cap} lots"))
            .unwrap_or_default()
    );

    match CsvAdapter::new(config.csv_dir.clone()).list_series() {
        Ok(series) if series.is_empty() => {
            eprintln!("  warning: no market data files in {}", config.csv_dir.display());
        }
        Ok(series) => {
            eprintln!("  market data ({}):", config.csv_dir.display());
            for (symbol, timeframe) in series {
                eprintln!("    {symbol} {timeframe}");
            }
        }
        Err(e) => return fail(&e),
    }

    eprintln!("Config is valid.");
    ExitCode::SUCCESS
}
