//! NeuralTrack - MoCA longitudinal CDR inference
//!
//! Serves CDR predictions over HTTP, or runs them one-shot from the command
//! line against the same persisted model bundles.
//!
//! # Usage
//!
//! ```bash
//! # HTTP service (default subcommand)
//! neuraltrack serve --addr 0.0.0.0:8080
//!
//! # One batch from stdin, results on stdout
//! neuraltrack predict < visits.json
//!
//! # Many patient records in parallel
//! neuraltrack batch --input patients.json
//! ```
//!
//! # Environment Variables
//!
//! - `NEURALTRACK_CONFIG`: Path to a TOML config file
//! - `NEURALTRACK_SERVER_ADDR`: Bind address override
//! - `NEURALTRACK_CURRENT_MODEL` / `NEURALTRACK_PROJECTION_MODEL`: Model bundle paths
//! - `RUST_LOG`: Logging level (default: info)

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use neuraltrack::api::{create_app, ApiState};
use neuraltrack::config::{self, ServiceConfig};
use neuraltrack::ml_engine::{predict_patient, predict_payload, registry, ModelRegistry, PredictionError};
use neuraltrack::types::{ErrorPayload, PatientRecord, PatientReport};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "neuraltrack")]
#[command(about = "NeuralTrack MoCA longitudinal CDR inference")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (takes precedence over NEURALTRACK_CONFIG)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Run the HTTP prediction service
    Serve {
        /// Override the server address (default: "0.0.0.0:8080")
        #[arg(short, long)]
        addr: Option<String>,
    },

    /// Predict one assessment array read from stdin
    Predict,

    /// Predict a JSON array of patient records in parallel
    Batch {
        /// File containing `[{"dob": ..., "mocaTests": [...]}, ...]`
        #[arg(short, long)]
        input: PathBuf,
    },
}

// ============================================================================
// Setup
// ============================================================================

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Resolve configuration. An explicit `--config` file must load cleanly;
/// env overrides are validated either way.
fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    let config = match path {
        Some(p) => ServiceConfig::load_from_file(p)
            .with_context(|| format!("failed to load config {}", p.display()))?,
        None => return ServiceConfig::load().context("invalid configuration"),
    };
    config
        .with_env_overrides()
        .context("invalid configuration after environment overrides")
}

/// Install the global subscriber. Logs go to stderr so stdout stays
/// reserved for prediction output.
fn init_logging(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_models(config: &ServiceConfig) -> Result<std::sync::Arc<ModelRegistry>> {
    registry::init(&config.models).context("failed to load model bundles")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}

// ============================================================================
// Subcommands
// ============================================================================

async fn run_server(addr_override: Option<String>) -> Result<()> {
    let config = config::get();
    let addr = addr_override.unwrap_or_else(|| config.server.addr.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  NeuralTrack - MoCA longitudinal CDR inference");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let models = load_models(config)?;
    let app = create_app(ApiState::new(models), &config.server);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("HTTP server listening on {}", addr);

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await
        .context("HTTP server error")?;

    info!("Graceful shutdown complete");
    Ok(())
}

/// Stdin prediction. Exit status is 1 only for batch failures; empty input
/// prints its error payload and exits 0.
fn run_predict() -> Result<ExitCode> {
    let mut body = Vec::new();
    std::io::stdin()
        .read_to_end(&mut body)
        .context("failed to read stdin")?;
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ExitCode::SUCCESS);
    }

    let models = match load_models(config::get()) {
        Ok(models) => models,
        Err(e) => {
            error!("{:#}", e);
            print_json(&ErrorPayload::new(format!("{e:#}")))?;
            return Ok(ExitCode::FAILURE);
        }
    };

    match predict_payload(&models, &body) {
        Ok(results) => {
            print_json(&results)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ PredictionError::EmptyInput) => {
            print_json(&ErrorPayload::new(e.to_string()))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!(error = %e, "Prediction failed");
            print_json(&ErrorPayload::new(e.to_string()))?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Per-patient outcome in batch output.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum BatchEntry {
    Report(PatientReport),
    Failed {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        error: String,
    },
}

fn run_batch(input: &Path) -> Result<ExitCode> {
    let contents = std::fs::read(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let document: Value = serde_json::from_slice(&contents)
        .with_context(|| format!("{} is not valid JSON", input.display()))?;
    let Value::Array(records) = document else {
        anyhow::bail!("{} must contain a JSON array of patient records", input.display());
    };

    let models = load_models(config::get())?;
    info!(patients = records.len(), "Batch prediction starting");

    let entries: Vec<BatchEntry> = records
        .par_iter()
        .enumerate()
        .map(|(i, value)| {
            let id = value.get("id").and_then(Value::as_str).map(str::to_string);
            match PatientRecord::from_value(value).and_then(|r| predict_patient(&models, &r)) {
                Ok(report) => BatchEntry::Report(report),
                Err(e) => {
                    warn!(record = i, error = %e, "Patient record failed");
                    BatchEntry::Failed {
                        id,
                        error: e.to_string(),
                    }
                }
            }
        })
        .collect();

    let failed = entries
        .iter()
        .filter(|e| matches!(e, BatchEntry::Failed { .. }))
        .count();
    info!(patients = entries.len(), failed, "Batch prediction complete");

    print_json(&entries)?;
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = CliArgs::parse();

    // Config is resolved before the global subscriber exists, so route its
    // warnings through a scoped one.
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || load_config(args.config.as_deref()))?;

    init_logging(config.logging.is_json());
    config::init(config);

    match args.command.unwrap_or(SubCommand::Serve { addr: None }) {
        SubCommand::Serve { addr } => {
            run_server(addr).await?;
            Ok(ExitCode::SUCCESS)
        }
        SubCommand::Predict => tokio::task::spawn_blocking(run_predict).await?,
        SubCommand::Batch { input } => {
            tokio::task::spawn_blocking(move || run_batch(&input)).await?
        }
    }
}
