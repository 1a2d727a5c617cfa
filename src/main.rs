//! `skinsight` — classify a skin lesion photograph and report melanoma risk.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]).
//! 2. Load configuration ([`config::load_config`]) and apply flag overrides.
//! 3. Read and vet the image ([`upload::ImageUpload`]).
//! 4. Build the configured adapter ([`backend::from_config`]); missing
//!    credentials fail here, before any request.
//! 5. Run the analysis ([`pipeline::Session`]): adapter call, subject gate,
//!    catalog-driven scoring ([`diagnosis::processor`]) and risk tier
//!    ([`diagnosis::risk`]).
//! 6. Render the requested report ([`report`]).
//! 7. Exit `0` (classified or not a mole) or `1` (analysis failed).

mod backend;
mod cli;
mod config;
mod diagnosis;
mod error;
mod models;
mod pipeline;
mod report;
mod upload;

#[cfg(test)]
mod testing;

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use cli::{Cli, ReportFormat};
use config::{load_config, Config};
use error::{AnalysisError, AnalysisFailure, FailureOrigin};
use models::Analysis;
use pipeline::Session;
use upload::ImageUpload;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir()?;
    let config = match prepare_config(&cli, &cwd) {
        Ok(config) => config,
        Err(failure) => {
            tracing::error!(error = ?failure.error, "configuration rejected");
            report::terminal::render_failure(&failure);
            std::process::exit(1);
        }
    };

    match analyze(&cli, &config).await {
        Ok(analysis) => {
            let image_name = cli
                .image
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            match cli.report {
                ReportFormat::Terminal => {
                    report::terminal::render(&analysis, &image_name, cli.verbose, cli.quiet)?;
                }
                ReportFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&analysis)?);
                }
            }
            Ok(())
        }
        Err(failure) => {
            tracing::error!(error = ?failure.error, "analysis failed");
            report::terminal::render_failure(&failure);
            std::process::exit(1);
        }
    }
}

/// Load, override and validate the configuration. Failures are reported
/// like any other configuration error.
fn prepare_config(cli: &Cli, cwd: &Path) -> Result<Config, AnalysisFailure> {
    let pipeline_failure = |error| AnalysisFailure {
        origin: FailureOrigin::Pipeline,
        error,
    };

    let mut config = load_config(cwd, cli.config.as_deref())
        .map_err(|e| pipeline_failure(AnalysisError::Configuration(format!("{e:#}"))))?;
    cli.apply_overrides(&mut config);
    config.validate().map_err(pipeline_failure)?;
    Ok(config)
}

async fn analyze(cli: &Cli, config: &Config) -> Result<Analysis, AnalysisFailure> {
    let image = ImageUpload::from_path(&cli.image).map_err(|error| AnalysisFailure {
        origin: FailureOrigin::Pipeline,
        error,
    })?;

    let backend = backend::from_config(config).map_err(|error| AnalysisFailure {
        origin: FailureOrigin::Backend(config.backend),
        error,
    })?;

    let session = Session::new(backend, config.risk);

    let spinner = if cli.quiet || matches!(cli.report, ReportFormat::Json) {
        None
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Analyzing...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    };

    let outcome = session.submit(&image).await;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    outcome
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "skinsight=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
