mod cli;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use scanflow::{
    AnalyzeOptions, HttpGateway, JobGateway, JobId, JobStatus, OrchestrateError,
    OrchestrationResult, Orchestrator, PollPolicy, ScanflowConfig, Selection, UnitOfWork,
};
use ui::BatchProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "scanflow=debug" } else { "scanflow=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => ScanflowConfig::load_from(path)?,
        None => ScanflowConfig::load()?,
    };
    let gateway = HttpGateway::from_config(&config).context("failed to build HTTP client")?;
    debug!(base_url = gateway.base_url(), "gateway ready");

    match cli.command {
        Command::Upload { files, folder } => {
            let units = upload_units(&files, &folder).await;
            let policy = config.upload.with_overrides(cli.max_attempts, cli.interval_ms);
            let orchestrator = Orchestrator::new(gateway)
                .with_policy(policy)
                .with_input_policy(config.input_policy());
            orchestrate(&orchestrator, units, "uploading", cli.json).await
        }
        Command::Analyze {
            images,
            folder,
            all,
        } => {
            let units = analyze_units(&gateway, images, folder.as_deref(), all).await?;
            let policy = config.analyze.with_overrides(cli.max_attempts, cli.interval_ms);
            let orchestrator = Orchestrator::new(gateway).with_policy(policy);
            orchestrate(&orchestrator, units, "analyzing", cli.json).await
        }
        Command::Status { job_id } => {
            let status = gateway.poll(&JobId::new(job_id.as_str())).await?;
            print_status(&job_id, &status, cli.json)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// One upload unit per path. Unreadable files stay in the batch and are
/// reported as rejected.
async fn upload_units(files: &[PathBuf], folder: &str) -> Vec<UnitOfWork> {
    join_all(files.iter().map(|path| UnitOfWork::read_upload(path, folder))).await
}

/// Named images first, then (with `--all`) everything listed in the folder.
async fn analyze_units(
    gateway: &HttpGateway,
    images: Vec<String>,
    folder: Option<&str>,
    all: bool,
) -> Result<Vec<UnitOfWork>> {
    let mut selection = Selection::new();
    selection.on_change(|items| debug!(selected = items.len(), "selection changed"));
    selection.select_all(images);
    if let Some(listed) = folder.filter(|_| all) {
        let listing = gateway.list_images(listed).await?;
        selection.select_all(listing.into_iter().map(|img| img.name));
    }
    Ok(selection.to_units(folder))
}

/// Runs one orchestration with a progress bar, Ctrl-C cancellation and a
/// final summary.
async fn orchestrate<G: JobGateway>(
    orchestrator: &Orchestrator<G>,
    units: Vec<UnitOfWork>,
    label: &str,
    json: bool,
) -> Result<ExitCode> {
    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling");
                cancel.cancel();
            }
        })
    };

    let PollPolicy {
        max_attempts,
        poll_interval_ms,
    } = orchestrator.policy();
    debug!(max_attempts, poll_interval_ms, units = units.len(), "starting run");

    let progress = BatchProgress::start(label, units.len(), json);
    let outcome = orchestrator
        .analyze(
            units,
            AnalyzeOptions::new()
                .with_cancellation(cancel)
                .on_progress(|done, total| progress.update(done, total))
                .on_unit_complete(|unit, record| progress.unit_complete(unit, record)),
        )
        .await;
    ctrl_c.abort();

    match outcome {
        Ok(result) => {
            if json {
                print_json(&result)?;
            } else {
                progress.finish(&result);
            }
            Ok(if result.all_succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Err(OrchestrateError::Cancelled(result)) => {
            if json {
                print_json(&result)?;
            } else {
                progress.cancelled(&result);
            }
            Ok(ExitCode::from(130))
        }
        Err(e @ OrchestrateError::EmptyInput) => Err(e.into()),
    }
}

fn print_json(result: &OrchestrationResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}

fn print_status(job_id: &str, status: &JobStatus, json: bool) -> Result<()> {
    if json {
        let body = match status {
            JobStatus::Pending => serde_json::json!({ "job_id": job_id, "state": "PENDING" }),
            JobStatus::Running => serde_json::json!({ "job_id": job_id, "state": "RUNNING" }),
            JobStatus::Succeeded(result) => {
                serde_json::json!({ "job_id": job_id, "state": "SUCCEEDED", "result": result })
            }
            JobStatus::Failed(error) => {
                serde_json::json!({ "job_id": job_id, "state": "FAILURE", "error": error })
            }
        };
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    match status {
        JobStatus::Pending => println!("{job_id}: pending"),
        JobStatus::Running => println!("{job_id}: running"),
        JobStatus::Succeeded(result) => {
            println!("{job_id}: succeeded");
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        JobStatus::Failed(error) => println!("{job_id}: failed: {error}"),
    }
    Ok(())
}
