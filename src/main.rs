// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{bail, Context, Result};
use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use clap::{Parser, Subcommand};
use pdnsync::{
    canonical::canonicalize,
    config::Config,
    constants::{
        HEALTH_SERVER_PATH, JOB_NAME_ADDRESS, JOB_NAME_SYNC, METRICS_SERVER_PATH,
        TOKIO_WORKER_THREADS,
    },
    inventory::{AddressId, MemoryInventory},
    jobs::{EnqueueRequest, Job, JobId, JobQueue, JobStatus},
    metrics,
    powerdns::HttpBackendFactory,
    reconcilers::Reconciler,
    runner::LocalJobRunner,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Keep PowerDNS zones consistent with a network inventory
#[derive(Parser, Debug)]
#[command(name = "pdnsync", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, value_name = "FILE", default_value = "pdnsync.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and exit
    Validate,

    /// Run a full sync of one or more zones
    Sync {
        /// Zones to sync
        #[arg(required = true)]
        zones: Vec<String>,

        /// Repeat every N minutes until interrupted
        #[arg(long, value_name = "MINUTES")]
        interval: Option<u32>,
    },

    /// Create the records of one inventory address
    Update {
        /// Inventory id of the address
        id: AddressId,
    },

    /// Run the configured schedules and serve metrics until interrupted
    Serve,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("pdnsync")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    init_tracing();

    let config = Config::load(&cli.config)?;
    debug!(config = %cli.config.display(), "Configuration loaded");

    match cli.command {
        Commands::Validate => validate(&config),
        Commands::Sync { zones, interval } => sync(&config, &zones, interval).await,
        Commands::Update { id } => update(&config, id).await,
        Commands::Serve => serve(&config).await,
    }
}

/// Format: timestamp file:line LEVEL message
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`json` or `text`).
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

fn validate(config: &Config) -> Result<()> {
    let registry = config.build_registry()?;
    if let Some(path) = config.inventory_path() {
        MemoryInventory::load(&path)?;
    }
    info!(
        servers = registry.servers().count(),
        zones = registry.zones().count(),
        schedules = config.schedules.len(),
        "Configuration is valid"
    );
    Ok(())
}

/// Wire the inventory, the zones and the PowerDNS client into a job runner.
fn build_runner(config: &Config) -> Result<LocalJobRunner> {
    let registry = config.build_registry()?;
    let inventory = match config.inventory_path() {
        Some(path) => MemoryInventory::load(&path)?,
        None => {
            warn!("No inventory configured, every address lookup will come back empty");
            MemoryInventory::new()
        }
    };
    let backends = HttpBackendFactory::new(config.http.timeout(), config.http.retry)
        .context("Failed to build PowerDNS HTTP client")?;
    let reconciler = Reconciler::new(
        Arc::new(inventory),
        Arc::new(registry),
        Arc::new(backends),
        config.settings.clone(),
    );
    Ok(LocalJobRunner::with_retention(
        Arc::new(reconciler),
        config.workers,
        config.job_retention.clone(),
    ))
}

async fn sync(config: &Config, zones: &[String], interval: Option<u32>) -> Result<()> {
    let runner = build_runner(config)?;
    let mut ids = Vec::with_capacity(zones.len());
    for zone in zones {
        let request =
            EnqueueRequest::sync_zone(&canonicalize(zone), JOB_NAME_SYNC, None, None, interval);
        ids.push(runner.enqueue(request).await?);
    }

    if interval.is_some() {
        info!(zones = zones.len(), "Recurring sync started, waiting for shutdown signal");
        shutdown_signal().await;
        runner.shutdown();
        return Ok(());
    }
    wait_and_report(&runner, &ids).await
}

async fn update(config: &Config, id: AddressId) -> Result<()> {
    let runner = build_runner(config)?;
    let job_id = runner
        .enqueue(EnqueueRequest::update_address(id, JOB_NAME_ADDRESS, None))
        .await?;
    wait_and_report(&runner, &[job_id]).await
}

async fn serve(config: &Config) -> Result<()> {
    let runner = build_runner(config)?;
    for schedule in &config.schedules {
        let zone = canonicalize(&schedule.zone);
        let id = runner
            .enqueue(EnqueueRequest::sync_zone(
                &zone,
                JOB_NAME_SYNC,
                None,
                schedule.start_at,
                schedule.interval_minutes,
            ))
            .await?;
        info!(zone = %zone, job_id = id, interval = ?schedule.interval_minutes, "Scheduled zone sync");
    }

    let bind_address = format!("{}:{}", config.metrics.bind_address, config.metrics.port);
    info!("Starting pdnsync, metrics on http://{bind_address}{METRICS_SERVER_PATH}");

    tokio::select! {
        result = run_metrics_server(&bind_address) => {
            error!("CRITICAL: Metrics server exited unexpectedly: {:?}", result);
            runner.shutdown();
            result?;
            bail!("Metrics server exited unexpectedly without error")
        }
        () = shutdown_signal() => {
            runner.shutdown();
            info!("Shutdown complete");
            Ok(())
        }
    }
}

/// Wait for every job, print its log and output, and fail if any job errored.
async fn wait_and_report(runner: &LocalJobRunner, ids: &[JobId]) -> Result<()> {
    let mut failed = 0;
    for id in ids {
        let Some(job) = runner.wait_for(*id).await else {
            bail!("Job {id} disappeared before finishing");
        };
        print_job(&job);
        if job.status != JobStatus::Completed {
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{failed} of {} jobs failed", ids.len());
    }
    Ok(())
}

fn print_job(job: &Job) {
    println!("{} ({}): {}", job.name, job.subject, job.status.as_str());
    for entry in &job.data.log {
        println!("  [{}] {}", entry.status.as_str(), entry.message);
    }
    for row in &job.data.output {
        println!("  {} {} on {} ({})", row.action, row.rr, row.server, row.zone);
    }
}

async fn run_metrics_server(bind_address: &str) -> Result<()> {
    let app = Router::new()
        .route(METRICS_SERVER_PATH, get(metrics_handler))
        .route(HEALTH_SERVER_PATH, get(|| async { "ok" }));
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind metrics server to {bind_address}"))?;
    axum::serve(listener, app)
        .await
        .context("Metrics server error")
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
