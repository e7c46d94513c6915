//! Bucketsweep
//!
//! Deletes objects older than `DAYS` from `BUCKET_NAME`. Runs a single pass
//! by default, or one pass per `--interval` until SIGINT/SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use common::cli::{CommonArgs, CommonCommands, init_logging};
use common::telemetry::{init_telemetry, job_meter};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use sweeper::job::INVALID_CONFIG_EXIT_CODE;
use sweeper::{
    CleanupConfig, CleanupJob, CleanupOutcome, JobSettings, ObjectStoreConnector,
    OtelMetricsPublisher, SweepStats, WebhookNotifier,
};
use tokio::time::MissedTickBehavior;

const SERVICE_NAME: &str = "bucketsweep";
const NOTIFY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "bucketsweep", author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    /// Run a pass every INTERVAL (e.g. "24h", "30m") instead of once
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    interval: Option<Duration>,

    #[command(subcommand)]
    command: Option<CommonCommands>,
}

/// Waits for a shutdown signal (SIGINT or SIGTERM)
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

        tokio::select! {
            _ = sigint.recv() => tracing::info!("Received SIGINT"),
            _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for shutdown signal")?;
        tracing::info!("Received Ctrl+C");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.common);

    match cli.command.clone().unwrap_or_default() {
        CommonCommands::Run => match run(cli.interval).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = format!("{e:#}"), "Cleanup job aborted");
                ExitCode::FAILURE
            }
        },
        CommonCommands::Validate => validate(),
        CommonCommands::Config { json } => show_config(json),
    }
}

async fn run(interval: Option<Duration>) -> Result<ExitCode> {
    let settings = JobSettings::load().context("Failed to read job settings")?;
    let telemetry = init_telemetry(settings.otlp_endpoint.as_deref(), SERVICE_NAME)?;
    let meter = job_meter(telemetry.as_ref());

    let notifier = WebhookNotifier::new(NOTIFY_TIMEOUT).context("Failed to build webhook client")?;
    let job = CleanupJob::new(
        Arc::new(ObjectStoreConnector::Dsn(settings.storage_dsn.clone())),
        Arc::new(notifier),
        Arc::new(OtelMetricsPublisher::new(&meter)),
    )
    .with_alert_destination(settings.alert_webhook_url.clone());

    let code = match interval {
        None => {
            let outcome = job.run(&CleanupConfig::figment()).await;
            print_outcome(&outcome);
            ExitCode::from(outcome.exit_code())
        }
        Some(period) => {
            run_scheduled(&job, period).await?;
            ExitCode::SUCCESS
        }
    };

    if let Some(telemetry) = telemetry {
        telemetry.shutdown();
    }

    Ok(code)
}

/// Run one pass per tick until a shutdown signal arrives. A signal received
/// mid-pass takes effect once that pass has finished.
async fn run_scheduled(job: &CleanupJob, period: Duration) -> Result<()> {
    let stats = SweepStats::new();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = wait_for_shutdown_signal();
    tokio::pin!(shutdown);

    tracing::info!(
        interval = %humantime::format_duration(period),
        "Cleanup job scheduled, waiting for shutdown signal between runs"
    );

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                tracing::info!("Received shutdown signal, stopping cleanup job");
                break;
            }
            _ = ticker.tick() => {
                // Configuration is re-read every run
                let outcome = job.run(&CleanupConfig::figment()).await;
                match &outcome {
                    CleanupOutcome::Completed(result) => stats.record_completed(result),
                    CleanupOutcome::InvalidConfig(_) => stats.record_rejected(),
                    CleanupOutcome::Failed(_) => stats.record_failed(),
                }
                print_outcome(&outcome);
                stats.log_summary();
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &CleanupOutcome) {
    println!("{}", outcome.to_string().trim_end());
}

fn validate() -> ExitCode {
    match CleanupConfig::load() {
        Ok(_) => {
            println!("OK");
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{e}");
            ExitCode::from(INVALID_CONFIG_EXIT_CODE)
        }
    }
}

fn show_config(json: bool) -> ExitCode {
    let config = match CleanupConfig::load() {
        Ok(config) => config,
        Err(e) => {
            println!("{e}");
            return ExitCode::from(INVALID_CONFIG_EXIT_CODE);
        }
    };

    if json {
        match serde_json::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize configuration");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("Bucket:      {}", config.bucket_name);
        println!("Days:        {}", config.retention_days);
        println!("Dry run:     {}", config.dry_run);
        println!("File types:  {}", join_or_any(&config.file_type_suffixes));
        println!("Prefixes:    {}", join_or_any(&config.key_prefixes));
    }

    ExitCode::SUCCESS
}

fn join_or_any<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    let joined = values
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "(any)".to_string()
    } else {
        joined
    }
}
