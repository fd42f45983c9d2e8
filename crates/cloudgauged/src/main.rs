//! cloudgauged — the cloudgauge daemon.
//!
//! Single binary that assembles the exporter:
//! - Metric declarations parsed from a YAML document
//! - Replay client serving canned response documents
//! - Collector + scheduler (global interval or one task per metric)
//! - HTTP server exposing `/metrics`, `/healthz`, `/api/v1/specs`
//!
//! # Usage
//!
//! ```text
//! cloudgauged serve --metrics-file metrics.yaml --responses-dir ./responses \
//!     --label account=prod --port 9105
//! cloudgauged check --metrics-file metrics.yaml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use cloudgauge_collect::{Collector, JmesPathEval, ReplayClient, Scheduler};
use cloudgauge_spec::parse_metrics;

#[derive(Parser)]
#[command(name = "cloudgauged", about = "cloudgauge daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the exporter: refresh metrics on a cadence and serve scrapes.
    Serve {
        /// YAML document declaring the metrics to export.
        #[arg(long)]
        metrics_file: PathBuf,

        /// Directory of canned response documents (`<service>/<operation>.json`).
        #[arg(long)]
        responses_dir: PathBuf,

        /// Port to listen on.
        #[arg(long, default_value = "9105")]
        port: u16,

        /// Global refresh interval in seconds.
        #[arg(long, default_value = "300")]
        refresh_secs: u64,

        /// Schedule each metric on its own declared interval instead of the
        /// shared one.
        #[arg(long)]
        per_metric: bool,

        /// Extra label attached to every exported sample, as `name=value`.
        /// May be repeated; order is preserved.
        #[arg(long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },

    /// Parse and validate a metrics document, then exit.
    Check {
        /// YAML document declaring the metrics to export.
        #[arg(long)]
        metrics_file: PathBuf,
    },
}

/// Parse a `name=value` pair from the command line.
fn parse_label(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => {
            Ok((name.to_string(), value.to_string()))
        }
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,cloudgauge=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            metrics_file,
            responses_dir,
            port,
            refresh_secs,
            per_metric,
            labels,
        } => {
            run_serve(
                metrics_file,
                responses_dir,
                port,
                refresh_secs,
                per_metric,
                labels,
            )
            .await
        }
        Command::Check { metrics_file } => run_check(metrics_file),
    }
}

fn load_specs(path: &PathBuf) -> anyhow::Result<Vec<cloudgauge_spec::MetricSpec>> {
    let document = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    Ok(parse_metrics(&document)?)
}

fn run_check(metrics_file: PathBuf) -> anyhow::Result<()> {
    let specs = load_specs(&metrics_file)?;
    for spec in &specs {
        println!(
            "{}  {}.{}  labels=[{}]  every {}s",
            spec.name(),
            spec.service(),
            spec.call().operation(),
            spec.label_names().join(","),
            spec.refresh_interval().as_secs(),
        );
    }
    println!("{} metric(s) OK", specs.len());
    Ok(())
}

async fn run_serve(
    metrics_file: PathBuf,
    responses_dir: PathBuf,
    port: u16,
    refresh_secs: u64,
    per_metric: bool,
    labels: Vec<(String, String)>,
) -> anyhow::Result<()> {
    info!("cloudgauge daemon starting");

    let specs = Arc::new(load_specs(&metrics_file)?);
    info!(
        metrics = specs.len(),
        file = %metrics_file.display(),
        "metric declarations loaded"
    );

    let (extra_label_names, extra_label_values): (Vec<String>, Vec<String>) =
        labels.into_iter().unzip();

    // ── Initialize the pipeline ────────────────────────────────

    let client = ReplayClient::new(&responses_dir);
    info!(dir = %responses_dir.display(), "replay client initialized");

    let collector = Arc::new(Collector::new(
        specs.clone(),
        client,
        JmesPathEval,
        extra_label_values,
    ));

    // First snapshot before the server accepts scrapes, so a scraper never
    // sees the daemon's declared metrics with zero rows merely because the
    // first interval has not elapsed yet.
    let failures = collector.refresh_all().await;
    info!(failures, "initial refresh complete");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start the scheduler ────────────────────────────────────

    let scheduler = Scheduler::new(collector.clone());
    let mut task_handles = Vec::new();
    if per_metric {
        task_handles.extend(scheduler.spawn_per_metric(&shutdown_rx));
    } else {
        let interval = Duration::from_secs(refresh_secs);
        task_handles.push(tokio::spawn(async move {
            scheduler.run_global(interval, shutdown_rx).await;
        }));
    }

    // ── Start the HTTP server ──────────────────────────────────

    let state = cloudgauge_api::ApiState {
        specs,
        extra_label_names,
        store: collector.store(),
    };
    let router = cloudgauge_api::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "scrape endpoint starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    // Wait for background tasks.
    for handle in task_handles {
        let _ = handle.await;
    }

    info!("cloudgauge daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_parser_accepts_name_value_pairs() {
        assert_eq!(
            parse_label("account=prod").unwrap(),
            ("account".to_string(), "prod".to_string())
        );
        assert_eq!(
            parse_label("region=").unwrap(),
            ("region".to_string(), String::new())
        );
    }

    #[test]
    fn label_parser_rejects_malformed_pairs() {
        assert!(parse_label("no-equals").is_err());
        assert!(parse_label("=value").is_err());
    }
}
