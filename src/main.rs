//! landscape - Software Landscape Metrics
//!
//! Aggregates repository, dependent, download and publication metrics for a
//! list of projects into joinable report tables.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! landscape aggregate --projects projects.json --snapshots ./snapshots --output ./report
//! landscape merge --targets targets.json --candidates found.json --output projects.json
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! landscape serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use landscape_metrics::{
    aggregate::{self, BatchReport, ProjectFailure},
    config::{AggregateConfig, AggregateContext},
    export,
    project::{self, Manifest, Project},
    record::ProjectRecord,
    sources::{HttpSnapshot, MetricsSource, SnapshotDir, StaticSource},
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Software Landscape Metrics - cross-source aggregation
#[derive(Parser)]
#[command(name = "landscape")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate metrics for every project in a manifest
    Aggregate {
        /// Project manifest (JSON)
        #[arg(long)]
        projects: PathBuf,

        /// Snapshot directory or HTTP(S) mirror URL
        #[arg(long)]
        snapshots: String,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Publication title similarity threshold (0-100)
        #[arg(long, default_value_t = AggregateConfig::default().similarity_threshold)]
        threshold: u8,

        /// Additional dependents to exclude (org/name), repeatable
        #[arg(long)]
        exclude: Vec<String>,

        /// Skip the landscape filter (small, archived or code-less repositories)
        #[arg(long)]
        keep_all: bool,

        /// Only aggregate loi-focus projects
        #[arg(long)]
        loi_only: bool,

        /// Fixed "now" timestamp (RFC 3339), defaults to the current time
        #[arg(long)]
        now: Option<String>,
    },

    /// Merge discovered candidates into a target project manifest
    Merge {
        /// Target project manifest (JSON)
        #[arg(long)]
        targets: PathBuf,

        /// Candidate project manifest (JSON)
        #[arg(long)]
        candidates: PathBuf,

        /// Merged manifest path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    match cli.command {
        Commands::Aggregate {
            projects,
            snapshots,
            output,
            threshold,
            exclude,
            keep_all,
            loi_only,
            now,
        } => {
            let now = match now {
                Some(s) => DateTime::parse_from_rfc3339(&s)
                    .with_context(|| format!("Invalid --now timestamp '{}'", s))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };

            let mut config = AggregateConfig {
                similarity_threshold: threshold,
                loi_only,
                ..Default::default()
            };
            config.excluded_dependents.extend(exclude);
            if keep_all {
                config.filter = None;
            }

            let ctx = AggregateContext::new(now, config).context("Invalid aggregation settings")?;
            run_aggregate(projects, snapshots, output, ctx).await
        }
        Commands::Merge {
            targets,
            candidates,
            output,
        } => run_merge(targets, candidates, output),
        Commands::Serve { port, host } => run_server(host, port).await,
    }
}

// ============================================================================
// Aggregation Pipeline
// ============================================================================

async fn run_aggregate(
    projects_path: PathBuf,
    snapshots: String,
    output_dir: PathBuf,
    ctx: AggregateContext,
) -> Result<()> {
    let manifest = Manifest::load(&projects_path)
        .with_context(|| format!("Failed to load project manifest {:?}", projects_path))?;

    println!("\n{}", "=".repeat(60));
    println!("Aggregating {} projects", manifest.projects.len());
    println!("Snapshots: {}", snapshots);
    println!("{}\n", "=".repeat(60));

    let report = if snapshots.starts_with("http://") || snapshots.starts_with("https://") {
        let source = HttpSnapshot::new(&snapshots).context("Failed to create snapshot client")?;
        run_with_source(&source, &manifest.projects, &ctx).await
    } else {
        run_with_source(&SnapshotDir::new(&snapshots), &manifest.projects, &ctx).await
    };

    let written = export::write_artifacts(&output_dir, &report.records)
        .with_context(|| format!("Failed to write artifacts to {:?}", output_dir))?;

    println!("\n{}", "=".repeat(60));
    println!("Aggregation Complete!");
    println!("Records: {}", report.records.len());
    println!("Failures: {}", report.failures.len());
    for failure in &report.failures {
        println!("  - {}: {}", failure.project_name, failure.error);
    }
    for path in &written {
        println!("Saved: {:?}", path);
    }
    println!("{}", "=".repeat(60));

    Ok(())
}

async fn run_with_source<S: MetricsSource>(source: &S, projects: &[Project], ctx: &AggregateContext) -> BatchReport {
    let report = aggregate::run_batch(source, projects, ctx).await;
    if !report.failures.is_empty() {
        warn!(failures = report.failures.len(), "Some projects could not be aggregated");
    }
    report
}

// ============================================================================
// Manifest Merge
// ============================================================================

fn run_merge(targets: PathBuf, candidates: PathBuf, output: PathBuf) -> Result<()> {
    let targets = Manifest::load(&targets).with_context(|| format!("Failed to load targets {:?}", targets))?;
    let candidates =
        Manifest::load(&candidates).with_context(|| format!("Failed to load candidates {:?}", candidates))?;

    let merged = Manifest {
        projects: project::merge_landscape_entries(targets.projects, candidates.projects),
    };
    merged
        .save(&output)
        .with_context(|| format!("Failed to save merged manifest {:?}", output))?;

    println!("Merged manifest: {} projects", merged.projects.len());
    println!("Saved: {:?}", output);
    Ok(())
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16) -> Result<()> {
    info!(host = %host, port = port, "Starting HTTP server");
    println!("Starting server at http://{}:{}", host, port);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/aggregate", post(aggregate_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Aggregation request body
#[derive(Debug, Deserialize)]
struct AggregateRequest {
    projects: Vec<Project>,
    /// Raw documents keyed by project name, then source kind
    #[serde(default)]
    snapshots: StaticSource,
    threshold: Option<u8>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    keep_all: bool,
    now: Option<DateTime<Utc>>,
}

/// Aggregation response
#[derive(Debug, Serialize)]
struct AggregateResponse {
    status: String,
    records: Vec<ProjectRecord>,
    failures: Vec<ProjectFailure>,
}

/// Aggregation endpoint handler
async fn aggregate_handler(Json(req): Json<AggregateRequest>) -> Json<AggregateResponse> {
    info!(projects = req.projects.len(), "Aggregate request");

    let mut config = AggregateConfig::default();
    if let Some(threshold) = req.threshold {
        config.similarity_threshold = threshold;
    }
    config.excluded_dependents.extend(req.exclude);
    if req.keep_all {
        config.filter = None;
    }

    let ctx = match AggregateContext::new(req.now.unwrap_or_else(Utc::now), config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = %e, "Invalid aggregation settings");
            return Json(AggregateResponse {
                status: format!("error: {}", e),
                records: vec![],
                failures: vec![],
            });
        }
    };

    let report = aggregate::run_batch(&req.snapshots, &req.projects, &ctx).await;
    Json(AggregateResponse {
        status: "success".to_string(),
        records: report.records,
        failures: report.failures,
    })
}
