//! # landscape-metrics
//!
//! Cross-source metrics aggregation for a software landscape: repository
//! statistics, dependents, package downloads and publication mentions,
//! merged into one record per project.
//!
//! ## Modules
//!
//! - [`sources`] - Collector interface and snapshot-backed sources
//! - [`raw`] - Typed raw inputs and the collection step
//! - [`period`] / [`series`] - Calendar periods and dense time series
//! - [`stats`] - Average and median over series
//! - [`dependents`] - Dependent-set deduplication
//! - [`publications`] - Exact and pairwise publication title dedup
//! - [`record`] - Per-project aggregate record
//! - [`aggregate`] - Per-project aggregation and the batch runner
//! - [`curate`] - Landscape filtering and ranking
//! - [`export`] - CSV and JSON report artifacts
//! - [`project`] / [`config`] - Inputs and run settings
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use landscape_metrics::{aggregate, config::{AggregateConfig, AggregateContext}, project::Manifest, sources::SnapshotDir};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manifest = Manifest::load(std::path::Path::new("projects.json"))?;
//!     let ctx = AggregateContext::new(chrono::Utc::now(), AggregateConfig::default())?;
//!     let report = aggregate::run_batch(&SnapshotDir::new("snapshots"), &manifest.projects, &ctx).await;
//!     println!("{} records, {} failures", report.records.len(), report.failures.len());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod curate;
pub mod dependents;
pub mod error;
pub mod export;
pub mod period;
pub mod project;
pub mod publications;
pub mod raw;
pub mod record;
pub mod series;
pub mod sources;
pub mod stats;

pub use error::{LandscapeError, Result};
