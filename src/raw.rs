//! Typed raw inputs and the collection step.
//!
//! [`collect`] queries every [`SourceKind`] for a project, one after the
//! other. A source that errors, returns `null`, or returns a document that
//! does not decode is recorded as `None` and logged; it never aborts the
//! project.

use crate::dependents::GraphDependents;
use crate::period::Period;
use crate::project::Project;
use crate::publications::PublicationHit;
use crate::series::{self, Series, TimeSeriesPoint};
use crate::sources::{MetricsSource, SourceKind};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Repository metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    #[serde(default)]
    pub network_count: Option<u64>,
    /// Contributor logins
    #[serde(default)]
    pub contributors: Vec<String>,
    /// Contributor total when the collector reports a count instead of a list
    #[serde(default)]
    pub contributor_count: Option<u64>,
    /// SPDX identifier, `None` when undetectable
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub commit_count: Option<u64>,
    /// Language → bytes
    #[serde(default)]
    pub languages: BTreeMap<String, u64>,
    #[serde(default)]
    pub size_kb: Option<u64>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
    /// Most recent push/commit
    #[serde(default)]
    pub pushed_at: Option<DateTime<Utc>>,
    /// Traffic referrers, only reported to repository owners
    #[serde(default)]
    pub top_referrers: Option<Vec<Referrer>>,
}

/// One traffic referrer of a repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referrer {
    pub referrer: String,
    pub count: u64,
    pub uniques: u64,
}

/// Monthly download breakdown, either as a point list or a period map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonthlyBreakdown {
    Points(Vec<TimeSeriesPoint>),
    Map(BTreeMap<Period, u64>),
}

impl MonthlyBreakdown {
    pub fn to_series(&self) -> Series {
        match self {
            MonthlyBreakdown::Points(points) => series::from_points(points),
            MonthlyBreakdown::Map(map) => map.clone(),
        }
    }
}

/// Category → downloads
pub type Breakdown = BTreeMap<String, u64>;

/// Download breakdowns beyond the monthly series.
///
/// PyPI reports Python version, country and system; conda reports Python
/// version, package version and platform. Each registry leaves the others
/// unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DownloadBreakdowns {
    #[serde(default)]
    pub by_pyversion: Option<Breakdown>,
    #[serde(default)]
    pub by_country: Option<Breakdown>,
    #[serde(default, alias = "by_system_and_distro")]
    pub by_system: Option<Breakdown>,
    #[serde(default)]
    pub by_version: Option<Breakdown>,
    #[serde(default)]
    pub by_platform: Option<Breakdown>,
}

impl DownloadBreakdowns {
    pub fn is_empty(&self) -> bool {
        self.by_pyversion.is_none()
            && self.by_country.is_none()
            && self.by_system.is_none()
            && self.by_version.is_none()
            && self.by_platform.is_none()
    }
}

/// Package registry download statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageDownloads {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub by_month: Option<MonthlyBreakdown>,
    #[serde(flatten)]
    pub breakdowns: DownloadBreakdowns,
}

/// Everything collected for one project; `None` means the source had no data
#[derive(Debug, Clone, Default)]
pub struct RawMetrics {
    pub repository: Option<RepositoryMetadata>,
    pub stargazers: Option<Vec<DateTime<Utc>>>,
    pub dependency_graph: Option<GraphDependents>,
    pub code_search: Option<Vec<String>>,
    pub pypi: Option<PackageDownloads>,
    pub conda: Option<PackageDownloads>,
    pub scholar: Option<Vec<PublicationHit>>,
    pub preprints: Option<Vec<PublicationHit>>,
}

impl RawMetrics {
    /// Number of sources that produced data
    pub fn available_sources(&self) -> usize {
        [
            self.repository.is_some(),
            self.stargazers.is_some(),
            self.dependency_graph.is_some(),
            self.code_search.is_some(),
            self.pypi.is_some(),
            self.conda.is_some(),
            self.scholar.is_some(),
            self.preprints.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count()
    }
}

/// Query every source for `project`, sequentially.
pub async fn collect<S: MetricsSource>(source: &S, project: &Project) -> RawMetrics {
    info!(project = %project.name, "Collecting raw metrics");

    let raw = RawMetrics {
        repository: fetch_typed(source, project, SourceKind::Repository).await,
        stargazers: fetch_typed(source, project, SourceKind::Stargazers).await,
        dependency_graph: fetch_value(source, project, SourceKind::DependencyGraph)
            .await
            .and_then(|value| GraphDependents::from_value(&value)),
        code_search: fetch_typed(source, project, SourceKind::CodeSearch).await,
        pypi: fetch_typed(source, project, SourceKind::PypiDownloads).await,
        conda: fetch_typed(source, project, SourceKind::CondaDownloads).await,
        scholar: fetch_typed(source, project, SourceKind::Scholar).await,
        preprints: fetch_typed(source, project, SourceKind::Preprints).await,
    };

    info!(
        project = %project.name,
        available = raw.available_sources(),
        total = SourceKind::ALL.len(),
        "Collection complete"
    );
    raw
}

async fn fetch_value<S: MetricsSource>(
    source: &S,
    project: &Project,
    kind: SourceKind,
) -> Option<serde_json::Value> {
    match source.fetch(project, kind).await {
        Ok(serde_json::Value::Null) => {
            debug!(project = %project.name, source = %kind, "Source returned null");
            None
        }
        Ok(value) => Some(value),
        Err(e) => {
            warn!(project = %project.name, source = %kind, error = %e, "Source unavailable, recording null");
            None
        }
    }
}

async fn fetch_typed<S: MetricsSource, T: DeserializeOwned>(
    source: &S,
    project: &Project,
    kind: SourceKind,
) -> Option<T> {
    let value = fetch_value(source, project, kind).await?;
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(project = %project.name, source = %kind, error = %e, "Malformed source data, recording null");
            None
        }
    }
}
