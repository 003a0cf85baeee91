//! Per-project aggregate record.
//!
//! A [`ProjectRecord`] starts from the project identity and gains one
//! section per source family through `with_*` steps. Each step consumes the
//! record and returns a new one; an absent section means the source had no
//! data and is never the same thing as zero.

use crate::dependents::DependentStats;
use crate::error::Result;
use crate::period::Period;
use crate::project::Project;
use crate::publications::PublicationStats;
use crate::raw::{DownloadBreakdowns, PackageDownloads, Referrer, RepositoryMetadata};
use crate::series::{self, Series};
use crate::stats::SeriesSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Package registries tracked for downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageRegistry {
    Pypi,
    Conda,
}

impl fmt::Display for PackageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageRegistry::Pypi => write!(f, "pypi"),
            PackageRegistry::Conda => write!(f, "conda"),
        }
    }
}

/// Repository statistics with derived durations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub stars: u64,
    pub forks: u64,
    pub watchers: u64,
    pub open_issues: u64,
    pub network_count: Option<u64>,
    pub contributor_count: u64,
    pub license: Option<String>,
    /// 0 when the source did not report commits
    pub commit_count: u64,
    pub languages: BTreeMap<String, u64>,
    pub size_kb: Option<u64>,
    pub archived: bool,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub topics: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub most_recent_commit_at: Option<DateTime<Utc>>,
    pub days_created_to_most_recent_commit: Option<i64>,
    pub days_created_to_now: i64,
    pub days_most_recent_commit_to_now: Option<i64>,
    pub top_referrers: Option<Vec<Referrer>>,
}

impl RepositoryStats {
    pub fn from_metadata(meta: &RepositoryMetadata, now: DateTime<Utc>) -> Self {
        let pushed = meta.pushed_at;
        Self {
            stars: meta.stars,
            forks: meta.forks,
            watchers: meta.watchers,
            open_issues: meta.open_issues,
            network_count: meta.network_count,
            contributor_count: meta
                .contributor_count
                .unwrap_or(meta.contributors.len() as u64),
            license: meta.license.clone(),
            commit_count: meta.commit_count.unwrap_or(0),
            languages: meta.languages.clone(),
            size_kb: meta.size_kb,
            archived: meta.archived,
            description: meta.description.clone(),
            homepage: meta.homepage.clone(),
            topics: meta.topics.clone(),
            created_at: meta.created_at,
            most_recent_commit_at: pushed,
            days_created_to_most_recent_commit: pushed.map(|p| (p - meta.created_at).num_days()),
            days_created_to_now: (now - meta.created_at).num_days(),
            days_most_recent_commit_to_now: pushed.map(|p| (now - p).num_days()),
            top_referrers: meta.top_referrers.clone(),
        }
    }
}

/// Stargazer series, dense from creation through the current period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StargazerStats {
    pub by_month: Series,
    pub by_year: Series,
    pub monthly: SeriesSummary,
    pub yearly: SeriesSummary,
}

impl StargazerStats {
    /// Bucket star events and densify them from `start` to `end` (months).
    pub fn compute(events: &[DateTime<Utc>], start: Period, end: Period) -> Result<Self> {
        let sparse = series::count_by_month(events);
        let by_month = series::densify(&sparse, start, end)?;
        let by_year = series::densify(&series::rollup_by_year(&sparse), start.to_year(), end.to_year())?;

        Ok(Self {
            monthly: SeriesSummary::of(&by_month),
            yearly: SeriesSummary::of(&by_year),
            by_month,
            by_year,
        })
    }

    /// Running star total by month
    pub fn cumulative_by_month(&self) -> Vec<(Period, u64)> {
        series::cumulative(&self.by_month)
    }
}

/// Package download statistics for one registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub total: u64,
    /// Dense monthly downloads, `None` without a breakdown or anchor month
    pub by_month: Option<Series>,
    pub monthly: Option<SeriesSummary>,
    /// Registry-specific breakdowns, passed through as reported
    pub breakdowns: DownloadBreakdowns,
}

impl DownloadStats {
    /// Returns `None` when the registry reported neither a total nor a
    /// monthly breakdown.
    ///
    /// # Arguments
    ///
    /// * `downloads` - Raw registry statistics
    /// * `range` - Densification range `(created month, current month)`, if known
    pub fn compute(downloads: &PackageDownloads, range: Option<(Period, Period)>) -> Result<Option<Self>> {
        let sparse = downloads.by_month.as_ref().map(|b| b.to_series());
        let total = match (downloads.total, &sparse) {
            (Some(total), _) => total,
            (None, Some(sparse)) => series::total(sparse),
            (None, None) => return Ok(None),
        };

        let by_month = match (sparse, range) {
            (Some(sparse), Some((start, end))) => Some(series::densify(&sparse, start, end)?),
            _ => None,
        };

        Ok(Some(Self {
            total,
            monthly: by_month.as_ref().map(SeriesSummary::of),
            by_month,
            breakdowns: downloads.breakdowns.clone(),
        }))
    }
}

/// Aggregate record for one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_name: String,
    pub repo_url: String,
    pub homepage_url: Option<String>,
    pub repo_identifier: String,
    pub category: Vec<String>,
    pub loi_focus: bool,
    pub created_month: Option<Period>,
    pub repository: Option<RepositoryStats>,
    pub stargazers: Option<StargazerStats>,
    pub dependents: Option<DependentStats>,
    pub pypi: Option<DownloadStats>,
    pub conda: Option<DownloadStats>,
    pub publications: Option<PublicationStats>,
}

impl ProjectRecord {
    pub fn new(project: &Project, repo_identifier: String, created_month: Option<Period>) -> Self {
        Self {
            project_name: project.name.clone(),
            repo_url: project.repo_url.clone(),
            homepage_url: project.homepage_url.clone(),
            repo_identifier,
            category: project.category.clone(),
            loi_focus: project.is_loi_focus(),
            created_month,
            repository: None,
            stargazers: None,
            dependents: None,
            pypi: None,
            conda: None,
            publications: None,
        }
    }

    pub fn with_repository(self, repository: Option<RepositoryStats>) -> Self {
        Self { repository, ..self }
    }

    pub fn with_stargazers(self, stargazers: Option<StargazerStats>) -> Self {
        Self { stargazers, ..self }
    }

    pub fn with_dependents(self, dependents: Option<DependentStats>) -> Self {
        Self { dependents, ..self }
    }

    pub fn with_downloads(self, registry: PackageRegistry, downloads: Option<DownloadStats>) -> Self {
        match registry {
            PackageRegistry::Pypi => Self { pypi: downloads, ..self },
            PackageRegistry::Conda => Self { conda: downloads, ..self },
        }
    }

    pub fn with_publications(self, publications: Option<PublicationStats>) -> Self {
        Self { publications, ..self }
    }

    pub fn downloads(&self, registry: PackageRegistry) -> Option<&DownloadStats> {
        match registry {
            PackageRegistry::Pypi => self.pypi.as_ref(),
            PackageRegistry::Conda => self.conda.as_ref(),
        }
    }
}
