//! Report artifacts.
//!
//! Every file carries the `Project Name` column so the tables join with
//! the rest of the landscape reports.

use crate::error::Result;
use crate::record::{PackageRegistry, ProjectRecord};
use crate::series::Series;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const PROJECTS_CSV: &str = "projects.csv";
pub const SERIES_CSV: &str = "series.csv";
pub const DEPENDENTS_CSV: &str = "dependents.csv";
pub const PROJECTS_JSON: &str = "projects.json";

/// One flat row per project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectRow {
    #[serde(rename = "Project Name")]
    pub project_name: String,
    #[serde(rename = "Project Repo URL")]
    pub repo_url: String,
    #[serde(rename = "Project Homepage")]
    pub homepage_url: Option<String>,
    #[serde(rename = "GitHub Repository ID")]
    pub repo_identifier: String,
    #[serde(rename = "Project Landscape Category")]
    pub category: String,
    #[serde(rename = "GitHub Stars")]
    pub stars: Option<u64>,
    #[serde(rename = "GitHub Forks")]
    pub forks: Option<u64>,
    #[serde(rename = "GitHub Watchers")]
    pub watchers: Option<u64>,
    #[serde(rename = "GitHub Open Issues")]
    pub open_issues: Option<u64>,
    #[serde(rename = "GitHub Network Count")]
    pub network_count: Option<u64>,
    #[serde(rename = "GitHub Contributor Total Count")]
    pub contributor_count: Option<u64>,
    #[serde(rename = "GitHub License Type")]
    pub license: Option<String>,
    #[serde(rename = "GitHub Commit Count")]
    pub commit_count: Option<u64>,
    #[serde(rename = "GitHub Detected Languages")]
    pub languages: Option<String>,
    #[serde(rename = "GitHub Repo Archived")]
    pub archived: Option<bool>,
    #[serde(rename = "Duration Created to Most Recent Commit")]
    pub days_created_to_most_recent_commit: Option<i64>,
    #[serde(rename = "Duration Created to Now")]
    pub days_created_to_now: Option<i64>,
    #[serde(rename = "Duration Most Recent Commit to Now")]
    pub days_most_recent_commit_to_now: Option<i64>,
    #[serde(rename = "GitHub Stargazers Count by Month Average")]
    pub stars_monthly_average: Option<f64>,
    #[serde(rename = "GitHub Stargazers Count by Month Median")]
    pub stars_monthly_median: Option<f64>,
    #[serde(rename = "GitHub Stargazers Count by Year Average")]
    pub stars_yearly_average: Option<f64>,
    #[serde(rename = "GitHub Stargazers Count by Year Median")]
    pub stars_yearly_median: Option<f64>,
    #[serde(rename = "GitHub Dependency Graph Dependents Count")]
    pub dependency_graph_count: Option<usize>,
    #[serde(rename = "GitHub Code Search Dependents Count")]
    pub code_search_count: Option<usize>,
    #[serde(rename = "GitHub Total Dependents Count")]
    pub total_dependents_count: Option<usize>,
    pub pypi_downloads_total: Option<u64>,
    pub pypi_downloads_monthly_average: Option<f64>,
    pub pypi_downloads_monthly_median: Option<f64>,
    pub conda_downloads_total: Option<u64>,
    pub conda_downloads_monthly_average: Option<f64>,
    pub conda_downloads_monthly_median: Option<f64>,
    pub total_pub_count: Option<usize>,
    pub total_pub_count_non_record_linked: Option<usize>,
}

impl From<&ProjectRecord> for ProjectRow {
    fn from(record: &ProjectRecord) -> Self {
        let repo = record.repository.as_ref();
        let stars = record.stargazers.as_ref();
        let deps = record.dependents.as_ref();
        let pubs = record.publications.as_ref();
        let pypi = record.downloads(PackageRegistry::Pypi);
        let conda = record.downloads(PackageRegistry::Conda);

        Self {
            project_name: record.project_name.clone(),
            repo_url: record.repo_url.clone(),
            homepage_url: record.homepage_url.clone(),
            repo_identifier: record.repo_identifier.clone(),
            category: record.category.join(", "),
            stars: repo.map(|r| r.stars),
            forks: repo.map(|r| r.forks),
            watchers: repo.map(|r| r.watchers),
            open_issues: repo.map(|r| r.open_issues),
            network_count: repo.and_then(|r| r.network_count),
            contributor_count: repo.map(|r| r.contributor_count),
            license: repo.and_then(|r| r.license.clone()),
            commit_count: repo.map(|r| r.commit_count),
            languages: repo.map(|r| r.languages.keys().cloned().collect::<Vec<_>>().join(", ")),
            archived: repo.map(|r| r.archived),
            days_created_to_most_recent_commit: repo.and_then(|r| r.days_created_to_most_recent_commit),
            days_created_to_now: repo.map(|r| r.days_created_to_now),
            days_most_recent_commit_to_now: repo.and_then(|r| r.days_most_recent_commit_to_now),
            stars_monthly_average: stars.and_then(|s| s.monthly.average),
            stars_monthly_median: stars.and_then(|s| s.monthly.median),
            stars_yearly_average: stars.and_then(|s| s.yearly.average),
            stars_yearly_median: stars.and_then(|s| s.yearly.median),
            dependency_graph_count: deps.and_then(|d| d.dependency_graph_count),
            code_search_count: deps.and_then(|d| d.code_search_count),
            total_dependents_count: deps.map(|d| d.total_dependents_count),
            pypi_downloads_total: pypi.map(|d| d.total),
            pypi_downloads_monthly_average: pypi.and_then(|d| d.monthly.as_ref()).and_then(|m| m.average),
            pypi_downloads_monthly_median: pypi.and_then(|d| d.monthly.as_ref()).and_then(|m| m.median),
            conda_downloads_total: conda.map(|d| d.total),
            conda_downloads_monthly_average: conda.and_then(|d| d.monthly.as_ref()).and_then(|m| m.average),
            conda_downloads_monthly_median: conda.and_then(|d| d.monthly.as_ref()).and_then(|m| m.median),
            total_pub_count: pubs.map(|p| p.total_pub_count),
            total_pub_count_non_record_linked: pubs.map(|p| p.total_pub_count_non_record_linked),
        }
    }
}

/// Long-format series row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesRow {
    #[serde(rename = "Project Name")]
    pub project_name: String,
    pub metric: String,
    pub period: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependentRow {
    #[serde(rename = "Project Name")]
    pub project_name: String,
    #[serde(rename = "Dependent")]
    pub dependent: String,
}

/// Flatten every dense series of every record
pub fn series_rows(records: &[ProjectRecord]) -> Vec<SeriesRow> {
    let mut rows = Vec::new();
    for record in records {
        let mut push = |metric: &str, series: &Series| {
            rows.extend(series.iter().map(|(period, count)| SeriesRow {
                project_name: record.project_name.clone(),
                metric: metric.to_string(),
                period: period.to_string(),
                count: *count,
            }));
        };

        if let Some(stars) = &record.stargazers {
            push("stars_by_month", &stars.by_month);
            push("stars_by_year", &stars.by_year);
            let running: Series = stars.cumulative_by_month().into_iter().collect();
            push("stars_cumulative_by_month", &running);
        }
        for registry in [PackageRegistry::Pypi, PackageRegistry::Conda] {
            if let Some(series) = record.downloads(registry).and_then(|d| d.by_month.as_ref()) {
                push(&format!("{}_downloads_by_month", registry), series);
            }
        }
    }
    rows
}

pub fn dependent_rows(records: &[ProjectRecord]) -> Vec<DependentRow> {
    records
        .iter()
        .flat_map(|record| {
            record.dependents.iter().flat_map(move |d| {
                d.dependents.iter().map(move |dependent| DependentRow {
                    project_name: record.project_name.clone(),
                    dependent: dependent.clone(),
                })
            })
        })
        .collect()
}

fn save_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    info!(path = ?path, rows = rows.len(), "Saved CSV");
    Ok(())
}

/// Write all artifacts into `dir`, creating it if needed.
///
/// Returns the paths written.
///
/// # Errors
///
/// Returns an I/O, CSV or JSON error when a file cannot be written.
pub fn write_artifacts(dir: &Path, records: &[ProjectRecord]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let projects: Vec<ProjectRow> = records.iter().map(ProjectRow::from).collect();
    let path = dir.join(PROJECTS_CSV);
    save_csv(&path, &projects)?;
    written.push(path);

    let path = dir.join(SERIES_CSV);
    save_csv(&path, &series_rows(records))?;
    written.push(path);

    let path = dir.join(DEPENDENTS_CSV);
    save_csv(&path, &dependent_rows(records))?;
    written.push(path);

    let path = dir.join(PROJECTS_JSON);
    fs::write(&path, serde_json::to_string_pretty(records)?)?;
    info!(path = ?path, records = records.len(), "Saved JSON");
    written.push(path);

    Ok(written)
}
