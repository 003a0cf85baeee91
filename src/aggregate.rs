//! Per-project aggregation and the batch runner.
//!
//! Projects are processed one at a time: collect raw metrics, then build
//! the [`ProjectRecord`] section by section. A project whose record cannot
//! be built (schema violation) is reported as a failure; the batch always
//! runs to the end.

use crate::config::AggregateContext;
use crate::curate::rank_records;
use crate::dependents::DependentStats;
use crate::error::{LandscapeError, Result};
use crate::period::Period;
use crate::project::Project;
use crate::publications::PublicationStats;
use crate::raw::{self, RawMetrics};
use crate::record::{DownloadStats, PackageRegistry, ProjectRecord, RepositoryStats, StargazerStats};
use crate::sources::MetricsSource;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{info, warn};

/// A project that could not be aggregated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFailure {
    pub project_name: String,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub records: Vec<ProjectRecord>,
    pub failures: Vec<ProjectFailure>,
}

/// Build the aggregate record for one project from its raw metrics.
///
/// # Errors
///
/// Returns a validation or parse error when the project itself is
/// malformed (empty name, repository URL without `org/name`).
pub fn aggregate_project(project: &Project, raw: &RawMetrics, ctx: &AggregateContext) -> Result<ProjectRecord> {
    if project.name.trim().is_empty() {
        return Err(LandscapeError::Validation(format!(
            "Project with repository '{}' has an empty name",
            project.repo_url
        )));
    }
    let repo_id = project.repo_identifier()?;
    let config = &ctx.config;

    let created_month = project
        .created_month
        .map(|m| m.first_month())
        .or_else(|| raw.repository.as_ref().map(|r| Period::month_of(&r.created_at)));
    let now_month = Period::month_of(&ctx.now);
    let range = created_month.map(|start| (start, now_month));

    let stargazers = match (&raw.stargazers, range) {
        (Some(events), Some((start, end))) => Some(StargazerStats::compute(events, start, end)?),
        _ => None,
    };

    let pypi = match &raw.pypi {
        Some(downloads) => DownloadStats::compute(downloads, range)?,
        None => None,
    };
    let conda = match &raw.conda {
        Some(downloads) => DownloadStats::compute(downloads, range)?,
        None => None,
    };

    let dependents = DependentStats::merge(
        raw.dependency_graph.as_ref(),
        raw.code_search.as_deref(),
        &repo_id,
        &config.excluded_dependents,
    );

    let publications = PublicationStats::compute(
        raw.scholar.as_deref(),
        raw.preprints.as_deref(),
        &project.name,
        created_month.map(|m| m.calendar_year()),
        config.similarity_threshold,
    )?;

    let record = ProjectRecord::new(project, repo_id, created_month)
        .with_repository(raw.repository.as_ref().map(|m| RepositoryStats::from_metadata(m, ctx.now)))
        .with_stargazers(stargazers)
        .with_dependents(dependents)
        .with_downloads(PackageRegistry::Pypi, pypi)
        .with_downloads(PackageRegistry::Conda, conda)
        .with_publications(publications);

    Ok(record)
}

/// Collect and aggregate every project, sequentially.
///
/// Failures are recorded in the report; nothing propagates out of the
/// batch. The configured landscape filter and ranking are applied to the
/// successful records.
pub async fn run_batch<S: MetricsSource>(source: &S, projects: &[Project], ctx: &AggregateContext) -> BatchReport {
    let mut report = BatchReport::default();
    let mut seen_names: HashSet<&str> = HashSet::new();

    let selected: Vec<&Project> = projects
        .iter()
        .filter(|p| !ctx.config.loi_only || p.is_loi_focus())
        .collect();

    info!(projects = selected.len(), "Starting batch aggregation");

    for project in selected {
        if !seen_names.insert(project.name.as_str()) {
            warn!(project = %project.name, "Duplicate project name, skipping");
            report.failures.push(ProjectFailure {
                project_name: project.name.clone(),
                error: "Duplicate project name in batch".to_string(),
            });
            continue;
        }

        let raw = raw::collect(source, project).await;
        match aggregate_project(project, &raw, ctx) {
            Ok(record) => report.records.push(record),
            Err(e) => {
                warn!(project = %project.name, error = %e, "Aggregation failed");
                report.failures.push(ProjectFailure {
                    project_name: project.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    if let Some(filter) = &ctx.config.filter {
        let (kept, dropped): (Vec<ProjectRecord>, Vec<ProjectRecord>) =
            report.records.into_iter().partition(|r| filter.retains(r));
        for record in &dropped {
            info!(
                project = %record.project_name,
                loi_focus = record.loi_focus,
                "Dropped by landscape filter"
            );
        }
        info!(kept = kept.len(), dropped = dropped.len(), "Applied landscape filter");
        report.records = kept;
    }
    rank_records(&mut report.records);

    info!(
        records = report.records.len(),
        failures = report.failures.len(),
        "Batch aggregation complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AggregateConfig;
    use crate::sources::{SourceKind, StaticSource};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    fn ctx() -> AggregateContext {
        let now = Utc.with_ymd_and_hms(2021, 6, 15, 0, 0, 0).single().expect("valid date");
        AggregateContext::new(now, AggregateConfig::default()).expect("valid config")
    }

    fn repository(stars: u64) -> Value {
        json!({
            "stars": stars, "forks": 1, "watchers": 2, "open_issues": 0,
            "created_at": "2021-01-10T00:00:00Z",
            "pushed_at": "2021-06-01T00:00:00Z",
            "size_kb": 500,
            "languages": {"Python": 4096}
        })
    }

    fn full_source(name: &str, stars: u64) -> StaticSource {
        add_project(StaticSource::new(), name, stars)
    }

    fn add_project(source: StaticSource, name: &str, stars: u64) -> StaticSource {
        source
            .with(name, SourceKind::Repository, repository(stars))
            .with(name, SourceKind::Stargazers, json!(["2021-03-02T10:00:00Z", "2021-03-09T10:00:00Z"]))
            .with(name, SourceKind::CodeSearch, json!(["orgA/toolX", "orgB/toolY"]))
            .with(
                name,
                SourceKind::DependencyGraph,
                json!({"total_dependents_number": 2,
                       "all_public_dependent_repos": [{"name": "orgA/toolX"}, {"name": "orgC/toolZ"}]}),
            )
            .with(name, SourceKind::PypiDownloads, json!({"total": 40, "by_month": [{"period": "2021-02", "count": 40}]}))
            .with(name, SourceKind::CondaDownloads, json!({"by_month": {"2021-04": 3}}))
            .with(name, SourceKind::Scholar, json!([{"title": "Paper A"}, {"title": "Paper A"}]))
            .with(name, SourceKind::Preprints, json!([{"title": "Paper B"}]))
    }

    #[test]
    fn test_aggregate_project_without_sources() {
        let project = Project::new("tool", "https://github.com/proj/self");
        let raw = RawMetrics::default();
        let record = aggregate_project(&project, &raw, &ctx()).expect("aggregates");
        assert_eq!(record.repo_identifier, "proj/self");
        assert!(record.repository.is_none());
        assert!(record.stargazers.is_none());
        assert!(record.dependents.is_none());
        assert!(record.pypi.is_none());
        assert!(record.publications.is_none());
    }

    #[tokio::test]
    async fn test_aggregate_dense_series_from_repository_creation() {
        let project = Project::new("tool", "https://github.com/proj/self");
        let source = full_source("tool", 10);
        let raw = raw::collect(&source, &project).await;
        let record = aggregate_project(&project, &raw, &ctx()).expect("aggregates");

        assert_eq!(record.created_month.map(|m| m.to_string()), Some("2021-01".to_string()));

        let stars = record.stargazers.expect("has stargazers");
        let months: Vec<String> = stars.by_month.keys().map(|k| k.to_string()).collect();
        assert_eq!(months, vec!["2021-01", "2021-02", "2021-03", "2021-04", "2021-05", "2021-06"]);
        assert_eq!(stars.monthly.total, 2);

        let dependents = record.dependents.expect("has dependents");
        assert_eq!(dependents.total_dependents_count, 3);

        let pypi = record.pypi.expect("has pypi");
        assert_eq!(pypi.total, 40);
        assert_eq!(pypi.by_month.map(|m| m.len()), Some(6));

        let conda = record.conda.expect("has conda");
        assert_eq!(conda.total, 3);

        let pubs = record.publications.expect("has publications");
        assert_eq!(pubs.total_pub_count, 2);
        assert_eq!(pubs.scholar_count, Some(2));
    }

    #[tokio::test]
    async fn test_year_only_created_month_starts_in_january() {
        let mut project = Project::new("tool", "https://github.com/proj/self");
        project.created_month = Some(Period::Year(2020));
        let source = StaticSource::new()
            .with("tool", SourceKind::Stargazers, json!(["2020-03-02T10:00:00Z"]))
            .with("tool", SourceKind::Scholar, json!([{"title": "Paper A", "year": 2020}]));

        let report = run_batch(&source, &[project], &ctx()).await;
        assert!(report.failures.is_empty());
        assert_eq!(report.records.len(), 1);

        let record = &report.records[0];
        assert_eq!(record.created_month, Period::month(2020, 1).ok());
        let stars = record.stargazers.as_ref().expect("has stargazers");
        assert_eq!(stars.by_month.keys().next().map(|k| k.to_string()), Some("2020-01".to_string()));
        assert_eq!(stars.by_month.len(), 18);
        assert_eq!(record.publications.as_ref().map(|p| p.total_pub_count), Some(1));
    }

    #[tokio::test]
    async fn test_batch_tolerates_single_source_failure() {
        let projects = vec![
            Project::new("alpha", "https://github.com/o/alpha"),
            Project::new("beta", "https://github.com/o/beta"),
            Project::new("gamma", "https://github.com/o/gamma"),
        ];

        let mut source = add_project(add_project(full_source("alpha", 30), "beta", 20), "gamma", 10);
        source.insert("beta", SourceKind::PypiDownloads, json!("rate limited"));

        let report = run_batch(&source, &projects, &ctx()).await;
        assert!(report.failures.is_empty());
        assert_eq!(report.records.len(), 3);

        let names: Vec<&str> = report.records.iter().map(|r| r.project_name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta", "gamma"]);

        for record in &report.records {
            assert!(record.repository.is_some());
            assert!(record.conda.is_some());
            assert!(record.publications.is_some());
            if record.project_name == "beta" {
                assert!(record.pypi.is_none());
            } else {
                assert!(record.pypi.is_some());
            }
        }
    }

    #[tokio::test]
    async fn test_batch_records_schema_violations() {
        let projects = vec![
            Project::new("good", "https://github.com/o/good"),
            Project::new("bad-url", "not a url"),
            Project::new("good", "https://github.com/o/good-again"),
            Project::new("", "https://github.com/o/nameless"),
        ];
        let report = run_batch(&StaticSource::new(), &projects, &ctx()).await;

        assert_eq!(report.records.len(), 1);
        let failed: Vec<&str> = report.failures.iter().map(|f| f.project_name.as_str()).collect();
        assert_eq!(failed, vec!["bad-url", "good", ""]);
    }

    #[tokio::test]
    async fn test_batch_loi_only_and_filter() {
        let mut focus = Project::new("focus", "https://github.com/o/focus");
        focus.category.push("loi-focus".to_string());
        let other = Project::new("other", "https://github.com/o/other");

        let mut source = full_source("focus", 5);
        source.insert(
            "focus",
            SourceKind::Repository,
            json!({"stars": 5, "forks": 0, "watchers": 0, "open_issues": 0,
                   "created_at": "2021-01-10T00:00:00Z", "size_kb": 5, "languages": {}}),
        );

        let mut context = ctx();
        context.config.loi_only = true;
        let report = run_batch(&source, &[focus.clone(), other], &context).await;
        // the only selected project is too small for the default filter
        assert!(report.records.is_empty());

        context.config.filter = None;
        let report = run_batch(&source, &[focus], &context).await;
        assert_eq!(report.records.len(), 1);
        assert!(report.records[0].loi_focus);
    }
}
