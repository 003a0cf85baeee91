//! Landscape curation: filtering out inactive repositories and ranking the
//! remainder for reports.

use crate::record::ProjectRecord;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Drops repositories that are too small, archived, or have no code.
///
/// Records without repository stats are always kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandscapeFilter {
    pub min_size_kb: u64,
    pub exclude_archived: bool,
    pub require_languages: bool,
}

impl Default for LandscapeFilter {
    fn default() -> Self {
        Self {
            min_size_kb: 50,
            exclude_archived: true,
            require_languages: true,
        }
    }
}

impl LandscapeFilter {
    pub fn retains(&self, record: &ProjectRecord) -> bool {
        let Some(repo) = &record.repository else {
            return true;
        };

        if repo.size_kb.is_some_and(|size| size < self.min_size_kb) {
            return false;
        }
        if self.exclude_archived && repo.archived {
            return false;
        }
        if self.require_languages && repo.languages.is_empty() {
            return false;
        }
        true
    }
}

/// Descending order with `None` last
fn desc<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort records for reporting.
///
/// Keys: stars, watchers, contributors, forks, open issues (descending),
/// most recent commit (newest first), then created → most recent commit
/// duration (longest first). Missing values sort last. The sort is stable.
pub fn rank_records(records: &mut [ProjectRecord]) {
    records.sort_by(|a, b| {
        let (ra, rb) = (a.repository.as_ref(), b.repository.as_ref());
        desc(ra.map(|r| r.stars), rb.map(|r| r.stars))
            .then_with(|| desc(ra.map(|r| r.watchers), rb.map(|r| r.watchers)))
            .then_with(|| desc(ra.map(|r| r.contributor_count), rb.map(|r| r.contributor_count)))
            .then_with(|| desc(ra.map(|r| r.forks), rb.map(|r| r.forks)))
            .then_with(|| desc(ra.map(|r| r.open_issues), rb.map(|r| r.open_issues)))
            .then_with(|| {
                desc(
                    ra.and_then(|r| r.most_recent_commit_at),
                    rb.and_then(|r| r.most_recent_commit_at),
                )
            })
            .then_with(|| {
                desc(
                    ra.and_then(|r| r.days_created_to_most_recent_commit),
                    rb.and_then(|r| r.days_created_to_most_recent_commit),
                )
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use crate::record::RepositoryStats;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn record(name: &str, stars: Option<u64>) -> ProjectRecord {
        let project = Project::new(name, format!("https://github.com/o/{}", name));
        let base = ProjectRecord::new(&project, format!("o/{}", name), None);
        let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).single().expect("valid date");
        base.with_repository(stars.map(|stars| RepositoryStats {
            stars,
            forks: 0,
            watchers: 0,
            open_issues: 0,
            network_count: None,
            contributor_count: 0,
            license: None,
            commit_count: 0,
            languages: BTreeMap::from([("Rust".to_string(), 100)]),
            size_kb: Some(100),
            archived: false,
            description: None,
            homepage: None,
            topics: Vec::new(),
            created_at: created,
            most_recent_commit_at: None,
            days_created_to_most_recent_commit: None,
            days_created_to_now: 0,
            days_most_recent_commit_to_now: None,
            top_referrers: None,
        }))
    }

    #[test]
    fn test_filter_rules() {
        let filter = LandscapeFilter::default();
        assert!(filter.retains(&record("ok", Some(1))));
        assert!(filter.retains(&record("no-repo-data", None)));

        let mut small = record("small", Some(1));
        if let Some(repo) = small.repository.as_mut() {
            repo.size_kb = Some(10);
        }
        assert!(!filter.retains(&small));

        let mut archived = record("archived", Some(1));
        if let Some(repo) = archived.repository.as_mut() {
            repo.archived = true;
        }
        assert!(!filter.retains(&archived));

        let mut no_code = record("no-code", Some(1));
        if let Some(repo) = no_code.repository.as_mut() {
            repo.languages.clear();
        }
        assert!(!filter.retains(&no_code));
    }

    #[test]
    fn test_rank_by_stars_with_missing_last() {
        let mut records = vec![
            record("none", None),
            record("low", Some(3)),
            record("high", Some(40)),
        ];
        rank_records(&mut records);
        let names: Vec<&str> = records.iter().map(|r| r.project_name.as_str()).collect();
        assert_eq!(names, vec!["high", "low", "none"]);
    }

    #[test]
    fn test_rank_tie_breaks_on_recent_commit() {
        let mut older = record("older", Some(5));
        let mut newer = record("newer", Some(5));
        if let Some(repo) = older.repository.as_mut() {
            repo.most_recent_commit_at = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).single();
        }
        if let Some(repo) = newer.repository.as_mut() {
            repo.most_recent_commit_at = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).single();
        }
        let mut records = vec![older, newer];
        rank_records(&mut records);
        assert_eq!(records[0].project_name, "newer");
    }
}
