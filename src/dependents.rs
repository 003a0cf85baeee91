//! Dependent-set deduplication.
//!
//! Two independent signals report repositories that use a project: the
//! GitHub dependency graph and a code search by project name. Both are
//! merged here into a single set of `org/name` identifiers.
//!
//! Comparison is case-insensitive. The casing kept for an identifier is the
//! first one seen, walking the sources in the order given and each source's
//! entries in their reported order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Dependency graph scrape result.
///
/// Decoded leniently from the collector's JSON; see [`GraphDependents::from_value`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDependents {
    /// Total reported by the graph (may include private repositories)
    #[serde(default)]
    pub total_dependents_number: Option<u64>,
    /// Public dependent repository names
    pub all_public_dependent_repos: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawGraph {
    #[serde(default)]
    total_dependents_number: Option<u64>,
    all_public_dependent_repos: Vec<RawGraphRepo>,
}

#[derive(Debug, Deserialize)]
struct RawGraphRepo {
    name: String,
}

impl GraphDependents {
    /// Decode a graph result, returning `None` when the expected
    /// `all_public_dependent_repos` substructure is missing or malformed.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match serde_json::from_value::<RawGraph>(value.clone()) {
            Ok(raw) => Some(Self {
                total_dependents_number: raw.total_dependents_number,
                all_public_dependent_repos: raw
                    .all_public_dependent_repos
                    .into_iter()
                    .map(|r| r.name)
                    .collect(),
            }),
            Err(e) => {
                debug!(error = %e, "Dependency graph result has no usable repos list");
                None
            }
        }
    }
}

/// Unique dependent identifiers, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentSet {
    ids: Vec<String>,
}

impl DependentSet {
    /// Union the given sources, dropping the project's own identifier and
    /// every identifier in `exclusions`.
    ///
    /// # Arguments
    ///
    /// * `sources` - Identifier lists, earlier sources win casing ties
    /// * `project_id` - The project's own `org/name`
    /// * `exclusions` - Further identifiers never counted as dependents
    pub fn build<S, I>(sources: S, project_id: &str, exclusions: &[String]) -> Self
    where
        S: IntoIterator<Item = I>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let excluded = exclusion_keys(project_id, exclusions);
        let mut seen: HashSet<String> = HashSet::new();
        let mut ids = Vec::new();

        for source in sources {
            for id in source {
                let id = id.as_ref().trim();
                if id.is_empty() {
                    continue;
                }
                let key = id.to_lowercase();
                if excluded.contains(&key) {
                    continue;
                }
                if seen.insert(key) {
                    ids.push(id.to_string());
                }
            }
        }

        Self { ids }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ids
    }
}

/// Dependent counts for one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependentStats {
    /// Unique dependents seen by the dependency graph, `None` if it had no data
    pub dependency_graph_count: Option<usize>,
    /// Total self-reported by the dependency graph
    pub dependency_graph_reported_total: Option<u64>,
    /// Unique dependents seen by code search, `None` if it had no data
    pub code_search_count: Option<usize>,
    /// Cardinality of the merged set
    pub total_dependents_count: usize,
    /// Merged identifiers
    pub dependents: Vec<String>,
}

impl DependentStats {
    /// Merge the graph and code-search signals for a project.
    ///
    /// Returns `None` when neither source produced data.
    pub fn merge(
        graph: Option<&GraphDependents>,
        code_search: Option<&[String]>,
        project_id: &str,
        exclusions: &[String],
    ) -> Option<Self> {
        if graph.is_none() && code_search.is_none() {
            return None;
        }

        let graph_repos: &[String] = graph
            .map(|g| g.all_public_dependent_repos.as_slice())
            .unwrap_or(&[]);
        let code_repos: &[String] = code_search.unwrap_or(&[]);

        let merged = DependentSet::build([graph_repos, code_repos], project_id, exclusions);

        Some(Self {
            dependency_graph_count: graph
                .map(|g| DependentSet::build([&g.all_public_dependent_repos], project_id, exclusions).len()),
            dependency_graph_reported_total: graph.and_then(|g| g.total_dependents_number),
            code_search_count: code_search
                .map(|c| DependentSet::build([c], project_id, exclusions).len()),
            total_dependents_count: merged.len(),
            dependents: merged.into_vec(),
        })
    }
}

fn exclusion_keys(project_id: &str, exclusions: &[String]) -> HashSet<String> {
    std::iter::once(project_id)
        .chain(exclusions.iter().map(String::as_str))
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_union_of_code_search_and_graph() {
        let code_search = strings(&["orgA/toolX", "orgB/toolY"]);
        let graph = GraphDependents::from_value(&json!({
            "all_public_dependent_repos": [{"name": "orgA/toolX"}, {"name": "orgC/toolZ"}]
        }))
        .expect("graph decodes");

        let stats = DependentStats::merge(Some(&graph), Some(&code_search), "proj/self", &[])
            .expect("has data");

        let got: HashSet<&str> = stats.dependents.iter().map(String::as_str).collect();
        let want: HashSet<&str> = ["orgA/toolX", "orgB/toolY", "orgC/toolZ"].into_iter().collect();
        assert_eq!(got, want);
        assert_eq!(stats.total_dependents_count, 3);
        assert_eq!(stats.dependency_graph_count, Some(2));
        assert_eq!(stats.code_search_count, Some(2));
    }

    #[test]
    fn test_union_with_itself_is_idempotent() {
        let list = strings(&["a/one", "b/two", "a/one"]);
        let once = DependentSet::build([&list], "p/self", &[]);
        let twice = DependentSet::build([&list, &list], "p/self", &[]);
        assert_eq!(once, twice);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_project_and_exclusions_removed_case_insensitively() {
        let list = strings(&["Proj/Self", "x/y", "WayScience/Software-Landscape-Analysis"]);
        let set = DependentSet::build(
            [&list],
            "proj/self",
            &strings(&["wayscience/software-landscape-analysis"]),
        );
        assert_eq!(set.into_vec(), strings(&["x/y"]));
    }

    #[test]
    fn test_first_source_wins_casing() {
        let graph = strings(&["Org/Tool"]);
        let code = strings(&["org/tool", "other/repo"]);
        let set = DependentSet::build([&graph, &code], "p/self", &[]);
        assert_eq!(set.into_vec(), strings(&["Org/Tool", "other/repo"]));

        let set = DependentSet::build([&code, &graph], "p/self", &[]);
        assert_eq!(set.into_vec(), strings(&["org/tool", "other/repo"]));
    }

    #[test]
    fn test_malformed_graph_is_no_data() {
        assert!(GraphDependents::from_value(&json!({"total_dependents_number": 4})).is_none());
        assert!(GraphDependents::from_value(&json!({"all_public_dependent_repos": "oops"})).is_none());
        assert!(GraphDependents::from_value(&json!(null)).is_none());
    }

    #[test]
    fn test_graph_keeps_reported_total() {
        let graph = GraphDependents::from_value(&json!({
            "total_dependents_number": 12,
            "all_public_dependent_repos": [{"name": "a/b", "stars": 3}]
        }))
        .expect("graph decodes");
        let stats = DependentStats::merge(Some(&graph), None, "p/self", &[]).expect("has data");
        assert_eq!(stats.dependency_graph_reported_total, Some(12));
        assert_eq!(stats.code_search_count, None);
        assert_eq!(stats.total_dependents_count, 1);
    }

    #[test]
    fn test_no_sources_is_none() {
        assert!(DependentStats::merge(None, None, "p/self", &[]).is_none());
    }
}
