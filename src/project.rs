//! Tracked projects and the project manifest.

use crate::error::{LandscapeError, OptionExt, Result};
use crate::period::{Granularity, Period};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;
use url::Url;

/// Category marking a project as a primary subject of analysis
pub const LOI_FOCUS_CATEGORY: &str = "loi-focus";

/// One tracked software repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub repo_url: String,
    #[serde(default)]
    pub homepage_url: Option<String>,
    #[serde(default)]
    pub category: Vec<String>,
    /// Month of first existence; derived from repository metadata when absent
    #[serde(default, deserialize_with = "deserialize_created_month")]
    pub created_month: Option<Period>,
}

/// Only `YYYY-MM` is accepted; a bare year cannot anchor a monthly series.
fn deserialize_created_month<'de, D>(deserializer: D) -> std::result::Result<Option<Period>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Period>::deserialize(deserializer)? {
        Some(period) if period.granularity() != Granularity::Month => Err(serde::de::Error::custom(format!(
            "created_month must be YYYY-MM, got '{}'",
            period
        ))),
        other => Ok(other),
    }
}

impl Project {
    pub fn new(name: impl Into<String>, repo_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repo_url: repo_url.into(),
            homepage_url: None,
            category: Vec::new(),
            created_month: None,
        }
    }

    pub fn is_loi_focus(&self) -> bool {
        self.category.iter().any(|c| c == LOI_FOCUS_CATEGORY)
    }

    /// `org/name` identifier parsed from the repository URL.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the URL is invalid or has fewer than two
    /// path segments.
    pub fn repo_identifier(&self) -> Result<String> {
        let url = Url::parse(self.repo_url.trim()).map_err(|e| {
            LandscapeError::Parse(format!("Invalid repository URL '{}': {}", self.repo_url, e))
        })?;

        let mut segments = url
            .path_segments()
            .ok_or_parse("Repository URL has no path")?
            .filter(|s| !s.is_empty());

        let org = segments
            .next()
            .ok_or_parse(&format!("Repository URL '{}' has no owner", self.repo_url))?;
        let name = segments
            .next()
            .ok_or_parse(&format!("Repository URL '{}' has no name", self.repo_url))?;

        Ok(format!("{}/{}", org, name.trim_end_matches(".git")))
    }
}

/// Project list as read from a JSON manifest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub projects: Vec<Project>,
}

impl Manifest {
    /// Load a manifest from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let manifest: Manifest = serde_json::from_str(&content)?;
        info!(path = ?path, projects = manifest.projects.len(), "Loaded project manifest");
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!(path = ?path, projects = self.projects.len(), "Saved project manifest");
        Ok(())
    }
}

/// Merge search-discovered candidates into a target project list.
///
/// Candidates pointing at a target repository are dropped, remaining
/// candidates are de-duplicated by `repo_url` (first wins), and targets come
/// first in the result.
pub fn merge_landscape_entries(targets: Vec<Project>, candidates: Vec<Project>) -> Vec<Project> {
    let mut seen: HashSet<String> = targets.iter().map(|p| p.repo_url.clone()).collect();

    let extra: Vec<Project> = candidates
        .into_iter()
        .filter(|p| seen.insert(p.repo_url.clone()))
        .collect();

    info!(
        targets = targets.len(),
        added = extra.len(),
        "Merged landscape entries"
    );

    targets.into_iter().chain(extra).collect()
}
