//! Collector interface and snapshot-backed sources.
//!
//! Collectors return one opaque JSON document per project and source kind.
//! The aggregator decodes those documents itself, so any backend that can
//! produce the documents (a directory of snapshots, an HTTP mirror of that
//! directory, an in-memory map) can feed the pipeline.

use crate::error::{LandscapeError, Result};
use crate::project::Project;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Maximum retries on `429 Too Many Requests`
const MAX_RETRIES: u32 = 3;

/// The raw inputs gathered for each project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Repository,
    Stargazers,
    DependencyGraph,
    CodeSearch,
    PypiDownloads,
    CondaDownloads,
    Scholar,
    Preprints,
}

impl SourceKind {
    /// Every kind, in the order the collector queries them
    pub const ALL: [SourceKind; 8] = [
        SourceKind::Repository,
        SourceKind::Stargazers,
        SourceKind::DependencyGraph,
        SourceKind::CodeSearch,
        SourceKind::PypiDownloads,
        SourceKind::CondaDownloads,
        SourceKind::Scholar,
        SourceKind::Preprints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Repository => "repository",
            SourceKind::Stargazers => "stargazers",
            SourceKind::DependencyGraph => "dependency_graph",
            SourceKind::CodeSearch => "code_search",
            SourceKind::PypiDownloads => "pypi_downloads",
            SourceKind::CondaDownloads => "conda_downloads",
            SourceKind::Scholar => "scholar",
            SourceKind::Preprints => "preprints",
        }
    }

    fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A collector of raw per-project metrics.
///
/// Implementations block (await) until the backend answers or fails; they
/// never retry on behalf of the aggregator beyond their own transport
/// concerns.
pub trait MetricsSource {
    /// Fetch the raw document for one project and source kind.
    fn fetch(
        &self,
        project: &Project,
        kind: SourceKind,
    ) -> impl Future<Output = Result<serde_json::Value>> + Send;
}

fn unavailable(kind: SourceKind, message: impl Into<String>) -> LandscapeError {
    LandscapeError::SourceUnavailable {
        source_name: kind.to_string(),
        message: message.into(),
    }
}

// ============================================================================
// Snapshot directory
// ============================================================================

/// Reads `<root>/<project name>/<source>.json`
#[derive(Debug, Clone)]
pub struct SnapshotDir {
    root: PathBuf,
}

impl SnapshotDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, project: &Project, kind: SourceKind) -> PathBuf {
        self.root.join(&project.name).join(kind.file_name())
    }
}

impl MetricsSource for SnapshotDir {
    async fn fetch(&self, project: &Project, kind: SourceKind) -> Result<serde_json::Value> {
        let path = self.path_for(project, kind);
        debug!(project = %project.name, source = %kind, path = ?path, "Reading snapshot");

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(unavailable(kind, format!("no snapshot at {}", path.display())));
            }
            Err(e) => return Err(LandscapeError::Io(e)),
        };

        Ok(serde_json::from_str(&content)?)
    }
}

// ============================================================================
// HTTP snapshot mirror
// ============================================================================

/// Fetches `<base>/<project name>/<source>.json` over HTTP
#[derive(Debug, Clone)]
pub struct HttpSnapshot {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpSnapshot {
    /// Create a new HttpSnapshot source
    ///
    /// # Arguments
    ///
    /// * `base_url` - Mirror root, e.g. `https://example.org/snapshots`
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LandscapeError::Config(format!("Invalid snapshot URL '{}': {}", base_url, e)))?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("landscape-metrics/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LandscapeError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { base_url, client })
    }

    pub fn url_for(&self, project: &Project, kind: SourceKind) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            urlencoding::encode(&project.name),
            kind.file_name()
        )
    }
}

impl MetricsSource for HttpSnapshot {
    async fn fetch(&self, project: &Project, kind: SourceKind) -> Result<serde_json::Value> {
        let url = self.url_for(project, kind);
        let mut retries = 0;

        loop {
            debug!(project = %project.name, source = %kind, url = %url, "Fetching snapshot");
            let response = self.client.get(&url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.json().await?);
            }

            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(unavailable(kind, format!("no snapshot at {}", url)));
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retries < MAX_RETRIES {
                    let backoff = Duration::from_secs(2u64.pow(retries));
                    warn!(
                        retries = retries,
                        backoff_secs = backoff.as_secs(),
                        "Rate limited, backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    retries += 1;
                    continue;
                }
                return Err(LandscapeError::RateLimited(60));
            }

            return Err(LandscapeError::Api {
                code: status.as_u16() as i32,
                message: format!("Snapshot mirror error: {}", status),
            });
        }
    }
}

// ============================================================================
// In-memory source
// ============================================================================

/// Documents keyed by project name, then source kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticSource {
    documents: HashMap<String, HashMap<SourceKind, serde_json::Value>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, project: &str, kind: SourceKind, document: serde_json::Value) {
        self.documents
            .entry(project.to_string())
            .or_default()
            .insert(kind, document);
    }

    pub fn with(mut self, project: &str, kind: SourceKind, document: serde_json::Value) -> Self {
        self.insert(project, kind, document);
        self
    }
}

impl MetricsSource for StaticSource {
    async fn fetch(&self, project: &Project, kind: SourceKind) -> Result<serde_json::Value> {
        self.documents
            .get(&project.name)
            .and_then(|docs| docs.get(&kind))
            .cloned()
            .ok_or_else(|| unavailable(kind, format!("no document for '{}'", project.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn project() -> Project {
        Project::new("CytoTable", "https://github.com/cytomining/CytoTable")
    }

    #[test]
    fn test_source_kind_names() {
        assert_eq!(SourceKind::PypiDownloads.to_string(), "pypi_downloads");
        let kind: SourceKind = serde_json::from_str("\"dependency_graph\"").expect("deserialize");
        assert_eq!(kind, SourceKind::DependencyGraph);
        assert_eq!(SourceKind::ALL.len(), 8);
    }

    #[test]
    fn test_http_url_encodes_project_name() {
        let source = HttpSnapshot::new("https://example.org/snapshots/").expect("valid url");
        let project = Project::new("my tool", "https://github.com/o/my-tool");
        assert_eq!(
            source.url_for(&project, SourceKind::Scholar),
            "https://example.org/snapshots/my%20tool/scholar.json"
        );
        assert!(HttpSnapshot::new("not a url").is_err());
    }

    #[tokio::test]
    async fn test_snapshot_dir_reads_and_reports_missing() -> Result<()> {
        let dir = TempDir::new()?;
        let source = SnapshotDir::new(dir.path());
        let project = project();

        std::fs::create_dir_all(dir.path().join("CytoTable"))?;
        std::fs::write(
            source.path_for(&project, SourceKind::CodeSearch),
            r#"["a/b", "c/d"]"#,
        )?;

        let value = source.fetch(&project, SourceKind::CodeSearch).await?;
        assert_eq!(value, json!(["a/b", "c/d"]));

        let missing = source.fetch(&project, SourceKind::Scholar).await;
        assert!(matches!(missing, Err(LandscapeError::SourceUnavailable { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticSource::new().with("CytoTable", SourceKind::Stargazers, json!([]));
        let project = project();
        assert!(source.fetch(&project, SourceKind::Stargazers).await.is_ok());
        assert!(source.fetch(&project, SourceKind::Repository).await.is_err());
    }

    #[test]
    fn test_static_source_from_json() {
        let source: StaticSource = serde_json::from_value(json!({
            "CytoTable": {"code_search": ["a/b"], "scholar": []}
        }))
        .expect("deserialize");
        assert_eq!(source.documents["CytoTable"].len(), 2);
    }
}
