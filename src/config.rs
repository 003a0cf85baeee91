//! Aggregation settings and the explicit per-run context.

use crate::curate::LandscapeFilter;
use crate::error::{LandscapeError, Result};
use crate::publications::DEFAULT_SIMILARITY_THRESHOLD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The analysis repository itself, never counted as a dependent
pub const ANALYSIS_REPOSITORY: &str = "WayScience/software-landscape-analysis";

/// Aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Pairwise title similarity threshold, `0..=100`
    pub similarity_threshold: u8,
    /// Identifiers excluded from every dependent set
    pub excluded_dependents: Vec<String>,
    /// Landscape filter applied after aggregation, if any
    pub filter: Option<LandscapeFilter>,
    /// Only aggregate `loi-focus` projects
    pub loi_only: bool,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            excluded_dependents: vec![ANALYSIS_REPOSITORY.to_string()],
            filter: Some(LandscapeFilter::default()),
            loi_only: false,
        }
    }
}

impl AggregateConfig {
    pub fn validate(&self) -> Result<()> {
        if self.similarity_threshold > 100 {
            return Err(LandscapeError::Config(format!(
                "similarity_threshold must be within 0..=100, got {}",
                self.similarity_threshold
            )));
        }
        if let Some(bad) = self.excluded_dependents.iter().find(|id| !id.contains('/')) {
            return Err(LandscapeError::Config(format!(
                "Excluded dependent '{}' is not an org/name identifier",
                bad
            )));
        }
        Ok(())
    }
}

/// Everything a run needs besides the projects and the source.
///
/// The clock is fixed once per run so every project is densified to the
/// same current period.
#[derive(Debug, Clone)]
pub struct AggregateContext {
    pub now: DateTime<Utc>,
    pub config: AggregateConfig,
}

impl AggregateContext {
    pub fn new(now: DateTime<Utc>, config: AggregateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { now, config })
    }
}
