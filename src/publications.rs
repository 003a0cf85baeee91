//! Publication mention counting and title deduplication.
//!
//! Titles are pooled from a scholarly search and a preprint-server search.
//! Exact duplicates are collapsed first; a pairwise similarity pass then
//! produces the "non record linked" list.
//!
//! The pairwise pass keeps the historical behaviour of the landscape
//! reports: for each pair `(i, j)` with `j > i`, the later title is added
//! to the distinct list when its similarity to the earlier one is at or
//! below the threshold. A title that is only ever compared against close
//! matches is never added, even when it is unique.

use crate::error::{LandscapeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

/// Default similarity threshold used by the landscape reports
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 90;

/// Where a publication mention was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PublicationSource {
    Scholar,
    PreprintServer,
}

impl fmt::Display for PublicationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicationSource::Scholar => write!(f, "scholar"),
            PublicationSource::PreprintServer => write!(f, "preprint-server"),
        }
    }
}

/// A search hit as returned by a publication collector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationHit {
    pub title: String,
    /// Publication year, when the source reports one
    #[serde(default)]
    pub year: Option<i32>,
    /// Full text, when the source provides it for filtering
    #[serde(default)]
    pub full_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    pub title: String,
    pub source: PublicationSource,
}

/// Similarity of two titles on a `0..=100` scale (100 = identical).
///
/// Normalized Levenshtein similarity, rounded to the nearest integer.
pub fn title_similarity(a: &str, b: &str) -> u8 {
    let score = strsim::normalized_levenshtein(a, b) * 100.0;
    score.round().clamp(0.0, 100.0) as u8
}

/// Collapse exact (case-sensitive) duplicates, keeping first-seen order.
pub fn exact_dedup<S: AsRef<str>>(titles: &[S]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    titles
        .iter()
        .map(|t| t.as_ref())
        .filter(|t| seen.insert(*t))
        .map(str::to_string)
        .collect()
}

/// Pairwise distinctness pass over already exact-deduplicated titles.
///
/// Pairs are visited with `i` ascending, then `j > i` ascending. When
/// `title_similarity(titles[i], titles[j]) <= threshold`, `titles[j]` is
/// appended to the result unless already present.
///
/// # Errors
///
/// Returns a validation error when `threshold` is above 100.
pub fn distinct_by_threshold(titles: &[String], threshold: u8) -> Result<Vec<String>> {
    validate_threshold(threshold)?;

    let distinct = distinct_pass(titles, threshold, |_, _| {});

    debug!(
        input = titles.len(),
        distinct = distinct.len(),
        threshold = threshold,
        "Pairwise title pass complete"
    );
    Ok(distinct)
}

/// The pairwise pass itself; `on_step` sees the list after every pair.
fn distinct_pass<F>(titles: &[String], threshold: u8, mut on_step: F) -> Vec<String>
where
    F: FnMut((usize, usize), &[String]),
{
    let mut distinct: Vec<String> = Vec::new();
    for i in 0..titles.len() {
        for j in (i + 1)..titles.len() {
            let score = title_similarity(&titles[i], &titles[j]);
            if score <= threshold && !distinct.contains(&titles[j]) {
                distinct.push(titles[j].clone());
            }
            on_step((i, j), &distinct);
        }
    }
    distinct
}

pub fn validate_threshold(threshold: u8) -> Result<()> {
    if threshold > 100 {
        return Err(LandscapeError::Validation(format!(
            "Similarity threshold must be within 0..=100, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Publication counts for one project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicationStats {
    /// Scholar hits after filtering, `None` when the source failed
    pub scholar_count: Option<usize>,
    /// Preprint hits after filtering, `None` when the source failed
    pub preprint_count: Option<usize>,
    /// Unique titles after exact dedup
    pub total_pub_count: usize,
    /// Size of the pairwise distinct list
    pub total_pub_count_non_record_linked: usize,
    /// Unique titles after exact dedup, first-seen order
    pub titles: Vec<String>,
}

impl PublicationStats {
    /// Pool, filter and deduplicate publication hits for a project.
    ///
    /// Scholar hits dated before `created_year` are dropped. Preprint hits
    /// that carry full text are kept only when it mentions `project_name`
    /// (case-insensitive). Returns `Ok(None)` when both sources are absent.
    ///
    /// # Arguments
    ///
    /// * `scholar` - Scholarly search hits, `None` if the source failed
    /// * `preprints` - Preprint search hits, `None` if the source failed
    /// * `project_name` - Name searched for
    /// * `created_year` - Project creation year, if known
    /// * `threshold` - Similarity threshold for the pairwise pass
    pub fn compute(
        scholar: Option<&[PublicationHit]>,
        preprints: Option<&[PublicationHit]>,
        project_name: &str,
        created_year: Option<i32>,
        threshold: u8,
    ) -> Result<Option<Self>> {
        if scholar.is_none() && preprints.is_none() {
            return Ok(None);
        }

        let scholar_hits: Vec<&PublicationHit> = scholar
            .unwrap_or(&[])
            .iter()
            .filter(|hit| match (hit.year, created_year) {
                (Some(year), Some(created)) => year >= created,
                _ => true,
            })
            .collect();

        let needle = project_name.to_lowercase();
        let preprint_hits: Vec<&PublicationHit> = preprints
            .unwrap_or(&[])
            .iter()
            .filter(|hit| match &hit.full_text {
                Some(text) => text.to_lowercase().contains(&needle),
                None => true,
            })
            .collect();

        let records: Vec<PublicationRecord> = scholar_hits
            .iter()
            .map(|hit| PublicationRecord {
                title: hit.title.clone(),
                source: PublicationSource::Scholar,
            })
            .chain(preprint_hits.iter().map(|hit| PublicationRecord {
                title: hit.title.clone(),
                source: PublicationSource::PreprintServer,
            }))
            .collect();

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        let unique = exact_dedup(&titles);
        let distinct = distinct_by_threshold(&unique, threshold)?;

        Ok(Some(Self {
            scholar_count: scholar.map(|_| scholar_hits.len()),
            preprint_count: preprints.map(|_| preprint_hits.len()),
            total_pub_count: unique.len(),
            total_pub_count_non_record_linked: distinct.len(),
            titles: unique,
        }))
    }
}
