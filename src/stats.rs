//! Descriptive statistics over series values.
//!
//! Empty input yields `None` rather than zero so that downstream reports can
//! tell "no data" apart from "zero activity".

use crate::series::{self, Series};
use serde::{Deserialize, Serialize};

/// Arithmetic mean, or `None` for an empty slice.
pub fn average(values: &[u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().map(|v| *v as f64).sum();
    Some(sum / values.len() as f64)
}

/// Median (mean of the two middle values for even lengths), or `None` for
/// an empty slice.
pub fn median(values: &[u64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0)
    } else {
        Some(sorted[mid] as f64)
    }
}

/// Total, mean and median of a series' counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub total: u64,
    pub average: Option<f64>,
    pub median: Option<f64>,
}

impl SeriesSummary {
    pub fn of(series: &Series) -> Self {
        let values: Vec<u64> = series.values().copied().collect();
        Self {
            total: series::total(series),
            average: average(&values),
            median: median(&values),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::period::Period;

    #[test]
    fn test_empty_is_none() {
        assert_eq!(average(&[]), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_average() {
        assert_eq!(average(&[4, 6]), Some(5.0));
        assert_eq!(average(&[1, 2]), Some(1.5));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[1, 2, 3, 4]), Some(2.5));
        assert_eq!(median(&[9, 1, 5]), Some(5.0));
        assert_eq!(median(&[0]), Some(0.0));
    }

    #[test]
    fn test_summary_of_dense_series() {
        let series: Series = [("2021-01", 0u64), ("2021-02", 3), ("2021-03", 9)]
            .iter()
            .map(|(k, v)| (k.parse::<Period>().expect("valid"), *v))
            .collect();
        let summary = SeriesSummary::of(&series);
        assert_eq!(summary.total, 12);
        assert_eq!(summary.average, Some(4.0));
        assert_eq!(summary.median, Some(3.0));

        let huge: Series = [("2021-01", u64::MAX), ("2021-02", 1)]
            .iter()
            .map(|(k, v)| (k.parse::<Period>().expect("valid"), *v))
            .collect();
        assert_eq!(SeriesSummary::of(&huge).total, u64::MAX);

        let empty = SeriesSummary::of(&Series::new());
        assert_eq!(empty.total, 0);
        assert_eq!(empty.average, None);
    }
}
