//! Time-series normalization.
//!
//! Collectors report counts sparsely: a month with no stars or no downloads
//! is simply missing. This module turns those sparse maps into dense,
//! contiguous series and provides the small reshaping helpers the
//! aggregator needs (monthly bucketing, yearly rollup, running totals).

use crate::error::{LandscapeError, Result};
use crate::period::Period;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Period → count map. Used for both sparse and dense series; a dense
/// series simply has every period of its range present.
pub type Series = BTreeMap<Period, u64>;

/// A single `(period, count)` observation as reported by a collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    #[serde(alias = "download_month", alias = "month")]
    pub period: Period,
    #[serde(alias = "download_count")]
    pub count: u64,
}

/// Fill a sparse series into a dense one covering `[start, end]`.
///
/// Every period in the closed range is initialized to zero in ascending
/// order, then every entry of `sparse` is laid over the top. Entries of
/// `sparse` outside the range are kept as they are. An inverted range
/// yields an empty series.
///
/// # Errors
///
/// Returns a validation error when `start` and `end` differ in granularity.
pub fn densify(sparse: &Series, start: Period, end: Period) -> Result<Series> {
    if start.granularity() != end.granularity() {
        return Err(LandscapeError::Validation(format!(
            "Cannot densify between {} and {}: mixed granularity",
            start, end
        )));
    }

    if start > end {
        return Ok(Series::new());
    }

    let mut dense = Series::new();
    let mut period = start;
    while period <= end {
        dense.insert(period, 0);
        period = period.succ();
    }

    for (period, count) in sparse {
        dense.insert(*period, *count);
    }

    Ok(dense)
}

/// Bucket event timestamps into a sparse monthly series.
pub fn count_by_month(timestamps: &[DateTime<Utc>]) -> Series {
    let mut series = Series::new();
    for at in timestamps {
        let count = series.entry(Period::month_of(at)).or_insert(0);
        *count = count.saturating_add(1);
    }
    series
}

/// Build a sparse series from reported points. Repeated periods are summed,
/// saturating at `u64::MAX`.
pub fn from_points(points: &[TimeSeriesPoint]) -> Series {
    let mut series = Series::new();
    for point in points {
        let count = series.entry(point.period).or_insert(0);
        *count = count.saturating_add(point.count);
    }
    series
}

/// Sum a series into calendar years.
pub fn rollup_by_year(series: &Series) -> Series {
    let mut yearly = Series::new();
    for (period, count) in series {
        let sum = yearly.entry(period.to_year()).or_insert(0);
        *sum = sum.saturating_add(*count);
    }
    yearly
}

/// Running total in period order.
pub fn cumulative(series: &Series) -> Vec<(Period, u64)> {
    series
        .iter()
        .scan(0u64, |acc, (period, count)| {
            *acc = acc.saturating_add(*count);
            Some((*period, *acc))
        })
        .collect()
}

/// Sum of all counts, saturating at `u64::MAX`
pub fn total(series: &Series) -> u64 {
    series.values().fold(0u64, |acc, count| acc.saturating_add(*count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn p(s: &str) -> Period {
        s.parse().expect("valid period")
    }

    fn series(entries: &[(&str, u64)]) -> Series {
        entries.iter().map(|(k, v)| (p(k), *v)).collect()
    }

    #[test]
    fn test_densify_fills_gaps() {
        let sparse = series(&[("2021-03", 5)]);
        let dense = densify(&sparse, p("2021-01"), p("2021-04")).expect("densify");
        assert_eq!(
            dense,
            series(&[("2021-01", 0), ("2021-02", 0), ("2021-03", 5), ("2021-04", 0)])
        );
    }

    #[test]
    fn test_densify_inverted_range_is_empty() {
        let sparse = series(&[("2021-03", 5)]);
        let dense = densify(&sparse, p("2021-05"), p("2021-01")).expect("densify");
        assert!(dense.is_empty());
    }

    #[test]
    fn test_densify_single_period() {
        let dense = densify(&Series::new(), p("2022-06"), p("2022-06")).expect("densify");
        assert_eq!(dense, series(&[("2022-06", 0)]));
    }

    #[test]
    fn test_densify_crosses_year_boundary() {
        let dense = densify(&Series::new(), p("2020-11"), p("2021-02")).expect("densify");
        let keys: Vec<String> = dense.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["2020-11", "2020-12", "2021-01", "2021-02"]);
    }

    #[test]
    fn test_densify_keeps_out_of_range_entries() {
        let sparse = series(&[("2019-12", 2), ("2021-02", 7)]);
        let dense = densify(&sparse, p("2021-01"), p("2021-02")).expect("densify");
        assert_eq!(
            dense,
            series(&[("2019-12", 2), ("2021-01", 0), ("2021-02", 7)])
        );
    }

    #[test]
    fn test_densify_sparse_zero_is_kept() {
        let sparse = series(&[("2021-01", 0)]);
        let dense = densify(&sparse, p("2021-01"), p("2021-02")).expect("densify");
        assert_eq!(dense.len(), 2);
        assert_eq!(dense[&p("2021-01")], 0);
    }

    #[test]
    fn test_densify_years() {
        let sparse = series(&[("2020", 12)]);
        let dense = densify(&sparse, p("2019"), p("2021")).expect("densify");
        assert_eq!(dense, series(&[("2019", 0), ("2020", 12), ("2021", 0)]));
    }

    #[test]
    fn test_densify_mixed_granularity_is_rejected() {
        assert!(densify(&Series::new(), p("2019"), p("2021-01")).is_err());
    }

    #[test]
    fn test_count_by_month() {
        let stamps = vec![
            Utc.with_ymd_and_hms(2021, 3, 1, 0, 0, 0).single().expect("valid"),
            Utc.with_ymd_and_hms(2021, 3, 30, 12, 0, 0).single().expect("valid"),
            Utc.with_ymd_and_hms(2021, 5, 2, 8, 0, 0).single().expect("valid"),
        ];
        assert_eq!(count_by_month(&stamps), series(&[("2021-03", 2), ("2021-05", 1)]));
    }

    #[test]
    fn test_from_points_sums_repeats() {
        let points = vec![
            TimeSeriesPoint { period: p("2021-01"), count: 3 },
            TimeSeriesPoint { period: p("2021-01"), count: 4 },
            TimeSeriesPoint { period: p("2021-02"), count: 1 },
        ];
        assert_eq!(from_points(&points), series(&[("2021-01", 7), ("2021-02", 1)]));
    }

    #[test]
    fn test_point_accepts_download_aliases() {
        let point: TimeSeriesPoint =
            serde_json::from_str(r#"{"download_month": "2023-02", "download_count": 42}"#)
                .expect("deserialize");
        assert_eq!(point.period, p("2023-02"));
        assert_eq!(point.count, 42);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let points = vec![
            TimeSeriesPoint { period: p("2021-01"), count: u64::MAX },
            TimeSeriesPoint { period: p("2021-01"), count: 5 },
            TimeSeriesPoint { period: p("2021-02"), count: u64::MAX },
        ];
        let sparse = from_points(&points);
        assert_eq!(sparse[&p("2021-01")], u64::MAX);
        assert_eq!(total(&sparse), u64::MAX);
        assert_eq!(rollup_by_year(&sparse), series(&[("2021", u64::MAX)]));
        assert_eq!(cumulative(&sparse).last().map(|(_, c)| *c), Some(u64::MAX));
    }

    #[test]
    fn test_rollup_and_cumulative() {
        let monthly = series(&[("2020-11", 1), ("2020-12", 2), ("2021-01", 4)]);
        assert_eq!(rollup_by_year(&monthly), series(&[("2020", 3), ("2021", 4)]));

        let running: Vec<u64> = cumulative(&monthly).into_iter().map(|(_, c)| c).collect();
        assert_eq!(running, vec![1, 3, 7]);
        assert_eq!(total(&monthly), 7);
    }
}
