//! Descriptive statistics over integer samples.
//!
//! Every statistic of an empty sample is `None`. Standard deviation is the
//! population form, so a single value reports `0`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrence count for every integer between the sample's min and max.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histogram {
    pub labels: Vec<i64>,
    pub counts: Vec<u32>,
}

impl Histogram {
    /// Builds a zero-filled histogram over `[min, max]` of `values`.
    pub fn from_sample(values: &[i64]) -> Self {
        let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
            return Self::default();
        };

        let frequencies = frequencies(values);
        let labels: Vec<i64> = (min..=max).collect();
        let counts = labels
            .iter()
            .map(|label| frequencies.get(label).copied().unwrap_or(0))
            .collect();

        Self { labels, counts }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Summary statistics of one sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleSummary {
    pub total: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub mode: Vec<i64>,
    pub range: Option<String>,
    pub standard_dev: Option<f64>,
    pub histogram: Histogram,
}

impl SampleSummary {
    pub fn from_sample(values: &[i64]) -> Self {
        Self {
            total: values.len(),
            mean: mean(values).map(round2),
            median: median(values),
            mode: mode(values),
            range: range_label(values),
            standard_dev: population_std_dev(values).map(round2),
            histogram: Histogram::from_sample(values),
        }
    }

    /// True when several distinct values all share the top frequency,
    /// which the presentation layer renders as "None".
    pub fn mode_is_degenerate(&self) -> bool {
        let distinct = self.histogram.counts.iter().filter(|c| **c > 0).count();
        distinct >= 2 && self.mode.len() == distinct
    }
}

/// Rounds to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().sum();
    Some(sum as f64 / values.len() as f64)
}

/// Middle value; the mean of the two middle values for even samples.
pub fn median(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) as f64 / 2.0)
    } else {
        Some(sorted[mid] as f64)
    }
}

/// Every value reaching the highest frequency, ascending.
pub fn mode(values: &[i64]) -> Vec<i64> {
    let frequencies = frequencies(values);
    let Some(&highest) = frequencies.values().max() else {
        return Vec::new();
    };
    frequencies
        .into_iter()
        .filter(|(_, count)| *count == highest)
        .map(|(value, _)| value)
        .collect()
}

/// Population standard deviation.
pub fn population_std_dev(values: &[i64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values
        .iter()
        .map(|v| {
            let diff = *v as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}

/// `"<min>-<max> (<max - min>)"`.
pub fn range_label(values: &[i64]) -> Option<String> {
    let min = values.iter().min()?;
    let max = values.iter().max()?;
    Some(format!("{}-{} ({})", min, max, max - min))
}

fn frequencies(values: &[i64]) -> BTreeMap<i64, u32> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(*value).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_single_peak() {
        assert_eq!(mode(&[3, 3, 3, 5, 7]), vec![3]);
    }

    #[test]
    fn test_mode_all_distinct_returns_every_value() {
        let summary = SampleSummary::from_sample(&[3, 1, 2]);

        assert_eq!(summary.mode, vec![1, 2, 3]);
        assert!(summary.mode_is_degenerate());
    }

    #[test]
    fn test_population_std_dev_fixed_scenario() {
        let summary = SampleSummary::from_sample(&[10, 20, 30]);

        assert_eq!(summary.mean, Some(20.0));
        // sqrt(200 / 3), population form
        assert_eq!(summary.standard_dev, Some(8.16));
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[9, 14]), Some(11.5));
        assert_eq!(median(&[5, 1, 3]), Some(3.0));
    }

    #[test]
    fn test_range_label() {
        assert_eq!(range_label(&[14, 9, 30]).as_deref(), Some("9-30 (21)"));
        assert_eq!(range_label(&[-2, 3]).as_deref(), Some("-2-3 (5)"));
    }

    #[test]
    fn test_histogram_zero_fills_gaps() {
        let histogram = Histogram::from_sample(&[2, 5, 5]);

        assert_eq!(histogram.labels, vec![2, 3, 4, 5]);
        assert_eq!(histogram.counts, vec![1, 0, 0, 2]);
    }

    #[test]
    fn test_empty_sample_is_null_not_nan() {
        let summary = SampleSummary::from_sample(&[]);

        assert_eq!(summary.total, 0);
        assert_eq!(summary.mean, None);
        assert_eq!(summary.median, None);
        assert_eq!(summary.standard_dev, None);
        assert_eq!(summary.range, None);
        assert!(summary.mode.is_empty());
        assert!(summary.histogram.is_empty());
        assert!(!summary.mode_is_degenerate());

        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["mean"].is_null());
        assert!(json["standardDev"].is_null());
    }

    #[test]
    fn test_single_value_has_zero_deviation() {
        let summary = SampleSummary::from_sample(&[7]);

        assert_eq!(summary.standard_dev, Some(0.0));
        assert_eq!(summary.median, Some(7.0));
        assert_eq!(summary.range.as_deref(), Some("7-7 (0)"));
    }

    #[test]
    fn test_repeated_single_value_has_a_mode() {
        for sample in [&[7][..], &[5, 5][..]] {
            let summary = SampleSummary::from_sample(sample);

            assert_eq!(summary.mode.len(), 1);
            assert!(!summary.mode_is_degenerate());
        }
        assert!(SampleSummary::from_sample(&[4, 4, 6, 6]).mode_is_degenerate());
    }

    #[test]
    fn test_mean_rounded_to_two_decimals() {
        assert_eq!(SampleSummary::from_sample(&[1, 1, 2]).mean, Some(1.33));
    }
}
