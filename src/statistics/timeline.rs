//! Calendar bucketing.
//!
//! Turns the dated records into a contiguous run of month buckets. Months
//! without any record still get a bucket, so a chart built from the output
//! never skips an x-axis tick.

use super::ParseError;
use crate::store::{first_of_month, Keyset, LaunchDate};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Format of a month bucket label.
pub const MONTH_LABEL_FORMAT: &str = "%Y-%m";

/// Date field a view is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DateField {
    #[serde(rename = "icDate")]
    IcDate,
    #[serde(rename = "gbLaunch")]
    GbLaunch,
}

impl DateField {
    pub const ALL: [DateField; 2] = [DateField::IcDate, DateField::GbLaunch];

    pub fn as_str(self) -> &'static str {
        match self {
            DateField::IcDate => "icDate",
            DateField::GbLaunch => "gbLaunch",
        }
    }

    /// The month `keyset` falls in for this field.
    ///
    /// Quarter-only, empty and malformed values have no month.
    pub fn month_of(self, keyset: &Keyset) -> Option<NaiveDate> {
        let date = match self {
            DateField::IcDate => keyset.ic_date().date(),
            DateField::GbLaunch => match keyset.launch() {
                LaunchDate::Day(date) | LaunchDate::Month(date) => Some(date),
                _ => None,
            },
        };
        date.map(first_of_month)
    }
}

impl fmt::Display for DateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DateField {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "icDate" | "ic_date" | "ic" => Ok(DateField::IcDate),
            "gbLaunch" | "gb_launch" | "gb" => Ok(DateField::GbLaunch),
            _ => Err(ParseError::new("date field", s)),
        }
    }
}

/// Record count for one calendar month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    /// `YYYY-MM`.
    pub label: String,
    pub count: u32,
    /// Count per profile; every known profile is present, zero included.
    pub per_group: BTreeMap<String, u32>,
}

/// The timeline tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineData {
    pub field: Option<DateField>,
    pub months: Vec<MonthBucket>,
    /// Per profile, one count per entry of `months`.
    pub per_profile_series: BTreeMap<String, Vec<u32>>,
}

impl TimelineData {
    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    /// Month labels in order.
    pub fn labels(&self) -> Vec<&str> {
        self.months.iter().map(|m| m.label.as_str()).collect()
    }
}

/// Formats the month containing `date` as a bucket label.
pub fn month_label(date: NaiveDate) -> String {
    date.format(MONTH_LABEL_FORMAT).to_string()
}

/// Every month from `first` through `last`, inclusive.
pub fn month_span(first: NaiveDate, last: NaiveDate) -> Vec<NaiveDate> {
    let first = first_of_month(first);
    let last = first_of_month(last);
    if last < first {
        return Vec::new();
    }

    let span = (last.year() - first.year()) * 12 + last.month() as i32 - first.month() as i32;
    (0..=span as u32)
        .filter_map(|offset| first.checked_add_months(Months::new(offset)))
        .collect()
}

/// Buckets `records` by month of `field`, grouped per profile.
pub fn compute_timeline(records: &[Keyset], field: DateField) -> TimelineData {
    let mut dated: Vec<(NaiveDate, &str)> = Vec::with_capacity(records.len());
    for keyset in records {
        let profile = keyset.profile.trim();
        match field.month_of(keyset) {
            Some(_) if profile.is_empty() => tracing::debug!(
                id = %keyset.id,
                %field,
                "Excluding keyset without a profile from timeline"
            ),
            Some(month) => dated.push((month, profile)),
            None => tracing::debug!(
                id = %keyset.id,
                keyset = %keyset.display_name(),
                %field,
                "Excluding keyset without a month from timeline"
            ),
        }
    }

    let months: BTreeSet<NaiveDate> = dated.iter().map(|(month, _)| *month).collect();
    let (Some(&first), Some(&last)) = (months.first(), months.last()) else {
        return TimelineData {
            field: Some(field),
            ..Default::default()
        };
    };

    let profiles: BTreeSet<&str> = dated.iter().map(|(_, profile)| *profile).collect();

    let mut cells: BTreeMap<(NaiveDate, &str), u32> = BTreeMap::new();
    let mut totals: BTreeMap<NaiveDate, u32> = BTreeMap::new();
    for (month, profile) in &dated {
        *totals.entry(*month).or_insert(0) += 1;
        *cells.entry((*month, *profile)).or_insert(0) += 1;
    }

    let span = month_span(first, last);
    let buckets: Vec<MonthBucket> = span
        .iter()
        .map(|month| MonthBucket {
            label: month_label(*month),
            count: totals.get(month).copied().unwrap_or(0),
            per_group: profiles
                .iter()
                .map(|profile| {
                    let count = cells.get(&(*month, *profile)).copied().unwrap_or(0);
                    (profile.to_string(), count)
                })
                .collect(),
        })
        .collect();

    let per_profile_series = profiles
        .iter()
        .map(|profile| {
            let series = buckets
                .iter()
                .map(|bucket| bucket.per_group.get(*profile).copied().unwrap_or(0))
                .collect();
            (profile.to_string(), series)
        })
        .collect();

    TimelineData {
        field: Some(field),
        months: buckets,
        per_profile_series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn keyset(profile: &str, ic_date: &str, gb_launch: &str) -> Keyset {
        let mut keyset = Keyset::new(format!("{profile}-{ic_date}"), profile, "Test");
        keyset.ic_date = ic_date.to_string();
        keyset.gb_launch = gb_launch.to_string();
        keyset
    }

    #[test]
    fn test_single_month_bucket() {
        let records = vec![
            keyset("P1", "2021-01-05", "2021-02-01"),
            keyset("P1", "2021-01-10", "2021-03-01"),
        ];

        let timeline = compute_timeline(&records, DateField::IcDate);

        assert_eq!(timeline.labels(), vec!["2021-01"]);
        assert_eq!(timeline.months[0].count, 2);
        assert_eq!(timeline.per_profile_series["P1"], vec![2]);
    }

    #[test]
    fn test_gap_months_are_filled_with_zero() {
        let records = vec![
            keyset("SA", "", "2020-11-20"),
            keyset("Cherry", "", "2021-02-03"),
        ];

        let timeline = compute_timeline(&records, DateField::GbLaunch);

        assert_eq!(
            timeline.labels(),
            vec!["2020-11", "2020-12", "2021-01", "2021-02"]
        );
        let counts: Vec<u32> = timeline.months.iter().map(|m| m.count).collect();
        assert_eq!(counts, vec![1, 0, 0, 1]);
        assert_eq!(timeline.months[1].per_group["SA"], 0);
        assert_eq!(timeline.months[1].per_group["Cherry"], 0);
        assert_eq!(timeline.per_profile_series["SA"], vec![1, 0, 0, 0]);
        assert_eq!(timeline.per_profile_series["Cherry"], vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_quarter_and_malformed_dates_excluded() {
        let mut month_only = keyset("KAT", "", "2021-06");
        month_only.gb_month = true;
        let records = vec![
            keyset("SA", "", "Q2 2021"),
            keyset("SA", "", "whenever"),
            keyset("SA", "", ""),
            month_only,
        ];

        let timeline = compute_timeline(&records, DateField::GbLaunch);

        assert_eq!(timeline.labels(), vec!["2021-06"]);
        assert_eq!(timeline.months[0].count, 1);
        assert!(!timeline.per_profile_series.contains_key("SA"));
    }

    #[test]
    fn test_group_counts_add_up_to_bucket_count() {
        let records = vec![
            keyset("SA", "2021-01-05", ""),
            keyset("  ", "2021-01-06", ""),
            keyset("", "2021-02-07", ""),
            keyset("Cherry", "2021-03-08", ""),
        ];

        let timeline = compute_timeline(&records, DateField::IcDate);

        assert_eq!(timeline.labels(), vec!["2021-01", "2021-02", "2021-03"]);
        let counts: Vec<u32> = timeline.months.iter().map(|m| m.count).collect();
        assert_eq!(counts, vec![1, 0, 1]);
        for bucket in &timeline.months {
            assert_eq!(bucket.per_group.values().sum::<u32>(), bucket.count);
            assert!(!bucket.per_group.contains_key(""));
        }
    }

    #[test]
    fn test_empty_input_yields_empty_timeline() {
        let timeline = compute_timeline(&[], DateField::IcDate);

        assert!(timeline.is_empty());
        assert!(timeline.per_profile_series.is_empty());
        assert_eq!(timeline.field, Some(DateField::IcDate));
    }

    #[test]
    fn test_month_span_crosses_year() {
        let first = NaiveDate::from_ymd_opt(2020, 12, 31).unwrap();
        let last = NaiveDate::from_ymd_opt(2021, 2, 1).unwrap();

        let labels: Vec<String> = month_span(first, last).into_iter().map(month_label).collect();

        assert_eq!(labels, vec!["2020-12", "2021-01", "2021-02"]);
    }

    proptest! {
        #[test]
        fn prop_buckets_are_contiguous(offsets in prop::collection::vec(0u32..60, 1..20)) {
            let base = NaiveDate::from_ymd_opt(2018, 1, 15).unwrap();
            let records: Vec<Keyset> = offsets
                .iter()
                .map(|offset| {
                    let date = base.checked_add_months(Months::new(*offset)).unwrap();
                    keyset("SA", &date.format("%Y-%m-%d").to_string(), "")
                })
                .collect();

            let timeline = compute_timeline(&records, DateField::IcDate);

            let min = *offsets.iter().min().unwrap();
            let max = *offsets.iter().max().unwrap();
            prop_assert_eq!(timeline.months.len() as u32, max - min + 1);
            for pair in timeline.months.windows(2) {
                prop_assert!(pair[0].label < pair[1].label);
            }
            let total: u32 = timeline.months.iter().map(|m| m.count).sum();
            prop_assert_eq!(total as usize, records.len());
        }
    }
}
