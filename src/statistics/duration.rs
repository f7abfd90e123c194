//! Duration distributions.
//!
//! Measures how long keysets spend between two dates, per dimension value
//! and across every keyset. `icDate` measures interest check to group buy
//! launch in months; `gbLaunch` measures the group buy itself in days.

use super::dimension::{group_by, Dimension};
use super::sort::{Sortable, ALL_NAME};
use super::summary::SampleSummary;
use super::timeline::DateField;
use crate::store::Keyset;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// Unit a duration sample is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Months,
    Days,
}

impl DateField {
    /// Unit of the duration starting at this field.
    pub fn duration_unit(self) -> DurationUnit {
        match self {
            DateField::IcDate => DurationUnit::Months,
            DateField::GbLaunch => DurationUnit::Days,
        }
    }
}

/// Duration statistics for one dimension value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "EntryFields")]
pub struct DurationEntry {
    pub name: String,
    #[serde(flatten)]
    pub summary: SampleSummary,
    #[serde(skip)]
    synthetic: bool,
}

/// Serialized form of [`DurationEntry`]; the pin is not on the wire.
#[derive(Deserialize)]
struct EntryFields {
    name: String,
    #[serde(flatten)]
    summary: SampleSummary,
}

impl From<EntryFields> for DurationEntry {
    fn from(fields: EntryFields) -> Self {
        Self {
            synthetic: fields.name == ALL_NAME,
            name: fields.name,
            summary: fields.summary,
        }
    }
}

impl DurationEntry {
    pub fn new(name: impl Into<String>, sample: &[i64]) -> Self {
        Self {
            name: name.into(),
            summary: SampleSummary::from_sample(sample),
            synthetic: false,
        }
    }

    /// The entry covering every keyset in the sample.
    pub fn all(sample: &[i64]) -> Self {
        Self {
            synthetic: true,
            ..Self::new(ALL_NAME, sample)
        }
    }

    pub fn is_all(&self) -> bool {
        self.synthetic
    }

    pub fn total(&self) -> usize {
        self.summary.total
    }
}

impl Sortable for DurationEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn magnitude(&self) -> Option<f64> {
        self.summary.mean
    }

    fn is_pinned(&self) -> bool {
        self.synthetic
    }
}

/// Whole months from `start` to `end`, rounded to the nearest month.
///
/// The remainder after the last whole month is measured against the length
/// of the month it falls in.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    if end < start {
        return -months_between(end, start);
    }

    let add = |months: u32| start.checked_add_months(Months::new(months));
    let span = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    let mut whole = span.max(0) as u32;
    while whole > 0 && add(whole).is_some_and(|anchor| anchor > end) {
        whole -= 1;
    }

    let (Some(anchor), Some(next)) = (add(whole), add(whole + 1)) else {
        return i64::from(whole);
    };
    let remainder = (end - anchor).num_days() as f64;
    let month_len = (next - anchor).num_days() as f64;
    (f64::from(whole) + remainder / month_len).round() as i64
}

/// Length of `keyset` for a duration starting at `field`.
///
/// Both dates must carry full day precision. The result may be negative
/// when the dates are out of order.
pub fn duration_length(keyset: &Keyset, field: DateField) -> Option<i64> {
    match field {
        DateField::IcDate => {
            let start = keyset.ic_date().date()?;
            let end = keyset.launch().full_date()?;
            Some(months_between(start, end))
        }
        DateField::GbLaunch => {
            let start = keyset.launch().full_date()?;
            let end = keyset.end_date().date()?;
            Some((end - start).num_days())
        }
    }
}

/// Usable length of `keyset`: present and not negative.
fn sample_length(keyset: &Keyset, field: DateField) -> Option<i64> {
    duration_length(keyset, field).filter(|length| *length >= 0)
}

/// Duration breakdown per value of `dimension`, headed by the `"All"` entry.
///
/// Every dimension value present in `records` gets an entry, even when none
/// of its keysets has a usable pair of dates.
pub fn compute_duration(
    records: &[Keyset],
    field: DateField,
    dimension: Dimension,
) -> Vec<DurationEntry> {
    let mut all = Vec::with_capacity(records.len());
    for keyset in records {
        match duration_length(keyset, field) {
            Some(length) if length >= 0 => all.push(length),
            Some(length) => tracing::warn!(
                id = %keyset.id,
                keyset = %keyset.display_name(),
                %field,
                length,
                "Excluding keyset with negative duration"
            ),
            None => tracing::trace!(
                id = %keyset.id,
                %field,
                "Keyset has no complete date pair for duration"
            ),
        }
    }

    let mut entries = vec![DurationEntry::all(&all)];
    entries.extend(group_by(records, dimension).into_iter().map(|group| {
        let sample: Vec<i64> = group
            .members
            .iter()
            .filter_map(|keyset| sample_length(keyset, field))
            .collect();
        DurationEntry::new(group.name, &sample)
    }));
    entries
}
