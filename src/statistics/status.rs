//! Status classification.
//!
//! A keyset is in exactly one of four phases relative to `today`: interest
//! check, waiting for its group buy, in a live group buy, or past it. The
//! four predicates are evaluated independently; records with inconsistent
//! dates can satisfy several (or none) and are reported separately.

use super::dimension::{group_by, Dimension};
use super::sort::Sortable;
use crate::store::{end_of_day, start_of_day, Keyset, ParsedDate};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// A resolved keyset phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Status {
    Ic,
    PreGb,
    LiveGb,
    PostGb,
}

/// Every status predicate for one keyset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags {
    pub ic: bool,
    pub pre_gb: bool,
    pub live_gb: bool,
    pub post_gb: bool,
}

impl StatusFlags {
    /// Evaluates all four predicates for `keyset` on `today`.
    pub fn classify(keyset: &Keyset, today: NaiveDate) -> Self {
        let launch = keyset.launch();
        let start = launch.start();
        let yesterday = start_of_day(today - Duration::days(1));

        let still_open = match keyset.end_date() {
            ParsedDate::Absent => true,
            ParsedDate::Date(end) => end_of_day(end) >= yesterday,
            ParsedDate::Malformed => false,
        };

        Self {
            ic: launch.is_unscheduled(),
            pre_gb: start.is_some_and(|start| start > today),
            live_gb: start.is_some_and(|start| start <= today) && still_open,
            post_gb: keyset.window_closed(today),
        }
    }

    /// Number of predicates that hold.
    pub fn matched(&self) -> usize {
        [self.ic, self.pre_gb, self.live_gb, self.post_gb]
            .into_iter()
            .filter(|flag| *flag)
            .count()
    }

    /// Exactly one predicate holds.
    pub fn is_consistent(&self) -> bool {
        self.matched() == 1
    }

    /// Single phase for counting.
    ///
    /// Precedence is IC, post-GB, live-GB, pre-GB. A record matching no
    /// predicate is treated as an interest check.
    pub fn resolve(&self) -> Status {
        if self.ic {
            Status::Ic
        } else if self.post_gb {
            Status::PostGb
        } else if self.live_gb {
            Status::LiveGb
        } else if self.pre_gb {
            Status::PreGb
        } else {
            Status::Ic
        }
    }
}

/// Resolved status of `keyset` on `today`.
pub fn classify(keyset: &Keyset, today: NaiveDate) -> Status {
    StatusFlags::classify(keyset, today).resolve()
}

/// Logs every keyset whose dates do not place it in exactly one phase.
///
/// Returns how many were found.
pub fn report_inconsistent(records: &[Keyset], today: NaiveDate) -> usize {
    let mut inconsistent = 0;
    for keyset in records {
        let flags = StatusFlags::classify(keyset, today);
        if !flags.is_consistent() {
            inconsistent += 1;
            tracing::warn!(
                id = %keyset.id,
                keyset = %keyset.display_name(),
                gb_launch = %keyset.gb_launch,
                gb_end = %keyset.gb_end,
                matched = flags.matched(),
                counted_as = ?flags.resolve(),
                "Keyset dates match an ambiguous status"
            );
        }
    }
    inconsistent
}

/// Status counts for one dimension value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub name: String,
    pub ic: u32,
    pub pre_gb: u32,
    pub live_gb: u32,
    pub post_gb: u32,
    pub total: u32,
}

impl StatusEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Counts one record in `status`.
    pub fn add(&mut self, status: Status) {
        match status {
            Status::Ic => self.ic += 1,
            Status::PreGb => self.pre_gb += 1,
            Status::LiveGb => self.live_gb += 1,
            Status::PostGb => self.post_gb += 1,
        }
        self.total = self.ic + self.pre_gb + self.live_gb + self.post_gb;
    }
}

impl Sortable for StatusEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn magnitude(&self) -> Option<f64> {
        Some(f64::from(self.total))
    }
}

/// Status breakdown of `records` per value of `dimension`.
pub fn compute_status(
    records: &[Keyset],
    dimension: Dimension,
    today: NaiveDate,
) -> Vec<StatusEntry> {
    group_by(records, dimension)
        .into_iter()
        .map(|group| {
            let mut entry = StatusEntry::new(group.name);
            for keyset in group.members {
                entry.add(classify(keyset, today));
            }
            entry
        })
        .collect()
}
