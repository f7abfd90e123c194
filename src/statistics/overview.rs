//! Headline counts across the whole record set.

use super::dimension::{group_by, Dimension};
use super::shipped::closed_keysets;
use super::status::{classify, report_inconsistent, StatusEntry};
use crate::store::Keyset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Totals shown above the per-dimension breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub keysets: u32,
    pub profiles: u32,
    pub designers: u32,
    pub vendors: u32,
    /// Status split over every keyset.
    pub status: StatusEntry,
    /// Closed keysets that have shipped.
    pub shipped: u32,
    /// Closed keysets in total.
    pub closed: u32,
    /// Keysets whose dates matched zero or several status predicates.
    pub inconsistent: u32,
}

pub fn compute_overview(records: &[Keyset], today: NaiveDate) -> Overview {
    let count = |dimension: Dimension| group_by(records, dimension).len() as u32;

    let mut status = StatusEntry::new("Total");
    for keyset in records {
        status.add(classify(keyset, today));
    }

    let (closed, shipped) = closed_keysets(records, today)
        .fold((0u32, 0u32), |(closed, shipped), keyset| {
            (closed + 1, shipped + u32::from(keyset.shipped))
        });

    Overview {
        keysets: records.len() as u32,
        profiles: count(Dimension::Profile),
        designers: count(Dimension::Designer),
        vendors: count(Dimension::Vendor),
        status,
        shipped,
        closed,
        inconsistent: report_inconsistent(records, today) as u32,
    }
}
