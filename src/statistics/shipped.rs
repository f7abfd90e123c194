//! Shipped classification.
//!
//! Only keysets whose group buy window has fully closed are considered;
//! among those, each dimension value counts shipped and unshipped sets.

use super::dimension::{group_by, Dimension};
use super::sort::Sortable;
use crate::store::Keyset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Shipped counts for one dimension value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippedEntry {
    pub name: String,
    pub shipped: u32,
    pub unshipped: u32,
    pub total: u32,
}

impl ShippedEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, shipped: bool) {
        if shipped {
            self.shipped += 1;
        } else {
            self.unshipped += 1;
        }
        self.total = self.shipped + self.unshipped;
    }
}

impl Sortable for ShippedEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn magnitude(&self) -> Option<f64> {
        Some(f64::from(self.total))
    }
}

/// Keysets whose buy window closed before yesterday began.
pub fn closed_keysets(records: &[Keyset], today: NaiveDate) -> impl Iterator<Item = &Keyset> {
    records.iter().filter(move |keyset| keyset.window_closed(today))
}

/// Shipped breakdown of the closed keysets per value of `dimension`.
///
/// Dimension values without any closed keyset get no entry.
pub fn compute_shipped(
    records: &[Keyset],
    dimension: Dimension,
    today: NaiveDate,
) -> Vec<ShippedEntry> {
    group_by(closed_keysets(records, today), dimension)
        .into_iter()
        .map(|group| {
            let mut entry = ShippedEntry::new(group.name);
            for keyset in group.members {
                entry.add(keyset.shipped);
            }
            entry
        })
        .collect()
}
