//! Ordering of breakdown arrays.
//!
//! Every breakdown entry can be sorted by name or by its magnitude (total
//! count, or mean duration). Ties always fall back to the name so that any
//! input permutation sorts to the same output.

use super::ParseError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Name of the synthetic entry covering every dimension value.
pub const ALL_NAME: &str = "All";

/// How a breakdown array is ordered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Case-insensitive by name.
    #[default]
    Alphabetical,
    /// Largest magnitude first.
    Magnitude,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Alphabetical => "alphabetical",
            SortMode::Magnitude => "magnitude",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "alphabetical" | "name" => Ok(SortMode::Alphabetical),
            "magnitude" | "total" | "duration" => Ok(SortMode::Magnitude),
            _ => Err(ParseError::new("sort mode", s)),
        }
    }
}

/// An entry that can appear in a sorted breakdown.
pub trait Sortable {
    fn name(&self) -> &str;

    /// Value compared in [`SortMode::Magnitude`]. `None` sorts last.
    fn magnitude(&self) -> Option<f64>;

    /// Pinned entries stay ahead of everything else in every mode.
    fn is_pinned(&self) -> bool {
        false
    }
}

/// Case-insensitive name order, falling back to the exact bytes.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Compares two entries under `mode`.
pub fn compare_entries<T: Sortable>(a: &T, b: &T, mode: SortMode) -> Ordering {
    match (a.is_pinned(), b.is_pinned()) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }

    match mode {
        SortMode::Alphabetical => compare_names(a.name(), b.name()),
        SortMode::Magnitude => compare_magnitude(a.magnitude(), b.magnitude())
            .then_with(|| compare_names(a.name(), b.name())),
    }
}

/// Sorts `entries` in place.
pub fn sort_entries<T: Sortable>(entries: &mut [T], mode: SortMode) {
    entries.sort_by(|a, b| compare_entries(a, b, mode));
}

/// Descending, with missing values last.
fn compare_magnitude(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        name: String,
        value: Option<f64>,
        pinned: bool,
    }

    impl Sortable for Entry {
        fn name(&self) -> &str {
            &self.name
        }

        fn magnitude(&self) -> Option<f64> {
            self.value
        }

        fn is_pinned(&self) -> bool {
            self.pinned
        }
    }

    fn entry(name: &str, value: Option<f64>) -> Entry {
        Entry {
            name: name.to_string(),
            value,
            pinned: false,
        }
    }

    fn names(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_alphabetical_is_case_insensitive() {
        let mut entries = vec![
            entry("cherry", Some(1.0)),
            entry("Alpha", Some(2.0)),
            entry("beta", Some(3.0)),
        ];

        sort_entries(&mut entries, SortMode::Alphabetical);

        assert_eq!(names(&entries), vec!["Alpha", "beta", "cherry"]);
    }

    #[test]
    fn test_magnitude_descending_with_name_tie_break() {
        let mut entries = vec![
            entry("b", Some(5.0)),
            entry("C", Some(5.0)),
            entry("a", Some(1.0)),
            entry("z", Some(9.0)),
            entry("none", None),
        ];

        sort_entries(&mut entries, SortMode::Magnitude);

        assert_eq!(names(&entries), vec!["z", "b", "C", "a", "none"]);
    }

    #[test]
    fn test_pinned_entry_first_in_every_mode() {
        let mut all = entry(ALL_NAME, Some(0.5));
        all.pinned = true;
        let mut entries = vec![entry("aaa", Some(10.0)), all, entry("bbb", Some(20.0))];

        sort_entries(&mut entries, SortMode::Magnitude);
        assert_eq!(names(&entries), vec!["All", "bbb", "aaa"]);

        sort_entries(&mut entries, SortMode::Alphabetical);
        assert_eq!(names(&entries), vec!["All", "aaa", "bbb"]);
    }

    #[test]
    fn test_sort_mode_from_str() {
        assert_eq!("total".parse::<SortMode>().unwrap(), SortMode::Magnitude);
        assert_eq!(
            "Alphabetical".parse::<SortMode>().unwrap(),
            SortMode::Alphabetical
        );
        assert!("random".parse::<SortMode>().is_err());
    }

    fn arb_entries() -> impl Strategy<Value = Vec<Entry>> {
        prop::collection::btree_map("[a-dA-D]{1,3}", prop::option::of(0u8..5), 0..12).prop_map(
            |map| {
                map.into_iter()
                    .map(|(name, value)| entry(&name, value.map(f64::from)))
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_resorting_is_a_no_op(mut entries in arb_entries(), magnitude in any::<bool>()) {
            let mode = if magnitude { SortMode::Magnitude } else { SortMode::Alphabetical };
            sort_entries(&mut entries, mode);
            let once = entries.clone();
            sort_entries(&mut entries, mode);
            prop_assert_eq!(once, entries);
        }

        #[test]
        fn prop_sort_ignores_input_order(entries in arb_entries(), magnitude in any::<bool>()) {
            let mode = if magnitude { SortMode::Magnitude } else { SortMode::Alphabetical };
            let mut forward = entries.clone();
            let mut reversed: Vec<Entry> = entries.into_iter().rev().collect();
            sort_entries(&mut forward, mode);
            sort_entries(&mut reversed, mode);
            prop_assert_eq!(forward, reversed);
        }
    }
}
