//! Record store holding the current keyset collection.
//!
//! Keeps the record set the statistics are derived from, along with the
//! most recently computed statistics so repeated requests with the same
//! inputs do not redo the aggregation.

use super::types::Keyset;
use crate::statistics::{compute_statistics, DateField, Selection, StatisticsData};
use chrono::{DateTime, NaiveDate, Utc};

/// Statistics computed for one revision of the record set.
#[derive(Debug, Clone)]
struct CachedStatistics {
    revision: u64,
    today: NaiveDate,
    timeline_field: DateField,
    selection: Selection,
    data: StatisticsData,
}

/// The main store for keyset records.
///
/// This struct should be wrapped in `Arc<RwLock<RecordStore>>` for
/// thread-safe access from the HTTP handlers.
#[derive(Debug, Default)]
pub struct RecordStore {
    keysets: Vec<Keyset>,

    /// Bumped on every change to `keysets`.
    revision: u64,

    /// When the record set last changed.
    pub last_updated: Option<DateTime<Utc>>,

    cached: Option<CachedStatistics>,
}

impl RecordStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `keysets`.
    pub fn with_keysets(keysets: Vec<Keyset>) -> Self {
        let mut store = Self::new();
        store.replace_all(keysets);
        store
    }

    pub fn keysets(&self) -> &[Keyset] {
        &self.keysets
    }

    pub fn len(&self) -> usize {
        self.keysets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keysets.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the whole record set.
    pub fn replace_all(&mut self, keysets: Vec<Keyset>) {
        tracing::debug!(count = keysets.len(), "Replacing keyset records");
        self.keysets = keysets;
        self.touch();
    }

    /// Inserts `keyset`, replacing any record with the same id.
    ///
    /// Returns true if an existing record was replaced.
    pub fn upsert(&mut self, keyset: Keyset) -> bool {
        let position = match keyset.id.as_str() {
            "" => None,
            id => self.keysets.iter().position(|existing| existing.id == id),
        };
        let replaced = match position {
            Some(index) => {
                self.keysets[index] = keyset;
                true
            }
            None => {
                self.keysets.push(keyset);
                false
            }
        };
        self.touch();
        replaced
    }

    /// Removes the record with `id`. Returns true if one was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.keysets.len();
        self.keysets.retain(|keyset| keyset.id != id);
        let removed = self.keysets.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Statistics for the current record set.
    ///
    /// Reuses the cached pass when the records, `today` and the timeline
    /// field are unchanged; a change of sort modes only re-sorts it.
    pub fn statistics(&mut self, selection: &Selection, today: NaiveDate) -> &StatisticsData {
        let mut cached = match self.cached.take() {
            Some(cached)
                if cached.revision == self.revision
                    && cached.today == today
                    && cached.timeline_field == selection.timeline_field =>
            {
                cached
            }
            _ => {
                tracing::debug!(revision = self.revision, %today, "Recomputing statistics");
                CachedStatistics {
                    revision: self.revision,
                    today,
                    timeline_field: selection.timeline_field,
                    selection: *selection,
                    data: compute_statistics(&self.keysets, selection, today),
                }
            }
        };

        if cached.selection.sort != selection.sort {
            cached.data.sort_all(selection);
            cached.selection = *selection;
        }
        &self.cached.insert(cached).data
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.last_updated = Some(Utc::now());
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{Dimension, SortMode, SortSelection};

    fn keyset(id: &str, profile: &str) -> Keyset {
        let mut keyset = Keyset::new(id, profile, "Test");
        keyset.gb_launch = "2021-01-01".to_string();
        keyset.gb_end = "2021-01-31".to_string();
        keyset
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, 15).unwrap()
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let mut store = RecordStore::new();

        assert!(!store.upsert(keyset("a", "SA")));
        assert!(store.upsert(keyset("a", "Cherry")));
        assert!(!store.upsert(keyset("b", "KAT")));

        assert_eq!(store.len(), 2);
        assert_eq!(store.keysets()[0].profile, "Cherry");
    }

    #[test]
    fn test_remove() {
        let mut store = RecordStore::with_keysets(vec![keyset("a", "SA"), keyset("b", "SA")]);
        let revision = store.revision();

        assert!(store.remove("a"));
        assert!(!store.remove("missing"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), revision + 1);
    }

    #[test]
    fn test_statistics_follow_record_changes() {
        let mut store = RecordStore::with_keysets(vec![keyset("a", "SA")]);
        let selection = Selection::default();

        let first = store.statistics(&selection, today()).clone();
        store.upsert(keyset("b", "Cherry"));
        let second = store.statistics(&selection, today()).clone();

        assert_eq!(first.status[&Dimension::Profile].len(), 1);
        assert_eq!(second.status[&Dimension::Profile].len(), 2);
    }

    #[test]
    fn test_sort_change_reuses_cached_pass() {
        let mut store = RecordStore::with_keysets(vec![
            keyset("a", "SA"),
            keyset("b", "SA"),
            keyset("c", "Cherry"),
        ]);
        let by_total = Selection::default();
        let by_name = Selection {
            sort: SortSelection {
                status: SortMode::Alphabetical,
                ..Default::default()
            },
            ..Default::default()
        };

        let by_count = store.statistics(&by_total, today()).clone();
        let sorted = store.statistics(&by_name, today()).clone();

        assert_eq!(sorted, compute_statistics(store.keysets(), &by_name, today()));
        let names: Vec<&str> = sorted.status[&Dimension::Profile]
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["Cherry", "SA"]);
        assert_eq!(by_count.status[&Dimension::Profile][0].name, "SA");
    }

    #[test]
    fn test_empty_store_statistics() {
        let mut store = RecordStore::new();

        let data = store.statistics(&Selection::default(), today());

        assert!(data.timeline.is_empty());
        assert_eq!(data.overview.keysets, 0);
    }
}
