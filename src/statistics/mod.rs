//! Statistics aggregation engine.
//!
//! Turns the full keyset record set into the derived trees rendered by the
//! statistics page: a monthly timeline, status and shipped breakdowns per
//! dimension, and duration distributions.
//!
//! Every function here is pure. "Today" is always an explicit argument and
//! every map is ordered, so two passes over the same input produce identical
//! output.

pub mod dimension;
pub mod duration;
pub mod overview;
pub mod shipped;
pub mod sort;
pub mod status;
pub mod summary;
pub mod timeline;

pub use dimension::{group_by, group_names, Dimension, Group};
pub use duration::{compute_duration, months_between, DurationEntry, DurationUnit};
pub use overview::{compute_overview, Overview};
pub use shipped::{compute_shipped, ShippedEntry};
pub use sort::{compare_names, sort_entries, SortMode, Sortable, ALL_NAME};
pub use status::{classify, compute_status, Status, StatusEntry, StatusFlags};
pub use summary::{Histogram, SampleSummary};
pub use timeline::{compute_timeline, DateField, MonthBucket, TimelineData};

use crate::store::Keyset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// An unrecognised selector value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: `{value}`")]
pub struct ParseError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseError {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// One of the aggregate trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Overview,
    Timeline,
    Status,
    Shipped,
    Duration,
}

impl View {
    pub fn as_str(self) -> &'static str {
        match self {
            View::Overview => "overview",
            View::Timeline => "timeline",
            View::Status => "status",
            View::Shipped => "shipped",
            View::Duration => "duration",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for View {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" | "summary" => Ok(View::Overview),
            "timeline" => Ok(View::Timeline),
            "status" => Ok(View::Status),
            "shipped" => Ok(View::Shipped),
            "duration" => Ok(View::Duration),
            _ => Err(ParseError::new("view", s)),
        }
    }
}

/// Sort mode chosen for each sortable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSelection {
    pub status: SortMode,
    pub shipped: SortMode,
    pub duration: SortMode,
}

impl Default for SortSelection {
    fn default() -> Self {
        Self {
            status: SortMode::Magnitude,
            shipped: SortMode::Magnitude,
            duration: SortMode::Alphabetical,
        }
    }
}

/// Parameters chosen in the statistics UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub timeline_field: DateField,
    pub status_dimension: Dimension,
    pub shipped_dimension: Dimension,
    pub duration_field: DateField,
    pub duration_dimension: Dimension,
    pub sort: SortSelection,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            timeline_field: DateField::GbLaunch,
            status_dimension: Dimension::Profile,
            shipped_dimension: Dimension::Profile,
            duration_field: DateField::GbLaunch,
            duration_dimension: Dimension::Profile,
            sort: SortSelection::default(),
        }
    }
}

impl Selection {
    /// Setting keys understood by [`Selection::apply`].
    pub const KEYS: [&'static str; 8] = [
        "timeline_field",
        "status_dimension",
        "shipped_dimension",
        "duration_field",
        "duration_dimension",
        "sort_status",
        "sort_shipped",
        "sort_duration",
    ];

    /// Sets one selector from a `key = value` setting.
    ///
    /// Returns `Ok(false)` for keys that are not selectors.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<bool, ParseError> {
        match key {
            "timeline_field" => self.timeline_field = value.parse()?,
            "status_dimension" => self.status_dimension = value.parse()?,
            "shipped_dimension" => self.shipped_dimension = value.parse()?,
            "duration_field" => self.duration_field = value.parse()?,
            "duration_dimension" => self.duration_dimension = value.parse()?,
            "sort_status" => self.sort.status = value.parse()?,
            "sort_shipped" => self.sort.shipped = value.parse()?,
            "sort_duration" => self.sort.duration = value.parse()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Builds a selection from stored settings, skipping invalid values.
    pub fn from_settings<'a, I>(settings: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut selection = Self::default();
        for (key, value) in settings {
            if let Err(e) = selection.apply(key, value) {
                tracing::warn!(key, %e, "Ignoring invalid statistics setting");
            }
        }
        selection
    }

    /// Sort mode for `view`. Unsortable views report the default.
    pub fn sort_mode(&self, view: View) -> SortMode {
        match view {
            View::Status => self.sort.status,
            View::Shipped => self.sort.shipped,
            View::Duration => self.sort.duration,
            View::Overview | View::Timeline => SortMode::default(),
        }
    }
}

/// Every aggregate tree derived from one record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsData {
    pub today: Option<NaiveDate>,
    pub overview: Overview,
    pub timeline: TimelineData,
    pub status: BTreeMap<Dimension, Vec<StatusEntry>>,
    pub shipped: BTreeMap<Dimension, Vec<ShippedEntry>>,
    pub duration: BTreeMap<DateField, BTreeMap<Dimension, Vec<DurationEntry>>>,
}

/// The slices of [`StatisticsData`] picked by a [`Selection`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedStatistics<'a> {
    pub overview: &'a Overview,
    pub timeline: &'a TimelineData,
    pub status: &'a [StatusEntry],
    pub shipped: &'a [ShippedEntry],
    pub duration: &'a [DurationEntry],
    pub duration_unit: DurationUnit,
}

/// Computes every aggregate tree from `records`.
///
/// The timeline is built for `selection.timeline_field`; the breakdowns are
/// built for every dimension (and every duration field) and sorted with the
/// modes in `selection.sort`.
pub fn compute_statistics(
    records: &[Keyset],
    selection: &Selection,
    today: NaiveDate,
) -> StatisticsData {
    let mut status = BTreeMap::new();
    let mut shipped = BTreeMap::new();
    for dimension in Dimension::ALL {
        let mut entries = compute_status(records, dimension, today);
        sort_entries(&mut entries, selection.sort.status);
        status.insert(dimension, entries);

        let mut entries = compute_shipped(records, dimension, today);
        sort_entries(&mut entries, selection.sort.shipped);
        shipped.insert(dimension, entries);
    }

    let mut duration = BTreeMap::new();
    for field in DateField::ALL {
        let mut per_dimension = BTreeMap::new();
        for dimension in Dimension::ALL {
            let mut entries = compute_duration(records, field, dimension);
            sort_entries(&mut entries, selection.sort.duration);
            per_dimension.insert(dimension, entries);
        }
        duration.insert(field, per_dimension);
    }

    let data = StatisticsData {
        today: Some(today),
        overview: compute_overview(records, today),
        timeline: compute_timeline(records, selection.timeline_field),
        status,
        shipped,
        duration,
    };

    tracing::debug!(
        keysets = records.len(),
        months = data.timeline.months.len(),
        %today,
        "Computed statistics"
    );
    data
}

impl StatisticsData {
    /// Re-sorts one tree in place without recomputing it.
    pub fn sort_view(&mut self, view: View, mode: SortMode) {
        match view {
            View::Status => self
                .status
                .values_mut()
                .for_each(|entries| sort_entries(entries, mode)),
            View::Shipped => self
                .shipped
                .values_mut()
                .for_each(|entries| sort_entries(entries, mode)),
            View::Duration => self
                .duration
                .values_mut()
                .flat_map(BTreeMap::values_mut)
                .for_each(|entries| sort_entries(entries, mode)),
            View::Overview | View::Timeline => {}
        }
    }

    /// Applies every sort mode in `selection`.
    pub fn sort_all(&mut self, selection: &Selection) {
        for view in [View::Status, View::Shipped, View::Duration] {
            self.sort_view(view, selection.sort_mode(view));
        }
    }

    /// Picks the arrays the presentation layer shows for `selection`.
    pub fn select(&self, selection: &Selection) -> SelectedStatistics<'_> {
        let status = self.status.get(&selection.status_dimension);
        let shipped = self.shipped.get(&selection.shipped_dimension);
        let duration = self
            .duration
            .get(&selection.duration_field)
            .and_then(|per_dimension| per_dimension.get(&selection.duration_dimension));

        SelectedStatistics {
            overview: &self.overview,
            timeline: &self.timeline,
            status: status.map(Vec::as_slice).unwrap_or_default(),
            shipped: shipped.map(Vec::as_slice).unwrap_or_default(),
            duration: duration.map(Vec::as_slice).unwrap_or_default(),
            duration_unit: selection.duration_field.duration_unit(),
        }
    }
}
