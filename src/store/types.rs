//! Data types for tracked keysets.
//!
//! Defines the record shape shared by the store, the database and the
//! statistics engine, plus the parsed forms of its date fields.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Format of every full-precision date field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A vendor selling a keyset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    /// Vendor display name. Used as the grouping key for vendor breakdowns.
    pub name: String,

    /// Region the vendor ships to (e.g. "Europe").
    #[serde(default)]
    pub region: String,

    /// Product page at the vendor, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_link: Option<String>,
}

/// A single group-buy product record.
///
/// Date fields are kept as the raw strings supplied by the record store;
/// the accessors below parse them on demand so one malformed field never
/// poisons the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyset {
    /// Document id in the record store.
    #[serde(default)]
    pub id: String,

    /// Keycap profile (e.g. "Cherry", "SA").
    pub profile: String,

    /// Colorway name.
    #[serde(default)]
    pub colorway: String,

    /// Designers credited for the set.
    #[serde(default)]
    pub designer: Vec<String>,

    /// Vendors running the group buy.
    #[serde(default)]
    pub vendors: Vec<Vendor>,

    /// Interest check date (`YYYY-MM-DD`) or empty.
    #[serde(default)]
    pub ic_date: String,

    /// Group buy launch: ISO date, `Q<n> YYYY`, `YYYY-MM` or empty.
    #[serde(default)]
    pub gb_launch: String,

    /// Group buy end date (`YYYY-MM-DD`) or empty.
    #[serde(default)]
    pub gb_end: String,

    /// Whether `gb_launch` only carries month precision.
    #[serde(default)]
    pub gb_month: bool,

    /// Whether the set has shipped.
    #[serde(default)]
    pub shipped: bool,
}

impl Keyset {
    /// Creates a keyset with the given identity and no dates.
    pub fn new(
        id: impl Into<String>,
        profile: impl Into<String>,
        colorway: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            profile: profile.into(),
            colorway: colorway.into(),
            ..Default::default()
        }
    }

    /// Display name used in log output.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.profile, self.colorway).trim().to_string()
    }

    /// Parsed interest check date.
    pub fn ic_date(&self) -> ParsedDate {
        ParsedDate::parse(&self.ic_date)
    }

    /// Parsed group buy launch.
    pub fn launch(&self) -> LaunchDate {
        LaunchDate::parse(&self.gb_launch, self.gb_month)
    }

    /// Parsed group buy end date.
    pub fn end_date(&self) -> ParsedDate {
        ParsedDate::parse(&self.gb_end)
    }

    /// Returns true when the buy window closed before `yesterday` started.
    ///
    /// The end date is taken at its final instant, so a set ending yesterday
    /// is still considered open today.
    pub fn window_closed(&self, today: NaiveDate) -> bool {
        match self.end_date() {
            ParsedDate::Date(end) => end_of_day(end) <= start_of_day(today - Duration::days(1)),
            _ => false,
        }
    }
}

/// A full-precision date field after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedDate {
    /// Empty string: the field was never filled in.
    Absent,
    /// A valid `YYYY-MM-DD` date.
    Date(NaiveDate),
    /// Non-empty but unparseable.
    Malformed,
}

impl ParsedDate {
    /// Parses a raw `YYYY-MM-DD` field. A trailing time part is ignored.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return ParsedDate::Absent;
        }
        parse_iso_date(raw).map_or(ParsedDate::Malformed, ParsedDate::Date)
    }

    /// The date, if valid.
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            ParsedDate::Date(date) => Some(date),
            _ => None,
        }
    }
}

/// The group buy launch after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchDate {
    /// No launch announced.
    Unscheduled,
    /// Only a quarter is known, e.g. `Q3 2021`.
    Quarter { quarter: u8, year: i32 },
    /// Month precision; holds the first day of the month.
    Month(NaiveDate),
    /// Full date.
    Day(NaiveDate),
    /// Non-empty but unparseable.
    Malformed,
}

impl LaunchDate {
    /// Parses a raw launch field. `month_only` forces month precision.
    pub fn parse(raw: &str, month_only: bool) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return LaunchDate::Unscheduled;
        }
        if let Some((quarter, year)) = parse_quarter(raw) {
            return LaunchDate::Quarter { quarter, year };
        }
        if let Some(date) = parse_iso_date(raw) {
            return if month_only {
                LaunchDate::Month(first_of_month(date))
            } else {
                LaunchDate::Day(date)
            };
        }
        match parse_year_month(raw) {
            Some(date) => LaunchDate::Month(date),
            None => LaunchDate::Malformed,
        }
    }

    /// First day the launch could fall on, for month or day precision.
    pub fn start(self) -> Option<NaiveDate> {
        match self {
            LaunchDate::Day(date) | LaunchDate::Month(date) => Some(date),
            _ => None,
        }
    }

    /// The launch date only when it carries full day precision.
    pub fn full_date(self) -> Option<NaiveDate> {
        match self {
            LaunchDate::Day(date) => Some(date),
            _ => None,
        }
    }

    /// Interest-check state: nothing scheduled beyond a quarter.
    pub fn is_unscheduled(self) -> bool {
        matches!(
            self,
            LaunchDate::Unscheduled | LaunchDate::Quarter { .. } | LaunchDate::Malformed
        )
    }
}

/// Parses `YYYY-MM-DD`, tolerating a trailing `T...` time component.
pub fn parse_iso_date(raw: &str) -> Option<NaiveDate> {
    let date_part = match raw.split_once('T') {
        Some((date, _)) => date,
        None => raw,
    };
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_year_month(raw: &str) -> Option<NaiveDate> {
    let (year, month) = raw.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
}

/// Parses a `Q<1-4> YYYY` token into `(quarter, year)`.
pub fn parse_quarter(raw: &str) -> Option<(u8, i32)> {
    let mut parts = raw.split_whitespace();
    let quarter = parts.next()?.strip_prefix('Q')?.parse::<u8>().ok()?;
    let year = parts.next()?.parse::<i32>().ok()?;
    if parts.next().is_some() || !(1..=4).contains(&quarter) {
        return None;
    }
    Some((quarter, year))
}

/// First day of the month containing `date`.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day0(0).unwrap_or(date)
}

/// Midnight at the start of `date`.
pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Final instant of `date`.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(last)
}
