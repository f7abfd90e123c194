//! Statistics endpoints.
//!
//! Both routes accept `today=YYYY-MM-DD` plus any statistics setting key
//! (`status_dimension=designer`, `sort_duration=magnitude`, ...) as query
//! parameters. Settings not given fall back to the stored config.

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;

use super::{api_error, internal_error, ApiError};
use crate::statistics::{SelectedStatistics, Selection, StatisticsData, View};
use crate::store::{current_selection, parse_iso_date, today, RECORD_STORE};

/// Resolves the selection and reference date for one request.
pub fn resolve_query(
    mut selection: Selection,
    params: &HashMap<String, String>,
    default_today: NaiveDate,
) -> Result<(Selection, NaiveDate), ApiError> {
    let mut today = default_today;
    for (key, value) in params {
        if key == "today" {
            today = parse_iso_date(value).ok_or_else(|| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    format!("invalid date for `today`: `{value}`"),
                )
            })?;
            continue;
        }

        let known = selection
            .apply(key, value)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
        if !known {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("unknown query parameter `{key}`"),
            ));
        }
    }
    Ok((selection, today))
}

/// The part of `selected` shown by `view`.
pub fn view_json(selected: &SelectedStatistics<'_>, view: View) -> serde_json::Result<Value> {
    match view {
        View::Overview => serde_json::to_value(selected.overview),
        View::Timeline => serde_json::to_value(selected.timeline),
        View::Status => serde_json::to_value(selected.status),
        View::Shipped => serde_json::to_value(selected.shipped),
        View::Duration => Ok(serde_json::json!({
            "unit": selected.duration_unit,
            "entries": selected.duration,
        })),
    }
}

/// GET /api/statistics - Every aggregate tree.
pub async fn get_statistics(
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<StatisticsData>, ApiError> {
    let (selection, today) = resolve_query(current_selection(), &params, today())?;

    let mut store = RECORD_STORE
        .write()
        .map_err(|e| internal_error("Failed to read keysets", e))?;
    Ok(Json(store.statistics(&selection, today).clone()))
}

/// GET /api/statistics/:view - The slice of one tree picked by the selection.
pub async fn get_statistics_view(
    Path(view): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let view: View = view
        .parse()
        .map_err(|e| api_error(StatusCode::NOT_FOUND, e))?;
    let (selection, today) = resolve_query(current_selection(), &params, today())?;

    let mut store = RECORD_STORE
        .write()
        .map_err(|e| internal_error("Failed to read keysets", e))?;
    let data = store.statistics(&selection, today);
    view_json(&data.select(&selection), view)
        .map(Json)
        .map_err(|e| internal_error("Failed to encode statistics", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statistics::{compute_statistics, DateField, Dimension, SortMode};
    use crate::store::Keyset;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_resolve_query_overrides_selection() {
        let query = params(&[
            ("today", "2021-06-15"),
            ("timeline_field", "icDate"),
            ("duration_dimension", "vendor"),
            ("sort_duration", "magnitude"),
        ]);

        let (selection, today) =
            resolve_query(Selection::default(), &query, date(2030, 1, 1)).unwrap();

        assert_eq!(today, date(2021, 6, 15));
        assert_eq!(selection.timeline_field, DateField::IcDate);
        assert_eq!(selection.duration_dimension, Dimension::Vendor);
        assert_eq!(selection.sort.duration, SortMode::Magnitude);
        assert_eq!(selection.status_dimension, Dimension::Profile);
    }

    #[test]
    fn test_resolve_query_defaults_today() {
        let (selection, today) =
            resolve_query(Selection::default(), &HashMap::new(), date(2030, 1, 1)).unwrap();

        assert_eq!(today, date(2030, 1, 1));
        assert_eq!(selection, Selection::default());
    }

    #[test]
    fn test_resolve_query_rejects_bad_input() {
        let bad = [
            params(&[("today", "yesterday")]),
            params(&[("status_dimension", "colour")]),
            params(&[("page", "2")]),
        ];

        for query in &bad {
            let (status, _) =
                resolve_query(Selection::default(), query, date(2030, 1, 1)).unwrap_err();
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_view_json_shapes() {
        let mut keyset = Keyset::new("a", "SA", "One");
        keyset.gb_launch = "2021-01-01".to_string();
        keyset.gb_end = "2021-01-11".to_string();
        let selection = Selection::default();
        let data = compute_statistics(&[keyset], &selection, date(2021, 6, 15));
        let selected = data.select(&selection);

        let overview = view_json(&selected, View::Overview).unwrap();
        assert_eq!(overview["keysets"], 1);

        let status = view_json(&selected, View::Status).unwrap();
        assert_eq!(status[0]["name"], "SA");
        assert_eq!(status[0]["postGb"], 1);

        let duration = view_json(&selected, View::Duration).unwrap();
        assert_eq!(duration["unit"], "days");
        assert_eq!(duration["entries"][0]["name"], "All");
        assert_eq!(duration["entries"][0]["mean"], 10.0);

        let timeline = view_json(&selected, View::Timeline).unwrap();
        assert_eq!(timeline["months"][0]["label"], "2021-01");
    }
}
