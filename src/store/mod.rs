//! Keyset storage module.
//!
//! Provides the thread-safe record store the statistics are computed from,
//! the optional SQLite persistence behind it, and the broadcast channel that
//! pushes fresh statistics to WebSocket clients.

pub mod record_store;
pub mod types;

pub use record_store::*;
pub use types::*;

use crate::database::Database;
use crate::statistics::Selection;
use chrono::{NaiveDate, Utc};
use once_cell::sync::{Lazy, OnceCell};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::broadcast;

/// Global thread-safe record store.
pub static RECORD_STORE: Lazy<Arc<RwLock<RecordStore>>> =
    Lazy::new(|| Arc::new(RwLock::new(RecordStore::new())));

/// Global database connection (initialized on first use).
pub static DATABASE: Lazy<Option<Arc<Mutex<Database>>>> = Lazy::new(|| match Database::open() {
    Ok(db) => {
        tracing::info!("Database initialized successfully");
        Some(Arc::new(Mutex::new(db)))
    }
    Err(e) => {
        tracing::error!(
            ?e,
            "Failed to initialize database, running without persistence"
        );
        None
    }
});

/// Global WebSocket broadcast sender (set by HTTP server).
pub static BROADCAST_TX: OnceCell<broadcast::Sender<String>> = OnceCell::new();

/// Errors raised while loading or persisting keysets.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid keyset JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read keyset file: {0}")]
    Io(#[from] std::io::Error),
    #[error("keyset store lock poisoned")]
    Poisoned,
    #[error("duplicate keyset id `{0}`")]
    DuplicateId(String),
    #[error("keyset id is required")]
    MissingId,
}

impl StoreError {
    /// The request itself was invalid, as opposed to a storage failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            StoreError::DuplicateId(_) | StoreError::MissingId | StoreError::Json(_)
        )
    }
}

/// Checks ids are unique and gives every id-less keyset a fresh one.
///
/// Generated ids are `keyset-NNNN`, skipping any id already in use.
pub fn prepare_import(keysets: &mut [Keyset]) -> Result<(), StoreError> {
    let mut taken = BTreeSet::new();
    for keyset in keysets.iter() {
        let id = keyset.id.trim();
        if !id.is_empty() && !taken.insert(id.to_string()) {
            return Err(StoreError::DuplicateId(id.to_string()));
        }
    }

    let mut next = 1u32;
    let mut generated = 0usize;
    for keyset in keysets.iter_mut().filter(|k| k.id.trim().is_empty()) {
        let id = loop {
            let candidate = format!("keyset-{next:04}");
            next += 1;
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(id.clone());
        keyset.id = id;
        generated += 1;
    }

    if generated > 0 {
        tracing::debug!(generated, "Assigned ids to keysets without one");
    }
    Ok(())
}

/// Wraps `data` in the `{type, data, timestamp}` envelope sent to clients.
pub fn update_message(update_type: &str, data: &impl serde::Serialize) -> Option<String> {
    let message = serde_json::json!({
        "type": update_type,
        "data": data,
        "timestamp": Utc::now().to_rfc3339(),
    });
    serde_json::to_string(&message).ok()
}

/// Sends an update to all connected WebSocket clients.
pub fn broadcast_update(update_type: &str, data: &impl serde::Serialize) {
    if let Some(tx) = BROADCAST_TX.get() {
        if let Some(json) = update_message(update_type, data) {
            // No receivers is fine; nobody is listening yet
            let _ = tx.send(json);
        }
    }
}

/// The current calendar date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// The selection stored in the database config, or the defaults.
pub fn current_selection() -> Selection {
    let Some(db) = DATABASE.as_ref().and_then(|db| db.lock().ok()) else {
        return Selection::default();
    };
    match db.load_selection() {
        Ok(selection) => selection,
        Err(e) => {
            tracing::warn!(?e, "Failed to read statistics settings, using defaults");
            Selection::default()
        }
    }
}

/// Loads the persisted keysets into the record store.
///
/// Returns the number of keysets loaded; zero when running without a
/// database.
pub fn load_from_db() -> Result<usize, StoreError> {
    let Some(db_arc) = DATABASE.as_ref() else {
        return Ok(0);
    };
    let keysets = db_arc
        .lock()
        .map_err(|_| StoreError::Poisoned)?
        .load_keysets()?;
    let count = keysets.len();

    RECORD_STORE
        .write()
        .map_err(|_| StoreError::Poisoned)?
        .replace_all(keysets);

    tracing::info!(count, "Loaded keysets from database");
    Ok(count)
}

/// Replaces every keyset, persisting them when a database is available.
///
/// Keysets without an id get a generated one; duplicate ids are rejected
/// before anything is written.
pub fn import_keysets(mut keysets: Vec<Keyset>) -> Result<usize, StoreError> {
    prepare_import(&mut keysets)?;

    if let Some(db_arc) = DATABASE.as_ref() {
        db_arc
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .replace_keysets(&keysets)?;
    }

    let count = keysets.len();
    RECORD_STORE
        .write()
        .map_err(|_| StoreError::Poisoned)?
        .replace_all(keysets);

    tracing::info!(count, "Imported keysets");
    broadcast_statistics();
    Ok(count)
}

/// Reads a JSON array of keysets from `path` and imports it.
pub fn import_json_file(path: impl AsRef<Path>) -> Result<usize, StoreError> {
    let path = path.as_ref();
    tracing::info!(path = ?path, "Importing keysets from file");
    let raw = std::fs::read_to_string(path)?;
    let keysets = parse_keysets(&raw)?;
    import_keysets(keysets)
}

/// Parses a JSON array of keysets.
pub fn parse_keysets(raw: &str) -> Result<Vec<Keyset>, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

/// Inserts or replaces one keyset. Returns true if it replaced an existing
/// record.
pub fn save_keyset(keyset: Keyset) -> Result<bool, StoreError> {
    if keyset.id.trim().is_empty() {
        return Err(StoreError::MissingId);
    }

    if let Some(db_arc) = DATABASE.as_ref() {
        db_arc
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .save_keyset(&keyset)?;
    }

    let replaced = RECORD_STORE
        .write()
        .map_err(|_| StoreError::Poisoned)?
        .upsert(keyset);

    broadcast_statistics();
    Ok(replaced)
}

/// Deletes one keyset. Returns true if it existed.
pub fn delete_keyset(id: &str) -> Result<bool, StoreError> {
    if let Some(db_arc) = DATABASE.as_ref() {
        db_arc
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .delete_keyset(id)?;
    }

    let removed = RECORD_STORE
        .write()
        .map_err(|_| StoreError::Poisoned)?
        .remove(id);

    if removed {
        broadcast_statistics();
    }
    Ok(removed)
}

/// The `statistics` message for the stored selection and today's date.
pub fn statistics_message() -> Option<String> {
    let selection = current_selection();
    let mut store = RECORD_STORE.write().ok()?;
    let data = store.statistics(&selection, today());
    update_message("statistics", &data.select(&selection))
}

/// Pushes the statistics for the stored selection to WebSocket clients.
pub fn broadcast_statistics() {
    let Some(tx) = BROADCAST_TX.get() else {
        return;
    };
    if let Some(json) = statistics_message() {
        let _ = tx.send(json);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_store_accessible() {
        let store = RECORD_STORE.read().unwrap();
        let _ = store.len();
    }

    #[test]
    fn test_parse_keysets() {
        let raw = r#"[
            {
                "id": "k1",
                "profile": "SA",
                "colorway": "Jukebox",
                "designer": ["Alice"],
                "vendors": [{"name": "NovelKeys", "region": "US"}],
                "icDate": "2021-01-05",
                "gbLaunch": "2021-02-01",
                "gbEnd": "2021-02-15",
                "shipped": true
            },
            {"id": "k2", "profile": "Cherry", "colorway": "Blank"}
        ]"#;

        let keysets = parse_keysets(raw).unwrap();

        assert_eq!(keysets.len(), 2);
        assert_eq!(keysets[0].vendors[0].name, "NovelKeys");
        assert!(keysets[0].shipped);
        assert!(!keysets[1].gb_month);
        assert!(keysets[1].designer.is_empty());
    }

    #[test]
    fn test_prepare_import_assigns_unique_ids() {
        let mut keysets = vec![
            Keyset::new("", "SA", "One"),
            Keyset::new("keyset-0001", "SA", "Two"),
            Keyset::new("  ", "Cherry", "Three"),
            Keyset::new("", "KAT", "Four"),
        ];

        prepare_import(&mut keysets).unwrap();

        let ids: Vec<&str> = keysets.iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, vec!["keyset-0002", "keyset-0001", "keyset-0003", "keyset-0004"]);
    }

    #[test]
    fn test_prepare_import_rejects_duplicate_ids() {
        let mut keysets = vec![
            Keyset::new("a", "SA", "One"),
            Keyset::new("", "SA", "Two"),
            Keyset::new("a", "Cherry", "Three"),
        ];

        let err = prepare_import(&mut keysets).unwrap_err();

        assert!(matches!(err, StoreError::DuplicateId(ref id) if id == "a"));
        assert!(err.is_invalid_input());
        assert_eq!(keysets[1].id, "");
    }

    #[test]
    fn test_save_keyset_requires_id() {
        let err = save_keyset(Keyset::new("", "SA", "One")).unwrap_err();
        assert!(matches!(err, StoreError::MissingId));
    }

    #[test]
    fn test_parse_keysets_rejects_malformed_json() {
        let err = parse_keysets("{not json").unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }

    #[test]
    fn test_import_missing_file_is_io_error() {
        let err = import_json_file("/nonexistent/keysets.json").unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_update_message_envelope() {
        let json = update_message("statistics", &serde_json::json!({"keysets": 3})).unwrap();
        let message: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(message["type"], "statistics");
        assert_eq!(message["data"]["keysets"], 3);
        assert!(message["timestamp"].is_string());
    }

    #[test]
    fn test_broadcast_without_server_is_noop() {
        broadcast_update("statistics", &serde_json::json!({"ok": true}));
        broadcast_statistics();
    }
}
