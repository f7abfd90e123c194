//! SQLite database for persistent keyset storage.
//!
//! Holds the keyset records the statistics are computed from and the
//! key/value settings that pick the default statistics selection.

use crate::statistics::Selection;
use crate::store::{Keyset, Vendor};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result as SqlResult, Row};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default statistics settings seeded into an empty config table.
const DEFAULT_CONFIG: [(&str, &str, &str); 9] = [
    (
        "timeline_field",
        "gbLaunch",
        "Date field the timeline is bucketed on (icDate or gbLaunch)",
    ),
    (
        "status_dimension",
        "profile",
        "Dimension shown in the status breakdown",
    ),
    (
        "shipped_dimension",
        "profile",
        "Dimension shown in the shipped breakdown",
    ),
    (
        "duration_field",
        "gbLaunch",
        "Start date of the duration shown (icDate or gbLaunch)",
    ),
    (
        "duration_dimension",
        "profile",
        "Dimension shown in the duration breakdown",
    ),
    (
        "sort_status",
        "magnitude",
        "Status sort order (alphabetical or magnitude)",
    ),
    (
        "sort_shipped",
        "magnitude",
        "Shipped sort order (alphabetical or magnitude)",
    ),
    (
        "sort_duration",
        "alphabetical",
        "Duration sort order (alphabetical or magnitude)",
    ),
    (
        "import_path",
        "",
        "JSON file of keysets imported on startup when set",
    ),
];

/// Database wrapper with thread-safe connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Opens or creates the database at the default location.
    ///
    /// Creates <data dir>/keyset-stats/keysets.db if it doesn't exist.
    pub fn open() -> SqlResult<Self> {
        let db_path = Self::get_db_path();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        tracing::info!(path = ?db_path, "Opening database");

        let conn = Connection::open(&db_path)?;

        // Enable WAL mode for better crash safety
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let db = Self {
            conn: Mutex::new(conn),
        };

        db.init_schema()?;

        Ok(db)
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Returns the default database path.
    fn get_db_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keyset-stats")
            .join("keysets.db")
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initializes the database schema.
    fn init_schema(&self) -> SqlResult<()> {
        let conn = self.conn();

        conn.execute_batch(
            r#"
            -- Keyset records; list fields are stored as JSON arrays
            CREATE TABLE IF NOT EXISTS keysets (
                id TEXT PRIMARY KEY,
                profile TEXT NOT NULL,
                colorway TEXT NOT NULL DEFAULT '',
                designer TEXT NOT NULL DEFAULT '[]',
                vendors TEXT NOT NULL DEFAULT '[]',
                ic_date TEXT NOT NULL DEFAULT '',
                gb_launch TEXT NOT NULL DEFAULT '',
                gb_end TEXT NOT NULL DEFAULT '',
                gb_month BOOLEAN NOT NULL DEFAULT 0,
                shipped BOOLEAN NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL
            );

            -- Configuration settings
            CREATE TABLE IF NOT EXISTS config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                description TEXT,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_keysets_profile ON keysets(profile);
            "#,
        )?;

        // Seed default config if empty
        let config_count: i64 = conn.query_row("SELECT COUNT(*) FROM config", [], |r| r.get(0))?;
        if config_count == 0 {
            let now = Utc::now().to_rfc3339();
            for (key, value, description) in DEFAULT_CONFIG {
                conn.execute(
                    "INSERT INTO config (key, value, description, updated_at) VALUES (?1, ?2, ?3, ?4)",
                    params![key, value, description, &now],
                )?;
            }

            tracing::info!("Added {} default config settings", DEFAULT_CONFIG.len());
        }

        tracing::debug!("Database schema initialized");
        Ok(())
    }

    // === Keyset Methods ===

    /// Inserts or updates a keyset by id.
    pub fn save_keyset(&self, keyset: &Keyset) -> SqlResult<()> {
        let conn = self.conn();
        upsert_keyset(&conn, keyset)
    }

    /// Replaces every stored keyset with `keysets` in one transaction.
    pub fn replace_keysets(&self, keysets: &[Keyset]) -> SqlResult<usize> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM keysets", [])?;
        for keyset in keysets {
            upsert_keyset(&tx, keyset)?;
        }
        tx.commit()?;

        tracing::info!(count = keysets.len(), "Replaced stored keysets");
        Ok(keysets.len())
    }

    /// Loads every stored keyset, ordered by id.
    pub fn load_keysets(&self) -> SqlResult<Vec<Keyset>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, profile, colorway, designer, vendors, ic_date, gb_launch, gb_end, gb_month, shipped
             FROM keysets ORDER BY id",
        )?;
        let rows = stmt.query_map([], keyset_from_row)?;
        rows.collect()
    }

    /// Deletes a keyset. Returns true if it existed.
    pub fn delete_keyset(&self, id: &str) -> SqlResult<bool> {
        let conn = self.conn();
        let changed = conn.execute("DELETE FROM keysets WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Number of stored keysets.
    pub fn keyset_count(&self) -> SqlResult<i64> {
        let conn = self.conn();
        conn.query_row("SELECT COUNT(*) FROM keysets", [], |row| row.get(0))
    }

    // === Config Methods ===

    /// Gets a configuration value by key.
    pub fn get_config(&self, key: &str) -> SqlResult<Option<String>> {
        let conn = self.conn();
        match conn.query_row(
            "SELECT value FROM config WHERE key = ?1",
            params![key],
            |row| row.get(0),
        ) {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Sets a configuration value, creating the key if needed.
    pub fn set_config(&self, key: &str, value: &str) -> SqlResult<()> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO config (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, &now],
        )?;
        Ok(())
    }

    /// Gets all config settings.
    pub fn get_all_config(&self) -> SqlResult<Vec<ConfigEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT key, value, description FROM config ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok(ConfigEntry {
                key: row.get(0)?,
                value: row.get(1)?,
                description: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    /// The statistics selection described by the stored settings.
    pub fn load_selection(&self) -> SqlResult<Selection> {
        let config = self.get_all_config()?;
        Ok(Selection::from_settings(
            config
                .iter()
                .map(|entry| (entry.key.as_str(), entry.value.as_str())),
        ))
    }
}

fn upsert_keyset(conn: &Connection, keyset: &Keyset) -> SqlResult<()> {
    let designer = to_json(&keyset.designer)?;
    let vendors = to_json(&keyset.vendors)?;
    conn.execute(
        "INSERT INTO keysets (id, profile, colorway, designer, vendors, ic_date, gb_launch, gb_end, gb_month, shipped, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
         ON CONFLICT(id) DO UPDATE SET
            profile = excluded.profile,
            colorway = excluded.colorway,
            designer = excluded.designer,
            vendors = excluded.vendors,
            ic_date = excluded.ic_date,
            gb_launch = excluded.gb_launch,
            gb_end = excluded.gb_end,
            gb_month = excluded.gb_month,
            shipped = excluded.shipped,
            updated_at = excluded.updated_at",
        params![
            keyset.id,
            keyset.profile,
            keyset.colorway,
            designer,
            vendors,
            keyset.ic_date,
            keyset.gb_launch,
            keyset.gb_end,
            keyset.gb_month,
            keyset.shipped,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn keyset_from_row(row: &Row<'_>) -> SqlResult<Keyset> {
    let designer: String = row.get(3)?;
    let vendors: String = row.get(4)?;
    Ok(Keyset {
        id: row.get(0)?,
        profile: row.get(1)?,
        colorway: row.get(2)?,
        designer: from_json::<Vec<String>>(3, &designer)?,
        vendors: from_json::<Vec<Vendor>>(4, &vendors)?,
        ic_date: row.get(5)?,
        gb_launch: row.get(6)?,
        gb_end: row.get(7)?,
        gb_month: row.get(8)?,
        shipped: row.get(9)?,
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> SqlResult<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_json<T: serde::de::DeserializeOwned>(column: usize, raw: &str) -> SqlResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

/// A configuration setting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}
