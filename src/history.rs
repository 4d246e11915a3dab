//! Local price-history store.
//!
//! A small SQLite database that keeps the operator's noted produce prices
//! between runs. The derivation pipeline never consults it; stage-4 pricing
//! always comes from the assignment record. This exists so an operator can
//! note today's market price and look back at it later.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Owned handle to the history database.
pub struct HistoryStore {
    conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// One noted price.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PriceNote {
    pub id: String,
    pub product: String,
    pub price: f64,
    pub noted_at: String,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 1;

impl HistoryStore {
    /// Open `{data_dir}/history.db`, creating the directory, applying
    /// pragmas, and running pending migrations. On open failure the file is
    /// deleted and opened once more.
    pub fn init(data_dir: &Path) -> Result<Self, String> {
        fs::create_dir_all(data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

        let db_path = data_dir.join("history.db");
        info!("Opening price history at {}", db_path.display());

        let conn = match open_and_configure(&db_path) {
            Ok(c) => c,
            Err(first_err) => {
                warn!(
                    "History database open failed ({}), deleting and retrying once",
                    first_err
                );
                if db_path.exists() {
                    let _ = fs::remove_file(&db_path);
                    let _ = fs::remove_file(db_path.with_extension("db-wal"));
                    let _ = fs::remove_file(db_path.with_extension("db-shm"));
                }
                open_and_configure(&db_path)
                    .map_err(|e| format!("History database open failed after retry: {e}"))?
            }
        };

        run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// In-memory store, used by tests.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, String> {
        let conn = Connection::open_in_memory().map_err(|e| format!("sqlite open: {e}"))?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Record a price for a product at the current time. Returns the note id.
    pub fn append(&self, product: &str, price: f64) -> Result<String, String> {
        let product = product.trim();
        if product.is_empty() {
            return Err("Product name is required".to_string());
        }

        let id = Uuid::new_v4().to_string();
        let noted_at = chrono::Utc::now().to_rfc3339();
        let conn = self.conn.lock().map_err(|_| "History store lock poisoned")?;
        conn.execute(
            "INSERT INTO price_history (id, product, price, noted_at) VALUES (?1, ?2, ?3, ?4)",
            params![id, product, price, noted_at],
        )
        .map_err(|e| format!("Failed to record price: {e}"))?;
        Ok(id)
    }

    /// Most recent note for a product, if any. Matching is case-insensitive.
    pub fn latest(&self, product: &str) -> Result<Option<PriceNote>, String> {
        let conn = self.conn.lock().map_err(|_| "History store lock poisoned")?;
        let mut stmt = conn
            .prepare(
                "SELECT id, product, price, noted_at FROM price_history
                 WHERE product = ?1 COLLATE NOCASE
                 ORDER BY noted_at DESC LIMIT 1",
            )
            .map_err(|e| format!("Failed to query price history: {e}"))?;
        let mut rows = stmt
            .query_map(params![product.trim()], note_from_row)
            .map_err(|e| format!("Failed to query price history: {e}"))?;
        match rows.next() {
            Some(row) => row
                .map(Some)
                .map_err(|e| format!("Failed to read price note: {e}")),
            None => Ok(None),
        }
    }

    /// All notes for a product, newest first.
    pub fn list_for_product(&self, product: &str) -> Result<Vec<PriceNote>, String> {
        let conn = self.conn.lock().map_err(|_| "History store lock poisoned")?;
        let mut stmt = conn
            .prepare(
                "SELECT id, product, price, noted_at FROM price_history
                 WHERE product = ?1 COLLATE NOCASE
                 ORDER BY noted_at DESC",
            )
            .map_err(|e| format!("Failed to query price history: {e}"))?;
        let rows = stmt
            .query_map(params![product.trim()], note_from_row)
            .map_err(|e| format!("Failed to query price history: {e}"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("Failed to read price notes: {e}"))
    }
}

fn note_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PriceNote> {
    Ok(PriceNote {
        id: row.get(0)?,
        product: row.get(1)?,
        price: row.get(2)?,
        noted_at: row.get(3)?,
    })
}

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    info!("Migrating price history from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Migration v1: the price_history table.
fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS price_history (
            id TEXT PRIMARY KEY,
            product TEXT NOT NULL,
            price REAL NOT NULL,
            noted_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_price_history_product
            ON price_history (product COLLATE NOCASE, noted_at DESC);

        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| format!("migration v1: {e}"))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_latest() {
        let store = HistoryStore::in_memory().unwrap();
        store.append("Tomato", 18.0).unwrap();
        store.append("Tomato", 20.0).unwrap();
        store.append("Beans", 55.0).unwrap();

        let latest = store.latest("tomato").unwrap().expect("note exists");
        assert_eq!(latest.product, "Tomato");
        assert_eq!(latest.price, 20.0);

        let all = store.list_for_product("Tomato").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].price, 20.0);
    }

    #[test]
    fn test_blank_product_rejected() {
        let store = HistoryStore::in_memory().unwrap();
        assert!(store.append("  ", 10.0).is_err());
        assert!(store.latest("Tomato").unwrap().is_none());
    }
}
