//! Guest record persistence.
//!
//! Records live as one JSON array under a fixed key in a small SQLite
//! key-value table. Every operation reads and rewrites the whole array,
//! which is fine at guest book scale (a handful of entries a day) and keeps
//! the on-disk layout trivial to inspect and back up.
//!
//! A connection is opened per call; SQLite with WAL handles that cheaply
//! and it keeps the store free of long-lived handles.

use std::fs;
use std::path::PathBuf;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::error::Result;
use crate::record::VisitRecord;

/// Namespace key holding the guest book array.
const GUEST_BOOK_KEY: &str = "tamu/guest-book";

/// SQLite-backed guest book.
pub struct GuestStore {
    db_path: PathBuf,
}

impl GuestStore {
    /// Platform-conventional database location.
    pub fn default_db_path() -> PathBuf {
        #[cfg(windows)]
        {
            let base = std::env::var("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."));
            base.join("Lattice Labs").join("Tamu").join("tamu.db")
        }
        #[cfg(not(windows))]
        {
            let base = std::env::var("XDG_DATA_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                    PathBuf::from(home).join(".local").join("share")
                });
            base.join("tamu").join("tamu.db")
        }
    }

    /// Open a store at `db_path`, creating parent directories and the
    /// schema as needed.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             CREATE TABLE IF NOT EXISTS kv (
                 namespace TEXT PRIMARY KEY,
                 payload   TEXT NOT NULL
             );",
        )?;
        Ok(())
    }

    /// All records, newest first.
    ///
    /// A missing or malformed payload degrades to an empty list with a
    /// warning; only infrastructure errors propagate.
    pub fn list(&self) -> Result<Vec<VisitRecord>> {
        let conn = self.open()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM kv WHERE namespace = ?1",
                params![GUEST_BOOK_KEY],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&payload) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!("malformed guest book payload, starting empty: {e}");
                Ok(Vec::new())
            }
        }
    }

    /// Prepend `record` so the newest entry stays first.
    pub fn append_front(&self, record: &VisitRecord) -> Result<()> {
        let mut records = self.list()?;
        records.insert(0, record.clone());
        self.save(&records)
    }

    /// Remove the record with `id`. Removing an unknown id is a no-op.
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut records = self.list()?;
        records.retain(|record| record.id != id);
        self.save(&records)
    }

    fn save(&self, records: &[VisitRecord]) -> Result<()> {
        let payload = serde_json::to_string(records)?;
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO kv (namespace, payload) VALUES (?1, ?2)
             ON CONFLICT(namespace) DO UPDATE SET payload = excluded.payload",
            params![GUEST_BOOK_KEY, payload],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{new_id, now_millis, today_stamp};

    fn temp_store() -> (GuestStore, PathBuf) {
        let dir = std::env::temp_dir().join(new_id("tamu-store-test"));
        let store = GuestStore::new(dir.join("tamu.db")).expect("open temp store");
        (store, dir)
    }

    fn sample(name: &str) -> VisitRecord {
        VisitRecord {
            id: new_id("visit"),
            visit_date: today_stamp(),
            visitor_name: name.to_string(),
            affiliation: "SMA Negeri 1".into(),
            address: "Jl. Pemuda 10".into(),
            purpose: "konsultasi".into(),
            signature_image: "data:image/png;base64,AAAA".into(),
            created_at: now_millis(),
        }
    }

    #[test]
    fn empty_store_lists_nothing() {
        let (store, dir) = temp_store();
        assert!(store.list().unwrap().is_empty());
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn append_front_keeps_newest_first() {
        let (store, dir) = temp_store();
        let first = sample("Budi");
        let second = sample("Siti");
        store.append_front(&first).unwrap();
        store.append_front(&second).unwrap();

        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].visitor_name, "Siti");
        assert_eq!(records[1].visitor_name, "Budi");
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn remove_deletes_only_the_matching_id() {
        let (store, dir) = temp_store();
        let a = sample("Budi");
        let b = sample("Siti");
        let c = sample("Andi");
        for record in [&a, &b, &c] {
            store.append_front(record).unwrap();
        }

        store.remove(&b.id).unwrap();
        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, c.id);
        assert_eq!(records[1].id, a.id);

        // Unknown id is a no-op.
        store.remove("visit-nope").unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn malformed_payload_degrades_to_empty() {
        let (store, dir) = temp_store();
        store.append_front(&sample("Budi")).unwrap();

        let conn = store.open().unwrap();
        conn.execute(
            "UPDATE kv SET payload = ?1 WHERE namespace = ?2",
            params!["{not json", GUEST_BOOK_KEY],
        )
        .unwrap();
        drop(conn);

        assert!(store.list().unwrap().is_empty());

        // The store recovers on the next write.
        store.append_front(&sample("Siti")).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn records_survive_reopen() {
        let (store, dir) = temp_store();
        let record = sample("Budi");
        store.append_front(&record).unwrap();
        let db_path = store.db_path.clone();
        drop(store);

        let reopened = GuestStore::new(db_path).unwrap();
        let records = reopened.list().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, record.id);
        fs::remove_dir_all(dir).ok();
    }
}
