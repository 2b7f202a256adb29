//! Durable snapshot storage for the in-memory query cache.
//!
//! The in-memory map owned by `CacheLayer` is authoritative; storage only has
//! to survive restarts. Snapshots are rehydrated wholesale at startup and
//! flushed back by the layer's throttled writer.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// One persisted cache slot: serialized response bytes plus metadata.
#[derive(Debug, Clone)]
pub struct Snapshot {
  pub key: String,
  pub description: String,
  pub entity_type: String,
  pub data: Vec<u8>,
  pub cached_at: DateTime<Utc>,
}

/// Trait for snapshot storage backends.
pub trait CacheStorage: Send + Sync {
  /// Load every stored snapshot (rehydration at process start).
  fn load_all(&self) -> Result<Vec<Snapshot>>;

  /// Insert or replace a snapshot.
  fn persist(&self, snapshot: &Snapshot) -> Result<()>;

  /// Remove a snapshot by key. Removing an absent key is not an error.
  fn remove(&self, key: &str) -> Result<()>;

  /// Delete snapshots cached before the cutoff. Returns how many were evicted.
  fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Storage that doesn't persist anything. Used when caching is disabled -
/// every process start begins with an empty cache.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn load_all(&self) -> Result<Vec<Snapshot>> {
    Ok(Vec::new())
  }

  fn persist(&self, _snapshot: &Snapshot) -> Result<()> {
    Ok(())
  }

  fn remove(&self, _key: &str) -> Result<()> {
    Ok(())
  }

  fn evict_older_than(&self, _cutoff: DateTime<Utc>) -> Result<usize> {
    Ok(0)
  }
}

/// SQLite-backed snapshot storage.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_snapshots (
    query_hash TEXT PRIMARY KEY,
    query_description TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL
);
"#;

impl SqliteStorage {
  /// Open (or create) the snapshot database at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// In-memory database, used by tests.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory db: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("trk").join("cache.db"))
  }
}

impl CacheStorage for SqliteStorage {
  fn load_all(&self) -> Result<Vec<Snapshot>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT query_hash, query_description, entity_type, data, cached_at
         FROM query_snapshots",
      )
      .map_err(|e| eyre!("Failed to prepare snapshot query: {}", e))?;

    let rows = stmt
      .query_map([], |row| {
        Ok((
          row.get::<_, String>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, Vec<u8>>(3)?,
          row.get::<_, String>(4)?,
        ))
      })
      .map_err(|e| eyre!("Failed to query snapshots: {}", e))?;

    let mut snapshots = Vec::new();
    for row in rows {
      let (key, description, entity_type, data, cached_at_str) =
        row.map_err(|e| eyre!("Failed to read snapshot row: {}", e))?;
      // A snapshot with an unparseable timestamp is dropped rather than
      // poisoning rehydration
      if let Ok(cached_at) = parse_datetime(&cached_at_str) {
        snapshots.push(Snapshot {
          key,
          description,
          entity_type,
          data,
          cached_at,
        });
      }
    }

    Ok(snapshots)
  }

  fn persist(&self, snapshot: &Snapshot) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO query_snapshots
           (query_hash, query_description, entity_type, data, cached_at)
         VALUES (?, ?, ?, ?, ?)",
        params![
          snapshot.key,
          snapshot.description,
          snapshot.entity_type,
          snapshot.data,
          snapshot.cached_at.to_rfc3339(),
        ],
      )
      .map_err(|e| eyre!("Failed to persist snapshot: {}", e))?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM query_snapshots WHERE query_hash = ?", params![key])
      .map_err(|e| eyre!("Failed to remove snapshot: {}", e))?;

    Ok(())
  }

  fn evict_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let evicted = conn
      .execute(
        "DELETE FROM query_snapshots WHERE cached_at < ?",
        params![cutoff.to_rfc3339()],
      )
      .map_err(|e| eyre!("Failed to evict snapshots: {}", e))?;

    Ok(evicted)
  }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Duration;

  fn snapshot(key: &str, cached_at: DateTime<Utc>) -> Snapshot {
    Snapshot {
      key: key.to_string(),
      description: format!("test snapshot {}", key),
      entity_type: "project".to_string(),
      data: br#"[{"id":"1"}]"#.to_vec(),
      cached_at,
    }
  }

  #[test]
  fn test_persist_and_load() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let now = Utc::now();
    storage.persist(&snapshot("a", now)).unwrap();
    storage.persist(&snapshot("b", now)).unwrap();

    let mut loaded = storage.load_all().unwrap();
    loaded.sort_by(|x, y| x.key.cmp(&y.key));
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].key, "a");
    assert_eq!(loaded[0].data, br#"[{"id":"1"}]"#.to_vec());
    assert_eq!(loaded[0].entity_type, "project");
  }

  #[test]
  fn test_persist_replaces() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let now = Utc::now();
    storage.persist(&snapshot("a", now)).unwrap();

    let mut updated = snapshot("a", now);
    updated.data = b"[]".to_vec();
    storage.persist(&updated).unwrap();

    let loaded = storage.load_all().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].data, b"[]".to_vec());
  }

  #[test]
  fn test_remove() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    storage.persist(&snapshot("a", Utc::now())).unwrap();
    storage.remove("a").unwrap();
    storage.remove("never-existed").unwrap();
    assert!(storage.load_all().unwrap().is_empty());
  }

  #[test]
  fn test_evict_older_than() {
    let storage = SqliteStorage::open_in_memory().unwrap();
    let now = Utc::now();
    storage.persist(&snapshot("old", now - Duration::hours(25))).unwrap();
    storage.persist(&snapshot("new", now)).unwrap();

    let evicted = storage.evict_older_than(now - Duration::hours(24)).unwrap();
    assert_eq!(evicted, 1);

    let loaded = storage.load_all().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].key, "new");
  }
}
