//! Persisted login session.
//!
//! The JWT access/refresh pair obtained from `auth/token/` is stored as JSON
//! under the data dir so a restart doesn't require logging in again.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::warn;

/// An authenticated session: token pair plus the account email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
  pub access: String,
  pub refresh: String,
  pub email: String,
}

/// Holds the current session in memory and mirrors it to disk.
pub struct SessionStore {
  path: PathBuf,
  current: RwLock<Option<Session>>,
}

impl SessionStore {
  /// Open the session store at the default location, loading any saved session.
  pub fn open() -> Result<Self> {
    Self::open_at(Self::default_path()?)
  }

  pub fn open_at(path: PathBuf) -> Result<Self> {
    let current = match std::fs::read_to_string(&path) {
      Ok(contents) => match serde_json::from_str(&contents) {
        Ok(session) => Some(session),
        Err(e) => {
          // A corrupt session file just means logging in again
          warn!("Discarding unreadable session file: {}", e);
          None
        }
      },
      Err(_) => None,
    };

    Ok(Self {
      path,
      current: RwLock::new(current),
    })
  }

  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("trk").join("session.json"))
  }

  pub fn is_authenticated(&self) -> bool {
    self.current.read().map(|s| s.is_some()).unwrap_or(false)
  }

  /// Get a clone of the current session, if any.
  pub fn get(&self) -> Option<Session> {
    self.current.read().ok().and_then(|s| s.clone())
  }

  pub fn email(&self) -> Option<String> {
    self.get().map(|s| s.email)
  }

  /// Replace the session and persist it.
  pub fn set(&self, session: Session) -> Result<()> {
    let json = serde_json::to_string_pretty(&session)
      .map_err(|e| eyre!("Failed to serialize session: {}", e))?;

    if let Some(parent) = self.path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }
    std::fs::write(&self.path, json)
      .map_err(|e| eyre!("Failed to write session file {}: {}", self.path.display(), e))?;

    if let Ok(mut current) = self.current.write() {
      *current = Some(session);
    }
    Ok(())
  }

  /// Update just the access token after a refresh.
  pub fn set_access(&self, access: String) -> Result<()> {
    let updated = {
      let mut current = self
        .current
        .write()
        .map_err(|e| eyre!("Lock poisoned: {}", e))?;
      match current.as_mut() {
        Some(session) => {
          session.access = access;
          session.clone()
        }
        None => return Err(eyre!("No active session to update")),
      }
    };
    self.set(updated)
  }

  /// Drop the session and remove it from disk.
  pub fn clear(&self) {
    if let Ok(mut current) = self.current.write() {
      *current = None;
    }
    if let Err(e) = std::fs::remove_file(&self.path) {
      if e.kind() != std::io::ErrorKind::NotFound {
        warn!("Failed to remove session file: {}", e);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("trk-session-test-{}-{}.json", name, std::process::id()))
  }

  fn sample() -> Session {
    Session {
      access: "acc".to_string(),
      refresh: "ref".to_string(),
      email: "user@example.com".to_string(),
    }
  }

  #[test]
  fn test_roundtrip() {
    let path = temp_path("roundtrip");
    let store = SessionStore::open_at(path.clone()).unwrap();
    assert!(!store.is_authenticated());

    store.set(sample()).unwrap();
    assert!(store.is_authenticated());

    // A fresh store loads the persisted session
    let reopened = SessionStore::open_at(path.clone()).unwrap();
    assert_eq!(reopened.email().as_deref(), Some("user@example.com"));

    store.clear();
    let _ = std::fs::remove_file(path);
  }

  #[test]
  fn test_clear_removes_file() {
    let path = temp_path("clear");
    let store = SessionStore::open_at(path.clone()).unwrap();
    store.set(sample()).unwrap();
    store.clear();

    assert!(!store.is_authenticated());
    assert!(!path.exists());
  }

  #[test]
  fn test_set_access_keeps_refresh() {
    let path = temp_path("access");
    let store = SessionStore::open_at(path.clone()).unwrap();
    store.set(sample()).unwrap();

    store.set_access("acc2".to_string()).unwrap();
    let session = store.get().unwrap();
    assert_eq!(session.access, "acc2");
    assert_eq!(session.refresh, "ref");

    store.clear();
  }

  #[test]
  fn test_corrupt_file_is_discarded() {
    let path = temp_path("corrupt");
    std::fs::write(&path, "not json").unwrap();

    let store = SessionStore::open_at(path.clone()).unwrap();
    assert!(!store.is_authenticated());
    let _ = std::fs::remove_file(path);
  }
}
