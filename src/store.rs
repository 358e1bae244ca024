//! Small persisted key/value store for advisory local state (last role,
//! last email). The terminal equivalent of browser-local storage.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

pub struct LocalStore {
  conn: Mutex<Connection>,
}

impl LocalStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("failed to create data directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("failed to open local store at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("failed to open in-memory store: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("failed to run store migrations: {}", e))?;
    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("could not determine data directory"))?;

    Ok(data_dir.join("r9s").join("state.db"))
  }

  pub fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {}", e))?;
    conn
      .query_row("SELECT value FROM kv WHERE key = ?", params![key], |row| {
        row.get(0)
      })
      .optional()
      .map_err(|e| eyre!("failed to read key '{}': {}", key, e))
  }

  pub fn put(&self, key: &str, value: &str) -> Result<()> {
    let conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {}", e))?;
    conn
      .execute(
        "INSERT INTO kv (key, value, updated_at) VALUES (?, ?, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value],
      )
      .map_err(|e| eyre!("failed to write key '{}': {}", key, e))?;
    Ok(())
  }

  pub fn delete(&self, key: &str) -> Result<()> {
    let conn = self.conn.lock().map_err(|e| eyre!("lock poisoned: {}", e))?;
    conn
      .execute("DELETE FROM kv WHERE key = ?", params![key])
      .map_err(|e| eyre!("failed to delete key '{}': {}", key, e))?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_key_is_none() {
    let store = LocalStore::open_in_memory().unwrap();
    assert_eq!(store.get("user_role").unwrap(), None);
  }

  #[test]
  fn test_put_get_round_trip() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("user_role", "staff").unwrap();
    assert_eq!(store.get("user_role").unwrap(), Some("staff".to_string()));
  }

  #[test]
  fn test_put_overwrites() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("user_role", "staff").unwrap();
    store.put("user_role", "admin").unwrap();
    assert_eq!(store.get("user_role").unwrap(), Some("admin".to_string()));
  }

  #[test]
  fn test_delete() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("last_email", "a@b.c").unwrap();
    store.delete("last_email").unwrap();
    assert_eq!(store.get("last_email").unwrap(), None);
  }
}
