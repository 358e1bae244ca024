//! Stable cache keys for query results.

use sha2::{Digest, Sha256};

/// Identifies one cached query: a table plus the parameters of the read
/// (select list, ordering). Two reads with the same table and parameters
/// share a cache slot; anything else gets its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
  hash: String,
  label: String,
}

impl QueryKey {
  pub fn new(table: &str, params: &str) -> Self {
    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(table.as_bytes());
    hasher.update(b"?");
    hasher.update(params.as_bytes());
    let hash = hex::encode(hasher.finalize());

    Self {
      hash,
      label: format!("{}?{}", table, params),
    }
  }

  /// The stable hash used as the slot key.
  pub fn hash(&self) -> &str {
    &self.hash
  }

  /// Human-readable form for logs.
  pub fn label(&self) -> &str {
    &self.label
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_same_inputs_same_key() {
    let a = QueryKey::new("resources", "order=created_at.desc");
    let b = QueryKey::new("resources", "order=created_at.desc");
    assert_eq!(a.hash(), b.hash());
    assert_eq!(a, b);
  }

  #[test]
  fn test_different_params_different_key() {
    let a = QueryKey::new("resources", "order=created_at.desc");
    let b = QueryKey::new("resources", "order=name.asc");
    assert_ne!(a.hash(), b.hash());
  }

  #[test]
  fn test_different_tables_different_key() {
    let a = QueryKey::new("resources", "order=name.asc");
    let b = QueryKey::new("departments", "order=name.asc");
    assert_ne!(a.hash(), b.hash());
  }

  #[test]
  fn test_label_is_readable() {
    let key = QueryKey::new("departments", "order=name.asc");
    assert_eq!(key.label(), "departments?order=name.asc");
  }
}
