//! Client for the hosted data service: a PostgREST-style row API plus
//! password-based auth. The client is deliberately thin; all caching lives
//! in [`crate::cache`] and all domain typing in [`crate::entities`].

mod api_types;
mod client;

pub use api_types::ApiError;
pub use client::{AuthSession, ServiceClient};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::QueryKey;

/// Server-side ordering for an entity's list query.
#[derive(Debug, Clone, Copy)]
pub struct Order {
  pub column: &'static str,
  pub ascending: bool,
}

impl Order {
  pub const fn asc(column: &'static str) -> Self {
    Self {
      column,
      ascending: true,
    }
  }

  pub const fn desc(column: &'static str) -> Self {
    Self {
      column,
      ascending: false,
    }
  }

  /// Render as the row API's `order=` parameter value.
  pub fn to_query(&self) -> String {
    format!(
      "{}.{}",
      self.column,
      if self.ascending { "asc" } else { "desc" }
    )
  }
}

/// A row type backed by a table on the remote service.
///
/// `SELECT` may embed server-side joins (e.g. `*,resource:resources(name)`);
/// the service resolves them when reading, so the client never joins rows
/// itself.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  const TABLE: &'static str;
  const SELECT: &'static str = "*";
  const ORDER: Order;

  /// Cache key for this entity's list query. One key per (table, select,
  /// order) triple, so a mutation invalidating it reaches every live list
  /// of the entity.
  fn list_key() -> QueryKey {
    QueryKey::new(
      Self::TABLE,
      &format!("select={}&order={}", Self::SELECT, Self::ORDER.to_query()),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Clone, Serialize, Deserialize)]
  struct Widget {
    id: String,
  }

  impl Entity for Widget {
    const TABLE: &'static str = "widgets";
    const ORDER: Order = Order::desc("created_at");
  }

  #[test]
  fn test_order_to_query() {
    assert_eq!(Order::asc("name").to_query(), "name.asc");
    assert_eq!(Order::desc("created_at").to_query(), "created_at.desc");
  }

  #[test]
  fn test_list_key_is_stable() {
    assert_eq!(Widget::list_key(), Widget::list_key());
    assert_eq!(
      Widget::list_key().label(),
      "widgets?select=*&order=created_at.desc"
    );
  }
}
