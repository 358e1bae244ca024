//! Resource rows and their query/mutation bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;
use crate::cache::QueryCache;
use crate::query::{Mutation, Query};
use crate::service::{Entity, Order, ServiceClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
  Available,
  InUse,
  Maintenance,
}

impl ResourceStatus {
  pub const ALL: [ResourceStatus; 3] = [
    ResourceStatus::Available,
    ResourceStatus::InUse,
    ResourceStatus::Maintenance,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      ResourceStatus::Available => "available",
      ResourceStatus::InUse => "in use",
      ResourceStatus::Maintenance => "maintenance",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: Option<String>,
  pub quantity: i64,
  pub status: ResourceStatus,
  #[serde(default)]
  pub location: Option<String>,
  #[serde(default)]
  pub department_id: Option<String>,
  #[serde(default)]
  pub created_by: Option<String>,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub updated_at: Option<DateTime<Utc>>,
}

impl Entity for Resource {
  const TABLE: &'static str = "resources";
  const ORDER: Order = Order::desc("created_at");
}

/// Embedded join of a resource into a request/transfer row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
  pub name: String,
  #[serde(default)]
  pub status: Option<ResourceStatus>,
}

/// Create payload. `created_by` is filled from the signed-in session.
#[derive(Debug, Clone, Serialize)]
pub struct NewResource {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub quantity: i64,
  pub status: ResourceStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub department_id: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub created_by: Option<String>,
}

impl NewResource {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.name.trim().is_empty() {
      return Err(ValidationError::Required("name"));
    }
    if self.quantity < 0 {
      return Err(ValidationError::QuantityTooSmall(0));
    }
    Ok(())
  }
}

/// Update payload; only the set fields reach the service. `updated_at` is
/// always refreshed, matching what the service expects from writers.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub quantity: Option<i64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ResourceStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub department_id: Option<String>,
  pub updated_at: DateTime<Utc>,
}

impl ResourceUpdate {
  pub fn now() -> Self {
    Self {
      name: None,
      description: None,
      quantity: None,
      status: None,
      department_id: None,
      updated_at: Utc::now(),
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if let Some(name) = &self.name {
      if name.trim().is_empty() {
        return Err(ValidationError::Required("name"));
      }
    }
    if matches!(self.quantity, Some(q) if q < 0) {
      return Err(ValidationError::QuantityTooSmall(0));
    }
    Ok(())
  }
}

pub fn list(client: &ServiceClient, cache: &QueryCache) -> Query<Vec<Resource>> {
  let client = client.clone();
  Query::new(cache.clone(), Resource::list_key(), move || {
    let client = client.clone();
    async move { client.list::<Resource>().await.map_err(|e| e.to_string()) }
  })
}

pub fn create(client: &ServiceClient, cache: &QueryCache) -> Mutation<NewResource, Resource> {
  let client = client.clone();
  Mutation::new(
    cache.clone(),
    vec![Resource::list_key()],
    move |input: NewResource| {
      let client = client.clone();
      async move {
        client
          .insert::<Resource, _>(&input)
          .await
          .map_err(|e| e.to_string())
      }
    },
  )
}

pub fn update(
  client: &ServiceClient,
  cache: &QueryCache,
) -> Mutation<(String, ResourceUpdate), Resource> {
  let client = client.clone();
  Mutation::new(
    cache.clone(),
    vec![Resource::list_key()],
    move |(id, input): (String, ResourceUpdate)| {
      let client = client.clone();
      async move {
        client
          .update::<Resource, _>(&id, &input)
          .await
          .map_err(|e| e.to_string())
      }
    },
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_resource(name: &str, quantity: i64) -> NewResource {
    NewResource {
      name: name.to_string(),
      description: None,
      quantity,
      status: ResourceStatus::Available,
      department_id: None,
      created_by: None,
    }
  }

  #[test]
  fn test_new_resource_requires_name() {
    assert_eq!(
      new_resource("  ", 1).validate(),
      Err(ValidationError::Required("name"))
    );
    assert!(new_resource("forklift", 1).validate().is_ok());
  }

  #[test]
  fn test_new_resource_rejects_negative_quantity() {
    assert_eq!(
      new_resource("forklift", -1).validate(),
      Err(ValidationError::QuantityTooSmall(0))
    );
    // Zero is a legal stock level for a resource.
    assert!(new_resource("forklift", 0).validate().is_ok());
  }

  #[test]
  fn test_create_payload_skips_unset_fields() {
    let json = serde_json::to_value(new_resource("forklift", 2)).unwrap();
    assert_eq!(json["name"], "forklift");
    assert_eq!(json["quantity"], 2);
    assert_eq!(json["status"], "available");
    assert!(json.get("description").is_none());
    assert!(json.get("created_by").is_none());
  }

  #[test]
  fn test_update_payload_carries_only_set_fields() {
    let mut update = ResourceUpdate::now();
    update.status = Some(ResourceStatus::Maintenance);

    let json = serde_json::to_value(&update).unwrap();
    assert_eq!(json["status"], "maintenance");
    assert!(json.get("updated_at").is_some());
    assert!(json.get("name").is_none());
    assert!(json.get("quantity").is_none());
  }

  #[test]
  fn test_row_parses_with_optional_location() {
    let row = r#"{
      "id": "r1",
      "name": "Forklift",
      "quantity": 2,
      "status": "available",
      "location": "Warehouse B",
      "created_at": "2026-08-01T10:00:00Z"
    }"#;
    let resource: Resource = serde_json::from_str(row).unwrap();
    assert_eq!(resource.location.as_deref(), Some("Warehouse B"));
    assert!(resource.department_id.is_none());
  }

  #[test]
  fn test_status_parses_snake_case() {
    let status: ResourceStatus = serde_json::from_str("\"in_use\"").unwrap();
    assert_eq!(status, ResourceStatus::InUse);
  }
}
