//! Inter-department transfers and their query/mutation bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::departments::DepartmentRef;
use super::resources::ResourceRef;
use super::{RequestStatus, StatusChange, ValidationError};
use crate::cache::QueryCache;
use crate::query::{Mutation, Query};
use crate::service::{Entity, Order, ServiceClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
  pub id: String,
  pub resource_id: String,
  pub from_department_id: String,
  pub to_department_id: String,
  pub quantity: i64,
  pub status: RequestStatus,
  #[serde(default)]
  pub approval_date: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  #[serde(default)]
  pub resource: Option<ResourceRef>,
  #[serde(default)]
  pub from_department: Option<DepartmentRef>,
  #[serde(default)]
  pub to_department: Option<DepartmentRef>,
}

impl Entity for Transfer {
  const TABLE: &'static str = "transfers";
  // The two department joins need foreign-key hints to disambiguate.
  const SELECT: &'static str = "*,resource:resources(name,status),\
from_department:departments!transfers_from_department_id_fkey(name),\
to_department:departments!transfers_to_department_id_fkey(name)";
  const ORDER: Order = Order::desc("created_at");
}

impl Transfer {
  pub fn resource_name(&self) -> &str {
    self
      .resource
      .as_ref()
      .map(|r| r.name.as_str())
      .unwrap_or(&self.resource_id)
  }

  pub fn from_name(&self) -> &str {
    self
      .from_department
      .as_ref()
      .map(|d| d.name.as_str())
      .unwrap_or(&self.from_department_id)
  }

  pub fn to_name(&self) -> &str {
    self
      .to_department
      .as_ref()
      .map(|d| d.name.as_str())
      .unwrap_or(&self.to_department_id)
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewTransfer {
  pub resource_id: String,
  pub from_department_id: String,
  pub to_department_id: String,
  pub quantity: i64,
  pub status: RequestStatus,
}

impl NewTransfer {
  pub fn new(
    resource_id: String,
    from_department_id: String,
    to_department_id: String,
    quantity: i64,
  ) -> Self {
    Self {
      resource_id,
      from_department_id,
      to_department_id,
      quantity,
      status: RequestStatus::Pending,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.resource_id.trim().is_empty() {
      return Err(ValidationError::Required("resource"));
    }
    if self.from_department_id.trim().is_empty() {
      return Err(ValidationError::Required("source department"));
    }
    if self.to_department_id.trim().is_empty() {
      return Err(ValidationError::Required("destination department"));
    }
    if self.from_department_id == self.to_department_id {
      return Err(ValidationError::SameDepartment);
    }
    if self.quantity < 1 {
      return Err(ValidationError::QuantityTooSmall(1));
    }
    Ok(())
  }
}

pub fn list(client: &ServiceClient, cache: &QueryCache) -> Query<Vec<Transfer>> {
  let client = client.clone();
  Query::new(cache.clone(), Transfer::list_key(), move || {
    let client = client.clone();
    async move { client.list::<Transfer>().await.map_err(|e| e.to_string()) }
  })
}

pub fn create(client: &ServiceClient, cache: &QueryCache) -> Mutation<NewTransfer, Transfer> {
  let client = client.clone();
  Mutation::new(
    cache.clone(),
    vec![Transfer::list_key()],
    move |input: NewTransfer| {
      let client = client.clone();
      async move {
        client
          .insert::<Transfer, _>(&input)
          .await
          .map_err(|e| e.to_string())
      }
    },
  )
}

pub fn update_status(
  client: &ServiceClient,
  cache: &QueryCache,
) -> Mutation<(String, StatusChange), Transfer> {
  let client = client.clone();
  Mutation::new(
    cache.clone(),
    vec![Transfer::list_key()],
    move |(id, change): (String, StatusChange)| {
      let client = client.clone();
      async move {
        client
          .update::<Transfer, _>(&id, &change)
          .await
          .map_err(|e| e.to_string())
      }
    },
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_transfer(from: &str, to: &str, quantity: i64) -> NewTransfer {
    NewTransfer::new("r1".to_string(), from.to_string(), to.to_string(), quantity)
  }

  #[test]
  fn test_valid_transfer() {
    let transfer = new_transfer("d1", "d2", 2);
    assert!(transfer.validate().is_ok());

    let json = serde_json::to_value(&transfer).unwrap();
    assert_eq!(json["status"], "pending");
    assert_eq!(json["from_department_id"], "d1");
    assert_eq!(json["to_department_id"], "d2");
  }

  #[test]
  fn test_departments_must_differ() {
    assert_eq!(
      new_transfer("d1", "d1", 2).validate(),
      Err(ValidationError::SameDepartment)
    );
  }

  #[test]
  fn test_quantity_must_be_at_least_one() {
    assert_eq!(
      new_transfer("d1", "d2", 0).validate(),
      Err(ValidationError::QuantityTooSmall(1))
    );
  }

  #[test]
  fn test_row_parses_with_both_department_joins() {
    let row = r#"{
      "id": "t1",
      "resource_id": "r1",
      "from_department_id": "d1",
      "to_department_id": "d2",
      "quantity": 2,
      "status": "pending",
      "created_at": "2026-08-01T10:00:00Z",
      "resource": {"name": "Forklift"},
      "from_department": {"name": "Logistics"},
      "to_department": {"name": "Maintenance"}
    }"#;
    let transfer: Transfer = serde_json::from_str(row).unwrap();
    assert_eq!(transfer.resource_name(), "Forklift");
    assert_eq!(transfer.from_name(), "Logistics");
    assert_eq!(transfer.to_name(), "Maintenance");
  }
}
