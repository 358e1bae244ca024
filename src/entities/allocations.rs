//! Allocation requests and their query/mutation bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::departments::DepartmentRef;
use super::resources::ResourceRef;
use super::{RequestStatus, StatusChange, ValidationError};
use crate::cache::QueryCache;
use crate::query::{Mutation, Query};
use crate::service::{Entity, Order, ServiceClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
  Low,
  Medium,
  High,
  Urgent,
}

impl Priority {
  pub const ALL: [Priority; 4] = [
    Priority::Low,
    Priority::Medium,
    Priority::High,
    Priority::Urgent,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Priority::Low => "low",
      Priority::Medium => "medium",
      Priority::High => "high",
      Priority::Urgent => "urgent",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationRequest {
  pub id: String,
  pub resource_id: String,
  pub requesting_department_id: String,
  pub quantity: i64,
  pub status: RequestStatus,
  pub priority: Priority,
  pub request_date: DateTime<Utc>,
  #[serde(default)]
  pub approval_date: Option<DateTime<Utc>>,
  #[serde(default)]
  pub return_date: Option<DateTime<Utc>>,
  /// Joined by the service; absent on insert representations.
  #[serde(default)]
  pub resource: Option<ResourceRef>,
  #[serde(default)]
  pub department: Option<DepartmentRef>,
}

impl Entity for AllocationRequest {
  const TABLE: &'static str = "allocation_requests";
  const SELECT: &'static str = "*,resource:resources(name,status),department:departments(name)";
  const ORDER: Order = Order::desc("request_date");
}

impl AllocationRequest {
  pub fn resource_name(&self) -> &str {
    self
      .resource
      .as_ref()
      .map(|r| r.name.as_str())
      .unwrap_or(&self.resource_id)
  }

  pub fn department_name(&self) -> &str {
    self
      .department
      .as_ref()
      .map(|d| d.name.as_str())
      .unwrap_or(&self.requesting_department_id)
  }
}

/// Create payload; new requests always start out pending.
#[derive(Debug, Clone, Serialize)]
pub struct NewAllocationRequest {
  pub resource_id: String,
  pub requesting_department_id: String,
  pub quantity: i64,
  pub priority: Priority,
  pub status: RequestStatus,
}

impl NewAllocationRequest {
  pub fn new(
    resource_id: String,
    requesting_department_id: String,
    quantity: i64,
    priority: Priority,
  ) -> Self {
    Self {
      resource_id,
      requesting_department_id,
      quantity,
      priority,
      status: RequestStatus::Pending,
    }
  }

  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.resource_id.trim().is_empty() {
      return Err(ValidationError::Required("resource"));
    }
    if self.requesting_department_id.trim().is_empty() {
      return Err(ValidationError::Required("department"));
    }
    if self.quantity < 1 {
      return Err(ValidationError::QuantityTooSmall(1));
    }
    Ok(())
  }
}

pub fn list(client: &ServiceClient, cache: &QueryCache) -> Query<Vec<AllocationRequest>> {
  let client = client.clone();
  Query::new(cache.clone(), AllocationRequest::list_key(), move || {
    let client = client.clone();
    async move {
      client
        .list::<AllocationRequest>()
        .await
        .map_err(|e| e.to_string())
    }
  })
}

pub fn create(
  client: &ServiceClient,
  cache: &QueryCache,
) -> Mutation<NewAllocationRequest, AllocationRequest> {
  let client = client.clone();
  Mutation::new(
    cache.clone(),
    vec![AllocationRequest::list_key()],
    move |input: NewAllocationRequest| {
      let client = client.clone();
      async move {
        client
          .insert::<AllocationRequest, _>(&input)
          .await
          .map_err(|e| e.to_string())
      }
    },
  )
}

/// Approve or reject by id. The transition guard runs at the call site,
/// against the row the user is looking at.
pub fn update_status(
  client: &ServiceClient,
  cache: &QueryCache,
) -> Mutation<(String, StatusChange), AllocationRequest> {
  let client = client.clone();
  Mutation::new(
    cache.clone(),
    vec![AllocationRequest::list_key()],
    move |(id, change): (String, StatusChange)| {
      let client = client.clone();
      async move {
        client
          .update::<AllocationRequest, _>(&id, &change)
          .await
          .map_err(|e| e.to_string())
      }
    },
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_new_request_starts_pending() {
    let request = NewAllocationRequest::new(
      "r1".to_string(),
      "d1".to_string(),
      3,
      Priority::Urgent,
    );
    assert!(request.validate().is_ok());

    let json = serde_json::to_value(&request).unwrap();
    assert_eq!(json["status"], "pending");
    assert_eq!(json["priority"], "urgent");
    assert_eq!(json["quantity"], 3);
    assert!(json.get("approval_date").is_none());
  }

  #[test]
  fn test_quantity_must_be_at_least_one() {
    let request =
      NewAllocationRequest::new("r1".to_string(), "d1".to_string(), 0, Priority::Low);
    assert_eq!(
      request.validate(),
      Err(ValidationError::QuantityTooSmall(1))
    );
  }

  #[test]
  fn test_references_are_required() {
    let request =
      NewAllocationRequest::new(String::new(), "d1".to_string(), 1, Priority::Low);
    assert_eq!(request.validate(), Err(ValidationError::Required("resource")));

    let request =
      NewAllocationRequest::new("r1".to_string(), String::new(), 1, Priority::Low);
    assert_eq!(
      request.validate(),
      Err(ValidationError::Required("department"))
    );
  }

  #[test]
  fn test_row_parses_with_joined_names() {
    let row = r#"{
      "id": "a1",
      "resource_id": "r1",
      "requesting_department_id": "d1",
      "quantity": 3,
      "status": "pending",
      "priority": "urgent",
      "request_date": "2026-08-01T10:00:00Z",
      "resource": {"name": "Forklift", "status": "available"},
      "department": {"name": "Logistics"}
    }"#;
    let request: AllocationRequest = serde_json::from_str(row).unwrap();
    assert_eq!(request.resource_name(), "Forklift");
    assert_eq!(request.department_name(), "Logistics");
    assert_eq!(request.status, RequestStatus::Pending);
    assert!(request.approval_date.is_none());
  }

  #[test]
  fn test_row_falls_back_to_ids_without_joins() {
    let row = r#"{
      "id": "a1",
      "resource_id": "r1",
      "requesting_department_id": "d1",
      "quantity": 1,
      "status": "approved",
      "priority": "low",
      "request_date": "2026-08-01T10:00:00Z",
      "approval_date": "2026-08-02T09:00:00Z",
      "return_date": "2026-09-01T09:00:00Z"
    }"#;
    let request: AllocationRequest = serde_json::from_str(row).unwrap();
    assert_eq!(request.resource_name(), "r1");
    assert_eq!(request.department_name(), "d1");
    assert!(request.approval_date.is_some());
    assert!(request.return_date.is_some());
  }
}
