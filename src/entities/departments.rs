//! Department rows and their query/mutation bindings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;
use crate::cache::QueryCache;
use crate::query::{Mutation, Query};
use crate::service::{Entity, Order, ServiceClient};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
  pub id: String,
  pub name: String,
  pub description: String,
  pub created_at: DateTime<Utc>,
}

impl Entity for Department {
  const TABLE: &'static str = "departments";
  const ORDER: Order = Order::asc("name");
}

/// Embedded join of a department name into a request/transfer row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentRef {
  pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDepartment {
  pub name: String,
  pub description: String,
}

impl NewDepartment {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if self.name.trim().is_empty() {
      return Err(ValidationError::Required("name"));
    }
    if self.description.trim().is_empty() {
      return Err(ValidationError::Required("description"));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

impl DepartmentUpdate {
  pub fn validate(&self) -> Result<(), ValidationError> {
    if matches!(&self.name, Some(n) if n.trim().is_empty()) {
      return Err(ValidationError::Required("name"));
    }
    Ok(())
  }
}

pub fn list(client: &ServiceClient, cache: &QueryCache) -> Query<Vec<Department>> {
  let client = client.clone();
  Query::new(cache.clone(), Department::list_key(), move || {
    let client = client.clone();
    async move { client.list::<Department>().await.map_err(|e| e.to_string()) }
  })
}

pub fn create(client: &ServiceClient, cache: &QueryCache) -> Mutation<NewDepartment, Department> {
  let client = client.clone();
  Mutation::new(
    cache.clone(),
    vec![Department::list_key()],
    move |input: NewDepartment| {
      let client = client.clone();
      async move {
        client
          .insert::<Department, _>(&input)
          .await
          .map_err(|e| e.to_string())
      }
    },
  )
}

pub fn update(
  client: &ServiceClient,
  cache: &QueryCache,
) -> Mutation<(String, DepartmentUpdate), Department> {
  let client = client.clone();
  Mutation::new(
    cache.clone(),
    vec![Department::list_key()],
    move |(id, input): (String, DepartmentUpdate)| {
      let client = client.clone();
      async move {
        client
          .update::<Department, _>(&id, &input)
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
  fn test_new_department_requires_both_fields() {
    let missing_name = NewDepartment {
      name: String::new(),
      description: "logistics".to_string(),
    };
    assert_eq!(
      missing_name.validate(),
      Err(ValidationError::Required("name"))
    );

    let missing_description = NewDepartment {
      name: "Logistics".to_string(),
      description: "  ".to_string(),
    };
    assert_eq!(
      missing_description.validate(),
      Err(ValidationError::Required("description"))
    );
  }

  #[test]
  fn test_departments_order_by_name() {
    assert_eq!(Department::ORDER.to_query(), "name.asc");
  }
}
