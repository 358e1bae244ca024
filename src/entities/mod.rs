//! Typed query/mutation bindings, one module per entity.
//!
//! Each module owns its row type, its validated input structs, and
//! constructors for the `Query`/`Mutation` bindings over the shared cache.
//! Validation runs before any network call; an input that fails validation
//! never reaches the service.

pub mod allocations;
pub mod departments;
pub mod resources;
pub mod transfers;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Client-side input validation failures. Shown inline in the submitting
/// form; distinct from service errors, which arrive from the network and go
/// to the banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("{0} is required")]
  Required(&'static str),
  #[error("quantity must be a whole number")]
  QuantityNotANumber,
  #[error("quantity must be at least {0}")]
  QuantityTooSmall(i64),
  #[error("source and destination departments must differ")]
  SameDepartment,
  #[error("request is already {0}; only pending requests can change status")]
  InvalidTransition(RequestStatus),
}

/// Parse a quantity field from raw form text.
pub fn parse_quantity(raw: &str, min: i64) -> Result<i64, ValidationError> {
  let quantity: i64 = raw
    .trim()
    .parse()
    .map_err(|_| ValidationError::QuantityNotANumber)?;
  if quantity < min {
    return Err(ValidationError::QuantityTooSmall(min));
  }
  Ok(quantity)
}

/// Review status shared by allocation requests and transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
  Pending,
  Approved,
  Rejected,
}

impl std::fmt::Display for RequestStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      RequestStatus::Pending => "pending",
      RequestStatus::Approved => "approved",
      RequestStatus::Rejected => "rejected",
    };
    f.write_str(s)
  }
}

/// Payload for approving or rejecting a pending request.
///
/// `approval_date` is present exactly when the new status is `approved`;
/// a rejection leaves it unset.
#[derive(Debug, Clone, Serialize)]
pub struct StatusChange {
  pub status: RequestStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub approval_date: Option<DateTime<Utc>>,
}

impl StatusChange {
  pub fn approve() -> Self {
    Self {
      status: RequestStatus::Approved,
      approval_date: Some(Utc::now()),
    }
  }

  pub fn reject() -> Self {
    Self {
      status: RequestStatus::Rejected,
      approval_date: None,
    }
  }

  /// Only `pending -> approved` and `pending -> rejected` are legal; the
  /// client refuses anything else instead of forwarding it to the service.
  pub fn validate(&self, current: RequestStatus) -> Result<(), ValidationError> {
    match current {
      RequestStatus::Pending => Ok(()),
      RequestStatus::Approved | RequestStatus::Rejected => {
        Err(ValidationError::InvalidTransition(current))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_quantity() {
    assert_eq!(parse_quantity("3", 1), Ok(3));
    assert_eq!(parse_quantity(" 0 ", 0), Ok(0));
    assert_eq!(parse_quantity("-1", 0), Err(ValidationError::QuantityTooSmall(0)));
    assert_eq!(parse_quantity("0", 1), Err(ValidationError::QuantityTooSmall(1)));
    assert_eq!(parse_quantity("three", 1), Err(ValidationError::QuantityNotANumber));
    assert_eq!(parse_quantity("", 1), Err(ValidationError::QuantityNotANumber));
  }

  #[test]
  fn test_approve_sets_approval_date() {
    let change = StatusChange::approve();
    assert_eq!(change.status, RequestStatus::Approved);
    assert!(change.approval_date.is_some());

    let json = serde_json::to_value(&change).unwrap();
    assert_eq!(json["status"], "approved");
    assert!(json.get("approval_date").is_some());
  }

  #[test]
  fn test_reject_leaves_approval_date_unset() {
    let change = StatusChange::reject();
    assert_eq!(change.status, RequestStatus::Rejected);
    assert!(change.approval_date.is_none());

    let json = serde_json::to_value(&change).unwrap();
    assert_eq!(json["status"], "rejected");
    assert!(json.get("approval_date").is_none());
  }

  #[test]
  fn test_only_pending_can_transition() {
    assert!(StatusChange::approve().validate(RequestStatus::Pending).is_ok());
    assert!(StatusChange::reject().validate(RequestStatus::Pending).is_ok());
    assert_eq!(
      StatusChange::reject().validate(RequestStatus::Approved),
      Err(ValidationError::InvalidTransition(RequestStatus::Approved))
    );
    assert_eq!(
      StatusChange::approve().validate(RequestStatus::Rejected),
      Err(ValidationError::InvalidTransition(RequestStatus::Rejected))
    );
  }

  #[test]
  fn test_validation_error_messages() {
    assert_eq!(
      ValidationError::Required("name").to_string(),
      "name is required"
    );
    assert_eq!(
      ValidationError::InvalidTransition(RequestStatus::Approved).to_string(),
      "request is already approved; only pending requests can change status"
    );
  }
}
