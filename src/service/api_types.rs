//! Wire-level types for the data service's REST and auth endpoints.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::session::Role;

/// User object returned by the auth endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
  pub id: String,
  #[serde(default)]
  pub email: Option<String>,
}

/// Response of the password grant.
#[derive(Debug, Deserialize)]
pub struct ApiTokenResponse {
  pub access_token: String,
  pub user: ApiUser,
}

/// Response of the sign-up endpoint. Depending on the service's confirmation
/// settings this carries a full session, just the created user, or the user
/// fields inlined at the top level.
#[derive(Debug, Deserialize)]
pub struct ApiSignupResponse {
  #[serde(default)]
  pub access_token: Option<String>,
  #[serde(default)]
  pub user: Option<ApiUser>,
  #[serde(default)]
  pub id: Option<String>,
  #[serde(default)]
  pub email: Option<String>,
}

impl ApiSignupResponse {
  pub fn user_id(&self) -> Option<&str> {
    self
      .user
      .as_ref()
      .map(|u| u.id.as_str())
      .or(self.id.as_deref())
  }
}

/// Profile row carrying the user's role.
#[derive(Debug, Deserialize)]
pub struct ApiProfile {
  pub role: Role,
}

/// Error body as returned by the row API (`message`) and the auth API
/// (`error_description` or `msg`). Any of the fields may be missing.
#[derive(Debug, Default, Deserialize)]
pub struct ApiError {
  #[serde(default)]
  message: Option<String>,
  #[serde(default)]
  error_description: Option<String>,
  #[serde(default)]
  msg: Option<String>,
  #[serde(default)]
  details: Option<String>,
}

impl ApiError {
  /// Best human-readable description of a failed response.
  pub fn describe(body: &str, status: StatusCode) -> String {
    let parsed: ApiError = serde_json::from_str(body).unwrap_or_default();

    let message = parsed
      .message
      .or(parsed.error_description)
      .or(parsed.msg)
      .or(parsed.details);

    match message {
      Some(m) if !m.trim().is_empty() => m,
      _ => format!("service returned {}", status),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_describe_row_api_error() {
    let body = r#"{"message":"new row violates row-level security policy","code":"42501"}"#;
    assert_eq!(
      ApiError::describe(body, StatusCode::FORBIDDEN),
      "new row violates row-level security policy"
    );
  }

  #[test]
  fn test_describe_auth_error() {
    let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
    assert_eq!(
      ApiError::describe(body, StatusCode::BAD_REQUEST),
      "Invalid login credentials"
    );
  }

  #[test]
  fn test_describe_unparsable_body_falls_back_to_status() {
    assert_eq!(
      ApiError::describe("<html>bad gateway</html>", StatusCode::BAD_GATEWAY),
      "service returned 502 Bad Gateway"
    );
  }

  #[test]
  fn test_signup_response_user_id_variants() {
    let nested: ApiSignupResponse =
      serde_json::from_str(r#"{"user":{"id":"u1","email":"a@b.c"}}"#).unwrap();
    assert_eq!(nested.user_id(), Some("u1"));

    let flat: ApiSignupResponse =
      serde_json::from_str(r#"{"id":"u2","email":"a@b.c"}"#).unwrap();
    assert_eq!(flat.user_id(), Some("u2"));
  }
}
