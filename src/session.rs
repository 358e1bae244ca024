//! Authenticated session state and the role gate.

use serde::{Deserialize, Serialize};

/// Local store keys for advisory sign-in state. Never a source of truth;
/// the authenticated session is.
pub const ROLE_KEY: &str = "user_role";
pub const EMAIL_KEY: &str = "last_email";

/// Closed set of roles. Every role-gated decision matches exhaustively so a
/// new role cannot slip through a default arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
  Admin,
  DepartmentHead,
  Staff,
}

impl Role {
  pub const ALL: [Role; 3] = [Role::Admin, Role::DepartmentHead, Role::Staff];

  pub fn label(&self) -> &'static str {
    match self {
      Role::Admin => "admin",
      Role::DepartmentHead => "department head",
      Role::Staff => "staff",
    }
  }

  /// Whether this role reviews requests and manages departments and
  /// transfers. Resources and allocation requests are open to everyone;
  /// staff submit requests but cannot approve or reject them.
  pub fn can_review(&self) -> bool {
    match self {
      Role::Admin | Role::DepartmentHead => true,
      Role::Staff => false,
    }
  }
}

impl std::str::FromStr for Role {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "admin" => Ok(Role::Admin),
      "department_head" => Ok(Role::DepartmentHead),
      "staff" => Ok(Role::Staff),
      other => Err(format!("unknown role '{}'", other)),
    }
  }
}

impl std::fmt::Display for Role {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let s = match self {
      Role::Admin => "admin",
      Role::DepartmentHead => "department_head",
      Role::Staff => "staff",
    };
    f.write_str(s)
  }
}

/// The signed-in user.
#[derive(Debug, Clone)]
pub struct Session {
  pub user_id: String,
  pub email: String,
  pub role: Role,
}

#[derive(Debug, Clone)]
pub enum SessionState {
  SignedOut,
  Authenticating,
  SignedIn(Session),
}

/// State machine for the auth lifecycle.
///
/// SignedOut -> Authenticating on credential submission;
/// Authenticating -> SignedIn on success, back to SignedOut on failure;
/// SignedIn -> SignedOut on explicit sign-out.
#[derive(Debug)]
pub struct SessionGate {
  state: SessionState,
}

impl SessionGate {
  pub fn new() -> Self {
    Self {
      state: SessionState::SignedOut,
    }
  }

  pub fn state(&self) -> &SessionState {
    &self.state
  }

  pub fn session(&self) -> Option<&Session> {
    match &self.state {
      SessionState::SignedIn(session) => Some(session),
      _ => None,
    }
  }

  pub fn is_signed_in(&self) -> bool {
    matches!(self.state, SessionState::SignedIn(_))
  }

  /// Credentials submitted; only valid from SignedOut.
  pub fn begin(&mut self) {
    match self.state {
      SessionState::SignedOut => self.state = SessionState::Authenticating,
      _ => tracing::warn!(state = ?self.state, "begin ignored outside SignedOut"),
    }
  }

  /// Authentication succeeded.
  pub fn complete(&mut self, session: Session) {
    match self.state {
      SessionState::Authenticating => {
        tracing::info!(user = %session.email, role = %session.role, "signed in");
        self.state = SessionState::SignedIn(session);
      }
      _ => tracing::warn!(state = ?self.state, "complete ignored outside Authenticating"),
    }
  }

  /// Authentication failed; the error stays with the submitting form.
  pub fn fail(&mut self) {
    if matches!(self.state, SessionState::Authenticating) {
      self.state = SessionState::SignedOut;
    }
  }

  pub fn sign_out(&mut self) {
    if let SessionState::SignedIn(session) = &self.state {
      tracing::info!(user = %session.email, "signed out");
    }
    self.state = SessionState::SignedOut;
  }
}

impl Default for SessionGate {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn session() -> Session {
    Session {
      user_id: "u1".to_string(),
      email: "head@example.com".to_string(),
      role: Role::DepartmentHead,
    }
  }

  #[test]
  fn test_sign_in_lifecycle() {
    let mut gate = SessionGate::new();
    assert!(!gate.is_signed_in());

    gate.begin();
    assert!(matches!(gate.state(), SessionState::Authenticating));

    gate.complete(session());
    assert!(gate.is_signed_in());
    assert_eq!(gate.session().unwrap().role, Role::DepartmentHead);

    gate.sign_out();
    assert!(matches!(gate.state(), SessionState::SignedOut));
  }

  #[test]
  fn test_failure_returns_to_signed_out() {
    let mut gate = SessionGate::new();
    gate.begin();
    gate.fail();
    assert!(matches!(gate.state(), SessionState::SignedOut));
  }

  #[test]
  fn test_complete_requires_authenticating() {
    let mut gate = SessionGate::new();
    // Not in Authenticating: ignored.
    gate.complete(session());
    assert!(!gate.is_signed_in());
  }

  #[test]
  fn test_role_round_trip() {
    for role in Role::ALL {
      let parsed: Role = role.to_string().parse().unwrap();
      assert_eq!(parsed, role);
    }
    assert!("superuser".parse::<Role>().is_err());
  }

  #[test]
  fn test_role_serde_snake_case() {
    let role: Role = serde_json::from_str("\"department_head\"").unwrap();
    assert_eq!(role, Role::DepartmentHead);
    assert_eq!(serde_json::to_string(&Role::Staff).unwrap(), "\"staff\"");
  }

  #[test]
  fn test_review_gate() {
    assert!(Role::Admin.can_review());
    assert!(Role::DepartmentHead.can_review());
    assert!(!Role::Staff.can_review());
  }
}
