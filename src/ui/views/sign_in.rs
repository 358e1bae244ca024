use crate::app::Services;
use crate::query::Mutation;
use crate::service::AuthSession;
use crate::session::Role;
use crate::ui::components::{Field, Form, FormResult};
use crate::ui::view::{View, ViewAction};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Validated credentials; nothing goes on the wire before this parses.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Credentials {
  email: String,
  password: String,
}

impl Credentials {
  fn parse(email: &str, password: &str) -> Result<Self, String> {
    let email = email.trim();
    if email.is_empty() {
      return Err("email is required".to_string());
    }
    if !email.contains('@') {
      return Err("email must contain '@'".to_string());
    }
    if password.is_empty() {
      return Err("password is required".to_string());
    }
    Ok(Self {
      email: email.to_string(),
      password: password.to_string(),
    })
  }
}

enum AuthInput {
  SignIn(Credentials),
  SignUp(Credentials, Role),
}

/// Sign-in / sign-up screen. The whole authentication exchange runs as one
/// mutation; its error lands inline in the form, never in the banner.
pub struct SignInView {
  form: Form,
  auth: Mutation<AuthInput, (AuthSession, Role)>,
}

impl SignInView {
  pub fn new(services: Services, last_email: Option<String>, role_hint: Option<Role>) -> Self {
    let modes = vec![
      ("sign_in".to_string(), "sign in".to_string()),
      ("sign_up".to_string(), "sign up".to_string()),
    ];
    let roles = Role::ALL
      .iter()
      .map(|r| (r.to_string(), r.label().to_string()))
      .collect();

    let mut email_field = Field::text("email", "Email");
    if let Some(email) = &last_email {
      email_field = email_field.with_value(email);
    }
    let mut role_field = Field::choice("role", "Role (sign up)", roles);
    if let Some(role) = role_hint {
      role_field = role_field.with_value(&role.to_string());
    }

    let form = Form::new(
      "Welcome to r9s",
      vec![
        Field::choice("mode", "Mode", modes),
        email_field,
        Field::secret("password", "Password"),
        role_field,
      ],
    );

    let client = services.client.clone();
    let auth = Mutation::new(services.cache.clone(), Vec::new(), move |input: AuthInput| {
      let client = client.clone();
      async move {
        match input {
          AuthInput::SignIn(creds) => {
            let auth = client
              .sign_in(&creds.email, &creds.password)
              .await
              .map_err(|e| e.to_string())?;
            client.set_access_token(Some(auth.access_token.clone()));
            let role = client
              .fetch_role(&auth.user_id)
              .await
              .map_err(|e| e.to_string())?;
            Ok((auth, role))
          }
          AuthInput::SignUp(creds, role) => {
            let signed_up = client
              .sign_up(&creds.email, &creds.password)
              .await
              .map_err(|e| e.to_string())?;
            // Some deployments return a session straight from signup,
            // others require a follow-up sign-in.
            let auth = match signed_up {
              Some(auth) => auth,
              None => client
                .sign_in(&creds.email, &creds.password)
                .await
                .map_err(|e| e.to_string())?,
            };
            client.set_access_token(Some(auth.access_token.clone()));
            client
              .create_profile(&auth.user_id, &creds.email, role)
              .await
              .map_err(|e| e.to_string())?;
            Ok((auth, role))
          }
        }
      }
    });

    Self { form, auth }
  }

  fn submit(&mut self) -> ViewAction {
    if self.auth.is_running() {
      return ViewAction::None;
    }

    let creds = match Credentials::parse(&self.form.value("email"), &self.form.value("password")) {
      Ok(creds) => creds,
      Err(e) => {
        self.form.set_error(e);
        return ViewAction::None;
      }
    };

    let input = if self.form.value("mode") == "sign_up" {
      let role = match self.form.value("role").parse::<Role>() {
        Ok(role) => role,
        Err(e) => {
          self.form.set_error(e);
          return ViewAction::None;
        }
      };
      AuthInput::SignUp(creds, role)
    } else {
      AuthInput::SignIn(creds)
    };

    self.auth.run(input);
    ViewAction::Authenticating
  }
}

impl View for SignInView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.auth.is_running() {
      return ViewAction::None;
    }
    match self.form.handle_key(key) {
      FormResult::Submitted => self.submit(),
      // There is nothing behind this view to cancel into
      FormResult::Cancelled | FormResult::Consumed | FormResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let status = if self.auth.is_running() {
      "signing in..."
    } else {
      "not signed in"
    };
    let paragraph = Paragraph::new(status)
      .style(Style::default().fg(Color::DarkGray))
      .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);

    self.form.render_overlay(frame, area);
  }

  fn title(&self) -> String {
    "Sign in".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if !self.auth.poll() {
      return ViewAction::None;
    }
    if let Some((auth, role)) = self.auth.take_success() {
      return ViewAction::Authenticated { auth, role };
    }
    if let Some(error) = self.auth.take_error() {
      self.form.set_error(error);
      return ViewAction::AuthFailed;
    }
    ViewAction::None
  }

  fn wants_text_input(&self) -> bool {
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_credentials_require_email_and_password() {
    assert!(Credentials::parse("", "secret").is_err());
    assert!(Credentials::parse("head@example.com", "").is_err());
    assert!(Credentials::parse("not-an-email", "secret").is_err());
  }

  #[test]
  fn test_credentials_trim_email() {
    let creds = Credentials::parse("  head@example.com ", "secret").unwrap();
    assert_eq!(creds.email, "head@example.com");
    assert_eq!(creds.password, "secret");
  }
}
