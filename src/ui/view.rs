use crate::service::AuthSession;
use crate::session::Role;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Actions that a view can request in response to user input or a tick
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Show an error in the banner line
  Error(String),
  /// Credentials have been submitted
  Authenticating,
  /// Authentication finished successfully
  Authenticated { auth: AuthSession, role: Role },
  /// Authentication failed; the view keeps the error inline
  AuthFailed,
  /// Sign the current user out
  SignOut,
}

/// Trait for view behavior
///
/// Views handle their own input modes (forms, pickers) and return actions
/// for the App to execute. This creates a clean delegation chain:
/// App → View → Components
///
/// Views that load data asynchronously hold Query/Mutation bindings and
/// poll them in tick().
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Label for the header bar
  fn title(&self) -> String;

  /// Called on each tick to poll async queries and mutations. A completed
  /// mutation can surface an error here, hence the action return.
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Whether the view currently owns raw text input (a focused form). The
  /// App skips global single-key shortcuts while this is true.
  fn wants_text_input(&self) -> bool {
    false
  }
}
