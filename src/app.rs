use crate::cache::QueryCache;
use crate::commands::{self, Command};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::service::ServiceClient;
use crate::session::{Role, Session, SessionGate, EMAIL_KEY, ROLE_KEY};
use crate::store::LocalStore;
use crate::ui;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{
  AllocationsView, DepartmentsView, ResourcesView, SignInView, TransfersView,
};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
}

/// The shared per-process handles every view needs: the service client and
/// the query cache. Handed to views by value; both are cheap clones over
/// the same underlying state.
#[derive(Clone)]
pub struct Services {
  pub client: ServiceClient,
  pub cache: QueryCache,
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Auth lifecycle state
  session: SessionGate,

  /// Shared client + cache handles
  services: Services,

  /// Advisory local state (last email, last role)
  store: LocalStore,

  /// Application configuration
  config: Config,

  /// Error banner, dismissed with Esc
  banner: Option<String>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = ServiceClient::new(&config)?;
    let services = Services {
      client,
      cache: QueryCache::new(),
    };
    let store = LocalStore::open()?;

    // Remembered sign-in state is advisory only: it pre-fills the form and
    // never grants access by itself.
    let last_email = store.get(EMAIL_KEY)?;
    let role_hint = store
      .get(ROLE_KEY)?
      .and_then(|raw| raw.parse::<Role>().ok());

    let sign_in = SignInView::new(services.clone(), last_email, role_hint);

    Ok(Self {
      views: vec![Box::new(sign_in)],
      mode: Mode::Normal,
      command_input: String::new(),
      selected_suggestion: 0,
      session: SessionGate::new(),
      services,
      store,
      config,
      banner: None,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));

    // Main loop
    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        // Only the visible view polls; background views catch up through
        // cache invalidation when they return to the top.
        if let Some(view) = self.views.last_mut() {
          let action = view.tick();
          self.apply_action(action);
        }
      }
    }
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.banner.is_some() && key.code == KeyCode::Esc {
      self.banner = None;
      return;
    }

    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    let wants_text = self
      .views
      .last()
      .map(|v| v.wants_text_input())
      .unwrap_or(false);

    // The command line is only available once signed in, and never steals
    // a ':' typed into a form.
    if key.code == KeyCode::Char(':') && self.session.is_signed_in() && !wants_text {
      self.mode = Mode::Command;
      self.command_input.clear();
      self.selected_suggestion = 0;
      return;
    }

    if let Some(view) = self.views.last_mut() {
      let action = view.handle_key(key);
      self.apply_action(action);
    }
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        // Navigate autocomplete suggestions
        let suggestions = self.autocomplete_suggestions();
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        // Navigate autocomplete suggestions backwards
        let suggestions = self.autocomplete_suggestions();
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0; // Reset selection on input change
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0; // Reset selection on input change
      }
      _ => {}
    }
  }

  fn execute_command(&mut self) {
    let Some(session) = self.session.session().cloned() else {
      return;
    };

    // Get the command to execute - either from selected suggestion or
    // direct input
    let suggestions = commands::get_suggestions(&self.command_input, session.role);
    let cmd = if !suggestions.is_empty() && self.selected_suggestion < suggestions.len() {
      suggestions[self.selected_suggestion].name.to_string()
    } else {
      self.command_input.trim().to_lowercase()
    };

    match cmd.as_str() {
      "resources" => {
        self.views = vec![Box::new(ResourcesView::new(
          self.services.clone(),
          session,
        ))];
      }
      "allocations" => {
        self.views = vec![Box::new(AllocationsView::new(
          self.services.clone(),
          session,
        ))];
      }
      "departments" => {
        // Suggestions are role-filtered; a typed-out command is checked
        // here so the gate holds either way.
        if session.role.can_review() {
          self.views = vec![Box::new(DepartmentsView::new(self.services.clone()))];
        } else {
          self.banner = Some("departments requires a reviewer role".to_string());
        }
      }
      "transfers" => {
        if session.role.can_review() {
          self.views = vec![Box::new(TransfersView::new(self.services.clone()))];
        } else {
          self.banner = Some("transfers requires a reviewer role".to_string());
        }
      }
      "signout" => {
        self.apply_action(ViewAction::SignOut);
      }
      "quit" => {
        self.should_quit = true;
      }
      _ => {
        // Unknown command
      }
    }
    self.command_input.clear();
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => {
        self.views.push(view);
      }
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Error(message) => {
        self.banner = Some(message);
      }
      ViewAction::Authenticating => {
        self.session.begin();
      }
      ViewAction::Authenticated { auth, role } => {
        self.services.client.set_access_token(Some(auth.access_token));
        self.session.complete(Session {
          user_id: auth.user_id,
          email: auth.email.clone(),
          role,
        });

        if let Err(e) = self.store.put(EMAIL_KEY, &auth.email) {
          tracing::warn!(error = %e, "failed to remember email");
        }
        if let Err(e) = self.store.put(ROLE_KEY, &role.to_string()) {
          tracing::warn!(error = %e, "failed to remember role");
        }

        let Some(session) = self.session.session().cloned() else {
          return;
        };
        self.views = vec![Box::new(ResourcesView::new(
          self.services.clone(),
          session,
        ))];
      }
      ViewAction::AuthFailed => {
        self.services.client.set_access_token(None);
        self.session.fail();
      }
      ViewAction::SignOut => {
        self.session.sign_out();
        self.services.client.set_access_token(None);
        if let Err(e) = self.store.delete(ROLE_KEY) {
          tracing::warn!(error = %e, "failed to clear remembered role");
        }

        let last_email = self.store.get(EMAIL_KEY).ok().flatten();
        self.views = vec![Box::new(SignInView::new(
          self.services.clone(),
          last_email,
          None,
        ))];
        self.mode = Mode::Normal;
        self.banner = None;
      }
    }
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.views.last_mut()
  }

  pub fn current_title(&self) -> String {
    self
      .views
      .last()
      .map(|v| v.title())
      .unwrap_or_else(|| "r9s".to_string())
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn banner(&self) -> Option<&str> {
    self.banner.as_deref()
  }

  pub fn host(&self) -> String {
    match &self.config.title {
      Some(title) => title.clone(),
      None => self.services.client.host().to_string(),
    }
  }

  pub fn role_label(&self) -> Option<String> {
    self.session.session().map(|s| s.role.label().to_string())
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    match self.session.session() {
      Some(session) => commands::get_suggestions(&self.command_input, session.role),
      None => Vec::new(),
    }
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}
