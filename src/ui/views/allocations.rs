use crate::app::Services;
use crate::entities::allocations::{self, AllocationRequest, NewAllocationRequest, Priority};
use crate::entities::departments::{self, Department};
use crate::entities::resources::{self, Resource};
use crate::entities::{parse_quantity, StatusChange};
use crate::query::{Mutation, Query, QueryState};
use crate::session::{Role, Session};
use crate::ui::components::{Field, Form, FormResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{priority_color, request_status_color, truncate};
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

fn priority_wire(priority: Priority) -> &'static str {
  match priority {
    Priority::Low => "low",
    Priority::Medium => "medium",
    Priority::High => "high",
    Priority::Urgent => "urgent",
  }
}

fn priority_from_wire(value: &str) -> Option<Priority> {
  Priority::ALL
    .into_iter()
    .find(|p| priority_wire(*p) == value)
}

fn priority_options() -> Vec<(String, String)> {
  Priority::ALL
    .iter()
    .map(|p| (priority_wire(*p).to_string(), p.label().to_string()))
    .collect()
}

fn resource_options(rows: &[Resource]) -> Vec<(String, String)> {
  rows.iter().map(|r| (r.id.clone(), r.name.clone())).collect()
}

fn department_options(rows: &[Department]) -> Vec<(String, String)> {
  rows.iter().map(|d| (d.id.clone(), d.name.clone())).collect()
}

/// Allocation request list. Every role can browse and submit requests;
/// approve/reject is reviewer-only.
pub struct AllocationsView {
  role: Role,
  query: Query<Vec<AllocationRequest>>,
  resources: Query<Vec<Resource>>,
  departments: Query<Vec<Department>>,
  create: Mutation<NewAllocationRequest, AllocationRequest>,
  review: Mutation<(String, StatusChange), AllocationRequest>,
  list_state: ListState,
  form: Option<Form>,
}

impl AllocationsView {
  pub fn new(services: Services, session: Session) -> Self {
    let mut query = allocations::list(&services.client, &services.cache);
    query.fetch();
    let mut resources = resources::list(&services.client, &services.cache);
    resources.fetch();
    let mut departments = departments::list(&services.client, &services.cache);
    departments.fetch();

    Self {
      role: session.role,
      query,
      resources,
      departments,
      create: allocations::create(&services.client, &services.cache),
      review: allocations::update_status(&services.client, &services.cache),
      list_state: ListState::default(),
      form: None,
    }
  }

  fn rows(&self) -> &[AllocationRequest] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&AllocationRequest> {
    self.list_state.selected().and_then(|idx| self.rows().get(idx))
  }

  fn open_create_form(&mut self) {
    let form = Form::new(
      "New Allocation Request",
      vec![
        Field::choice(
          "resource",
          "Resource",
          resource_options(self.resources.data().map(|v| v.as_slice()).unwrap_or(&[])),
        ),
        Field::choice(
          "department",
          "Department",
          department_options(self.departments.data().map(|v| v.as_slice()).unwrap_or(&[])),
        ),
        Field::text("quantity", "Quantity").with_value("1"),
        Field::choice("priority", "Priority", priority_options())
          .with_value(priority_wire(Priority::Medium)),
      ],
    );
    self.form = Some(form);
  }

  fn submit_form(&mut self) -> ViewAction {
    let Some(form) = &mut self.form else {
      return ViewAction::None;
    };

    let quantity = match parse_quantity(&form.value("quantity"), 1) {
      Ok(q) => q,
      Err(e) => {
        form.set_error(e.to_string());
        return ViewAction::None;
      }
    };
    let priority = priority_from_wire(&form.value("priority")).unwrap_or(Priority::Medium);

    let input = NewAllocationRequest::new(
      form.value("resource"),
      form.value("department"),
      quantity,
      priority,
    );
    if let Err(e) = input.validate() {
      form.set_error(e.to_string());
      return ViewAction::None;
    }

    self.create.run(input);
    self.form = None;
    ViewAction::None
  }

  /// Approve or reject the selected request. The transition guard runs
  /// against the row on screen; a settled request is refused locally.
  fn review_selected(&mut self, change: StatusChange) -> ViewAction {
    if !self.role.can_review() {
      return ViewAction::Error("reviewing requests requires a reviewer role".to_string());
    }
    let Some(request) = self.selected() else {
      return ViewAction::None;
    };
    if let Err(e) = change.validate(request.status) {
      return ViewAction::Error(e.to_string());
    }
    let id = request.id.clone();
    self.review.run((id, change));
    ViewAction::None
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Allocation Requests (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Allocation Requests (error: {}) ", e),
      _ => format!(" Allocation Requests ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.rows().is_empty() && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load requests. Press 'r' to retry."
      } else {
        "No allocation requests."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .rows()
      .iter()
      .map(|request| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<24}", truncate(request.resource_name(), 24)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<20}", truncate(request.department_name(), 20)),
            Style::default().fg(Color::White),
          ),
          Span::raw(" "),
          Span::raw(format!("{:>5}", request.quantity)),
          Span::raw(" "),
          Span::styled(
            format!("{:<8}", request.priority.label()),
            Style::default().fg(priority_color(request.priority)),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<10}", request.status.to_string()),
            Style::default().fg(request_status_color(request.status)),
          ),
          Span::styled(
            request.request_date.format("%Y-%m-%d").to_string(),
            Style::default().fg(Color::DarkGray),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for AllocationsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some(form) = &mut self.form {
      return match form.handle_key(key) {
        FormResult::Submitted => self.submit_form(),
        FormResult::Cancelled => {
          self.form = None;
          ViewAction::None
        }
        FormResult::Consumed | FormResult::NotHandled => ViewAction::None,
      };
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('r') => {
        self.query.refetch();
      }
      KeyCode::Char('n') => {
        self.open_create_form();
      }
      KeyCode::Char('a') => return self.review_selected(StatusChange::approve()),
      KeyCode::Char('x') => return self.review_selected(StatusChange::reject()),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    if let Some(form) = &self.form {
      form.render_overlay(frame, area);
    }
  }

  fn title(&self) -> String {
    "Allocations".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if self.resources.poll() {
      let options = resource_options(self.resources.data().map(|v| v.as_slice()).unwrap_or(&[]));
      if let Some(form) = &mut self.form {
        form.set_choice_options("resource", options);
      }
    }
    if self.departments.poll() {
      let options =
        department_options(self.departments.data().map(|v| v.as_slice()).unwrap_or(&[]));
      if let Some(form) = &mut self.form {
        form.set_choice_options("department", options);
      }
    }

    self.create.poll();
    if let Some(error) = self.create.take_error() {
      return ViewAction::Error(error);
    }
    self.create.take_success();

    self.review.poll();
    if let Some(error) = self.review.take_error() {
      return ViewAction::Error(error);
    }
    self.review.take_success();

    ViewAction::None
  }

  fn wants_text_input(&self) -> bool {
    self.form.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::QueryCache;
  use crate::config::{Config, ServiceConfig};
  use crate::service::ServiceClient;

  fn test_services() -> Services {
    let config = Config {
      service: ServiceConfig {
        url: "https://example.invalid".to_string(),
        api_key: Some("test-key".to_string()),
      },
      title: None,
    };
    Services {
      client: ServiceClient::new(&config).unwrap(),
      cache: QueryCache::new(),
    }
  }

  fn test_session(role: Role) -> Session {
    Session {
      user_id: "user-1".to_string(),
      email: "user@example.com".to_string(),
      role,
    }
  }

  #[tokio::test]
  async fn test_staff_cannot_review() {
    let mut view = AllocationsView::new(test_services(), test_session(Role::Staff));
    let action = view.review_selected(StatusChange::approve());
    assert!(matches!(action, ViewAction::Error(_)));
  }

  #[tokio::test]
  async fn test_reviewer_review_without_selection_is_noop() {
    let mut view =
      AllocationsView::new(test_services(), test_session(Role::DepartmentHead));
    let action = view.review_selected(StatusChange::approve());
    assert!(matches!(action, ViewAction::None));
  }

  #[test]
  fn test_priority_wire_round_trip() {
    for priority in Priority::ALL {
      assert_eq!(priority_from_wire(priority_wire(priority)), Some(priority));
    }
    assert_eq!(priority_from_wire("critical"), None);
  }
}
