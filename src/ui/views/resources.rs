use crate::app::Services;
use crate::entities::departments::{self, Department};
use crate::entities::resources::{self, NewResource, Resource, ResourceStatus, ResourceUpdate};
use crate::entities::parse_quantity;
use crate::query::{Mutation, Query, QueryState};
use crate::session::Session;
use crate::ui::components::{Field, Form, FormResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{resource_status_color, truncate};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::ResourceDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

fn status_wire(status: ResourceStatus) -> &'static str {
  match status {
    ResourceStatus::Available => "available",
    ResourceStatus::InUse => "in_use",
    ResourceStatus::Maintenance => "maintenance",
  }
}

fn status_from_wire(value: &str) -> Option<ResourceStatus> {
  ResourceStatus::ALL
    .into_iter()
    .find(|s| status_wire(*s) == value)
}

fn status_options() -> Vec<(String, String)> {
  ResourceStatus::ALL
    .iter()
    .map(|s| (status_wire(*s).to_string(), s.label().to_string()))
    .collect()
}

fn department_options(departments: &[Department]) -> Vec<(String, String)> {
  let mut options = vec![(String::new(), "(none)".to_string())];
  options.extend(departments.iter().map(|d| (d.id.clone(), d.name.clone())));
  options
}

enum FormTarget {
  Create,
  Edit(String),
}

/// Resource inventory list with create and edit forms
pub struct ResourcesView {
  session: Session,
  query: Query<Vec<Resource>>,
  departments: Query<Vec<Department>>,
  create: Mutation<NewResource, Resource>,
  update: Mutation<(String, ResourceUpdate), Resource>,
  list_state: ListState,
  form: Option<(FormTarget, Form)>,
}

impl ResourcesView {
  pub fn new(services: Services, session: Session) -> Self {
    let mut query = resources::list(&services.client, &services.cache);
    query.fetch();
    let mut departments = departments::list(&services.client, &services.cache);
    departments.fetch();

    Self {
      session,
      query,
      departments,
      create: resources::create(&services.client, &services.cache),
      update: resources::update(&services.client, &services.cache),
      list_state: ListState::default(),
      form: None,
    }
  }

  fn rows(&self) -> &[Resource] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&Resource> {
    self.list_state.selected().and_then(|idx| self.rows().get(idx))
  }

  fn department_choices(&self) -> Vec<(String, String)> {
    department_options(self.departments.data().map(|v| v.as_slice()).unwrap_or(&[]))
  }

  fn open_create_form(&mut self) {
    let form = Form::new(
      "New Resource",
      vec![
        Field::text("name", "Name"),
        Field::text("description", "Description"),
        Field::text("quantity", "Quantity").with_value("1"),
        Field::choice("status", "Status", status_options()),
        Field::choice("department", "Department", self.department_choices()),
      ],
    );
    self.form = Some((FormTarget::Create, form));
  }

  fn open_edit_form(&mut self) {
    let Some(resource) = self.selected().cloned() else {
      return;
    };
    let form = Form::new(
      format!("Edit {}", truncate(&resource.name, 24)),
      vec![
        Field::text("name", "Name").with_value(&resource.name),
        Field::text("description", "Description")
          .with_value(resource.description.as_deref().unwrap_or("")),
        Field::text("quantity", "Quantity").with_value(&resource.quantity.to_string()),
        Field::choice("status", "Status", status_options())
          .with_value(status_wire(resource.status)),
        Field::choice("department", "Department", self.department_choices())
          .with_value(resource.department_id.as_deref().unwrap_or("")),
      ],
    );
    self.form = Some((FormTarget::Edit(resource.id), form));
  }

  fn submit_form(&mut self) -> ViewAction {
    let Some((target, form)) = &mut self.form else {
      return ViewAction::None;
    };

    let quantity = match parse_quantity(&form.value("quantity"), 0) {
      Ok(q) => q,
      Err(e) => {
        form.set_error(e.to_string());
        return ViewAction::None;
      }
    };
    let status = status_from_wire(&form.value("status"));
    let department = form.value("department");
    let department_id = (!department.is_empty()).then_some(department);
    let description = form.value("description");
    let description = (!description.trim().is_empty()).then_some(description);

    match target {
      FormTarget::Create => {
        let input = NewResource {
          name: form.value("name"),
          description,
          quantity,
          status: status.unwrap_or(ResourceStatus::Available),
          department_id,
          created_by: Some(self.session.user_id.clone()),
        };
        if let Err(e) = input.validate() {
          form.set_error(e.to_string());
          return ViewAction::None;
        }
        self.create.run(input);
      }
      FormTarget::Edit(id) => {
        let mut input = ResourceUpdate::now();
        input.name = Some(form.value("name"));
        input.description = description;
        input.quantity = Some(quantity);
        input.status = status;
        input.department_id = department_id;
        if let Err(e) = input.validate() {
          form.set_error(e.to_string());
          return ViewAction::None;
        }
        self.update.run((id.clone(), input));
      }
    }

    self.form = None;
    ViewAction::None
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Resources (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Resources (error: {}) ", e),
      _ => format!(" Resources ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.rows().is_empty() && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load resources. Press 'r' to retry."
      } else {
        "No resources yet. Press 'n' to add one."
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
      .map(|resource| {
        let color = resource_status_color(resource.status);
        let line = Line::from(vec![
          Span::styled(
            format!("{:<32}", truncate(&resource.name, 32)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<12}", resource.status.label()),
            Style::default().fg(color),
          ),
          Span::raw(" "),
          Span::raw(format!("{:>6}", resource.quantity)),
          Span::raw("  "),
          Span::styled(
            truncate(resource.description.as_deref().unwrap_or(""), 40),
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

impl View for ResourcesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some((_, form)) = &mut self.form {
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
      KeyCode::Char('e') => {
        self.open_edit_form();
      }
      KeyCode::Enter => {
        if let Some(resource) = self.selected().cloned() {
          let department_name = resource.department_id.as_deref().and_then(|id| {
            self
              .departments
              .data()
              .and_then(|rows| rows.iter().find(|d| d.id == id))
              .map(|d| d.name.clone())
          });
          return ViewAction::Push(Box::new(ResourceDetailView::new(resource, department_name)));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    if let Some((_, form)) = &self.form {
      form.render_overlay(frame, area);
    }
  }

  fn title(&self) -> String {
    "Resources".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    if self.departments.poll() {
      let choices = self.department_choices();
      if let Some((_, form)) = &mut self.form {
        form.set_choice_options("department", choices);
      }
    }

    self.create.poll();
    if let Some(error) = self.create.take_error() {
      return ViewAction::Error(error);
    }
    self.create.take_success();

    self.update.poll();
    if let Some(error) = self.update.take_error() {
      return ViewAction::Error(error);
    }
    self.update.take_success();

    ViewAction::None
  }

  fn wants_text_input(&self) -> bool {
    self.form.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_wire_round_trip() {
    for status in ResourceStatus::ALL {
      assert_eq!(status_from_wire(status_wire(status)), Some(status));
    }
    assert_eq!(status_from_wire("retired"), None);
  }

  #[test]
  fn test_department_options_include_none() {
    let options = department_options(&[]);
    assert_eq!(options, vec![(String::new(), "(none)".to_string())]);
  }
}
