use crate::app::Services;
use crate::entities::departments::{self, Department};
use crate::entities::resources::{self, Resource};
use crate::entities::transfers::{self, NewTransfer, Transfer};
use crate::entities::{parse_quantity, StatusChange};
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{Field, Form, FormResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{request_status_color, truncate};
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

fn resource_options(rows: &[Resource]) -> Vec<(String, String)> {
  rows.iter().map(|r| (r.id.clone(), r.name.clone())).collect()
}

fn department_options(rows: &[Department]) -> Vec<(String, String)> {
  rows.iter().map(|d| (d.id.clone(), d.name.clone())).collect()
}

/// Inter-department transfer review list. Reachable only with a reviewer
/// role.
pub struct TransfersView {
  query: Query<Vec<Transfer>>,
  resources: Query<Vec<Resource>>,
  departments: Query<Vec<Department>>,
  create: Mutation<NewTransfer, Transfer>,
  review: Mutation<(String, StatusChange), Transfer>,
  list_state: ListState,
  form: Option<Form>,
}

impl TransfersView {
  pub fn new(services: Services) -> Self {
    let mut query = transfers::list(&services.client, &services.cache);
    query.fetch();
    let mut resources = resources::list(&services.client, &services.cache);
    resources.fetch();
    let mut departments = departments::list(&services.client, &services.cache);
    departments.fetch();

    Self {
      query,
      resources,
      departments,
      create: transfers::create(&services.client, &services.cache),
      review: transfers::update_status(&services.client, &services.cache),
      list_state: ListState::default(),
      form: None,
    }
  }

  fn rows(&self) -> &[Transfer] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&Transfer> {
    self.list_state.selected().and_then(|idx| self.rows().get(idx))
  }

  fn open_create_form(&mut self) {
    let resource_choices =
      resource_options(self.resources.data().map(|v| v.as_slice()).unwrap_or(&[]));
    let department_choices =
      department_options(self.departments.data().map(|v| v.as_slice()).unwrap_or(&[]));

    let form = Form::new(
      "New Transfer",
      vec![
        Field::choice("resource", "Resource", resource_choices),
        Field::choice("from", "From department", department_choices.clone()),
        Field::choice("to", "To department", department_choices),
        Field::text("quantity", "Quantity").with_value("1"),
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

    let input = NewTransfer::new(
      form.value("resource"),
      form.value("from"),
      form.value("to"),
      quantity,
    );
    if let Err(e) = input.validate() {
      form.set_error(e.to_string());
      return ViewAction::None;
    }

    self.create.run(input);
    self.form = None;
    ViewAction::None
  }

  fn review_selected(&mut self, change: StatusChange) -> ViewAction {
    let Some(transfer) = self.selected() else {
      return ViewAction::None;
    };
    if let Err(e) = change.validate(transfer.status) {
      return ViewAction::Error(e.to_string());
    }
    let id = transfer.id.clone();
    self.review.run((id, change));
    ViewAction::None
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.rows().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Transfers (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Transfers (error: {}) ", e),
      _ => format!(" Transfers ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.rows().is_empty() && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load transfers. Press 'r' to retry."
      } else {
        "No transfers."
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
      .map(|transfer| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<22}", truncate(transfer.resource_name(), 22)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<16}", truncate(transfer.from_name(), 16)),
            Style::default().fg(Color::White),
          ),
          Span::styled("→ ", Style::default().fg(Color::DarkGray)),
          Span::styled(
            format!("{:<16}", truncate(transfer.to_name(), 16)),
            Style::default().fg(Color::White),
          ),
          Span::raw(" "),
          Span::raw(format!("{:>5}", transfer.quantity)),
          Span::raw(" "),
          Span::styled(
            format!("{:<10}", transfer.status.to_string()),
            Style::default().fg(request_status_color(transfer.status)),
          ),
          Span::styled(
            transfer.created_at.format("%Y-%m-%d").to_string(),
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

impl View for TransfersView {
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
    "Transfers".to_string()
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
        form.set_choice_options("from", options.clone());
        form.set_choice_options("to", options);
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
