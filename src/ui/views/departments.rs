use crate::app::Services;
use crate::entities::departments::{self, Department, DepartmentUpdate, NewDepartment};
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{Field, Form, FormResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

enum FormTarget {
  Create,
  Edit(String),
}

/// Department list with create and edit forms
pub struct DepartmentsView {
  query: Query<Vec<Department>>,
  create: Mutation<NewDepartment, Department>,
  update: Mutation<(String, DepartmentUpdate), Department>,
  list_state: ListState,
  form: Option<(FormTarget, Form)>,
}

impl DepartmentsView {
  pub fn new(services: Services) -> Self {
    let mut query = departments::list(&services.client, &services.cache);
    query.fetch();

    Self {
      query,
      create: departments::create(&services.client, &services.cache),
      update: departments::update(&services.client, &services.cache),
      list_state: ListState::default(),
      form: None,
    }
  }

  fn rows(&self) -> &[Department] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn open_create_form(&mut self) {
    let form = Form::new(
      "New Department",
      vec![
        Field::text("name", "Name"),
        Field::text("description", "Description"),
      ],
    );
    self.form = Some((FormTarget::Create, form));
  }

  fn open_edit_form(&mut self) {
    let selected = self
      .list_state
      .selected()
      .and_then(|idx| self.rows().get(idx))
      .cloned();
    let Some(department) = selected else {
      return;
    };
    let form = Form::new(
      format!("Edit {}", truncate(&department.name, 24)),
      vec![
        Field::text("name", "Name").with_value(&department.name),
        Field::text("description", "Description").with_value(&department.description),
      ],
    );
    self.form = Some((FormTarget::Edit(department.id), form));
  }

  fn submit_form(&mut self) -> ViewAction {
    let Some((target, form)) = &mut self.form else {
      return ViewAction::None;
    };

    match target {
      FormTarget::Create => {
        let input = NewDepartment {
          name: form.value("name"),
          description: form.value("description"),
        };
        if let Err(e) = input.validate() {
          form.set_error(e.to_string());
          return ViewAction::None;
        }
        self.create.run(input);
      }
      FormTarget::Edit(id) => {
        let input = DepartmentUpdate {
          name: Some(form.value("name")),
          description: Some(form.value("description")),
        };
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
      QueryState::Loading => " Departments (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Departments (error: {}) ", e),
      _ => format!(" Departments ({}) ", len),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.rows().is_empty() && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load departments. Press 'r' to retry."
      } else {
        "No departments yet. Press 'n' to add one."
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
      .map(|department| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<28}", truncate(&department.name, 28)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            truncate(&department.description, 60),
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

impl View for DepartmentsView {
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
      KeyCode::Char('e') | KeyCode::Enter => {
        self.open_edit_form();
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
    "Departments".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();

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
