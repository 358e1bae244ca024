use super::{InputResult, TextInput};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// What a form field accepts
#[derive(Debug, Clone)]
pub enum FieldKind {
  /// Free text
  Text,
  /// Free text rendered masked (passwords)
  Secret,
  /// One of a fixed set of (value, label) options, cycled with Left/Right
  Choice {
    options: Vec<(String, String)>,
    selected: usize,
  },
}

/// A single labelled form field
#[derive(Debug, Clone)]
pub struct Field {
  pub name: &'static str,
  pub label: &'static str,
  pub kind: FieldKind,
  input: TextInput,
}

impl Field {
  pub fn text(name: &'static str, label: &'static str) -> Self {
    Self {
      name,
      label,
      kind: FieldKind::Text,
      input: TextInput::new(),
    }
  }

  pub fn secret(name: &'static str, label: &'static str) -> Self {
    Self {
      name,
      label,
      kind: FieldKind::Secret,
      input: TextInput::new(),
    }
  }

  pub fn choice(name: &'static str, label: &'static str, options: Vec<(String, String)>) -> Self {
    Self {
      name,
      label,
      kind: FieldKind::Choice {
        options,
        selected: 0,
      },
      input: TextInput::new(),
    }
  }

  /// Pre-fill a text field (edit forms, remembered email)
  pub fn with_value(mut self, value: &str) -> Self {
    match &mut self.kind {
      FieldKind::Text | FieldKind::Secret => self.input.set_value(value),
      FieldKind::Choice { options, selected } => {
        if let Some(idx) = options.iter().position(|(v, _)| v == value) {
          *selected = idx;
        }
      }
    }
    self
  }

  /// The submittable value: the buffer, or the selected option's value
  pub fn value(&self) -> String {
    match &self.kind {
      FieldKind::Text | FieldKind::Secret => self.input.value().to_string(),
      FieldKind::Choice { options, selected } => options
        .get(*selected)
        .map(|(v, _)| v.clone())
        .unwrap_or_default(),
    }
  }

  /// What gets drawn on the field line
  fn display_value(&self) -> String {
    match &self.kind {
      FieldKind::Text => self.input.value().to_string(),
      FieldKind::Secret => "*".repeat(self.input.value().len()),
      FieldKind::Choice { options, selected } => match options.get(*selected) {
        Some((_, label)) => format!("< {} >", label),
        None => "(loading...)".to_string(),
      },
    }
  }

  fn cycle(&mut self, delta: i32) {
    if let FieldKind::Choice { options, selected } = &mut self.kind {
      let len = options.len();
      if len > 0 {
        *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
      }
    }
  }
}

/// Result of handling a key event in a form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormResult {
  /// Key was handled, form stays open
  Consumed,
  /// Enter pressed; read values with `value(name)`
  Submitted,
  /// Escape pressed, form dismissed
  Cancelled,
  /// Key not handled
  NotHandled,
}

/// Modal form overlay with labelled fields and an inline error line.
///
/// The parent view owns the form, validates on Submitted, and either runs
/// its mutation or calls `set_error` to keep the form open with the
/// validation message.
#[derive(Debug, Clone)]
pub struct Form {
  title: String,
  fields: Vec<Field>,
  focused: usize,
  error: Option<String>,
}

impl Form {
  pub fn new(title: impl Into<String>, fields: Vec<Field>) -> Self {
    Self {
      title: title.into(),
      fields,
      focused: 0,
      error: None,
    }
  }

  /// Get a field's submittable value by name
  pub fn value(&self, name: &str) -> String {
    self
      .fields
      .iter()
      .find(|f| f.name == name)
      .map(|f| f.value())
      .unwrap_or_default()
  }

  /// Replace a choice field's options, keeping the selection if the
  /// previously selected value is still present
  pub fn set_choice_options(&mut self, name: &str, new_options: Vec<(String, String)>) {
    let Some(field) = self.fields.iter_mut().find(|f| f.name == name) else {
      return;
    };
    if let FieldKind::Choice { options, selected } = &mut field.kind {
      let current = options.get(*selected).map(|(v, _)| v.clone());
      *selected = current
        .and_then(|v| new_options.iter().position(|(nv, _)| *nv == v))
        .unwrap_or(0);
      *options = new_options;
    }
  }

  pub fn set_error(&mut self, error: impl Into<String>) {
    self.error = Some(error.into());
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  /// Handle a key event
  pub fn handle_key(&mut self, key: KeyEvent) -> FormResult {
    match key.code {
      KeyCode::Esc => return FormResult::Cancelled,
      KeyCode::Enter => return FormResult::Submitted,
      KeyCode::Tab | KeyCode::Down => {
        if !self.fields.is_empty() {
          self.focused = (self.focused + 1) % self.fields.len();
        }
        return FormResult::Consumed;
      }
      KeyCode::BackTab | KeyCode::Up => {
        if !self.fields.is_empty() {
          self.focused = if self.focused == 0 {
            self.fields.len() - 1
          } else {
            self.focused - 1
          };
        }
        return FormResult::Consumed;
      }
      _ => {}
    }

    let Some(field) = self.fields.get_mut(self.focused) else {
      return FormResult::NotHandled;
    };

    match &field.kind {
      FieldKind::Choice { .. } => match key.code {
        KeyCode::Left | KeyCode::Char('h') => {
          field.cycle(-1);
          FormResult::Consumed
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => {
          field.cycle(1);
          FormResult::Consumed
        }
        _ => FormResult::Consumed,
      },
      FieldKind::Text | FieldKind::Secret => match field.input.handle_key(key) {
        InputResult::Consumed => {
          // Typing clears a stale validation message
          self.error = None;
          FormResult::Consumed
        }
        // Enter/Esc were intercepted above
        _ => FormResult::Consumed,
      },
    }
  }

  /// Render the form as a centered overlay
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let label_width = self
      .fields
      .iter()
      .map(|f| f.label.len())
      .max()
      .unwrap_or(8);

    let width = (area.width * 60 / 100).clamp(40, 64).min(area.width);
    // Fields + blank + hint line + optional error + borders
    let error_lines = if self.error.is_some() { 1 } else { 0 };
    let height = (self.fields.len() as u16 + 3 + error_lines).min(area.height);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let mut lines: Vec<Line> = Vec::new();
    for (idx, field) in self.fields.iter().enumerate() {
      let focused = idx == self.focused;
      let marker = if focused { "> " } else { "  " };
      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };
      let mut value = field.display_value();
      if focused && matches!(field.kind, FieldKind::Text | FieldKind::Secret) {
        value.push('_');
      }
      lines.push(Line::from(vec![
        Span::raw(marker),
        Span::styled(format!("{:<width$} ", field.label, width = label_width), label_style),
        Span::raw(value),
      ]));
    }

    if let Some(error) = &self.error {
      lines.push(Line::from(Span::styled(
        format!("  {}", error),
        Style::default().fg(Color::Red),
      )));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(
      "  Enter:submit  Esc:cancel  Tab:next  ←/→:choose",
      Style::default().fg(Color::DarkGray),
    )));

    frame.render_widget(Paragraph::new(lines), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn sample_form() -> Form {
    Form::new(
      "New Resource",
      vec![
        Field::text("name", "Name"),
        Field::text("quantity", "Quantity").with_value("1"),
        Field::choice(
          "status",
          "Status",
          vec![
            ("available".to_string(), "available".to_string()),
            ("in_use".to_string(), "in use".to_string()),
          ],
        ),
      ],
    )
  }

  #[test]
  fn test_typing_goes_to_focused_field() {
    let mut form = sample_form();
    form.handle_key(key(KeyCode::Char('s')));
    form.handle_key(key(KeyCode::Char('a')));
    form.handle_key(key(KeyCode::Char('w')));
    assert_eq!(form.value("name"), "saw");
    assert_eq!(form.value("quantity"), "1");
  }

  #[test]
  fn test_tab_moves_focus() {
    let mut form = sample_form();
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Char('2')));
    assert_eq!(form.value("quantity"), "12");
  }

  #[test]
  fn test_choice_cycles_and_wraps() {
    let mut form = sample_form();
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Tab));
    assert_eq!(form.value("status"), "available");
    form.handle_key(key(KeyCode::Right));
    assert_eq!(form.value("status"), "in_use");
    form.handle_key(key(KeyCode::Right));
    assert_eq!(form.value("status"), "available");
    form.handle_key(key(KeyCode::Left));
    assert_eq!(form.value("status"), "in_use");
  }

  #[test]
  fn test_submit_and_cancel() {
    let mut form = sample_form();
    assert_eq!(form.handle_key(key(KeyCode::Enter)), FormResult::Submitted);
    assert_eq!(form.handle_key(key(KeyCode::Esc)), FormResult::Cancelled);
  }

  #[test]
  fn test_typing_clears_error() {
    let mut form = sample_form();
    form.set_error("name is required");
    assert!(form.error().is_some());
    form.handle_key(key(KeyCode::Char('x')));
    assert!(form.error().is_none());
  }

  #[test]
  fn test_set_choice_options_keeps_selection() {
    let mut form = sample_form();
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Tab));
    form.handle_key(key(KeyCode::Right)); // in_use
    form.set_choice_options(
      "status",
      vec![
        ("maintenance".to_string(), "maintenance".to_string()),
        ("in_use".to_string(), "in use".to_string()),
      ],
    );
    assert_eq!(form.value("status"), "in_use");
  }

  #[test]
  fn test_empty_choice_has_empty_value() {
    let form = Form::new("T", vec![Field::choice("dept", "Department", Vec::new())]);
    assert_eq!(form.value("dept"), "");
  }
}
