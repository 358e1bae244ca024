pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::{App, Mode};
use ratatui::prelude::*;
use ratatui::widgets::{ListState, Paragraph};

/// Clamp a list selection into range, selecting the first row once data
/// arrives
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(idx) if idx >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let has_banner = app.banner().is_some();
  let constraints = if has_banner {
    vec![
      Constraint::Length(1), // Header
      Constraint::Length(1), // Banner
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ]
  } else {
    vec![
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ]
  };

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints(constraints)
    .split(frame.area());

  let content_area = if has_banner { chunks[2] } else { chunks[1] };
  let status_area = if has_banner { chunks[3] } else { chunks[2] };

  let title = app.current_title();
  let role_label = app.role_label();
  renderfns::draw_header(
    frame,
    chunks[0],
    &app.host(),
    &title,
    role_label.as_deref(),
  );

  if let Some(banner) = app.banner() {
    let line = Line::from(vec![
      Span::styled(" ✗ ", Style::default().fg(Color::Red).bold()),
      Span::styled(banner.to_string(), Style::default().fg(Color::Red)),
      Span::styled("  (Esc to dismiss)", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), chunks[1]);
  }

  if let Some(view) = app.current_view_mut() {
    view.render(frame, content_area);
  }

  draw_status_bar(frame, status_area, app);

  // Command overlay on top of everything
  if app.mode() == &Mode::Command {
    components::draw_command_overlay(
      frame,
      content_area,
      app.command_input(),
      &app.autocomplete_suggestions(),
      app.selected_suggestion(),
    );
  }
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Normal => {
      let hint = " :command  j/k:nav  n:new  e:edit  r:refresh  q:back  Ctrl-C:quit";
      (hint.to_string(), Style::default().fg(Color::DarkGray))
    }
    Mode::Command => {
      let cmd = format!(":{}", app.command_input());
      (cmd, Style::default().fg(Color::Yellow))
    }
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection_selects_first() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));
  }

  #[test]
  fn test_ensure_valid_selection_clamps() {
    let mut state = ListState::default();
    state.select(Some(5));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));
  }

  #[test]
  fn test_ensure_valid_selection_empty_clears() {
    let mut state = ListState::default();
    state.select(Some(0));
    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
