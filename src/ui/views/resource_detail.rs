use crate::entities::resources::Resource;
use crate::ui::renderfns::{resource_status_color, truncate};
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Read-only detail view for a resource row. Works from the row already on
/// screen; the list behind it stays live and re-renders on invalidation.
pub struct ResourceDetailView {
  resource: Resource,
  department_name: Option<String>,
}

impl ResourceDetailView {
  pub fn new(resource: Resource, department_name: Option<String>) -> Self {
    Self {
      resource,
      department_name,
    }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" {} ", truncate(&self.resource.name, 48)))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(4), // Status, quantity, department, dates
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Description
      ])
      .split(inner);

    let department = self
      .department_name
      .as_deref()
      .or(self.resource.department_id.as_deref())
      .unwrap_or("(none)");

    let header = vec![
      Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          self.resource.status.label(),
          Style::default().fg(resource_status_color(self.resource.status)),
        ),
        Span::raw("  "),
        Span::styled("Quantity: ", Style::default().fg(Color::DarkGray)),
        Span::raw(self.resource.quantity.to_string()),
      ]),
      Line::from(vec![
        Span::styled("Department: ", Style::default().fg(Color::DarkGray)),
        Span::raw(department),
        Span::raw("  "),
        Span::styled("Location: ", Style::default().fg(Color::DarkGray)),
        Span::raw(self.resource.location.as_deref().unwrap_or("-")),
      ]),
      Line::from(vec![
        Span::styled("Created: ", Style::default().fg(Color::DarkGray)),
        Span::raw(self.resource.created_at.format("%Y-%m-%d %H:%M").to_string()),
        Span::raw("  "),
        Span::styled("Updated: ", Style::default().fg(Color::DarkGray)),
        Span::raw(
          self
            .resource
            .updated_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string()),
        ),
      ]),
    ];
    frame.render_widget(Paragraph::new(header), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let desc = self
      .resource
      .description
      .as_deref()
      .unwrap_or("No description");
    let desc_para = Paragraph::new(desc).wrap(Wrap { trim: true });
    frame.render_widget(desc_para, chunks[2]);
  }
}

impl View for ResourceDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn title(&self) -> String {
    self.resource.name.clone()
  }
}
