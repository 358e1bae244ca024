use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, service host, view title, and role
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  host: &str,
  title: &str,
  role_label: Option<&str>,
) {
  let mut spans = vec![
    Span::styled(" r9s ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", title),
      Style::default().fg(Color::Yellow).bold(),
    ),
  ];

  if let Some(role) = role_label {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", role),
      Style::default().fg(Color::Magenta),
    ));
  }

  spans.push(Span::raw("  "));
  // Shortcuts - keys highlighted, descriptions dimmed
  spans.push(Span::styled("<:>", Style::default().fg(Color::Cyan)));
  spans.push(Span::styled(" command", Style::default().fg(Color::DarkGray)));
  spans.push(Span::raw("   "));
  spans.push(Span::styled("<r>", Style::default().fg(Color::Cyan)));
  spans.push(Span::styled(" refresh", Style::default().fg(Color::DarkGray)));
  spans.push(Span::raw("   "));
  spans.push(Span::styled("<q>", Style::default().fg(Color::Cyan)));
  spans.push(Span::styled(" back", Style::default().fg(Color::DarkGray)));

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}
