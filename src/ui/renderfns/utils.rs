use crate::entities::allocations::Priority;
use crate::entities::resources::ResourceStatus;
use crate::entities::RequestStatus;
use ratatui::prelude::Color;

/// Truncate a string to a maximum number of chars, adding "..." if truncated.
/// Cuts on char boundaries so multibyte names render instead of panicking.
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let keep = max_len.saturating_sub(3);
    let cut = s.char_indices().nth(keep).map_or(s.len(), |(i, _)| i);
    format!("{}...", &s[..cut])
  }
}

/// Display color for a resource status
pub fn resource_status_color(status: ResourceStatus) -> Color {
  match status {
    ResourceStatus::Available => Color::Green,
    ResourceStatus::InUse => Color::Yellow,
    ResourceStatus::Maintenance => Color::Red,
  }
}

/// Display color for a request/transfer review status
pub fn request_status_color(status: RequestStatus) -> Color {
  match status {
    RequestStatus::Pending => Color::Yellow,
    RequestStatus::Approved => Color::Green,
    RequestStatus::Rejected => Color::Red,
  }
}

/// Display color for an allocation request priority
pub fn priority_color(priority: Priority) -> Color {
  match priority {
    Priority::Low => Color::DarkGray,
    Priority::Medium => Color::White,
    Priority::High => Color::Yellow,
    Priority::Urgent => Color::Red,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte_string() {
    assert_eq!(truncate("日本語データベース", 8), "日本語デー...");
    assert_eq!(truncate("日本語", 8), "日本語");
    assert_eq!(truncate("répertoire général", 10), "réperto...");
  }

  #[test]
  fn test_resource_status_colors() {
    assert_eq!(resource_status_color(ResourceStatus::Available), Color::Green);
    assert_eq!(resource_status_color(ResourceStatus::InUse), Color::Yellow);
    assert_eq!(
      resource_status_color(ResourceStatus::Maintenance),
      Color::Red
    );
  }

  #[test]
  fn test_request_status_colors() {
    assert_eq!(request_status_color(RequestStatus::Pending), Color::Yellow);
    assert_eq!(request_status_color(RequestStatus::Approved), Color::Green);
    assert_eq!(request_status_color(RequestStatus::Rejected), Color::Red);
  }

  #[test]
  fn test_priority_colors() {
    assert_eq!(priority_color(Priority::Urgent), Color::Red);
    assert_eq!(priority_color(Priority::Low), Color::DarkGray);
  }
}
