use chrono::NaiveDate;
use ratatui::prelude::Color;

use crate::api::types::{Priority, ProjectStatus};

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated. Safe on multi-byte input.
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a project status
pub fn status_color(status: ProjectStatus) -> Color {
  match status {
    ProjectStatus::Draft => Color::DarkGray,
    ProjectStatus::Active => Color::Green,
    ProjectStatus::Completed => Color::Blue,
    ProjectStatus::Archived => Color::Gray,
  }
}

/// Display color for a priority
pub fn priority_color(priority: Priority) -> Color {
  match priority {
    Priority::Low => Color::DarkGray,
    Priority::Medium => Color::White,
    Priority::High => Color::Yellow,
    Priority::Critical => Color::Red,
  }
}

/// Render an optional date, with a dash placeholder for none
pub fn format_date(date: Option<NaiveDate>) -> String {
  match date {
    Some(d) => d.format("%Y-%m-%d").to_string(),
    None => "-".to_string(),
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
  fn test_truncate_multibyte() {
    assert_eq!(truncate("héllö wörld", 8), "héllö...");
  }

  #[test]
  fn test_status_colors() {
    assert_eq!(status_color(ProjectStatus::Active), Color::Green);
    assert_eq!(status_color(ProjectStatus::Draft), Color::DarkGray);
  }

  #[test]
  fn test_priority_colors() {
    assert_eq!(priority_color(Priority::Critical), Color::Red);
    assert_eq!(priority_color(Priority::High), Color::Yellow);
  }

  #[test]
  fn test_format_date() {
    assert_eq!(format_date(None), "-");
    assert_eq!(
      format_date(NaiveDate::from_ymd_opt(2025, 6, 15)),
      "2025-06-15"
    );
  }
}
