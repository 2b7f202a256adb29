use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar: logo, backend domain, account, connectivity.
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  api_url: &str,
  account: Option<&str>,
  online: bool,
) {
  let domain = extract_domain(api_url);

  let mut spans = vec![
    Span::styled(" trk ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", domain), Style::default().fg(Color::White)),
  ];

  if let Some(account) = account {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", account),
      Style::default().fg(Color::Yellow),
    ));
  }

  if !online {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      " OFFLINE ",
      Style::default().fg(Color::Black).bg(Color::Red).bold(),
    ));
  }

  spans.push(Span::raw("  "));
  spans.push(Span::styled("<:>", Style::default().fg(Color::Cyan)));
  spans.push(Span::styled(" command", Style::default().fg(Color::DarkGray)));
  spans.push(Span::raw("   "));
  spans.push(Span::styled("<q>", Style::default().fg(Color::Cyan)));
  spans.push(Span::styled(" back", Style::default().fg(Color::DarkGray)));

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Extract the host portion of the backend URL
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(extract_domain("https://api.example.com/api/"), "api.example.com");
    assert_eq!(extract_domain("http://localhost:8000/api/"), "localhost:8000");
    assert_eq!(extract_domain("api.example.com"), "api.example.com");
  }
}
