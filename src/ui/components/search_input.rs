use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by search input that a parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
  /// Search text changed (emitted on each keystroke, empty string on cancel)
  Changed(String),
  /// Search submitted (overlay closed, filter persists)
  Submitted,
}

/// Live search overlay. Activated with `/`, emits a Changed event on every
/// keystroke so the parent can filter as the user types.
#[derive(Debug, Clone, Default)]
pub struct SearchInput {
  input: TextInput,
  active: bool,
}

impl SearchInput {
  pub fn new() -> Self {
    Self::default()
  }

  fn activate(&mut self) {
    self.active = true;
    self.input.clear();
  }

  /// Call this regardless of active state, it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<SearchEvent> {
    if !self.active {
      if key.code == KeyCode::Char('/') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(_) => {
        self.active = false;
        KeyResult::Event(SearchEvent::Submitted)
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(SearchEvent::Changed(String::new()))
      }
      InputResult::Consumed => KeyResult::Event(SearchEvent::Changed(self.input.value())),
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// Render the search overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 60);
    let height = 3;

    let x = area.x + 1;
    let y = area.y + 1;
    let overlay_area = Rect::new(x, y, width.min(area.width), height.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Search ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let input_line = Line::from(vec![
      Span::styled("/", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), inner);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_slash_activates() {
    let mut search = SearchInput::new();
    assert_eq!(search.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
    assert_eq!(search.handle_key(key(KeyCode::Char('/'))), KeyResult::Handled);

    // Active: keystrokes are captured now
    assert_eq!(
      search.handle_key(key(KeyCode::Char('x'))),
      KeyResult::Event(SearchEvent::Changed("x".to_string()))
    );
  }

  #[test]
  fn test_typing_emits_changed() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));

    let result = search.handle_key(key(KeyCode::Char('a')));
    assert_eq!(result, KeyResult::Event(SearchEvent::Changed("a".to_string())));
  }

  #[test]
  fn test_escape_clears_filter() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    search.handle_key(key(KeyCode::Char('a')));

    let result = search.handle_key(key(KeyCode::Esc));
    assert_eq!(result, KeyResult::Event(SearchEvent::Changed(String::new())));

    // Inactive again: keystrokes pass through
    assert_eq!(search.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
  }

  #[test]
  fn test_enter_submits_and_persists() {
    let mut search = SearchInput::new();
    search.handle_key(key(KeyCode::Char('/')));
    search.handle_key(key(KeyCode::Char('a')));

    // Submitting closes the overlay without a trailing Changed event, so the
    // parent's filter keeps the last submitted text
    let result = search.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(SearchEvent::Submitted));
    assert_eq!(search.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
  }
}
