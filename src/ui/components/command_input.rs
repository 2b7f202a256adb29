use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// Events emitted by the command palette
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// Command submitted (already resolved through the suggestion list)
  Submitted(String),
  /// Command cancelled
  Cancelled,
}

/// Command palette with autocomplete, activated with `:`.
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected_suggestion: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.input.value())
  }

  /// Call this regardless of active state, it handles activation too
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc => {
        self.active = false;
        self.input.clear();
        self.selected_suggestion = 0;
        return KeyResult::Event(CommandEvent::Cancelled);
      }
      KeyCode::Enter => {
        self.active = false;
        let cmd = self.resolve_command();
        self.input.clear();
        self.selected_suggestion = 0;
        return KeyResult::Event(CommandEvent::Submitted(cmd));
      }
      KeyCode::Tab | KeyCode::Down => {
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.input.handle_key(key) {
      InputResult::Consumed => {
        // Reset highlight when the text changes
        self.selected_suggestion = 0;
        KeyResult::Handled
      }
      InputResult::Submitted(_) | InputResult::Cancelled => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  /// The final command: highlighted suggestion if any, else the raw input
  fn resolve_command(&self) -> String {
    let suggestions = self.suggestions();
    if !suggestions.is_empty() && self.selected_suggestion < suggestions.len() {
      suggestions[self.selected_suggestion].name.to_string()
    } else {
      self.input.value().trim().to_lowercase()
    }
  }

  /// Render the command overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();

    let width = (area.width * 60 / 100).clamp(30, 60);
    let suggestion_count = suggestions.len().min(8);
    let height = 3 + suggestion_count as u16;

    let x = area.x + 1;
    let y = area.y + 1;
    let overlay_area = Rect::new(x, y, width.min(area.width), height.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
      Span::styled("_", Style::default().fg(Color::Yellow)),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);

    if !suggestions.is_empty() && chunks[1].height > 0 {
      let items: Vec<ListItem> = suggestions
        .iter()
        .take(8)
        .map(|cmd| {
          let line = Line::from(vec![
            Span::styled(format!("{:<10}", cmd.name), Style::default().fg(Color::Cyan)),
            Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
          ]);
          ListItem::new(line)
        })
        .collect();

      let list =
        List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

      let mut state = ListState::default();
      state.select(Some(self.selected_suggestion));

      frame.render_stateful_widget(list, chunks[1], &mut state);
    }
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
  fn test_colon_activates() {
    let mut palette = CommandInput::new();
    assert_eq!(palette.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);
    assert_eq!(palette.handle_key(key(KeyCode::Char(':'))), KeyResult::Handled);
    assert!(palette.is_active());
  }

  #[test]
  fn test_submit_resolves_suggestion() {
    let mut palette = CommandInput::new();
    palette.handle_key(key(KeyCode::Char(':')));
    palette.handle_key(key(KeyCode::Char('p')));

    // "p" is an alias of projects and tops the suggestions
    let result = palette.handle_key(key(KeyCode::Enter));
    assert_eq!(
      result,
      KeyResult::Event(CommandEvent::Submitted("projects".to_string()))
    );
    assert!(!palette.is_active());
  }

  #[test]
  fn test_tab_cycles_suggestions() {
    let mut palette = CommandInput::new();
    palette.handle_key(key(KeyCode::Char(':')));

    let first = palette.suggestions()[0].name;
    palette.handle_key(key(KeyCode::Tab));
    let result = palette.handle_key(key(KeyCode::Enter));
    match result {
      KeyResult::Event(CommandEvent::Submitted(cmd)) => assert_ne!(cmd, first),
      other => panic!("unexpected result: {:?}", other),
    }
  }

  #[test]
  fn test_escape_cancels() {
    let mut palette = CommandInput::new();
    palette.handle_key(key(KeyCode::Char(':')));
    palette.handle_key(key(KeyCode::Char('q')));

    let result = palette.handle_key(key(KeyCode::Esc));
    assert_eq!(result, KeyResult::Event(CommandEvent::Cancelled));
    assert!(!palette.is_active());
  }
}
