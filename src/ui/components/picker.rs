use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by the picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent<T> {
  /// A choice was made; `None` is the "All" entry
  Selected(Option<T>),
  /// Picker cancelled
  Cancelled,
}

/// Centered overlay for choosing one value out of a small fixed set, with a
/// leading "All" entry that clears the filter. Used for status and priority.
#[derive(Debug, Clone)]
pub struct Picker<T> {
  active: bool,
  title: String,
  options: Vec<(Option<T>, String)>,
  selected: usize,
}

impl<T: Clone> Default for Picker<T> {
  fn default() -> Self {
    Self {
      active: false,
      title: String::new(),
      options: Vec::new(),
      selected: 0,
    }
  }
}

impl<T: Clone> Picker<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker over the given choices, preselecting `current`.
  pub fn show(&mut self, title: &str, choices: Vec<(T, String)>, current: Option<&T>)
  where
    T: PartialEq,
  {
    self.title = title.to_string();
    self.options = std::iter::once((None, "All".to_string()))
      .chain(choices.into_iter().map(|(v, label)| (Some(v), label)))
      .collect();
    self.selected = self
      .options
      .iter()
      .position(|(v, _)| v.as_ref() == current)
      .unwrap_or(0);
    self.active = true;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.options.clear();
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PickerEvent<T>> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(PickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let choice = self.options.get(self.selected).map(|(v, _)| v.clone());
        self.hide();
        match choice {
          Some(value) => KeyResult::Event(PickerEvent::Selected(value)),
          None => KeyResult::Event(PickerEvent::Cancelled),
        }
      }
      KeyCode::Char('j') | KeyCode::Down => {
        if !self.options.is_empty() {
          self.selected = (self.selected + 1) % self.options.len();
        }
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        if !self.options.is_empty() {
          self.selected = if self.selected == 0 {
            self.options.len() - 1
          } else {
            self.selected - 1
          };
        }
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active || self.options.is_empty() {
      return;
    }

    let max_label_len = self
      .options
      .iter()
      .map(|(_, label)| label.chars().count())
      .max()
      .unwrap_or(10);
    let width = ((max_label_len as u16 + 6).max(self.title.len() as u16 + 6))
      .clamp(20, area.width.saturating_sub(4).max(20));
    let height = (self.options.len() as u16 + 2).clamp(3, area.height.saturating_sub(4).max(3));

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

    let items: Vec<ListItem> = self
      .options
      .iter()
      .map(|(_, label)| {
        ListItem::new(Line::from(Span::styled(
          label.clone(),
          Style::default().fg(Color::Cyan),
        )))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn choices() -> Vec<(u8, String)> {
    vec![(1, "One".to_string()), (2, "Two".to_string())]
  }

  #[test]
  fn test_inactive_passes_keys_through() {
    let mut picker: Picker<u8> = Picker::new();
    assert_eq!(picker.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }

  #[test]
  fn test_all_entry_clears_selection() {
    let mut picker = Picker::new();
    picker.show("Status", choices(), None);

    // First entry is "All"
    let result = picker.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(PickerEvent::Selected(None)));
    assert!(!picker.is_active());
  }

  #[test]
  fn test_select_specific_value() {
    let mut picker = Picker::new();
    picker.show("Status", choices(), None);

    picker.handle_key(key(KeyCode::Char('j')));
    let result = picker.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(PickerEvent::Selected(Some(1))));
  }

  #[test]
  fn test_preselects_current_value() {
    let mut picker = Picker::new();
    picker.show("Status", choices(), Some(&2));

    let result = picker.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(PickerEvent::Selected(Some(2))));
  }

  #[test]
  fn test_escape_cancels() {
    let mut picker = Picker::new();
    picker.show("Status", choices(), None);

    let result = picker.handle_key(key(KeyCode::Esc));
    assert_eq!(result, KeyResult::Event(PickerEvent::Cancelled));
    assert!(!picker.is_active());
  }

  #[test]
  fn test_wraparound_navigation() {
    let mut picker = Picker::new();
    picker.show("Status", choices(), None);

    // Three entries total (All, One, Two); k from the top wraps to the last
    picker.handle_key(key(KeyCode::Char('k')));
    let result = picker.handle_key(key(KeyCode::Enter));
    assert_eq!(result, KeyResult::Event(PickerEvent::Selected(Some(2))));
  }
}
