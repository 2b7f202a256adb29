use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Key was handled, continue input mode
  Consumed,
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Reusable single-line text input. The cursor is tracked in characters so
/// editing multi-byte input stays safe.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: Vec<char>,
  cursor: usize,
  masked: bool,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Render the value as bullets (for passwords)
  pub fn masked() -> Self {
    Self {
      masked: true,
      ..Self::default()
    }
  }

  /// Get the current input value
  pub fn value(&self) -> String {
    self.buffer.iter().collect()
  }

  /// The value as shown on screen, honoring the mask
  pub fn display_value(&self) -> String {
    if self.masked {
      "•".repeat(self.buffer.len())
    } else {
      self.value()
    }
  }

  /// Replace the contents, placing the cursor at the end
  pub fn set_value(&mut self, value: &str) {
    self.buffer = value.chars().collect();
    self.cursor = self.buffer.len();
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  /// Handle a key event, returning the result
  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    match key.code {
      KeyCode::Esc => InputResult::Cancelled,
      KeyCode::Enter => InputResult::Submitted(self.value()),
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          self.buffer.remove(self.cursor);
        }
        InputResult::Consumed
      }
      KeyCode::Delete => {
        if self.cursor < self.buffer.len() {
          self.buffer.remove(self.cursor);
        }
        InputResult::Consumed
      }
      KeyCode::Left => {
        if self.cursor > 0 {
          self.cursor -= 1;
        }
        InputResult::Consumed
      }
      KeyCode::Right => {
        if self.cursor < self.buffer.len() {
          self.cursor += 1;
        }
        InputResult::Consumed
      }
      KeyCode::Home | KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End | KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.cursor = self.buffer.len();
        InputResult::Consumed
      }
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        // Clear line before cursor
        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        // Delete word before cursor
        if self.cursor > 0 {
          let mut new_cursor = self.cursor;
          while new_cursor > 0 && self.buffer[new_cursor - 1] == ' ' {
            new_cursor -= 1;
          }
          while new_cursor > 0 && self.buffer[new_cursor - 1] != ' ' {
            new_cursor -= 1;
          }
          self.buffer.drain(new_cursor..self.cursor);
          self.cursor = new_cursor;
        }
        InputResult::Consumed
      }
      KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.buffer.insert(self.cursor, c);
        self.cursor += 1;
        InputResult::Consumed
      }
      _ => InputResult::NotHandled,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl_key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
  }

  fn type_str(input: &mut TextInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_basic_input() {
    let mut input = TextInput::new();
    assert_eq!(input.value(), "");

    type_str(&mut input, "hi");
    assert_eq!(input.value(), "hi");
  }

  #[test]
  fn test_submit() {
    let mut input = TextInput::new();
    type_str(&mut input, "test");

    let result = input.handle_key(key(KeyCode::Enter));
    assert_eq!(result, InputResult::Submitted("test".to_string()));
  }

  #[test]
  fn test_cancel() {
    let mut input = TextInput::new();
    type_str(&mut input, "x");

    let result = input.handle_key(key(KeyCode::Esc));
    assert_eq!(result, InputResult::Cancelled);
  }

  #[test]
  fn test_backspace() {
    let mut input = TextInput::new();
    type_str(&mut input, "abc");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "ab");
  }

  #[test]
  fn test_cursor_movement() {
    let mut input = TextInput::new();
    type_str(&mut input, "ac");
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Char('b')));
    assert_eq!(input.value(), "abc");
  }

  #[test]
  fn test_multibyte_editing() {
    let mut input = TextInput::new();
    type_str(&mut input, "café");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "caf");
  }

  #[test]
  fn test_masked_display() {
    let mut input = TextInput::masked();
    type_str(&mut input, "secret");
    assert_eq!(input.value(), "secret");
    assert_eq!(input.display_value(), "••••••");
  }

  #[test]
  fn test_set_value() {
    let mut input = TextInput::new();
    input.set_value("hello");
    assert_eq!(input.value(), "hello");

    // Cursor lands at the end
    input.handle_key(key(KeyCode::Char('!')));
    assert_eq!(input.value(), "hello!");
  }

  #[test]
  fn test_ctrl_u_clear_before_cursor() {
    let mut input = TextInput::new();
    type_str(&mut input, "hello world");
    for _ in 0..5 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(ctrl_key(KeyCode::Char('u')));
    assert_eq!(input.value(), "world");
  }

  #[test]
  fn test_ctrl_w_deletes_word() {
    let mut input = TextInput::new();
    type_str(&mut input, "hello world");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "hello ");
  }
}
