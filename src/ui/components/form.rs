use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Events emitted by a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
  /// Enter pressed on the last field (or Ctrl-S anywhere)
  Submitted,
  /// Escape pressed
  Cancelled,
}

struct FormField {
  label: &'static str,
  input: TextInput,
  error: Option<String>,
}

/// Vertical stack of labelled text inputs with per-field error lines and a
/// form-level error. Tab/Down and Shift-Tab/Up move focus; Enter advances,
/// submitting from the last field.
pub struct Form {
  fields: Vec<FormField>,
  focus: usize,
  error: Option<String>,
}

impl Form {
  pub fn new() -> Self {
    Self {
      fields: Vec::new(),
      focus: 0,
      error: None,
    }
  }

  pub fn text_field(mut self, label: &'static str) -> Self {
    self.fields.push(FormField {
      label,
      input: TextInput::new(),
      error: None,
    });
    self
  }

  pub fn masked_field(mut self, label: &'static str) -> Self {
    self.fields.push(FormField {
      label,
      input: TextInput::masked(),
      error: None,
    });
    self
  }

  pub fn value(&self, index: usize) -> String {
    self
      .fields
      .get(index)
      .map(|f| f.input.value())
      .unwrap_or_default()
  }

  pub fn set_value(&mut self, index: usize, value: &str) {
    if let Some(field) = self.fields.get_mut(index) {
      field.input.set_value(value);
    }
  }

  pub fn set_field_error(&mut self, index: usize, error: Option<String>) {
    if let Some(field) = self.fields.get_mut(index) {
      field.error = error;
    }
  }

  /// Set the form-level error shown below the fields
  pub fn set_error(&mut self, error: Option<String>) {
    self.error = error;
  }

  pub fn clear_errors(&mut self) {
    self.error = None;
    for field in &mut self.fields {
      field.error = None;
    }
  }

  pub fn has_field_errors(&self) -> bool {
    self.fields.iter().any(|f| f.error.is_some())
  }

  /// Lines needed to render all fields plus the error slot
  pub fn height(&self) -> u16 {
    self.fields.len() as u16 * 3 + 2
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if self.fields.is_empty() {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % self.fields.len();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = if self.focus == 0 {
          self.fields.len() - 1
        } else {
          self.focus - 1
        };
        return KeyResult::Handled;
      }
      _ => {}
    }

    match self.fields[self.focus].input.handle_key(key) {
      InputResult::Submitted(_) => {
        if self.focus + 1 < self.fields.len() {
          self.focus += 1;
          KeyResult::Handled
        } else {
          KeyResult::Event(FormEvent::Submitted)
        }
      }
      InputResult::Cancelled => KeyResult::Event(FormEvent::Cancelled),
      InputResult::Consumed => KeyResult::Handled,
      InputResult::NotHandled => KeyResult::NotHandled,
    }
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    for (i, field) in self.fields.iter().enumerate() {
      let focused = i == self.focus;
      let marker = if focused { "> " } else { "  " };
      let label_style = if focused {
        Style::default().fg(Color::Cyan).bold()
      } else {
        Style::default().fg(Color::DarkGray)
      };

      lines.push(Line::from(Span::styled(
        format!("{}{}", marker, field.label),
        label_style,
      )));

      let mut value_spans = vec![Span::raw("  "), Span::raw(field.input.display_value())];
      if focused {
        value_spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
      }
      lines.push(Line::from(value_spans));

      match &field.error {
        Some(error) => lines.push(Line::from(Span::styled(
          format!("  {}", error),
          Style::default().fg(Color::Red),
        ))),
        None => lines.push(Line::raw("")),
      }
    }

    if let Some(error) = &self.error {
      lines.push(Line::raw(""));
      lines.push(Line::from(Span::styled(
        error.clone(),
        Style::default().fg(Color::Red),
      )));
    }

    frame.render_widget(Paragraph::new(lines), area);
  }
}

impl Default for Form {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn login_form() -> Form {
    Form::new().text_field("Email").masked_field("Password")
  }

  fn type_str(form: &mut Form, s: &str) {
    for c in s.chars() {
      form.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_typing_goes_to_focused_field() {
    let mut form = login_form();
    type_str(&mut form, "a@b.com");
    assert_eq!(form.value(0), "a@b.com");
    assert_eq!(form.value(1), "");
  }

  #[test]
  fn test_tab_moves_focus() {
    let mut form = login_form();
    form.handle_key(key(KeyCode::Tab));
    type_str(&mut form, "hunter22");
    assert_eq!(form.value(1), "hunter22");

    // Wraps back to the first field
    form.handle_key(key(KeyCode::Tab));
    type_str(&mut form, "a@b.com");
    assert_eq!(form.value(0), "a@b.com");
  }

  #[test]
  fn test_enter_advances_then_submits() {
    let mut form = login_form();
    type_str(&mut form, "a@b.com");

    // Enter on the first field just advances
    assert_eq!(form.handle_key(key(KeyCode::Enter)), KeyResult::Handled);

    type_str(&mut form, "password1");
    assert_eq!(form.value(1), "password1");
    assert_eq!(
      form.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(FormEvent::Submitted)
    );
  }

  #[test]
  fn test_escape_cancels() {
    let mut form = login_form();
    assert_eq!(
      form.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(FormEvent::Cancelled)
    );
  }

  #[test]
  fn test_field_errors() {
    let mut form = login_form();
    assert!(!form.has_field_errors());

    form.set_field_error(0, Some("Email is required".to_string()));
    assert!(form.has_field_errors());

    form.clear_errors();
    assert!(!form.has_field_errors());
  }
}
