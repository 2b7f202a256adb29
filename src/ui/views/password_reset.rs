use crate::api::CachedApiClient;
use crate::forms;
use crate::query::Query;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::LoginView;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Which half of the reset flow we're in
enum Stage {
  /// Asking for the account email
  Request,
  /// Email sent; asking for the emailed code and a new password
  Confirm,
}

/// Two-step password reset: request a code by email, then confirm with the
/// code and a new password.
pub struct PasswordResetView {
  api: CachedApiClient,
  stage: Stage,
  email: String,
  form: Form,
  pending: Option<Query<String>>,
  notice: Option<String>,
}

impl PasswordResetView {
  pub fn new(api: CachedApiClient) -> Self {
    Self {
      api,
      stage: Stage::Request,
      email: String::new(),
      form: Form::new().text_field("Email"),
      pending: None,
      notice: None,
    }
  }

  fn submit(&mut self) {
    self.form.clear_errors();

    match self.stage {
      Stage::Request => self.submit_request(),
      Stage::Confirm => self.submit_confirm(),
    }
  }

  fn submit_request(&mut self) {
    let email = self.form.value(0).trim().to_string();
    if let Err(e) = forms::validate_email(&email) {
      self.form.set_field_error(0, Some(e));
      return;
    }

    self.email = email.clone();
    let api = self.api.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      let email = email.clone();
      async move {
        api
          .request_password_reset(&email)
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    self.pending = Some(query);
  }

  fn submit_confirm(&mut self) {
    let code = self.form.value(0).trim().to_string();
    let password = self.form.value(1);

    if let Err(e) = forms::validate_otp(&code) {
      self.form.set_field_error(0, Some(e));
    }
    if let Err(e) = forms::validate_password(&password) {
      self.form.set_field_error(1, Some(e));
    }
    if self.form.has_field_errors() {
      return;
    }

    let api = self.api.clone();
    let email = self.email.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      let email = email.clone();
      let code = code.clone();
      let password = password.clone();
      async move {
        api
          .confirm_password_reset(&email, &code, &password)
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    self.pending = Some(query);
  }
}

impl View for PasswordResetView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.pending.is_some() {
      return ViewAction::None;
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    let Some(query) = self.pending.as_mut() else {
      return ViewAction::None;
    };

    if !query.poll() {
      return ViewAction::None;
    }

    let message = query.data().cloned();
    let error = query.error().map(String::from);
    self.pending = None;

    match (message, error) {
      (Some(message), _) => match self.stage {
        Stage::Request => {
          // Move to the confirm half with fresh fields
          self.stage = Stage::Confirm;
          self.form = Form::new()
            .text_field("Reset code")
            .masked_field("New password");
          self.notice = Some(message);
        }
        Stage::Confirm => {
          return ViewAction::ResetTo(Box::new(LoginView::with_notice(
            self.api.clone(),
            message,
          )));
        }
      },
      (_, Some(error)) => self.form.set_error(Some(error)),
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 52.min(area.width.saturating_sub(2)).max(20);
    let height = (self.form.height() + 7).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 3;
    let box_area = Rect::new(x, y, width, height);

    let title = match self.stage {
      Stage::Request => " Reset password ",
      Stage::Confirm => " Enter reset code ",
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(box_area);
    frame.render_widget(block, box_area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(2),
        Constraint::Length(self.form.height()),
        Constraint::Min(1),
      ])
      .split(inner);

    let mut intro = Vec::new();
    if let Stage::Confirm = self.stage {
      intro.push(Line::from(Span::styled(
        format!("Code sent to {}", self.email),
        Style::default().fg(Color::White),
      )));
    }
    if let Some(notice) = &self.notice {
      intro.push(Line::from(Span::styled(
        notice.clone(),
        Style::default().fg(Color::Green),
      )));
    }
    frame.render_widget(Paragraph::new(intro), chunks[0]);

    self.form.render(frame, chunks[1]);

    let footer = if self.pending.is_some() {
      Line::from(Span::styled("Working...", Style::default().fg(Color::Yellow)))
    } else {
      Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::styled(" submit  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Esc", Style::default().fg(Color::Cyan)),
        Span::styled(" back to sign in", Style::default().fg(Color::DarkGray)),
      ])
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    "Reset password".to_string()
  }

  fn status_hint(&self) -> &'static str {
    " Enter:submit  Esc:back  Ctrl-C:quit"
  }
}
