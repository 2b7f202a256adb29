use crate::api::types::User;
use crate::api::wire::RegisterRequest;
use crate::api::CachedApiClient;
use crate::forms;
use crate::query::Query;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::VerifyOtpView;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tracing::info;

const FIRST_NAME: usize = 0;
const LAST_NAME: usize = 1;
const EMAIL: usize = 2;
const PASSWORD: usize = 3;

/// Account creation screen. A successful registration moves on to OTP
/// verification for the new account's email.
pub struct RegisterView {
  api: CachedApiClient,
  form: Form,
  pending: Option<Query<User>>,
}

impl RegisterView {
  pub fn new(api: CachedApiClient) -> Self {
    Self {
      api,
      form: Form::new()
        .text_field("First name")
        .text_field("Last name")
        .text_field("Email")
        .masked_field("Password"),
      pending: None,
    }
  }

  fn submit(&mut self) {
    self.form.clear_errors();

    let first_name = self.form.value(FIRST_NAME).trim().to_string();
    let last_name = self.form.value(LAST_NAME).trim().to_string();
    let email = self.form.value(EMAIL).trim().to_string();
    let password = self.form.value(PASSWORD);

    if first_name.is_empty() {
      self
        .form
        .set_field_error(FIRST_NAME, Some("First name is required".to_string()));
    }
    if last_name.is_empty() {
      self
        .form
        .set_field_error(LAST_NAME, Some("Last name is required".to_string()));
    }
    if let Err(e) = forms::validate_email(&email) {
      self.form.set_field_error(EMAIL, Some(e));
    }
    if let Err(e) = forms::validate_password(&password) {
      self.form.set_field_error(PASSWORD, Some(e));
    }
    if self.form.has_field_errors() {
      return;
    }

    let api = self.api.clone();
    let request = RegisterRequest {
      first_name,
      last_name,
      email,
      password,
    };
    let mut query = Query::new(move || {
      let api = api.clone();
      let request = request.clone();
      async move { api.register(request).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.pending = Some(query);
  }
}

impl View for RegisterView {
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

    if let Some(user) = query.data() {
      info!(account = %user.full_name(), email = %user.email, "account created");
      let email = user.email.clone();
      self.pending = None;
      return ViewAction::Replace(Box::new(VerifyOtpView::new(self.api.clone(), email)));
    }

    if let Some(error) = query.error() {
      self.form.set_error(Some(error.to_string()));
    }
    self.pending = None;
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 54.min(area.width.saturating_sub(2)).max(20);
    let height = (self.form.height() + 5).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 3;
    let box_area = Rect::new(x, y, width, height);

    let block = Block::default()
      .title(" Create account ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(box_area);
    frame.render_widget(block, box_area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(self.form.height()), Constraint::Min(1)])
      .split(inner);

    self.form.render(frame, chunks[0]);

    let footer = if self.pending.is_some() {
      Line::from(Span::styled(
        "Creating account...",
        Style::default().fg(Color::Yellow),
      ))
    } else {
      Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::styled(" submit  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Esc", Style::default().fg(Color::Cyan)),
        Span::styled(" back to sign in", Style::default().fg(Color::DarkGray)),
      ])
    };
    frame.render_widget(Paragraph::new(footer), chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Register".to_string()
  }

  fn status_hint(&self) -> &'static str {
    " Enter:submit  Esc:back  Ctrl-C:quit"
  }
}
