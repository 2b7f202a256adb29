use crate::api::CachedApiClient;
use crate::forms;
use crate::query::Query;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::LoginView;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const CODE: usize = 0;

/// Email verification screen: enter the 6-digit code sent after
/// registration. Ctrl-R requests a fresh code.
pub struct VerifyOtpView {
  api: CachedApiClient,
  email: String,
  form: Form,
  pending_verify: Option<Query<String>>,
  pending_resend: Option<Query<String>>,
  notice: Option<String>,
}

impl VerifyOtpView {
  pub fn new(api: CachedApiClient, email: String) -> Self {
    Self {
      api,
      email,
      form: Form::new().text_field("Verification code"),
      pending_verify: None,
      pending_resend: None,
      notice: Some("Check your email for a 6-digit code".to_string()),
    }
  }

  fn submit(&mut self) {
    self.form.clear_errors();
    self.notice = None;

    let code = self.form.value(CODE).trim().to_string();
    if let Err(e) = forms::validate_otp(&code) {
      self.form.set_field_error(CODE, Some(e));
      return;
    }

    let api = self.api.clone();
    let email = self.email.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      let email = email.clone();
      let code = code.clone();
      async move { api.verify_otp(&email, &code).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.pending_verify = Some(query);
  }

  fn resend(&mut self) {
    if self.pending_resend.is_some() {
      return;
    }
    self.notice = None;

    let api = self.api.clone();
    let email = self.email.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      let email = email.clone();
      async move { api.resend_otp(&email).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.pending_resend = Some(query);
  }
}

impl View for VerifyOtpView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('r') {
      self.resend();
      return ViewAction::None;
    }

    if self.pending_verify.is_some() {
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
    if let Some(query) = self.pending_verify.as_mut() {
      if query.poll() {
        if let Some(message) = query.data() {
          let message = message.clone();
          self.pending_verify = None;
          return ViewAction::ResetTo(Box::new(LoginView::with_notice(
            self.api.clone(),
            message,
          )));
        }
        if let Some(error) = query.error() {
          self.form.set_error(Some(error.to_string()));
        }
        self.pending_verify = None;
      }
    }

    if let Some(query) = self.pending_resend.as_mut() {
      if query.poll() {
        match (query.data(), query.error()) {
          (Some(message), _) => self.notice = Some(message.clone()),
          (_, Some(error)) => self.form.set_error(Some(error.to_string())),
          _ => {}
        }
        self.pending_resend = None;
      }
    }

    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 52.min(area.width.saturating_sub(2)).max(20);
    let height = (self.form.height() + 7).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 3;
    let box_area = Rect::new(x, y, width, height);

    let block = Block::default()
      .title(" Verify email ")
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

    let mut intro = vec![Line::from(Span::styled(
      format!("Code sent to {}", self.email),
      Style::default().fg(Color::White),
    ))];
    if let Some(notice) = &self.notice {
      intro.push(Line::from(Span::styled(
        notice.clone(),
        Style::default().fg(Color::Green),
      )));
    }
    frame.render_widget(Paragraph::new(intro), chunks[0]);

    self.form.render(frame, chunks[1]);

    let footer = if self.pending_verify.is_some() {
      Line::from(Span::styled(
        "Verifying...",
        Style::default().fg(Color::Yellow),
      ))
    } else if self.pending_resend.is_some() {
      Line::from(Span::styled(
        "Resending code...",
        Style::default().fg(Color::Yellow),
      ))
    } else {
      Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::styled(" verify  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Ctrl-R", Style::default().fg(Color::Cyan)),
        Span::styled(" resend code  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Esc", Style::default().fg(Color::Cyan)),
        Span::styled(" back", Style::default().fg(Color::DarkGray)),
      ])
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    "Verify".to_string()
  }

  fn status_hint(&self) -> &'static str {
    " Enter:verify  Ctrl-R:resend  Esc:back  Ctrl-C:quit"
  }
}
