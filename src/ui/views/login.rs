use crate::api::types::User;
use crate::api::CachedApiClient;
use crate::forms;
use crate::query::Query;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{PasswordResetView, ProjectListView, RegisterView};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const EMAIL: usize = 0;
const PASSWORD: usize = 1;

/// Sign-in screen, the root view when no session is saved.
pub struct LoginView {
  api: CachedApiClient,
  form: Form,
  pending: Option<Query<User>>,
  notice: Option<String>,
}

impl LoginView {
  pub fn new(api: CachedApiClient) -> Self {
    Self {
      api,
      form: Form::new().text_field("Email").masked_field("Password"),
      pending: None,
      notice: None,
    }
  }

  /// Login screen with an informational banner (post-verification, logout).
  pub fn with_notice(api: CachedApiClient, notice: String) -> Self {
    let mut view = Self::new(api);
    view.notice = Some(notice);
    view
  }

  fn submit(&mut self) {
    self.form.clear_errors();
    self.notice = None;

    let email = self.form.value(EMAIL);
    let password = self.form.value(PASSWORD);

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
    let email = email.trim().to_string();
    let mut query = Query::new(move || {
      let api = api.clone();
      let email = email.clone();
      let password = password.clone();
      async move { api.login(&email, &password).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.pending = Some(query);
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
      match key.code {
        KeyCode::Char('r') => {
          return ViewAction::Push(Box::new(RegisterView::new(self.api.clone())));
        }
        KeyCode::Char('p') => {
          return ViewAction::Push(Box::new(PasswordResetView::new(self.api.clone())));
        }
        _ => {}
      }
    }

    // Ignore edits while the request is in flight
    if self.pending.is_some() {
      return ViewAction::None;
    }

    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Submitted) => self.submit(),
      KeyResult::Event(FormEvent::Cancelled) => return ViewAction::Quit,
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

    if query.state().is_success() {
      self.pending = None;
      return ViewAction::ResetTo(Box::new(ProjectListView::new(self.api.clone())));
    }

    if let Some(error) = query.error() {
      self.form.set_error(Some(error.to_string()));
    }
    self.pending = None;
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 50.min(area.width.saturating_sub(2)).max(20);
    let height = (self.form.height() + 6).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 3;
    let box_area = Rect::new(x, y, width, height);

    let block = Block::default()
      .title(" Sign in ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(box_area);
    frame.render_widget(block, box_area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),
        Constraint::Length(self.form.height()),
        Constraint::Min(1),
      ])
      .split(inner);

    if let Some(notice) = &self.notice {
      let banner = Paragraph::new(notice.clone()).style(Style::default().fg(Color::Green));
      frame.render_widget(banner, chunks[0]);
    }

    self.form.render(frame, chunks[1]);

    let footer = if self.pending.is_some() {
      Line::from(Span::styled(
        "Signing in...",
        Style::default().fg(Color::Yellow),
      ))
    } else {
      Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::styled(" sign in  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Ctrl-R", Style::default().fg(Color::Cyan)),
        Span::styled(" register  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Ctrl-P", Style::default().fg(Color::Cyan)),
        Span::styled(" reset password", Style::default().fg(Color::DarkGray)),
      ])
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    "Sign in".to_string()
  }

  fn status_hint(&self) -> &'static str {
    " Enter:sign in  Ctrl-R:register  Ctrl-P:reset  Ctrl-C:quit"
  }
}
