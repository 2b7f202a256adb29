use crate::api::types::{Priority, Project, ProjectStatus};
use crate::api::wire::{ProjectPatchPayload, ProjectPayload};
use crate::api::CachedApiClient;
use crate::forms;
use crate::query::Query;
use crate::ui::components::{Form, FormEvent, KeyResult, Picker, PickerEvent};
use crate::ui::renderfns::{priority_color, status_color};
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const NAME: usize = 0;
const DESCRIPTION: usize = 1;
const START_DATE: usize = 2;
const DUE_DATE: usize = 3;

enum FormMode {
  Create,
  Edit { id: String },
}

/// Create/edit form for a project. Text fields are a [`Form`]; status and
/// priority sit below it and open as pickers (Ctrl-S, Ctrl-P).
pub struct ProjectFormView {
  api: CachedApiClient,
  mode: FormMode,
  form: Form,
  status: ProjectStatus,
  priority: Priority,
  status_picker: Picker<ProjectStatus>,
  priority_picker: Picker<Priority>,
  pending: Option<Query<Project>>,
}

impl ProjectFormView {
  pub fn create(api: CachedApiClient) -> Self {
    Self {
      api,
      mode: FormMode::Create,
      form: Self::empty_form(),
      status: ProjectStatus::Draft,
      priority: Priority::Medium,
      status_picker: Picker::new(),
      priority_picker: Picker::new(),
      pending: None,
    }
  }

  pub fn edit(api: CachedApiClient, project: Project) -> Self {
    let mut form = Self::empty_form();
    form.set_value(NAME, &project.name);
    form.set_value(DESCRIPTION, project.description.as_deref().unwrap_or(""));
    if let Some(date) = project.start_date {
      form.set_value(START_DATE, &date.format("%Y-%m-%d").to_string());
    }
    if let Some(date) = project.due_date {
      form.set_value(DUE_DATE, &date.format("%Y-%m-%d").to_string());
    }

    Self {
      api,
      mode: FormMode::Edit { id: project.id },
      form,
      status: project.status,
      priority: project.priority,
      status_picker: Picker::new(),
      priority_picker: Picker::new(),
      pending: None,
    }
  }

  fn empty_form() -> Form {
    Form::new()
      .text_field("Name")
      .text_field("Description")
      .text_field("Start date (YYYY-MM-DD)")
      .text_field("Due date (YYYY-MM-DD)")
  }

  fn submit(&mut self) {
    self.form.clear_errors();

    let name = self.form.value(NAME).trim().to_string();
    let description = self.form.value(DESCRIPTION).trim().to_string();

    if let Err(e) = forms::validate_name(&name) {
      self.form.set_field_error(NAME, Some(e));
    }

    let start_date = match forms::parse_date(&self.form.value(START_DATE)) {
      Ok(date) => date,
      Err(e) => {
        self.form.set_field_error(START_DATE, Some(e));
        None
      }
    };
    let due_date = match forms::parse_date(&self.form.value(DUE_DATE)) {
      Ok(date) => date,
      Err(e) => {
        self.form.set_field_error(DUE_DATE, Some(e));
        None
      }
    };
    if !self.form.has_field_errors() {
      if let Err(e) = forms::validate_date_range(start_date, due_date) {
        self.form.set_field_error(DUE_DATE, Some(e));
      }
    }
    if self.form.has_field_errors() {
      return;
    }

    let api = self.api.clone();
    let status = self.status;
    let priority = self.priority;

    let mut query = match &self.mode {
      FormMode::Create => {
        let payload = ProjectPayload {
          name,
          description,
          status,
          priority,
          start_date,
          due_date,
        };
        Query::new(move || {
          let api = api.clone();
          let payload = payload.clone();
          async move { api.create_project(&payload).await.map_err(|e| e.to_string()) }
        })
      }
      FormMode::Edit { id } => {
        let id = id.clone();
        let patch = ProjectPatchPayload {
          name: Some(name),
          description: Some(description),
          status: Some(status),
          priority: Some(priority),
          start_date: Some(start_date),
          due_date: Some(due_date),
        };
        Query::new(move || {
          let api = api.clone();
          let id = id.clone();
          let patch = patch.clone();
          async move {
            api
              .update_project(&id, &patch)
              .await
              .map_err(|e| e.to_string())
          }
        })
      }
    };
    query.fetch();
    self.pending = Some(query);
  }

  fn title(&self) -> &'static str {
    match self.mode {
      FormMode::Create => " New project ",
      FormMode::Edit { .. } => " Edit project ",
    }
  }
}

impl View for ProjectFormView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.status_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(Some(status))) => {
        self.status = status;
        return ViewAction::None;
      }
      KeyResult::Event(_) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }
    match self.priority_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(Some(priority))) => {
        self.priority = priority;
        return ViewAction::None;
      }
      KeyResult::Event(_) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
      match key.code {
        KeyCode::Char('s') => {
          let choices = ProjectStatus::ALL
            .iter()
            .map(|s| (*s, s.label().to_string()))
            .collect();
          self.status_picker.show("Status", choices, Some(&self.status));
          return ViewAction::None;
        }
        KeyCode::Char('p') => {
          let choices = Priority::ALL
            .iter()
            .map(|p| (*p, p.label().to_string()))
            .collect();
          self
            .priority_picker
            .show("Priority", choices, Some(&self.priority));
          return ViewAction::None;
        }
        _ => {}
      }
    }

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

    if query.state().is_success() {
      self.pending = None;
      // Parent refetches on resume
      return ViewAction::Pop;
    }

    if let Some(error) = query.error() {
      self.form.set_error(Some(error.to_string()));
    }
    self.pending = None;
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 58.min(area.width.saturating_sub(2)).max(24);
    let height = (self.form.height() + 6).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 4;
    let box_area = Rect::new(x, y, width, height);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(box_area);
    frame.render_widget(block, box_area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(self.form.height()),
        Constraint::Length(1),
        Constraint::Min(1),
      ])
      .split(inner);

    self.form.render(frame, chunks[0]);

    let choices_line = Line::from(vec![
      Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        self.status.label(),
        Style::default().fg(status_color(self.status)),
      ),
      Span::styled("  Priority: ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        self.priority.label(),
        Style::default().fg(priority_color(self.priority)),
      ),
    ]);
    frame.render_widget(Paragraph::new(choices_line), chunks[1]);

    let footer = if self.pending.is_some() {
      Line::from(Span::styled("Saving...", Style::default().fg(Color::Yellow)))
    } else {
      Line::from(vec![
        Span::styled("Enter", Style::default().fg(Color::Cyan)),
        Span::styled(" save  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Ctrl-S", Style::default().fg(Color::Cyan)),
        Span::styled(" status  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Ctrl-P", Style::default().fg(Color::Cyan)),
        Span::styled(" priority  ", Style::default().fg(Color::DarkGray)),
        Span::styled("Esc", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ])
    };
    frame.render_widget(Paragraph::new(footer), chunks[2]);

    self.status_picker.render_overlay(frame, box_area);
    self.priority_picker.render_overlay(frame, box_area);
  }

  fn breadcrumb_label(&self) -> String {
    match self.mode {
      FormMode::Create => "New".to_string(),
      FormMode::Edit { .. } => "Edit".to_string(),
    }
  }

  fn status_hint(&self) -> &'static str {
    " Enter:save  Ctrl-S:status  Ctrl-P:priority  Esc:cancel"
  }
}
