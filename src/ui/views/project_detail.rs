use crate::api::types::Project;
use crate::api::CachedApiClient;
use crate::cache::{CacheResult, CacheSource};
use crate::query::Query;
use crate::ui::renderfns::{format_date, priority_color, status_color};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::ProjectFormView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Read-only view of a single project.
pub struct ProjectDetailView {
  api: CachedApiClient,
  id: String,
  name: String,
  query: Query<CacheResult<Project>>,
  confirm_delete: bool,
  pending_delete: Option<Query<()>>,
  error: Option<String>,
}

impl ProjectDetailView {
  pub fn new(api: CachedApiClient, id: String, name: String) -> Self {
    let api_for_query = api.clone();
    let id_for_query = id.clone();
    let mut query = Query::new(move || {
      let api = api_for_query.clone();
      let id = id_for_query.clone();
      async move { api.get_project(&id).await.map_err(|e| e.to_string()) }
    });
    query.fetch();

    Self {
      api,
      id,
      name,
      query,
      confirm_delete: false,
      pending_delete: None,
      error: None,
    }
  }

  fn start_delete(&mut self) {
    let api = self.api.clone();
    let id = self.id.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      let id = id.clone();
      async move { api.delete_project(&id).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.pending_delete = Some(query);
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let badge = match self.query.data().map(|r| r.source) {
      Some(CacheSource::Offline) => " (offline)",
      Some(CacheSource::CacheFresh) => " (cached)",
      _ => "",
    };
    let title = if self.query.is_loading() {
      format!(" {} (loading...) ", self.name)
    } else {
      format!(" {}{} ", self.name, badge)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.is_loading() {
      let paragraph =
        Paragraph::new("Loading project...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    }

    if let Some(error) = self.query.error() {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(result) = self.query.data() else {
      return;
    };
    let project = &result.data;

    let mut due_spans = vec![
      Span::styled("Due: ", Style::default().fg(Color::DarkGray)),
      Span::raw(format_date(project.due_date)),
    ];
    if project.is_overdue() {
      due_spans.push(Span::styled(
        "  OVERDUE",
        Style::default().fg(Color::Red).bold(),
      ));
    }

    let mut lines = vec![
      Line::from(vec![
        Span::styled("Name: ", Style::default().fg(Color::DarkGray)),
        Span::raw(project.name.clone()),
      ]),
      Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          project.status.label(),
          Style::default().fg(status_color(project.status)),
        ),
        Span::raw("  "),
        Span::styled("Priority: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          project.priority.label(),
          Style::default().fg(priority_color(project.priority)),
        ),
      ]),
      Line::from(vec![
        Span::styled("Start: ", Style::default().fg(Color::DarkGray)),
        Span::raw(format_date(project.start_date)),
      ]),
      Line::from(due_spans),
    ];

    if let Some(owner) = &project.owner_email {
      lines.push(Line::from(vec![
        Span::styled("Owner: ", Style::default().fg(Color::DarkGray)),
        Span::raw(owner.clone()),
      ]));
    }
    lines.push(Line::from(vec![
      Span::styled("Created: ", Style::default().fg(Color::DarkGray)),
      Span::raw(project.created_at.format("%Y-%m-%d %H:%M").to_string()),
      Span::raw("  "),
      Span::styled("Updated: ", Style::default().fg(Color::DarkGray)),
      Span::raw(project.updated_at.format("%Y-%m-%d %H:%M").to_string()),
    ]));

    lines.push(Line::raw(""));
    lines.push(Line::from(Span::raw(
      project
        .description
        .clone()
        .unwrap_or_else(|| "No description".to_string()),
    )));

    if let Some(error) = &self.error {
      lines.push(Line::raw(""));
      lines.push(Line::from(Span::styled(
        error.clone(),
        Style::default().fg(Color::Red),
      )));
    }

    let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
  }

  fn render_confirm_delete(&self, frame: &mut Frame, area: Rect) {
    if !self.confirm_delete {
      return;
    }

    let width = 44.min(area.width.saturating_sub(2)).max(20);
    let height = 4;
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay = Rect::new(x, y, width, height.min(area.height));

    frame.render_widget(Clear, overlay);
    let block = Block::default()
      .title(" Delete project ")
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red));
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let lines = vec![
      Line::from(Span::raw("Delete this project?")),
      Line::from(vec![
        Span::styled("y", Style::default().fg(Color::Red).bold()),
        Span::styled(" delete   ", Style::default().fg(Color::DarkGray)),
        Span::styled("n", Style::default().fg(Color::Cyan)),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }
}

impl View for ProjectDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.confirm_delete {
      match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
          self.confirm_delete = false;
          self.start_delete();
        }
        KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
          self.confirm_delete = false;
        }
        _ => {}
      }
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('e') => {
        if let Some(result) = self.query.data() {
          return ViewAction::Push(Box::new(ProjectFormView::edit(
            self.api.clone(),
            result.data.clone(),
          )));
        }
      }
      KeyCode::Char('d') => self.confirm_delete = true,
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    // Background refresh once the data goes stale
    self.query.ensure_fresh();
    self.query.poll();

    if let Some(query) = self.pending_delete.as_mut() {
      if query.poll() {
        let failed = query.error().map(String::from);
        self.pending_delete = None;
        match failed {
          None => return ViewAction::Pop,
          Some(error) => self.error = Some(format!("Delete failed: {}", error)),
        }
      }
    }

    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
    self.render_confirm_delete(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.name.clone()
  }

  fn on_resume(&mut self) {
    // Refetch after a potential edit below
    self.query.refetch();
  }

  fn status_hint(&self) -> &'static str {
    " e:edit  d:delete  r:refresh  q:back"
  }
}
