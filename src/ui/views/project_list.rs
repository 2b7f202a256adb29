use crate::api::types::{Priority, Project, ProjectStatus};
use crate::api::{CachedApiClient, ProjectListQuery};
use crate::cache::{CacheResult, CacheSource};
use crate::query::Query;
use crate::store::{FilterPatch, ProjectStore, SortKey};
use crate::ui::components::{KeyResult, Picker, PickerEvent, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{format_date, priority_color, status_color, truncate};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{ProjectDetailView, ProjectFormView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

/// The project list: collection in a local store, filters applied locally,
/// data loaded through the cache so it keeps working offline.
pub struct ProjectListView {
  api: CachedApiClient,
  store: ProjectStore,
  query: Query<CacheResult<Vec<Project>>>,
  source: Option<CacheSource>,
  list_state: ListState,
  search: SearchInput,
  status_picker: Picker<ProjectStatus>,
  priority_picker: Picker<Priority>,
  /// Project id awaiting delete confirmation
  confirm_delete: Option<String>,
  pending_delete: Option<Query<String>>,
  error: Option<String>,
}

impl ProjectListView {
  pub fn new(api: CachedApiClient) -> Self {
    let api_for_query = api.clone();
    let mut query = Query::new(move || {
      let api = api_for_query.clone();
      async move {
        api
          .list_projects(&ProjectListQuery::default())
          .await
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();

    Self {
      api,
      store: ProjectStore::new(),
      query,
      source: None,
      list_state: ListState::default(),
      search: SearchInput::new(),
      status_picker: Picker::new(),
      priority_picker: Picker::new(),
      confirm_delete: None,
      pending_delete: None,
      error: None,
    }
  }

  fn selected_project(&self) -> Option<&Project> {
    self
      .list_state
      .selected()
      .and_then(|i| self.store.filtered().get(i))
  }

  fn cycle_sort(&mut self) {
    let next = match self.store.filter().sort {
      None => Some(SortKey::CreatedAt),
      Some(SortKey::CreatedAt) => Some(SortKey::DueDate),
      Some(SortKey::DueDate) => Some(SortKey::Priority),
      Some(SortKey::Priority) => None,
    };
    self.store.set_filter(FilterPatch::sort(next));
  }

  fn start_delete(&mut self, id: String) {
    let api = self.api.clone();
    let mut query = Query::new(move || {
      let api = api.clone();
      let id = id.clone();
      async move {
        api
          .delete_project(&id)
          .await
          .map(|_| id.clone())
          .map_err(|e| e.to_string())
      }
    });
    query.fetch();
    self.pending_delete = Some(query);
  }

  fn title(&self) -> String {
    let filter = self.store.filter();
    let mut parts = Vec::new();
    if let Some(status) = filter.status {
      parts.push(format!("status={}", status.label()));
    }
    if let Some(priority) = filter.priority {
      parts.push(format!("priority={}", priority.label()));
    }
    if !filter.search.is_empty() {
      parts.push(format!("search={}", filter.search));
    }
    if let Some(sort) = filter.sort {
      parts.push(format!("sort={}", sort.label()));
    }

    let filters = if parts.is_empty() {
      String::new()
    } else {
      format!(" [{}]", parts.join(" "))
    };

    let badge = match self.source {
      Some(CacheSource::Offline) => " (offline)",
      Some(CacheSource::CacheFresh) => " (cached)",
      _ => "",
    };

    if self.query.is_loading() {
      format!(" Projects{} (loading...) ", filters)
    } else if let Some(error) = self.query.error() {
      format!(" Projects{} (error: {}) ", filters, truncate(error, 40))
    } else {
      format!(
        " Projects{} ({}/{}){} ",
        filters,
        self.store.filtered().len(),
        self.store.projects().len(),
        badge
      )
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.store.filtered().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load projects. Press 'r' to retry."
      } else if self.store.filter().is_active() {
        "No projects match the current filters. Press 'c' to clear them."
      } else {
        "No projects yet. Press 'n' to create one."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let today = chrono::Utc::now().date_naive();
    let items: Vec<ListItem> = self
      .store
      .filtered()
      .iter()
      .map(|project| {
        let overdue = project.is_overdue_on(today);
        let due = if overdue {
          Span::styled(
            format!("{:<11}", format_date(project.due_date)),
            Style::default().fg(Color::Red).bold(),
          )
        } else {
          Span::styled(
            format!("{:<11}", format_date(project.due_date)),
            Style::default().fg(Color::DarkGray),
          )
        };

        let line = Line::from(vec![
          Span::styled(
            format!("{:<10}", project.status.label()),
            Style::default().fg(status_color(project.status)),
          ),
          Span::styled(
            format!("{:<9}", project.priority.label()),
            Style::default().fg(priority_color(project.priority)),
          ),
          due,
          Span::raw(" "),
          Span::raw(truncate(&project.name, 50)),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn render_confirm_delete(&self, frame: &mut Frame, area: Rect) {
    let Some(id) = &self.confirm_delete else {
      return;
    };
    let name = self
      .store
      .get(id)
      .map(|p| p.name.clone())
      .unwrap_or_else(|| id.clone());

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
      Line::from(Span::raw(format!("Delete \"{}\"?", truncate(&name, 32)))),
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

impl View for ProjectListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    // Delete confirmation swallows everything until answered
    if let Some(id) = self.confirm_delete.clone() {
      match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
          self.confirm_delete = None;
          self.start_delete(id);
        }
        KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
          self.confirm_delete = None;
        }
        _ => {}
      }
      return ViewAction::None;
    }

    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(text)) => {
        self.store.set_filter(FilterPatch::search(text));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) => return ViewAction::None,
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.status_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(status)) => {
        self.store.set_filter(FilterPatch::status(status));
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.priority_picker.handle_key(key) {
      KeyResult::Event(PickerEvent::Selected(priority)) => {
        self.store.set_filter(FilterPatch::priority(priority));
        return ViewAction::None;
      }
      KeyResult::Event(PickerEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('r') => {
        self.api.refresh_projects();
        self.query.refetch();
      }
      KeyCode::Char('s') => {
        let choices = ProjectStatus::ALL
          .iter()
          .map(|s| (*s, s.label().to_string()))
          .collect();
        self
          .status_picker
          .show("Status", choices, self.store.filter().status.as_ref());
      }
      KeyCode::Char('p') => {
        let choices = Priority::ALL
          .iter()
          .map(|p| (*p, p.label().to_string()))
          .collect();
        self
          .priority_picker
          .show("Priority", choices, self.store.filter().priority.as_ref());
      }
      KeyCode::Char('o') => self.cycle_sort(),
      KeyCode::Char('c') => self.store.clear_filter(),
      KeyCode::Char('n') => {
        return ViewAction::Push(Box::new(ProjectFormView::create(self.api.clone())));
      }
      KeyCode::Char('e') => {
        if let Some(project) = self.selected_project() {
          return ViewAction::Push(Box::new(ProjectFormView::edit(
            self.api.clone(),
            project.clone(),
          )));
        }
      }
      KeyCode::Char('d') => {
        if let Some(project) = self.selected_project() {
          self.confirm_delete = Some(project.id.clone());
        }
      }
      KeyCode::Enter => {
        if let Some(project) = self.selected_project() {
          return ViewAction::Push(Box::new(ProjectDetailView::new(
            self.api.clone(),
            project.id.clone(),
            project.name.clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn tick(&mut self) -> ViewAction {
    // Background refresh once the data goes stale
    self.query.ensure_fresh();

    if self.query.poll() {
      if let Some(result) = self.query.data() {
        self.source = Some(result.source);
        let projects = result.data.clone();
        self.store.set_all(projects);
      }
    }

    if let Some(query) = self.pending_delete.as_mut() {
      if query.poll() {
        match (query.data(), query.error()) {
          (Some(id), _) => {
            let id = id.clone();
            self.store.remove(&id);
            self.error = None;
            // The cache slot was invalidated by the delete
            self.query.refetch();
          }
          (_, Some(error)) => self.error = Some(format!("Delete failed: {}", error)),
          _ => {}
        }
        self.pending_delete = None;
      }
    }

    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(area);

    self.render_list(frame, chunks[0]);

    if let Some(error) = &self.error {
      let line = Paragraph::new(error.clone()).style(Style::default().fg(Color::Red));
      frame.render_widget(line, chunks[1]);
    }

    self.search.render_overlay(frame, chunks[0]);
    self.status_picker.render_overlay(frame, chunks[0]);
    self.priority_picker.render_overlay(frame, chunks[0]);
    self.render_confirm_delete(frame, chunks[0]);
  }

  fn breadcrumb_label(&self) -> String {
    "Projects".to_string()
  }

  fn on_resume(&mut self) {
    // A form or detail view below may have written; its invalidation makes
    // this refetch hit the network
    self.query.refetch();
  }

  fn status_hint(&self) -> &'static str {
    " /:search  s:status  p:priority  o:sort  c:clear  n:new  e:edit  d:delete  r:refresh"
  }
}
