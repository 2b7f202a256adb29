//! Local project store with a derived, filtered view.
//!
//! The store owns the in-memory collection; every mutation recomputes the
//! filtered view synchronously, so readers never observe a half-applied
//! filter. All operations are total: unknown identifiers are ignored.

use chrono::{DateTime, NaiveDate, Utc};

use crate::api::types::{Priority, Project, ProjectStatus};

/// Sort key for the derived view. Absent means store order (newest first,
/// since `add` prepends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
  /// Newest first
  CreatedAt,
  /// Soonest due first; projects without a due date sort last
  DueDate,
  /// Highest priority first
  Priority,
}

impl SortKey {
  pub fn label(&self) -> &'static str {
    match self {
      SortKey::CreatedAt => "created",
      SortKey::DueDate => "due",
      SortKey::Priority => "priority",
    }
  }
}

/// Filter criteria. Absence of a field means unfiltered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectFilter {
  pub status: Option<ProjectStatus>,
  pub priority: Option<Priority>,
  pub search: String,
  pub sort: Option<SortKey>,
}

impl ProjectFilter {
  /// All predicates are conjunctive: a record passes only if every active
  /// predicate matches. Search is case-insensitive over name and description.
  pub fn matches(&self, project: &Project) -> bool {
    if let Some(status) = self.status {
      if project.status != status {
        return false;
      }
    }
    if let Some(priority) = self.priority {
      if project.priority != priority {
        return false;
      }
    }
    if !self.search.is_empty() {
      let needle = self.search.to_lowercase();
      let in_name = project.name.to_lowercase().contains(&needle);
      let in_description = project
        .description
        .as_deref()
        .map(|d| d.to_lowercase().contains(&needle))
        .unwrap_or(false);
      if !in_name && !in_description {
        return false;
      }
    }
    true
  }

  pub fn is_active(&self) -> bool {
    self.status.is_some() || self.priority.is_some() || !self.search.is_empty()
  }
}

/// Partial filter update; unset fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct FilterPatch {
  pub status: Option<Option<ProjectStatus>>,
  pub priority: Option<Option<Priority>>,
  pub search: Option<String>,
  pub sort: Option<Option<SortKey>>,
}

impl FilterPatch {
  pub fn status(value: Option<ProjectStatus>) -> Self {
    Self {
      status: Some(value),
      ..Default::default()
    }
  }

  pub fn priority(value: Option<Priority>) -> Self {
    Self {
      priority: Some(value),
      ..Default::default()
    }
  }

  pub fn search(value: impl Into<String>) -> Self {
    Self {
      search: Some(value.into()),
      ..Default::default()
    }
  }

  pub fn sort(value: Option<SortKey>) -> Self {
    Self {
      sort: Some(value),
      ..Default::default()
    }
  }
}

/// Partial record update for [`ProjectStore::update`]. Nullable fields use a
/// double Option so clearing and leaving-alone stay distinguishable.
#[derive(Debug, Clone, Default)]
pub struct ProjectPatch {
  pub name: Option<String>,
  pub description: Option<Option<String>>,
  pub status: Option<ProjectStatus>,
  pub priority: Option<Priority>,
  pub start_date: Option<Option<NaiveDate>>,
  pub due_date: Option<Option<NaiveDate>>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Project> for ProjectPatch {
  /// A patch carrying every field of the given project, used to sync a
  /// server response into the store.
  fn from(project: &Project) -> Self {
    Self {
      name: Some(project.name.clone()),
      description: Some(project.description.clone()),
      status: Some(project.status),
      priority: Some(project.priority),
      start_date: Some(project.start_date),
      due_date: Some(project.due_date),
      updated_at: Some(project.updated_at),
    }
  }
}

/// The local store: collection plus filter plus derived view.
#[derive(Debug, Default)]
pub struct ProjectStore {
  projects: Vec<Project>,
  filter: ProjectFilter,
  filtered: Vec<Project>,
}

impl ProjectStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// The full collection, in store order.
  pub fn projects(&self) -> &[Project] {
    &self.projects
  }

  /// The derived view: records passing the filter, in filter-sorted order.
  pub fn filtered(&self) -> &[Project] {
    &self.filtered
  }

  pub fn filter(&self) -> &ProjectFilter {
    &self.filter
  }

  pub fn get(&self, id: &str) -> Option<&Project> {
    self.projects.iter().find(|p| p.id == id)
  }

  /// Replace the entire collection.
  pub fn set_all(&mut self, projects: Vec<Project>) {
    self.projects = projects;
    self.recompute();
  }

  /// Prepend one record (newest-first ordering).
  pub fn add(&mut self, project: Project) {
    self.projects.insert(0, project);
    self.recompute();
  }

  /// Merge fields into the record matching `id`; no-op if absent.
  pub fn update(&mut self, id: &str, patch: ProjectPatch) {
    let Some(project) = self.projects.iter_mut().find(|p| p.id == id) else {
      return;
    };

    if let Some(name) = patch.name {
      project.name = name;
    }
    if let Some(description) = patch.description {
      project.description = description;
    }
    if let Some(status) = patch.status {
      project.status = status;
    }
    if let Some(priority) = patch.priority {
      project.priority = priority;
    }
    if let Some(start_date) = patch.start_date {
      project.start_date = start_date;
    }
    if let Some(due_date) = patch.due_date {
      project.due_date = due_date;
    }
    if let Some(updated_at) = patch.updated_at {
      project.updated_at = updated_at;
    }

    self.recompute();
  }

  /// Delete the record matching `id`; no-op if absent.
  pub fn remove(&mut self, id: &str) {
    self.projects.retain(|p| p.id != id);
    self.recompute();
  }

  /// Merge filter fields.
  pub fn set_filter(&mut self, patch: FilterPatch) {
    if let Some(status) = patch.status {
      self.filter.status = status;
    }
    if let Some(priority) = patch.priority {
      self.filter.priority = priority;
    }
    if let Some(search) = patch.search {
      self.filter.search = search;
    }
    if let Some(sort) = patch.sort {
      self.filter.sort = sort;
    }
    self.recompute();
  }

  /// Reset the filter to the unfiltered default.
  pub fn clear_filter(&mut self) {
    self.filter = ProjectFilter::default();
    self.recompute();
  }

  fn recompute(&mut self) {
    self.filtered = self
      .projects
      .iter()
      .filter(|p| self.filter.matches(p))
      .cloned()
      .collect();

    if let Some(sort) = self.filter.sort {
      // Stable sort: records comparing equal keep store order
      match sort {
        SortKey::CreatedAt => self
          .filtered
          .sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::DueDate => self.filtered.sort_by(|a, b| match (a.due_date, b.due_date) {
          (Some(x), Some(y)) => x.cmp(&y),
          (Some(_), None) => std::cmp::Ordering::Less,
          (None, Some(_)) => std::cmp::Ordering::Greater,
          (None, None) => std::cmp::Ordering::Equal,
        }),
        SortKey::Priority => self.filtered.sort_by(|a, b| b.priority.cmp(&a.priority)),
      }
    }
  }
}
