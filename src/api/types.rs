use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Project lifecycle status (closed set, matches the backend choices)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectStatus {
  Draft,
  Active,
  Completed,
  Archived,
}

impl ProjectStatus {
  pub const ALL: [ProjectStatus; 4] = [
    ProjectStatus::Draft,
    ProjectStatus::Active,
    ProjectStatus::Completed,
    ProjectStatus::Archived,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      ProjectStatus::Draft => "Draft",
      ProjectStatus::Active => "Active",
      ProjectStatus::Completed => "Completed",
      ProjectStatus::Archived => "Archived",
    }
  }

  /// Wire value used in query params and payloads
  pub fn as_param(&self) -> &'static str {
    match self {
      ProjectStatus::Draft => "draft",
      ProjectStatus::Active => "active",
      ProjectStatus::Completed => "completed",
      ProjectStatus::Archived => "archived",
    }
  }
}

/// Project priority, ranked numerically on the wire (1 = low, 4 = critical)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
  Low,
  Medium,
  High,
  Critical,
}

impl Priority {
  pub const ALL: [Priority; 4] = [
    Priority::Low,
    Priority::Medium,
    Priority::High,
    Priority::Critical,
  ];

  pub fn label(&self) -> &'static str {
    match self {
      Priority::Low => "Low",
      Priority::Medium => "Medium",
      Priority::High => "High",
      Priority::Critical => "Critical",
    }
  }

  pub fn rank(&self) -> u8 {
    match self {
      Priority::Low => 1,
      Priority::Medium => 2,
      Priority::High => 3,
      Priority::Critical => 4,
    }
  }
}

impl From<Priority> for u8 {
  fn from(priority: Priority) -> u8 {
    priority.rank()
  }
}

impl TryFrom<u8> for Priority {
  type Error = String;

  fn try_from(rank: u8) -> Result<Self, Self::Error> {
    match rank {
      1 => Ok(Priority::Low),
      2 => Ok(Priority::Medium),
      3 => Ok(Priority::High),
      4 => Ok(Priority::Critical),
      other => Err(format!("invalid priority rank: {}", other)),
    }
  }
}

/// A project as held by the local store and cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
  /// Server-assigned opaque identifier (a UUID string)
  pub id: String,
  pub name: String,
  pub description: Option<String>,
  pub status: ProjectStatus,
  pub priority: Priority,
  pub start_date: Option<NaiveDate>,
  pub due_date: Option<NaiveDate>,
  pub owner_email: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Project {
  /// Overdue means the due date has passed and the project isn't completed.
  pub fn is_overdue(&self) -> bool {
    self.is_overdue_on(Utc::now().date_naive())
  }

  pub fn is_overdue_on(&self, today: NaiveDate) -> bool {
    match self.due_date {
      Some(due) => due < today && self.status != ProjectStatus::Completed,
      None => false,
    }
  }
}

/// The authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id: String,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
}

impl User {
  pub fn full_name(&self) -> String {
    format!("{} {}", self.first_name, self.last_name)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_project(id: &str) -> Project {
    Project {
      id: id.to_string(),
      name: "Mobile App".to_string(),
      description: Some("Cross-platform client".to_string()),
      status: ProjectStatus::Active,
      priority: Priority::High,
      start_date: None,
      due_date: None,
      owner_email: Some("owner@example.com".to_string()),
      created_at: "2025-06-01T12:00:00Z".parse().unwrap(),
      updated_at: "2025-06-02T12:00:00Z".parse().unwrap(),
    }
  }

  #[test]
  fn test_priority_wire_roundtrip() {
    let json = serde_json::to_string(&Priority::Critical).unwrap();
    assert_eq!(json, "4");
    let back: Priority = serde_json::from_str("2").unwrap();
    assert_eq!(back, Priority::Medium);
    assert!(serde_json::from_str::<Priority>("9").is_err());
  }

  #[test]
  fn test_status_wire_values() {
    assert_eq!(serde_json::to_string(&ProjectStatus::Draft).unwrap(), "\"draft\"");
    let back: ProjectStatus = serde_json::from_str("\"archived\"").unwrap();
    assert_eq!(back, ProjectStatus::Archived);
  }

  #[test]
  fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::Medium > Priority::Low);
  }

  #[test]
  fn test_overdue() {
    let today = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
    let mut project = sample_project("p1");

    // No due date: never overdue
    assert!(!project.is_overdue_on(today));

    project.due_date = NaiveDate::from_ymd_opt(2025, 6, 10);
    assert!(project.is_overdue_on(today));

    // Due today is not overdue yet
    project.due_date = Some(today);
    assert!(!project.is_overdue_on(today));

    // Completed projects are never overdue
    project.due_date = NaiveDate::from_ymd_opt(2025, 6, 10);
    project.status = ProjectStatus::Completed;
    assert!(!project.is_overdue_on(today));
  }
}
