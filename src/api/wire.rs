//! Request/response payloads for the backend REST API.
//!
//! The backend is a DRF-style JSON API: auth endpoints under `auth/`, the
//! project CRUD under `projects/` with a paginated list envelope.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Priority, Project, ProjectStatus, User};

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LoginRequest {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenPairResponse {
  pub access: String,
  pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct TokenRefreshRequest {
  pub refresh: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRefreshResponse {
  pub access: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
  pub first_name: String,
  pub last_name: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct OtpVerifyRequest {
  pub email: String,
  pub otp_code: String,
}

#[derive(Debug, Serialize)]
pub struct ResendOtpRequest {
  pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetRequest {
  pub email: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetConfirmRequest {
  pub email: String,
  pub otp_code: String,
  pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct MessageResponse {
  pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
  pub id: String,
  pub first_name: String,
  pub last_name: String,
  pub email: String,
}

impl From<ApiUser> for User {
  fn from(user: ApiUser) -> Self {
    User {
      id: user.id,
      first_name: user.first_name,
      last_name: user.last_name,
      email: user.email,
    }
  }
}

// ============================================================================
// Projects
// ============================================================================

/// DRF pagination envelope.
#[derive(Debug, Deserialize)]
pub struct Paginated<T> {
  pub count: u64,
  pub next: Option<String>,
  pub previous: Option<String>,
  pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiProject {
  pub uuid: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
  pub status: ProjectStatus,
  pub priority: Priority,
  pub start_date: Option<NaiveDate>,
  pub due_date: Option<NaiveDate>,
  pub owner_email: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<ApiProject> for Project {
  fn from(p: ApiProject) -> Self {
    Project {
      id: p.uuid,
      name: p.name,
      // Blank on the wire means no description
      description: if p.description.is_empty() {
        None
      } else {
        Some(p.description)
      },
      status: p.status,
      priority: p.priority,
      start_date: p.start_date,
      due_date: p.due_date,
      owner_email: p.owner_email,
      created_at: p.created_at,
      updated_at: p.updated_at,
    }
  }
}

/// Payload for creating a project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectPayload {
  pub name: String,
  pub description: String,
  pub status: ProjectStatus,
  pub priority: Priority,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<NaiveDate>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<NaiveDate>,
}

/// Partial payload for PATCH updates; absent fields are left untouched
/// server-side. Nullable fields use a double Option so "set to null" and
/// "leave alone" stay distinguishable.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectPatchPayload {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status: Option<ProjectStatus>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub priority: Option<Priority>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_date: Option<Option<NaiveDate>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub due_date: Option<Option<NaiveDate>>,
}

// ============================================================================
// Errors
// ============================================================================

/// Pull a usable message out of a DRF error body.
///
/// DRF reports either `{"detail": "..."}` or a field-to-messages map like
/// `{"email": ["Enter a valid email address."]}`.
pub fn error_detail(body: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  let map = value.as_object()?;

  if let Some(detail) = map.get("detail").and_then(|d| d.as_str()) {
    return Some(detail.to_string());
  }

  let mut parts = Vec::new();
  for (field, messages) in map {
    match messages {
      serde_json::Value::Array(list) => {
        for message in list.iter().filter_map(|m| m.as_str()) {
          parts.push(format!("{}: {}", field, message));
        }
      }
      serde_json::Value::String(message) => parts.push(format!("{}: {}", field, message)),
      _ => {}
    }
  }

  if parts.is_empty() {
    None
  } else {
    Some(parts.join("; "))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_api_project_into_domain() {
    let json = r#"{
      "uuid": "3f6c1e2a-0000-0000-0000-000000000001",
      "name": "Backend API",
      "description": "",
      "owner": "u1",
      "owner_email": "owner@example.com",
      "status": "active",
      "priority": 2,
      "start_date": "2025-05-01",
      "due_date": null,
      "is_overdue": false,
      "created_at": "2025-05-01T09:00:00Z",
      "updated_at": "2025-05-02T09:00:00Z"
    }"#;

    let api: ApiProject = serde_json::from_str(json).unwrap();
    let project: Project = api.into();

    assert_eq!(project.id, "3f6c1e2a-0000-0000-0000-000000000001");
    assert_eq!(project.description, None);
    assert_eq!(project.status, ProjectStatus::Active);
    assert_eq!(project.priority, Priority::Medium);
    assert_eq!(project.start_date.unwrap().to_string(), "2025-05-01");
    assert!(project.due_date.is_none());
  }

  #[test]
  fn test_paginated_envelope() {
    let json = r#"{"count": 1, "next": null, "previous": null, "results": [{"id": "u1",
      "first_name": "Ada", "last_name": "Lovelace", "email": "ada@example.com"}]}"#;
    let page: Paginated<ApiUser> = serde_json::from_str(json).unwrap();
    assert_eq!(page.count, 1);
    assert!(page.next.is_none());
    assert_eq!(page.results[0].email, "ada@example.com");
  }

  #[test]
  fn test_patch_payload_skips_absent_fields() {
    let patch = ProjectPatchPayload {
      status: Some(ProjectStatus::Completed),
      ..Default::default()
    };
    let json = serde_json::to_string(&patch).unwrap();
    assert_eq!(json, r#"{"status":"completed"}"#);
  }

  #[test]
  fn test_patch_payload_clears_nullable_date() {
    let patch = ProjectPatchPayload {
      due_date: Some(None),
      ..Default::default()
    };
    let json = serde_json::to_string(&patch).unwrap();
    assert_eq!(json, r#"{"due_date":null}"#);
  }

  #[test]
  fn test_error_detail_variants() {
    assert_eq!(
      error_detail(r#"{"detail": "Not found."}"#),
      Some("Not found.".to_string())
    );
    assert_eq!(
      error_detail(r#"{"email": ["Enter a valid email address."]}"#),
      Some("email: Enter a valid email address.".to_string())
    );
    assert_eq!(error_detail("not json"), None);
    assert_eq!(error_detail("{}"), None);
  }
}
