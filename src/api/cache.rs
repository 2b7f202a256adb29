//! Caching implementations for API types.

use sha2::{Digest, Sha256};

use crate::cache::{Cacheable, QueryKey};

use super::client::ProjectListQuery;
use super::types::Project;

impl Cacheable for Project {
  fn cache_key(&self) -> String {
    self.id.clone()
  }

  fn entity_type() -> &'static str {
    "project"
  }
}

/// Query key types for the project endpoints.
#[derive(Clone, Debug)]
pub enum ProjectQueryKey {
  /// Project list with server-side filters
  List(ProjectListQuery),
  /// Single project by id
  Detail { id: String },
}

impl QueryKey for ProjectQueryKey {
  fn cache_hash(&self) -> String {
    let input = match self {
      Self::List(query) => {
        let params: Vec<String> = query
          .to_params()
          .into_iter()
          .map(|(name, value)| format!("{}={}", name, normalize(&value)))
          .collect();
        format!("project_list:{}", params.join("&"))
      }
      Self::Detail { id } => format!("project_detail:{}", id),
    };

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    match self {
      Self::List(query) => {
        let params = query.to_params();
        if params.is_empty() {
          "all projects".to_string()
        } else {
          let parts: Vec<String> = params
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
          format!("projects where {}", parts.join(", "))
        }
      }
      Self::Detail { id } => format!("project {}", id),
    }
  }
}

/// Normalize free-text parameters for consistent hashing.
fn normalize(value: &str) -> String {
  value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::types::ProjectStatus;

  #[test]
  fn test_hash_is_stable_and_case_insensitive() {
    let a = ProjectQueryKey::List(ProjectListQuery {
      search: Some("Mobile".to_string()),
      ..Default::default()
    });
    let b = ProjectQueryKey::List(ProjectListQuery {
      search: Some("  mobile ".to_string()),
      ..Default::default()
    });
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_different_filters_hash_differently() {
    let all = ProjectQueryKey::List(ProjectListQuery::default());
    let active = ProjectQueryKey::List(ProjectListQuery {
      status: Some(ProjectStatus::Active),
      ..Default::default()
    });
    assert_ne!(all.cache_hash(), active.cache_hash());
  }

  #[test]
  fn test_descriptions() {
    let all = ProjectQueryKey::List(ProjectListQuery::default());
    assert_eq!(all.description(), "all projects");

    let detail = ProjectQueryKey::Detail { id: "abc".to_string() };
    assert_eq!(detail.description(), "project abc");
  }
}
