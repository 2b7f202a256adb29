//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be cached.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Unique identifier for this entity within its type (e.g. the project uuid)
  fn cache_key(&self) -> String;

  /// Entity type name for storage organization and bulk invalidation
  fn entity_type() -> &'static str;
}

/// A request identity that maps to one cache slot.
pub trait QueryKey {
  /// Stable, fixed-length key for cache lookup
  fn cache_hash(&self) -> String;

  /// Human-readable description, kept alongside the snapshot for debugging
  fn description(&self) -> String;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
  /// When the data was cached (None for fresh network data)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
    }
  }

  /// Cached data served because the network is unavailable or the fetch failed.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Cached data served without a network round trip (offline or fetch failed)
  Offline,
}
