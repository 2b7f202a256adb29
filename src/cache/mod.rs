//! Generic caching layer for data persistence and offline support.
//!
//! - Holds query results in memory, keyed by request identity
//! - Serves cached data while fresh (5 minutes), refetches when stale
//! - Falls back to stale cache when offline or when the network fails
//! - Mirrors itself to durable storage with a throttled background writer
//! - Evicts anything older than the 24 hour retention window

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, Cacheable, QueryKey};
