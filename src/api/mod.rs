//! Typed client for the backend REST API: auth flows, project CRUD, and the
//! caching wrapper used by the UI.

mod cache;
pub mod client;
mod cached_client;
pub mod types;
pub mod wire;

pub use cached_client::CachedApiClient;
pub use client::{ApiClient, ProjectListQuery};
