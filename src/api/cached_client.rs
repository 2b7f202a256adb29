//! API client with transparent caching for project reads.

use color_eyre::Result;

use crate::cache::{CacheLayer, CacheResult, Cacheable};

use super::cache::ProjectQueryKey;
use super::client::{ApiClient, ProjectListQuery};
use super::types::{Project, User};
use super::wire::{ProjectPatchPayload, ProjectPayload, RegisterRequest};

/// Wraps [`ApiClient`] with the cache layer: list/detail reads go through the
/// cache (and keep working offline), writes invalidate the cached project
/// slots so the next read refetches.
///
/// Auth endpoints pass straight through - tokens and OTP codes must never be
/// served from cache.
#[derive(Clone)]
pub struct CachedApiClient {
  inner: ApiClient,
  cache: CacheLayer,
}

impl CachedApiClient {
  pub fn new(inner: ApiClient, cache: CacheLayer) -> Self {
    Self { inner, cache }
  }

  pub fn is_online(&self) -> bool {
    self.inner.is_online()
  }

  /// The result carries where the data came from, so the caller can flag
  /// cached or offline data in the UI.
  pub async fn list_projects(&self, query: &ProjectListQuery) -> Result<CacheResult<Vec<Project>>> {
    let key = ProjectQueryKey::List(query.clone());
    self
      .cache
      .fetch_list(&key, || {
        let inner = self.inner.clone();
        let query = query.clone();
        async move { inner.list_projects(&query).await }
      })
      .await
  }

  pub async fn get_project(&self, id: &str) -> Result<CacheResult<Project>> {
    let key = ProjectQueryKey::Detail { id: id.to_string() };
    self
      .cache
      .fetch_one(&key, || {
        let inner = self.inner.clone();
        let id = id.to_string();
        async move { inner.get_project(&id).await }
      })
      .await
  }

  pub async fn create_project(&self, payload: &ProjectPayload) -> Result<Project> {
    let project = self.inner.create_project(payload).await?;
    self.cache.invalidate_type(Project::entity_type());
    Ok(project)
  }

  pub async fn update_project(&self, id: &str, patch: &ProjectPatchPayload) -> Result<Project> {
    let project = self.inner.update_project(id, patch).await?;
    self.cache.invalidate_type(Project::entity_type());
    Ok(project)
  }

  pub async fn delete_project(&self, id: &str) -> Result<()> {
    self.inner.delete_project(id).await?;
    self.cache.invalidate_type(Project::entity_type());
    Ok(())
  }

  /// Drop cached project data so the next read hits the network.
  pub fn refresh_projects(&self) {
    self.cache.invalidate_type(Project::entity_type());
  }

  // Auth passthroughs

  pub async fn login(&self, email: &str, password: &str) -> Result<User> {
    self.inner.login(email, password).await
  }

  pub async fn register(&self, request: RegisterRequest) -> Result<User> {
    self.inner.register(request).await
  }

  pub async fn verify_otp(&self, email: &str, otp_code: &str) -> Result<String> {
    self.inner.verify_otp(email, otp_code).await
  }

  pub async fn resend_otp(&self, email: &str) -> Result<String> {
    self.inner.resend_otp(email).await
  }

  pub async fn request_password_reset(&self, email: &str) -> Result<String> {
    self.inner.request_password_reset(email).await
  }

  pub async fn confirm_password_reset(
    &self,
    email: &str,
    otp_code: &str,
    new_password: &str,
  ) -> Result<String> {
    self.inner.confirm_password_reset(email, otp_code, new_password).await
  }
}
