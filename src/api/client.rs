use color_eyre::{eyre::eyre, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::session::{Session, SessionStore};

use super::types::{Priority, Project, ProjectStatus, User};
use super::wire::{
  error_detail, ApiProject, ApiUser, LoginRequest, OtpVerifyRequest, Paginated,
  PasswordResetConfirmRequest, PasswordResetRequest, ProjectPatchPayload, ProjectPayload,
  RegisterRequest, ResendOtpRequest, TokenPairResponse, TokenRefreshRequest,
  TokenRefreshResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Server-side filter/sort parameters for the project list endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectListQuery {
  pub status: Option<ProjectStatus>,
  pub priority: Option<Priority>,
  pub search: Option<String>,
  /// DRF ordering expression, e.g. "-created_at" or "due_date"
  pub ordering: Option<String>,
}

impl ProjectListQuery {
  pub fn to_params(&self) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(status) = self.status {
      params.push(("status", status.as_param().to_string()));
    }
    if let Some(priority) = self.priority {
      params.push(("priority", priority.rank().to_string()));
    }
    if let Some(search) = &self.search {
      if !search.is_empty() {
        params.push(("search", search.clone()));
      }
    }
    if let Some(ordering) = &self.ordering {
      params.push(("ordering", ordering.clone()));
    }
    params
  }
}

/// Typed client for the backend REST API.
///
/// Auth is bearer JWT with an automatic refresh-then-retry on 401. Every
/// request goes through the shared retry policy; requests are refused
/// immediately while the connectivity monitor reports offline.
#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  base: Url,
  session: Arc<SessionStore>,
  online: watch::Receiver<bool>,
  retry: RetryPolicy,
}

impl ApiClient {
  pub fn new(
    config: &Config,
    session: Arc<SessionStore>,
    online: watch::Receiver<bool>,
  ) -> Result<Self> {
    let mut url = config.api.url.clone();
    // Url::join treats a missing trailing slash as a file component
    if !url.ends_with('/') {
      url.push('/');
    }
    let base = Url::parse(&url).map_err(|e| eyre!("Invalid API URL {}: {}", url, e))?;

    let http = reqwest::Client::builder()
      .timeout(REQUEST_TIMEOUT)
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base,
      session,
      online,
      retry: RetryPolicy::default(),
    })
  }

  pub fn is_online(&self) -> bool {
    *self.online.borrow()
  }

  // ==========================================================================
  // Auth flows
  // ==========================================================================

  /// Exchange credentials for a token pair, persist the session, and return
  /// the account details.
  pub async fn login(&self, email: &str, password: &str) -> Result<User> {
    let body = serde_json::to_value(LoginRequest {
      email: email.to_string(),
      password: password.to_string(),
    })?;
    let (status, text) = self.send(Method::POST, "auth/token/", Some(&body), false).await?;
    check(status, &text, "Login failed")?;

    let tokens: TokenPairResponse = parse(&text, "Login")?;
    self.session.set(Session {
      access: tokens.access,
      refresh: tokens.refresh,
      email: email.to_string(),
    })?;
    info!(email, "logged in");

    self.me().await
  }

  /// The current account, also used to validate a stored session at startup.
  pub async fn me(&self) -> Result<User> {
    let (status, text) = self.send(Method::GET, "users/me/", None, true).await?;
    check(status, &text, "Failed to load account")?;
    let user: ApiUser = parse(&text, "Account")?;
    Ok(user.into())
  }

  /// Create an account; the backend emails an OTP for verification.
  pub async fn register(&self, request: RegisterRequest) -> Result<User> {
    let body = serde_json::to_value(&request)?;
    let (status, text) = self
      .send(Method::POST, "auth/register/", Some(&body), false)
      .await?;
    check(status, &text, "Registration failed")?;
    let user: ApiUser = parse(&text, "Registration")?;
    Ok(user.into())
  }

  pub async fn verify_otp(&self, email: &str, otp_code: &str) -> Result<String> {
    let body = serde_json::to_value(OtpVerifyRequest {
      email: email.to_string(),
      otp_code: otp_code.to_string(),
    })?;
    let (status, text) = self
      .send(Method::POST, "auth/verify-otp/", Some(&body), false)
      .await?;
    check(status, &text, "Verification failed")?;
    Ok(message_or(&text, "Email verified successfully."))
  }

  pub async fn resend_otp(&self, email: &str) -> Result<String> {
    let body = serde_json::to_value(ResendOtpRequest {
      email: email.to_string(),
    })?;
    let (status, text) = self
      .send(Method::POST, "auth/resend-otp/", Some(&body), false)
      .await?;
    check(status, &text, "Could not resend code")?;
    Ok(message_or(&text, "Verification code sent."))
  }

  pub async fn request_password_reset(&self, email: &str) -> Result<String> {
    let body = serde_json::to_value(PasswordResetRequest {
      email: email.to_string(),
    })?;
    let (status, text) = self
      .send(Method::POST, "auth/password-reset/request/", Some(&body), false)
      .await?;
    check(status, &text, "Password reset failed")?;
    Ok(message_or(&text, "Reset code sent."))
  }

  pub async fn confirm_password_reset(
    &self,
    email: &str,
    otp_code: &str,
    new_password: &str,
  ) -> Result<String> {
    let body = serde_json::to_value(PasswordResetConfirmRequest {
      email: email.to_string(),
      otp_code: otp_code.to_string(),
      new_password: new_password.to_string(),
    })?;
    let (status, text) = self
      .send(Method::POST, "auth/password-reset/confirm/", Some(&body), false)
      .await?;
    check(status, &text, "Password reset failed")?;
    Ok(message_or(&text, "Password updated."))
  }

  // ==========================================================================
  // Projects
  // ==========================================================================

  /// List projects matching the query, following pagination to the end.
  pub async fn list_projects(&self, query: &ProjectListQuery) -> Result<Vec<Project>> {
    let mut url = self.endpoint("projects/")?;
    {
      let mut pairs = url.query_pairs_mut();
      for (name, value) in query.to_params() {
        pairs.append_pair(name, &value);
      }
    }

    let mut projects = Vec::new();
    let mut next = Some(url);
    while let Some(url) = next {
      let (status, text) = self.send_url(&Method::GET, &url, None, true).await?;
      check(status, &text, "Failed to list projects")?;
      let page: Paginated<ApiProject> = parse(&text, "Project list")?;
      projects.extend(page.results.into_iter().map(Project::from));
      next = match page.next {
        Some(link) => Some(Url::parse(&link).map_err(|e| eyre!("Bad pagination link: {}", e))?),
        None => None,
      };
    }

    Ok(projects)
  }

  pub async fn get_project(&self, id: &str) -> Result<Project> {
    let path = format!("projects/{}/", id);
    let (status, text) = self.send(Method::GET, &path, None, true).await?;
    check(status, &text, "Failed to load project")?;
    let project: ApiProject = parse(&text, "Project")?;
    Ok(project.into())
  }

  pub async fn create_project(&self, payload: &ProjectPayload) -> Result<Project> {
    let body = serde_json::to_value(payload)?;
    let (status, text) = self.send(Method::POST, "projects/", Some(&body), true).await?;
    check(status, &text, "Failed to create project")?;
    let project: ApiProject = parse(&text, "Project")?;
    Ok(project.into())
  }

  pub async fn update_project(&self, id: &str, patch: &ProjectPatchPayload) -> Result<Project> {
    let path = format!("projects/{}/", id);
    let body = serde_json::to_value(patch)?;
    let (status, text) = self.send(Method::PATCH, &path, Some(&body), true).await?;
    check(status, &text, "Failed to update project")?;
    let project: ApiProject = parse(&text, "Project")?;
    Ok(project.into())
  }

  pub async fn delete_project(&self, id: &str) -> Result<()> {
    let path = format!("projects/{}/", id);
    let (status, text) = self.send(Method::DELETE, &path, None, true).await?;
    check(status, &text, "Failed to delete project")?;
    Ok(())
  }

  // ==========================================================================
  // Plumbing
  // ==========================================================================

  fn endpoint(&self, path: &str) -> Result<Url> {
    self
      .base
      .join(path)
      .map_err(|e| eyre!("Invalid endpoint {}: {}", path, e))
  }

  async fn send(
    &self,
    method: Method,
    path: &str,
    body: Option<&serde_json::Value>,
    auth: bool,
  ) -> Result<(StatusCode, String)> {
    let url = self.endpoint(path)?;
    self.send_url(&method, &url, body, auth).await
  }

  async fn send_url(
    &self,
    method: &Method,
    url: &Url,
    body: Option<&serde_json::Value>,
    auth: bool,
  ) -> Result<(StatusCode, String)> {
    if !self.is_online() {
      return Err(eyre!("Offline: cannot reach {}", self.base));
    }

    let token = if auth { Some(self.access_token()?) } else { None };
    let (status, text) = self
      .send_with_retry(method, url, body, token.as_deref())
      .await?;

    // Expired access token: refresh once, then replay the request
    if auth && status == StatusCode::UNAUTHORIZED {
      self.refresh_access().await?;
      let token = self.access_token()?;
      return self.send_with_retry(method, url, body, Some(&token)).await;
    }

    Ok((status, text))
  }

  /// One request through the retry policy. Transport errors and 5xx responses
  /// are retried; 4xx responses are returned for the caller to interpret.
  async fn send_with_retry(
    &self,
    method: &Method,
    url: &Url,
    body: Option<&serde_json::Value>,
    token: Option<&str>,
  ) -> Result<(StatusCode, String)> {
    self
      .retry
      .run(|| async {
        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(token) = token {
          request = request.bearer_auth(token);
        }
        if let Some(body) = body {
          request = request.json(body);
        }

        let response = request
          .send()
          .await
          .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;
        let status = response.status();
        let text = response
          .text()
          .await
          .map_err(|e| eyre!("Failed to read response from {}: {}", url, e))?;

        if status.is_server_error() {
          return Err(eyre!("Server error {} from {}", status, url));
        }
        Ok((status, text))
      })
      .await
  }

  fn access_token(&self) -> Result<String> {
    self
      .session
      .get()
      .map(|s| s.access)
      .ok_or_else(|| eyre!("Not logged in"))
  }

  async fn refresh_access(&self) -> Result<()> {
    let refresh = self
      .session
      .get()
      .map(|s| s.refresh)
      .ok_or_else(|| eyre!("Not logged in"))?;

    let body = serde_json::to_value(TokenRefreshRequest { refresh })?;
    let url = self.endpoint("auth/token/refresh/")?;
    let (status, text) = self.send_with_retry(&Method::POST, &url, Some(&body), None).await?;

    if !status.is_success() {
      // Refresh token rejected, the session is dead
      self.session.clear();
      return Err(eyre!("Session expired, please log in again"));
    }

    let response: TokenRefreshResponse = parse(&text, "Token refresh")?;
    self.session.set_access(response.access)
  }
}

fn check(status: StatusCode, body: &str, context: &str) -> Result<()> {
  if status.is_success() {
    Ok(())
  } else {
    let detail = error_detail(body).unwrap_or_else(|| format!("HTTP {}", status));
    Err(eyre!("{}: {}", context, detail))
  }
}

fn parse<T: DeserializeOwned>(text: &str, context: &str) -> Result<T> {
  serde_json::from_str(text).map_err(|e| eyre!("{}: unexpected response: {}", context, e))
}

fn message_or(text: &str, fallback: &str) -> String {
  match serde_json::from_str::<super::wire::MessageResponse>(text) {
    Ok(response) => response.message,
    Err(_) => fallback.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_query_params_empty() {
    assert!(ProjectListQuery::default().to_params().is_empty());
  }

  #[test]
  fn test_query_params_full() {
    let query = ProjectListQuery {
      status: Some(ProjectStatus::Active),
      priority: Some(Priority::High),
      search: Some("mobile".to_string()),
      ordering: Some("-created_at".to_string()),
    };
    assert_eq!(
      query.to_params(),
      vec![
        ("status", "active".to_string()),
        ("priority", "3".to_string()),
        ("search", "mobile".to_string()),
        ("ordering", "-created_at".to_string()),
      ]
    );
  }

  #[test]
  fn test_query_params_blank_search_is_dropped() {
    let query = ProjectListQuery {
      search: Some(String::new()),
      ..Default::default()
    };
    assert!(query.to_params().is_empty());
  }

  #[test]
  fn test_check_prefers_api_detail() {
    let err = check(
      StatusCode::BAD_REQUEST,
      r#"{"detail": "No active account found"}"#,
      "Login failed",
    )
    .unwrap_err();
    assert!(err.to_string().contains("No active account found"));

    let err = check(StatusCode::NOT_FOUND, "", "Failed to load project").unwrap_err();
    assert!(err.to_string().contains("HTTP 404"));
  }
}
