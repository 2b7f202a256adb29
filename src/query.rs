//! Poll-based async query handle for the views.
//!
//! A `Query<T>` wraps a fetcher closure and exposes loading, success and
//! error states to the render loop without blocking it. Views call `fetch`
//! or `ensure_fresh`, then `poll` on every tick; a `true` return means the
//! state changed and the screen should redraw.
//!
//! Refetching keeps the previous data on screen while the new request is in
//! flight, so lists don't flicker back to a spinner on background refresh.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Not started yet
  Idle,
  /// First fetch in flight, no data to show
  Loading,
  Success(T),
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// Wrap a fetcher closure. The closure is called once per fetch, so it
  /// typically clones the client it captures:
  ///
  /// ```ignore
  /// let api = api.clone();
  /// let query = Query::new(move || {
  ///   let api = api.clone();
  ///   async move { api.list_projects(&query).await.map_err(|e| e.to_string()) }
  /// });
  /// ```
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60),
    }
  }

  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// A request is in flight (initial load or background refresh).
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  /// Successful data older than the stale time, or invalidated.
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Mark current data stale so the next `ensure_fresh` refetches.
  pub fn invalidate(&mut self) {
    self.fetched_at = None;
  }

  /// Start fetching unless a request is already in flight.
  pub fn fetch(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    self.start_fetch();
  }

  /// Force a new request, dropping any in-flight one. Existing data stays
  /// on screen until the new result arrives.
  pub fn refetch(&mut self) {
    self.receiver = None;
    self.start_fetch();
  }

  /// Fetch if idle or the data has gone stale. Safe to call on every tick:
  /// an error stays on screen until an explicit `refetch`, so a failing
  /// backend isn't hammered once per frame.
  pub fn ensure_fresh(&mut self) {
    if self.receiver.is_some() {
      return;
    }
    match &self.state {
      QueryState::Idle => self.start_fetch(),
      QueryState::Success(_) if self.is_stale() => self.start_fetch(),
      _ => {}
    }
  }

  /// Drain a pending result. Returns `true` when the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = QueryState::Error("Request was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    // Keep previous data visible during a refresh
    if !self.state.is_success() {
      self.state = QueryState::Loading;
    }

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Receiver may have been dropped by refetch
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_success_flow() {
    let mut query = Query::new(|| async { Ok::<_, String>(vec![1, 2, 3]) });

    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());
    assert!(query.is_fetching());

    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.state().is_success());
    assert!(!query.is_fetching());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_error_flow() {
    let mut query: Query<i32> = Query::new(|| async { Err("boom".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("boom"));
  }

  #[tokio::test]
  async fn test_fetch_while_in_flight_is_noop() {
    let mut query = Query::new(|| async {
      tokio::time::sleep(Duration::from_millis(100)).await;
      Ok::<_, String>(42)
    });

    query.fetch();
    assert!(query.is_loading());
    query.fetch();
    assert!(query.is_loading());
  }

  #[tokio::test]
  async fn test_refetch_keeps_previous_data() {
    let mut query = Query::new(|| async { Ok::<_, String>(7) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&7));

    query.refetch();
    // Old data still visible while the new request runs
    assert_eq!(query.data(), Some(&7));
    assert!(query.is_fetching());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(query.poll());
    assert_eq!(query.data(), Some(&7));
  }

  #[tokio::test]
  async fn test_invalidate_then_ensure_fresh_refetches() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move { Ok::<_, String>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)) }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));

    // Fresh data: no refetch
    query.ensure_fresh();
    assert!(!query.is_fetching());

    query.invalidate();
    assert!(query.is_stale());
    query.ensure_fresh();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_stale_data_refetches_on_tick() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move { Ok::<_, String>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst)) }
    })
    .with_stale_time(Duration::ZERO);

    query.ensure_fresh();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&0));

    // With zero stale time the next tick refetches in the background,
    // keeping the old value visible meanwhile
    query.ensure_fresh();
    assert_eq!(query.data(), Some(&0));
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert_eq!(query.data(), Some(&1));
  }

  #[tokio::test]
  async fn test_ensure_fresh_leaves_errors_alone() {
    let mut query: Query<i32> = Query::new(|| async { Err("boom".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();
    assert!(query.is_error());

    query.ensure_fresh();
    assert!(!query.is_fetching());
    assert!(query.is_error());
  }

  #[tokio::test]
  async fn test_stale_after_stale_time() {
    let mut query = Query::new(|| async { Ok::<_, String>(42) }).with_stale_time(Duration::ZERO);

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;
    query.poll();

    assert!(query.is_stale());
  }

  #[tokio::test]
  async fn test_refetch_drops_pending_result() {
    let counter = std::sync::Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = counter.clone();

    let mut query = Query::new(move || {
      let counter = counter_clone.clone();
      async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok::<_, String>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    query.refetch();
    tokio::time::sleep(Duration::from_millis(100)).await;

    query.poll();
    // Only the second request's result is observed
    assert_eq!(query.data(), Some(&1));
  }
}
