//! Exponential-backoff retry policy for network calls.

use std::future::Future;
use std::time::Duration;

/// Retry with exponential backoff: 1s, 2s, 4s, ... capped at 10s.
///
/// The same policy applies to reads and writes; the backend's endpoints are
/// safe to repeat (mutations either fail before committing or the client
/// refetches afterwards).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
  /// Total number of attempts, including the first
  pub max_attempts: u32,
  pub base_delay: Duration,
  pub max_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts: 3,
      base_delay: Duration::from_secs(1),
      max_delay: Duration::from_secs(10),
    }
  }
}

impl RetryPolicy {
  /// Delay before retrying after the given zero-based failed attempt.
  pub fn delay(&self, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt);
    self.base_delay.saturating_mul(factor).min(self.max_delay)
  }

  /// Run an async operation, retrying on failure until attempts run out.
  /// Returns the last error if every attempt fails.
  pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let mut attempt = 0u32;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(e) => {
          attempt += 1;
          if attempt >= self.max_attempts {
            return Err(e);
          }
          tokio::time::sleep(self.delay(attempt - 1)).await;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;

  #[test]
  fn test_delay_doubles_and_caps() {
    let policy = RetryPolicy::default();
    assert_eq!(policy.delay(0), Duration::from_secs(1));
    assert_eq!(policy.delay(1), Duration::from_secs(2));
    assert_eq!(policy.delay(2), Duration::from_secs(4));
    assert_eq!(policy.delay(3), Duration::from_secs(8));
    // Capped at 10s from here on
    assert_eq!(policy.delay(4), Duration::from_secs(10));
    assert_eq!(policy.delay(10), Duration::from_secs(10));
  }

  #[tokio::test(start_paused = true)]
  async fn test_succeeds_after_failures() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: Result<u32, String> = RetryPolicy::default()
      .run(move || {
        let counter = counter.clone();
        async move {
          let n = counter.fetch_add(1, Ordering::SeqCst);
          if n < 2 {
            Err("transient".to_string())
          } else {
            Ok(n)
          }
        }
      })
      .await;

    assert_eq!(result, Ok(2));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_gives_up_after_max_attempts() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = attempts.clone();

    let result: Result<(), String> = RetryPolicy::default()
      .run(move || {
        let counter = counter.clone();
        async move {
          counter.fetch_add(1, Ordering::SeqCst);
          Err("still broken".to_string())
        }
      })
      .await;

    assert_eq!(result, Err("still broken".to_string()));
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_first_success_returns_immediately() {
    let result: Result<&str, &str> = RetryPolicy::default().run(|| async { Ok("fine") }).await;
    assert_eq!(result, Ok("fine"));
  }
}
