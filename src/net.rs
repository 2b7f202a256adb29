//! Connectivity monitoring.
//!
//! A background task periodically probes the configured backend and publishes
//! an online/offline flag through a watch channel. The cache layer and API
//! client consume the flag: when it is false, background refetches are
//! suspended and cached data is served instead.

use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::{debug, info};
use url::Url;

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Spawns the probe task and hands out receivers for the online flag.
///
/// The probe task exits on its own once every receiver has been dropped.
pub struct NetworkMonitor {
  rx: watch::Receiver<bool>,
}

impl NetworkMonitor {
  /// Start probing `base` every `interval`. The flag starts out `true` so the
  /// first requests are not refused before the first probe completes.
  pub fn spawn(base: Url, interval: Duration) -> Self {
    let (tx, rx) = watch::channel(true);

    tokio::spawn(async move {
      let http = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return,
      };

      loop {
        let online = probe(&http, &base).await;
        if *tx.borrow() != online {
          info!(online, "connectivity changed");
        }
        if tx.send(online).is_err() {
          // All receivers gone, nothing left to notify
          break;
        }
        tokio::time::sleep(interval).await;
      }
    });

    Self { rx }
  }

  /// A receiver for the online flag. Cheap to clone and hand around.
  pub fn flag(&self) -> watch::Receiver<bool> {
    self.rx.clone()
  }
}

/// Online means the host accepts a TCP connection AND answers HTTP.
/// Any HTTP response counts as reachable, including error statuses - a 500
/// still proves the network path works.
async fn probe(http: &reqwest::Client, base: &Url) -> bool {
  let Some(host) = base.host_str() else {
    return false;
  };
  let port = base.port_or_known_default().unwrap_or(443);

  let connected = matches!(
    tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect((host, port))).await,
    Ok(Ok(_))
  );
  if !connected {
    debug!(host, port, "probe: tcp connect failed");
    return false;
  }

  match http.head(base.clone()).send().await {
    Ok(_) => true,
    Err(e) => {
      debug!("probe: http request failed: {}", e);
      false
    }
  }
}
