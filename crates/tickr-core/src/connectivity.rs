//! Network status signal
//!
//! A single online/offline flag shared through a `watch` channel. Whoever
//! observes the network (a periodic check, a `--offline` flag) flips it; the
//! sync controller reads it before every operation.

use std::time::Duration;

use reqwest::Client;
use tokio::sync::watch;
use tracing::{debug, info};

/// Owner of the online/offline flag
#[derive(Debug)]
pub struct Connectivity {
    tx: watch::Sender<bool>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx }
    }

    /// Receiver that observes every transition
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record the current status; returns true on a transition
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
        changed
    }
}

/// Check whether the backend answers at all
///
/// Any HTTP response counts as reachable; only transport failures
/// (DNS, refused connection, timeout) mean offline.
pub async fn check_reachable(base_url: &str, timeout: Duration) -> bool {
    let Ok(http) = Client::builder().timeout(timeout).build() else {
        return false;
    };
    let url = format!("{}/auth/v1/health", base_url.trim_end_matches('/'));
    match http.get(&url).send().await {
        Ok(resp) => {
            debug!("Health check {} -> {}", url, resp.status());
            true
        }
        Err(e) => {
            debug!("Health check {} failed: {}", url, e);
            false
        }
    }
}
