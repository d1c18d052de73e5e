use log::{debug, warn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::controller::SessionInner;
use crate::token::introspection;

/// Cancellable background task that refreshes the access token ahead
/// of expiry. Owned by the session controller; never a bare interval
/// id.
#[derive(Debug, Default)]
pub struct RefreshScheduler {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the refresh cycle. A no-op while a cycle is already
    /// running, so concurrent arms coalesce.
    pub(crate) fn arm(&self, inner: &Arc<SessionInner>) {
        let Ok(mut task) = self.task.lock() else {
            warn!("Refresh scheduler lock poisoned, not arming");
            return;
        };
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("Refresh scheduler already armed");
            return;
        }
        *task = Some(tokio::spawn(run_cycle(Arc::clone(inner))));
    }

    /// Idempotent: safe to call repeatedly, before arming and after
    /// the cycle has finished.
    pub fn cancel(&self) {
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        if let Some(handle) = task.take() {
            handle.abort();
            debug!("Refresh scheduler cancelled");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

async fn run_cycle(inner: Arc<SessionInner>) {
    loop {
        if !inner.is_logged_in() {
            break;
        }

        let token = match inner.store().access_token().await {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No access token stored, refresh cycle stopping");
                break;
            }
            Err(e) => {
                warn!("Refresh cycle could not read the store: {}", e);
                break;
            }
        };

        let lead = inner.refresh_lead_secs();
        let wait_secs = introspection::seconds_until_expiry(&token)
            .map_or(0, |remaining| (remaining - lead).max(0));
        if wait_secs > 0 {
            tokio::time::sleep(Duration::from_secs(wait_secs as u64)).await;
        }

        if !inner.is_logged_in() {
            break;
        }

        // Nothing to refresh with; no session to maintain.
        match inner.store().refresh_token().await {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!("No refresh credential stored, refresh cycle stopping");
                break;
            }
            Err(e) => {
                warn!("Refresh cycle could not read the store: {}", e);
                break;
            }
        }

        // The token may have been replaced while we slept.
        if let Ok(Some(current)) = inner.store().access_token().await {
            if !introspection::is_expiring_within(&current, lead) {
                continue;
            }
        }

        match inner.refresh_once().await {
            Ok(true) => {}
            Ok(false) => {
                // Coalesced behind another refresh; give it room.
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => {
                warn!("Scheduled refresh failed, ending session: {}", e);
                inner.end_session("token refresh failed").await;
                break;
            }
        }
    }
}
