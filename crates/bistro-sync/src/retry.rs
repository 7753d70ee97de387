//! # Reconnect Task
//!
//! An explicit retry loop with a cancellation handle, replacing ad-hoc timers
//! owned by whichever view happens to be mounted.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Reconnect Task Lifecycle                           │
//! │                                                                         │
//! │  spawn_reconnect(session)                                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  loop: ── role already Hosting/Connected? ──► stop                     │
//! │        ── connect_as_client()                                          │
//! │        ──── Connected / Loopback ───────────► stop                     │
//! │        ──── LocalFallback ──► sleep(retry_interval) ──► loop           │
//! │                                  │                                      │
//! │                                  └── handle.cancel() ──► stop           │
//! │                                                                         │
//! │  The task stops itself the moment a connection exists or the device    │
//! │  itself becomes host; cancel() covers view teardown. Either way no     │
//! │  timer outlives the handle.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::{Backoff, Constant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::session::{ConnectOutcome, Role, SyncSession};

// =============================================================================
// Reconnect Handle
// =============================================================================

/// Cancellation handle for a running reconnect task.
pub struct ReconnectHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl ReconnectHandle {
    /// Cancels the task and waits for it to wind down. Safe to call after
    /// the task already stopped itself.
    pub async fn cancel(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.join.await;
    }

    /// True once the task has stopped (connected, hosting, or cancelled).
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

// =============================================================================
// Spawn
// =============================================================================

/// Spawns the fixed-interval reconnect loop for a session.
///
/// Retries `connect_as_client()` every `client.retry_interval_secs` for as
/// long as the session is neither Connected nor Hosting. Start it on entering
/// disconnected state; keep the handle and `cancel()` it when the consuming
/// view goes away.
pub fn spawn_reconnect(session: SyncSession) -> ReconnectHandle {
    let interval = session.config().retry_interval();
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

    let join = tokio::spawn(async move {
        let mut policy = Constant::new(interval);

        loop {
            // Connected or hosting by other means (loopback covers hosts):
            // the loop's reason to exist is gone.
            if matches!(session.role().await, Role::Hosting | Role::Connected) {
                debug!("Already connected or hosting, stopping reconnect task");
                break;
            }

            match session.connect_as_client().await {
                ConnectOutcome::Connected | ConnectOutcome::Loopback => {
                    debug!("Reconnect succeeded, stopping reconnect task");
                    break;
                }
                ConnectOutcome::LocalFallback => {}
            }

            // Constant policy: always Some(interval).
            let delay = policy.next_backoff().unwrap_or(interval);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.recv() => {
                    debug!("Reconnect task cancelled");
                    break;
                }
            }
        }
    });

    ReconnectHandle { shutdown_tx, join }
}

// =============================================================================
// Unit Tests
// =============================================================================
