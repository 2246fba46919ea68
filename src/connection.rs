//! Backend connection health.
//!
//! [`ConnectionStatus`] is the shared health cell: the startup initializer and the
//! heartbeat monitor write it, the request path reads it.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::db_storage::LeadStore;
use crate::errors::AppError;

#[derive(Debug, Default)]
struct StatusFlags {
    initialized: AtomicBool,
    backend_down: AtomicBool,
    heartbeat_failures: AtomicU32,
}

/// Shared, cloneable view of backend health.
#[derive(Debug, Clone, Default)]
pub struct ConnectionStatus {
    flags: Arc<StatusFlags>,
}

/// Point-in-time copy of [`ConnectionStatus`], as reported by `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub initialized: bool,
    pub backend_down: bool,
    pub heartbeat_failures: u32,
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.flags.initialized.load(Ordering::Acquire)
    }

    /// Set once the first full connection to the backend succeeded.
    pub fn mark_initialized(&self) {
        self.flags.initialized.store(true, Ordering::Release);
    }

    pub fn is_backend_down(&self) -> bool {
        self.flags.backend_down.load(Ordering::Acquire)
    }

    pub fn set_backend_down(&self, down: bool) {
        self.flags.backend_down.store(down, Ordering::Release);
    }

    /// Flags the backend down and returns the consecutive failure count.
    pub fn record_heartbeat_failure(&self) -> u32 {
        self.set_backend_down(true);
        self.flags.heartbeat_failures.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Clears the down flag. Returns true if this was a recovery.
    pub fn record_heartbeat_success(&self) -> bool {
        let was_failing = self.flags.heartbeat_failures.swap(0, Ordering::AcqRel) > 0;
        let was_down = self.flags.backend_down.swap(false, Ordering::AcqRel);
        was_failing || was_down
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            initialized: self.is_initialized(),
            backend_down: self.is_backend_down(),
            heartbeat_failures: self.flags.heartbeat_failures.load(Ordering::Acquire),
        }
    }

    /// Fails fast with 503 when the backend is flagged down.
    pub fn ensure_backend_up(&self, operation: &str) -> Result<(), AppError> {
        if self.is_backend_down() {
            tracing::error!("{}: Could not connect to backend", operation);
            return Err(AppError::ServiceUnavailable(
                "Service temporarily unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rejects every request until the service has completed its first connection.
pub async fn require_initialized(
    State(status): State<ConnectionStatus>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !status.is_initialized() {
        return Err(AppError::ServiceUnavailable(
            "Service is not initialized".to_string(),
        ));
    }
    Ok(next.run(request).await)
}

/// Connects to the backend, asserting its schema, until it succeeds once.
pub async fn initialize(store: &dyn LeadStore, status: &ConnectionStatus, retry_delay: Duration) {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match store.ensure_schema().await {
            Ok(()) => {
                status.set_backend_down(false);
                status.mark_initialized();
                tracing::info!("Backend initialized connection");
                return;
            }
            Err(e) => {
                status.set_backend_down(true);
                tracing::error!(
                    "Backend connection error during startup (attempt {}): {}",
                    attempt,
                    e
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}

/// One heartbeat: pings the backend and updates `status`.
pub async fn heartbeat(store: &dyn LeadStore, status: &ConnectionStatus) {
    match store.ping().await {
        Ok(()) => {
            if status.record_heartbeat_success() {
                tracing::info!("Backend connection regained");
            }
        }
        Err(e) => {
            let failures = status.record_heartbeat_failure();
            tracing::warn!("Backend connection lost: {}", e);
            tracing::error!("Backend connection error - retry: {}", failures);
        }
    }
}

/// Runs the initializer, then heartbeats on `interval` forever.
pub fn spawn_monitor(
    store: Arc<dyn LeadStore>,
    status: ConnectionStatus,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        initialize(store.as_ref(), &status, interval).await;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            heartbeat(store.as_ref(), &status).await;
        }
    })
}
