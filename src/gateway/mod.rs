//! Event interception gateway using macOS session event taps
//!
//! Installs two taps on a dedicated thread with its own CFRunLoop:
//! - a listen-only tap for multi-touch gestures
//! - an active tap for scroll and flags-changed events, which may
//!   rewrite or drop them
//!
//! Both taps feed one interception context, so events are handled
//! strictly in arrival order on a single thread.

#[cfg(target_os = "macos")]
mod macos;
mod permission;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::events::TapDecision;
use crate::intercept::InterceptStats;

pub use permission::{ensure_trusted, PermissionReport};

/// How a tap is registered with the event system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapMode {
    /// Observes events, cannot alter them
    ListenOnly,
    /// May rewrite or drop events; requires trust
    Active,
}

impl std::fmt::Display for TapMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TapMode::ListenOnly => write!(f, "listen-only"),
            TapMode::Active => write!(f, "active"),
        }
    }
}

/// What a tap callback hands back to the event system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapVerdict {
    /// Return the event, rewritten or not
    Deliver,
    /// Return null so the event is dropped
    Drop,
}

/// Map the outcome of a routed callback to the event's fate
///
/// A panic always delivers the event unchanged. Only an active tap can
/// drop events, so a consume decision on a listen-only tap is ignored.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub fn resolve_decision(
    mode: TapMode,
    outcome: std::thread::Result<TapDecision>,
    stats: &InterceptStats,
) -> TapVerdict {
    match outcome {
        Ok(decision) if decision.is_consumed() && mode == TapMode::Active => TapVerdict::Drop,
        Ok(_) => TapVerdict::Deliver,
        Err(_) => {
            stats.record_panic();
            error!(%mode, "panic in event callback, passing event through");
            TapVerdict::Deliver
        }
    }
}

/// Errors that can occur starting the gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("accessibility permission required - grant it in System Settings > Privacy & Security > Accessibility and restart the service")]
    PermissionDenied,

    #[error("failed to create {mode} event tap - check Accessibility permissions")]
    TapCreation { mode: TapMode },

    #[error("failed to create run loop source for {mode} event tap")]
    RunLoopSource { mode: TapMode },

    #[error("event taps are already running")]
    AlreadyRunning,

    #[error("failed to spawn event tap thread: {0}")]
    ThreadSpawn(String),

    #[error("event tap thread exited during startup")]
    StartupAborted,

    #[error("session event taps are only available on macOS")]
    Unsupported,
}

/// Owns the tap thread and its lifecycle
pub struct Gateway {
    config: Config,
    running: Arc<AtomicBool>,
    stats: Arc<InterceptStats>,
    thread: Option<JoinHandle<()>>,
    exited: Option<oneshot::Receiver<()>>,
}

impl Gateway {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(InterceptStats::default()),
            thread: None,
            exited: None,
        }
    }

    /// Counters updated by the tap callbacks
    pub fn stats(&self) -> Arc<InterceptStats> {
        Arc::clone(&self.stats)
    }

    /// Start the taps and wait until both are installed
    ///
    /// `runtime` hosts the fire-and-forget fallback tasks launched from
    /// the callback.
    pub async fn start(&mut self, runtime: Handle) -> Result<(), GatewayError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(GatewayError::AlreadyRunning);
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        match self.spawn_taps(runtime, ready_tx, exit_tx) {
            Ok(handle) => {
                self.thread = Some(handle);
                self.exited = Some(exit_rx);
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("event taps installed");
                Ok(())
            }
            Ok(Err(e)) => {
                self.shutdown().await;
                Err(e)
            }
            Err(_) => {
                self.shutdown().await;
                Err(GatewayError::StartupAborted)
            }
        }
    }

    #[cfg(target_os = "macos")]
    fn spawn_taps(
        &self,
        runtime: Handle,
        ready: oneshot::Sender<Result<(), GatewayError>>,
        exited: oneshot::Sender<()>,
    ) -> Result<JoinHandle<()>, GatewayError> {
        let config = self.config.clone();
        let stats = Arc::clone(&self.stats);
        let running = Arc::clone(&self.running);

        std::thread::Builder::new()
            .name("event-tap".to_string())
            .spawn(move || {
                info!("event tap thread started");

                macos::run_taps(&config, stats, &running, runtime, ready);

                running.store(false, Ordering::SeqCst);
                let _ = exited.send(());
                info!("event tap thread stopped");
            })
            .map_err(|e| GatewayError::ThreadSpawn(e.to_string()))
    }

    #[cfg(not(target_os = "macos"))]
    fn spawn_taps(
        &self,
        _runtime: Handle,
        _ready: oneshot::Sender<Result<(), GatewayError>>,
        _exited: oneshot::Sender<()>,
    ) -> Result<JoinHandle<()>, GatewayError> {
        debug!(config = ?self.config, "no event tap backend for this platform");
        Err(GatewayError::Unsupported)
    }

    /// Resolve when the tap thread exits on its own
    pub async fn exited(&mut self) {
        match self.exited.as_mut() {
            Some(rx) => {
                let _ = rx.await;
            }
            None => std::future::pending().await,
        }
    }

    /// Disable the taps and wait for the tap thread on the blocking pool
    ///
    /// The thread notices within one run loop slice (100 ms). Synthetic
    /// events already posted are not recalled.
    pub async fn shutdown(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.exited = None;

        if let Some(handle) = self.thread.take() {
            debug!("waiting for event tap thread");
            match tokio::task::spawn_blocking(move || handle.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => warn!("event tap thread panicked"),
                Err(e) => warn!(%e, "failed to join event tap thread"),
            }
        }
    }
}

impl Drop for Gateway {
    /// Last-resort teardown when `shutdown` was never awaited; blocks the
    /// dropping thread until the tap thread exits
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("event tap thread panicked");
            }
        }
    }
}
