//! Best-effort fallback when keyboard synthesis fails
//!
//! Asks System Events to press the switch chord instead. The script runs
//! as a detached task on the tokio runtime; the event callback never
//! waits for it and it touches no callback state.

use tokio::process::Command;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::emitter::SwitchDirection;

/// An action launched without waiting for completion
pub trait FallbackAction {
    fn launch(&self, direction: SwitchDirection);
}

/// Runs `osascript` to send the switch chord through System Events
#[derive(Debug, Clone)]
pub struct ScriptFallback {
    runtime: Handle,
}

impl ScriptFallback {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// AppleScript that presses the chord for `direction` with Control held
    pub fn script_for(direction: SwitchDirection) -> String {
        format!(
            "tell application \"System Events\" to key code {} using control down",
            direction.keycode()
        )
    }

    /// Spawn the script on the runtime and hand back its task
    fn spawn_script(&self, direction: SwitchDirection) -> JoinHandle<()> {
        let script = Self::script_for(direction);

        self.runtime.spawn(async move {
            let result = Command::new("osascript")
                .arg("-e")
                .arg(&script)
                .status()
                .await;

            match result {
                Ok(status) if status.success() => {
                    debug!(%direction, "fallback switch script completed");
                }
                Ok(status) => {
                    warn!(%direction, ?status, "fallback switch script failed");
                }
                Err(e) => {
                    warn!(%direction, ?e, "failed to launch fallback switch script");
                }
            }
        })
    }
}

impl FallbackAction for ScriptFallback {
    fn launch(&self, direction: SwitchDirection) {
        // Detached; the callback never waits on the script
        drop(self.spawn_script(direction));
    }
}
