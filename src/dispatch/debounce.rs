//! Cooldown-gated desktop switching
//!
//! One physical scroll gesture produces a burst of scroll events. The
//! dispatcher turns that burst into at most one switch per cooldown
//! window.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::emitter::{KeyChord, KeyEmitter, SynthesisError, SwitchDirection};
use crate::modifier::ModifierFlags;

/// Dispatcher tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Minimum time between two switches
    pub cooldown: Duration,
    /// |axis-1 delta| must exceed this to trigger
    pub noise_threshold: u64,
    /// Delay between synthetic key-down and key-up
    pub key_gap: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(200),
            noise_threshold: 0,
            key_gap: Duration::from_millis(1),
        }
    }
}

/// Result of offering one scroll delta to the dispatcher
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Key chord posted
    Switched(SwitchDirection),
    /// Trigger accepted but the chord could not be synthesised
    Failed(SwitchDirection, SynthesisError),
    /// Still inside the cooldown of the previous switch
    CoolingDown,
    /// Delta too small to mean anything
    BelowThreshold,
}

/// Converts modifier+scroll into cooldown-gated switch chords
#[derive(Debug, Clone)]
pub struct GestureDispatcher {
    settings: DispatchSettings,
    last_dispatch: Option<Instant>,
}

impl GestureDispatcher {
    pub fn new(settings: DispatchSettings) -> Self {
        Self {
            settings,
            last_dispatch: None,
        }
    }

    #[cfg(test)]
    pub fn last_dispatch(&self) -> Option<Instant> {
        self.last_dispatch
    }

    /// Offer a vertical delta seen while the modifier is held
    pub fn offer<K: KeyEmitter + ?Sized>(
        &mut self,
        delta: i64,
        modifiers: ModifierFlags,
        emitter: &K,
        now: Instant,
    ) -> DispatchOutcome {
        if let Some(last) = self.last_dispatch {
            if now.saturating_duration_since(last) <= self.settings.cooldown {
                trace!(delta, "switch suppressed by cooldown");
                return DispatchOutcome::CoolingDown;
            }
        }

        if delta.unsigned_abs() <= self.settings.noise_threshold {
            return DispatchOutcome::BelowThreshold;
        }

        let Some(direction) = SwitchDirection::from_delta(delta) else {
            return DispatchOutcome::BelowThreshold;
        };

        // The attempt starts a new window even if synthesis fails
        self.last_dispatch = Some(now);

        let chord = KeyChord::for_switch(direction, modifiers, self.settings.key_gap);
        match emitter.emit_chord(&chord) {
            Ok(()) => {
                debug!(%direction, keycode = chord.keycode, "desktop switch dispatched");
                DispatchOutcome::Switched(direction)
            }
            Err(e) => DispatchOutcome::Failed(direction, e),
        }
    }
}

impl Default for GestureDispatcher {
    fn default() -> Self {
        Self::new(DispatchSettings::default())
    }
}
