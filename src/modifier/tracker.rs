//! Held/released tracking for the designated modifier
//!
//! Only the latest state is kept. A scroll event sees whatever the
//! most recent flags-changed event left behind.

use tracing::debug;

use super::keys::{ModifierFlags, ModifierState};

/// Tracks whether the designated modifier is currently held
#[derive(Debug, Clone)]
pub struct ModifierTracker {
    designated: ModifierFlags,
    pressed: bool,
}

impl ModifierTracker {
    pub fn new(designated: ModifierFlags) -> Self {
        Self {
            designated,
            pressed: false,
        }
    }

    /// Record a flags-changed event; returns true if the held state flipped
    pub fn update(&mut self, flags: ModifierFlags) -> bool {
        let pressed = flags.contains(self.designated);
        let changed = pressed != self.pressed;
        if changed {
            debug!(pressed, modifiers = ?ModifierState::from_flags(flags), "designated modifier changed");
        }

        self.pressed = pressed;
        changed
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// The modifier mask synthetic events should carry
    pub fn designated(&self) -> ModifierFlags {
        self.designated
    }

}

impl Default for ModifierTracker {
    fn default() -> Self {
        Self::new(ModifierFlags::CONTROL)
    }
}
