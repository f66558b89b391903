//! Synthetic key chord definitions
//!
//! The platform emitter turns a [`KeyChord`] into a key-down/key-up pair
//! posted at the HID level.

use std::time::Duration;

use crate::modifier::ModifierFlags;

/// Virtual key codes used for desktop switching
pub mod keycodes {
    /// kVK_LeftArrow
    pub const LEFT_ARROW: u16 = 123;
    /// kVK_RightArrow
    pub const RIGHT_ARROW: u16 = 124;
}

/// Which way to move between desktops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchDirection {
    Previous,
    Next,
}

impl SwitchDirection {
    /// Positive deltas go to the previous desktop, negative to the next
    pub fn from_delta(delta: i64) -> Option<Self> {
        match delta.signum() {
            1 => Some(Self::Previous),
            -1 => Some(Self::Next),
            _ => None,
        }
    }

    pub fn keycode(self) -> u16 {
        match self {
            SwitchDirection::Previous => keycodes::LEFT_ARROW,
            SwitchDirection::Next => keycodes::RIGHT_ARROW,
        }
    }
}

impl std::fmt::Display for SwitchDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchDirection::Previous => write!(f, "previous"),
            SwitchDirection::Next => write!(f, "next"),
        }
    }
}

/// A key pressed and released while a modifier mask is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyChord {
    pub keycode: u16,
    pub modifiers: ModifierFlags,
    /// Minimum delay between key-down and key-up submission
    pub gap: Duration,
}

impl KeyChord {
    pub fn for_switch(direction: SwitchDirection, modifiers: ModifierFlags, gap: Duration) -> Self {
        Self {
            keycode: direction.keycode(),
            modifiers,
            gap,
        }
    }
}

/// Half of a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhase {
    Down,
    Up,
}

impl std::fmt::Display for KeyPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyPhase::Down => write!(f, "down"),
            KeyPhase::Up => write!(f, "up"),
        }
    }
}

/// Errors building or posting synthetic events
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("failed to create HID event source")]
    EventSource,

    #[error("failed to create key {phase} event for keycode {keycode}")]
    KeyEvent { keycode: u16, phase: KeyPhase },
}

/// Posts synthetic keyboard events into the system event stream
pub trait KeyEmitter {
    /// Submit key-down, wait `chord.gap`, then submit key-up
    fn emit_chord(&self, chord: &KeyChord) -> Result<(), SynthesisError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};

    use super::*;

    /// Records chords instead of posting them
    #[derive(Debug, Default)]
    pub struct RecordingEmitter {
        pub chords: RefCell<Vec<KeyChord>>,
        pub fail: Cell<bool>,
    }

    impl RecordingEmitter {
        pub fn failing() -> Self {
            let emitter = Self::default();
            emitter.fail.set(true);
            emitter
        }

        pub fn keycodes(&self) -> Vec<u16> {
            self.chords.borrow().iter().map(|c| c.keycode).collect()
        }
    }

    impl KeyEmitter for RecordingEmitter {
        fn emit_chord(&self, chord: &KeyChord) -> Result<(), SynthesisError> {
            if self.fail.get() {
                return Err(SynthesisError::EventSource);
            }
            self.chords.borrow_mut().push(*chord);
            Ok(())
        }
    }
}
