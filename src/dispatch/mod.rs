//! Dispatch module for modifier+scroll desktop switching
//!
//! Turns a qualifying scroll delta into a direction and a synthetic
//! Control+Arrow chord, at most once per cooldown window.

mod debounce;
mod emitter;
mod fallback;

pub use debounce::{DispatchOutcome, DispatchSettings, GestureDispatcher};
pub use emitter::{keycodes, KeyChord, KeyEmitter, KeyPhase, SwitchDirection, SynthesisError};
pub use fallback::{FallbackAction, ScriptFallback};

#[cfg(test)]
pub(crate) use emitter::testing;
