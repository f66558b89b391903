//! Modifier module for held-key tracking
//!
//! Decodes the modifier bitmask of flags-changed events and keeps the
//! held state of the key that gates desktop switching.

mod keys;
mod tracker;

pub use keys::ModifierFlags;
pub use tracker::ModifierTracker;
