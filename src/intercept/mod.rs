//! Intercept module for per-event routing
//!
//! Owns the modifier tracker, scroll classifier and dispatcher, and
//! decides for each event whether it passes, is rewritten, or is dropped.

mod context;
mod stats;

pub use context::InterceptionContext;
pub use stats::{InterceptStats, StatsSnapshot};
