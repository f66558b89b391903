//! Process lifecycle helpers

mod shutdown;

pub use shutdown::{ShutdownReason, ShutdownSignal};
