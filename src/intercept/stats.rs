//! Counters for what the taps did over the process lifetime

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Lock-free counters bumped from the event callback
#[derive(Debug, Default)]
pub struct InterceptStats {
    scrolls: AtomicU64,
    inverted: AtomicU64,
    consumed: AtomicU64,
    switches: AtomicU64,
    cooldown_suppressed: AtomicU64,
    synthesis_failures: AtomicU64,
    gestures: AtomicU64,
    panics: AtomicU64,
}

/// Point-in-time copy of [`InterceptStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub scrolls: u64,
    pub inverted: u64,
    pub consumed: u64,
    pub switches: u64,
    pub cooldown_suppressed: u64,
    pub synthesis_failures: u64,
    pub gestures: u64,
    pub panics: u64,
}

macro_rules! counter {
    ($($name:ident => $field:ident),* $(,)?) => {
        impl InterceptStats {
            $(
                pub fn $name(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*
        }
    };
}

counter! {
    record_scroll => scrolls,
    record_inverted => inverted,
    record_consumed => consumed,
    record_switch => switches,
    record_cooldown => cooldown_suppressed,
    record_synthesis_failure => synthesis_failures,
    record_gesture => gestures,
    record_panic => panics,
}

impl InterceptStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            scrolls: self.scrolls.load(Ordering::Relaxed),
            inverted: self.inverted.load(Ordering::Relaxed),
            consumed: self.consumed.load(Ordering::Relaxed),
            switches: self.switches.load(Ordering::Relaxed),
            cooldown_suppressed: self.cooldown_suppressed.load(Ordering::Relaxed),
            synthesis_failures: self.synthesis_failures.load(Ordering::Relaxed),
            gestures: self.gestures.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
        }
    }
}
