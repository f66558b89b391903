//! Events module for the interception pipeline
//!
//! Provides the tagged event kinds the gateway subscribes to, the
//! per-event samples handed to the interception context, and the
//! routing decision returned to the OS.

use crate::modifier::ModifierFlags;
use crate::transform::ScrollDeltas;

/// Raw CGEventType codes for the kinds we subscribe to
pub mod codes {
    /// kCGEventFlagsChanged
    pub const FLAGS_CHANGED: u32 = 12;
    /// kCGEventScrollWheel
    pub const SCROLL_WHEEL: u32 = 22;
    /// NSEventTypeGesture, delivered through the session tap
    pub const GESTURE: u32 = 29;
    /// kCGEventTapDisabledByTimeout
    pub const TAP_DISABLED_BY_TIMEOUT: u32 = 0xFFFF_FFFE;
    /// kCGEventTapDisabledByUserInput
    pub const TAP_DISABLED_BY_USER_INPUT: u32 = 0xFFFF_FFFF;
}

/// Event kinds recognised by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Wheel or trackpad scroll
    Scroll,
    /// Modifier key pressed or released
    ModifierChanged,
    /// Multi-touch gesture on a trackpad
    Gesture,
    /// The OS disabled the tap (timeout or user input)
    TapDisabled,
}

impl EventKind {
    /// Map a raw CGEventType code to a recognised kind
    pub fn from_raw(code: u32) -> Option<Self> {
        match code {
            codes::SCROLL_WHEEL => Some(Self::Scroll),
            codes::FLAGS_CHANGED => Some(Self::ModifierChanged),
            codes::GESTURE => Some(Self::Gesture),
            codes::TAP_DISABLED_BY_TIMEOUT | codes::TAP_DISABLED_BY_USER_INPUT => {
                Some(Self::TapDisabled)
            }
            _ => None,
        }
    }

    /// Bit for this kind in a CGEventMask; pseudo-events have no bit
    pub fn mask_bit(self) -> u64 {
        match self {
            Self::Scroll => 1 << codes::SCROLL_WHEEL,
            Self::ModifierChanged => 1 << codes::FLAGS_CHANGED,
            Self::Gesture => 1 << codes::GESTURE,
            Self::TapDisabled => 0,
        }
    }

    /// Build an event mask from a set of kinds
    pub fn mask(kinds: &[EventKind]) -> u64 {
        kinds.iter().fold(0, |mask, kind| mask | kind.mask_bit())
    }
}

/// Whether a scroll event is part of an inertial sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MomentumPhase {
    /// Finger-driven or wheel-driven scrolling
    #[default]
    None,
    /// Inertial scrolling began
    Began,
    /// Inertial scrolling continues
    Continue,
    /// Inertial scrolling ended
    Ended,
}

impl MomentumPhase {
    /// Decode the kCGScrollWheelEventMomentumPhase field
    pub fn from_raw(value: i64) -> Self {
        match value {
            1 => Self::Began,
            2 => Self::Continue,
            3 => Self::Ended,
            _ => Self::None,
        }
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

/// Everything the classifier and dispatcher read from one scroll event
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollSample {
    /// Device reports sub-pixel deltas instead of wheel notches
    pub continuous: bool,
    /// Momentum phase of the event
    pub momentum: MomentumPhase,
    /// Delta fields as delivered
    pub deltas: ScrollDeltas,
}

/// Multi-touch information carried by a gesture event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GestureSample {
    /// Number of touches currently in contact with the surface
    pub touching: usize,
}

/// An event delivered to the interception context
///
/// `S` is the scroll event handle, which lets the transform write
/// negated deltas back into the live event.
#[derive(Debug)]
pub enum InputEvent<S> {
    Scroll(S),
    ModifierChanged(ModifierFlags),
    Gesture(GestureSample),
}

/// What the callback tells the OS to do with the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapDecision {
    /// Deliver the event untouched
    PassThrough,
    /// Deliver the event after fields were rewritten in place
    Mutated,
    /// Drop the event so no application sees it
    Consume,
}

impl TapDecision {
    pub fn is_consumed(self) -> bool {
        self == Self::Consume
    }
}

impl std::fmt::Display for TapDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TapDecision::PassThrough => write!(f, "PASS_THROUGH"),
            TapDecision::Mutated => write!(f, "MUTATED"),
            TapDecision::Consume => write!(f, "CONSUME"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_raw() {
        assert_eq!(EventKind::from_raw(22), Some(EventKind::Scroll));
        assert_eq!(EventKind::from_raw(12), Some(EventKind::ModifierChanged));
        assert_eq!(EventKind::from_raw(29), Some(EventKind::Gesture));
        assert_eq!(EventKind::from_raw(0xFFFF_FFFE), Some(EventKind::TapDisabled));
        assert_eq!(EventKind::from_raw(10), None);
    }

    #[test]
    fn test_event_mask() {
        let mask = EventKind::mask(&[EventKind::Scroll, EventKind::ModifierChanged]);
        assert_eq!(mask, (1 << 22) | (1 << 12));
        assert_eq!(EventKind::mask(&[EventKind::Gesture]), 1 << 29);
        assert_eq!(EventKind::mask(&[EventKind::TapDisabled]), 0);
    }

    #[test]
    fn test_momentum_from_raw() {
        assert!(MomentumPhase::from_raw(0).is_none());
        assert_eq!(MomentumPhase::from_raw(2), MomentumPhase::Continue);
        assert!(MomentumPhase::from_raw(42).is_none());
    }

    #[test]
    fn test_tap_decision() {
        assert!(TapDecision::Consume.is_consumed());
        assert!(!TapDecision::Mutated.is_consumed());
        assert_eq!(TapDecision::Consume.to_string(), "CONSUME");
    }
}
