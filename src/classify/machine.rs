//! Scroll device classification state machine
//!
//! The OS does not say which device produced a scroll event, so the
//! source is inferred from three signals: whether deltas are continuous,
//! whether the event is part of a momentum sequence, and how recently a
//! multi-finger contact was seen on the trackpad.

use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::events::ScrollSample;

/// Touch counts below this are not treated as a trackpad scroll gesture
pub const MIN_TRACKPAD_TOUCHES: usize = 2;

/// The two device classes a scroll event can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceClass {
    /// Traditional wheel; the default so a missed wheel is not left un-inverted for long
    #[default]
    Mouse,
    /// Multi-touch surface
    Trackpad,
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceClass::Mouse => write!(f, "Mouse"),
            DeviceClass::Trackpad => write!(f, "Trackpad"),
        }
    }
}

/// Which rule produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Discrete deltas only come from notched wheels
    Discrete,
    /// A multi-finger contact was seen just before this event
    RecentTouch,
    /// Continuous, no momentum, and no touch for a while
    TouchIdle,
    /// Ambiguous window; the previous class is kept
    Retained,
}

/// Timing windows of the classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierWindows {
    /// A continuous event this soon after a multi-touch contact is a trackpad
    pub trackpad_window: Duration,
    /// A continuous event without momentum this long after contact is a mouse
    pub mouse_idle: Duration,
}

impl Default for ClassifierWindows {
    fn default() -> Self {
        Self {
            trackpad_window: Duration::from_millis(222),
            mouse_idle: Duration::from_millis(333),
        }
    }
}

/// Per-process classifier state
#[derive(Debug, Clone)]
pub struct ScrollClassifier {
    windows: ClassifierWindows,
    /// Class assigned to the previous scroll event
    last_class: DeviceClass,
    /// Most recent contact with at least two touches
    last_touch: Option<Instant>,
    /// Largest touch count seen since the previous classification
    touching_max: usize,
}

impl ScrollClassifier {
    pub fn new(windows: ClassifierWindows) -> Self {
        Self {
            windows,
            last_class: DeviceClass::Mouse,
            last_touch: None,
            touching_max: 0,
        }
    }

    /// Current class, as assigned to the last scroll event
    #[cfg(test)]
    pub fn last_class(&self) -> DeviceClass {
        self.last_class
    }

    #[cfg(test)]
    pub fn touching_max(&self) -> usize {
        self.touching_max
    }

    /// Record a multi-touch gesture event
    pub fn note_touches(&mut self, touching: usize, now: Instant) {
        if touching < MIN_TRACKPAD_TOUCHES {
            return;
        }

        self.last_touch = Some(now);
        self.touching_max = self.touching_max.max(touching);
        trace!(touching, touching_max = self.touching_max, "multi-touch contact");
    }

    /// Classify one scroll event and reset the touch accumulator
    pub fn classify(&mut self, sample: &ScrollSample, now: Instant) -> (DeviceClass, Classification) {
        let (class, rule) = self.compute_class(sample, now);

        if class != self.last_class {
            debug!(
                from = %self.last_class,
                to = %class,
                ?rule,
                "scroll source changed"
            );
        }

        self.last_class = class;
        self.touching_max = 0;
        (class, rule)
    }

    fn compute_class(&self, sample: &ScrollSample, now: Instant) -> (DeviceClass, Classification) {
        if !sample.continuous {
            return (DeviceClass::Mouse, Classification::Discrete);
        }

        // No contact seen yet counts as infinitely long ago
        let elapsed = self
            .last_touch
            .map(|t| now.saturating_duration_since(t))
            .unwrap_or(Duration::MAX);

        if self.touching_max >= MIN_TRACKPAD_TOUCHES && elapsed < self.windows.trackpad_window {
            (DeviceClass::Trackpad, Classification::RecentTouch)
        } else if sample.momentum.is_none() && elapsed > self.windows.mouse_idle {
            (DeviceClass::Mouse, Classification::TouchIdle)
        } else {
            (self.last_class, Classification::Retained)
        }
    }
}

impl Default for ScrollClassifier {
    fn default() -> Self {
        Self::new(ClassifierWindows::default())
    }
}
