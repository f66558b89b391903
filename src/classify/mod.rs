//! Classifier module for scroll device disambiguation
//!
//! Labels each scroll event as coming from a wheel or a trackpad:
//! - Mouse: discrete deltas, or continuous deltas with no recent touch
//! - Trackpad: continuous deltas shortly after a multi-finger contact
//! - otherwise the previous label is kept

mod machine;

pub use machine::{Classification, ClassifierWindows, DeviceClass, ScrollClassifier};
