//! Delta inversion for wheel-classified scroll events
//!
//! A scroll event carries the same motion in up to three encodings:
//! integer line deltas, point deltas and fixed-point deltas. Different
//! rendering paths read different encodings, so every populated
//! encoding is negated together or not at all.

use crate::events::ScrollSample;

/// Delta fields of one scroll event. Axis 1 is vertical, axis 2 horizontal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollDeltas {
    /// kCGScrollWheelEventDeltaAxis1
    pub line_y: i64,
    /// kCGScrollWheelEventDeltaAxis2
    pub line_x: i64,
    /// kCGScrollWheelEventPointDeltaAxis1
    pub point_y: i64,
    /// kCGScrollWheelEventPointDeltaAxis2
    pub point_x: i64,
    /// kCGScrollWheelEventFixedPtDeltaAxis1
    pub fixed_y: f64,
    /// kCGScrollWheelEventFixedPtDeltaAxis2
    pub fixed_x: f64,
}

impl ScrollDeltas {
    /// Integer deltas only, as a notched wheel reports them
    pub fn lines(line_y: i64, line_x: i64) -> Self {
        Self {
            line_y,
            line_x,
            ..Self::default()
        }
    }
}

/// Read/write access to the scroll fields of a live event
pub trait ScrollEvent {
    fn sample(&self) -> ScrollSample;

    /// Write the integer deltas, then the point and fixed-point deltas
    /// when `continuous` is set
    fn write_deltas(&mut self, deltas: &ScrollDeltas, continuous: bool);
}

/// Negate the integer deltas, and the point and fixed-point deltas for
/// continuous events. Fields that are not rewritten are left as given.
pub fn invert_deltas(deltas: &ScrollDeltas, continuous: bool) -> ScrollDeltas {
    let mut out = *deltas;
    // Raw field values may be i64::MIN
    out.line_y = deltas.line_y.wrapping_neg();
    out.line_x = deltas.line_x.wrapping_neg();

    if continuous {
        out.point_y = deltas.point_y.wrapping_neg();
        out.point_x = deltas.point_x.wrapping_neg();
        out.fixed_y = -deltas.fixed_y;
        out.fixed_x = -deltas.fixed_x;
    }

    out
}

/// Invert the deltas of `event` in place and return what was written
pub fn apply_inversion<E: ScrollEvent>(event: &mut E) -> ScrollDeltas {
    let sample = event.sample();
    let inverted = invert_deltas(&sample.deltas, sample.continuous);
    event.write_deltas(&inverted, sample.continuous);
    inverted
}


#[cfg(test)]
mod tests {
    use super::testing::FakeScroll;
    use super::*;

    fn smooth_deltas() -> ScrollDeltas {
        ScrollDeltas {
            line_y: -1,
            line_x: 2,
            point_y: -7,
            point_x: 3,
            fixed_y: -0.2,
            fixed_x: 0.1,
        }
    }

    #[test]
    fn test_wheel_inverts_line_deltas() {
        let mut event = FakeScroll::wheel(-10);
        let written = apply_inversion(&mut event);
        assert_eq!(written.line_y, 10);
        assert_eq!(event.deltas.line_y, 10);
        assert_eq!(event.deltas.line_x, 0);
    }

    #[test]
    fn test_discrete_leaves_precise_fields() {
        // Precise fields on a discrete event belong to the OS and stay untouched
        let mut deltas = ScrollDeltas::lines(4, -2);
        deltas.point_y = 40;
        deltas.fixed_y = 4.0;
        let out = invert_deltas(&deltas, false);
        assert_eq!(out.line_y, -4);
        assert_eq!(out.line_x, 2);
        assert_eq!(out.point_y, 40);
        assert_eq!(out.fixed_y, 4.0);
    }

    #[test]
    fn test_continuous_inverts_all_encodings() {
        let out = invert_deltas(&smooth_deltas(), true);
        assert_eq!(out.line_y, 1);
        assert_eq!(out.line_x, -2);
        assert_eq!(out.point_y, 7);
        assert_eq!(out.point_x, -3);
        assert_eq!(out.fixed_y, 0.2);
        assert_eq!(out.fixed_x, -0.1);
    }

    #[test]
    fn test_double_inversion_is_identity() {
        let mut event = FakeScroll::smooth(smooth_deltas());
        apply_inversion(&mut event);
        apply_inversion(&mut event);
        assert_eq!(event.deltas, smooth_deltas());
        assert_eq!(event.writes, 2);

        let mut wheel = FakeScroll::wheel(-3);
        apply_inversion(&mut wheel);
        apply_inversion(&mut wheel);
        assert_eq!(wheel.deltas, ScrollDeltas::lines(-3, 0));
    }

    #[test]
    fn test_extreme_values_wrap_instead_of_panicking() {
        let out = invert_deltas(&ScrollDeltas::lines(i64::MIN, i64::MAX), false);
        assert_eq!(out.line_y, i64::MIN);
        assert_eq!(out.line_x, -i64::MAX);
    }
}
