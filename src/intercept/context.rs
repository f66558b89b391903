//! The interception context and per-event routing
//!
//! One context exists per process. It is owned by the tap thread and
//! only ever touched from the event callback, so it needs no locking.

use std::sync::Arc;
use std::time::Instant;

use tracing::{trace, warn};

use super::stats::InterceptStats;
use crate::classify::{DeviceClass, ScrollClassifier};
use crate::config::Config;
use crate::dispatch::{DispatchOutcome, FallbackAction, GestureDispatcher, KeyEmitter};
use crate::events::{GestureSample, InputEvent, TapDecision};
use crate::modifier::{ModifierFlags, ModifierTracker};
use crate::transform::{apply_inversion, ScrollEvent};

/// Routing state shared by every tap callback
pub struct InterceptionContext<K: KeyEmitter> {
    modifier: ModifierTracker,
    classifier: ScrollClassifier,
    dispatcher: GestureDispatcher,
    emitter: K,
    fallback: Option<Box<dyn FallbackAction>>,
    invert_mouse: bool,
    desktop_switch: bool,
    stats: Arc<InterceptStats>,
}

impl<K: KeyEmitter> InterceptionContext<K> {
    pub fn new(config: &Config, emitter: K, stats: Arc<InterceptStats>) -> Self {
        Self {
            modifier: ModifierTracker::new(ModifierFlags::CONTROL),
            classifier: ScrollClassifier::new(config.classifier),
            dispatcher: GestureDispatcher::new(config.dispatch),
            emitter,
            fallback: None,
            invert_mouse: config.invert_mouse,
            desktop_switch: config.desktop_switch,
            stats,
        }
    }

    /// Install the action to launch when key synthesis fails
    pub fn with_fallback(mut self, fallback: Box<dyn FallbackAction>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    #[cfg(test)]
    pub fn emitter(&self) -> &K {
        &self.emitter
    }

    #[cfg(test)]
    pub fn modifier_pressed(&self) -> bool {
        self.modifier.is_pressed()
    }

    #[cfg(test)]
    pub fn last_class(&self) -> DeviceClass {
        self.classifier.last_class()
    }

    /// Route one event and decide what happens to it
    pub fn handle<S: ScrollEvent>(&mut self, event: &mut InputEvent<S>, now: Instant) -> TapDecision {
        match event {
            InputEvent::ModifierChanged(flags) => {
                self.modifier.update(*flags);
                TapDecision::PassThrough
            }
            InputEvent::Gesture(sample) => {
                self.handle_gesture(*sample, now);
                TapDecision::PassThrough
            }
            InputEvent::Scroll(scroll) => self.handle_scroll(scroll, now),
        }
    }

    fn handle_gesture(&mut self, sample: GestureSample, now: Instant) {
        self.stats.record_gesture();
        self.classifier.note_touches(sample.touching, now);
    }

    fn handle_scroll<S: ScrollEvent>(&mut self, scroll: &mut S, now: Instant) -> TapDecision {
        self.stats.record_scroll();

        let sample = scroll.sample();
        // Classify every event so the touch accumulator resets exactly once per scroll
        let (class, rule) = self.classifier.classify(&sample, now);
        trace!(%class, ?rule, continuous = sample.continuous, "scroll classified");

        if self.desktop_switch && self.modifier.is_pressed() {
            self.dispatch(sample.deltas.line_y, now);
            self.stats.record_consumed();
            return TapDecision::Consume;
        }

        if self.invert_mouse && class == DeviceClass::Mouse {
            apply_inversion(scroll);
            self.stats.record_inverted();
            return TapDecision::Mutated;
        }

        TapDecision::PassThrough
    }

    fn dispatch(&mut self, delta: i64, now: Instant) {
        let modifiers = self.modifier.designated();

        match self.dispatcher.offer(delta, modifiers, &self.emitter, now) {
            DispatchOutcome::Switched(_) => self.stats.record_switch(),
            DispatchOutcome::Failed(direction, e) => {
                warn!(%direction, error = %e, "desktop switch synthesis failed");
                self.stats.record_synthesis_failure();
                if let Some(fallback) = &self.fallback {
                    fallback.launch(direction);
                }
            }
            DispatchOutcome::CoolingDown => self.stats.record_cooldown(),
            DispatchOutcome::BelowThreshold => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::dispatch::testing::RecordingEmitter;
    use crate::dispatch::{keycodes, SwitchDirection};
    use crate::events::MomentumPhase;
    use crate::transform::testing::FakeScroll;
    use crate::transform::ScrollDeltas;

    type Event = InputEvent<FakeScroll>;

    fn create_context() -> (InterceptionContext<RecordingEmitter>, Arc<InterceptStats>) {
        create_context_with(RecordingEmitter::default(), Config::default())
    }

    fn create_context_with(
        emitter: RecordingEmitter,
        config: Config,
    ) -> (InterceptionContext<RecordingEmitter>, Arc<InterceptStats>) {
        let stats = Arc::new(InterceptStats::default());
        (InterceptionContext::new(&config, emitter, Arc::clone(&stats)), stats)
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn scroll_line(ctx: &mut InterceptionContext<RecordingEmitter>, delta: i64, now: Instant) -> (TapDecision, FakeScroll) {
        let mut event: Event = InputEvent::Scroll(FakeScroll::wheel(delta));
        let decision = ctx.handle(&mut event, now);
        match event {
            InputEvent::Scroll(scroll) => (decision, scroll),
            _ => unreachable!(),
        }
    }

    fn press_control(ctx: &mut InterceptionContext<RecordingEmitter>, now: Instant) {
        let mut event: Event = InputEvent::ModifierChanged(ModifierFlags::CONTROL);
        assert_eq!(ctx.handle(&mut event, now), TapDecision::PassThrough);
    }

    #[test]
    fn test_modifier_and_gesture_pass_through() {
        let (mut ctx, stats) = create_context();
        let t0 = Instant::now();

        press_control(&mut ctx, t0);
        assert!(ctx.modifier_pressed());

        let mut gesture: Event = InputEvent::Gesture(GestureSample { touching: 2 });
        assert_eq!(ctx.handle(&mut gesture, t0), TapDecision::PassThrough);
        assert_eq!(stats.snapshot().gestures, 1);
    }

    #[test]
    fn test_wheel_scroll_is_inverted() {
        let (mut ctx, stats) = create_context();

        let (decision, scroll) = scroll_line(&mut ctx, -10, Instant::now());
        assert_eq!(decision, TapDecision::Mutated);
        assert_eq!(scroll.deltas.line_y, 10);
        assert_eq!(ctx.last_class(), DeviceClass::Mouse);
        assert_eq!(stats.snapshot().inverted, 1);
    }

    #[test]
    fn test_trackpad_scroll_is_untouched() {
        let (mut ctx, _) = create_context();
        let t0 = Instant::now();

        let deltas = ScrollDeltas {
            line_y: -1,
            line_x: 0,
            point_y: -7,
            point_x: 3,
            fixed_y: -0.2,
            fixed_x: 0.1,
        };

        let mut gesture: Event = InputEvent::Gesture(GestureSample { touching: 2 });
        ctx.handle(&mut gesture, t0);

        let original = FakeScroll::smooth(deltas);
        let mut event: Event = InputEvent::Scroll(original.clone());
        let decision = ctx.handle(&mut event, t0 + ms(50));

        assert_eq!(decision, TapDecision::PassThrough);
        assert_eq!(ctx.last_class(), DeviceClass::Trackpad);
        match event {
            InputEvent::Scroll(scroll) => {
                assert_eq!(scroll, original);
                assert_eq!(scroll.writes, 0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_smooth_mouse_inverts_every_encoding() {
        let (mut ctx, _) = create_context();

        let deltas = ScrollDeltas {
            line_y: 2,
            line_x: 0,
            point_y: 20,
            point_x: 0,
            fixed_y: 2.5,
            fixed_x: 0.0,
        };
        let mut event: Event = InputEvent::Scroll(FakeScroll::smooth(deltas));
        assert_eq!(ctx.handle(&mut event, Instant::now()), TapDecision::Mutated);

        match event {
            InputEvent::Scroll(scroll) => {
                assert_eq!(scroll.deltas.line_y, -2);
                assert_eq!(scroll.deltas.point_y, -20);
                assert_eq!(scroll.deltas.fixed_y, -2.5);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_momentum_tail_keeps_trackpad() {
        let (mut ctx, _) = create_context();
        let t0 = Instant::now();

        let mut gesture: Event = InputEvent::Gesture(GestureSample { touching: 3 });
        ctx.handle(&mut gesture, t0);
        let mut first: Event = InputEvent::Scroll(FakeScroll::smooth(ScrollDeltas::lines(-2, 0)));
        ctx.handle(&mut first, t0 + ms(10));

        let tail = FakeScroll::smooth(ScrollDeltas::lines(-1, 0)).with_momentum(MomentumPhase::Continue);
        let mut event: Event = InputEvent::Scroll(tail);
        assert_eq!(ctx.handle(&mut event, t0 + ms(600)), TapDecision::PassThrough);
    }

    #[test]
    fn test_control_scroll_end_to_end() {
        let (mut ctx, stats) = create_context();
        let t0 = Instant::now();
        press_control(&mut ctx, t0);

        let (decision, scroll) = scroll_line(&mut ctx, 5, t0);
        assert_eq!(decision, TapDecision::Consume);
        // Consumed events are dropped, not rewritten
        assert_eq!(scroll.writes, 0);
        assert_eq!(ctx.emitter().keycodes(), vec![keycodes::LEFT_ARROW]);

        let (decision, _) = scroll_line(&mut ctx, 3, t0 + ms(50));
        assert_eq!(decision, TapDecision::Consume);
        assert_eq!(ctx.emitter().keycodes().len(), 1);

        let (decision, _) = scroll_line(&mut ctx, -5, t0 + ms(250));
        assert_eq!(decision, TapDecision::Consume);
        assert_eq!(
            ctx.emitter().keycodes(),
            vec![keycodes::LEFT_ARROW, keycodes::RIGHT_ARROW]
        );

        let chord = ctx.emitter().chords.borrow()[1];
        assert!(chord.modifiers.contains(ModifierFlags::CONTROL));

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.consumed, 3);
        assert_eq!(snapshot.switches, 2);
        assert_eq!(snapshot.cooldown_suppressed, 1);
        assert_eq!(snapshot.inverted, 0);
    }

    #[test]
    fn test_release_restores_inversion() {
        let (mut ctx, _) = create_context();
        let t0 = Instant::now();

        press_control(&mut ctx, t0);
        let mut release: Event = InputEvent::ModifierChanged(ModifierFlags::EMPTY);
        ctx.handle(&mut release, t0 + ms(5));

        let (decision, scroll) = scroll_line(&mut ctx, 4, t0 + ms(10));
        assert_eq!(decision, TapDecision::Mutated);
        assert_eq!(scroll.deltas.line_y, -4);
        assert!(ctx.emitter().keycodes().is_empty());
    }

    #[test]
    fn test_switching_disabled() {
        let config = Config {
            desktop_switch: false,
            ..Config::default()
        };
        let (mut ctx, _) = create_context_with(RecordingEmitter::default(), config);
        let t0 = Instant::now();

        press_control(&mut ctx, t0);
        let (decision, scroll) = scroll_line(&mut ctx, 4, t0);
        assert_eq!(decision, TapDecision::Mutated);
        assert_eq!(scroll.deltas.line_y, -4);
        assert!(ctx.emitter().keycodes().is_empty());
    }

    #[test]
    fn test_inversion_disabled() {
        let config = Config {
            invert_mouse: false,
            ..Config::default()
        };
        let (mut ctx, _) = create_context_with(RecordingEmitter::default(), config);

        let (decision, scroll) = scroll_line(&mut ctx, -10, Instant::now());
        assert_eq!(decision, TapDecision::PassThrough);
        assert_eq!(scroll.deltas.line_y, -10);
    }

    struct RecordingFallback(Rc<RefCell<Vec<SwitchDirection>>>);

    impl FallbackAction for RecordingFallback {
        fn launch(&self, direction: SwitchDirection) {
            self.0.borrow_mut().push(direction);
        }
    }

    #[test]
    fn test_synthesis_failure_launches_fallback() {
        let launched = Rc::new(RefCell::new(Vec::new()));
        let (ctx, stats) = create_context_with(RecordingEmitter::failing(), Config::default());
        let mut ctx = ctx.with_fallback(Box::new(RecordingFallback(Rc::clone(&launched))));
        let t0 = Instant::now();

        press_control(&mut ctx, t0);
        let (decision, _) = scroll_line(&mut ctx, -2, t0);

        // The event is still consumed and the callback carries on
        assert_eq!(decision, TapDecision::Consume);
        assert_eq!(*launched.borrow(), vec![SwitchDirection::Next]);
        assert_eq!(stats.snapshot().synthesis_failures, 1);
    }
}
