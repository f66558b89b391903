//! CoreGraphics session taps, HID key emitter and event adapters
//!
//! `CGEventTapCreate` is called directly rather than through
//! `core_graphics::event::CGEventTap` because the gesture event type (29)
//! has no `CGEventType` variant and must still be part of the mask.

use std::cell::{Cell, RefCell};
use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use core_foundation::base::TCFType;
use core_foundation::mach_port::CFMachPort;
use core_foundation::runloop::{
    kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop, CFRunLoopSource,
};
use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation, CGKeyCode};
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
use foreign_types::ForeignType;
use objc2::rc::autoreleasepool;
use objc2_app_kit::{NSEvent, NSTouchPhase};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::{resolve_decision, GatewayError, TapMode, TapVerdict};
use crate::config::Config;
use crate::dispatch::{KeyChord, KeyEmitter, KeyPhase, ScriptFallback, SynthesisError};
use crate::events::{EventKind, GestureSample, InputEvent, MomentumPhase, ScrollSample, TapDecision};
use crate::intercept::{InterceptStats, InterceptionContext};
use crate::modifier::ModifierFlags;
use crate::transform::{ScrollDeltas, ScrollEvent};

type CGEventRef = *mut c_void;
type CGEventTapProxy = *const c_void;
type TapCallback = extern "C" fn(CGEventTapProxy, u32, CGEventRef, *mut c_void) -> CGEventRef;

/// kCGSessionEventTap
const SESSION_EVENT_TAP: u32 = 1;
/// kCGHeadInsertEventTap / kCGTailAppendEventTap
const HEAD_INSERT: u32 = 0;
const TAIL_APPEND: u32 = 1;
/// kCGEventTapOptionDefault / kCGEventTapOptionListenOnly
const OPTION_DEFAULT: u32 = 0;
const OPTION_LISTEN_ONLY: u32 = 1;

/// Scroll wheel CGEventField numbers
mod fields {
    pub const DELTA_AXIS_1: u32 = 11;
    pub const DELTA_AXIS_2: u32 = 12;
    pub const IS_CONTINUOUS: u32 = 88;
    pub const FIXED_PT_DELTA_AXIS_1: u32 = 93;
    pub const FIXED_PT_DELTA_AXIS_2: u32 = 94;
    pub const POINT_DELTA_AXIS_1: u32 = 96;
    pub const POINT_DELTA_AXIS_2: u32 = 97;
    pub const MOMENTUM_PHASE: u32 = 123;
}

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: u32,
        place: u32,
        options: u32,
        events_of_interest: u64,
        callback: TapCallback,
        user_info: *mut c_void,
    ) -> *mut c_void;

    fn CGEventTapEnable(tap: *mut c_void, enable: bool);
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortInvalidate(port: *mut c_void);
}

type Route<'a> = dyn Fn(EventKind, &CGEvent) -> TapDecision + 'a;

/// Target of a tap's `user_info` pointer
struct TapHandler<'a> {
    mode: TapMode,
    route: &'a Route<'a>,
    stats: &'a InterceptStats,
    /// The tap's mach port, for re-enabling after the OS disables it
    port: Cell<*mut c_void>,
}

impl<'a> TapHandler<'a> {
    fn new(mode: TapMode, route: &'a Route<'a>, stats: &'a InterceptStats) -> Self {
        Self {
            mode,
            route,
            stats,
            port: Cell::new(ptr::null_mut()),
        }
    }

    fn reenable(&self) {
        let port = self.port.get();
        if !port.is_null() {
            warn!(mode = %self.mode, "event tap disabled by the system, re-enabling");
            unsafe { CGEventTapEnable(port, true) };
        }
    }
}

/// Called by the OS for every event matching a tap's mask. Must return fast.
extern "C" fn tap_callback(
    _proxy: CGEventTapProxy,
    raw_type: u32,
    event: CGEventRef,
    user_info: *mut c_void,
) -> CGEventRef {
    if user_info.is_null() {
        return event;
    }
    let handler = unsafe { &*(user_info as *const TapHandler<'_>) };

    let Some(kind) = EventKind::from_raw(raw_type) else {
        return event;
    };

    if kind == EventKind::TapDisabled {
        handler.reenable();
        return event;
    }

    if event.is_null() {
        return event;
    }

    // Borrowed from the OS; must not be released here
    let owned = ManuallyDrop::new(unsafe { CGEvent::from_ptr(event as *mut _) });
    let cg_event: &CGEvent = &owned;

    let outcome = catch_unwind(AssertUnwindSafe(|| (handler.route)(kind, cg_event)));
    match resolve_decision(handler.mode, outcome, handler.stats) {
        TapVerdict::Drop => ptr::null_mut(),
        TapVerdict::Deliver => event,
    }
}

/// An installed tap and its run loop source
struct InstalledTap {
    mode: TapMode,
    port: CFMachPort,
    source: CFRunLoopSource,
}

impl InstalledTap {
    fn install(handler: &TapHandler<'_>, kinds: &[EventKind]) -> Result<Self, GatewayError> {
        let mode = handler.mode;
        let (place, options) = match mode {
            TapMode::ListenOnly => (TAIL_APPEND, OPTION_LISTEN_ONLY),
            TapMode::Active => (HEAD_INSERT, OPTION_DEFAULT),
        };

        let raw = unsafe {
            CGEventTapCreate(
                SESSION_EVENT_TAP,
                place,
                options,
                EventKind::mask(kinds),
                tap_callback,
                handler as *const TapHandler<'_> as *mut c_void,
            )
        };
        if raw.is_null() {
            error!(%mode, "failed to create event tap - is Accessibility permission granted?");
            return Err(GatewayError::TapCreation { mode });
        }

        let port = unsafe { CFMachPort::wrap_under_create_rule(raw as _) };
        handler.port.set(raw);

        let source = port
            .create_runloop_source(0)
            .map_err(|_| GatewayError::RunLoopSource { mode })?;

        unsafe {
            CFRunLoop::get_current().add_source(&source, kCFRunLoopCommonModes);
            CGEventTapEnable(raw, true);
        }

        info!(%mode, ?kinds, "event tap created and enabled");
        Ok(Self { mode, port, source })
    }

    fn raw_port(&self) -> *mut c_void {
        self.port.as_concrete_TypeRef() as *mut c_void
    }
}

impl Drop for InstalledTap {
    fn drop(&mut self) {
        let raw = self.raw_port();
        unsafe {
            CGEventTapEnable(raw, false);
            CFRunLoop::get_current().remove_source(&self.source, kCFRunLoopCommonModes);
            CFMachPortInvalidate(raw);
        }
        info!(mode = %self.mode, "event tap removed");
    }
}

/// Body of the tap thread: install both taps, report readiness, then
/// pump the run loop until `running` is cleared
pub(super) fn run_taps(
    config: &Config,
    stats: Arc<InterceptStats>,
    running: &AtomicBool,
    runtime: Handle,
    ready: oneshot::Sender<Result<(), GatewayError>>,
) {
    let mut context = InterceptionContext::new(config, HidKeyEmitter, Arc::clone(&stats));
    if config.script_fallback {
        context = context.with_fallback(Box::new(ScriptFallback::new(runtime)));
    }
    let context = RefCell::new(context);

    let route = |kind: EventKind, event: &CGEvent| route_event(&context, kind, event);
    let gesture_handler = Box::new(TapHandler::new(TapMode::ListenOnly, &route, &stats));
    let active_handler = Box::new(TapHandler::new(TapMode::Active, &route, &stats));

    // Declared after the handlers so they are removed before the handlers drop
    let taps = InstalledTap::install(&gesture_handler, &[EventKind::Gesture]).and_then(|gesture| {
        let active = InstalledTap::install(
            &active_handler,
            &[EventKind::Scroll, EventKind::ModifierChanged],
        )?;
        Ok((gesture, active))
    });

    let taps = match taps {
        Ok(taps) => taps,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, Duration::from_millis(100), true);
        }
    }

    drop(taps);
}

fn route_event(
    context: &RefCell<InterceptionContext<HidKeyEmitter>>,
    kind: EventKind,
    event: &CGEvent,
) -> TapDecision {
    let Ok(mut context) = context.try_borrow_mut() else {
        return TapDecision::PassThrough;
    };
    let now = Instant::now();

    match kind {
        EventKind::Scroll => {
            let mut input = InputEvent::Scroll(TapScroll(event));
            context.handle(&mut input, now)
        }
        EventKind::ModifierChanged => {
            let mut input: InputEvent<TapScroll<'_>> =
                InputEvent::ModifierChanged(ModifierFlags(event.get_flags().bits()));
            context.handle(&mut input, now)
        }
        EventKind::Gesture => {
            let mut input: InputEvent<TapScroll<'_>> = InputEvent::Gesture(GestureSample {
                touching: touch_count(event),
            });
            context.handle(&mut input, now)
        }
        EventKind::TapDisabled => TapDecision::PassThrough,
    }
}

/// Scroll fields of a live CGEvent
struct TapScroll<'e>(&'e CGEvent);

impl ScrollEvent for TapScroll<'_> {
    fn sample(&self) -> ScrollSample {
        let event = self.0;
        ScrollSample {
            continuous: event.get_integer_value_field(fields::IS_CONTINUOUS) != 0,
            momentum: MomentumPhase::from_raw(event.get_integer_value_field(fields::MOMENTUM_PHASE)),
            deltas: ScrollDeltas {
                line_y: event.get_integer_value_field(fields::DELTA_AXIS_1),
                line_x: event.get_integer_value_field(fields::DELTA_AXIS_2),
                point_y: event.get_integer_value_field(fields::POINT_DELTA_AXIS_1),
                point_x: event.get_integer_value_field(fields::POINT_DELTA_AXIS_2),
                fixed_y: event.get_double_value_field(fields::FIXED_PT_DELTA_AXIS_1),
                fixed_x: event.get_double_value_field(fields::FIXED_PT_DELTA_AXIS_2),
            },
        }
    }

    fn write_deltas(&mut self, deltas: &ScrollDeltas, continuous: bool) {
        let event = self.0;
        // Line deltas first; setting them makes the system recompute the others
        event.set_integer_value_field(fields::DELTA_AXIS_1, deltas.line_y);
        event.set_integer_value_field(fields::DELTA_AXIS_2, deltas.line_x);

        if continuous {
            event.set_integer_value_field(fields::POINT_DELTA_AXIS_1, deltas.point_y);
            event.set_integer_value_field(fields::POINT_DELTA_AXIS_2, deltas.point_x);
            event.set_double_value_field(fields::FIXED_PT_DELTA_AXIS_1, deltas.fixed_y);
            event.set_double_value_field(fields::FIXED_PT_DELTA_AXIS_2, deltas.fixed_x);
        }
    }
}

/// Number of touches in contact for a gesture event, 0 if unknown
fn touch_count(event: &CGEvent) -> usize {
    // Both crates wrap the same CGEventRef
    let cg = unsafe { &*(event.as_ptr() as *const objc2_core_graphics::CGEvent) };

    autoreleasepool(|_| {
        let Some(ns_event) = NSEvent::eventWithCGEvent(cg) else {
            return 0;
        };

        ns_event
            .allTouches()
            .iter()
            .filter(|touch| is_touching(touch.phase()))
            .count()
    })
}

fn is_touching(phase: NSTouchPhase) -> bool {
    phase.contains(NSTouchPhase::Began)
        || phase.contains(NSTouchPhase::Moved)
        || phase.contains(NSTouchPhase::Stationary)
}

/// Posts key chords at the HID level, as if typed on a keyboard
pub(super) struct HidKeyEmitter;

impl HidKeyEmitter {
    fn key_event(
        source: &CGEventSource,
        chord: &KeyChord,
        phase: KeyPhase,
    ) -> Result<CGEvent, SynthesisError> {
        let event = CGEvent::new_keyboard_event(
            source.clone(),
            chord.keycode as CGKeyCode,
            phase == KeyPhase::Down,
        )
        .map_err(|_| SynthesisError::KeyEvent {
            keycode: chord.keycode,
            phase,
        })?;

        let flags = event.get_flags() | CGEventFlags::from_bits_truncate(chord.modifiers.bits());
        event.set_flags(flags);
        Ok(event)
    }
}

impl KeyEmitter for HidKeyEmitter {
    fn emit_chord(&self, chord: &KeyChord) -> Result<(), SynthesisError> {
        let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
            .map_err(|_| SynthesisError::EventSource)?;

        // Build both halves before posting so a failure never strands a key-down
        let key_down = Self::key_event(&source, chord, KeyPhase::Down)?;
        let key_up = Self::key_event(&source, chord, KeyPhase::Up)?;

        key_down.post(CGEventTapLocation::HID);
        std::thread::sleep(chord.gap);
        key_up.post(CGEventTapLocation::HID);

        Ok(())
    }
}
