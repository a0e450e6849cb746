//! In-memory bridge that records every call it receives.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::bridge::{NativeBridge, TimerId, NO_DURATION};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Marker {
    BeginFrame,
    EndFrame,
    BeginTimer,
    EndTimer,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Event(Marker, i32),
    CreateTimer(TimerId),
    ReleaseTimers,
    TimerDuration(TimerId),
    FrameTimerDuration,
}

#[derive(Default)]
struct Inner {
    calls: Vec<Call>,
    next_id: i32,
    fail_creation: bool,
    durations: HashMap<TimerId, f32>,
    frame_duration: f32,
}

/// Cloning shares the call log, so a test can keep one copy while the
/// coordinator owns the other.
#[derive(Clone, Default)]
pub(crate) struct RecordingBridge {
    inner: Rc<RefCell<Inner>>,
}

impl RecordingBridge {
    pub(crate) fn calls(&self) -> Vec<Call> {
        self.inner.borrow().calls.clone()
    }

    pub(crate) fn clear(&self) {
        self.inner.borrow_mut().calls.clear();
    }

    pub(crate) fn fail_creation(&self, fail: bool) {
        self.inner.borrow_mut().fail_creation = fail;
    }

    pub(crate) fn set_duration(&self, id: TimerId, secs: f32) {
        self.inner.borrow_mut().durations.insert(id, secs);
    }

    pub(crate) fn set_frame_duration(&self, secs: f32) {
        self.inner.borrow_mut().frame_duration = secs;
    }
}

impl NativeBridge for RecordingBridge {
    type Event = Marker;

    fn begin_frame_event(&self) -> Marker {
        Marker::BeginFrame
    }

    fn end_frame_event(&self) -> Marker {
        Marker::EndFrame
    }

    fn begin_timer_event(&self) -> Marker {
        Marker::BeginTimer
    }

    fn end_timer_event(&self) -> Marker {
        Marker::EndTimer
    }

    fn issue_plugin_event(&mut self, event: Marker, param: i32) {
        self.inner.borrow_mut().calls.push(Call::Event(event, param));
    }

    fn create_timer(&mut self) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let id = if inner.fail_creation {
            TimerId::UNASSIGNED
        } else {
            let id = TimerId(inner.next_id);
            inner.next_id += 1;
            id
        };
        inner.calls.push(Call::CreateTimer(id));
        id
    }

    fn release_timers(&mut self) {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::ReleaseTimers);
        inner.durations.clear();
    }

    fn timer_duration(&self, id: TimerId) -> f32 {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::TimerDuration(id));
        inner.durations.get(&id).copied().unwrap_or(NO_DURATION)
    }

    fn frame_timer_duration(&self) -> f32 {
        let mut inner = self.inner.borrow_mut();
        inner.calls.push(Call::FrameTimerDuration);
        inner.frame_duration
    }
}
