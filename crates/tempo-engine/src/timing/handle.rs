use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::bridge::{NativeBridge, TimerId, NO_DURATION};
use super::coordinator::Shared;

/// Per-timer state shared between a client handle and the pending queue.
///
/// The coordinator writes `id` exactly once, when it drains the queue.
pub(crate) struct TimerCell {
    id: Cell<TimerId>,
    active: Cell<bool>,
    label: Option<String>,
}

impl TimerCell {
    pub(crate) fn new(label: Option<String>) -> Self {
        Self {
            id: Cell::new(TimerId::UNASSIGNED),
            active: Cell::new(false),
            label,
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> TimerId {
        self.id.get()
    }

    #[inline]
    pub(crate) fn assign(&self, id: TimerId) {
        self.id.set(id);
    }

    #[inline]
    pub(crate) fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Client handle for one GPU timing interval.
///
/// Obtained from [`GpuTimers::create_gpu_timer`](super::GpuTimers::create_gpu_timer).
/// The handle has no native identity until the coordinator's next tick; until
/// then `begin`/`end` do nothing.
///
/// Out-of-sequence calls (double `begin`, `end` without `begin`) are absorbed
/// silently. They are counted by the coordinator and logged at trace level.
///
/// Once the coordinator is torn down or dropped, every call is a no-op and
/// [`duration`](Self::duration) returns [`NO_DURATION`].
pub struct GpuTimer<B: NativeBridge> {
    cell: Rc<TimerCell>,
    shared: Weak<Shared<B>>,
}

impl<B: NativeBridge> GpuTimer<B> {
    pub(crate) fn new(cell: Rc<TimerCell>, shared: Weak<Shared<B>>) -> Self {
        Self { cell, shared }
    }

    /// Marks the start of the timed GPU work.
    pub fn begin(&self) {
        let Some(shared) = self.live() else {
            return;
        };

        let id = self.cell.id();
        if !id.is_assigned() {
            shared.note_misuse("begin before identity assignment", &self.cell);
            return;
        }
        if self.cell.active.get() {
            shared.note_misuse("begin while already active", &self.cell);
            return;
        }

        // Re-entrant calls (from inside a bridge callback) find the bridge
        // borrowed and are absorbed like any other misuse.
        let Ok(mut bridge) = shared.bridge.try_borrow_mut() else {
            shared.note_misuse("begin while bridge is busy", &self.cell);
            return;
        };

        self.cell.active.set(true);
        let event = bridge.begin_timer_event();
        bridge.issue_plugin_event(event, id.raw());
    }

    /// Marks the end of the timed GPU work.
    pub fn end(&self) {
        let Some(shared) = self.live() else {
            return;
        };

        let id = self.cell.id();
        if !id.is_assigned() || !self.cell.active.get() {
            shared.note_misuse("end without matching begin", &self.cell);
            return;
        }

        let Ok(mut bridge) = shared.bridge.try_borrow_mut() else {
            shared.note_misuse("end while bridge is busy", &self.cell);
            return;
        };

        self.cell.active.set(false);
        let event = bridge.end_timer_event();
        bridge.issue_plugin_event(event, id.raw());
    }

    /// Duration of the most recently completed interval, in seconds.
    ///
    /// The value comes straight from the plugin and may belong to a frame
    /// several frames old. Before the first interval completes the plugin
    /// reports a negative value.
    pub fn duration(&self) -> f32 {
        let Some(shared) = self.live() else {
            return NO_DURATION;
        };
        match shared.bridge.try_borrow() {
            Ok(bridge) => bridge.timer_duration(self.cell.id()),
            Err(_) => {
                shared.note_misuse("duration while bridge is busy", &self.cell);
                NO_DURATION
            }
        }
    }

    /// Native identity, or [`TimerId::UNASSIGNED`] before the first tick.
    #[inline]
    pub fn id(&self) -> TimerId {
        self.cell.id()
    }

    #[inline]
    pub fn is_assigned(&self) -> bool {
        self.cell.id().is_assigned()
    }

    /// Returns `true` between a `begin` and its matching `end`.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.cell.active.get()
    }

    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.cell.label()
    }

    fn live(&self) -> Option<Rc<Shared<B>>> {
        self.shared.upgrade().filter(|s| s.is_active())
    }
}

impl<B: NativeBridge> fmt::Debug for GpuTimer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuTimer")
            .field("id", &self.cell.id())
            .field("active", &self.cell.active.get())
            .field("label", &self.cell.label())
            .finish()
    }
}
