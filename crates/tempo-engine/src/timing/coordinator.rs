use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::bridge::{NativeBridge, FRAME_EVENT_PARAM, NO_DURATION};
use super::handle::{GpuTimer, TimerCell};
use super::queue::PendingQueue;

/// Lifecycle of a [`GpuTimers`] coordinator.
///
/// `Uninitialized → Active → Destroyed`. There is no way back to `Active`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CoordinatorState {
    Uninitialized,
    Active,
    Destroyed,
}

/// State reachable from both the coordinator and its handles.
pub(crate) struct Shared<B: NativeBridge> {
    pub(crate) bridge: RefCell<B>,
    pending: RefCell<PendingQueue>,
    state: Cell<CoordinatorState>,
    misuse: Cell<u64>,
}

impl<B: NativeBridge> Shared<B> {
    #[inline]
    pub(crate) fn is_active(&self) -> bool {
        self.state.get() == CoordinatorState::Active
    }

    pub(crate) fn note_misuse(&self, what: &str, cell: &TimerCell) {
        self.misuse.set(self.misuse.get().wrapping_add(1));
        log::trace!(
            "gpu timer {:?} ({}): ignored {what}",
            cell.id(),
            cell.label().unwrap_or("unnamed"),
        );
    }
}

/// Frame coordinator for deferred GPU timers.
///
/// Owns the native bridge and the pending-creation queue. Timer creation is
/// split into a request (`create_gpu_timer`, any time) and a commit
/// (`tick`, once per frame), so native timers are only ever allocated at one
/// point in the frame.
///
/// The coordinator is owned by whatever drives the render loop. It is
/// `!Send`: requests, ticks and handle calls all happen on that thread.
///
/// Dropping the coordinator tears it down.
pub struct GpuTimers<B: NativeBridge> {
    shared: Rc<Shared<B>>,
}

impl<B: NativeBridge> GpuTimers<B> {
    /// Wraps `bridge`. The coordinator starts `Uninitialized`.
    pub fn new(bridge: B) -> Self {
        Self {
            shared: Rc::new(Shared {
                bridge: RefCell::new(bridge),
                pending: RefCell::new(PendingQueue::new()),
                state: Cell::new(CoordinatorState::Uninitialized),
                misuse: Cell::new(0),
            }),
        }
    }

    /// Activates the coordinator. Idempotent; does nothing once destroyed.
    pub fn initialize(&self) {
        self.ensure_initialized();
    }

    /// Requests a new timer.
    ///
    /// The returned handle is unassigned until the next [`tick`](Self::tick).
    pub fn create_gpu_timer(&self) -> GpuTimer<B> {
        self.enqueue(None)
    }

    /// Like [`create_gpu_timer`](Self::create_gpu_timer), with a label used in logs.
    pub fn create_named_gpu_timer(&self, label: impl Into<String>) -> GpuTimer<B> {
        self.enqueue(Some(label.into()))
    }

    /// Per-frame processing.
    ///
    /// Must run once per rendered frame, after the frame's content has been
    /// queued and before it is presented. Issues the end-of-frame marker,
    /// assigns identities to every pending timer in request order, then issues
    /// the begin-of-frame marker. Returns how many timers were assigned.
    ///
    /// Does nothing unless the coordinator is active.
    pub fn tick(&self) -> usize {
        if !self.shared.is_active() {
            return 0;
        }

        let mut bridge = self.shared.bridge.borrow_mut();

        let end_frame = bridge.end_frame_event();
        bridge.issue_plugin_event(end_frame, FRAME_EVENT_PARAM);

        let mut assigned = 0;
        for cell in self.shared.pending.borrow_mut().drain() {
            let id = bridge.create_timer();
            cell.assign(id);
            assigned += 1;

            if id.is_assigned() {
                log::debug!(
                    "gpu timer {} assigned {:?}",
                    cell.label().unwrap_or("unnamed"),
                    id
                );
            } else {
                log::warn!(
                    "gpu timer {}: plugin could not create a native timer",
                    cell.label().unwrap_or("unnamed")
                );
            }
        }

        let begin_frame = bridge.begin_frame_event();
        bridge.issue_plugin_event(begin_frame, FRAME_EVENT_PARAM);

        assigned
    }

    /// Most recently completed frame's GPU duration, in seconds.
    pub fn frame_duration(&self) -> f32 {
        match self.shared.state.get() {
            CoordinatorState::Destroyed => NO_DURATION,
            _ => self.shared.bridge.borrow().frame_timer_duration(),
        }
    }

    /// Releases every native timer and moves to `Destroyed`.
    ///
    /// Outstanding handles become permanent no-ops. Calling this again, or
    /// dropping the coordinator afterwards, has no further effect.
    pub fn teardown(&self) {
        let prev = self.shared.state.replace(CoordinatorState::Destroyed);
        match prev {
            CoordinatorState::Destroyed => return,
            CoordinatorState::Active => {
                self.shared.bridge.borrow_mut().release_timers();
                log::info!("gpu timers released");
            }
            CoordinatorState::Uninitialized => {}
        }

        self.shared.pending.borrow_mut().clear();
    }

    #[inline]
    pub fn state(&self) -> CoordinatorState {
        self.shared.state.get()
    }

    /// Number of timers still waiting for an identity.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.shared.pending.borrow().len()
    }

    /// Number of out-of-sequence handle calls absorbed so far.
    #[inline]
    pub fn misuse_count(&self) -> u64 {
        self.shared.misuse.get()
    }

    fn ensure_initialized(&self) -> bool {
        match self.shared.state.get() {
            CoordinatorState::Active => true,
            CoordinatorState::Destroyed => false,
            CoordinatorState::Uninitialized => {
                self.shared.state.set(CoordinatorState::Active);
                log::info!("gpu timer coordinator active");
                true
            }
        }
    }

    fn enqueue(&self, label: Option<String>) -> GpuTimer<B> {
        let cell = Rc::new(TimerCell::new(label));

        // After teardown the handle is still returned, but it is never queued
        // and so never assigned.
        if self.ensure_initialized() {
            self.shared.pending.borrow_mut().push(cell.clone());
        }

        GpuTimer::new(cell, Rc::downgrade(&self.shared))
    }
}

impl<B: NativeBridge> Drop for GpuTimers<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timing::{TimerId, test_support::{Call, Marker, RecordingBridge}};

    fn coordinator() -> (GpuTimers<RecordingBridge>, RecordingBridge) {
        let bridge = RecordingBridge::default();
        (GpuTimers::new(bridge.clone()), bridge)
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    #[test]
    fn starts_uninitialized_and_ticks_are_noops() {
        let (timers, bridge) = coordinator();
        assert_eq!(timers.state(), CoordinatorState::Uninitialized);
        assert_eq!(timers.tick(), 0);
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn repeated_initialize_yields_one_active_coordinator() {
        let (timers, bridge) = coordinator();
        for _ in 0..5 {
            timers.initialize();
        }
        assert_eq!(timers.state(), CoordinatorState::Active);

        timers.teardown();
        timers.teardown();
        drop(timers);

        let releases = bridge
            .calls()
            .iter()
            .filter(|c| **c == Call::ReleaseTimers)
            .count();
        assert_eq!(releases, 1);
    }

    #[test]
    fn create_gpu_timer_initializes_lazily() {
        let (timers, _bridge) = coordinator();
        let _t = timers.create_gpu_timer();
        assert_eq!(timers.state(), CoordinatorState::Active);
        assert_eq!(timers.pending_len(), 1);
    }

    #[test]
    fn teardown_of_never_active_coordinator_releases_nothing() {
        let (timers, bridge) = coordinator();
        timers.teardown();
        assert_eq!(timers.state(), CoordinatorState::Destroyed);
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn initialize_after_teardown_stays_destroyed() {
        let (timers, bridge) = coordinator();
        timers.initialize();
        timers.teardown();
        timers.initialize();
        assert_eq!(timers.state(), CoordinatorState::Destroyed);

        let before = bridge.calls().len();
        assert_eq!(timers.tick(), 0);
        assert_eq!(bridge.calls().len(), before);
    }

    #[test]
    fn drop_releases_active_coordinator() {
        let (timers, bridge) = coordinator();
        timers.initialize();
        drop(timers);
        assert_eq!(bridge.calls(), vec![Call::ReleaseTimers]);
    }

    // ── deferred assignment ───────────────────────────────────────────────

    #[test]
    fn handle_is_unassigned_until_tick() {
        let (timers, bridge) = coordinator();
        let t = timers.create_gpu_timer();
        assert_eq!(t.id(), TimerId::UNASSIGNED);

        t.begin();
        t.end();
        assert!(bridge.calls().is_empty());
        assert!(!t.is_active());

        timers.tick();
        assert!(t.is_assigned());
        assert_eq!(timers.pending_len(), 0);
    }

    #[test]
    fn tick_emits_end_create_begin_in_order() {
        let (timers, bridge) = coordinator();
        let a = timers.create_named_gpu_timer("a");
        let b = timers.create_named_gpu_timer("b");
        assert_eq!(timers.pending_len(), 2);

        assert_eq!(timers.tick(), 2);

        assert_eq!(
            bridge.calls(),
            vec![
                Call::Event(Marker::EndFrame, 0),
                Call::CreateTimer(TimerId(0)),
                Call::CreateTimer(TimerId(1)),
                Call::Event(Marker::BeginFrame, 0),
            ]
        );
        assert_eq!(a.id(), TimerId(0));
        assert_eq!(b.id(), TimerId(1));
    }

    #[test]
    fn tick_without_pending_timers_still_emits_markers() {
        let (timers, bridge) = coordinator();
        timers.initialize();
        timers.tick();
        timers.tick();
        assert_eq!(
            bridge.calls(),
            vec![
                Call::Event(Marker::EndFrame, 0),
                Call::Event(Marker::BeginFrame, 0),
                Call::Event(Marker::EndFrame, 0),
                Call::Event(Marker::BeginFrame, 0),
            ]
        );
    }

    #[test]
    fn timers_created_after_a_tick_wait_for_the_next_one() {
        let (timers, _bridge) = coordinator();
        let a = timers.create_gpu_timer();
        timers.tick();
        let b = timers.create_gpu_timer();
        assert!(a.is_assigned());
        assert!(!b.is_assigned());
        timers.tick();
        assert_eq!(b.id(), TimerId(1));
    }

    #[test]
    fn failed_native_creation_leaves_handle_inert() {
        let (timers, bridge) = coordinator();
        bridge.fail_creation(true);
        let t = timers.create_gpu_timer();
        timers.tick();
        assert_eq!(t.id(), TimerId::UNASSIGNED);

        bridge.clear();
        t.begin();
        assert!(bridge.calls().is_empty());
    }

    // ── begin / end pairing ───────────────────────────────────────────────

    #[test]
    fn begin_end_issue_events_with_identity() {
        let (timers, bridge) = coordinator();
        let t = timers.create_gpu_timer();
        timers.tick();
        bridge.clear();

        t.begin();
        assert!(t.is_active());
        t.end();
        assert!(!t.is_active());

        assert_eq!(
            bridge.calls(),
            vec![
                Call::Event(Marker::BeginTimer, 0),
                Call::Event(Marker::EndTimer, 0),
            ]
        );
    }

    #[test]
    fn end_without_begin_is_absorbed() {
        let (timers, bridge) = coordinator();
        let t = timers.create_gpu_timer();
        timers.tick();
        bridge.clear();

        t.end();
        assert!(bridge.calls().is_empty());
        assert_eq!(timers.misuse_count(), 1);
    }

    #[test]
    fn double_begin_issues_one_event() {
        let (timers, bridge) = coordinator();
        let t = timers.create_gpu_timer();
        timers.tick();
        bridge.clear();

        t.begin();
        t.begin();
        t.end();
        t.end();

        assert_eq!(
            bridge.calls(),
            vec![
                Call::Event(Marker::BeginTimer, 0),
                Call::Event(Marker::EndTimer, 0),
            ]
        );
        assert_eq!(timers.misuse_count(), 2);
    }

    // ── durations ─────────────────────────────────────────────────────────

    #[test]
    fn duration_comes_from_bridge_unmodified() {
        let (timers, bridge) = coordinator();
        let _first = timers.create_gpu_timer();
        let t = timers.create_gpu_timer();
        timers.tick();

        t.begin();
        t.end();
        bridge.set_duration(TimerId(1), 0.003_25);
        bridge.clear();

        assert_eq!(t.duration(), 0.003_25);
        assert_eq!(bridge.calls(), vec![Call::TimerDuration(TimerId(1))]);
    }

    #[test]
    fn frame_duration_reads_frame_timer() {
        let (timers, bridge) = coordinator();
        bridge.set_frame_duration(0.016);
        assert_eq!(timers.frame_duration(), 0.016);
    }

    // ── teardown safety ───────────────────────────────────────────────────

    #[test]
    fn handles_are_inert_after_teardown() {
        let (timers, bridge) = coordinator();
        let t = timers.create_gpu_timer();
        timers.tick();
        t.begin();
        timers.teardown();
        bridge.clear();

        t.end();
        t.begin();
        assert_eq!(t.duration(), NO_DURATION);
        assert_eq!(timers.frame_duration(), NO_DURATION);
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn handles_outlive_dropped_coordinator() {
        let (timers, bridge) = coordinator();
        let t = timers.create_gpu_timer();
        timers.tick();
        drop(timers);
        bridge.clear();

        t.begin();
        t.end();
        assert_eq!(t.duration(), NO_DURATION);
        assert!(bridge.calls().is_empty());
    }

    #[test]
    fn timers_requested_after_teardown_are_never_assigned() {
        let (timers, bridge) = coordinator();
        timers.initialize();
        let pending = timers.create_gpu_timer();
        timers.teardown();
        let late = timers.create_gpu_timer();

        assert_eq!(timers.pending_len(), 0);
        timers.tick();
        assert!(!pending.is_assigned());
        assert!(!late.is_assigned());
        assert!(!bridge.calls().iter().any(|c| matches!(c, Call::CreateTimer(_))));
    }

    #[test]
    fn handle_calls_while_bridge_is_borrowed_are_absorbed() {
        let (timers, bridge) = coordinator();
        let t = timers.create_gpu_timer();
        timers.tick();
        bridge.clear();

        {
            let _busy = timers.shared.bridge.borrow_mut();
            t.begin();
            assert!(!t.is_active());
            assert_eq!(t.duration(), NO_DURATION);
        }
        assert_eq!(timers.misuse_count(), 2);
        assert!(bridge.calls().is_empty());

        t.begin();
        {
            let _busy = timers.shared.bridge.borrow_mut();
            t.end();
            assert!(t.is_active());
        }
        t.end();
        assert!(!t.is_active());
        assert_eq!(
            bridge.calls(),
            vec![
                Call::Event(Marker::BeginTimer, 0),
                Call::Event(Marker::EndTimer, 0),
            ]
        );
    }
}
