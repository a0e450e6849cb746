/// Opaque identity of a native timer.
///
/// Identities are handed out by [`NativeBridge::create_timer`]. Negative values
/// never name a live timer; [`TimerId::UNASSIGNED`] is the sentinel carried by a
/// handle until the coordinator assigns it one.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TimerId(pub i32);

impl TimerId {
    /// Sentinel for "no native timer".
    pub const UNASSIGNED: Self = Self(-1);

    /// Returns `true` if this id can name a native timer.
    #[inline]
    pub fn is_assigned(self) -> bool {
        self.0 >= 0
    }

    /// Integer parameter carried by timer events.
    #[inline]
    pub fn raw(self) -> i32 {
        self.0
    }
}

impl Default for TimerId {
    fn default() -> Self {
        Self::UNASSIGNED
    }
}

/// Value reported for a duration that cannot be read.
pub const NO_DURATION: f32 = -1.0;

/// Parameter used by frame-marker events.
pub const FRAME_EVENT_PARAM: i32 = 0;

/// Boundary to the native timing plugin.
///
/// The coordinator depends on exactly these primitives. Events are not run
/// when issued: `issue_plugin_event` enqueues them into the frame-ordered
/// command stream, and the plugin executes them later in issue order. Duration
/// reads therefore always reflect previously completed GPU work.
pub trait NativeBridge {
    /// Reference to a render-side event callback.
    type Event: Copy;

    fn begin_frame_event(&self) -> Self::Event;
    fn end_frame_event(&self) -> Self::Event;
    fn begin_timer_event(&self) -> Self::Event;
    fn end_timer_event(&self) -> Self::Event;

    /// Enqueues `event` into the command stream, tagged with `param`
    /// (a timer identity, or [`FRAME_EVENT_PARAM`] for frame markers).
    fn issue_plugin_event(&mut self, event: Self::Event, param: i32);

    /// Allocates one native timer. May return [`TimerId::UNASSIGNED`] if the
    /// plugin has no usable device or has run out of timer slots.
    fn create_timer(&mut self) -> TimerId;

    /// Invalidates every identity handed out so far.
    fn release_timers(&mut self);

    /// Most recently completed interval of `id`, in seconds.
    fn timer_duration(&self, id: TimerId) -> f32;

    /// Most recently completed frame's GPU duration, in seconds.
    fn frame_timer_duration(&self) -> f32;
}
