//! Deferred GPU timers.
//!
//! Clients request timers at any time; the coordinator commits them to the
//! native plugin at one fixed point per frame, between the end-of-frame and
//! begin-of-frame markers. Results are polled, never waited for.
//!
//! ```text
//! create_gpu_timer ──► PendingQueue ──tick──► NativeBridge::create_timer
//!                                               │
//! GpuTimer::begin/end ──► issue_plugin_event ───┘──► command stream
//! GpuTimer::duration  ──► NativeBridge::timer_duration
//! ```
//!
//! The bridge is a trait so the coordinator can run against the wgpu plugin
//! (`crate::plugin`) or any other backend.

mod bridge;
mod coordinator;
mod handle;
mod queue;

#[cfg(test)]
pub(crate) mod test_support;

pub use bridge::{NativeBridge, TimerId, FRAME_EVENT_PARAM, NO_DURATION};
pub use coordinator::{CoordinatorState, GpuTimers};
pub use handle::GpuTimer;
