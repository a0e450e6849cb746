//! CPU frame timing.
//!
//! The runtime keeps one `FrameClock` and ticks it once per presented frame.
//! GPU durations come from [`crate::timing`] instead.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
