//! In-process timing plugin on wgpu.
//!
//! This is the native collaborator behind [`crate::timing::NativeBridge`]:
//! it owns the timestamp query sets, runs the four render events and
//! submits the command stream. The runtime drives it through
//! [`Plugin::on_device_event`] and [`Plugin::flush`].

mod bridge;
mod config;
mod host;
mod slot;
mod stream;
mod timing;

#[cfg(test)]
pub(crate) mod test_support;

pub use bridge::{FrameTimer, FrameTimers, PluginBridge};
pub use config::{TimingConfig, MAX_TIMERS};
pub use host::{
    on_begin_frame, on_begin_timer, on_end_frame, on_end_timer, DeviceEvent, Plugin,
    NO_DEVICE_DURATION,
};
pub use stream::{CommandStream, RenderEventFn, StreamItem};
pub use timing::{GpuTiming, TIMESTAMP_FEATURES};
