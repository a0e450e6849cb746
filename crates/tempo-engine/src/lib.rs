//! Tempo engine crate.
//!
//! GPU frame and section timing on top of a wgpu/winit runtime. The
//! `timing` module holds the backend-agnostic timer coordinator, `plugin`
//! implements its native side with wgpu timestamp queries, and the
//! remaining modules own the platform + GPU runtime that drives both.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod plugin;
pub mod timing;
