//! Headless wgpu device for tests that need real timestamp queries.
//!
//! Tests call [`timestamp_device`] and return early when it yields `None`,
//! so machines without a usable adapter skip rather than fail.

use std::time::Duration;

use super::timing::TIMESTAMP_FEATURES;

/// Frames (or polls) a test waits for an asynchronous readback.
const SETTLE_ATTEMPTS: usize = 200;
const SETTLE_PAUSE: Duration = Duration::from_millis(2);

pub(crate) fn timestamp_device() -> Option<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::PRIMARY,
        ..Default::default()
    });

    let adapter = match pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::LowPower,
        compatible_surface: None,
        force_fallback_adapter: false,
    })) {
        Ok(adapter) => adapter,
        Err(err) => {
            eprintln!("skipping: no wgpu adapter available ({err})");
            return None;
        }
    };

    if !adapter.features().contains(TIMESTAMP_FEATURES) {
        eprintln!("skipping: adapter lacks timestamp queries");
        return None;
    }

    match pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("tempo test device"),
        required_features: TIMESTAMP_FEATURES,
        required_limits: wgpu::Limits::downlevel_defaults(),
        experimental_features: wgpu::ExperimentalFeatures::disabled(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::Off,
    })) {
        Ok(pair) => Some(pair),
        Err(err) => {
            eprintln!("skipping: request_device failed ({err})");
            None
        }
    }
}

pub(crate) fn encoder(device: &wgpu::Device) -> wgpu::CommandEncoder {
    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("tempo test encoder"),
    })
}

/// Runs `step` until it returns `true`, pausing between attempts so the GPU
/// can finish outstanding readbacks. Returns `false` if it never does.
pub(crate) fn settle(mut step: impl FnMut() -> bool) -> bool {
    for _ in 0..SETTLE_ATTEMPTS {
        if step() {
            return true;
        }
        std::thread::sleep(SETTLE_PAUSE);
    }
    false
}
