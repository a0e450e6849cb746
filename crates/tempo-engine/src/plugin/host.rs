use crate::timing::TimerId;

use super::config::TimingConfig;
use super::stream::{CommandStream, StreamItem};
use super::timing::GpuTiming;

/// Duration reported while no device is attached.
pub const NO_DEVICE_DURATION: f32 = 0.0;

/// Graphics device lifecycle notification.
pub enum DeviceEvent {
    Initialize {
        device: wgpu::Device,
        queue: wgpu::Queue,
    },
    Shutdown,
}

struct DeviceHandles {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

/// Native side of the GPU timers.
///
/// Holds the device, the timestamp state and the command stream. Until a
/// device is attached (or if it lacks timestamp support) every event is
/// ignored, timer creation fails and durations read as
/// [`NO_DEVICE_DURATION`].
pub struct Plugin {
    config: TimingConfig,
    gpu: Option<DeviceHandles>,
    timing: Option<GpuTiming>,
    stream: CommandStream,
}

impl Plugin {
    pub fn new(config: TimingConfig) -> Self {
        Self {
            config,
            gpu: None,
            timing: None,
            stream: CommandStream::new(),
        }
    }

    pub fn on_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Initialize { device, queue } => {
                self.timing = match GpuTiming::new(&device, &queue, &self.config) {
                    Ok(timing) => {
                        log::info!(
                            "timing plugin initialized ({} timer slots)",
                            self.config.timer_capacity()
                        );
                        Some(timing)
                    }
                    Err(err) => {
                        log::warn!("GPU timers disabled: {err:#}");
                        None
                    }
                };
                self.gpu = Some(DeviceHandles { device, queue });
            }
            DeviceEvent::Shutdown => {
                self.stream.clear();
                self.timing = None;
                self.gpu = None;
                log::info!("timing plugin shut down");
            }
        }
    }

    /// Returns `true` if timestamps are being recorded.
    #[inline]
    pub fn is_timing(&self) -> bool {
        self.timing.is_some()
    }

    pub fn timing(&self) -> Option<&GpuTiming> {
        self.timing.as_ref()
    }

    pub fn stream(&self) -> &CommandStream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut CommandStream {
        &mut self.stream
    }

    pub fn create_timer(&mut self) -> TimerId {
        match self.timing.as_mut() {
            Some(t) => t.create_timer(),
            None => TimerId::UNASSIGNED,
        }
    }

    pub fn release_timers(&mut self) {
        if let Some(t) = self.timing.as_mut() {
            t.release_timers();
        }
    }

    pub fn timer_duration(&self, id: TimerId) -> f32 {
        match self.timing.as_ref() {
            Some(t) => t.timer_duration(id.raw()),
            None => NO_DEVICE_DURATION,
        }
    }

    pub fn frame_timer_duration(&self) -> f32 {
        match self.timing.as_ref() {
            Some(t) => t.frame_timer_duration(),
            None => NO_DEVICE_DURATION,
        }
    }

    /// Executes the command stream and submits it.
    ///
    /// Finished readbacks are collected first, without waiting on the GPU.
    /// Events run in stream order against an encoder that is closed before
    /// each client command buffer, and the whole sequence goes to the queue in
    /// one ordered submission. Readback maps for the frame that was just closed
    /// are requested afterwards.
    pub fn flush(&mut self) {
        let Some((device, queue)) = self
            .gpu
            .as_ref()
            .map(|g| (g.device.clone(), g.queue.clone()))
        else {
            self.stream.clear();
            return;
        };

        if let Some(t) = self.timing.as_mut() {
            t.collect();
        }

        let items = self.stream.take();
        let mut buffers = Vec::with_capacity(items.len());
        let mut encoder: Option<wgpu::CommandEncoder> = None;

        for item in items {
            match item {
                StreamItem::Event { func, param } => {
                    let enc = encoder.get_or_insert_with(|| {
                        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("tempo plugin events"),
                        })
                    });
                    func(self, enc, param);
                }
                StreamItem::Commands(commands) => {
                    if let Some(enc) = encoder.take() {
                        buffers.push(enc.finish());
                    }
                    buffers.push(commands);
                }
            }
        }

        if let Some(enc) = encoder.take() {
            buffers.push(enc.finish());
        }

        if !buffers.is_empty() {
            queue.submit(buffers);
        }

        if let Some(t) = self.timing.as_mut() {
            t.after_submit();
        }
    }
}

impl Drop for Plugin {
    fn drop(&mut self) {
        if self.gpu.is_some() {
            self.on_device_event(DeviceEvent::Shutdown);
        }
    }
}

pub fn on_begin_frame(plugin: &mut Plugin, encoder: &mut wgpu::CommandEncoder, _param: i32) {
    if let Some(t) = plugin.timing.as_mut() {
        t.begin_frame(encoder);
    }
}

pub fn on_end_frame(plugin: &mut Plugin, encoder: &mut wgpu::CommandEncoder, _param: i32) {
    if let Some(t) = plugin.timing.as_mut() {
        t.end_frame(encoder);
    }
}

pub fn on_begin_timer(plugin: &mut Plugin, encoder: &mut wgpu::CommandEncoder, id: i32) {
    if let Some(t) = plugin.timing.as_mut() {
        t.begin_timer(encoder, id);
    }
}

pub fn on_end_timer(plugin: &mut Plugin, encoder: &mut wgpu::CommandEncoder, id: i32) {
    if let Some(t) = plugin.timing.as_mut() {
        t.end_timer(encoder, id);
    }
}
