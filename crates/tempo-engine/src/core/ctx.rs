use std::cell::RefCell;
use std::rc::Rc;

use winit::window::{Window, WindowId};

use crate::device::Gpu;
use crate::plugin::{FrameTimer, FrameTimers, Plugin};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id:     WindowId,
    pub window: &'a Window,
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// GPU work must be queued through [`submit`](Self::submit) or
/// [`encode`](Self::encode) rather than on the wgpu queue directly: the
/// command stream is what places timer markers around it.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window:  WindowCtx<'a>,
    pub gpu:     &'a Gpu<'w>,
    pub target:  &'a wgpu::TextureView,
    pub time:    FrameTime,
    pub runtime: &'a mut RuntimeCtx,
    pub(crate) timers: &'a FrameTimers,
    pub(crate) plugin: &'a Rc<RefCell<Plugin>>,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Requests a GPU timer. It becomes usable after this frame's tick.
    pub fn create_gpu_timer(&self) -> FrameTimer {
        self.timers.create_gpu_timer()
    }

    /// Like [`create_gpu_timer`](Self::create_gpu_timer), with a label used in logs.
    pub fn create_named_gpu_timer(&self, label: impl Into<String>) -> FrameTimer {
        self.timers.create_named_gpu_timer(label)
    }

    /// Most recently completed frame's GPU time, in seconds.
    #[inline]
    pub fn gpu_frame_duration(&self) -> f32 {
        self.timers.frame_duration()
    }

    /// Queues recorded work at the current point of the command stream.
    pub fn submit(&self, commands: wgpu::CommandBuffer) {
        self.plugin.borrow_mut().stream_mut().push_commands(commands);
    }

    /// Records a command buffer with `record` and queues it.
    ///
    /// `record` receives a fresh encoder and the frame's target view.
    pub fn encode<F>(&self, label: &str, record: F)
    where
        F: FnOnce(&mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });
        record(&mut encoder, self.target);
        self.submit(encoder.finish());
    }

    /// Queues a pass that clears the frame target to `color`.
    pub fn clear(&self, color: wgpu::Color) {
        self.encode("tempo clear", |encoder, view| {
            let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("tempo clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load:  wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes:         None,
                occlusion_query_set:      None,
                multiview_mask:           None,
            });
        });
    }
}
