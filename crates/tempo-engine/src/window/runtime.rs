use anyhow::{Context, Result};
use ouroboros::self_referencing;
use std::cell::RefCell;
use std::rc::Rc;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{App as CoreApp, AppControl, FrameCtx, WindowCtx};
use crate::device::{Gpu, GpuInit, SurfaceErrorAction};
use crate::plugin::{DeviceEvent, FrameTimers, Plugin, PluginBridge, TimingConfig};
use crate::time::FrameClock;

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    pub timing: TimingConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "tempo".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            timing: TimingConfig::default(),
        }
    }
}

/// Runtime context passed to the application.
///
/// Commands are buffered and applied after the current frame is presented.
#[derive(Default)]
pub struct RuntimeCtx {
    commands: Vec<Command>,
}

impl RuntimeCtx {
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.commands.push(Command::SetTitle(title.into()));
    }

    pub fn exit(&mut self) {
        self.commands.push(Command::Exit);
    }
}

enum Command {
    SetTitle(String),
    Exit,
}

/// Entry point for the runtime.
///
/// Owns one window, its GPU context, the timing plugin and the timer
/// coordinator. Each redraw runs, in order: clock tick, surface acquire,
/// `App::on_frame`, `FrameTimers::tick`, plugin flush (submission) and
/// present. The tick therefore always lands after the frame's content and
/// before presentation.
pub struct Runtime;

impl Runtime {
    pub fn run<A>(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Result<()>
    where
        A: 'static + CoreApp,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, gpu_init, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        Ok(())
    }
}

#[self_referencing]
struct WindowEntry {
    clock: FrameClock,
    plugin: Rc<RefCell<Plugin>>,
    timers: FrameTimers,

    window: Window,

    #[borrows(window)]
    #[covariant]
    gpu: Gpu<'this>,
}

impl WindowEntry {
    fn id(&self) -> WindowId {
        self.with_window(|w| w.id())
    }

    /// Releases timers first, then detaches the plugin from the device.
    fn shutdown(&self) {
        self.with(|fields| {
            fields.timers.teardown();
            fields
                .plugin
                .borrow_mut()
                .on_device_event(DeviceEvent::Shutdown);
        });
    }
}

struct AppState<A>
where
    A: CoreApp + 'static,
{
    config: RuntimeConfig,
    gpu_init: GpuInit,
    app: A,

    window: Option<WindowEntry>,
    exit_requested: bool,
}

impl<A> AppState<A>
where
    A: CoreApp + 'static,
{
    fn new(config: RuntimeConfig, gpu_init: GpuInit, app: A) -> Self {
        Self {
            config,
            gpu_init,
            app,
            window: None,
            exit_requested: false,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.exit_requested = true;
        event_loop.exit();
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = event_loop
            .create_window(attrs)
            .context("failed to create window")?;

        let plugin = Rc::new(RefCell::new(Plugin::new(self.config.timing.clone())));
        let timers = FrameTimers::new(PluginBridge::new(plugin.clone()));
        let gpu_init = self.gpu_init.clone();

        let entry = WindowEntryTryBuilder {
            clock: FrameClock::default(),
            plugin,
            timers,
            window,
            gpu_builder: |w| pollster::block_on(Gpu::new(w, gpu_init)),
        }
        .try_build()
        .context("GPU initialization failed")?;

        entry.with(|fields| {
            fields
                .plugin
                .borrow_mut()
                .on_device_event(DeviceEvent::Initialize {
                    device: fields.gpu.device().clone(),
                    queue: fields.gpu.queue().clone(),
                });
            fields.timers.initialize();
            self.app.on_start(fields.timers);
        });

        entry.with_window(|w| w.request_redraw());
        self.window = Some(entry);
        Ok(())
    }

    fn destroy_window_entry(&mut self) {
        if let Some(entry) = self.window.take() {
            entry.shutdown();
        }
    }

    fn apply_commands(&mut self, event_loop: &ActiveEventLoop, ctx: RuntimeCtx) {
        for cmd in ctx.commands {
            match cmd {
                Command::SetTitle(title) => {
                    if let Some(entry) = &self.window {
                        entry.with_window(|w| w.set_title(&title));
                    }
                }
                Command::Exit => self.request_exit(event_loop),
            }
        }
    }

    /// Drives one frame. Returns the app's control directive and buffered
    /// runtime commands.
    fn redraw(&mut self, window_id: WindowId) -> (AppControl, RuntimeCtx) {
        let mut runtime_ctx = RuntimeCtx::default();
        let mut control = AppControl::Continue;

        let (app, window) = (&mut self.app, &mut self.window);
        let Some(entry) = window.as_mut() else {
            return (control, runtime_ctx);
        };

        entry.with_mut(|fields| {
            let time = fields.clock.tick();

            let frame = match fields.gpu.begin_frame() {
                Ok(f) => f,
                Err(err) => {
                    if fields.gpu.handle_surface_error(err) == SurfaceErrorAction::Fatal {
                        log::error!("surface lost beyond recovery");
                        control = AppControl::Exit;
                    }
                    return;
                }
            };

            // Scope to ensure `ctx` is dropped before the tick and flush.
            {
                let mut ctx = FrameCtx {
                    window: WindowCtx {
                        id: window_id,
                        window: fields.window,
                    },
                    gpu: &*fields.gpu,
                    target: &frame.view,
                    time,
                    runtime: &mut runtime_ctx,
                    timers: &*fields.timers,
                    plugin: &*fields.plugin,
                };

                control = app.on_frame(&mut ctx);
            }

            fields.timers.tick();
            fields.plugin.borrow_mut().flush();

            fields.window.pre_present_notify();
            fields.gpu.present(frame);
        });

        (control, runtime_ctx)
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: CoreApp + 'static,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        if let Err(e) = self.create_window_entry(event_loop) {
            log::error!("failed to create window: {e:#}");
            self.request_exit(event_loop);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);

        // Continuous redraw: the timer tick has to run every frame.
        if let Some(entry) = &self.window {
            entry.with_window(|w| w.request_redraw());
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        if self.window.as_ref().map(|e| e.id()) != Some(window_id) {
            return;
        }

        if self.app.on_window_event(window_id, &event) == AppControl::Exit {
            self.request_exit(event_loop);
            return;
        }

        match &event {
            WindowEvent::CloseRequested => {
                self.destroy_window_entry();
                self.request_exit(event_loop);
            }

            WindowEvent::Resized(new_size) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_gpu_mut(|gpu| gpu.resize(*new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                if let Some(entry) = self.window.as_mut() {
                    let new_size = entry.with_window(|w| w.inner_size());
                    entry.with_gpu_mut(|gpu| gpu.resize(new_size));
                    entry.with_window(|w| w.request_redraw());
                }
            }

            WindowEvent::Occluded(false) => {
                if let Some(entry) = self.window.as_mut() {
                    entry.with_clock_mut(|c| c.reset());
                }
            }

            WindowEvent::RedrawRequested => {
                let (control, mut runtime_ctx) = self.redraw(window_id);
                if control == AppControl::Exit {
                    runtime_ctx.exit();
                }
                self.apply_commands(event_loop, runtime_ctx);
            }

            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.destroy_window_entry();
    }
}
