use std::time::{Duration, Instant};

use tempo_engine::core::{App, AppControl, FrameCtx};
use tempo_engine::device::GpuInit;
use tempo_engine::logging::{init_logging, LoggingConfig};
use tempo_engine::plugin::{FrameTimer, FrameTimers};
use tempo_engine::timing::NO_DURATION;
use tempo_engine::window::{Runtime, RuntimeConfig};
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::WindowId;

const REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// Formats a duration in seconds as milliseconds; negative values mean no
/// measurement yet.
fn millis(secs: f32) -> String {
    if secs < 0.0 {
        "--".to_string()
    } else {
        format!("{:.3}", secs * 1000.0)
    }
}

/// Clears the window every frame and reports CPU and GPU timings.
struct Studio {
    clear_timer: Option<FrameTimer>,
    last_report: Instant,
    frames_since_report: u32,
}

impl Studio {
    fn new() -> Self {
        Self {
            clear_timer: None,
            last_report: Instant::now(),
            frames_since_report: 0,
        }
    }

    fn clear_color(t: f32) -> wgpu::Color {
        wgpu::Color {
            r: 0.10 + 0.05 * (t * 0.7).sin() as f64,
            g: 0.12,
            b: 0.16 + 0.05 * (t * 0.4).cos() as f64,
            a: 1.0,
        }
    }
}

impl App for Studio {
    fn on_start(&mut self, timers: &FrameTimers) {
        self.clear_timer = Some(timers.create_named_gpu_timer("clear"));
    }

    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key: Key::Named(NamedKey::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => AppControl::Exit,
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        let elapsed = ctx.time.now.duration_since(self.last_report);
        let color = Self::clear_color(ctx.time.frame_index as f32 / 60.0);

        if let Some(timer) = &self.clear_timer {
            timer.begin();
            ctx.clear(color);
            timer.end();
        } else {
            ctx.clear(color);
        }

        self.frames_since_report += 1;
        if elapsed >= REPORT_INTERVAL {
            let fps = self.frames_since_report as f32 / elapsed.as_secs_f32();
            let gpu = millis(ctx.gpu_frame_duration());
            let clear = millis(self.clear_timer.as_ref().map_or(NO_DURATION, |t| t.duration()));

            let report = format!(
                "FPS:{fps:.1} ({:.2} ms), GPU:{gpu} ms, Clear:{clear} ms",
                1000.0 / fps
            );
            log::info!("{report}");
            ctx.runtime.set_title(report);

            self.last_report = ctx.time.now;
            self.frames_since_report = 0;
        }

        AppControl::Continue
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "Tempo Studio".to_string(),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), Studio::new())
}
