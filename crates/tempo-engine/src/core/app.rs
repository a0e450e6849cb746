use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::plugin::FrameTimers;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
pub trait App {
    /// Called once after the window and GPU exist, before the first frame.
    ///
    /// This is the place to request GPU timers. They become usable after the
    /// first frame's tick. The runtime owns `tick` and `teardown`; calling
    /// either from here breaks the once-per-frame ordering.
    fn on_start(&mut self, timers: &FrameTimers) {
        let _ = timers;
    }

    /// Called for window events.
    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called once per rendered frame, before the timer tick.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
