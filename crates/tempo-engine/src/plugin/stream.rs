use super::host::Plugin;

/// Render-side event callback.
///
/// Runs when the command stream is flushed, with the plugin, an encoder that
/// is submitted at the event's position in the stream, and the integer
/// parameter the event was issued with.
pub type RenderEventFn = fn(&mut Plugin, &mut wgpu::CommandEncoder, i32);

/// One entry of the command stream.
pub enum StreamItem {
    Event { func: RenderEventFn, param: i32 },
    Commands(wgpu::CommandBuffer),
}

/// Ordered stream of plugin events and client command buffers.
///
/// Everything pushed during a frame executes and submits in push order when
/// the plugin flushes, which is what keeps timer and frame markers correctly
/// placed around the GPU work they measure.
#[derive(Default)]
pub struct CommandStream {
    items: Vec<StreamItem>,
}

impl CommandStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `func` to run at this point of the stream.
    pub fn issue_plugin_event(&mut self, func: RenderEventFn, param: i32) {
        self.items.push(StreamItem::Event { func, param });
    }

    /// Enqueues recorded client work.
    pub fn push_commands(&mut self, commands: wgpu::CommandBuffer) {
        self.items.push(StreamItem::Commands(commands));
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[StreamItem] {
        &self.items
    }

    /// Removes and returns everything queued so far.
    pub(crate) fn take(&mut self) -> Vec<StreamItem> {
        std::mem::take(&mut self.items)
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }
}
