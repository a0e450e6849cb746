use std::collections::VecDeque;
use std::rc::Rc;

use super::handle::TimerCell;

/// Timers that were requested but have not been given a native identity yet.
///
/// Producers push from `create_gpu_timer`; the coordinator's tick is the only
/// consumer. Both run on the render-loop thread, so no locking is involved.
#[derive(Default)]
pub(crate) struct PendingQueue {
    entries: VecDeque<Rc<TimerCell>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn push(&mut self, cell: Rc<TimerCell>) {
        self.entries.push_back(cell);
    }

    /// Removes every entry in arrival order.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Rc<TimerCell>> + '_ {
        self.entries.drain(..)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
