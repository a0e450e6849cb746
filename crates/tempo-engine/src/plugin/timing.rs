use anyhow::Result;

use crate::timing::{NO_DURATION, TimerId};

use super::config::TimingConfig;
use super::slot::{FRAME_PAIR, FrameSlot, SlotState, pair_for_timer, ticks_to_seconds};

/// Features the device needs for the timing plugin.
pub const TIMESTAMP_FEATURES: wgpu::Features =
    wgpu::Features::TIMESTAMP_QUERY.union(wgpu::Features::TIMESTAMP_QUERY_INSIDE_ENCODERS);

/// Native timestamp bookkeeping for one device.
///
/// Frames alternate between two slots, so the GPU can still be working on
/// (or reading back) one frame while the next is recorded. Results are picked
/// up without waiting: a slot whose readback is still in flight when its turn
/// comes round is simply not measured that frame.
pub struct GpuTiming {
    device: wgpu::Device,
    slots: [FrameSlot; 2],
    /// Last completed duration per client timer, in seconds.
    timers: Vec<f32>,
    frame_duration: f32,
    capacity: usize,
    period_ns: f32,
    begin_frame_called: bool,
    frame_index: usize,
    frame_counter: u64,
    /// Bumped by `release_timers` so late readbacks cannot land on new timers.
    generation: u64,
}

impl GpuTiming {
    /// Creates the query sets and readback buffers.
    ///
    /// Fails if the device was created without [`TIMESTAMP_FEATURES`].
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, config: &TimingConfig) -> Result<Self> {
        let missing = TIMESTAMP_FEATURES - device.features();
        anyhow::ensure!(
            missing.is_empty(),
            "device lacks timestamp features: {missing:?}"
        );

        let capacity = config.timer_capacity() as usize;
        let pairs = capacity + 1;

        Ok(Self {
            device: device.clone(),
            slots: [
                FrameSlot::new(device, pairs, 0),
                FrameSlot::new(device, pairs, 1),
            ],
            timers: Vec::new(),
            frame_duration: NO_DURATION,
            capacity,
            period_ns: queue.get_timestamp_period(),
            begin_frame_called: false,
            frame_index: 0,
            frame_counter: 0,
            generation: 0,
        })
    }

    /// Allocates a client timer. Ids are dense and start at 0.
    pub fn create_timer(&mut self) -> TimerId {
        if self.timers.len() >= self.capacity {
            log::warn!("timer capacity ({}) exhausted", self.capacity);
            return TimerId::UNASSIGNED;
        }
        self.timers.push(NO_DURATION);
        TimerId((self.timers.len() - 1) as i32)
    }

    /// Number of frames closed so far.
    #[inline]
    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    /// Number of live client timers.
    #[inline]
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn begin_frame(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if self.begin_frame_called {
            return;
        }
        self.begin_frame_called = true;

        let slot = &mut self.slots[self.frame_index];
        if !slot.start_recording(self.generation) {
            log::debug!(
                "frame {}: readback slot {} still busy, skipping measurement",
                self.frame_counter,
                self.frame_index
            );
            return;
        }
        slot.write_begin(encoder, FRAME_PAIR);
    }

    pub fn end_frame(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if !self.begin_frame_called {
            return;
        }
        self.begin_frame_called = false;

        let slot = &mut self.slots[self.frame_index];
        slot.write_end(encoder, FRAME_PAIR);
        slot.encode_readback(encoder);

        self.frame_counter += 1;
        self.frame_index ^= 1;
    }

    pub fn begin_timer(&mut self, encoder: &mut wgpu::CommandEncoder, id: i32) {
        if let Some(pair) = self.pair(id) {
            self.slots[self.frame_index].write_begin(encoder, pair);
        }
    }

    pub fn end_timer(&mut self, encoder: &mut wgpu::CommandEncoder, id: i32) {
        if let Some(pair) = self.pair(id) {
            self.slots[self.frame_index].write_end(encoder, pair);
        }
    }

    /// Last completed duration of timer `id` in seconds; -1.0 for unknown ids
    /// or timers that have not completed an interval yet.
    pub fn timer_duration(&self, id: i32) -> f32 {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.timers.get(i).copied())
            .unwrap_or(NO_DURATION)
    }

    pub fn frame_timer_duration(&self) -> f32 {
        self.frame_duration
    }

    /// Closes the current frame and forgets every client timer.
    ///
    /// The frame timer survives; ids handed out earlier become invalid and
    /// events still queued for them are ignored.
    pub fn release_timers(&mut self) {
        self.begin_frame_called = false;
        self.timers.clear();
        self.generation += 1;
        for slot in &mut self.slots {
            slot.abandon();
        }
    }

    /// Requests mapping of slots whose readback commands were just submitted.
    pub fn after_submit(&mut self) {
        for slot in &mut self.slots {
            if slot.state() == SlotState::Encoded {
                slot.request_map();
            }
        }
    }

    /// Polls the device without blocking and folds finished readbacks into
    /// the stored durations.
    pub fn collect(&mut self) {
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {err}");
        }

        let period_ns = self.period_ns;
        let generation = self.generation;

        for slot in &mut self.slots {
            if slot.state() != SlotState::Ready {
                continue;
            }
            let current = slot.generation() == generation;
            let timers = &mut self.timers;
            let frame_duration = &mut self.frame_duration;

            slot.read(|pair, begin, end| {
                let Some(secs) = ticks_to_seconds(begin, end, period_ns) else {
                    return;
                };
                if pair == FRAME_PAIR {
                    *frame_duration = secs;
                } else if current {
                    if let Some(d) = timers.get_mut(pair - 1) {
                        *d = secs;
                    }
                }
            });
        }
    }

    fn pair(&self, id: i32) -> Option<usize> {
        let id = usize::try_from(id).ok()?;
        (id < self.timers.len()).then(|| pair_for_timer(id))
    }
}

impl Drop for GpuTiming {
    fn drop(&mut self) {
        for slot in &mut self.slots {
            slot.abandon();
        }
    }
}
