use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Byte distance between resolved query pairs in the resolve/readback buffers.
///
/// Pairs are resolved one at a time, so each destination offset has to meet
/// the resolve alignment.
pub(crate) const PAIR_STRIDE: u64 = wgpu::QUERY_RESOLVE_BUFFER_ALIGNMENT;

/// Query pair of the frame timer. Client timer `i` uses pair `i + 1`.
pub(crate) const FRAME_PAIR: usize = 0;

#[inline]
pub(crate) fn pair_for_timer(id: usize) -> usize {
    id + 1
}

#[inline]
pub(crate) fn begin_query(pair: usize) -> u32 {
    (pair * 2) as u32
}

#[inline]
pub(crate) fn end_query(pair: usize) -> u32 {
    (pair * 2 + 1) as u32
}

/// Index of a pair's begin tick in the readback buffer viewed as `u64`s.
#[inline]
pub(crate) fn readback_word(pair: usize) -> usize {
    pair * (PAIR_STRIDE as usize / std::mem::size_of::<u64>())
}

/// Converts a begin/end tick pair to seconds.
///
/// `period_ns` is the queue's timestamp period. Returns `None` if the ticks
/// run backwards, which happens when a timestamp was not actually written.
pub(crate) fn ticks_to_seconds(begin: u64, end: u64, period_ns: f32) -> Option<f32> {
    if end < begin {
        return None;
    }
    let ns = (end - begin) as f64 * period_ns as f64;
    Some((ns / 1_000_000_000.0) as f32)
}

/// Readback progress of one frame slot.
///
/// `Free → Recording → Encoded → Mapping → Ready → Free`. The transition to
/// `Ready` (or back to `Free` on failure) is made by the map callback.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub(crate) enum SlotState {
    Free = 0,
    Recording = 1,
    Encoded = 2,
    Mapping = 3,
    Ready = 4,
}

impl SlotState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => SlotState::Recording,
            2 => SlotState::Encoded,
            3 => SlotState::Mapping,
            4 => SlotState::Ready,
            _ => SlotState::Free,
        }
    }
}

/// Shared slot state, written by the map callback.
#[derive(Debug, Clone)]
pub(crate) struct SharedState(Arc<AtomicU8>);

impl SharedState {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(SlotState::Free as u8)))
    }

    #[inline]
    pub(crate) fn get(&self) -> SlotState {
        SlotState::from_u8(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn set(&self, state: SlotState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Which timestamps of each pair were written during the slot's frame.
#[derive(Debug, Clone, Default)]
pub(crate) struct PairWrites {
    writes: Vec<(bool, bool)>,
}

impl PairWrites {
    pub(crate) fn with_pairs(pairs: usize) -> Self {
        Self { writes: vec![(false, false); pairs] }
    }

    pub(crate) fn reset(&mut self) {
        self.writes.fill((false, false));
    }

    pub(crate) fn mark_begin(&mut self, pair: usize) {
        if let Some(w) = self.writes.get_mut(pair) {
            // A second begin restarts the interval.
            *w = (true, false);
        }
    }

    pub(crate) fn mark_end(&mut self, pair: usize) {
        if let Some(w) = self.writes.get_mut(pair) {
            if w.0 {
                w.1 = true;
            }
        }
    }

    /// Pairs with both timestamps written.
    pub(crate) fn complete(&self) -> impl Iterator<Item = usize> + '_ {
        self.writes
            .iter()
            .enumerate()
            .filter(|(_, w)| w.0 && w.1)
            .map(|(i, _)| i)
    }

    /// One past the highest complete pair, or 0.
    pub(crate) fn extent(&self) -> usize {
        self.complete().last().map_or(0, |i| i + 1)
    }
}

/// GPU resources and bookkeeping for one of the two in-flight frames.
pub(crate) struct FrameSlot {
    query_set: wgpu::QuerySet,
    resolve: wgpu::Buffer,
    readback: wgpu::Buffer,
    state: SharedState,
    writes: PairWrites,
    /// Release generation the recorded data belongs to.
    generation: u64,
    /// Bytes copied into `readback` for the current recording.
    copied: u64,
}

impl FrameSlot {
    pub(crate) fn new(device: &wgpu::Device, pairs: usize, index: usize) -> Self {
        let query_set = device.create_query_set(&wgpu::QuerySetDescriptor {
            label: Some(&format!("tempo timestamps {index}")),
            ty: wgpu::QueryType::Timestamp,
            count: (pairs * 2) as u32,
        });

        let size = pairs as u64 * PAIR_STRIDE;

        let resolve = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("tempo timestamp resolve {index}")),
            size,
            usage: wgpu::BufferUsages::QUERY_RESOLVE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let readback = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("tempo timestamp readback {index}")),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            query_set,
            resolve,
            readback,
            state: SharedState::new(),
            writes: PairWrites::with_pairs(pairs),
            generation: 0,
            copied: 0,
        }
    }

    #[inline]
    pub(crate) fn state(&self) -> SlotState {
        self.state.get()
    }

    #[inline]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Starts recording a frame. Returns `false` if the previous readback of
    /// this slot has not finished, in which case the frame goes unmeasured.
    pub(crate) fn start_recording(&mut self, generation: u64) -> bool {
        if self.state() != SlotState::Free {
            return false;
        }
        self.writes.reset();
        self.generation = generation;
        self.copied = 0;
        self.state.set(SlotState::Recording);
        true
    }

    pub(crate) fn write_begin(&mut self, encoder: &mut wgpu::CommandEncoder, pair: usize) {
        if self.state() != SlotState::Recording {
            return;
        }
        encoder.write_timestamp(&self.query_set, begin_query(pair));
        self.writes.mark_begin(pair);
    }

    pub(crate) fn write_end(&mut self, encoder: &mut wgpu::CommandEncoder, pair: usize) {
        if self.state() != SlotState::Recording {
            return;
        }
        encoder.write_timestamp(&self.query_set, end_query(pair));
        self.writes.mark_end(pair);
    }

    /// Resolves every complete pair and copies the results to the readback
    /// buffer. The slot then waits for [`request_map`](Self::request_map).
    pub(crate) fn encode_readback(&mut self, encoder: &mut wgpu::CommandEncoder) {
        if self.state() != SlotState::Recording {
            return;
        }

        let extent = self.writes.extent();
        if extent == 0 {
            self.state.set(SlotState::Free);
            return;
        }

        for pair in self.writes.complete() {
            encoder.resolve_query_set(
                &self.query_set,
                begin_query(pair)..end_query(pair) + 1,
                &self.resolve,
                pair as u64 * PAIR_STRIDE,
            );
        }

        self.copied = extent as u64 * PAIR_STRIDE;
        encoder.copy_buffer_to_buffer(&self.resolve, 0, &self.readback, 0, self.copied);
        self.state.set(SlotState::Encoded);
    }

    /// Requests an asynchronous map of the readback buffer. Only valid once
    /// the commands from [`encode_readback`](Self::encode_readback) are submitted.
    pub(crate) fn request_map(&mut self) {
        if self.state() != SlotState::Encoded {
            return;
        }

        self.state.set(SlotState::Mapping);
        let state = self.state.clone();
        self.readback
            .slice(..self.copied)
            .map_async(wgpu::MapMode::Read, move |result| match result {
                Ok(()) => state.set(SlotState::Ready),
                Err(err) => {
                    log::warn!("timestamp readback failed: {err}");
                    state.set(SlotState::Free);
                }
            });
    }

    /// Reads a mapped slot, calling `f(pair, begin, end)` for each complete
    /// pair, then unmaps it and frees the slot.
    pub(crate) fn read(&mut self, mut f: impl FnMut(usize, u64, u64)) {
        if self.state() != SlotState::Ready {
            return;
        }

        {
            let view = self.readback.slice(..self.copied).get_mapped_range();
            match bytemuck::try_cast_slice::<u8, u64>(&view) {
                Ok(words) => {
                    for pair in self.writes.complete() {
                        let at = readback_word(pair);
                        if let (Some(&begin), Some(&end)) = (words.get(at), words.get(at + 1)) {
                            f(pair, begin, end);
                        }
                    }
                }
                Err(err) => log::warn!("timestamp readback has unexpected layout: {err}"),
            }
        }

        self.readback.unmap();
        self.state.set(SlotState::Free);
    }

    /// Drops any recording that has not been handed to the GPU for mapping.
    ///
    /// A slot that is already mapping finishes on its own; its data is then
    /// discarded by generation.
    pub(crate) fn abandon(&mut self) {
        match self.state() {
            SlotState::Recording | SlotState::Encoded => self.state.set(SlotState::Free),
            SlotState::Ready => {
                self.readback.unmap();
                self.state.set(SlotState::Free);
            }
            SlotState::Free | SlotState::Mapping => {}
        }
    }
}
