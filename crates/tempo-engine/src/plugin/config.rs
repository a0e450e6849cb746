/// Upper bound on client timers: each frame slot holds one query pair per
/// client timer plus one for the frame timer.
pub const MAX_TIMERS: u32 = wgpu::QUERY_SET_MAX_QUERIES / 2 - 1;

/// Configuration of the native timing plugin.
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Number of client timers the plugin can hold at once.
    ///
    /// Query sets cannot grow, so this is allocated up front. Requests beyond
    /// it are refused with a warning. Clamped to `1..=MAX_TIMERS`.
    pub max_timers: u32,
}

impl TimingConfig {
    pub(crate) fn timer_capacity(&self) -> u32 {
        self.max_timers.clamp(1, MAX_TIMERS)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { max_timers: 64 }
    }
}
