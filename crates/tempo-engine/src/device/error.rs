/// What the runtime should do after failing to acquire a surface frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame (the timer tick is skipped too).
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
