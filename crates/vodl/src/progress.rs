/// Receives one tick per completed segment. Purely observational.
pub trait ProgressSink: Send + Sync {
    /// Called once before any segment is fetched.
    fn start(&self, _total: u64) {}
    fn tick(&self);
    fn finish(&self) {}
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn tick(&self) {}
}
