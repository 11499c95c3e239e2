use std::cell::Cell;

/// Receives pipeline progress as a fraction in [0, 1] plus a stage label.
pub trait ProgressSink {
    fn report(&self, fraction: f32, stage: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(f32, &str),
{
    fn report(&self, fraction: f32, stage: &str) {
        self(fraction, stage)
    }
}

/// Discards all progress.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _fraction: f32, _stage: &str) {}
}

/// Forwards to a sink while keeping the reported values non-decreasing.
pub struct ProgressTracker<'a> {
    sink: &'a dyn ProgressSink,
    last: Cell<f32>,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            last: Cell::new(0.0),
        }
    }

    pub fn report(&self, fraction: f32, stage: &str) {
        let value = fraction.clamp(0.0, 1.0).max(self.last.get());
        self.last.set(value);
        self.sink.report(value, stage);
    }

    pub fn last(&self) -> f32 {
        self.last.get()
    }

    /// Sub-range `[start, end)` owned by unit `index` of `count` within
    /// the span `[from, to)`.
    pub fn unit_range(index: usize, count: usize, from: f32, to: f32) -> (f32, f32) {
        let count = count.max(1) as f32;
        let width = (to - from) / count;
        let start = from + width * index as f32;
        (start, start + width)
    }
}
