//! Frame timing and delta time.
//!
//! The [`Time`] value is owned by the [`Hierarchy`](crate::hierarchy::Hierarchy)
//! and advanced once per `update` call with the caller-supplied frame delta.
//! Node hooks read it through [`NodeContext::time`](crate::context::NodeContext).

/// Frame timing. Advanced explicitly, so simulations are reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct Time {
    /// Delta of the current frame, in seconds.
    delta: f32,
    /// Total simulated time, in seconds.
    elapsed: f64,
    /// Frame counter.
    frame_count: u64,
}

impl Time {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance by one frame of `delta_secs`. Negative deltas count as zero.
    pub(crate) fn advance(&mut self, delta_secs: f32) {
        self.delta = delta_secs.max(0.0);
        self.elapsed += f64::from(self.delta);
        self.frame_count += 1;
    }

    /// Delta time in seconds (f32), the most common way to use it.
    pub fn delta_secs(&self) -> f32 {
        self.delta
    }

    /// Total elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed
    }

    /// Number of frames advanced so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Estimated FPS based on the last frame's delta.
    pub fn fps(&self) -> f32 {
        if self.delta > 0.0 {
            1.0 / self.delta
        } else {
            0.0
        }
    }
}
