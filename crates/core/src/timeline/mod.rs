/// Per-instance frame bookkeeping: a monotonically increasing frame counter,
/// the delta of the most recent frame, and total elapsed time.
#[derive(Debug, Default, Clone)]
pub struct FrameClock {
    frame: u64,
    elapsed_ms: f64,
    last_delta_ms: f32,
    last_timestamp_ms: Option<f64>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Records a frame at the host timestamp and returns its delta. The first
    /// frame after a (re)start reports zero; time never runs backwards.
    pub fn tick(&mut self, timestamp_ms: f64) -> f32 {
        let delta = self
            .last_timestamp_ms
            .map(|last| (timestamp_ms - last).max(0.0))
            .unwrap_or(0.0);
        self.last_timestamp_ms = Some(timestamp_ms);
        self.advance(delta as f32)
    }

    /// Records a frame with an explicit delta.
    pub fn advance(&mut self, delta_ms: f32) -> f32 {
        let delta_ms = delta_ms.max(0.0);
        self.frame += 1;
        self.elapsed_ms += delta_ms as f64;
        self.last_delta_ms = delta_ms;
        delta_ms
    }

    /// Forgets the last host timestamp so time spent paused is not reported
    /// as one huge delta.
    pub fn suspend(&mut self) {
        self.last_timestamp_ms = None;
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn last_delta_ms(&self) -> f32 {
        self.last_delta_ms
    }
}
