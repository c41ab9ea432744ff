//! Energy-based beat detection over a rolling window of bass samples.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{FxError, Result};

/// Samples required before the detector starts reporting beats.
pub const MIN_HISTORY: usize = 10;
/// Number of beat timestamps kept for tempo estimation.
pub const MAX_BEAT_TIMES: usize = 16;
/// Inter-beat intervals outside this range (30 to 300 BPM) are ignored.
const MIN_INTERVAL_MS: f64 = 200.0;
const MAX_INTERVAL_MS: f64 = 2000.0;
const MIN_VALID_INTERVALS: usize = 3;
const EPSILON: f64 = 1e-4;

/// Tuning knobs for [`BeatDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeatConfig {
    /// Threshold multiplier applied to both the deviation and the mean.
    pub sensitivity: f32,
    /// Per-frame multiplicative decay of the beat intensity.
    pub decay_rate: f32,
    /// Minimum spacing between two reported beats.
    pub cooldown_ms: f64,
    /// Length of the rolling energy window.
    pub history_length: usize,
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.35,
            decay_rate: 0.9,
            cooldown_ms: 150.0,
            history_length: 30,
        }
    }
}

impl BeatConfig {
    /// Rejects settings the detector cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.sensitivity.is_finite() && self.sensitivity > 0.0) {
            return Err(FxError::InvalidConfig("beat.sensitivity must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.decay_rate) {
            return Err(FxError::InvalidConfig("beat.decay_rate must be in [0, 1]".into()));
        }
        if !(self.cooldown_ms.is_finite() && self.cooldown_ms >= 0.0) {
            return Err(FxError::InvalidConfig("beat.cooldown_ms must not be negative".into()));
        }
        if self.history_length < MIN_HISTORY {
            return Err(FxError::InvalidConfig(format!(
                "beat.history_length must be at least {MIN_HISTORY}"
            )));
        }
        Ok(())
    }
}

/// Whether the detector has gathered enough history to make decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorPhase {
    WarmingUp,
    Active,
}

/// Adaptive-threshold beat detector fed with one bass energy sample per frame.
#[derive(Debug, Clone)]
pub struct BeatDetector {
    config: BeatConfig,
    history: VecDeque<f32>,
    beat: bool,
    intensity: f32,
    beat_count: u64,
    last_beat_ms: Option<f64>,
    beat_times: VecDeque<f64>,
    bpm: u32,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self::new(BeatConfig::default())
    }
}

impl BeatDetector {
    /// Creates a detector in the warming-up phase.
    pub fn new(config: BeatConfig) -> Self {
        // A window shorter than the warm-up would never leave WarmingUp.
        let capacity = config.history_length.max(MIN_HISTORY);
        Self {
            config,
            history: VecDeque::with_capacity(capacity),
            beat: false,
            intensity: 0.0,
            beat_count: 0,
            last_beat_ms: None,
            beat_times: VecDeque::with_capacity(MAX_BEAT_TIMES),
            bpm: 0,
        }
    }

    /// Returns the configuration the detector was built with.
    pub fn config(&self) -> &BeatConfig {
        &self.config
    }

    /// Feeds one energy sample taken at `timestamp_ms`. The intensity decays
    /// once per call, after any beat on this sample has set it.
    pub fn update(&mut self, energy: f32, timestamp_ms: f64) {
        self.beat = false;

        let energy = if energy.is_finite() {
            energy.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let capacity = self.config.history_length.max(MIN_HISTORY);
        self.history.push_back(energy);
        while self.history.len() > capacity {
            self.history.pop_front();
        }

        if self.history.len() >= MIN_HISTORY {
            self.detect(energy as f64, timestamp_ms);
        }

        self.intensity = (self.intensity * self.config.decay_rate).clamp(0.0, 1.0);
    }

    fn detect(&mut self, energy: f64, timestamp_ms: f64) {
        let (mean, deviation) = mean_and_deviation(&self.history);
        let sensitivity = self.config.sensitivity as f64;
        let threshold = mean + sensitivity * deviation;

        let cooled_down = self
            .last_beat_ms
            .map(|last| timestamp_ms - last > self.config.cooldown_ms)
            .unwrap_or(true);

        if !(energy > threshold && energy > mean * sensitivity && cooled_down) {
            return;
        }

        self.beat = true;
        self.beat_count += 1;
        self.last_beat_ms = Some(timestamp_ms);
        self.intensity = ((energy - mean) / (mean + EPSILON)).clamp(0.0, 1.0) as f32;

        self.beat_times.push_back(timestamp_ms);
        while self.beat_times.len() > MAX_BEAT_TIMES {
            self.beat_times.pop_front();
        }
        if let Some(bpm) = estimate_bpm(&self.beat_times) {
            self.bpm = bpm;
        }

        tracing::trace!(
            timestamp_ms,
            energy,
            threshold,
            bpm = self.bpm,
            "beat detected"
        );
    }

    /// True when the most recent sample was classified as a beat.
    pub fn is_beat(&self) -> bool {
        self.beat
    }

    /// Decaying intensity of the last beat, always in [0, 1].
    pub fn beat_intensity(&self) -> f32 {
        self.intensity
    }

    /// Current tempo estimate; zero until enough beats were observed.
    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    /// Number of beats reported since construction or the last reset.
    pub fn beat_count(&self) -> u64 {
        self.beat_count
    }

    /// Returns whether the detector is still warming up.
    pub fn phase(&self) -> DetectorPhase {
        if self.history.len() < MIN_HISTORY {
            DetectorPhase::WarmingUp
        } else {
            DetectorPhase::Active
        }
    }

    /// Returns the detector to its freshly constructed state.
    pub fn reset(&mut self) {
        self.history.clear();
        self.beat = false;
        self.intensity = 0.0;
        self.beat_count = 0;
        self.last_beat_ms = None;
        self.beat_times.clear();
        self.bpm = 0;
    }
}

fn mean_and_deviation(values: &VecDeque<f32>) -> (f64, f64) {
    let count = values.len() as f64;
    let mean = values.iter().map(|v| *v as f64).sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|v| {
            let diff = *v as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count;
    (mean, variance.sqrt())
}

/// Median-based tempo from consecutive beat timestamps. Returns `None` when
/// fewer than three plausible intervals are available.
pub fn estimate_bpm(beat_times: &VecDeque<f64>) -> Option<u32> {
    let mut intervals: Vec<f64> = beat_times
        .iter()
        .zip(beat_times.iter().skip(1))
        .map(|(a, b)| b - a)
        .filter(|interval| (MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(interval))
        .collect();

    if intervals.len() < MIN_VALID_INTERVALS {
        return None;
    }

    intervals.sort_by(|a, b| a.total_cmp(b));
    let median = intervals[intervals.len() / 2];
    Some((60_000.0 / median).round() as u32)
}
