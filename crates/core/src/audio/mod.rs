use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::{
    AnalysisEngine, AnalysisFrame, AnalysisSummary, AudioConfig, AudioMode, BeatConfig,
    BeatDetector, FxError, Result,
};

/// Analysis features plus the beat detector's verdict for one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFrame {
    pub analysis: AnalysisFrame,
    pub beat: bool,
    pub beat_intensity: f32,
    pub bpm: u32,
}

#[derive(Debug)]
struct Pipeline {
    analysis: AnalysisEngine,
    detector: BeatDetector,
    latest: AudioFrame,
}

impl Pipeline {
    fn finish(&mut self, analysis: AnalysisFrame, timestamp_ms: f64) -> AudioFrame {
        self.detector.update(analysis.bass, timestamp_ms);
        self.latest = AudioFrame {
            analysis,
            beat: self.detector.is_beat(),
            beat_intensity: self.detector.beat_intensity(),
            bpm: self.detector.bpm(),
        };
        self.latest.clone()
    }
}

/// Energy extraction and beat detection behind one shared handle.
#[derive(Debug)]
pub struct AudioEngine {
    mode: AudioMode,
    audio_config: AudioConfig,
    beat_config: BeatConfig,
    pipeline: Arc<Mutex<Pipeline>>,
}

impl AudioEngine {
    /// Creates a new audio engine instance in the requested mode.
    pub fn new(mode: AudioMode) -> Self {
        Self::with_config(mode, AudioConfig::default(), BeatConfig::default())
    }

    /// Creates a new audio engine with explicit analysis and beat settings.
    pub fn with_config(mode: AudioMode, audio_config: AudioConfig, beat_config: BeatConfig) -> Self {
        let pipeline = Pipeline {
            analysis: AnalysisEngine::with_config(mode, audio_config.clone()),
            detector: BeatDetector::new(beat_config.clone()),
            latest: AudioFrame::default(),
        };
        Self {
            mode,
            audio_config,
            beat_config,
            pipeline: Arc::new(Mutex::new(pipeline)),
        }
    }

    /// Returns the currently configured audio mode.
    pub fn mode(&self) -> AudioMode {
        self.mode
    }

    /// Returns the sample rate the engine operates at.
    pub fn sample_rate(&self) -> u32 {
        self.audio_config.sample_rate
    }

    /// Returns the settings the beat detector was built with.
    pub fn beat_config(&self) -> &BeatConfig {
        &self.beat_config
    }

    /// Resets analysis and detector state and returns a handle for readers.
    pub fn start(&self) -> Result<AnalysisHandle> {
        {
            let mut pipeline = self.lock()?;
            pipeline.analysis.reset();
            pipeline.detector.reset();
            pipeline.latest = AudioFrame::default();
        }
        Ok(AnalysisHandle::new(self.pipeline.clone()))
    }

    /// Analyses a window taken at `timestamp_ms` and runs beat detection on
    /// its bass energy. Call once per rendered frame.
    pub fn process(&self, samples: &[f32], timestamp_ms: f64) -> Result<AudioFrame> {
        let mut pipeline = self.lock()?;
        let analysis = pipeline
            .analysis
            .process_window(samples, (timestamp_ms / 1000.0) as f32)?;
        Ok(pipeline.finish(analysis, timestamp_ms))
    }

    /// Feeds a contiguous block; its timestamp is derived from the stream
    /// position.
    pub fn push_samples(&self, samples: &[f32]) -> Result<Option<AudioFrame>> {
        if samples.is_empty() {
            return Ok(None);
        }
        let mut pipeline = self.lock()?;
        let analysis = pipeline.analysis.process_block(samples)?;
        let timestamp_ms = analysis.time as f64 * 1000.0;
        Ok(Some(pipeline.finish(analysis, timestamp_ms)))
    }

    fn lock(&self) -> Result<MutexGuard<'_, Pipeline>> {
        lock_pipeline(&self.pipeline)
    }
}

/// Shared, thread-safe view over the pipeline managed by [`AudioEngine`].
#[derive(Clone)]
pub struct AnalysisHandle {
    shared: Arc<Mutex<Pipeline>>,
}

impl AnalysisHandle {
    fn new(shared: Arc<Mutex<Pipeline>>) -> Self {
        Self { shared }
    }

    /// Returns the most recent frame, or a silent one before any audio arrived.
    pub fn latest(&self) -> Result<AudioFrame> {
        Ok(lock_pipeline(&self.shared)?.latest.clone())
    }

    /// Samples the analysis timeline at the requested time in seconds.
    pub fn sample_at(&self, seconds: f32) -> Result<AnalysisFrame> {
        Ok(lock_pipeline(&self.shared)?.analysis.sample_at(seconds))
    }

    /// Returns metadata collected so far about the analysed stream.
    pub fn summary(&self) -> Result<AnalysisSummary> {
        Ok(lock_pipeline(&self.shared)?.analysis.summary().clone())
    }

    /// Returns how many beats were detected since the engine started.
    pub fn beat_count(&self) -> Result<u64> {
        Ok(lock_pipeline(&self.shared)?.detector.beat_count())
    }
}

impl std::fmt::Debug for AnalysisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisHandle").finish()
    }
}

fn lock_pipeline(shared: &Mutex<Pipeline>) -> Result<MutexGuard<'_, Pipeline>> {
    shared
        .lock()
        .map_err(|_| FxError::msg("audio pipeline has been poisoned"))
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    fn config() -> AudioConfig {
        AudioConfig {
            sample_rate: 8_000,
            block_size: 512,
            smoothing: 0.0,
            ..AudioConfig::default()
        }
    }

    fn kick(len: usize, amplitude: f32) -> Vec<f32> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * 60.0 * i as f32 / 8_000.0).sin())
            .collect()
    }

    #[test]
    fn kicks_produce_beats_through_the_shared_handle() {
        let audio = AudioEngine::with_config(AudioMode::Live, config(), BeatConfig::default());
        let handle = audio.start().unwrap();

        let quiet = kick(512, 0.001);
        let loud = kick(512, 0.9);
        let mut beats = 0;
        for frame in 0..120 {
            let block = if frame >= 20 && frame % 30 == 0 { &loud } else { &quiet };
            let out = audio.process(block, frame as f64 * 20.0).unwrap();
            assert!((0.0..=1.0).contains(&out.beat_intensity));
            if out.beat {
                beats += 1;
            }
        }

        assert!(beats >= 3, "expected beats, got {beats}");
        assert_eq!(handle.beat_count().unwrap(), beats);
        assert!((handle.latest().unwrap().analysis.time - 2.38).abs() < 1e-4);
    }

    #[test]
    fn start_resets_the_pipeline() {
        let audio = AudioEngine::with_config(AudioMode::Precomputed, config(), BeatConfig::default());
        audio.push_samples(&kick(512, 0.5)).unwrap();
        assert_eq!(audio.push_samples(&[]).unwrap(), None);

        let handle = audio.start().unwrap();
        assert_eq!(handle.summary().unwrap().frames, 0);
        assert_eq!(handle.latest().unwrap(), AudioFrame::default());

        let frame = audio.push_samples(&kick(800, 0.5)).unwrap().unwrap();
        assert!(frame.analysis.rms > 0.0);
        assert_eq!(handle.sample_at(1.0).unwrap(), frame.analysis);
    }
}
