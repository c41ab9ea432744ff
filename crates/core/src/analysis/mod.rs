use std::{cmp::Ordering, f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};
use serde::{Deserialize, Serialize};

use crate::{AudioConfig, FxError, Result};

/// Upper edge of the bass band in Hz.
pub const BASS_MAX_HZ: f32 = 250.0;
/// Upper edge of the mid band in Hz; everything above is "high".
pub const MID_MAX_HZ: f32 = 4000.0;
const BASS_MIN_HZ: f32 = 20.0;

/// How analysed frames are retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioMode {
    /// Only the latest frame is kept.
    Live,
    /// Every frame is kept so the timeline can be sampled later.
    Precomputed,
}

/// Summary of the analysis metadata accumulated so far.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AnalysisSummary {
    pub sample_rate: u32,
    pub frames: usize,
    pub duration_seconds: Option<f32>,
}

/// Feature set for one analysis block. Band energies are normalised to
/// [0, 1] on a decibel scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisFrame {
    pub time: f32,
    pub rms: f32,
    /// Normalised [0, 1] spectral centroid where 1.0 corresponds to the
    /// Nyquist frequency of the analysed block.
    pub spectral_centroid: f32,
    pub bass: f32,
    pub mid: f32,
    pub high: f32,
}

/// Turns blocks of mono PCM into per-frame band energies.
pub struct AnalysisEngine {
    mode: AudioMode,
    config: AudioConfig,
    summary: AnalysisSummary,
    frames: Vec<AnalysisFrame>,
    processed_samples: usize,
    /// Smoothed per-bin levels in [0, 1], carried between blocks.
    levels: Vec<f32>,
    fft_planner: RealFftPlanner<f32>,
    fft: Option<FftResources>,
}

impl AnalysisEngine {
    /// Creates a new engine with the default audio configuration.
    pub fn new(mode: AudioMode) -> Self {
        Self::with_config(mode, AudioConfig::default())
    }

    /// Creates a new engine that operates with the provided configuration.
    pub fn with_config(mode: AudioMode, config: AudioConfig) -> Self {
        Self {
            mode,
            summary: AnalysisSummary {
                sample_rate: config.sample_rate,
                ..Default::default()
            },
            config,
            frames: Vec::new(),
            processed_samples: 0,
            levels: Vec::new(),
            fft_planner: RealFftPlanner::new(),
            fft: None,
        }
    }

    /// Returns metadata collected so far about the analysed stream.
    pub fn summary(&self) -> &AnalysisSummary {
        &self.summary
    }

    /// Returns the audio mode the engine operates in.
    pub fn mode(&self) -> AudioMode {
        self.mode
    }

    /// Returns the sample rate associated with the engine.
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Returns the analysis configuration.
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Clears the accumulated state while preserving configuration.
    pub fn reset(&mut self) {
        self.summary = AnalysisSummary {
            sample_rate: self.config.sample_rate,
            ..Default::default()
        };
        self.frames.clear();
        self.processed_samples = 0;
        self.levels.clear();
    }

    /// Analyses one block of samples in [-1, 1]. The block is treated as the
    /// window ending at the current stream position, so consecutive calls
    /// advance time by the block length.
    pub fn process_block(&mut self, samples: &[f32]) -> Result<AnalysisFrame> {
        if samples.len() < 2 {
            return Err(FxError::InvalidInput(
                "analysis requires blocks with at least two samples",
            ));
        }

        let block_size = samples.len();
        let sample_rate = self.config.sample_rate as f32;
        let start_time = self.processed_samples as f32 / sample_rate;
        let end_time = (self.processed_samples + block_size) as f32 / sample_rate;
        let time = start_time + (end_time - start_time) * 0.5;

        let frame = self.analyse(samples, time)?;

        self.processed_samples += block_size;
        self.summary.duration_seconds = Some(end_time);
        self.record(frame.clone());
        Ok(frame)
    }

    /// Analyses a window positioned at an explicit time. Used when windows
    /// overlap, as when one window is taken per rendered frame.
    pub fn process_window(&mut self, samples: &[f32], time: f32) -> Result<AnalysisFrame> {
        if samples.len() < 2 {
            return Err(FxError::InvalidInput(
                "analysis requires blocks with at least two samples",
            ));
        }

        let frame = self.analyse(samples, time)?;
        self.summary.duration_seconds = Some(
            self.summary
                .duration_seconds
                .map(|d| d.max(time))
                .unwrap_or(time),
        );
        self.record(frame.clone());
        Ok(frame)
    }

    /// Returns the latest frame emitted by the engine, if any.
    pub fn latest_frame(&self) -> Option<&AnalysisFrame> {
        self.frames.last()
    }

    /// Returns all recorded frames. Live engines keep only the latest.
    pub fn frames(&self) -> &[AnalysisFrame] {
        &self.frames
    }

    /// Samples the feature set at (or before) the requested time. If no frame
    /// exists before the timestamp a default frame is returned.
    pub fn sample_at(&self, time: f32) -> AnalysisFrame {
        match self
            .frames
            .binary_search_by(|frame| frame.time.partial_cmp(&time).unwrap_or(Ordering::Equal))
        {
            Ok(index) => self.frames[index].clone(),
            Err(0) => AnalysisFrame {
                time,
                ..Default::default()
            },
            Err(index) => self.frames[index - 1].clone(),
        }
    }

    fn record(&mut self, frame: AnalysisFrame) {
        if self.mode == AudioMode::Live {
            self.frames.clear();
        }
        self.frames.push(frame);
        self.summary.frames += 1;
    }

    fn analyse(&mut self, samples: &[f32], time: f32) -> Result<AnalysisFrame> {
        let rms = compute_rms(samples);
        let sample_rate = self.config.sample_rate as f32;
        let len = samples.len();
        let bin_hz = sample_rate / len as f32;
        let nyquist = sample_rate * 0.5;

        let AudioConfig {
            smoothing,
            min_db,
            max_db,
            ..
        } = self.config;

        let fft = self.prepare_fft(len)?;
        for (index, value) in samples.iter().enumerate() {
            fft.input[index] = *value * hann_value(index, len);
        }
        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)?;

        // A full-scale sine through a Hann window peaks at len / 4.
        let norm = 4.0 / len as f32;
        let spectrum: Vec<f32> = fft.spectrum.iter().map(|bin| bin.norm() * norm).collect();

        if self.levels.len() != spectrum.len() {
            self.levels = vec![0.0; spectrum.len()];
        }

        let mut magnitude_sum = 0.0_f32;
        let mut weighted_sum = 0.0_f32;
        for (i, &magnitude) in spectrum.iter().enumerate() {
            magnitude_sum += magnitude;
            weighted_sum += magnitude * (i as f32 * bin_hz);

            let db = 20.0 * magnitude.max(1e-12).log10();
            let level = ((db - min_db) / (max_db - min_db)).clamp(0.0, 1.0);
            self.levels[i] = self.levels[i] * smoothing + level * (1.0 - smoothing);
        }

        let spectral_centroid = if magnitude_sum <= f32::EPSILON {
            0.0
        } else {
            (weighted_sum / magnitude_sum / nyquist).clamp(0.0, 1.0)
        };

        Ok(AnalysisFrame {
            time,
            rms,
            spectral_centroid,
            bass: band_level(&self.levels, bin_hz, BASS_MIN_HZ, BASS_MAX_HZ),
            mid: band_level(&self.levels, bin_hz, BASS_MAX_HZ, MID_MAX_HZ),
            high: band_level(&self.levels, bin_hz, MID_MAX_HZ, nyquist),
        })
    }

    fn prepare_fft(&mut self, size: usize) -> Result<&mut FftResources> {
        let rebuild = self
            .fft
            .as_ref()
            .map(|fft| fft.size != size)
            .unwrap_or(true);

        if rebuild {
            let plan = self.fft_planner.plan_fft_forward(size);
            let scratch = plan.make_scratch_vec();
            let spectrum = plan.make_output_vec();
            let input = plan.make_input_vec();
            self.fft = Some(FftResources {
                size,
                plan,
                scratch,
                spectrum,
                input,
            });
        }

        self.fft
            .as_mut()
            .ok_or_else(|| FxError::Fft("fft plan unavailable".into()))
    }
}

/// Mean level of the bins whose centre frequency lies in `[low, high)`.
/// Bands narrower than one bin fall back to the nearest bin.
fn band_level(levels: &[f32], bin_hz: f32, low: f32, high: f32) -> f32 {
    if levels.is_empty() || bin_hz <= 0.0 {
        return 0.0;
    }
    let last = levels.len() - 1;
    let start = ((low / bin_hz).ceil() as usize).min(last);
    let end = ((high / bin_hz).ceil() as usize).clamp(start + 1, last + 1);
    let band = &levels[start..end];
    band.iter().sum::<f32>() / band.len() as f32
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for AnalysisEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisEngine")
            .field("mode", &self.mode)
            .field("config", &self.config)
            .field("summary", &self.summary)
            .field("frames", &self.frames.len())
            .field("processed_samples", &self.processed_samples)
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

fn compute_rms(samples: &[f32]) -> f32 {
    let sum: f32 = samples.iter().map(|sample| sample * sample).sum();
    (sum / samples.len() as f32).sqrt()
}

fn hann_value(index: usize, len: usize) -> f32 {
    if len <= 1 {
        return 1.0;
    }

    0.5 - 0.5 * ((2.0 * PI * index as f32) / (len as f32 - 1.0)).cos()
}
