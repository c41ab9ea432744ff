//! Core library for FxLab.
//!
//! A set of self-contained visual-effect demos drawn into a CPU pixel
//! [`Surface`], the [`Runner`] that owns their lifecycle, and the audio side
//! that can drive them: an FFT band-energy extractor, a [`BeatDetector`] and
//! a [`MappingMatrix`] that routes features onto demo options.

pub mod analysis;
pub mod audio;
pub mod beat;
pub mod config;
pub mod demo;
pub mod demos;
pub mod error;
pub mod mapping;
pub mod math;
pub mod runner;
pub mod surface;
pub mod timeline;

pub use analysis::{AnalysisEngine, AnalysisFrame, AnalysisSummary, AudioMode};
pub use audio::{AnalysisHandle, AudioEngine, AudioFrame};
pub use beat::{BeatConfig, BeatDetector, DetectorPhase};
pub use config::{AppConfig, AudioConfig, RunnerConfig};
pub use demo::{Demo, DemoContext, DemoKind, DemoOptions, MouseButton, OptionValue};
pub use demos::builtin_registry;
pub use error::{FxError, Result};
pub use mapping::{AudioFeature, MappingDescriptor, MappingMatrix, ParameterUpdate};
pub use runner::{DemoEntry, DemoRegistry, RunState, Runner};
pub use surface::Surface;
pub use timeline::FrameClock;
