mod audio_file;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fxlab_core::{
    builtin_registry, AppConfig, AudioConfig, AudioEngine, AudioMode, DemoOptions, FxError,
    MappingMatrix, OptionValue, Runner, Surface,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::audio_file::{read_wav, MonoClip};

fn main() -> fxlab_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::List { json } => run_list(json),
        Commands::Run(args) => run_demo(&config, args),
        Commands::Analyse { input, output } => run_analyse(&config, &input, output.as_deref()),
    }
}

fn run_list(json: bool) -> fxlab_core::Result<()> {
    let registry = builtin_registry();

    if json {
        let listing: Vec<ListingEntry<'_>> = registry
            .iter()
            .map(|(id, entry)| ListingEntry {
                id,
                metadata: &entry.metadata,
                controls: &entry.controls,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for (id, entry) in registry.iter() {
        let meta = &entry.metadata;
        println!(
            "{id:<16} {:<20} {:?}/{:?}  {}",
            meta.name, meta.category, meta.difficulty, meta.description
        );
    }
    Ok(())
}

fn run_demo(config: &AppConfig, args: RunArgs) -> fxlab_core::Result<()> {
    let mut runner_config = config.runner.clone();
    runner_config.width = args.width.unwrap_or(runner_config.width);
    runner_config.height = args.height.unwrap_or(runner_config.height);
    runner_config.fps = args.fps.unwrap_or(runner_config.fps);
    runner_config.validate()?;

    let options = parse_overrides(&args.set)?;
    let mut runner = Runner::new(builtin_registry());
    runner.bind_surface(Surface::new(runner_config.width, runner_config.height)?);
    runner.try_load(&args.id, &options)?;

    let audio = match &args.audio {
        Some(path) => Some(AudioDriver::open(path, config)?),
        None => None,
    };
    let mut mappings = MappingMatrix::band_defaults();

    tracing::info!(
        id = %args.id,
        frames = args.frames,
        width = runner_config.width,
        height = runner_config.height,
        fps = runner_config.fps,
        "running demo"
    );

    let frame_ms = runner_config.frame_ms();
    for index in 0..args.frames {
        let timestamp_ms = index as f64 * frame_ms;
        if let Some(driver) = &audio {
            let frame = driver.frame_at(timestamp_ms)?;
            if frame.beat {
                tracing::debug!(timestamp_ms, bpm = frame.bpm, "beat");
            }
            for update in mappings.evaluate(&frame) {
                runner.set_option(&update.target, f64::from(update.value));
            }
        }
        runner.frame(timestamp_ms);
    }

    tracing::info!(
        frames = runner.frame_count(),
        elapsed_ms = runner.elapsed_ms(),
        "finished"
    );

    if let Some(output) = &args.output {
        let surface = runner.surface().ok_or(FxError::NoSurface)?;
        write_png(surface, output)?;
        tracing::info!(output = %output.display(), "wrote frame");
    }
    Ok(())
}

fn run_analyse(config: &AppConfig, input: &Path, output: Option<&Path>) -> fxlab_core::Result<()> {
    tracing::info!(input = %input.display(), "analysing audio file");

    let clip = read_wav(input)?;
    let audio_config = AudioConfig {
        sample_rate: clip.sample_rate,
        ..config.audio.clone()
    };
    audio_config.validate()?;
    let block_size = audio_config.block_size;
    let engine = AudioEngine::with_config(AudioMode::Precomputed, audio_config, config.beat.clone());
    let handle = engine.start()?;

    let mut frames = Vec::new();
    for block in clip.samples.chunks(block_size).filter(|block| block.len() >= 2) {
        if let Some(frame) = engine.push_samples(block)? {
            frames.push(ReportFrame {
                time: frame.analysis.time,
                rms: frame.analysis.rms,
                bass: frame.analysis.bass,
                mid: frame.analysis.mid,
                high: frame.analysis.high,
                beat: frame.beat,
                beat_intensity: frame.beat_intensity,
            });
        }
    }

    let latest = handle.latest()?;
    let report = Report {
        input: input.display().to_string(),
        sample_rate: clip.sample_rate,
        duration_seconds: clip.duration_seconds(),
        beats: handle.beat_count()?,
        bpm: latest.bpm,
        frames,
    };
    tracing::info!(beats = report.beats, bpm = report.bpm, frames = report.frames.len(), "analysis complete");

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Parses repeated `--set name=value` arguments.
fn parse_overrides(pairs: &[String]) -> fxlab_core::Result<DemoOptions> {
    let mut options = DemoOptions::new();
    for pair in pairs {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| FxError::msg(format!("expected name=value, got `{pair}`")))?;
        let value: OptionValue = value.parse().unwrap_or_else(|never| match never {});
        options.set(name.trim(), value);
    }
    Ok(options)
}

fn write_png(surface: &Surface, path: &Path) -> fxlab_core::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    image::save_buffer_with_format(
        path,
        &surface.to_rgba8(),
        surface.width(),
        surface.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|err| FxError::msg(format!("failed to write {}: {err}", path.display())))
}

/// Feeds one analysis window per rendered frame from a decoded clip.
struct AudioDriver {
    clip: MonoClip,
    engine: AudioEngine,
    block_size: usize,
}

impl AudioDriver {
    fn open(path: &Path, config: &AppConfig) -> fxlab_core::Result<Self> {
        let clip = read_wav(path)?;
        let audio_config = AudioConfig {
            sample_rate: clip.sample_rate,
            ..config.audio.clone()
        };
        audio_config.validate()?;
        let block_size = audio_config.block_size;
        let engine = AudioEngine::with_config(AudioMode::Live, audio_config, config.beat.clone());
        engine.start()?;
        Ok(Self {
            clip,
            engine,
            block_size,
        })
    }

    fn frame_at(&self, timestamp_ms: f64) -> fxlab_core::Result<fxlab_core::AudioFrame> {
        let window = self.clip.window_ending_at(timestamp_ms / 1000.0, self.block_size);
        self.engine.process(&window, timestamp_ms)
    }
}

#[derive(Serialize)]
struct ListingEntry<'a> {
    id: &'a str,
    #[serde(flatten)]
    metadata: &'a fxlab_core::demo::DemoMetadata,
    controls: &'a [fxlab_core::demo::Control],
}

#[derive(Serialize)]
struct Report {
    input: String,
    sample_rate: u32,
    duration_seconds: f32,
    beats: u64,
    bpm: u32,
    frames: Vec<ReportFrame>,
}

#[derive(Serialize)]
struct ReportFrame {
    time: f32,
    rms: f32,
    bass: f32,
    mid: f32,
    high: f32,
    beat: bool,
    beat_intensity: f32,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless runner for the FxLab visual effects", long_about = None)]
struct Cli {
    /// JSON configuration file; missing fields use defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the built-in demos.
    List {
        /// Print metadata and controls as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run a demo headlessly for a number of frames.
    Run(RunArgs),
    /// Extract band energies and beats from a WAV file.
    Analyse {
        /// WAV file to analyse.
        input: PathBuf,
        /// Where to write the JSON report; stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Demo id, as printed by `list`.
    id: String,
    #[arg(long, default_value_t = 120)]
    frames: u32,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    #[arg(long)]
    fps: Option<u32>,
    /// Option override, `name=value`. May be repeated.
    #[arg(long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
    /// WAV file whose band energies drive the demo's options.
    #[arg(long)]
    audio: Option<PathBuf>,
    /// Write the final frame as a PNG.
    #[arg(short, long)]
    output: Option<PathBuf>,
}
