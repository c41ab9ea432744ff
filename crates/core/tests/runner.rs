use std::f32::consts::PI;

use fxlab_core::{
    builtin_registry, demos::BUILTIN_IDS, math::Rgba, AudioConfig, AudioEngine, AudioMode,
    BeatConfig, DemoOptions, MappingMatrix, MouseButton, RunState, Runner, Surface,
};

fn runner(width: u32, height: u32) -> Runner {
    let mut runner = Runner::new(builtin_registry());
    runner.bind_surface(Surface::new(width, height).unwrap());
    runner
}

#[test]
fn every_builtin_loads_runs_and_draws() {
    let mut runner = runner(64, 48);
    for id in BUILTIN_IDS {
        assert!(runner.load(id, &DemoOptions::new()), "{id} failed to load");
        assert_eq!(runner.active_id(), Some(id));

        for frame in 0..5 {
            assert!(runner.frame(frame as f64 * 16.0), "{id} skipped a frame");
        }
        runner.mouse_move(32.0, 24.0);
        runner.mouse_down(32.0, 24.0, MouseButton::Left);
        runner.mouse_up(32.0, 24.0, MouseButton::Left);
        runner.click(32.0, 24.0);
        assert!(runner.step(16.0));

        assert_eq!(runner.frame_count(), 6, "{id}");
        assert_eq!(runner.elapsed_ms(), 80.0, "{id}");
    }
}

#[test]
fn lifecycle_controls_gate_frames() {
    let mut runner = runner(32, 24);
    assert!(runner.load("plasma", &DemoOptions::new().with("speed", 2.0)));
    assert_eq!(runner.options().map(|o| o.number("speed", 0.0)), Some(2.0));

    assert!(runner.frame(0.0));
    assert!(runner.pause());
    assert!(!runner.frame(500.0));
    assert!(runner.resume());
    assert!(runner.frame(1000.0));
    // Paused time is not counted and the resume frame reports zero delta.
    assert_eq!(runner.elapsed_ms(), 0.0);
    assert!(runner.frame(1016.0));
    assert_eq!(runner.elapsed_ms(), 16.0);

    assert!(runner.stop());
    assert_eq!(runner.state(), Some(RunState::Stopped));
    assert!(!runner.step(16.0));
    assert!(runner.start());
    assert!(runner.step(16.0));

    runner.unload();
    assert_eq!(runner.state(), None);
    assert!(!runner.set_option("speed", 1.0));
}

#[test]
fn audio_features_drive_the_bars_demo() {
    let config = AudioConfig {
        sample_rate: 8_000,
        smoothing: 0.0,
        ..AudioConfig::default()
    };
    let audio = AudioEngine::with_config(AudioMode::Live, config, BeatConfig::default());
    let handle = audio.start().unwrap();
    let mut mappings = MappingMatrix::band_defaults();

    let mut runner = runner(80, 60);
    assert!(runner.load("audio-bars", &DemoOptions::new()));
    let background = {
        runner.step(16.0);
        runner.surface().unwrap().get(0, 0).unwrap()
    };

    let tone: Vec<f32> = (0..1024)
        .map(|i| 0.8 * (2.0 * PI * 100.0 * i as f32 / 8_000.0).sin())
        .collect();
    for frame in 0..30 {
        let audio_frame = audio.process(&tone, frame as f64 * 16.0).unwrap();
        for update in mappings.evaluate(&audio_frame) {
            assert!(runner.set_option(&update.target, f64::from(update.value)));
        }
        runner.step(16.0);
    }

    let options = runner.options().unwrap();
    assert!(options.number("bass", 0.0) > 0.3);
    assert!(options.number("bass", 0.0) > options.number("high", 0.0));
    assert!(runner.surface().unwrap().count_not(background) > 100);
    assert_eq!(handle.summary().unwrap().frames, 30);
    assert!(handle.latest().unwrap().analysis.bass > 0.3);
}

#[test]
fn unknown_demo_keeps_the_running_one() {
    let mut runner = runner(16, 16);
    assert!(runner.load("particles", &DemoOptions::new()));
    assert!(!runner.load("teapot", &DemoOptions::new()));
    assert_eq!(runner.active_id(), Some("particles"));
    assert_eq!(runner.state(), Some(RunState::Running));

    runner.click(8.0, 8.0);
    assert!(runner.step(16.0));
    assert!(runner.surface().unwrap().count_not(Rgba::BLACK) > 0);
}
