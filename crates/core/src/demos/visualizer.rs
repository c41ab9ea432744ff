//! Audio-reactive bars. The demo never touches audio itself: a host feeds
//! band energies and beat intensity in through the `bass`, `mid`, `high` and
//! `beat` options, usually from a `MappingMatrix`.

use glam::Vec2;

use crate::{
    demo::{Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty},
    math::{hsl_to_rgb, lerp, Rgba},
    Surface,
};

const BACKGROUND: Rgba = Rgba::rgb(8, 6, 16);
/// Exponential rate, per second, at which bars approach their targets.
const RESPONSE: f32 = 12.0;

#[derive(Debug, Clone)]
struct Params {
    bass: f32,
    mid: f32,
    high: f32,
    beat: f32,
    bar_count: usize,
    hue: f32,
    pulse: bool,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            bass: options.number_f32("bass", 0.0).clamp(0.0, 1.0),
            mid: options.number_f32("mid", 0.0).clamp(0.0, 1.0),
            high: options.number_f32("high", 0.0).clamp(0.0, 1.0),
            beat: options.number_f32("beat", 0.0).clamp(0.0, 1.0),
            bar_count: options.count("bar_count", 48).clamp(3, 512),
            hue: options.number_f32("hue", 260.0),
            pulse: options.flag("pulse", true),
        }
    }

    /// Band energy at `t` in [0, 1] across the spectrum, bass on the left.
    fn band_at(&self, t: f32) -> f32 {
        if t < 0.5 {
            lerp(self.bass, self.mid, t * 2.0)
        } else {
            lerp(self.mid, self.high, (t - 0.5) * 2.0)
        }
    }
}

#[derive(Debug)]
pub struct AudioBars {
    width: u32,
    height: u32,
    params: Params,
    bars: Vec<f32>,
    time: f32,
}

impl AudioBars {
    pub fn bars(&self) -> &[f32] {
        &self.bars
    }

    fn target(&self, index: usize) -> f32 {
        let t = index as f32 / (self.bars.len() - 1).max(1) as f32;
        let ripple = 0.9 + 0.1 * (self.time * 3.0 + index as f32 * 0.7).sin();
        (self.params.band_at(t) * ripple).clamp(0.0, 1.0)
    }
}

impl Demo for AudioBars {
    fn init(&mut self) {
        self.bars = vec![0.0; self.params.bar_count];
        self.time = 0.0;
    }

    fn update(&mut self, delta_ms: f32) {
        let dt = delta_ms / 1000.0;
        self.time += dt;
        let follow = 1.0 - (-RESPONSE * dt).exp();
        for i in 0..self.bars.len() {
            let target = self.target(i);
            self.bars[i] += (target - self.bars[i]) * follow;
        }
    }

    fn render(&self, surface: &mut Surface) {
        surface.clear(BACKGROUND);
        let (w, h) = (self.width as f32, self.height as f32);

        if self.params.pulse && self.params.beat > 0.0 {
            let radius = h * (0.1 + 0.25 * self.params.beat);
            let glow = hsl_to_rgb(self.params.hue + 40.0, 0.8, 0.5).with_alpha(0.35 + 0.4 * self.params.beat);
            surface.fill_circle(Vec2::new(w / 2.0, h / 2.0), radius, glow);
        }

        let slot = w / self.bars.len().max(1) as f32;
        let gap = (slot * 0.2).max(1.0).min(slot - 1.0).max(0.0);
        for (i, &level) in self.bars.iter().enumerate() {
            let bar_height = (level * h * 0.9).round() as i32;
            if bar_height <= 0 {
                continue;
            }
            let hue = self.params.hue + 120.0 * i as f32 / self.bars.len() as f32;
            let color = hsl_to_rgb(hue, 0.85, 0.35 + 0.3 * level);
            let x = (i as f32 * slot).round() as i32;
            let bar_width = ((slot - gap).round() as i32).max(1);
            surface.fill_rect(x, self.height as i32 - bar_height, bar_width, bar_height, color);
        }
    }

    fn options_changed(&mut self, name: &str, options: &DemoOptions) {
        self.params = Params::from_options(options);
        if name == "bar_count" {
            self.bars.resize(self.params.bar_count, 0.0);
        }
    }
}

impl DemoKind for AudioBars {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "Audio Bars",
            "Spectrum bars and a beat pulse driven by bass, mid and high band energy.",
            Difficulty::Beginner,
            Category::Audio,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::slider("bass", "Bass", 0.0, 1.0, 0.0),
            Control::slider("mid", "Mid", 0.0, 1.0, 0.0),
            Control::slider("high", "High", 0.0, 1.0, 0.0),
            Control::slider("beat", "Beat", 0.0, 1.0, 0.0),
            Control::stepped("bar_count", "Bars", 8.0, 256.0, 1.0, 48.0),
            Control::stepped("hue", "Hue", 0.0, 360.0, 1.0, 260.0),
            Control::checkbox("pulse", "Beat pulse", true),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        Self {
            width: context.width,
            height: context.height,
            params: Params::from_options(&context.options),
            bars: Vec::new(),
            time: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(options: DemoOptions) -> AudioBars {
        let mut demo = AudioBars::create(&DemoContext {
            width: 160,
            height: 100,
            options: AudioBars::default_options().merged(&options),
        });
        demo.init();
        demo
    }

    #[test]
    fn silent_input_keeps_bars_flat() {
        let mut demo = bars(DemoOptions::new());
        for _ in 0..30 {
            demo.update(16.0);
        }
        assert!(demo.bars().iter().all(|&b| b == 0.0));

        let mut surface = Surface::new(160, 100).unwrap();
        demo.render(&mut surface);
        assert_eq!(surface.count_not(BACKGROUND), 0);
    }

    #[test]
    fn bars_follow_band_levels() {
        let mut demo = bars(DemoOptions::new().with("bar_count", 16.0));
        let options = AudioBars::default_options()
            .with("bar_count", 16.0)
            .with("bass", 1.0)
            .with("mid", 0.5)
            .with("high", 0.0);
        demo.options_changed("bass", &options);
        for _ in 0..120 {
            demo.update(16.0);
        }

        let levels = demo.bars();
        assert_eq!(levels.len(), 16);
        assert!(levels[0] > 0.75, "{levels:?}");
        assert!(levels[15] < 0.05, "{levels:?}");
        assert!(levels[0] > levels[8] && levels[8] > levels[15]);
    }

    #[test]
    fn smoothing_lags_a_step_change() {
        let mut demo = bars(DemoOptions::new().with("bass", 1.0).with("mid", 1.0).with("high", 1.0));
        demo.update(16.0);
        assert!(demo.bars().iter().all(|&b| b > 0.0 && b < 0.5));
    }

    #[test]
    fn beat_draws_pulse() {
        let mut quiet = Surface::new(160, 100).unwrap();
        bars(DemoOptions::new()).render(&mut quiet);

        let mut loud = Surface::new(160, 100).unwrap();
        bars(DemoOptions::new().with("beat", 1.0)).render(&mut loud);
        assert!(loud.count_not(BACKGROUND) > quiet.count_not(BACKGROUND));

        let mut muted = Surface::new(160, 100).unwrap();
        bars(DemoOptions::new().with("beat", 1.0).with("pulse", false)).render(&mut muted);
        assert_eq!(muted.count_not(BACKGROUND), 0);
    }

    #[test]
    fn bar_count_resizes() {
        let mut demo = bars(DemoOptions::new());
        demo.options_changed("bar_count", &AudioBars::default_options().with("bar_count", 10.0));
        assert_eq!(demo.bars().len(), 10);
    }
}
