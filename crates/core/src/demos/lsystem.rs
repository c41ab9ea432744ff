use std::collections::HashMap;

use glam::Vec2;

use crate::{
    demo::{Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty},
    math::{hsl_to_rgb, Ease, Rgba},
    Surface,
};

/// Expansion stops growing once the string passes this length.
const MAX_SENTENCE: usize = 400_000;
const MARGIN: f32 = 0.05;

/// A named rewriting system with its turtle turn angle.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub axiom: &'static str,
    pub rules: &'static [(char, &'static str)],
    pub angle: f32,
    /// Initial heading in degrees, 0 pointing right, -90 pointing up.
    pub heading: f32,
}

pub const PRESETS: [Preset; 4] = [
    Preset {
        name: "Fractal plant",
        axiom: "X",
        rules: &[('X', "F+[[X]-X]-F[-FX]+X"), ('F', "FF")],
        angle: 25.0,
        heading: -65.0,
    },
    Preset {
        name: "Koch curve",
        axiom: "F",
        rules: &[('F', "F+F-F-F+F")],
        angle: 90.0,
        heading: 0.0,
    },
    Preset {
        name: "Sierpinski triangle",
        axiom: "F-G-G",
        rules: &[('F', "F-G+F+G-F"), ('G', "GG")],
        angle: 120.0,
        heading: 0.0,
    },
    Preset {
        name: "Dragon curve",
        axiom: "FX",
        rules: &[('X', "X+YF+"), ('Y', "-FX-Y")],
        angle: 90.0,
        heading: 0.0,
    },
];

/// Applies the rules `iterations` times. Symbols without a rule are copied.
pub fn expand(axiom: &str, rules: &[(char, &str)], iterations: u32) -> String {
    let table: HashMap<char, &str> = rules.iter().copied().collect();
    let mut sentence = axiom.to_string();
    for _ in 0..iterations {
        let mut next = String::with_capacity(sentence.len() * 2);
        for symbol in sentence.chars() {
            match table.get(&symbol) {
                Some(replacement) => next.push_str(replacement),
                None => next.push(symbol),
            }
        }
        sentence = next;
        if sentence.len() > MAX_SENTENCE {
            break;
        }
    }
    sentence
}

/// A drawn turtle segment, with its bracket depth for colouring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Vec2,
    pub to: Vec2,
    pub depth: u32,
}

/// Interprets `F`/`G` as draw-forward, `+`/`-` as turns, `[`/`]` as
/// push/pop. Unit step length; other symbols are ignored.
pub fn interpret(sentence: &str, angle_deg: f32, heading_deg: f32) -> Vec<Segment> {
    let turn = angle_deg.to_radians();
    let mut position = Vec2::ZERO;
    let mut heading = heading_deg.to_radians();
    let mut stack: Vec<(Vec2, f32)> = Vec::new();
    let mut segments = Vec::new();

    for symbol in sentence.chars() {
        match symbol {
            'F' | 'G' => {
                let next = position + Vec2::from_angle(heading);
                segments.push(Segment {
                    from: position,
                    to: next,
                    depth: stack.len() as u32,
                });
                position = next;
            }
            '+' => heading += turn,
            '-' => heading -= turn,
            '[' => stack.push((position, heading)),
            ']' => {
                if let Some((p, h)) = stack.pop() {
                    position = p;
                    heading = h;
                }
            }
            _ => {}
        }
    }
    segments
}

/// Scales and translates segments to fit a `width` × `height` surface.
fn fit(segments: &mut [Segment], width: f32, height: f32) {
    if segments.is_empty() {
        return;
    }
    let (mut min, mut max) = (Vec2::splat(f32::MAX), Vec2::splat(f32::MIN));
    for segment in segments.iter() {
        min = min.min(segment.from).min(segment.to);
        max = max.max(segment.from).max(segment.to);
    }
    let extent = (max - min).max(Vec2::splat(1e-6));
    let usable = Vec2::new(width, height) * (1.0 - 2.0 * MARGIN);
    let scale = (usable.x / extent.x).min(usable.y / extent.y);
    let offset = (Vec2::new(width, height) - extent * scale) / 2.0;
    for segment in segments.iter_mut() {
        segment.from = (segment.from - min) * scale + offset;
        segment.to = (segment.to - min) * scale + offset;
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Params {
    preset: usize,
    iterations: u32,
    angle_offset: f32,
    growth_seconds: f32,
    color: Rgba,
    rainbow: bool,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            preset: options.count("preset", 0).min(PRESETS.len() - 1),
            iterations: options.count("iterations", 4).min(10) as u32,
            angle_offset: options.number_f32("angle_offset", 0.0),
            growth_seconds: options.number_f32("growth_seconds", 3.0).max(0.0),
            color: options.color("color", Rgba::rgb(0x7f, 0xdc, 0x6a)),
            rainbow: options.flag("rainbow", false),
        }
    }
}

/// Grows an L-system drawing segment by segment.
#[derive(Debug)]
pub struct LSystem {
    width: u32,
    height: u32,
    params: Params,
    segments: Vec<Segment>,
    /// Growth progress in [0, 1].
    progress: f32,
}

impl LSystem {
    fn rebuild(&mut self) {
        let preset = &PRESETS[self.params.preset];
        let sentence = expand(preset.axiom, preset.rules, self.params.iterations);
        self.segments = interpret(&sentence, preset.angle + self.params.angle_offset, preset.heading);
        fit(&mut self.segments, self.width as f32, self.height as f32);
        self.progress = if self.params.growth_seconds == 0.0 { 1.0 } else { 0.0 };
        tracing::debug!(
            preset = preset.name,
            symbols = sentence.len(),
            segments = self.segments.len(),
            "expanded l-system"
        );
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments currently drawn.
    pub fn visible(&self) -> usize {
        let eased = Ease::OutCubic.apply(self.progress);
        ((self.segments.len() as f32 * eased).round() as usize).min(self.segments.len())
    }
}

impl Demo for LSystem {
    fn init(&mut self) {
        self.rebuild();
    }

    fn update(&mut self, delta_ms: f32) {
        if self.progress < 1.0 && self.params.growth_seconds > 0.0 {
            self.progress = (self.progress + delta_ms / 1000.0 / self.params.growth_seconds).min(1.0);
        }
    }

    fn render(&self, surface: &mut Surface) {
        surface.clear(Rgba::rgb(8, 10, 16));
        let max_depth = self.segments.iter().map(|s| s.depth).max().unwrap_or(0).max(1) as f32;
        let total = self.segments.len().max(1) as f32;
        for (i, segment) in self.segments[..self.visible()].iter().enumerate() {
            let color = if self.params.rainbow {
                hsl_to_rgb(360.0 * i as f32 / total, 0.7, 0.55)
            } else {
                self.params
                    .color
                    .scale(1.0 - 0.5 * segment.depth as f32 / max_depth)
            };
            surface.line(segment.from, segment.to, color);
        }
    }

    fn options_changed(&mut self, name: &str, options: &DemoOptions) {
        let previous = self.params.clone();
        self.params = Params::from_options(options);
        let structural = previous.preset != self.params.preset
            || previous.iterations != self.params.iterations
            || previous.angle_offset != self.params.angle_offset;
        if structural || name == "growth_seconds" {
            self.rebuild();
        }
    }

    fn on_click(&mut self, _x: f32, _y: f32) {
        self.progress = 0.0;
    }
}

impl DemoKind for LSystem {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "L-System",
            "String rewriting grammars drawn with turtle graphics. Click to regrow.",
            Difficulty::Intermediate,
            Category::Fractal,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::stepped("preset", "Preset", 0.0, (PRESETS.len() - 1) as f64, 1.0, 0.0),
            Control::stepped("iterations", "Iterations", 0.0, 8.0, 1.0, 4.0),
            Control::slider("angle_offset", "Angle offset", -15.0, 15.0, 0.0),
            Control::slider("growth_seconds", "Growth time (s)", 0.0, 10.0, 3.0),
            Control::color("color", "Colour", "#7fdc6a"),
            Control::checkbox("rainbow", "Rainbow", false),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        Self {
            width: context.width,
            height: context.height,
            params: Params::from_options(&context.options),
            segments: Vec::new(),
            progress: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expansion_follows_rules() {
        let preset = &PRESETS[1];
        assert_eq!(expand(preset.axiom, preset.rules, 0), "F");
        assert_eq!(expand(preset.axiom, preset.rules, 1), "F+F-F-F+F");
        assert_eq!(expand(preset.axiom, preset.rules, 2).matches('F').count(), 25);

        let dragon = &PRESETS[3];
        assert_eq!(expand(dragon.axiom, dragon.rules, 1), "FX+YF+");
    }

    #[test]
    fn turtle_respects_turns_and_brackets() {
        let segments = interpret("F[+F]F", 90.0, 0.0);
        assert_eq!(segments.len(), 3);
        assert!((segments[1].to - Vec2::new(1.0, 1.0)).length() < 1e-5);
        assert_eq!(segments[1].depth, 1);
        // After the pop the turtle continues from (1, 0) heading right.
        assert!((segments[2].to - Vec2::new(2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn runaway_expansion_is_capped() {
        let sentence = expand("F", &[('F', "FFFFFFFF")], 20);
        assert!(sentence.len() <= MAX_SENTENCE * 8);
    }

    #[test]
    fn drawing_fits_and_grows() {
        let mut demo = LSystem::create(&DemoContext {
            width: 120,
            height: 80,
            options: LSystem::default_options(),
        });
        demo.init();
        assert!(!demo.segments().is_empty());
        for segment in demo.segments() {
            for point in [segment.from, segment.to] {
                assert!(point.x >= -0.01 && point.x <= 120.01, "{point}");
                assert!(point.y >= -0.01 && point.y <= 80.01, "{point}");
            }
        }

        assert_eq!(demo.visible(), 0);
        demo.update(1500.0);
        let half = demo.visible();
        assert!(half > 0 && half < demo.segments().len());
        demo.update(5000.0);
        assert_eq!(demo.visible(), demo.segments().len());

        let mut surface = Surface::new(120, 80).unwrap();
        demo.render(&mut surface);
        assert!(surface.count_not(Rgba::rgb(8, 10, 16)) > 50);
    }

    #[test]
    fn preset_change_rebuilds() {
        let mut demo = LSystem::create(&DemoContext {
            width: 100,
            height: 100,
            options: LSystem::default_options().with("growth_seconds", 0.0),
        });
        demo.init();
        assert_eq!(demo.visible(), demo.segments().len());
        let plant = demo.segments().len();

        let options = LSystem::default_options()
            .with("growth_seconds", 0.0)
            .with("preset", 1.0)
            .with("iterations", 2.0);
        demo.options_changed("preset", &options);
        assert_eq!(demo.segments().len(), 25);
        assert_ne!(plant, 25);
    }
}
