use crate::{
    demo::{Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty},
    math::{hsl_to_rgb, Perlin},
    Surface,
};

#[derive(Debug, Clone, PartialEq)]
struct Params {
    speed: f32,
    scale: f32,
    hue_shift: f32,
    saturation: f32,
    warp: bool,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            speed: options.number_f32("speed", 1.0),
            scale: options.number_f32("scale", 4.0).max(0.1),
            hue_shift: options.number_f32("hue_shift", 0.0),
            saturation: options.number_f32("saturation", 0.8).clamp(0.0, 1.0),
            warp: options.flag("warp", false),
        }
    }
}

/// Classic sine-sum plasma, optionally domain-warped with Perlin noise.
#[derive(Debug)]
pub struct Plasma {
    width: u32,
    height: u32,
    params: Params,
    time: f32,
    noise: Perlin,
}

impl Plasma {
    /// Field value in [-1, 1] at normalised coordinates.
    fn field(&self, u: f32, v: f32) -> f32 {
        let t = self.time;
        let (mut x, mut y) = (u * self.params.scale, v * self.params.scale);
        if self.params.warp {
            x += self.noise.fbm(u * 2.0, v * 2.0 + t * 0.1, 3) * 2.0;
            y += self.noise.fbm(u * 2.0 + 5.2, v * 2.0 - t * 0.1, 3) * 2.0;
        }
        let cx = x + 0.5 * (t / 5.0).sin() * self.params.scale;
        let cy = y + 0.5 * (t / 3.0).cos() * self.params.scale;

        let value = (x + t).sin()
            + ((y + t) / 2.0).sin()
            + ((x + y + t) / 2.0).sin()
            + ((cx * cx + cy * cy).sqrt() + t).sin();
        value / 4.0
    }
}

impl Demo for Plasma {
    fn init(&mut self) {
        self.time = 0.0;
    }

    fn update(&mut self, delta_ms: f32) {
        self.time += delta_ms / 1000.0 * self.params.speed;
    }

    fn render(&self, surface: &mut Surface) {
        let w = self.width.max(1) as f32;
        let h = self.height.max(1) as f32;
        for y in 0..surface.height() {
            for x in 0..surface.width() {
                let value = self.field(x as f32 / w, y as f32 / h);
                let hue = (value * 0.5 + 0.5) * 360.0 + self.params.hue_shift;
                let lightness = 0.35 + 0.2 * value;
                let color = hsl_to_rgb(hue, self.params.saturation, lightness);
                surface.set(x as i32, y as i32, color);
            }
        }
    }

    fn options_changed(&mut self, _name: &str, options: &DemoOptions) {
        self.params = Params::from_options(options);
    }
}

impl DemoKind for Plasma {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "Plasma",
            "Layered sine waves mapped through a rotating hue palette.",
            Difficulty::Beginner,
            Category::Gradient,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::slider("speed", "Speed", 0.0, 5.0, 1.0),
            Control::slider("scale", "Scale", 0.5, 12.0, 4.0),
            Control::stepped("hue_shift", "Hue shift", 0.0, 360.0, 1.0, 0.0),
            Control::slider("saturation", "Saturation", 0.0, 1.0, 0.8),
            Control::checkbox("warp", "Noise warp", false),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        Self {
            width: context.width,
            height: context.height,
            params: Params::from_options(&context.options),
            time: 0.0,
            noise: Perlin::new(context.options.number("seed", 1.0) as u64),
        }
    }
}
