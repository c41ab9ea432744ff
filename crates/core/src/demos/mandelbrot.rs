use crate::{
    demo::{
        Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty,
        MouseButton,
    },
    math::{hsl_to_rgb, Rgba},
    Surface,
};

/// Squared bailout radius. Large enough for the smooth colouring formula to
/// be continuous.
const BAILOUT_SQ: f64 = 256.0 * 256.0;
/// Width of the complex plane visible at zoom 1 (along the shorter axis).
const BASE_SPAN: f64 = 3.0;

/// Smooth (normalised) iteration count for `c`, or `None` when `c` did not
/// escape within `max_iterations`.
pub fn escape_time(re: f64, im: f64, max_iterations: u32) -> Option<f64> {
    let (mut x, mut y) = (0.0_f64, 0.0_f64);
    for n in 0..max_iterations {
        let x2 = x * x;
        let y2 = y * y;
        if x2 + y2 > BAILOUT_SQ {
            let log_zn = (x2 + y2).ln() / 2.0;
            let nu = (log_zn / std::f64::consts::LN_2).ln() / std::f64::consts::LN_2;
            return Some(n as f64 + 1.0 - nu);
        }
        y = 2.0 * x * y + im;
        x = x2 - y2 + re;
    }
    None
}

#[derive(Debug, Clone, PartialEq)]
struct View {
    center_re: f64,
    center_im: f64,
    zoom: f64,
}

#[derive(Debug, Clone)]
struct Params {
    max_iterations: u32,
    color_cycle: f32,
    hue_offset: f32,
    auto_zoom: bool,
    zoom_speed: f64,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            max_iterations: options.count("max_iterations", 200).clamp(1, 5000) as u32,
            color_cycle: options.number_f32("color_cycle", 4.0),
            hue_offset: options.number_f32("hue_offset", 200.0),
            auto_zoom: options.flag("auto_zoom", false),
            zoom_speed: options.number("zoom_speed", 1.5).max(1.0),
        }
    }
}

/// Escape-time Mandelbrot renderer. Iteration counts are cached and only
/// recomputed when the view or iteration budget changes.
#[derive(Debug)]
pub struct Mandelbrot {
    width: u32,
    height: u32,
    params: Params,
    view: View,
    /// Smooth iteration count per pixel; negative for points inside the set.
    buffer: Vec<f32>,
    dirty: bool,
}

impl Mandelbrot {
    pub fn pixel_to_complex(&self, x: f32, y: f32) -> (f64, f64) {
        let scale = self.units_per_pixel();
        (
            self.view.center_re + (x as f64 - self.width as f64 / 2.0) * scale,
            self.view.center_im + (y as f64 - self.height as f64 / 2.0) * scale,
        )
    }

    pub fn zoom(&self) -> f64 {
        self.view.zoom
    }

    fn units_per_pixel(&self) -> f64 {
        BASE_SPAN / (self.view.zoom * self.width.min(self.height).max(1) as f64)
    }

    fn recompute(&mut self) {
        let max = self.params.max_iterations;
        let width = self.width as usize;
        self.buffer.resize(width * self.height as usize, -1.0);
        for py in 0..self.height {
            for px in 0..self.width {
                let (re, im) = self.pixel_to_complex(px as f32, py as f32);
                let value = escape_time(re, im, max).map_or(-1.0, |mu| mu as f32);
                self.buffer[py as usize * width + px as usize] = value;
            }
        }
        self.dirty = false;
    }

    fn color(&self, mu: f32) -> Rgba {
        if mu < 0.0 {
            return Rgba::BLACK;
        }
        let t = mu / self.params.max_iterations as f32;
        let hue = self.params.hue_offset + 360.0 * t * self.params.color_cycle;
        let lightness = 0.5 * (1.0 - (1.0 - t).powi(8)).max(0.15).min(1.0) + 0.1;
        hsl_to_rgb(hue, 0.85, lightness)
    }

    fn zoom_at(&mut self, x: f32, y: f32, factor: f64) {
        let (re, im) = self.pixel_to_complex(x, y);
        self.view.center_re = re;
        self.view.center_im = im;
        self.view.zoom = (self.view.zoom * factor).clamp(0.1, 1e13);
        self.dirty = true;
    }
}

impl Demo for Mandelbrot {
    fn init(&mut self) {
        self.recompute();
    }

    fn update(&mut self, delta_ms: f32) {
        if self.params.auto_zoom && delta_ms > 0.0 {
            let factor = self.params.zoom_speed.powf(delta_ms as f64 / 1000.0);
            self.view.zoom = (self.view.zoom * factor).min(1e13);
            self.dirty = true;
        }
        if self.dirty {
            self.recompute();
        }
    }

    fn render(&self, surface: &mut Surface) {
        let width = self.width as usize;
        for y in 0..self.height.min(surface.height()) {
            for x in 0..self.width.min(surface.width()) {
                let mu = self.buffer[y as usize * width + x as usize];
                surface.set(x as i32, y as i32, self.color(mu));
            }
        }
    }

    fn options_changed(&mut self, name: &str, options: &DemoOptions) {
        self.params = Params::from_options(options);
        match name {
            "center_re" | "center_im" | "zoom" => self.view = view_from_options(options),
            _ => {}
        }
        self.dirty = true;
    }

    fn on_click(&mut self, x: f32, y: f32) {
        self.zoom_at(x, y, 2.0);
    }

    fn on_mouse_down(&mut self, x: f32, y: f32, button: MouseButton) {
        if button == MouseButton::Right {
            self.zoom_at(x, y, 0.5);
        }
    }
}

fn view_from_options(options: &DemoOptions) -> View {
    View {
        center_re: options.number("center_re", -0.5),
        center_im: options.number("center_im", 0.0),
        zoom: options.number("zoom", 1.0).max(0.1),
    }
}

impl DemoKind for Mandelbrot {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "Mandelbrot Set",
            "Escape-time fractal with smooth colouring. Click to zoom in, right click to zoom out.",
            Difficulty::Intermediate,
            Category::Fractal,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::stepped("max_iterations", "Max iterations", 16.0, 2000.0, 1.0, 200.0),
            Control::slider("zoom", "Zoom", 0.5, 1e6, 1.0),
            Control::slider("center_re", "Center (re)", -2.5, 1.0, -0.5),
            Control::slider("center_im", "Center (im)", -1.5, 1.5, 0.0),
            Control::slider("color_cycle", "Colour cycles", 0.5, 20.0, 4.0),
            Control::stepped("hue_offset", "Hue offset", 0.0, 360.0, 1.0, 200.0),
            Control::checkbox("auto_zoom", "Auto zoom", false),
            Control::slider("zoom_speed", "Zoom speed", 1.0, 4.0, 1.5),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        Self {
            width: context.width,
            height: context.height,
            params: Params::from_options(&context.options),
            view: view_from_options(&context.options),
            buffer: Vec::new(),
            dirty: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mandelbrot(options: DemoOptions) -> Mandelbrot {
        let mut demo = Mandelbrot::create(&DemoContext {
            width: 40,
            height: 30,
            options: Mandelbrot::default_options().merged(&options),
        });
        demo.init();
        demo
    }

    #[test]
    fn known_points() {
        assert_eq!(escape_time(0.0, 0.0, 500), None);
        assert_eq!(escape_time(-1.0, 0.0, 500), None);
        let outside = escape_time(1.0, 1.0, 500).unwrap();
        assert!(outside < 3.0, "{outside}");
        // Points further out escape sooner.
        assert!(escape_time(2.0, 2.0, 500).unwrap() < escape_time(0.5, 0.5, 500).unwrap());
    }

    #[test]
    fn smooth_count_is_continuous_across_bands() {
        let a = escape_time(0.2600, 0.0, 1000).unwrap();
        let b = escape_time(0.2601, 0.0, 1000).unwrap();
        assert!((a - b).abs() < 1.0, "{a} vs {b}");
    }

    #[test]
    fn renders_inside_black_and_outside_coloured() {
        let demo = mandelbrot(DemoOptions::new());
        let mut surface = Surface::new(40, 30).unwrap();
        demo.render(&mut surface);

        // The view centre (-0.5, 0) is inside the set.
        assert_eq!(surface.get(20, 15), Some(Rgba::BLACK));
        assert_ne!(surface.get(0, 0), Some(Rgba::BLACK));
    }

    #[test]
    fn click_recentres_and_zooms() {
        let mut demo = mandelbrot(DemoOptions::new());
        let target = demo.pixel_to_complex(30.0, 10.0);
        demo.on_click(30.0, 10.0);
        demo.update(16.0);

        assert_eq!(demo.zoom(), 2.0);
        assert_eq!(demo.pixel_to_complex(20.0, 15.0), target);

        demo.on_mouse_down(20.0, 15.0, MouseButton::Right);
        assert_eq!(demo.zoom(), 1.0);
    }

    #[test]
    fn auto_zoom_scales_with_time() {
        let mut demo = mandelbrot(DemoOptions::new().with("auto_zoom", true).with("zoom_speed", 2.0));
        demo.update(1000.0);
        assert!((demo.zoom() - 2.0).abs() < 1e-9);
        demo.update(500.0);
        assert!((demo.zoom() - 2.0 * 2f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn view_options_apply_live() {
        let mut demo = mandelbrot(DemoOptions::new());
        let options = Mandelbrot::default_options().with("zoom", 8.0);
        demo.options_changed("zoom", &options);
        assert_eq!(demo.zoom(), 8.0);
        assert!(demo.dirty);
    }
}
