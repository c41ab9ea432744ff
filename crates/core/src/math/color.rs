use palette::{FromColor, Hsl, Mix, Srgb};
use serde::{Deserialize, Serialize};

/// 8-bit RGBA colour, straight (non-premultiplied) alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        Self {
            a: unit_to_byte(alpha),
            ..self
        }
    }

    /// Parses `#rrggbb`, `#rrggbbaa` or `#rgb`.
    pub fn from_hex(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => {
                let mut channels = hex.chars().map(|c| c.to_digit(16).map(|d| (d * 17) as u8));
                Some(Self::rgb(channels.next()??, channels.next()??, channels.next()??))
            }
            6 => Some(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Some(Self::new(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear blend in sRGB space, `t = 0` yields `self`.
    pub fn lerp(self, other: Rgba, t: f32) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mixed = self.to_srgb().mix(other.to_srgb(), t);
        let alpha = self.a as f32 + (other.a as f32 - self.a as f32) * t;
        Rgba::from_srgb(mixed).with_alpha(alpha / 255.0)
    }

    /// Source-over compositing of `src` onto `self`.
    pub fn blend(self, src: Rgba) -> Rgba {
        match src.a {
            0 => self,
            255 => src,
            alpha => {
                let t = alpha as f32 / 255.0;
                let mut out = self.lerp(src, t);
                out.a = (self.a as f32 + (255.0 - self.a as f32) * t).round() as u8;
                out
            }
        }
    }

    fn to_srgb(self) -> Srgb {
        Srgb::new(self.r, self.g, self.b).into_format()
    }

    fn from_srgb(color: Srgb) -> Rgba {
        Rgba::rgb(
            unit_to_byte(color.red),
            unit_to_byte(color.green),
            unit_to_byte(color.blue),
        )
    }

    /// Scales the colour channels, leaving alpha untouched.
    pub fn scale(self, factor: f32) -> Rgba {
        let scale = |c: u8| (c as f32 * factor).round().clamp(0.0, 255.0) as u8;
        Rgba::new(scale(self.r), scale(self.g), scale(self.b), self.a)
    }
}

/// HSL to RGB; `hue` in degrees (wrapped), saturation and lightness in [0, 1].
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> Rgba {
    let hsl: Hsl = Hsl::new(
        hue.rem_euclid(360.0),
        saturation.clamp(0.0, 1.0),
        lightness.clamp(0.0, 1.0),
    );
    Rgba::from_srgb(Srgb::from_color(hsl))
}

/// Samples evenly spaced gradient stops at `t` in [0, 1].
pub fn gradient(stops: &[Rgba], t: f32) -> Rgba {
    match stops {
        [] => Rgba::BLACK,
        [only] => *only,
        _ => {
            let scaled = t.clamp(0.0, 1.0) * (stops.len() - 1) as f32;
            let index = (scaled.floor() as usize).min(stops.len() - 2);
            stops[index].lerp(stops[index + 1], scaled - index as f32)
        }
    }
}

fn unit_to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
