use glam::Vec2;
use tiny_skia::{
    Color, ColorU8, FillRule, LineCap, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Rect,
    Stroke, Transform,
};

use crate::math::Rgba;
use crate::{FxError, Result};

/// CPU pixel buffer the demos draw into, backed by a [`Pixmap`]. Coordinates
/// are in pixels with the origin at the top-left corner; anything outside the
/// buffer is clipped. Shapes are rasterized without anti-aliasing so a pixel
/// is either covered or untouched.
#[derive(Debug, Clone)]
pub struct Surface {
    pixmap: Pixmap,
}

impl Surface {
    /// Creates an opaque black surface. Fails for a zero-sized buffer.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height)
            .ok_or(FxError::InvalidInput("surface dimensions must be non-zero"))?;
        let mut surface = Self { pixmap };
        surface.clear(Rgba::BLACK);
        Ok(surface)
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width() as f32, self.height() as f32)
    }

    pub fn clear(&mut self, color: Rgba) {
        self.pixmap
            .fill(Color::from_rgba8(color.r, color.g, color.b, color.a));
    }

    /// Paints a translucent layer over the whole surface. Used for motion
    /// trails instead of a full clear.
    pub fn fade(&mut self, color: Rgba, alpha: f32) {
        let (width, height) = (self.width() as i32, self.height() as i32);
        self.fill_rect(0, 0, width, height, color.with_alpha(alpha));
    }

    pub fn get(&self, x: i32, y: i32) -> Option<Rgba> {
        self.index(x, y)
            .map(|i| to_rgba(self.pixmap.pixels()[i]))
    }

    /// Overwrites one pixel, ignoring what was there.
    pub fn set(&mut self, x: i32, y: i32, color: Rgba) {
        if let Some(i) = self.index(x, y) {
            self.pixmap.pixels_mut()[i] =
                ColorU8::from_rgba(color.r, color.g, color.b, color.a).premultiply();
        }
    }

    /// Composites `color` over one pixel.
    pub fn blend(&mut self, x: i32, y: i32, color: Rgba) {
        self.fill_rect(x, y, 1, 1, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Rgba) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w).min(self.width() as i32);
        let y1 = y.saturating_add(h).min(self.height() as i32);
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let Some(rect) =
            Rect::from_xywh(x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32)
        else {
            return;
        };
        self.pixmap
            .fill_rect(rect, &paint(color), Transform::identity(), None);
    }

    /// One pixel wide line, endpoints inclusive.
    pub fn line(&mut self, from: Vec2, to: Vec2, color: Rgba) {
        // Lines far off-screen (an exploded simulation) are skipped.
        let bound = 4.0 * (self.width() + self.height()) as f32;
        let usable = |p: Vec2| p.is_finite() && p.abs().max_element() <= bound;
        if !usable(from) || !usable(to) {
            return;
        }

        let (from, to) = (from.round(), to.round());
        if from == to {
            self.blend(from.x as i32, from.y as i32, color);
            return;
        }

        let mut builder = PathBuilder::new();
        builder.move_to(from.x + 0.5, from.y + 0.5);
        builder.line_to(to.x + 0.5, to.y + 0.5);
        let Some(path) = builder.finish() else {
            return;
        };
        let stroke = Stroke {
            width: 1.0,
            line_cap: LineCap::Square,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint(color), &stroke, Transform::identity(), None);
    }

    pub fn fill_circle(&mut self, center: Vec2, radius: f32, color: Rgba) {
        if radius <= 0.0 || !radius.is_finite() || !center.is_finite() {
            return;
        }
        let Some(path) = PathBuilder::from_circle(center.x, center.y, radius) else {
            return;
        };
        self.pixmap.fill_path(
            &path,
            &paint(color),
            FillRule::Winding,
            Transform::identity(),
            None,
        );
    }

    /// Row-major straight-alpha RGBA bytes, ready for an image encoder.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect()
    }

    /// Number of pixels that differ from `color`.
    pub fn count_not(&self, color: Rgba) -> usize {
        self.pixmap
            .pixels()
            .iter()
            .filter(|p| to_rgba(**p) != color)
            .count()
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            None
        } else {
            Some(y as usize * self.width() as usize + x as usize)
        }
    }
}

fn paint(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.r, color.g, color.b, color.a);
    paint.anti_alias = false;
    paint
}

fn to_rgba(pixel: PremultipliedColorU8) -> Rgba {
    let c = pixel.demultiply();
    Rgba::new(c.red(), c.green(), c.blue(), c.alpha())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clips_out_of_bounds_writes() {
        let mut surface = Surface::new(4, 3).unwrap();
        surface.set(-1, 0, Rgba::WHITE);
        surface.set(4, 0, Rgba::WHITE);
        surface.set(0, 3, Rgba::WHITE);
        assert_eq!(surface.count_not(Rgba::BLACK), 0);

        surface.set(3, 2, Rgba::WHITE);
        assert_eq!(surface.get(3, 2), Some(Rgba::WHITE));
        assert_eq!(surface.get(9, 9), None);
    }

    #[test]
    fn line_touches_both_endpoints() {
        let mut surface = Surface::new(10, 10).unwrap();
        surface.line(Vec2::new(1.0, 1.0), Vec2::new(8.0, 5.0), Rgba::WHITE);
        assert_eq!(surface.get(1, 1), Some(Rgba::WHITE));
        assert_eq!(surface.get(8, 5), Some(Rgba::WHITE));
    }

    #[test]
    fn circle_and_fade() {
        let mut surface = Surface::new(20, 20).unwrap();
        surface.fill_circle(Vec2::new(10.0, 10.0), 3.0, Rgba::WHITE);
        let lit = surface.count_not(Rgba::BLACK);
        assert!(lit > 20 && lit < 40, "{lit}");

        surface.fade(Rgba::BLACK, 0.5);
        let dimmed = surface.get(10, 10).unwrap();
        assert!(dimmed.r < 200 && dimmed.r > 100);
        assert_eq!(surface.to_rgba8().len(), 20 * 20 * 4);
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        assert!(matches!(Surface::new(0, 10), Err(FxError::InvalidInput(_))));
    }

    #[test]
    fn translucent_rect_composites_over_existing_pixels() {
        let mut surface = Surface::new(6, 6).unwrap();
        surface.fill_rect(-2, -2, 5, 5, Rgba::WHITE.with_alpha(0.5));
        let half = surface.get(0, 0).unwrap();
        assert!((126..=129).contains(&half.r), "{half:?}");
        assert_eq!(half.a, 255);
        assert_eq!(surface.get(3, 3), Some(Rgba::BLACK));
        assert_eq!(surface.count_not(Rgba::BLACK), 9);

        surface.fill_rect(0, 0, 1, 1, Rgba::WHITE.with_alpha(0.5));
        assert!(surface.get(0, 0).unwrap().r > half.r);
    }

    #[test]
    fn degenerate_line_plots_one_pixel() {
        let mut surface = Surface::new(5, 5).unwrap();
        surface.line(Vec2::new(2.2, 2.4), Vec2::new(1.8, 2.0), Rgba::WHITE);
        assert_eq!(surface.count_not(Rgba::BLACK), 1);
        assert_eq!(surface.get(2, 2), Some(Rgba::WHITE));

        surface.line(Vec2::new(f32::NAN, 0.0), Vec2::ZERO, Rgba::WHITE);
        assert_eq!(surface.count_not(Rgba::BLACK), 1);
    }
}
