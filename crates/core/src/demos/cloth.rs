use glam::Vec2;

use crate::{
    demo::{
        Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty,
        MouseButton,
    },
    math::Rgba,
    Surface,
};

/// Simulation step in seconds; frames are integrated in whole steps.
const STEP: f32 = 1.0 / 120.0;
/// Cap on steps per frame so a stalled host does not trigger a long catch-up.
const MAX_STEPS: u32 = 8;
const GRAB_RADIUS: f32 = 25.0;
const CUT_RADIUS: f32 = 8.0;

#[derive(Debug, Clone, Copy)]
struct Point {
    position: Vec2,
    previous: Vec2,
    pinned: bool,
}

#[derive(Debug, Clone, Copy)]
struct Stick {
    a: usize,
    b: usize,
    rest: f32,
}

#[derive(Debug, Clone)]
struct Params {
    columns: usize,
    rows: usize,
    gravity: f32,
    damping: f32,
    iterations: usize,
    tear_factor: f32,
    color: Rgba,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            columns: options.count("columns", 30).clamp(2, 200),
            rows: options.count("rows", 20).clamp(2, 200),
            gravity: options.number_f32("gravity", 900.0),
            damping: options.number_f32("damping", 0.99).clamp(0.0, 1.0),
            iterations: options.count("iterations", 5).clamp(1, 50),
            tear_factor: options.number_f32("tear_factor", 6.0),
            color: options.color("color", Rgba::rgb(0xdd, 0xe6, 0xff)),
        }
    }
}

/// Position-based (Verlet) cloth pinned along its top edge.
#[derive(Debug)]
pub struct Cloth {
    width: u32,
    height: u32,
    params: Params,
    points: Vec<Point>,
    sticks: Vec<Stick>,
    accumulator: f32,
    grabbed: Option<usize>,
    cursor: Vec2,
    cutting: bool,
}

impl Cloth {
    fn build(&mut self) {
        let Params { columns, rows, .. } = self.params;
        let spacing = (self.width as f32 * 0.8 / (columns - 1) as f32)
            .min(self.height as f32 * 0.7 / (rows - 1) as f32);
        let origin = Vec2::new(
            (self.width as f32 - spacing * (columns - 1) as f32) / 2.0,
            self.height as f32 * 0.08,
        );

        self.points.clear();
        self.sticks.clear();
        for row in 0..rows {
            for column in 0..columns {
                let position = origin + Vec2::new(column as f32, row as f32) * spacing;
                self.points.push(Point {
                    position,
                    previous: position,
                    // Every other point of the top row is pinned.
                    pinned: row == 0 && column % 2 == 0,
                });
                let index = row * columns + column;
                if column > 0 {
                    self.sticks.push(Stick { a: index - 1, b: index, rest: spacing });
                }
                if row > 0 {
                    self.sticks.push(Stick { a: index - columns, b: index, rest: spacing });
                }
            }
        }
        self.accumulator = 0.0;
        self.grabbed = None;
    }

    fn step(&mut self) {
        let gravity = Vec2::new(0.0, self.params.gravity) * STEP * STEP;
        let bounds = Vec2::new(self.width as f32, self.height as f32);
        for point in self.points.iter_mut().filter(|p| !p.pinned) {
            let velocity = (point.position - point.previous) * self.params.damping;
            point.previous = point.position;
            point.position += velocity + gravity;
        }

        if let Some(index) = self.grabbed {
            let point = &mut self.points[index];
            point.position = self.cursor;
            point.previous = self.cursor;
        }

        let tear = self.params.tear_factor;
        for _ in 0..self.params.iterations {
            let points = &mut self.points;
            self.sticks.retain(|stick| {
                let delta = points[stick.b].position - points[stick.a].position;
                let distance = delta.length();
                if tear > 0.0 && distance > stick.rest * tear {
                    return false;
                }
                if distance <= f32::EPSILON {
                    return true;
                }
                let correction = delta * ((distance - stick.rest) / distance);
                match (points[stick.a].pinned, points[stick.b].pinned) {
                    (false, false) => {
                        points[stick.a].position += correction * 0.5;
                        points[stick.b].position -= correction * 0.5;
                    }
                    (false, true) => points[stick.a].position += correction,
                    (true, false) => points[stick.b].position -= correction,
                    (true, true) => {}
                }
                true
            });

            for point in self.points.iter_mut().filter(|p| !p.pinned) {
                point.position = point.position.clamp(Vec2::ZERO, bounds);
            }
        }
    }

    fn cut_near(&mut self, at: Vec2) {
        let points = &self.points;
        let before = self.sticks.len();
        self.sticks.retain(|stick| {
            let mid = (points[stick.a].position + points[stick.b].position) / 2.0;
            mid.distance(at) > CUT_RADIUS
        });
        if self.sticks.len() != before {
            tracing::trace!(removed = before - self.sticks.len(), "cut cloth");
        }
    }

    pub fn stick_count(&self) -> usize {
        self.sticks.len()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }
}

impl Demo for Cloth {
    fn init(&mut self) {
        self.build();
    }

    fn update(&mut self, delta_ms: f32) {
        self.accumulator += delta_ms / 1000.0;
        let mut steps = 0;
        while self.accumulator >= STEP && steps < MAX_STEPS {
            self.step();
            self.accumulator -= STEP;
            steps += 1;
        }
        if steps == MAX_STEPS {
            self.accumulator = 0.0;
        }
    }

    fn render(&self, surface: &mut Surface) {
        surface.clear(Rgba::rgb(12, 14, 22));
        for stick in &self.sticks {
            let a = self.points[stick.a].position;
            let b = self.points[stick.b].position;
            let strain = (a.distance(b) / stick.rest - 1.0).clamp(0.0, 1.0);
            let color = self.params.color.lerp(Rgba::rgb(255, 80, 60), strain * 2.0);
            surface.line(a, b, color);
        }
        for point in self.points.iter().filter(|p| p.pinned) {
            surface.fill_circle(point.position, 2.0, Rgba::rgb(255, 200, 80));
        }
    }

    fn options_changed(&mut self, name: &str, options: &DemoOptions) {
        self.params = Params::from_options(options);
        if matches!(name, "columns" | "rows") {
            self.build();
        }
    }

    fn on_mouse_down(&mut self, x: f32, y: f32, button: MouseButton) {
        self.cursor = Vec2::new(x, y);
        match button {
            MouseButton::Left => {
                self.grabbed = self
                    .points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i, p.position.distance(self.cursor)))
                    .filter(|(_, d)| *d < GRAB_RADIUS)
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(i, _)| i);
            }
            MouseButton::Right => {
                self.cutting = true;
                self.cut_near(self.cursor);
            }
            MouseButton::Middle => self.build(),
        }
    }

    fn on_mouse_move(&mut self, x: f32, y: f32) {
        self.cursor = Vec2::new(x, y);
        if self.cutting {
            self.cut_near(self.cursor);
        }
    }

    fn on_mouse_up(&mut self, _x: f32, _y: f32, _button: MouseButton) {
        self.grabbed = None;
        self.cutting = false;
    }
}

impl DemoKind for Cloth {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "Verlet Cloth",
            "A pinned sheet of point masses joined by distance constraints. Drag with the left button, cut with the right.",
            Difficulty::Intermediate,
            Category::Physics,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::stepped("columns", "Columns", 4.0, 80.0, 1.0, 30.0),
            Control::stepped("rows", "Rows", 4.0, 60.0, 1.0, 20.0),
            Control::slider("gravity", "Gravity", 0.0, 3000.0, 900.0),
            Control::slider("damping", "Damping", 0.9, 1.0, 0.99),
            Control::stepped("iterations", "Solver iterations", 1.0, 20.0, 1.0, 5.0),
            Control::slider("tear_factor", "Tear stretch (0 = never)", 0.0, 20.0, 6.0),
            Control::color("color", "Colour", "#dde6ff"),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        Self {
            width: context.width,
            height: context.height,
            params: Params::from_options(&context.options),
            points: Vec::new(),
            sticks: Vec::new(),
            accumulator: 0.0,
            grabbed: None,
            cursor: Vec2::ZERO,
            cutting: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cloth(options: DemoOptions) -> Cloth {
        let mut demo = Cloth::create(&DemoContext {
            width: 200,
            height: 160,
            options: Cloth::default_options()
                .with("columns", 10.0)
                .with("rows", 8.0)
                .merged(&options),
        });
        demo.init();
        demo
    }

    #[test]
    fn builds_grid_topology() {
        let demo = cloth(DemoOptions::new());
        assert_eq!(demo.point_count(), 80);
        // Horizontal (9 per row) plus vertical (10 per row gap) constraints.
        assert_eq!(demo.stick_count(), 8 * 9 + 7 * 10);
    }

    #[test]
    fn gravity_pulls_free_points_and_pins_hold() {
        let mut demo = cloth(DemoOptions::new());
        let start: Vec<Vec2> = demo.points.iter().map(|p| p.position).collect();
        for _ in 0..60 {
            demo.update(16.0);
        }

        for (point, start) in demo.points.iter().zip(&start) {
            assert!(point.position.is_finite());
            if point.pinned {
                assert_eq!(point.position, *start);
            }
        }
        let bottom = demo.points.last().unwrap();
        assert!(bottom.position.y > start.last().unwrap().y);
    }

    #[test]
    fn small_frames_accumulate_into_steps() {
        let mut demo = cloth(DemoOptions::new());
        demo.update(STEP * 1000.0 * 0.5);
        let untouched = demo.points[15].position == demo.points[15].previous;
        assert!(untouched);
        demo.update(STEP * 1000.0 * 0.6);
        assert_ne!(demo.points[15].position, demo.points[15].previous);
    }

    #[test]
    fn dragging_far_tears_and_right_click_cuts() {
        let mut demo = cloth(DemoOptions::new().with("tear_factor", 2.0));
        let sticks = demo.stick_count();
        let corner = demo.points[79].position;

        demo.on_mouse_down(corner.x, corner.y, MouseButton::Left);
        assert_eq!(demo.grabbed, Some(79));
        demo.on_mouse_move(corner.x + 150.0, corner.y + 150.0);
        demo.update(50.0);
        demo.on_mouse_up(0.0, 0.0, MouseButton::Left);
        assert!(demo.stick_count() < sticks);

        let torn = demo.stick_count();
        let mid = (demo.points[20].position + demo.points[21].position) / 2.0;
        demo.on_mouse_down(mid.x, mid.y, MouseButton::Right);
        assert!(demo.stick_count() < torn);
    }

    #[test]
    fn renders_constraints() {
        let demo = cloth(DemoOptions::new());
        let mut surface = Surface::new(200, 160).unwrap();
        demo.render(&mut surface);
        assert!(surface.count_not(Rgba::rgb(12, 14, 22)) > 100);
    }
}
