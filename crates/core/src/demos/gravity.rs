use std::collections::VecDeque;

use glam::Vec2;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    demo::{Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty},
    math::{hsl_to_rgb, Rgba},
    Surface,
};

const G: f32 = 1.0;
/// Largest integration step in seconds.
const MAX_STEP: f32 = 1.0 / 120.0;

/// Pairwise softened gravitational acceleration on every body.
///
/// Each pair is visited once and the equal-and-opposite contributions are
/// applied together, so the net force over the system is zero.
pub fn accelerations(positions: &[Vec2], masses: &[f32], softening: f32) -> Vec<Vec2> {
    let mut out = vec![Vec2::ZERO; positions.len()];
    let eps2 = softening * softening;
    for i in 0..positions.len() {
        for j in (i + 1)..positions.len() {
            let offset = positions[j] - positions[i];
            let r2 = offset.length_squared() + eps2;
            if r2 <= f32::EPSILON {
                continue;
            }
            let inv_r3 = 1.0 / (r2 * r2.sqrt());
            let pull = G * offset * inv_r3;
            out[i] += pull * masses[j];
            out[j] -= pull * masses[i];
        }
    }
    out
}

/// Speed of a circular orbit at radius `r` around `mass` under softened gravity.
fn circular_speed(mass: f32, r: f32, softening: f32) -> f32 {
    let r2 = r * r + softening * softening;
    (G * mass * r * r / (r2 * r2.sqrt())).sqrt()
}

#[derive(Debug, Clone)]
struct Body {
    position: Vec2,
    velocity: Vec2,
    mass: f32,
    hue: f32,
    trail: VecDeque<Vec2>,
}

#[derive(Debug, Clone)]
struct Params {
    body_count: usize,
    central_mass: f32,
    softening: f32,
    trail_length: usize,
    time_scale: f32,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            body_count: options.count("body_count", 80).min(500),
            central_mass: options.number_f32("central_mass", 200_000.0).max(0.0),
            softening: options.number_f32("softening", 5.0).max(0.1),
            trail_length: options.count("trail_length", 30).min(500),
            time_scale: options.number_f32("time_scale", 1.0).max(0.0),
        }
    }
}

/// N-body gravity: a heavy central body with light bodies on circular orbits.
#[derive(Debug)]
pub struct Gravity {
    center: Vec2,
    min_side: f32,
    params: Params,
    bodies: Vec<Body>,
    rng: StdRng,
}

impl Gravity {
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn total_momentum(&self) -> Vec2 {
        self.bodies.iter().map(|b| b.velocity * b.mass).sum()
    }

    fn populate(&mut self) {
        self.bodies.clear();
        self.bodies.push(Body {
            position: self.center,
            velocity: Vec2::ZERO,
            mass: self.params.central_mass,
            hue: 45.0,
            trail: VecDeque::new(),
        });
        for _ in 0..self.params.body_count {
            let radius = self.rng.gen_range(0.1..0.45) * self.min_side;
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let mass = self.rng.gen_range(1.0..5.0);
            let position = self.center + Vec2::from_angle(angle) * radius;
            self.spawn(position, mass);
        }
        // Cancel the net drift so the system stays centred.
        let momentum: Vec2 = self.bodies[1..].iter().map(|b| b.velocity * b.mass).sum();
        if self.params.central_mass > 0.0 {
            self.bodies[0].velocity = -momentum / self.params.central_mass;
        }
    }

    fn spawn(&mut self, position: Vec2, mass: f32) {
        let offset = position - self.bodies[0].position;
        let radius = offset.length();
        let velocity = if radius > 1e-3 {
            let tangent = offset.perp() / radius;
            self.bodies[0].velocity
                + tangent * circular_speed(self.bodies[0].mass, radius, self.params.softening)
        } else {
            Vec2::ZERO
        };
        let hue = self.rng.gen_range(180.0..320.0);
        self.bodies.push(Body {
            position,
            velocity,
            mass,
            hue,
            trail: VecDeque::new(),
        });
    }

    fn accelerations(&self) -> Vec<Vec2> {
        let positions: Vec<Vec2> = self.bodies.iter().map(|b| b.position).collect();
        let masses: Vec<f32> = self.bodies.iter().map(|b| b.mass).collect();
        accelerations(&positions, &masses, self.params.softening)
    }

    /// Kick-drift-kick leapfrog step.
    fn step(&mut self, dt: f32) {
        let before = self.accelerations();
        for (body, a) in self.bodies.iter_mut().zip(&before) {
            body.velocity += *a * (dt / 2.0);
            body.position += body.velocity * dt;
        }
        let after = self.accelerations();
        for (body, a) in self.bodies.iter_mut().zip(&after) {
            body.velocity += *a * (dt / 2.0);
        }
    }
}

impl Demo for Gravity {
    fn init(&mut self) {
        self.populate();
    }

    fn update(&mut self, delta_ms: f32) {
        let mut remaining = delta_ms / 1000.0 * self.params.time_scale;
        while remaining > 0.0 {
            let dt = remaining.min(MAX_STEP);
            self.step(dt);
            remaining -= dt;
        }

        let length = self.params.trail_length;
        for body in &mut self.bodies {
            body.trail.push_back(body.position);
            while body.trail.len() > length {
                body.trail.pop_front();
            }
        }
    }

    fn render(&self, surface: &mut Surface) {
        surface.clear(Rgba::rgb(2, 2, 8));
        for body in &self.bodies {
            let color = hsl_to_rgb(body.hue, 0.8, 0.6);
            let count = body.trail.len().max(1) as f32;
            for (i, (a, b)) in body.trail.iter().zip(body.trail.iter().skip(1)).enumerate() {
                surface.line(*a, *b, color.with_alpha(0.8 * (i + 1) as f32 / count));
            }
            let radius = (body.mass.max(1.0).ln() * 0.5).max(1.0);
            surface.fill_circle(body.position, radius, color);
        }
    }

    fn options_changed(&mut self, name: &str, options: &DemoOptions) {
        self.params = Params::from_options(options);
        if matches!(name, "body_count" | "central_mass" | "softening") {
            self.populate();
        }
    }

    fn on_click(&mut self, x: f32, y: f32) {
        let mass = self.rng.gen_range(1.0..5.0);
        self.spawn(Vec2::new(x, y), mass);
    }
}

impl DemoKind for Gravity {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "N-Body Gravity",
            "Softened Newtonian gravity with leapfrog integration. Click to add a body on a circular orbit.",
            Difficulty::Intermediate,
            Category::Physics,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::stepped("body_count", "Bodies", 0.0, 300.0, 1.0, 80.0),
            Control::slider("central_mass", "Central mass", 0.0, 1_000_000.0, 200_000.0),
            Control::slider("softening", "Softening", 0.5, 30.0, 5.0),
            Control::stepped("trail_length", "Trail length", 0.0, 200.0, 1.0, 30.0),
            Control::slider("time_scale", "Time scale", 0.0, 4.0, 1.0),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        Self {
            center: Vec2::new(context.width as f32, context.height as f32) / 2.0,
            min_side: context.width.min(context.height) as f32,
            params: Params::from_options(&context.options),
            bodies: Vec::new(),
            rng: StdRng::seed_from_u64(context.options.number("seed", 3.0) as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gravity(options: DemoOptions) -> Gravity {
        let mut demo = Gravity::create(&DemoContext {
            width: 200,
            height: 160,
            options: Gravity::default_options().merged(&options),
        });
        demo.init();
        demo
    }

    #[test]
    fn pairwise_forces_cancel() {
        let positions = [Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0), Vec2::new(3.0, 7.0)];
        let masses = [5.0, 2.0, 1.0];
        let acc = accelerations(&positions, &masses, 1.0);
        let net: Vec2 = acc.iter().zip(&masses).map(|(a, m)| *a * *m).sum();
        assert!(net.length() < 1e-5, "{net}");
        // The lighter body is pulled harder toward the heavy one.
        assert!(acc[1].x < 0.0 && acc[1].length() > acc[0].length());
    }

    #[test]
    fn starts_with_zero_net_momentum() {
        let demo = gravity(DemoOptions::new().with("body_count", 20.0));
        assert_eq!(demo.body_count(), 21);
        assert!(demo.total_momentum().length() < 1e-2);
    }

    #[test]
    fn momentum_is_conserved_over_time() {
        let mut demo = gravity(DemoOptions::new().with("body_count", 20.0));
        let start = demo.total_momentum();
        for _ in 0..60 {
            demo.update(16.0);
        }
        // Reference scale: one orbiting body's momentum is several hundred.
        assert!((demo.total_momentum() - start).length() < 1.0);
    }

    #[test]
    fn circular_orbit_keeps_its_radius() {
        let mut demo = gravity(DemoOptions::new().with("body_count", 1.0));
        let radius = demo.bodies[1].position.distance(demo.bodies[0].position);
        for _ in 0..180 {
            demo.update(1000.0 / 60.0);
        }
        let now = demo.bodies[1].position.distance(demo.bodies[0].position);
        assert!((now - radius).abs() / radius < 0.05, "{radius} -> {now}");
    }

    #[test]
    fn trails_are_bounded_and_click_spawns() {
        let mut demo = gravity(DemoOptions::new().with("body_count", 3.0).with("trail_length", 5.0));
        for _ in 0..20 {
            demo.update(16.0);
        }
        assert!(demo.bodies.iter().all(|b| b.trail.len() == 5));

        demo.on_click(20.0, 20.0);
        assert_eq!(demo.body_count(), 5);

        let mut surface = Surface::new(200, 160).unwrap();
        demo.render(&mut surface);
        assert!(surface.count_not(Rgba::rgb(2, 2, 8)) > 0);
    }
}
