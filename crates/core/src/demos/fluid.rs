use std::f32::consts::PI;

use glam::Vec2;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    demo::{Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty},
    math::Rgba,
    Surface,
};

const REST_DENSITY: f32 = 300.0;
const GAS_CONSTANT: f32 = 2000.0;
/// Kernel radius in pixels.
const H: f32 = 16.0;
const HSQ: f32 = H * H;
const MASS: f32 = 2.5;
const DT: f32 = 0.0007;
const GRAVITY: f32 = 12000.0 * 9.8;
const BOUNDARY_DAMPING: f32 = -0.5;
const MAX_SPEED: f32 = 4000.0;
const MAX_PARTICLES: usize = 2000;
const SPAWN_BATCH: usize = 25;

fn poly6() -> f32 {
    4.0 / (PI * H.powi(8))
}

fn spiky_grad() -> f32 {
    -10.0 / (PI * H.powi(5))
}

fn visc_laplacian() -> f32 {
    40.0 / (PI * H.powi(5))
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    position: Vec2,
    velocity: Vec2,
    force: Vec2,
    density: f32,
    pressure: f32,
}

impl Particle {
    fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
            density: 0.0,
            pressure: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Params {
    particle_count: usize,
    viscosity: f32,
    gravity_scale: f32,
    substeps: usize,
    color: Rgba,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            particle_count: options.count("particle_count", 300).clamp(1, MAX_PARTICLES),
            viscosity: options.number_f32("viscosity", 200.0).max(0.0),
            gravity_scale: options.number_f32("gravity_scale", 1.0),
            substeps: options.count("substeps", 3).clamp(1, 20),
            color: options.color("color", Rgba::rgb(0x3f, 0xa9, 0xf5)),
        }
    }
}

/// Smoothed-particle hydrodynamics in a closed box: poly6 density, spiky
/// pressure gradient, viscosity Laplacian.
#[derive(Debug)]
pub struct Fluid {
    width: f32,
    height: f32,
    params: Params,
    particles: Vec<Particle>,
    rng: StdRng,
}

impl Fluid {
    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Fills a dam-break block in the left half of the box.
    fn seed(&mut self) {
        self.particles.clear();
        let spacing = H * 0.75;
        let left = H.max(self.width * 0.1);
        let right = (self.width * 0.5).max(left + spacing);
        let mut y = self.height - H;
        'rows: while y >= H {
            let mut x = left;
            while x <= right {
                if self.particles.len() >= self.params.particle_count {
                    break 'rows;
                }
                let jitter = self.rng.gen_range(-0.5..0.5);
                self.particles.push(Particle::at(Vec2::new(x + jitter, y)));
                x += spacing;
            }
            y -= spacing;
        }
        tracing::debug!(particles = self.particles.len(), "seeded fluid");
    }

    fn compute_density_pressure(&mut self) {
        let poly6 = poly6();
        let positions: Vec<Vec2> = self.particles.iter().map(|p| p.position).collect();
        for particle in &mut self.particles {
            let density: f32 = positions
                .iter()
                .map(|other| particle.position.distance_squared(*other))
                .filter(|&r2| r2 < HSQ)
                .map(|r2| MASS * poly6 * (HSQ - r2).powi(3))
                .sum();
            particle.density = density;
            particle.pressure = GAS_CONSTANT * (density - REST_DENSITY);
        }
    }

    fn compute_forces(&mut self) {
        let spiky = spiky_grad();
        let laplacian = visc_laplacian();
        let gravity = Vec2::new(0.0, GRAVITY * self.params.gravity_scale);
        let snapshot = self.particles.clone();

        for (i, particle) in self.particles.iter_mut().enumerate() {
            let mut pressure = Vec2::ZERO;
            let mut viscosity = Vec2::ZERO;
            for (j, other) in snapshot.iter().enumerate() {
                if i == j {
                    continue;
                }
                let offset = other.position - particle.position;
                let r = offset.length();
                if r >= H {
                    continue;
                }
                if r > 1e-6 {
                    pressure += -offset / r * MASS * (particle.pressure + other.pressure)
                        / (2.0 * other.density)
                        * spiky
                        * (H - r).powi(3);
                }
                viscosity += self.params.viscosity * MASS * (other.velocity - particle.velocity)
                    / other.density
                    * laplacian
                    * (H - r);
            }
            let weight = gravity * MASS / particle.density;
            particle.force = pressure + viscosity + weight;
        }
    }

    fn integrate(&mut self) {
        let (max_x, max_y) = (self.width - H, self.height - H);
        for particle in &mut self.particles {
            particle.velocity += DT * particle.force / particle.density;
            particle.velocity = particle.velocity.clamp_length_max(MAX_SPEED);
            particle.position += DT * particle.velocity;

            if particle.position.x < H {
                particle.velocity.x *= BOUNDARY_DAMPING;
                particle.position.x = H;
            } else if particle.position.x > max_x {
                particle.velocity.x *= BOUNDARY_DAMPING;
                particle.position.x = max_x;
            }
            if particle.position.y < H {
                particle.velocity.y *= BOUNDARY_DAMPING;
                particle.position.y = H;
            } else if particle.position.y > max_y {
                particle.velocity.y *= BOUNDARY_DAMPING;
                particle.position.y = max_y;
            }
        }
    }

    fn step(&mut self) {
        self.compute_density_pressure();
        self.compute_forces();
        self.integrate();
    }
}

impl Demo for Fluid {
    fn init(&mut self) {
        self.seed();
    }

    fn update(&mut self, delta_ms: f32) {
        if delta_ms <= 0.0 || self.particles.is_empty() {
            return;
        }
        for _ in 0..self.params.substeps {
            self.step();
        }
    }

    fn render(&self, surface: &mut Surface) {
        surface.clear(Rgba::rgb(6, 10, 20));
        for particle in &self.particles {
            let speed = (particle.velocity.length() / 1500.0).min(1.0);
            let color = self.params.color.lerp(Rgba::WHITE, speed * 0.6);
            surface.fill_circle(particle.position, H * 0.4, color);
        }
    }

    fn options_changed(&mut self, name: &str, options: &DemoOptions) {
        self.params = Params::from_options(options);
        if name == "particle_count" {
            self.seed();
        }
    }

    fn on_click(&mut self, x: f32, y: f32) {
        let room = MAX_PARTICLES.saturating_sub(self.particles.len());
        let (max_x, max_y) = (self.width - H, self.height - H);
        for _ in 0..SPAWN_BATCH.min(room) {
            let offset = Vec2::new(self.rng.gen_range(-H..H), self.rng.gen_range(-H..H));
            let position = Vec2::new(x, y) + offset;
            self.particles.push(Particle::at(Vec2::new(
                position.x.clamp(H, max_x.max(H)),
                position.y.clamp(H, max_y.max(H)),
            )));
        }
    }
}

impl DemoKind for Fluid {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "SPH Fluid",
            "Smoothed-particle hydrodynamics dam break. Click to pour in more fluid.",
            Difficulty::Advanced,
            Category::Physics,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::stepped("particle_count", "Particles", 50.0, 1000.0, 10.0, 300.0),
            Control::slider("viscosity", "Viscosity", 0.0, 1000.0, 200.0),
            Control::slider("gravity_scale", "Gravity", 0.0, 3.0, 1.0),
            Control::stepped("substeps", "Steps per frame", 1.0, 10.0, 1.0, 3.0),
            Control::color("color", "Colour", "#3fa9f5"),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        Self {
            width: context.width as f32,
            height: context.height as f32,
            params: Params::from_options(&context.options),
            particles: Vec::new(),
            rng: StdRng::seed_from_u64(context.options.number("seed", 7.0) as u64),
        }
    }
}
