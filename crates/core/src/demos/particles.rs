use glam::Vec2;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    demo::{Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty},
    math::{hsl_to_rgb, Rgba},
    Surface,
};

const BACKGROUND: Rgba = Rgba::rgb(4, 4, 10);

#[derive(Debug, Clone, Copy)]
struct Particle {
    position: Vec2,
    velocity: Vec2,
    /// Seconds left to live.
    life: f32,
    lifetime: f32,
    hue: f32,
}

#[derive(Debug, Clone)]
struct Params {
    emission_rate: f32,
    gravity: f32,
    spread: f32,
    speed: f32,
    lifetime: f32,
    max_particles: usize,
    hue: f32,
    trails: bool,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            emission_rate: options.number_f32("emission_rate", 300.0).max(0.0),
            gravity: options.number_f32("gravity", 400.0),
            spread: options.number_f32("spread", 30.0).clamp(0.0, 180.0),
            speed: options.number_f32("speed", 350.0).max(0.0),
            lifetime: options.number_f32("lifetime", 2.5).max(0.05),
            max_particles: options.count("max_particles", 3000).min(50_000),
            hue: options.number_f32("hue", 200.0),
            trails: options.flag("trails", true),
        }
    }
}

/// Fountain emitter: particles launch upward in a cone, fall under gravity
/// and fade out as they age.
#[derive(Debug)]
pub struct Particles {
    params: Params,
    emitter: Vec2,
    particles: Vec<Particle>,
    /// Fractional particles owed to the next frame.
    pending: f32,
    rng: StdRng,
}

impl Particles {
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn emitter(&self) -> Vec2 {
        self.emitter
    }

    fn emit(&mut self) {
        let half = self.params.spread.to_radians() / 2.0;
        let angle = -std::f32::consts::FRAC_PI_2 + self.rng.gen_range(-half..=half);
        let speed = self.params.speed * self.rng.gen_range(0.6..=1.0);
        self.particles.push(Particle {
            position: self.emitter,
            velocity: Vec2::from_angle(angle) * speed,
            life: self.params.lifetime,
            lifetime: self.params.lifetime,
            hue: self.params.hue + self.rng.gen_range(-20.0..=20.0),
        });
    }
}

impl Demo for Particles {
    fn init(&mut self) {
        self.particles.clear();
        self.pending = 0.0;
    }

    fn update(&mut self, delta_ms: f32) {
        let dt = delta_ms / 1000.0;
        let gravity = Vec2::new(0.0, self.params.gravity);
        for particle in &mut self.particles {
            particle.velocity += gravity * dt;
            particle.position += particle.velocity * dt;
            particle.life -= dt;
        }
        self.particles.retain(|p| p.life > 0.0);

        self.pending += self.params.emission_rate * dt;
        let room = self.params.max_particles.saturating_sub(self.particles.len());
        let due = self.pending.floor() as usize;
        for _ in 0..due.min(room) {
            self.emit();
        }
        self.pending -= due as f32;
    }

    fn render(&self, surface: &mut Surface) {
        if self.params.trails {
            surface.fade(BACKGROUND, 0.25);
        } else {
            surface.clear(BACKGROUND);
        }
        for particle in &self.particles {
            let age = particle.life / particle.lifetime;
            let color = hsl_to_rgb(particle.hue, 0.9, 0.4 + 0.3 * age).with_alpha(age);
            surface.fill_circle(particle.position, 1.0 + 1.5 * age, color);
        }
    }

    fn options_changed(&mut self, _name: &str, options: &DemoOptions) {
        self.params = Params::from_options(options);
        let max = self.params.max_particles;
        self.particles.truncate(max);
    }

    fn on_mouse_move(&mut self, x: f32, y: f32) {
        self.emitter = Vec2::new(x, y);
    }

    fn on_click(&mut self, x: f32, y: f32) {
        self.emitter = Vec2::new(x, y);
        let room = self.params.max_particles.saturating_sub(self.particles.len());
        for _ in 0..room.min(50) {
            self.emit();
        }
    }
}

impl DemoKind for Particles {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "Particle Fountain",
            "A cone emitter with gravity, ageing and optional motion trails. The emitter follows the mouse.",
            Difficulty::Beginner,
            Category::Particles,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::slider("emission_rate", "Particles per second", 0.0, 2000.0, 300.0),
            Control::slider("gravity", "Gravity", -500.0, 1500.0, 400.0),
            Control::stepped("spread", "Spread (deg)", 0.0, 180.0, 1.0, 30.0),
            Control::slider("speed", "Launch speed", 0.0, 1000.0, 350.0),
            Control::slider("lifetime", "Lifetime (s)", 0.2, 8.0, 2.5),
            Control::stepped("max_particles", "Max particles", 100.0, 20000.0, 100.0, 3000.0),
            Control::stepped("hue", "Hue", 0.0, 360.0, 1.0, 200.0),
            Control::checkbox("trails", "Trails", true),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        Self {
            params: Params::from_options(&context.options),
            emitter: Vec2::new(context.width as f32 / 2.0, context.height as f32 * 0.9),
            particles: Vec::new(),
            pending: 0.0,
            rng: StdRng::seed_from_u64(context.options.number("seed", 11.0) as u64),
        }
    }
}
