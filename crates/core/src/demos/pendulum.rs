use std::collections::VecDeque;

use glam::Vec2;

use crate::{
    demo::{Category, Control, Demo, DemoContext, DemoKind, DemoMetadata, DemoOptions, Difficulty},
    math::Rgba,
    Surface,
};

const STEP: f64 = 1.0 / 240.0;
const MAX_STEPS: u32 = 64;

/// Angles (radians from the downward vertical) and angular velocities.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PendulumState {
    pub theta1: f64,
    pub theta2: f64,
    pub omega1: f64,
    pub omega2: f64,
}

impl PendulumState {
    fn offset(self, rate: PendulumState, h: f64) -> PendulumState {
        PendulumState {
            theta1: self.theta1 + rate.theta1 * h,
            theta2: self.theta2 + rate.theta2 * h,
            omega1: self.omega1 + rate.omega1 * h,
            omega2: self.omega2 + rate.omega2 * h,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendulumParams {
    pub length1: f64,
    pub length2: f64,
    pub mass1: f64,
    pub mass2: f64,
    pub gravity: f64,
    pub damping: f64,
}

impl PendulumParams {
    /// Time derivative of `state` from the Lagrangian equations of motion.
    pub fn derivative(&self, state: PendulumState) -> PendulumState {
        let PendulumParams { length1: l1, length2: l2, mass1: m1, mass2: m2, gravity: g, damping } = *self;
        let PendulumState { theta1, theta2, omega1, omega2 } = state;
        let delta = theta1 - theta2;
        let den = 2.0 * m1 + m2 - m2 * (2.0 * delta).cos();

        let alpha1 = (-g * (2.0 * m1 + m2) * theta1.sin()
            - m2 * g * (theta1 - 2.0 * theta2).sin()
            - 2.0 * delta.sin() * m2 * (omega2 * omega2 * l2 + omega1 * omega1 * l1 * delta.cos()))
            / (l1 * den);
        let alpha2 = (2.0
            * delta.sin()
            * (omega1 * omega1 * l1 * (m1 + m2)
                + g * (m1 + m2) * theta1.cos()
                + omega2 * omega2 * l2 * m2 * delta.cos()))
            / (l2 * den);

        PendulumState {
            theta1: omega1,
            theta2: omega2,
            omega1: alpha1 - damping * omega1,
            omega2: alpha2 - damping * omega2,
        }
    }

    /// Classic fourth-order Runge-Kutta step.
    pub fn rk4(&self, state: PendulumState, h: f64) -> PendulumState {
        let k1 = self.derivative(state);
        let k2 = self.derivative(state.offset(k1, h / 2.0));
        let k3 = self.derivative(state.offset(k2, h / 2.0));
        let k4 = self.derivative(state.offset(k3, h));
        PendulumState {
            theta1: state.theta1 + h / 6.0 * (k1.theta1 + 2.0 * k2.theta1 + 2.0 * k3.theta1 + k4.theta1),
            theta2: state.theta2 + h / 6.0 * (k1.theta2 + 2.0 * k2.theta2 + 2.0 * k3.theta2 + k4.theta2),
            omega1: state.omega1 + h / 6.0 * (k1.omega1 + 2.0 * k2.omega1 + 2.0 * k3.omega1 + k4.omega1),
            omega2: state.omega2 + h / 6.0 * (k1.omega2 + 2.0 * k2.omega2 + 2.0 * k3.omega2 + k4.omega2),
        }
    }

    /// Total mechanical energy, with the pivot as the potential reference.
    pub fn energy(&self, state: PendulumState) -> f64 {
        let PendulumParams { length1: l1, length2: l2, mass1: m1, mass2: m2, gravity: g, .. } = *self;
        let PendulumState { theta1, theta2, omega1, omega2 } = state;
        let kinetic = 0.5 * m1 * l1 * l1 * omega1 * omega1
            + 0.5
                * m2
                * (l1 * l1 * omega1 * omega1
                    + l2 * l2 * omega2 * omega2
                    + 2.0 * l1 * l2 * omega1 * omega2 * (theta1 - theta2).cos());
        let potential = -(m1 + m2) * g * l1 * theta1.cos() - m2 * g * l2 * theta2.cos();
        kinetic + potential
    }
}

#[derive(Debug, Clone)]
struct Params {
    physics: PendulumParams,
    angle1: f64,
    angle2: f64,
    trail_length: usize,
    color: Rgba,
}

impl Params {
    fn from_options(options: &DemoOptions) -> Self {
        Self {
            physics: PendulumParams {
                length1: options.number("length1", 1.0).max(0.05),
                length2: options.number("length2", 1.0).max(0.05),
                mass1: options.number("mass1", 1.0).max(0.01),
                mass2: options.number("mass2", 1.0).max(0.01),
                gravity: options.number("gravity", 9.81),
                damping: options.number("damping", 0.0).max(0.0),
            },
            angle1: options.number("angle1", 120.0).to_radians(),
            angle2: options.number("angle2", -10.0).to_radians(),
            trail_length: options.count("trail_length", 300).min(2000),
            color: options.color("color", Rgba::rgb(0xff, 0x6b, 0x9a)),
        }
    }
}

/// Chaotic double pendulum integrated with RK4 at a fixed rate.
#[derive(Debug)]
pub struct DoublePendulum {
    pivot: Vec2,
    /// Pixels per unit of rod length.
    scale: f32,
    params: Params,
    state: PendulumState,
    accumulator: f64,
    trail: VecDeque<Vec2>,
}

impl DoublePendulum {
    pub fn state(&self) -> PendulumState {
        self.state
    }

    pub fn energy(&self) -> f64 {
        self.params.physics.energy(self.state)
    }

    fn reset(&mut self, theta1: f64, theta2: f64) {
        self.state = PendulumState { theta1, theta2, omega1: 0.0, omega2: 0.0 };
        self.accumulator = 0.0;
        self.trail.clear();
    }

    /// Screen positions of both bobs.
    fn bobs(&self) -> (Vec2, Vec2) {
        let PendulumParams { length1, length2, .. } = self.params.physics;
        let arm = |theta: f64, length: f64| {
            Vec2::new(theta.sin() as f32, theta.cos() as f32) * (length as f32 * self.scale)
        };
        let first = self.pivot + arm(self.state.theta1, length1);
        (first, first + arm(self.state.theta2, length2))
    }
}

impl Demo for DoublePendulum {
    fn init(&mut self) {
        self.reset(self.params.angle1, self.params.angle2);
    }

    fn update(&mut self, delta_ms: f32) {
        self.accumulator += delta_ms as f64 / 1000.0;
        let mut steps = 0;
        while self.accumulator >= STEP && steps < MAX_STEPS {
            self.state = self.params.physics.rk4(self.state, STEP);
            self.accumulator -= STEP;
            steps += 1;
        }
        if steps == MAX_STEPS {
            self.accumulator = 0.0;
        }

        if steps > 0 && self.params.trail_length > 0 {
            let (_, second) = self.bobs();
            self.trail.push_back(second);
            while self.trail.len() > self.params.trail_length {
                self.trail.pop_front();
            }
        }
    }

    fn render(&self, surface: &mut Surface) {
        surface.clear(Rgba::rgb(10, 10, 14));
        let count = self.trail.len().max(1) as f32;
        for (i, (a, b)) in self.trail.iter().zip(self.trail.iter().skip(1)).enumerate() {
            surface.line(*a, *b, self.params.color.with_alpha((i + 1) as f32 / count));
        }

        let (first, second) = self.bobs();
        let rod = Rgba::rgb(200, 200, 210);
        surface.line(self.pivot, first, rod);
        surface.line(first, second, rod);
        let radius = |mass: f64| (4.0 + 3.0 * mass.sqrt() as f32).min(14.0);
        surface.fill_circle(first, radius(self.params.physics.mass1), Rgba::WHITE);
        surface.fill_circle(second, radius(self.params.physics.mass2), self.params.color);
    }

    fn options_changed(&mut self, name: &str, options: &DemoOptions) {
        self.params = Params::from_options(options);
        if matches!(name, "angle1" | "angle2") {
            self.reset(self.params.angle1, self.params.angle2);
        }
    }

    /// Swings the pendulum out straight toward the click.
    fn on_click(&mut self, x: f32, y: f32) {
        let d = Vec2::new(x, y) - self.pivot;
        let theta = (d.x as f64).atan2(d.y as f64);
        self.reset(theta, theta);
    }
}

impl DemoKind for DoublePendulum {
    fn metadata() -> DemoMetadata {
        DemoMetadata::new(
            "Double Pendulum",
            "Two coupled pendulums showing sensitive dependence on initial conditions. Click to release from a new angle.",
            Difficulty::Intermediate,
            Category::Physics,
        )
    }

    fn controls() -> Vec<Control> {
        vec![
            Control::slider("length1", "Upper rod", 0.2, 2.0, 1.0),
            Control::slider("length2", "Lower rod", 0.2, 2.0, 1.0),
            Control::slider("mass1", "Upper mass", 0.1, 10.0, 1.0),
            Control::slider("mass2", "Lower mass", 0.1, 10.0, 1.0),
            Control::slider("gravity", "Gravity", 0.0, 30.0, 9.81),
            Control::slider("damping", "Damping", 0.0, 1.0, 0.0),
            Control::stepped("angle1", "Start angle 1", -180.0, 180.0, 1.0, 120.0),
            Control::stepped("angle2", "Start angle 2", -180.0, 180.0, 1.0, -10.0),
            Control::stepped("trail_length", "Trail length", 0.0, 1000.0, 1.0, 300.0),
            Control::color("color", "Colour", "#ff6b9a"),
        ]
    }

    fn create(context: &DemoContext) -> Self {
        let params = Params::from_options(&context.options);
        let reach = (params.physics.length1 + params.physics.length2) as f32;
        let min_side = context.width.min(context.height) as f32;
        Self {
            pivot: Vec2::new(context.width as f32 / 2.0, context.height as f32 / 2.0),
            scale: min_side * 0.45 / reach,
            params,
            state: PendulumState::default(),
            accumulator: 0.0,
            trail: VecDeque::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pendulum(options: DemoOptions) -> DoublePendulum {
        let mut demo = DoublePendulum::create(&DemoContext {
            width: 200,
            height: 200,
            options: DoublePendulum::default_options().merged(&options),
        });
        demo.init();
        demo
    }

    #[test]
    fn energy_is_conserved_without_damping() {
        let mut demo = pendulum(DemoOptions::new());
        let start = demo.energy();
        for _ in 0..600 {
            demo.update(1000.0 / 60.0);
        }
        // (m1 + m2) * g * (l1 + l2) sets the energy scale of the system.
        let scale = 2.0 * 9.81 * 2.0;
        assert!((demo.energy() - start).abs() < 1e-3 * scale);
        assert_ne!(demo.state().theta1, 120f64.to_radians());
    }

    #[test]
    fn damping_drains_energy() {
        let mut demo = pendulum(DemoOptions::new().with("damping", 0.5));
        let start = demo.energy();
        for _ in 0..300 {
            demo.update(1000.0 / 60.0);
        }
        assert!(demo.energy() < start);
    }

    #[test]
    fn hanging_at_rest_stays_at_rest() {
        let mut demo = pendulum(DemoOptions::new().with("angle1", 0.0).with("angle2", 0.0));
        for _ in 0..120 {
            demo.update(16.0);
        }
        assert_eq!(demo.state(), PendulumState::default());
    }

    #[test]
    fn displaced_arm_accelerates_back() {
        let params = PendulumParams {
            length1: 1.0,
            length2: 1.0,
            mass1: 1.0,
            mass2: 1.0,
            gravity: 9.81,
            damping: 0.0,
        };
        let rate = params.derivative(PendulumState { theta1: 0.01, ..Default::default() });
        assert_eq!(rate.theta1, 0.0);
        // A displaced upper arm accelerates back toward the vertical.
        assert!(rate.omega1 < 0.0);
    }

    #[test]
    fn click_releases_from_pointer_and_trail_is_bounded() {
        let mut demo = pendulum(DemoOptions::new().with("trail_length", 10.0));
        demo.on_click(100.0, 180.0);
        assert_eq!(demo.state(), PendulumState::default());

        demo.on_click(180.0, 100.0);
        assert!((demo.state().theta1 - std::f64::consts::FRAC_PI_2).abs() < 1e-9);

        for _ in 0..30 {
            demo.update(16.0);
        }
        assert_eq!(demo.trail.len(), 10);

        let mut surface = Surface::new(200, 200).unwrap();
        demo.render(&mut surface);
        assert!(surface.count_not(Rgba::rgb(10, 10, 14)) > 20);
    }
}
