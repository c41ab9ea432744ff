//! Built-in visual effects. Each module is self-contained: its own
//! parameters, state, update and render, with no code shared between effects
//! beyond the `math` and `surface` helpers.

mod cloth;
mod fluid;
mod gravity;
mod lsystem;
mod mandelbrot;
mod particles;
mod pendulum;
mod plasma;
mod visualizer;

pub use cloth::Cloth;
pub use fluid::Fluid;
pub use gravity::{accelerations, Gravity};
pub use lsystem::{expand, interpret, LSystem, Preset, Segment, PRESETS};
pub use mandelbrot::{escape_time, Mandelbrot};
pub use particles::Particles;
pub use pendulum::{DoublePendulum, PendulumParams, PendulumState};
pub use plasma::Plasma;
pub use visualizer::AudioBars;

use crate::runner::DemoRegistry;

/// Ids of every built-in demo, in listing order.
pub const BUILTIN_IDS: [&str; 9] = [
    "audio-bars",
    "cloth",
    "double-pendulum",
    "fluid",
    "gravity",
    "lsystem",
    "mandelbrot",
    "particles",
    "plasma",
];

/// Adds every built-in demo to `registry`.
pub fn register_builtin(registry: &mut DemoRegistry) {
    registry.register_kind::<AudioBars>("audio-bars");
    registry.register_kind::<Cloth>("cloth");
    registry.register_kind::<DoublePendulum>("double-pendulum");
    registry.register_kind::<Fluid>("fluid");
    registry.register_kind::<Gravity>("gravity");
    registry.register_kind::<LSystem>("lsystem");
    registry.register_kind::<Mandelbrot>("mandelbrot");
    registry.register_kind::<Particles>("particles");
    registry.register_kind::<Plasma>("plasma");
}

/// A registry holding every built-in demo.
pub fn builtin_registry() -> DemoRegistry {
    let mut registry = DemoRegistry::new();
    register_builtin(&mut registry);
    registry
}
