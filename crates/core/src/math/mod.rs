//! Stateless helpers shared by the demos. Vector math comes from [`glam`].

pub mod color;
pub mod easing;
pub mod noise;

pub use color::{hsl_to_rgb, Rgba};
pub use easing::{lerp, map_range, smoothstep, Ease};
pub use noise::Perlin;
