//! The contract every visual effect implements.
//!
//! [`Demo`] is the object-safe per-instance side (simulation step, render,
//! input hooks) that the runner drives through a `Box<dyn Demo>`. [`DemoKind`]
//! is the static side: descriptive metadata, the live controls a host can
//! expose, and construction from merged options.

mod options;

use serde::{Deserialize, Serialize};

use crate::Surface;

pub use options::{DemoOptions, OptionValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fractal,
    Particles,
    Physics,
    Gradient,
    Audio,
}

/// Descriptive information shown by hosts when listing demos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoMetadata {
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub category: Category,
}

impl DemoMetadata {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        difficulty: Difficulty,
        category: Category,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            difficulty,
            category,
        }
    }
}

/// Widget type of a live control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlKind {
    Slider {
        min: f64,
        max: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        step: Option<f64>,
    },
    Checkbox,
    Color,
}

/// A live-tweakable demo parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    #[serde(flatten)]
    pub kind: ControlKind,
    pub name: String,
    pub label: String,
    pub default: OptionValue,
}

impl Control {
    pub fn slider(name: &str, label: &str, min: f64, max: f64, default: f64) -> Self {
        Self {
            kind: ControlKind::Slider {
                min,
                max,
                step: None,
            },
            name: name.to_string(),
            label: label.to_string(),
            default: OptionValue::Number(default),
        }
    }

    pub fn stepped(name: &str, label: &str, min: f64, max: f64, step: f64, default: f64) -> Self {
        Self {
            kind: ControlKind::Slider {
                min,
                max,
                step: Some(step),
            },
            ..Self::slider(name, label, min, max, default)
        }
    }

    pub fn checkbox(name: &str, label: &str, default: bool) -> Self {
        Self {
            kind: ControlKind::Checkbox,
            name: name.to_string(),
            label: label.to_string(),
            default: OptionValue::Bool(default),
        }
    }

    pub fn color(name: &str, label: &str, default: &str) -> Self {
        Self {
            kind: ControlKind::Color,
            name: name.to_string(),
            label: label.to_string(),
            default: OptionValue::Text(default.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Everything a demo receives at construction time.
#[derive(Debug, Clone)]
pub struct DemoContext {
    pub width: u32,
    pub height: u32,
    /// Defaults already merged with caller overrides.
    pub options: DemoOptions,
}

/// A running visual effect.
pub trait Demo {
    /// Builds the initial simulation state. Called once, before the first
    /// frame.
    fn init(&mut self);

    /// Advances the simulation by `delta_ms` milliseconds of wall-clock time.
    fn update(&mut self, delta_ms: f32);

    fn render(&self, surface: &mut Surface);

    /// A live option changed; `options` holds the full merged set.
    fn options_changed(&mut self, _name: &str, _options: &DemoOptions) {}

    /// Teardown before the instance is dropped.
    fn destroy(&mut self) {}

    fn on_mouse_move(&mut self, _x: f32, _y: f32) {}

    fn on_mouse_down(&mut self, _x: f32, _y: f32, _button: MouseButton) {}

    fn on_mouse_up(&mut self, _x: f32, _y: f32, _button: MouseButton) {}

    fn on_click(&mut self, _x: f32, _y: f32) {}
}

/// Static description and construction of a demo type.
pub trait DemoKind: Demo + Sized + 'static {
    fn metadata() -> DemoMetadata;

    fn controls() -> Vec<Control>;

    /// Defaults derived from the control table.
    fn default_options() -> DemoOptions {
        Self::controls()
            .into_iter()
            .map(|control| (control.name, control.default))
            .collect()
    }

    fn create(context: &DemoContext) -> Self;
}
