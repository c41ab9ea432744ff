//! Owns the demo registry, the shared drawing surface, and at most one active
//! demo instance. The host calls [`Runner::frame`] once per displayed frame.

mod registry;

use crate::{
    demo::{Demo, DemoContext, DemoOptions, MouseButton, OptionValue},
    math::Rgba,
    FrameClock, FxError, Result, Surface,
};

pub use registry::{DemoConstructor, DemoEntry, DemoRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Running,
    Paused,
    Stopped,
}

struct ActiveDemo {
    id: String,
    demo: Box<dyn Demo>,
    options: DemoOptions,
    clock: FrameClock,
    state: RunState,
}

pub struct Runner {
    registry: DemoRegistry,
    surface: Option<Surface>,
    active: Option<ActiveDemo>,
}

impl Runner {
    /// Creates a runner with no surface and no active demo.
    pub fn new(registry: DemoRegistry) -> Self {
        Self {
            registry,
            surface: None,
            active: None,
        }
    }

    /// Returns the registry demos are loaded from.
    pub fn registry(&self) -> &DemoRegistry {
        &self.registry
    }

    /// Returns the registry for adding or replacing entries.
    pub fn registry_mut(&mut self) -> &mut DemoRegistry {
        &mut self.registry
    }

    /// Binds the surface demos draw into, returning the previous one.
    pub fn bind_surface(&mut self, surface: Surface) -> Option<Surface> {
        self.surface.replace(surface)
    }

    /// Returns the bound surface, if any.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Replaces the active demo with a fresh instance of `id`. Failures are
    /// logged and reported as `false`; the current demo is left untouched.
    pub fn load(&mut self, id: &str, options: &DemoOptions) -> bool {
        match self.try_load(id, options) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(id, %err, "failed to load demo");
                false
            }
        }
    }

    pub fn try_load(&mut self, id: &str, options: &DemoOptions) -> Result<()> {
        let (width, height) = match &self.surface {
            Some(surface) => (surface.width(), surface.height()),
            None => return Err(FxError::NoSurface),
        };
        let entry = self
            .registry
            .get(id)
            .ok_or_else(|| FxError::UnknownDemo(id.to_string()))?;

        let context = DemoContext {
            width,
            height,
            options: entry.defaults.merged(options),
        };
        let mut demo = entry.construct(&context);

        self.unload();

        demo.init();
        if let Some(surface) = self.surface.as_mut() {
            surface.clear(Rgba::BLACK);
        }
        tracing::debug!(id, width, height, "loaded demo");

        self.active = Some(ActiveDemo {
            id: id.to_string(),
            demo,
            options: context.options,
            clock: FrameClock::new(),
            state: RunState::Running,
        });
        Ok(())
    }

    /// Tears down and drops the active demo, if any.
    pub fn unload(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.demo.destroy();
            tracing::debug!(id = %active.id, frames = active.clock.frame(), "unloaded demo");
        }
    }

    /// Restarts a stopped or paused demo. Returns false without an active demo.
    pub fn start(&mut self) -> bool {
        self.transition(|state| match state {
            RunState::Stopped | RunState::Paused => Some(RunState::Running),
            RunState::Running => None,
        })
    }

    pub fn stop(&mut self) -> bool {
        self.transition(|state| match state {
            RunState::Stopped => None,
            _ => Some(RunState::Stopped),
        })
    }

    pub fn pause(&mut self) -> bool {
        self.transition(|state| match state {
            RunState::Running => Some(RunState::Paused),
            _ => None,
        })
    }

    pub fn resume(&mut self) -> bool {
        self.transition(|state| match state {
            RunState::Paused => Some(RunState::Running),
            _ => None,
        })
    }

    /// Forwards a live parameter change to the active demo.
    pub fn set_option(&mut self, name: &str, value: impl Into<OptionValue>) -> bool {
        let Some(active) = self.active.as_mut() else {
            tracing::debug!(name, "ignoring option change without an active demo");
            return false;
        };
        active.options.set(name, value);
        active.demo.options_changed(name, &active.options);
        true
    }

    /// One host frame at `timestamp_ms`. Returns whether a frame was drawn.
    pub fn frame(&mut self, timestamp_ms: f64) -> bool {
        self.run_frame(|clock| clock.tick(timestamp_ms))
    }

    /// One frame with a fixed delta, for hosts without a real clock.
    pub fn step(&mut self, delta_ms: f32) -> bool {
        self.run_frame(|clock| clock.advance(delta_ms))
    }

    pub fn mouse_move(&mut self, x: f32, y: f32) {
        if let Some(active) = self.active.as_mut() {
            active.demo.on_mouse_move(x, y);
        }
    }

    pub fn mouse_down(&mut self, x: f32, y: f32, button: MouseButton) {
        if let Some(active) = self.active.as_mut() {
            active.demo.on_mouse_down(x, y, button);
        }
    }

    pub fn mouse_up(&mut self, x: f32, y: f32, button: MouseButton) {
        if let Some(active) = self.active.as_mut() {
            active.demo.on_mouse_up(x, y, button);
        }
    }

    pub fn click(&mut self, x: f32, y: f32) {
        if let Some(active) = self.active.as_mut() {
            active.demo.on_click(x, y);
        }
    }

    /// Returns the id of the active demo.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.id.as_str())
    }

    /// Returns the lifecycle state of the active demo, `None` when nothing is loaded.
    pub fn state(&self) -> Option<RunState> {
        self.active.as_ref().map(|active| active.state)
    }

    pub fn frame_count(&self) -> u64 {
        self.active.as_ref().map_or(0, |active| active.clock.frame())
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.active.as_ref().map_or(0.0, |active| active.clock.elapsed_ms())
    }

    /// Returns the merged options of the active demo.
    pub fn options(&self) -> Option<&DemoOptions> {
        self.active.as_ref().map(|active| &active.options)
    }

    fn run_frame(&mut self, tick: impl FnOnce(&mut FrameClock) -> f32) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if active.state != RunState::Running {
            return false;
        }
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };

        let delta = tick(&mut active.clock);
        active.demo.update(delta);
        active.demo.render(surface);
        true
    }

    fn transition(&mut self, next: impl FnOnce(RunState) -> Option<RunState>) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        match next(active.state) {
            Some(state) => {
                if state == RunState::Running {
                    active.clock.suspend();
                }
                active.state = state;
                true
            }
            None => false,
        }
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::demo::{Category, Control, DemoMetadata, Difficulty};

    type Log = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: String,
        log: Log,
        speed: f64,
    }

    impl Demo for Probe {
        fn init(&mut self) {
            self.log.borrow_mut().push(format!("{}:init", self.name));
        }

        fn update(&mut self, delta_ms: f32) {
            self.log
                .borrow_mut()
                .push(format!("{}:update:{delta_ms}", self.name));
        }

        fn render(&self, surface: &mut Surface) {
            surface.set(0, 0, Rgba::WHITE);
        }

        fn options_changed(&mut self, name: &str, options: &DemoOptions) {
            self.speed = options.number("speed", self.speed);
            self.log
                .borrow_mut()
                .push(format!("{}:option:{name}:{}", self.name, self.speed));
        }

        fn destroy(&mut self) {
            self.log.borrow_mut().push(format!("{}:destroy", self.name));
        }

        fn on_click(&mut self, x: f32, y: f32) {
            self.log.borrow_mut().push(format!("{}:click:{x},{y}", self.name));
        }
    }

    fn probe_entry(name: &'static str, log: &Log) -> DemoEntry {
        let log = log.clone();
        DemoEntry::new(
            DemoMetadata::new(name, "test probe", Difficulty::Beginner, Category::Gradient),
            vec![Control::slider("speed", "Speed", 0.0, 10.0, 1.0)],
            DemoOptions::new().with("speed", 1.0).with("color", "#ffffff"),
            Box::new(move |context: &DemoContext| -> Box<dyn Demo> {
                log.borrow_mut().push(format!(
                    "{name}:new:{}x{}:{}",
                    context.width,
                    context.height,
                    context.options.number("speed", -1.0)
                ));
                Box::new(Probe {
                    name: name.to_string(),
                    log: log.clone(),
                    speed: context.options.number("speed", 0.0),
                })
            }),
        )
    }

    fn runner_with_probes() -> (Runner, Log) {
        let log: Log = Rc::default();
        let mut registry = DemoRegistry::new();
        registry.register("a", probe_entry("a", &log));
        registry.register("b", probe_entry("b", &log));
        (Runner::new(registry), log)
    }

    #[test]
    fn load_requires_a_surface_and_a_known_id() {
        let (mut runner, log) = runner_with_probes();
        assert!(!runner.load("a", &DemoOptions::new()));
        assert!(matches!(
            runner.try_load("a", &DemoOptions::new()),
            Err(FxError::NoSurface)
        ));

        runner.bind_surface(Surface::new(8, 4).unwrap());
        assert!(!runner.load("missing", &DemoOptions::new()));
        assert!(log.borrow().is_empty());

        assert!(runner.load("a", &DemoOptions::new()));
        assert_eq!(runner.active_id(), Some("a"));
        assert_eq!(runner.state(), Some(RunState::Running));
    }

    #[test]
    fn failed_load_keeps_the_current_demo() {
        let (mut runner, log) = runner_with_probes();
        runner.bind_surface(Surface::new(8, 4).unwrap());
        runner.load("a", &DemoOptions::new());
        assert!(!runner.load("nope", &DemoOptions::new()));
        assert_eq!(runner.active_id(), Some("a"));
        assert!(!log.borrow().iter().any(|line| line == "a:destroy"));
    }

    #[test]
    fn load_tears_down_previous_instance() {
        let (mut runner, log) = runner_with_probes();
        runner.bind_surface(Surface::new(8, 4).unwrap());
        runner.load("a", &DemoOptions::new());
        runner.load("b", &DemoOptions::new().with("speed", 4.0));

        let log = log.borrow();
        assert_eq!(
            *log,
            vec![
                "a:new:8x4:1".to_string(),
                "a:init".to_string(),
                "b:new:8x4:4".to_string(),
                "a:destroy".to_string(),
                "b:init".to_string(),
            ]
        );
        assert_eq!(runner.active_id(), Some("b"));
        let options = runner.options().unwrap();
        assert_eq!(options.number("speed", 0.0), 4.0);
        assert_eq!(options.color("color", Rgba::BLACK), Rgba::WHITE);
    }

    #[test]
    fn frames_advance_clock_and_draw() {
        let (mut runner, log) = runner_with_probes();
        runner.bind_surface(Surface::new(8, 4).unwrap());
        assert!(!runner.frame(0.0));

        runner.load("a", &DemoOptions::new());
        assert!(runner.frame(1000.0));
        assert!(runner.frame(1016.0));
        assert!(runner.step(20.0));

        assert_eq!(runner.frame_count(), 3);
        assert_eq!(runner.elapsed_ms(), 36.0);
        assert_eq!(runner.surface().unwrap().get(0, 0), Some(Rgba::WHITE));
        assert!(log.borrow().contains(&"a:update:16".to_string()));
    }

    #[test]
    fn paused_and_stopped_demos_skip_frames() {
        let (mut runner, _log) = runner_with_probes();
        runner.bind_surface(Surface::new(8, 4).unwrap());
        runner.load("a", &DemoOptions::new());
        runner.frame(0.0);

        assert!(runner.pause());
        assert!(!runner.pause());
        assert!(!runner.frame(100.0));
        assert!(runner.resume());
        // Time spent paused is not reported as a delta.
        runner.frame(5_000.0);
        assert_eq!(runner.elapsed_ms(), 0.0);

        assert!(runner.stop());
        assert!(!runner.frame(6_000.0));
        assert!(!runner.resume());
        assert!(runner.start());
        assert!(runner.frame(6_016.0));
        assert_eq!(runner.frame_count(), 3);
    }

    #[test]
    fn set_option_reaches_only_the_active_demo() {
        let (mut runner, log) = runner_with_probes();
        assert!(!runner.set_option("speed", 3.0));

        runner.bind_surface(Surface::new(8, 4).unwrap());
        runner.load("a", &DemoOptions::new());
        assert!(runner.set_option("speed", 3.0));
        assert_eq!(runner.options().unwrap().number("speed", 0.0), 3.0);
        assert!(log.borrow().contains(&"a:option:speed:3".to_string()));
    }

    #[test]
    fn input_and_unload() {
        let (mut runner, log) = runner_with_probes();
        runner.click(1.0, 1.0);
        runner.bind_surface(Surface::new(8, 4).unwrap());
        runner.load("a", &DemoOptions::new());
        runner.click(2.0, 3.0);
        runner.unload();
        runner.click(4.0, 4.0);

        assert_eq!(runner.active_id(), None);
        assert!(!runner.start());
        let log = log.borrow();
        assert!(log.contains(&"a:click:2,3".to_string()));
        assert_eq!(log.last().map(String::as_str), Some("a:destroy"));
    }

    #[test]
    fn registering_twice_overwrites() {
        let (mut runner, log) = runner_with_probes();
        runner.registry_mut().register("a", probe_entry("b", &log));
        assert_eq!(runner.registry().len(), 2);
        assert_eq!(runner.registry().get("a").unwrap().metadata.name, "b");
    }
}
