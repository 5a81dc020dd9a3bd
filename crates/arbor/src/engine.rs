//! Frame driver.
//!
//! [`Engine`] owns a [`Hierarchy`] and runs one frame per [`tick`](Engine::tick)
//! in a fixed order: awake, update, then as many fixed physics steps as the
//! accumulated time allows (each a pre-physics pass followed by a physics
//! pass), then draw. The window/event loop lives outside the kernel; it calls
//! `tick` once per frame and hands the returned [`DrawList`] to a renderer.
//!
//! # Example
//!
//! ```ignore
//! use arbor::prelude::*;
//!
//! let mut engine = Engine::new(KernelConfig::default())?.with_scene(Level::new());
//! loop {
//!     let frame = engine.tick(1.0 / 60.0)?;
//!     renderer.submit(frame);
//! }
//! ```

use crate::config::KernelConfig;
use crate::error::KernelError;
use crate::hierarchy::Hierarchy;
use crate::math::Mat4;
use crate::node::Node;
use crate::physics::release_physics;
use crate::render::DrawList;

pub struct Engine {
    hierarchy: Hierarchy,
    config: KernelConfig,
    accumulator: f32,
    steps_last_frame: u32,
    draw_list: DrawList,
}

impl Engine {
    /// Build an engine from `config`.
    ///
    /// # Errors
    ///
    /// [`KernelError::Config`] if the timing settings are unusable.
    pub fn new(config: KernelConfig) -> Result<Self, KernelError> {
        config.validate()?;
        Ok(Self {
            hierarchy: Hierarchy::new(&config),
            config,
            accumulator: 0.0,
            steps_last_frame: 0,
            draw_list: DrawList::new(),
        })
    }

    /// Set the initial scene (builder pattern).
    pub fn with_scene(mut self, root: impl Node) -> Self {
        self.set_scene(Some(Box::new(root)));
        self
    }

    /// Replace the active scene, releasing the old tree's physics bodies.
    pub fn set_scene(&mut self, root: Option<Box<dyn Node>>) {
        let previous = self.hierarchy.set_root_node(root);
        if let (Some(mut old), Some(world)) = (previous, self.hierarchy.physics_mut()) {
            release_physics(old.as_mut(), world);
        }
        self.accumulator = 0.0;
    }

    /// Projection written into every frame's draw list.
    pub fn set_projection(&mut self, projection: Mat4) {
        self.draw_list.set_projection(projection);
    }

    /// Run one frame of `frame_dt` seconds and return what it drew.
    ///
    /// # Errors
    ///
    /// Propagates [`Hierarchy::awake`] failures, which are fatal.
    pub fn tick(&mut self, frame_dt: f32) -> Result<&DrawList, KernelError> {
        self.hierarchy.awake()?;
        self.hierarchy.update(frame_dt);

        // Cap the backlog so one long frame cannot trigger a spiral of steps.
        self.accumulator += frame_dt.clamp(0.0, self.config.max_frame_delta);
        let step = self.config.fixed_timestep;
        let mut steps = 0;
        while self.accumulator >= step {
            self.hierarchy.pre_physics_update();
            self.hierarchy.physics_update(step);
            self.accumulator -= step;
            steps += 1;
        }
        self.steps_last_frame = steps;

        self.hierarchy.draw(&mut self.draw_list);
        Ok(&self.draw_list)
    }

    /// Tick `frames` times with a constant `dt`.
    pub fn run_for(&mut self, frames: u32, dt: f32) -> Result<(), KernelError> {
        for _ in 0..frames {
            self.tick(dt)?;
        }
        Ok(())
    }

    /// Fixed physics steps taken by the last [`tick`](Self::tick).
    pub fn steps_last_frame(&self) -> u32 {
        self.steps_last_frame
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn hierarchy_mut(&mut self) -> &mut Hierarchy {
        &mut self.hierarchy
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("hierarchy", &self.hierarchy)
            .field("accumulator", &self.accumulator)
            .field("steps_last_frame", &self.steps_last_frame)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::context::NodeContext;
    use crate::math::Transform2d;
    use crate::node::{Group, NodeCore};
    use crate::physics::RigidBody;

    type Log = Rc<RefCell<Vec<&'static str>>>;

    struct Recorder {
        core: NodeCore,
        log: Log,
    }
    crate::node_base!(Recorder);

    impl Node for Recorder {
        fn on_awake(&mut self, _ctx: &mut NodeContext<'_>) {
            self.log.borrow_mut().push("awake");
        }
        fn on_update(&mut self, _ctx: &mut NodeContext<'_>) {
            self.log.borrow_mut().push("update");
        }
        fn on_pre_physics_update(&mut self, _ctx: &mut NodeContext<'_>) {
            self.log.borrow_mut().push("pre_physics");
        }
        fn on_physics_update(&mut self, _ctx: &mut NodeContext<'_>) {
            self.log.borrow_mut().push("physics");
        }
        fn on_draw(&mut self, _ctx: &mut NodeContext<'_>, draw: &mut DrawList) {
            self.log.borrow_mut().push("draw");
            draw.quad(self.core.id(), &self.core.transform, None, [1.0; 4]);
        }
    }

    fn recorder(log: &Log) -> Recorder {
        Recorder {
            core: NodeCore::new(),
            log: log.clone(),
        }
    }

    fn config() -> KernelConfig {
        KernelConfig::default()
            .with_physics(false)
            .with_fixed_timestep(0.02)
            .with_max_frame_delta(0.1)
    }

    #[test]
    fn tick_runs_passes_in_order() {
        let log = Log::default();
        let mut engine = Engine::new(config()).unwrap().with_scene(recorder(&log));

        let drawn = engine.tick(0.02).unwrap().len();
        assert_eq!(drawn, 1);
        assert_eq!(engine.steps_last_frame(), 1);
        assert_eq!(*log.borrow(), ["awake", "update", "pre_physics", "physics", "draw"]);
    }

    #[test]
    fn accumulator_carries_and_caps() {
        let log = Log::default();
        let mut engine = Engine::new(config()).unwrap().with_scene(recorder(&log));

        engine.tick(0.01).unwrap();
        assert_eq!(engine.steps_last_frame(), 0);
        engine.tick(0.015).unwrap();
        assert_eq!(engine.steps_last_frame(), 1);

        // a one second hitch only feeds max_frame_delta into the accumulator
        engine.tick(1.0).unwrap();
        assert!(engine.steps_last_frame() <= 5);
        assert!(engine.steps_last_frame() >= 4);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = Engine::new(KernelConfig::default().with_fixed_timestep(0.0)).unwrap_err();
        assert!(matches!(err, KernelError::Config(_)));
    }

    #[test]
    fn set_scene_releases_old_bodies() {
        let mut engine = Engine::new(KernelConfig::default())
            .unwrap()
            .with_scene(RigidBody::new(Transform2d::from_xy(0.0, 3.0)));
        engine.run_for(10, 1.0 / 60.0).unwrap();
        assert_eq!(engine.hierarchy().physics().unwrap().body_count(), 1);
        let y = engine.hierarchy().root().unwrap().core().transform.position.y;
        assert!(y < 3.0);

        engine.set_scene(Some(Box::new(Group::new())));
        assert_eq!(engine.hierarchy().physics().unwrap().body_count(), 0);
    }

    #[test]
    fn draw_list_keeps_projection() {
        let mut engine = Engine::new(config()).unwrap().with_scene(Group::new());
        let projection = DrawList::orthographic(16.0, 9.0);
        engine.set_projection(projection);
        let frame = engine.tick(0.02).unwrap();
        assert_eq!(frame.projection(), projection);
        assert!(frame.is_empty());
    }
}
