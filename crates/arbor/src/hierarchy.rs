//! # Hierarchy
//!
//! The root coordinator. A [`Hierarchy`] owns the active node tree together
//! with everything the lifecycle hooks see through [`NodeContext`]: frame
//! time, input, the deferred registration queue, and the physics world.
//!
//! The caller drives the passes. [`Engine`](crate::engine::Engine) does it in
//! the usual order:
//!
//! ```text
//! awake → update → (pre_physics_update → physics_update)* → draw
//! ```
//!
//! `awake` is the only point where the tree grows: it first applies every
//! pending registration in submission order, then wakes any node that has not
//! been woken yet. Nodes spawned during a frame therefore join the tree for
//! the next frame's passes, never the pass that spawned them.

use std::path::{Path, PathBuf};

use crate::config::KernelConfig;
use crate::context::NodeContext;
use crate::error::KernelError;
use crate::input::{Input, KeyCode};
use crate::node::{AttachRefusal, CollectionTarget, Node, NodeId, traverse};
use crate::physics::{ContactDispatcher, PhysicsWorld, release_physics};
use crate::registration::Registrations;
use crate::render::DrawList;
use crate::scene::{self, NodeRegistry};
use crate::time::Time;

pub struct Hierarchy {
    root: Option<Box<dyn Node>>,
    registrations: Registrations,
    time: Time,
    input: Input<KeyCode>,
    physics: Option<PhysicsWorld>,
    registry: NodeRegistry,
    save_path: Option<PathBuf>,
}

impl Hierarchy {
    pub fn new(config: &KernelConfig) -> Self {
        let physics = config
            .physics_enabled
            .then(|| PhysicsWorld::new().with_gravity(config.gravity));
        Self {
            root: None,
            registrations: Registrations::new(),
            time: Time::new(),
            input: Input::new(),
            physics,
            registry: NodeRegistry::with_builtins(),
            save_path: config.save_path.clone(),
        }
    }

    /// Split borrows: the root and a context over the remaining state.
    fn parts(&mut self) -> (Option<&mut Box<dyn Node>>, NodeContext<'_>) {
        let ctx = NodeContext::new(
            &self.time,
            &self.input,
            &mut self.registrations,
            self.physics.as_mut(),
        );
        (self.root.as_mut(), ctx)
    }

    // ── Root ────────────────────────────────────────────────────────

    /// Replace the active tree and discard all pending registrations. The new
    /// tree is not awoken here.
    ///
    /// Returns the previous root. Its physics bodies stay in the world until
    /// released with [`release_physics`].
    pub fn set_root_node(&mut self, root: Option<Box<dyn Node>>) -> Option<Box<dyn Node>> {
        if !self.registrations.is_empty() {
            log::debug!(
                "discarding {} pending registrations with the old root",
                self.registrations.len()
            );
            self.registrations.clear();
        }
        match &root {
            Some(node) => log::info!("root set to {} ({})", node.core().id(), node.type_name()),
            None => log::info!("root cleared"),
        }
        std::mem::replace(&mut self.root, root)
    }

    /// Convenience for `set_root_node(Some(Box::new(root)))`.
    pub fn set_root(&mut self, root: impl Node) -> Option<Box<dyn Node>> {
        self.set_root_node(Some(Box::new(root)))
    }

    pub fn root(&self) -> Option<&dyn Node> {
        self.root.as_ref().map(|r| r.as_ref() as &dyn Node)
    }

    pub fn root_mut(&mut self) -> Option<&mut dyn Node> {
        self.root.as_mut().map(|r| r.as_mut() as &mut dyn Node)
    }

    /// The root, if it is a `T`.
    pub fn root_as<T: Node>(&self) -> Option<&T> {
        self.root.as_ref()?.as_any().downcast_ref::<T>()
    }

    pub fn root_as_mut<T: Node>(&mut self) -> Option<&mut T> {
        self.root.as_mut()?.as_any_mut().downcast_mut::<T>()
    }

    // ── Passes ──────────────────────────────────────────────────────

    /// Apply pending registrations, then wake every node not yet awake.
    ///
    /// # Errors
    ///
    /// [`KernelError::PhysicsUninitialized`] if a node with a body is woken
    /// while physics is disabled.
    pub fn awake(&mut self) -> Result<(), KernelError> {
        self.drain_registrations();
        let (root, mut ctx) = self.parts();
        if let Some(root) = root {
            traverse::awake(root.as_mut(), &mut ctx)?;
        }
        Ok(())
    }

    fn drain_registrations(&mut self) {
        let pending = self.registrations.take_all();
        if pending.is_empty() {
            return;
        }
        let Some(root) = self.root.as_mut() else {
            log::warn!("no root; dropping {} pending registrations", pending.len());
            return;
        };

        let total = pending.len();
        let mut dropped = 0;
        for entry in pending {
            let Some(owner) = traverse::find_mut(root.as_mut(), entry.owner) else {
                log::warn!(
                    "registration into `{}` dropped: owner {} is not in the tree",
                    entry.collection,
                    entry.owner
                );
                dropped += 1;
                continue;
            };
            match owner.core_mut().attach_to_collection(entry.collection, entry.node) {
                Ok(_) => {}
                Err((node, AttachRefusal::NoSuchCollection)) => {
                    log::warn!(
                        "registration of {} dropped: owner {} has no collection `{}`",
                        node.core().id(),
                        entry.owner,
                        entry.collection
                    );
                    dropped += 1;
                }
                Err((node, AttachRefusal::WrongType { expected })) => {
                    log::warn!(
                        "registration of {} dropped: `{}` on owner {} holds {expected}, not {}",
                        node.core().id(),
                        entry.collection,
                        entry.owner,
                        node.type_name()
                    );
                    dropped += 1;
                }
            }
        }
        log::debug!("applied {} of {total} pending registrations", total - dropped);
    }

    /// Advance frame time by `dt` seconds and run the update pass.
    pub fn update(&mut self, dt: f32) {
        self.time.advance(dt);
        let (root, mut ctx) = self.parts();
        if let Some(root) = root {
            traverse::update(root.as_mut(), &mut ctx);
        }
        self.input.end_frame();
    }

    /// Run `on_pre_physics_update`, pushing trigger transforms into their bodies.
    pub fn pre_physics_update(&mut self) {
        let (root, mut ctx) = self.parts();
        if let Some(root) = root {
            traverse::pre_physics(root.as_mut(), &mut ctx);
        }
    }

    /// Step the physics world by `step` seconds, deliver the contacts that
    /// began, pull rigid-body poses back into their nodes, then run
    /// `on_physics_update`.
    pub fn physics_update(&mut self, step: f32) {
        let contacts = match self.physics.as_mut() {
            Some(world) => world.step(step),
            None => Vec::new(),
        };
        let (root, mut ctx) = self.parts();
        let Some(root) = root else {
            return;
        };
        if !contacts.is_empty() {
            let summary = ContactDispatcher::dispatch(root.as_mut(), &contacts, &mut ctx);
            log::trace!("contacts dispatched: {summary:?}");
        }
        traverse::physics(root.as_mut(), &mut ctx);
    }

    /// Clear `list` and fill it from the draw pass.
    pub fn draw(&mut self, list: &mut DrawList) {
        list.clear();
        let (root, mut ctx) = self.parts();
        if let Some(root) = root {
            traverse::draw(root.as_mut(), &mut ctx, list);
        }
    }

    /// Queue `node` for `target`; it is attached at the start of the next
    /// [`awake`](Self::awake).
    pub fn register_node<T: Node>(&mut self, node: T, target: CollectionTarget<T>) {
        self.registrations.push(node, target);
    }

    pub fn pending_registrations(&self) -> usize {
        self.registrations.len()
    }

    // ── Persistence ─────────────────────────────────────────────────

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    pub fn set_save_path(&mut self, path: Option<PathBuf>) {
        self.save_path = path;
    }

    /// Save the active tree to the configured save path. Logs and does
    /// nothing if there is no root or no path.
    pub fn save_current_root_node(&self) -> Result<(), KernelError> {
        let Some(path) = self.save_path.as_deref() else {
            log::warn!("save requested but no save path is configured");
            return Ok(());
        };
        self.save_root_node_to(path)
    }

    /// Save the active tree to `path`. Logs and does nothing if there is no root.
    pub fn save_root_node_to(&self, path: impl AsRef<Path>) -> Result<(), KernelError> {
        let path = path.as_ref();
        let Some(root) = self.root.as_deref() else {
            log::warn!("save requested but there is no root node");
            return Ok(());
        };
        scene::save_node_to_file(root, path)?;
        log::info!("saved scene to {} ({} nodes)", path.display(), traverse::count(root));
        Ok(())
    }

    /// Replace the active tree with the one saved at the configured path.
    /// Logs and does nothing if no path is configured.
    pub fn load_root_node(&mut self) -> Result<(), KernelError> {
        let Some(path) = self.save_path.clone() else {
            log::warn!("load requested but no save path is configured");
            return Ok(());
        };
        self.load_root_node_from(path)
    }

    /// Replace the active tree with the one saved at `path`.
    ///
    /// The document is fully decoded before anything changes; on error the
    /// current tree and queue are left as they were. On success the old
    /// tree's bodies are released and the new tree waits for the next awake.
    pub fn load_root_node_from(&mut self, path: impl AsRef<Path>) -> Result<(), KernelError> {
        let path = path.as_ref();
        let root = scene::load_node_from_file(path, &self.registry)?;
        log::info!("loaded scene from {} ({} nodes)", path.display(), traverse::count(root.as_ref()));

        if let (Some(mut old), Some(world)) = (self.set_root_node(Some(root)), self.physics.as_mut()) {
            release_physics(old.as_mut(), world);
        }
        Ok(())
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Register node types the loader must be able to construct.
    pub fn registry_mut(&mut self) -> &mut NodeRegistry {
        &mut self.registry
    }

    // ── Lookup & state ──────────────────────────────────────────────

    pub fn find(&self, id: NodeId) -> Option<&dyn Node> {
        traverse::find(self.root.as_deref()?, id)
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut dyn Node> {
        traverse::find_mut(self.root.as_deref_mut()?, id)
    }

    /// Nodes in the active tree, root included.
    pub fn node_count(&self) -> usize {
        self.root.as_deref().map_or(0, |root| traverse::count(root))
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn input(&self) -> &Input<KeyCode> {
        &self.input
    }

    /// Feed key events here between frames.
    pub fn input_mut(&mut self) -> &mut Input<KeyCode> {
        &mut self.input
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_mut()
    }
}

impl Default for Hierarchy {
    fn default() -> Self {
        Self::new(&KernelConfig::default())
    }
}

impl std::fmt::Debug for Hierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hierarchy")
            .field("nodes", &self.node_count())
            .field("pending", &self.registrations.len())
            .field("time", &self.time)
            .field("physics", &self.physics)
            .field("save_path", &self.save_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;
    use crate::math::Transform2d;
    use crate::node::{Collection, Group, NodeCore};
    use crate::physics::{Collider, ContactPeer, PhysicsBody, RigidBody, Trigger};

    fn headless() -> Hierarchy {
        Hierarchy::new(&KernelConfig::default().with_physics(false))
    }

    fn zero_gravity() -> Hierarchy {
        Hierarchy::new(&KernelConfig::default().with_gravity(glam::Vec2::ZERO))
    }

    // ── Blaster ─────────────────────────────────────────────────────

    #[derive(Default)]
    struct Bullet {
        core: NodeCore,
    }
    crate::node_base!(Bullet);
    impl Node for Bullet {}

    struct Blaster {
        core: NodeCore,
        cooldown: f32,
        current_cooldown: f32,
        is_shooting: bool,
    }
    crate::node_base!(Blaster);

    impl Blaster {
        const BULLETS: Collection<Bullet> = Collection::new("bullets");

        fn new() -> Self {
            Self {
                core: NodeCore::new().with_collection(Self::BULLETS),
                cooldown: 0.1,
                current_cooldown: 0.1,
                is_shooting: true,
            }
        }
    }

    impl Node for Blaster {
        fn on_update(&mut self, ctx: &mut NodeContext<'_>) {
            if !self.is_shooting {
                return;
            }
            self.current_cooldown -= ctx.delta_secs();
            if self.current_cooldown <= 0.0 {
                let target = self.core.target(Self::BULLETS);
                ctx.register(Bullet::default(), target);
                self.current_cooldown = self.cooldown;
            }
        }
    }

    #[test]
    fn blaster_fires_once_per_cooldown() {
        let mut hierarchy = headless();
        hierarchy.set_root(Blaster::new());
        hierarchy.awake().unwrap();

        hierarchy.update(0.05);
        let blaster = hierarchy.root_as::<Blaster>().unwrap();
        assert!(blaster.current_cooldown > 0.0);
        assert_eq!(hierarchy.pending_registrations(), 0);

        hierarchy.update(0.05);
        assert_eq!(hierarchy.pending_registrations(), 1);
        let blaster = hierarchy.root_as::<Blaster>().unwrap();
        assert_eq!(blaster.current_cooldown, 0.1);
        assert_eq!(blaster.core.collection_len(Blaster::BULLETS), 0);

        hierarchy.awake().unwrap();
        let blaster = hierarchy.root_as::<Blaster>().unwrap();
        assert_eq!(blaster.core.collection_len(Blaster::BULLETS), 1);
        assert!(blaster.core.collection(Blaster::BULLETS).all(|b| b.core.is_awake()));
        assert_eq!(hierarchy.pending_registrations(), 0);
    }

    // ── Spawning ────────────────────────────────────────────────────

    #[derive(Default)]
    struct Item {
        core: NodeCore,
        serial: usize,
        visits: Rc<Cell<usize>>,
    }
    crate::node_base!(Item);

    impl Node for Item {
        fn on_update(&mut self, _ctx: &mut NodeContext<'_>) {
            self.visits.set(self.visits.get() + 1);
        }
    }

    /// Registers `burst` items into its own collection on every update.
    struct Spawner {
        core: NodeCore,
        burst: usize,
        spawned: usize,
        visits: Rc<Cell<usize>>,
    }
    crate::node_base!(Spawner);

    impl Spawner {
        const ITEMS: Collection<Item> = Collection::new("items");

        fn new(burst: usize, visits: &Rc<Cell<usize>>) -> Self {
            Self {
                core: NodeCore::new().with_collection(Self::ITEMS),
                burst,
                spawned: 0,
                visits: visits.clone(),
            }
        }
    }

    impl Node for Spawner {
        fn on_update(&mut self, ctx: &mut NodeContext<'_>) {
            self.visits.set(self.visits.get() + 1);
            let target = self.core.target(Self::ITEMS);
            for _ in 0..self.burst {
                let item = Item {
                    serial: self.spawned,
                    visits: self.visits.clone(),
                    ..Default::default()
                };
                ctx.register(item, target);
                self.spawned += 1;
            }
        }
    }

    #[test]
    fn registrations_apply_in_call_order_on_next_awake() {
        let visits = Rc::new(Cell::new(0));
        let mut hierarchy = headless();
        hierarchy.set_root(Spawner::new(3, &visits));
        hierarchy.awake().unwrap();

        hierarchy.update(0.016);
        let spawner = hierarchy.root_as::<Spawner>().unwrap();
        assert_eq!(spawner.core.collection_len(Spawner::ITEMS), 0);
        assert_eq!(spawner.core.child_count(), 0);

        hierarchy.awake().unwrap();
        let spawner = hierarchy.root_as::<Spawner>().unwrap();
        let serials: Vec<_> = spawner.core.collection(Spawner::ITEMS).map(|i| i.serial).collect();
        assert_eq!(serials, [0, 1, 2]);
    }

    #[test]
    fn hundred_spawns_do_not_disturb_running_pass() {
        let visits = Rc::new(Cell::new(0));
        let mut hierarchy = headless();
        hierarchy.set_root(Spawner::new(100, &visits));
        hierarchy.awake().unwrap();
        assert_eq!(hierarchy.node_count(), 1);

        hierarchy.update(0.016);
        assert_eq!(visits.get(), 1);
        assert_eq!(hierarchy.pending_registrations(), 100);

        hierarchy.awake().unwrap();
        assert_eq!(hierarchy.node_count(), 101);
        let spawner = hierarchy.root_as::<Spawner>().unwrap();
        let serials: Vec<_> = spawner.core.collection(Spawner::ITEMS).map(|i| i.serial).collect();
        assert_eq!(serials, (0..100).collect::<Vec<_>>());

        visits.set(0);
        hierarchy.update(0.016);
        assert_eq!(visits.get(), 101);
    }

    #[test]
    fn stale_registrations_are_dropped() {
        let visits = Rc::new(Cell::new(0));
        let mut hierarchy = headless();
        let plain = Group::new();
        let plain_id = plain.core.id();
        let root = Spawner::new(0, &visits);
        let root = Spawner {
            core: root.core.with_child(plain),
            ..root
        };
        hierarchy.set_root(root);

        // owner never joined the tree
        let orphan = Spawner::new(0, &visits);
        hierarchy.register_node(Item::default(), orphan.core.target(Spawner::ITEMS));
        // owner is in the tree but has no such collection
        hierarchy.register_node(Item::default(), Spawner::ITEMS.on(plain_id));

        hierarchy.awake().unwrap();
        assert_eq!(hierarchy.pending_registrations(), 0);
        assert_eq!(hierarchy.node_count(), 2);
    }

    #[test]
    fn registration_of_wrong_type_is_dropped() {
        let visits = Rc::new(Cell::new(0));
        let mut hierarchy = headless();
        let spawner = Spawner::new(0, &visits);
        let spawner_id = spawner.core.id();
        hierarchy.set_root(spawner);

        // same collection name, different member type
        let forged = Collection::<Bullet>::new("items").on(spawner_id);
        hierarchy.register_node(Bullet::default(), forged);
        hierarchy.awake().unwrap();

        let spawner = hierarchy.root_as::<Spawner>().unwrap();
        assert_eq!(spawner.core.collection_len(Spawner::ITEMS), 0);
        assert_eq!(spawner.core.collection(Spawner::ITEMS).count(), 0);
        assert_eq!(hierarchy.pending_registrations(), 0);
        assert_eq!(hierarchy.node_count(), 1);
    }

    /// Spawns from the physics hooks and records which hook did it.
    struct Dropper {
        core: NodeCore,
        spawned: usize,
        sources: Vec<&'static str>,
    }
    crate::node_base!(Dropper);

    impl Dropper {
        const DROPS: Collection<Item> = Collection::new("drops");

        fn drop_item(&mut self, ctx: &mut NodeContext<'_>, source: &'static str) {
            let target = self.core.target(Self::DROPS);
            let item = Item {
                serial: self.spawned,
                ..Default::default()
            };
            ctx.register(item, target);
            self.spawned += 1;
            self.sources.push(source);
        }
    }

    impl Node for Dropper {
        fn on_physics_update(&mut self, ctx: &mut NodeContext<'_>) {
            self.drop_item(ctx, "physics");
        }
        fn begin_collision(&mut self, ctx: &mut NodeContext<'_>, _other: &ContactPeer) {
            self.drop_item(ctx, "collision");
        }
    }

    #[test]
    fn physics_pass_registrations_wait_for_next_awake() {
        let mut hierarchy = zero_gravity();
        let dropper = Dropper {
            core: NodeCore::new()
                .with_body(PhysicsBody::collider())
                .with_collection(Dropper::DROPS)
                .with_child(RigidBody::new(Transform2d::from_xy(0.25, 0.0))),
            spawned: 0,
            sources: Vec::new(),
        };
        hierarchy.set_root(dropper);
        hierarchy.awake().unwrap();

        hierarchy.pre_physics_update();
        hierarchy.physics_update(1.0 / 60.0);
        assert_eq!(hierarchy.pending_registrations(), 2);
        let dropper = hierarchy.root_as::<Dropper>().unwrap();
        assert_eq!(dropper.sources, ["collision", "physics"]);
        assert_eq!(dropper.core.collection_len(Dropper::DROPS), 0);
        assert_eq!(dropper.core.child_count(), 1);

        hierarchy.awake().unwrap();
        let dropper = hierarchy.root_as::<Dropper>().unwrap();
        let serials: Vec<_> = dropper.core.collection(Dropper::DROPS).map(|i| i.serial).collect();
        assert_eq!(serials, [0, 1]);
        assert_eq!(dropper.core.child_count(), 3);
        assert_eq!(hierarchy.pending_registrations(), 0);
    }

    struct Painter {
        core: NodeCore,
    }
    crate::node_base!(Painter);

    impl Painter {
        const STROKES: Collection<Item> = Collection::new("strokes");
    }

    impl Node for Painter {
        fn on_draw(&mut self, ctx: &mut NodeContext<'_>, _draw: &mut DrawList) {
            let target = self.core.target(Self::STROKES);
            ctx.register(Item::default(), target);
        }
    }

    #[test]
    fn draw_hook_can_register() {
        let mut hierarchy = headless();
        hierarchy.set_root(Painter {
            core: NodeCore::new().with_collection(Painter::STROKES),
        });
        hierarchy.awake().unwrap();

        let mut list = DrawList::new();
        hierarchy.draw(&mut list);
        assert_eq!(hierarchy.pending_registrations(), 1);
        assert_eq!(hierarchy.node_count(), 1);

        hierarchy.awake().unwrap();
        let painter = hierarchy.root_as::<Painter>().unwrap();
        assert_eq!(painter.core.collection_len(Painter::STROKES), 1);
    }

    #[test]
    fn set_root_discards_pending() {
        let visits = Rc::new(Cell::new(0));
        let mut hierarchy = headless();
        let spawner = Spawner::new(0, &visits);
        let target = spawner.core.target(Spawner::ITEMS);
        hierarchy.set_root(spawner);
        hierarchy.register_node(Item::default(), target);

        let previous = hierarchy.set_root(Group::new());
        assert!(previous.is_some());
        assert_eq!(hierarchy.pending_registrations(), 0);
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    type Log = Rc<RefCell<Vec<String>>>;

    struct Named {
        core: NodeCore,
        name: &'static str,
        log: Log,
    }
    crate::node_base!(Named);

    impl Node for Named {
        fn on_awake(&mut self, _ctx: &mut NodeContext<'_>) {
            self.log.borrow_mut().push(self.name.to_string());
        }
    }

    fn named(name: &'static str, log: &Log, children: Vec<Named>) -> Named {
        let mut core = NodeCore::new();
        for child in children {
            core = core.with_child(child);
        }
        Named {
            core,
            name,
            log: log.clone(),
        }
    }

    #[test]
    fn parents_wake_before_children() {
        let log = Log::default();
        let tree = named(
            "root",
            &log,
            vec![
                named("a", &log, vec![named("a.1", &log, vec![]), named("a.2", &log, vec![])]),
                named("b", &log, vec![named("b.1", &log, vec![])]),
            ],
        );
        let mut hierarchy = headless();
        hierarchy.set_root(tree);
        hierarchy.awake().unwrap();
        hierarchy.awake().unwrap();
        assert_eq!(*log.borrow(), ["root", "a", "a.1", "a.2", "b", "b.1"]);
    }

    #[test]
    fn passes_without_root_are_noops() {
        let mut hierarchy = headless();
        hierarchy.awake().unwrap();
        hierarchy.update(0.5);
        hierarchy.pre_physics_update();
        hierarchy.physics_update(1.0 / 60.0);
        let mut list = DrawList::new();
        hierarchy.draw(&mut list);
        assert!(list.is_empty());
        assert_eq!(hierarchy.node_count(), 0);
        assert_eq!(hierarchy.time().frame_count(), 1);
    }

    #[test]
    fn body_without_physics_is_fatal() {
        let mut hierarchy = headless();
        let wall = Collider::default();
        let wall_id = wall.core.id();
        hierarchy.set_root(Group::with_core(NodeCore::new().with_child(wall)));
        let err = hierarchy.awake().unwrap_err();
        assert!(matches!(err, KernelError::PhysicsUninitialized { node } if node == wall_id));
    }

    // ── Physics ─────────────────────────────────────────────────────

    #[test]
    fn rigid_body_pose_is_pulled_after_step() {
        let mut hierarchy = Hierarchy::default();
        let body = RigidBody::new(Transform2d::from_xy(0.0, 5.0));
        let id = body.core.id();
        hierarchy.set_root(Group::with_core(NodeCore::new().with_child(body)));
        hierarchy.awake().unwrap();

        hierarchy.pre_physics_update();
        hierarchy.physics_update(1.0 / 60.0);

        let world = hierarchy.physics().unwrap();
        let node = hierarchy.find(id).unwrap();
        let (simulated, angle) = node.core().body().unwrap().pose(world).unwrap();
        assert_eq!(node.core().transform.position, simulated);
        assert_eq!(node.core().transform.rotation, angle);
        assert!(simulated.y < 5.0);
    }

    #[test]
    fn trigger_pose_is_pushed_before_step() {
        let mut hierarchy = Hierarchy::default();
        let trigger = Trigger::new(Transform2d::IDENTITY);
        let id = trigger.core.id();
        hierarchy.set_root(trigger);
        hierarchy.awake().unwrap();

        hierarchy.find_mut(id).unwrap().core_mut().transform.position = glam::Vec2::new(2.0, 3.0);
        hierarchy.pre_physics_update();
        hierarchy.physics_update(1.0 / 60.0);

        let node = hierarchy.find(id).unwrap();
        let (position, _) = node.core().body().unwrap().pose(hierarchy.physics().unwrap()).unwrap();
        assert!((position - glam::Vec2::new(2.0, 3.0)).length() < 1e-4);
        assert_eq!(node.core().transform.position, glam::Vec2::new(2.0, 3.0));
    }

    type Hits = Rc<RefCell<Vec<(NodeId, NodeId)>>>;

    struct Bumper {
        core: NodeCore,
        hits: Hits,
    }
    crate::node_base!(Bumper);

    impl Bumper {
        fn new(x: f32, body: PhysicsBody, hits: &Hits) -> Self {
            Self {
                core: NodeCore::new()
                    .with_transform(Transform2d::from_xy(x, 0.0))
                    .with_body(body),
                hits: hits.clone(),
            }
        }
    }

    impl Node for Bumper {
        fn begin_collision(&mut self, _ctx: &mut NodeContext<'_>, other: &ContactPeer) {
            self.hits.borrow_mut().push((self.core.id(), other.id));
        }
        fn begin_trigger(&mut self, _ctx: &mut NodeContext<'_>, other: &ContactPeer) {
            self.hits.borrow_mut().push((self.core.id(), other.id));
        }
    }

    fn bump(first: PhysicsBody, second: PhysicsBody) -> (Vec<(NodeId, NodeId)>, NodeId, NodeId) {
        let hits = Hits::default();
        let a = Bumper::new(0.0, first, &hits);
        let b = Bumper::new(0.4, second, &hits);
        let (a_id, b_id) = (a.core.id(), b.core.id());

        let mut hierarchy = zero_gravity();
        hierarchy.set_root(Group::with_core(NodeCore::new().with_child(a).with_child(b)));
        hierarchy.awake().unwrap();
        for _ in 0..3 {
            hierarchy.pre_physics_update();
            hierarchy.physics_update(1.0 / 60.0);
        }
        let hits = hits.borrow().clone();
        (hits, a_id, b_id)
    }

    #[test]
    fn colliders_touching_fire_both_sides_once() {
        let (hits, a, b) = bump(PhysicsBody::collider(), PhysicsBody::rigid_body());
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&(a, b)));
        assert!(hits.contains(&(b, a)));
    }

    #[test]
    fn triggers_overlapping_fire_both_sides_once() {
        let (hits, a, b) = bump(PhysicsBody::trigger(), PhysicsBody::trigger());
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&(a, b)));
        assert!(hits.contains(&(b, a)));
    }

    #[test]
    fn collider_and_trigger_do_not_fire() {
        let (hits, _, _) = bump(PhysicsBody::collider(), PhysicsBody::trigger());
        assert!(hits.is_empty());
    }

    // ── Persistence ─────────────────────────────────────────────────

    #[test]
    fn save_and_load_without_path_are_noops() {
        let mut hierarchy = headless();
        hierarchy.save_current_root_node().unwrap();
        hierarchy.set_root(Group::new());
        let id = hierarchy.root().unwrap().core().id();
        hierarchy.save_current_root_node().unwrap();
        hierarchy.load_root_node().unwrap();
        assert_eq!(hierarchy.root().unwrap().core().id(), id);
    }

    #[test]
    fn save_without_root_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.scene");
        let hierarchy = Hierarchy::new(&KernelConfig::default().with_save_path(&path));
        hierarchy.save_current_root_node().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn failed_load_keeps_current_tree() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.scene");
        std::fs::write(&path, "not.a.Node\n{ nope").unwrap();

        let mut hierarchy = Hierarchy::new(&KernelConfig::default().with_save_path(&path));
        hierarchy.set_root(Group::with_core(NodeCore::new().with_child(Collider::default())));
        hierarchy.awake().unwrap();
        let id = hierarchy.root().unwrap().core().id();

        let err = hierarchy.load_root_node().unwrap_err();
        assert!(matches!(err, KernelError::Persist(_)));
        assert_eq!(hierarchy.root().unwrap().core().id(), id);
        assert_eq!(hierarchy.node_count(), 2);
        assert_eq!(hierarchy.physics().unwrap().body_count(), 1);
    }

    #[test]
    fn reload_swaps_tree_and_rebuilds_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level.scene");

        let mut hierarchy = Hierarchy::new(&KernelConfig::default().with_save_path(&path));
        let root = Group::with_core(
            NodeCore::new()
                .with_child(Collider::new(Transform2d::from_xy(1.0, 2.0)))
                .with_child(Group::new()),
        );
        hierarchy.set_root(root);
        hierarchy.awake().unwrap();
        let old_id = hierarchy.root().unwrap().core().id();
        hierarchy.save_current_root_node().unwrap();

        hierarchy.load_root_node().unwrap();
        assert_ne!(hierarchy.root().unwrap().core().id(), old_id);
        assert_eq!(hierarchy.node_count(), 3);
        assert_eq!(hierarchy.physics().unwrap().body_count(), 0);

        hierarchy.awake().unwrap();
        assert_eq!(hierarchy.physics().unwrap().body_count(), 1);
        let wall = hierarchy.root().unwrap().core().children().next().unwrap();
        assert_eq!(wall.core().transform.position, glam::Vec2::new(1.0, 2.0));
    }
}
