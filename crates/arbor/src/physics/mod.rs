//! 2D physics bridge via Rapier.
//!
//! Nodes opt into simulation by carrying a [`PhysicsBody`] in their core. The
//! body is created in the [`PhysicsWorld`] when the node is awoken and the
//! kernel keeps the two in sync around every fixed step:
//!
//! - triggers are kinematic sensors; their node transform is pushed into the
//!   body before the step,
//! - rigid bodies are dynamic; their simulated pose is pulled back into the
//!   node after the step,
//! - colliders are plain solid shapes that the kernel never moves.
//!
//! Every collider stores its node id in Rapier's `user_data`, so contact
//! events map straight back to nodes (see [`contact`]).

pub mod contact;

use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver};

use rapier2d::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::Transform2d;
use crate::node::{Node, NodeCore, NodeId};

pub use contact::{ContactDispatcher, ContactPeer, ContactRoute, DispatchSummary, RawContact};

// ── Conversion helpers ──────────────────────────────────────────────────

fn to_rapier(v: glam::Vec2) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn from_rapier(v: Vec2) -> glam::Vec2 {
    glam::Vec2::new(v.x, v.y)
}

fn shape_to_collider_builder(shape: &ColliderShape) -> ColliderBuilder {
    match *shape {
        ColliderShape::Cuboid { hx, hy } => ColliderBuilder::cuboid(hx, hy),
        ColliderShape::Ball { radius } => ColliderBuilder::ball(radius),
    }
}

// ── Descriptions ────────────────────────────────────────────────────────

/// How the kernel treats a body during the physics passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Solid shape. Static unless its [`BodyType`] says otherwise; never synced.
    Collider,
    /// Kinematic sensor; the node transform drives the body.
    Trigger,
    /// Dynamic body; the simulation drives the node transform.
    RigidBody,
}

impl BodyKind {
    /// Colliders and rigid bodies collide with each other; triggers only overlap triggers.
    pub fn is_solid(self) -> bool {
        matches!(self, BodyKind::Collider | BodyKind::RigidBody)
    }
}

/// Motion type of a plain [`BodyKind::Collider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyType {
    #[default]
    Static,
    Dynamic,
}

/// Collider shape (half-extents for the cuboid).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColliderShape {
    Cuboid { hx: f32, hy: f32 },
    Ball { radius: f32 },
}

impl Default for ColliderShape {
    fn default() -> Self {
        ColliderShape::Cuboid { hx: 0.5, hy: 0.5 }
    }
}

/// Physics capability of a node.
///
/// Only the descriptive fields are persisted; the Rapier handles are managed
/// by the kernel and exist only while the node is part of an awoken tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsBody {
    kind: BodyKind,
    #[serde(default)]
    pub body_type: BodyType,
    #[serde(default)]
    pub shape: ColliderShape,
    pub density: f32,
    pub friction: f32,
    #[serde(skip)]
    handles: Option<(RigidBodyHandle, ColliderHandle)>,
}

impl PhysicsBody {
    fn of_kind(kind: BodyKind) -> Self {
        Self {
            kind,
            body_type: BodyType::Static,
            shape: ColliderShape::default(),
            density: 1.0,
            friction: 0.5,
            handles: None,
        }
    }

    /// A solid, static shape.
    pub fn collider() -> Self {
        Self::of_kind(BodyKind::Collider)
    }

    /// A kinematic sensor that follows its node.
    pub fn trigger() -> Self {
        Self {
            density: 0.0,
            friction: 0.0,
            ..Self::of_kind(BodyKind::Trigger)
        }
    }

    /// A dynamic body whose pose is copied back into its node.
    pub fn rigid_body() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            ..Self::of_kind(BodyKind::RigidBody)
        }
    }

    /// Motion type for plain colliders. Ignored for triggers and rigid bodies.
    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.body_type = body_type;
        self
    }

    pub fn with_shape(mut self, shape: ColliderShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Whether the body currently exists in a [`PhysicsWorld`].
    pub fn is_attached(&self) -> bool {
        self.handles.is_some()
    }

    pub fn handle(&self) -> Option<RigidBodyHandle> {
        self.handles.map(|(body, _)| body)
    }

    /// Create the Rapier body and collider for `node` at `transform`.
    pub(crate) fn attach(&mut self, world: &mut PhysicsWorld, node: NodeId, transform: &Transform2d) {
        if self.handles.is_some() {
            return;
        }
        self.handles = Some(world.insert(node, self, transform));
    }

    /// Schedule the body to move to `transform` during the next step.
    pub(crate) fn push_pose(&self, world: &mut PhysicsWorld, transform: &Transform2d) {
        if let Some(handle) = self.handle() {
            world.set_kinematic_pose(handle, transform.position, transform.rotation);
        }
    }

    /// Current simulated position and angle.
    pub fn pose(&self, world: &PhysicsWorld) -> Option<(glam::Vec2, f32)> {
        world.body_pose(self.handle()?)
    }

    /// Remove the body from `world`. The description stays, so the node can
    /// be attached again later.
    pub(crate) fn release(&mut self, world: &mut PhysicsWorld) {
        if let Some((handle, _)) = self.handles.take() {
            world.remove(handle);
        }
    }
}

// ── World ───────────────────────────────────────────────────────────────

/// The Rapier simulation backing every body in a hierarchy.
pub struct PhysicsWorld {
    gravity: Vec2,
    pipeline: PhysicsPipeline,
    params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    events: ChannelEventCollector,
    collision_events: Receiver<CollisionEvent>,
    /// No collider enables force events; kept so the sender stays connected.
    _force_events: Receiver<ContactForceEvent>,
    body_to_node: HashMap<RigidBodyHandle, NodeId>,
}

impl std::fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("gravity", &self.gravity)
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .finish()
    }
}

impl PhysicsWorld {
    /// Create a physics world with default gravity (0, -9.81).
    pub fn new() -> Self {
        let (collision_send, collision_events) = mpsc::channel();
        let (force_send, force_events) = mpsc::channel();
        Self {
            gravity: Vec2::new(0.0, -9.81),
            pipeline: PhysicsPipeline::new(),
            params: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            events: ChannelEventCollector::new(collision_send, force_send),
            collision_events,
            _force_events: force_events,
            body_to_node: HashMap::new(),
        }
    }

    /// Set gravity (builder pattern).
    pub fn with_gravity(mut self, gravity: glam::Vec2) -> Self {
        self.gravity = to_rapier(gravity);
        self
    }

    pub fn gravity(&self) -> glam::Vec2 {
        from_rapier(self.gravity)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// The node that owns `handle`, if the body is still alive.
    pub fn node_of(&self, handle: RigidBodyHandle) -> Option<NodeId> {
        self.body_to_node.get(&handle).copied()
    }

    /// Position and angle of a body.
    pub fn body_pose(&self, handle: RigidBodyHandle) -> Option<(glam::Vec2, f32)> {
        let body = self.bodies.get(handle)?;
        let pos = body.translation();
        Some((glam::Vec2::new(pos.x, pos.y), body.rotation().angle()))
    }

    /// Overwrite the linear velocity of a dynamic body.
    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: glam::Vec2) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(to_rapier(velocity), true);
        }
    }

    fn insert(
        &mut self,
        node: NodeId,
        desc: &PhysicsBody,
        transform: &Transform2d,
    ) -> (RigidBodyHandle, ColliderHandle) {
        let user_data = u128::from(node.raw());
        let builder = match desc.kind {
            BodyKind::Trigger => RigidBodyBuilder::new(RigidBodyType::KinematicPositionBased)
                .can_sleep(false)
                .gravity_scale(0.0),
            BodyKind::RigidBody => RigidBodyBuilder::new(RigidBodyType::Dynamic),
            BodyKind::Collider => match desc.body_type {
                BodyType::Static => RigidBodyBuilder::new(RigidBodyType::Fixed),
                BodyType::Dynamic => RigidBodyBuilder::new(RigidBodyType::Dynamic),
            },
        };
        let body = builder
            .translation(to_rapier(transform.position))
            .rotation(transform.rotation)
            .user_data(user_data)
            .build();
        let body_handle = self.bodies.insert(body);

        let collider = shape_to_collider_builder(&desc.shape)
            .density(desc.density)
            .friction(desc.friction)
            .sensor(desc.kind == BodyKind::Trigger)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .active_collision_types(ActiveCollisionTypes::all())
            .user_data(user_data)
            .build();
        let collider_handle = self
            .colliders
            .insert_with_parent(collider, body_handle, &mut self.bodies);

        self.body_to_node.insert(body_handle, node);
        log::debug!("created {:?} body for node {node}", desc.kind);
        (body_handle, collider_handle)
    }

    fn remove(&mut self, handle: RigidBodyHandle) {
        self.body_to_node.remove(&handle);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn set_kinematic_pose(&mut self, handle: RigidBodyHandle, position: glam::Vec2, angle: f32) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_next_kinematic_position(Pose::new(to_rapier(position), angle));
        }
    }

    /// Advance the simulation by `dt` seconds and return the contacts that
    /// started during the step, mapped to node ids.
    pub fn step(&mut self, dt: f32) -> Vec<RawContact> {
        self.params.dt = dt;
        self.pipeline.step(
            self.gravity,
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &self.events,
        );

        self.collision_events
            .try_iter()
            .filter(|event| event.started())
            .map(|event| RawContact {
                a: self.collider_node(event.collider1()),
                b: self.collider_node(event.collider2()),
            })
            .collect()
    }

    fn collider_node(&self, handle: ColliderHandle) -> Option<NodeId> {
        self.colliders
            .get(handle)
            .and_then(|collider| NodeId::from_user_data(collider.user_data))
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove the bodies of `node` and all its descendants from `world`.
pub fn release_physics(node: &mut dyn Node, world: &mut PhysicsWorld) {
    if let Some(body) = node.core_mut().body.as_mut() {
        body.release(world);
    }
    for child in node.core_mut().children.iter_mut() {
        release_physics(child.as_mut(), world);
    }
}

// ── Ready-made nodes ────────────────────────────────────────────────────

/// A static solid shape, e.g. a wall.
pub struct Collider {
    pub core: NodeCore,
}
crate::node_base!(Collider);

impl Collider {
    pub fn new(transform: Transform2d) -> Self {
        Self::with_body(transform, PhysicsBody::collider())
    }

    pub fn with_body(transform: Transform2d, body: PhysicsBody) -> Self {
        Self {
            core: NodeCore::new().with_transform(transform).with_body(body),
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::new(Transform2d::IDENTITY)
    }
}

impl Node for Collider {}

/// A sensor area moved by its node transform.
pub struct Trigger {
    pub core: NodeCore,
}
crate::node_base!(Trigger);

impl Trigger {
    pub fn new(transform: Transform2d) -> Self {
        Self {
            core: NodeCore::new()
                .with_transform(transform)
                .with_body(PhysicsBody::trigger()),
        }
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new(Transform2d::IDENTITY)
    }
}

impl Node for Trigger {}

/// A dynamic body moved by the simulation.
pub struct RigidBody {
    pub core: NodeCore,
}
crate::node_base!(RigidBody);

impl RigidBody {
    pub fn new(transform: Transform2d) -> Self {
        Self {
            core: NodeCore::new()
                .with_transform(transform)
                .with_body(PhysicsBody::rigid_body()),
        }
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new(Transform2d::IDENTITY)
    }
}

impl Node for RigidBody {}
