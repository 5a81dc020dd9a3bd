//! Convenience re-exports: `use arbor::prelude::*` for the common items.

pub use crate::config::KernelConfig;
pub use crate::context::NodeContext;
pub use crate::engine::Engine;
pub use crate::error::{KernelError, PersistError};
pub use crate::hierarchy::Hierarchy;
pub use crate::input::{Input, KeyCode};
pub use crate::math::{Mat4, Quat, Transform2d, Vec2, Vec3, Vec4};
pub use crate::node::{
    Capability, Collection, CollectionTarget, Group, Node, NodeBase, NodeCore, NodeId,
};
pub use crate::node_base;
pub use crate::physics::{
    BodyKind, BodyType, Collider, ColliderShape, ContactPeer, PhysicsBody, PhysicsWorld,
    RigidBody, Trigger, release_physics,
};
pub use crate::render::{DrawCommand, DrawList};
pub use crate::scene::{
    NodeRegistry, PropertyMap, PropertyReader, load_node, load_node_from_file, save_node,
    save_node_to_file,
};
pub use crate::time::Time;
