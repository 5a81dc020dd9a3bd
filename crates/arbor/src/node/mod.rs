//! # Scene Nodes
//!
//! A scene is a tree of boxed [`Node`] trait objects. Every node embeds a
//! [`NodeCore`] holding its identity, transform, owned children, capability
//! bookkeeping, and optional physics body. Ownership is strictly tree-shaped:
//! a node owns its children through `Box<dyn Node>`, and the parent link is a
//! plain [`NodeId`] used for navigation only.
//!
//! ## Module Overview
//!
//! - [`capability`]: singular and collection capability descriptors
//! - `traverse`: the lifecycle passes and tree lookup
//!
//! ## Defining a node
//!
//! ```ignore
//! struct Spinner {
//!     core: NodeCore,
//!     speed: f32,
//! }
//! arbor::node_base!(Spinner);
//!
//! impl Node for Spinner {
//!     fn on_update(&mut self, ctx: &mut NodeContext<'_>) {
//!         self.core.transform.rotation += self.speed * ctx.delta_secs();
//!     }
//! }
//! ```

pub mod capability;
pub(crate) mod traverse;

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::context::NodeContext;
use crate::error::PersistError;
use crate::math::Transform2d;
use crate::physics::{ContactPeer, PhysicsBody};
use crate::render::DrawList;
use crate::scene::{PropertyMap, PropertyReader};

pub use capability::{
    Capability, CapabilityDecl, CapabilityKind, Collection, CollectionTarget,
};

// ── NodeId ──────────────────────────────────────────────────────────────

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique node identity. Zero is never allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }

    /// Rebuild an id carried through a physics body's user data.
    pub(crate) fn from_user_data(data: u128) -> Option<Self> {
        match u64::try_from(data) {
            Ok(0) | Err(_) => None,
            Ok(raw) => Some(Self(raw)),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ── Traits ──────────────────────────────────────────────────────────────

/// Plumbing every node type provides. Implement it with [`node_base!`](crate::node_base).
pub trait NodeBase: Any {
    fn core(&self) -> &NodeCore;
    fn core_mut(&mut self) -> &mut NodeCore;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Fully-qualified Rust type name, used for persistence tags.
    fn type_name(&self) -> &'static str;
}

/// A scene-tree element with overridable lifecycle hooks.
///
/// All hooks default to no-ops. The kernel drives them pre-order (node before
/// children) and never calls `on_update`, `on_pre_physics_update`,
/// `on_physics_update`, or `on_draw` on a node that has not been awoken.
pub trait Node: NodeBase {
    /// Runs exactly once, the first time an awake pass reaches this node.
    fn on_awake(&mut self, _ctx: &mut NodeContext<'_>) {}

    fn on_update(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// Runs before the physics step. Trigger bodies are pushed to the node's
    /// transform right after this hook returns.
    fn on_pre_physics_update(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// Runs after the physics step. Rigid bodies have already been pulled back
    /// into the node's transform.
    fn on_physics_update(&mut self, _ctx: &mut NodeContext<'_>) {}

    /// Emit draw commands. The context is the same one the other passes get,
    /// so a draw hook may also queue registrations.
    fn on_draw(&mut self, _ctx: &mut NodeContext<'_>, _draw: &mut DrawList) {}

    /// A collider-kind body of this node began touching another collider.
    fn begin_collision(&mut self, _ctx: &mut NodeContext<'_>, _other: &ContactPeer) {}

    /// A trigger body of this node began overlapping another trigger.
    fn begin_trigger(&mut self, _ctx: &mut NodeContext<'_>, _other: &ContactPeer) {}

    /// Write the properties this type opts into persisting.
    fn save_properties(&self, _props: &mut PropertyMap) {}

    /// Restore persisted properties. Anything not read keeps its constructor default.
    fn load_properties(&mut self, _props: &PropertyReader<'_>) -> Result<(), PersistError> {
        Ok(())
    }
}

/// Implement [`NodeBase`] for a struct that stores its [`NodeCore`] in a field
/// (named `core` unless given).
#[macro_export]
macro_rules! node_base {
    ($ty:ty) => {
        $crate::node_base!($ty, core);
    };
    ($ty:ty, $field:ident) => {
        impl $crate::node::NodeBase for $ty {
            fn core(&self) -> &$crate::node::NodeCore {
                &self.$field
            }
            fn core_mut(&mut self) -> &mut $crate::node::NodeCore {
                &mut self.$field
            }
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
            fn type_name(&self) -> &'static str {
                ::std::any::type_name::<$ty>()
            }
        }
    };
}

// ── NodeCore ────────────────────────────────────────────────────────────

struct CollectionEntry {
    name: &'static str,
    type_name: &'static str,
    members: Vec<NodeId>,
}

/// Why a collection turned a node away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttachRefusal {
    NoSuchCollection,
    WrongType { expected: &'static str },
}

/// State shared by every node: identity, transform, children, capabilities.
///
/// Children can only be added while the core is being built (the `with_*`
/// methods) or through deferred registration, so no lifecycle pass ever sees
/// its child list change underneath it.
pub struct NodeCore {
    id: NodeId,
    parent: Option<NodeId>,
    pub transform: Transform2d,
    pub(crate) children: Vec<Box<dyn Node>>,
    declarations: Vec<CapabilityDecl>,
    slots: Vec<(&'static str, NodeId)>,
    collections: Vec<CollectionEntry>,
    pub(crate) body: Option<PhysicsBody>,
    pub(crate) awake: bool,
}

impl NodeCore {
    pub fn new() -> Self {
        Self {
            id: NodeId::next(),
            parent: None,
            transform: Transform2d::IDENTITY,
            children: Vec::new(),
            declarations: Vec::new(),
            slots: Vec::new(),
            collections: Vec::new(),
            body: None,
            awake: false,
        }
    }

    // ── Construction ────────────────────────────────────────────────

    pub fn with_transform(mut self, transform: Transform2d) -> Self {
        self.transform = transform;
        self
    }

    /// Attach a physics body, created when the node is awoken.
    pub fn with_body(mut self, body: PhysicsBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Own `child` as the singular capability `cap`.
    ///
    /// # Panics
    ///
    /// Panics if a capability with the same name is already declared; that is
    /// a malformed node type and there is no recovery.
    pub fn with_capability<T: Node>(mut self, cap: Capability<T>, child: T) -> Self {
        self.declare(cap.name(), CapabilityKind::Singular, std::any::type_name::<T>());
        let id = self.attach_child(Box::new(child));
        self.slots.push((cap.name(), id));
        self
    }

    /// Declare the growable collection `col`, initially empty.
    ///
    /// # Panics
    ///
    /// Panics if a capability with the same name is already declared.
    pub fn with_collection<T: Node>(mut self, col: Collection<T>) -> Self {
        let type_name = std::any::type_name::<T>();
        self.declare(col.name(), CapabilityKind::Collection, type_name);
        self.collections.push(CollectionEntry {
            name: col.name(),
            type_name,
            members: Vec::new(),
        });
        self
    }

    /// Own a plain child, authored as part of the scene.
    pub fn with_child(mut self, child: impl Node) -> Self {
        self.attach_child(Box::new(child));
        self
    }

    fn declare(&mut self, name: &'static str, kind: CapabilityKind, type_name: &'static str) {
        if self.declarations.iter().any(|d| d.name == name) {
            panic!("capability `{name}` declared twice on node {}", self.id);
        }
        self.declarations.push(CapabilityDecl {
            name,
            kind,
            type_name,
        });
    }

    // ── Identity ────────────────────────────────────────────────────

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The owning node, if any. Navigation only; look it up through the
    /// [`Hierarchy`](crate::hierarchy::Hierarchy).
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Whether the awake pass has run `on_awake` for this node.
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    pub fn body(&self) -> Option<&PhysicsBody> {
        self.body.as_ref()
    }

    pub fn body_mut(&mut self) -> Option<&mut PhysicsBody> {
        self.body.as_mut()
    }

    pub fn capabilities(&self) -> &[CapabilityDecl] {
        &self.declarations
    }

    // ── Children ────────────────────────────────────────────────────

    pub fn children(&self) -> impl Iterator<Item = &dyn Node> {
        self.children.iter().map(|c| c.as_ref() as &dyn Node)
    }

    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut dyn Node> {
        self.children.iter_mut().map(|c| c.as_mut() as &mut dyn Node)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child(&self, id: NodeId) -> Option<&dyn Node> {
        self.children
            .iter()
            .find(|c| c.core().id == id)
            .map(|c| c.as_ref() as &dyn Node)
    }

    pub fn child_mut(&mut self, id: NodeId) -> Option<&mut dyn Node> {
        self.children
            .iter_mut()
            .find(|c| c.core().id == id)
            .map(|c| c.as_mut() as &mut dyn Node)
    }

    /// Remove a child this node owns and hand it back.
    ///
    /// Removal policy belongs to the owner; the kernel never calls this. A
    /// capability slot child cannot be detached, since the slot must stay bound.
    /// The child's physics body (if any) stays in the world until released
    /// with [`release_physics`](crate::physics::release_physics).
    pub fn detach_child(&mut self, id: NodeId) -> Option<Box<dyn Node>> {
        if self.slots.iter().any(|(_, slot_id)| *slot_id == id) {
            log::warn!("node {}: refusing to detach capability child {}", self.id, id);
            return None;
        }
        let index = self.children.iter().position(|c| c.core().id == id)?;
        for entry in &mut self.collections {
            entry.members.retain(|m| *m != id);
        }
        let mut child = self.children.remove(index);
        child.core_mut().parent = None;
        Some(child)
    }

    pub(crate) fn attach_child(&mut self, mut child: Box<dyn Node>) -> NodeId {
        let id = child.core().id;
        child.core_mut().parent = Some(self.id);
        self.children.push(child);
        id
    }

    /// Append `child` to the named collection. Gives the node back if this
    /// core declares no such collection or the collection holds another type.
    pub(crate) fn attach_to_collection(
        &mut self,
        name: &str,
        child: Box<dyn Node>,
    ) -> Result<NodeId, (Box<dyn Node>, AttachRefusal)> {
        let Some(index) = self.collections.iter().position(|c| c.name == name) else {
            return Err((child, AttachRefusal::NoSuchCollection));
        };
        let expected = self.collections[index].type_name;
        if child.type_name() != expected {
            return Err((child, AttachRefusal::WrongType { expected }));
        }
        let id = self.attach_child(child);
        self.collections[index].members.push(id);
        Ok(id)
    }

    // ── Capabilities ────────────────────────────────────────────────

    /// The child bound to capability `cap`.
    ///
    /// # Panics
    ///
    /// Panics if `cap` was never bound on this core.
    pub fn slot<T: Node>(&self, cap: Capability<T>) -> &T {
        self.get_slot(cap).unwrap_or_else(|| {
            panic!(
                "capability `{}` ({}) is not bound on node {}",
                cap.name(),
                std::any::type_name::<T>(),
                self.id
            )
        })
    }

    /// The child bound to capability `cap`.
    ///
    /// # Panics
    ///
    /// Panics if `cap` was never bound on this core.
    pub fn slot_mut<T: Node>(&mut self, cap: Capability<T>) -> &mut T {
        let id = self.id;
        self.get_slot_mut(cap).unwrap_or_else(|| {
            panic!(
                "capability `{}` ({}) is not bound on node {}",
                cap.name(),
                std::any::type_name::<T>(),
                id
            )
        })
    }

    /// Try to get the child bound to `cap`. Returns `None` if not bound.
    pub fn get_slot<T: Node>(&self, cap: Capability<T>) -> Option<&T> {
        let id = self.slot_id(cap.name())?;
        self.child(id)?.as_any().downcast_ref::<T>()
    }

    /// Try to get the child bound to `cap` mutably. Returns `None` if not bound.
    pub fn get_slot_mut<T: Node>(&mut self, cap: Capability<T>) -> Option<&mut T> {
        let id = self.slot_id(cap.name())?;
        self.child_mut(id)?.as_any_mut().downcast_mut::<T>()
    }

    pub(crate) fn slot_id(&self, name: &str) -> Option<NodeId> {
        self.slots
            .iter()
            .find(|(slot_name, _)| *slot_name == name)
            .map(|(_, id)| *id)
    }

    pub(crate) fn slot_name_of(&self, child: NodeId) -> Option<&'static str> {
        self.slots
            .iter()
            .find(|(_, id)| *id == child)
            .map(|(name, _)| *name)
    }

    pub(crate) fn collection_name_of(&self, child: NodeId) -> Option<&'static str> {
        self.collections
            .iter()
            .find(|c| c.members.contains(&child))
            .map(|c| c.name)
    }

    /// The registration target for collection `col` on this node.
    pub fn target<T: Node>(&self, col: Collection<T>) -> CollectionTarget<T> {
        col.on(self.id)
    }

    /// Members of collection `col`, in registration order.
    pub fn collection<T: Node>(&self, col: Collection<T>) -> impl Iterator<Item = &T> {
        self.collection_ids(col.name())
            .iter()
            .filter_map(|id| self.child(*id))
            .filter_map(|node| node.as_any().downcast_ref::<T>())
    }

    pub fn collection_len<T: Node>(&self, col: Collection<T>) -> usize {
        self.collection_ids(col.name()).len()
    }

    pub(crate) fn collection_ids(&self, name: &str) -> &[NodeId] {
        self.collections
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.members.as_slice())
            .unwrap_or(&[])
    }

    // ── Scene loading support ───────────────────────────────────────

    /// Drop every child that is not bound to a capability slot, and empty all
    /// collections. Used before a loaded document repopulates this node.
    pub(crate) fn clear_unbound_children(&mut self) {
        let slots = &self.slots;
        self.children
            .retain(|c| slots.iter().any(|(_, id)| *id == c.core().id));
        for entry in &mut self.collections {
            entry.members.clear();
        }
    }

    /// Reorder children to follow `order`; children not listed keep their
    /// relative order at the end.
    pub(crate) fn reorder_children(&mut self, order: &[NodeId]) {
        self.children.sort_by_key(|c| {
            order
                .iter()
                .position(|id| *id == c.core().id)
                .unwrap_or(usize::MAX)
        });
    }
}

impl Default for NodeCore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NodeCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCore")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("transform", &self.transform)
            .field("children", &self.children.len())
            .field("capabilities", &self.declarations)
            .field("awake", &self.awake)
            .finish()
    }
}

/// A bare grouping node with no behaviour of its own.
#[derive(Debug, Default)]
pub struct Group {
    pub core: NodeCore,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core(core: NodeCore) -> Self {
        Self { core }
    }
}

crate::node_base!(Group);

impl Node for Group {}
