//! Contact collection and dispatch.
//!
//! Rapier reports contact starts into the world's event channel during a
//! step; [`PhysicsWorld::step`](super::PhysicsWorld::step) drains it into
//! [`RawContact`]s. After the step the [`ContactDispatcher`] resolves each
//! pair back to nodes and calls `begin_collision` or `begin_trigger` on both
//! sides.

use std::any::TypeId;

use crate::context::NodeContext;
use crate::node::{Node, NodeId, traverse};
use crate::physics::BodyKind;

/// A started contact between two colliders, as node ids. A side is `None`
/// when its collider carries no node id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawContact {
    pub a: Option<NodeId>,
    pub b: Option<NodeId>,
}

impl RawContact {
    pub fn new(a: NodeId, b: NodeId) -> Self {
        Self {
            a: Some(a),
            b: Some(b),
        }
    }
}

/// What a node learns about the other side of a contact.
#[derive(Debug, Clone)]
pub struct ContactPeer {
    pub id: NodeId,
    pub kind: BodyKind,
    pub position: glam::Vec2,
    pub type_name: &'static str,
    type_id: TypeId,
}

impl ContactPeer {
    fn of(node: &dyn Node) -> Option<Self> {
        let core = node.core();
        let body = core.body()?;
        Some(Self {
            id: core.id(),
            kind: body.kind(),
            position: core.transform.position,
            type_name: node.type_name(),
            type_id: node.as_any().type_id(),
        })
    }

    /// Whether the other node is a `T`.
    pub fn is<T: Node>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

/// Which callback a pair of body kinds receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactRoute {
    Collision,
    Trigger,
    Ignored,
}

impl ContactRoute {
    pub fn between(a: BodyKind, b: BodyKind) -> Self {
        match (a, b) {
            (BodyKind::Trigger, BodyKind::Trigger) => ContactRoute::Trigger,
            _ if a.is_solid() && b.is_solid() => ContactRoute::Collision,
            _ => ContactRoute::Ignored,
        }
    }
}

/// Counts from one dispatch, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub collisions: usize,
    pub triggers: usize,
    pub ignored: usize,
}

// ── Dispatcher ──────────────────────────────────────────────────────────

/// Routes contacts to the nodes of a tree.
pub struct ContactDispatcher;

impl ContactDispatcher {
    /// Deliver each contact to both nodes, in report order. Pairs whose nodes
    /// are no longer in `root`'s tree, or whose kinds do not match, are dropped.
    pub fn dispatch(
        root: &mut dyn Node,
        contacts: &[RawContact],
        ctx: &mut NodeContext<'_>,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        for contact in contacts {
            let peers = match (contact.a, contact.b) {
                (Some(a), Some(b)) => (
                    traverse::find(root, a).and_then(ContactPeer::of),
                    traverse::find(root, b).and_then(ContactPeer::of),
                ),
                _ => (None, None),
            };
            let (Some(a), Some(b)) = peers else {
                log::trace!("contact {contact:?} has no node on one side; ignored");
                summary.ignored += 1;
                continue;
            };

            match ContactRoute::between(a.kind, b.kind) {
                ContactRoute::Collision => {
                    if let Some(node) = traverse::find_mut(root, a.id) {
                        node.begin_collision(ctx, &b);
                    }
                    if let Some(node) = traverse::find_mut(root, b.id) {
                        node.begin_collision(ctx, &a);
                    }
                    summary.collisions += 1;
                }
                ContactRoute::Trigger => {
                    if let Some(node) = traverse::find_mut(root, a.id) {
                        node.begin_trigger(ctx, &b);
                    }
                    if let Some(node) = traverse::find_mut(root, b.id) {
                        node.begin_trigger(ctx, &a);
                    }
                    summary.triggers += 1;
                }
                ContactRoute::Ignored => {
                    log::trace!("{:?}/{:?} contact between {} and {} ignored", a.kind, b.kind, a.id, b.id);
                    summary.ignored += 1;
                }
            }
        }
        summary
    }
}
