//! Lifecycle passes and tree lookup.
//!
//! Every pass is a pre-order walk: a node's hook runs before any of its
//! children are visited. Each walk holds a mutable borrow of the child list it
//! is iterating, so a pass always sees a stable snapshot of the tree; new
//! nodes only arrive through the registration queue between passes.

use crate::context::NodeContext;
use crate::error::KernelError;
use crate::node::{Node, NodeId};
use crate::physics::BodyKind;
use crate::render::DrawList;

/// Skip nodes that have not been awoken. Reaching one is a tree-construction
/// bug (a pass ran before `awake`), so it is logged and the subtree is left alone.
fn ready(node: &dyn Node, pass: &str) -> bool {
    let core = node.core();
    if core.awake {
        return true;
    }
    log::warn!(
        "{pass} pass reached node {} ({}) before awake; skipping its subtree",
        core.id(),
        node.type_name()
    );
    false
}

/// Run `on_awake` on every node not yet awake, then create its physics body.
///
/// A node whose body cannot be created fails before its hook runs, so a
/// later awake pass still wakes it exactly once.
pub(crate) fn awake(node: &mut dyn Node, ctx: &mut NodeContext<'_>) -> Result<(), KernelError> {
    if !node.core().awake {
        let needs_world = node.core().body.as_ref().is_some_and(|body| !body.is_attached());
        if needs_world && ctx.physics().is_none() {
            return Err(KernelError::PhysicsUninitialized { node: node.core().id() });
        }
        node.on_awake(ctx);

        let core = node.core_mut();
        let id = core.id();
        let transform = core.transform;
        if let Some(body) = core.body.as_mut() {
            if !body.is_attached() {
                let physics = ctx
                    .physics_mut()
                    .ok_or(KernelError::PhysicsUninitialized { node: id })?;
                body.attach(physics, id, &transform);
            }
        }
        core.awake = true;
    }

    for child in node.core_mut().children.iter_mut() {
        awake(child.as_mut(), ctx)?;
    }
    Ok(())
}

pub(crate) fn update(node: &mut dyn Node, ctx: &mut NodeContext<'_>) {
    if !ready(node, "update") {
        return;
    }
    node.on_update(ctx);
    for child in node.core_mut().children.iter_mut() {
        update(child.as_mut(), ctx);
    }
}

/// Run `on_pre_physics_update`, then push trigger transforms into their bodies.
pub(crate) fn pre_physics(node: &mut dyn Node, ctx: &mut NodeContext<'_>) {
    if !ready(node, "pre-physics") {
        return;
    }
    node.on_pre_physics_update(ctx);

    let core = node.core_mut();
    if let Some(body) = core.body.as_ref() {
        if body.kind() == BodyKind::Trigger {
            if let Some(physics) = ctx.physics_mut() {
                body.push_pose(physics, &core.transform);
            }
        }
    }

    for child in node.core_mut().children.iter_mut() {
        pre_physics(child.as_mut(), ctx);
    }
}

/// Pull rigid-body poses back into their nodes, then run `on_physics_update`.
pub(crate) fn physics(node: &mut dyn Node, ctx: &mut NodeContext<'_>) {
    if !ready(node, "physics") {
        return;
    }

    let core = node.core_mut();
    if let (Some(body), Some(world)) = (core.body.as_ref(), ctx.physics()) {
        if body.kind() == BodyKind::RigidBody {
            if let Some((position, rotation)) = body.pose(world) {
                core.transform.position = position;
                core.transform.rotation = rotation;
            }
        }
    }

    node.on_physics_update(ctx);
    for child in node.core_mut().children.iter_mut() {
        physics(child.as_mut(), ctx);
    }
}

pub(crate) fn draw(node: &mut dyn Node, ctx: &mut NodeContext<'_>, list: &mut DrawList) {
    if !ready(node, "draw") {
        return;
    }
    node.on_draw(ctx, list);
    for child in node.core_mut().children.iter_mut() {
        draw(child.as_mut(), ctx, list);
    }
}

// ── Lookup ──────────────────────────────────────────────────────────────

pub(crate) fn find(node: &dyn Node, id: NodeId) -> Option<&dyn Node> {
    if node.core().id() == id {
        return Some(node);
    }
    node.core()
        .children
        .iter()
        .find_map(|child| find(child.as_ref(), id))
}

pub(crate) fn find_mut(node: &mut dyn Node, id: NodeId) -> Option<&mut dyn Node> {
    if node.core().id() == id {
        return Some(node);
    }
    for child in node.core_mut().children.iter_mut() {
        if let Some(found) = find_mut(child.as_mut(), id) {
            return Some(found);
        }
    }
    None
}

/// Number of nodes in the subtree, including `node`.
pub(crate) fn count(node: &dyn Node) -> usize {
    1 + node
        .core()
        .children
        .iter()
        .map(|child| count(child.as_ref()))
        .sum::<usize>()
}

/// Visit every node of the subtree pre-order.
pub(crate) fn visit(node: &dyn Node, f: &mut impl FnMut(&dyn Node)) {
    f(node);
    for child in &node.core().children {
        visit(child.as_ref(), f);
    }
}
