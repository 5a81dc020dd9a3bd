//! Context: the view of the kernel handed to every node hook.
//!
//! [`NodeContext`] bundles frame timing, input state, the deferred
//! registration queue, and the physics world into one struct. Hooks receive
//! `&mut NodeContext`, giving them everything they may touch during a pass
//! without any global state.

use crate::input::{Input, KeyCode};
use crate::node::{CollectionTarget, Node};
use crate::physics::PhysicsWorld;
use crate::registration::Registrations;
use crate::time::Time;

/// Passed to every lifecycle hook.
///
/// # Example
///
/// ```ignore
/// fn on_update(&mut self, ctx: &mut NodeContext<'_>) {
///     if ctx.input.pressed(KeyCode::Space) {
///         let target = self.core.target(Self::BULLETS);
///         ctx.register(Bullet::new(), target);
///     }
/// }
/// ```
pub struct NodeContext<'a> {
    /// Frame timing for the current frame.
    pub time: &'a Time,
    /// Keyboard state for the current frame.
    pub input: &'a Input<KeyCode>,
    registrations: &'a mut Registrations,
    physics: Option<&'a mut PhysicsWorld>,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(
        time: &'a Time,
        input: &'a Input<KeyCode>,
        registrations: &'a mut Registrations,
        physics: Option<&'a mut PhysicsWorld>,
    ) -> Self {
        Self {
            time,
            input,
            registrations,
            physics,
        }
    }

    /// Delta time of the current frame, in seconds.
    pub fn delta_secs(&self) -> f32 {
        self.time.delta_secs()
    }

    /// Queue `node` for the collection `target`. It joins the tree at the start
    /// of the next awake pass, never during the pass that is running now.
    pub fn register<T: Node>(&mut self, node: T, target: CollectionTarget<T>) {
        self.registrations.push(node, target);
    }

    /// Number of registrations waiting for the next awake pass.
    pub fn pending_registrations(&self) -> usize {
        self.registrations.len()
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.physics.as_deref()
    }

    pub fn physics_mut(&mut self) -> Option<&mut PhysicsWorld> {
        self.physics.as_deref_mut()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Run `f` with a context backed by fresh kernel state and no physics.
    pub(crate) fn with_context<R>(f: impl FnOnce(&mut NodeContext<'_>) -> R) -> R {
        let time = Time::new();
        let input = Input::new();
        let mut registrations = Registrations::new();
        let mut ctx = NodeContext::new(&time, &input, &mut registrations, None);
        f(&mut ctx)
    }

    #[test]
    fn context_without_physics() {
        with_context(|ctx| {
            assert!(ctx.physics().is_none());
            assert!(ctx.physics_mut().is_none());
            assert_eq!(ctx.pending_registrations(), 0);
            assert_eq!(ctx.delta_secs(), 0.0);
        });
    }
}
