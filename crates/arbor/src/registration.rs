//! # Deferred Registration
//!
//! Nodes cannot be appended to the tree while a pass is walking it. Instead,
//! a hook queues `(node, target collection)` pairs in [`Registrations`], and
//! the [`Hierarchy`](crate::hierarchy::Hierarchy) drains the queue at one
//! well-defined point: the start of the next awake pass, in submission order.
//!
//! Each entry owns its node, so a node can never be pending twice.

use std::collections::VecDeque;

use crate::node::{CollectionTarget, Node, NodeId};

/// One queued spawn.
pub(crate) struct PendingRegistration {
    pub(crate) owner: NodeId,
    pub(crate) collection: &'static str,
    pub(crate) node: Box<dyn Node>,
}

impl std::fmt::Debug for PendingRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRegistration")
            .field("owner", &self.owner)
            .field("collection", &self.collection)
            .field("node", &self.node.core().id())
            .finish()
    }
}

/// FIFO queue of pending registrations.
#[derive(Debug, Default)]
pub struct Registrations {
    queue: VecDeque<PendingRegistration>,
}

impl Registrations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `node` for `target`. The node type must match the collection's
    /// element type, which the typed target enforces.
    pub fn push<T: Node>(&mut self, node: T, target: CollectionTarget<T>) {
        self.queue.push_back(PendingRegistration {
            owner: target.owner(),
            collection: target.name(),
            node: Box::new(node),
        });
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Take every pending entry, oldest first.
    pub(crate) fn take_all(&mut self) -> Vec<PendingRegistration> {
        self.queue.drain(..).collect()
    }

    /// Discard everything pending (the tree they targeted is gone).
    pub(crate) fn clear(&mut self) {
        self.queue.clear();
    }
}
