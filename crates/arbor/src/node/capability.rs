//! # Capability declarations
//!
//! A node type declares what it owns with two descriptor kinds, usually as
//! associated constants:
//!
//! - [`Capability<T>`]: exactly one child of type `T`, built together with the
//!   owner and reachable through [`NodeCore::slot`](super::NodeCore::slot).
//! - [`Collection<T>`]: a named, append-only list of `T` children that starts
//!   empty and only grows through deferred registration.
//!
//! ```ignore
//! struct Ship { core: NodeCore }
//!
//! impl Ship {
//!     const BLASTER: Capability<Blaster> = Capability::new("blaster");
//!     const WINGMEN: Collection<Drone> = Collection::new("wingmen");
//!
//!     fn new() -> Self {
//!         let core = NodeCore::new()
//!             .with_capability(Self::BLASTER, Blaster::new())
//!             .with_collection(Self::WINGMEN);
//!         Self { core }
//!     }
//!
//!     fn blaster(&self) -> &Blaster {
//!         self.core.slot(Self::BLASTER)
//!     }
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;

use super::NodeId;

/// Declares that a node owns exactly one child of type `T` under `name`.
pub struct Capability<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Capability<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Capability<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Capability<T> {}

impl<T> fmt::Debug for Capability<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capability")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// Declares that a node owns a growable collection of `T` children under `name`.
pub struct Collection<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Collection<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Address this collection on a concrete owner.
    pub fn on(self, owner: NodeId) -> CollectionTarget<T> {
        CollectionTarget {
            owner,
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Collection<T> {}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

/// A collection on a specific owner node: the destination of a deferred
/// registration. Typed so only `T` nodes can be queued into it.
pub struct CollectionTarget<T> {
    owner: NodeId,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CollectionTarget<T> {
    pub fn owner(&self) -> NodeId {
        self.owner
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for CollectionTarget<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CollectionTarget<T> {}

impl<T> fmt::Debug for CollectionTarget<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.owner, self.name)
    }
}

/// Shape of a declared capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityKind {
    Singular,
    Collection,
}

/// Runtime record of one capability declaration, kept on the owner's
/// [`NodeCore`](super::NodeCore) for inspection and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilityDecl {
    pub name: &'static str,
    pub kind: CapabilityKind,
    pub type_name: &'static str,
}
