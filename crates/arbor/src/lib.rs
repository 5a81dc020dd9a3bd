//! # Arbor: Scene-Graph Lifecycle Kernel
//!
//! A tree of scene nodes driven by a fixed set of lifecycle passes (awake,
//! update, pre-physics, physics, draw), kept in sync with a rapier2d physics
//! world and saved to a tagged text format.
//!
//! Start with `use arbor::prelude::*`, define node types with
//! [`node_base!`], and drive them with an [`Engine`](engine::Engine).

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod input;
pub mod math;
pub mod node;
pub mod physics;
pub mod prelude;
pub mod registration;
pub mod render;
pub mod scene;
pub mod time;
