//! Error types for the kernel and the scene codec.

use crate::node::NodeId;

/// Errors surfaced by the lifecycle kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// A physics node reached awake but no physics world is configured.
    /// Nothing downstream can be correct without one, so callers should abort.
    #[error("physics world is not initialized (node {node} needs a body)")]
    PhysicsUninitialized { node: NodeId },
    #[error("scene error: {0}")]
    Persist(#[from] PersistError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
}

/// A scene document could not be read back into a node tree.
///
/// Every variant means "corrupt or unknown document": the loader never hands
/// back a partially populated tree.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("document has no type header line")]
    MissingHeader,
    #[error("unknown node type `{0}`")]
    UnknownType(String),
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("property references node {0}, which is not in the document")]
    BrokenReference(u64),
    #[error("node tree is deeper than {0} levels")]
    TooDeep(usize),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
