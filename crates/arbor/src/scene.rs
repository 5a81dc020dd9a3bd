//! # Scene Persistence: Save and Load Node Trees
//!
//! A saved scene is a text document. The first line is the root node's type
//! tag (`arbor::physics.Collider` style: module path, then `.`, then the type
//! name); the rest is JSON holding the whole subtree.
//!
//! Every node record stores its concrete type tag, its transform, its physics
//! body description, and whatever properties the type writes in
//! [`Node::save_properties`]. Children bound to a capability slot are stored
//! with the slot name and applied onto the slot child the constructor already
//! created; collection members are stored with their collection name.
//!
//! Node references inside properties ([`PropertyMap::put_ref`]) are written as
//! `{"$ref": <id>}` and re-linked on load, so two properties pointing at the
//! same node still point at the same node afterwards.
//!
//! ## Quick Start
//!
//! ```ignore
//! use arbor::prelude::*;
//!
//! let mut registry = NodeRegistry::with_builtins();
//! registry.register::<Player>();
//!
//! let text = save_node(&player)?;
//! let copy = load_node(&text, &registry)?;
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PersistError;
use crate::math::Transform2d;
use crate::node::{AttachRefusal, Group, Node, NodeId, traverse};
use crate::physics::{Collider, PhysicsBody, RigidBody, Trigger};

/// Deepest node nesting the codec accepts, counting the root as depth 0.
///
/// Each level of the tree costs two levels of JSON nesting (the record and
/// its `children` array), and serde_json refuses documents nested deeper than
/// 128. This cap keeps every saved tree loadable with room left for nested
/// property values.
pub const MAX_DEPTH: usize = 56;

/// Document layout version written into every save.
pub const FORMAT_VERSION: u32 = 1;

const REF_KEY: &str = "$ref";

/// Type tag for a Rust type name: the last `::` becomes `.`.
pub fn type_tag(type_name: &str) -> String {
    let path = type_name.split('<').next().unwrap_or(type_name);
    match path.rsplit_once("::") {
        Some((module, name)) => format!("{module}.{name}{}", &type_name[path.len()..]),
        None => type_name.to_string(),
    }
}

// ── NodeRegistry ─────────────────────────────────────────────────────────

type NodeFactory = fn() -> Box<dyn Node>;

/// Maps type tags to constructors.
///
/// Register every node type that may appear in a loaded document. Loading
/// runs the type's `Default` constructor, so capability slots exist before
/// their saved state is applied.
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that already knows the kernel's own node types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register::<Group>();
        registry.register::<Collider>();
        registry.register::<Trigger>();
        registry.register::<RigidBody>();
        registry
    }

    /// Register `T` under its type tag. Registering twice is harmless.
    pub fn register<T: Node + Default>(&mut self) {
        let tag = type_tag(std::any::type_name::<T>());
        self.factories.insert(tag, || Box::new(T::default()));
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// All registered tags, sorted.
    pub fn type_tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    fn create(&self, tag: &str) -> Result<Box<dyn Node>, PersistError> {
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| PersistError::UnknownType(tag.to_string()))?;
        Ok(factory())
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("types", &self.type_tags())
            .finish()
    }
}

// ── Properties ───────────────────────────────────────────────────────────

/// Properties a node opts into persisting.
#[derive(Debug, Default)]
pub struct PropertyMap {
    values: Map<String, Value>,
    refs: Vec<NodeId>,
    error: Option<serde_json::Error>,
}

impl PropertyMap {
    /// Store `value` under `key`. A value that cannot be encoded fails the save.
    pub fn put<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(json) => {
                self.values.insert(key.to_string(), json);
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
    }

    /// Store a reference to another node of the same saved subtree.
    pub fn put_ref(&mut self, key: &str, target: Option<NodeId>) {
        let json = match target {
            Some(id) => {
                self.refs.push(id);
                let mut marker = Map::new();
                marker.insert(REF_KEY.to_string(), Value::from(id.raw()));
                Value::Object(marker)
            }
            None => Value::Null,
        };
        self.values.insert(key.to_string(), json);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read access to a node's saved properties during load.
pub struct PropertyReader<'a> {
    values: &'a Map<String, Value>,
    remap: &'a HashMap<u64, NodeId>,
}

impl<'a> PropertyReader<'a> {
    /// Decode the property `key`, or `None` if it was not saved.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistError> {
        match self.values.get(key) {
            Some(json) => Ok(Some(T::deserialize(json)?)),
            None => Ok(None),
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, PersistError> {
        Ok(self.get(key)?.unwrap_or(default))
    }

    /// Resolve a reference written with [`PropertyMap::put_ref`] to the id of
    /// the node it now points at.
    pub fn get_ref(&self, key: &str) -> Result<Option<NodeId>, PersistError> {
        let Some(json) = self.values.get(key) else {
            return Ok(None);
        };
        if json.is_null() {
            return Ok(None);
        }
        let saved = json
            .get(REF_KEY)
            .and_then(Value::as_u64)
            .ok_or_else(|| PersistError::Malformed(format!("property `{key}` is not a node reference")))?;
        self.remap
            .get(&saved)
            .copied()
            .map(Some)
            .ok_or(PersistError::BrokenReference(saved))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

// ── Document format ──────────────────────────────────────────────────────

/// The JSON body of a saved scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDocument {
    pub format: u32,
    pub root: NodeRecord,
}

/// One node of a saved scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// The node's id at save time. Only meaningful inside the document.
    pub id: u64,
    #[serde(rename = "type")]
    pub type_tag: String,
    pub transform: Transform2d,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<PhysicsBody>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeRecord>,
}

// ── Save ─────────────────────────────────────────────────────────────────

/// Build the document for `node` and its subtree.
pub fn save_document(node: &dyn Node) -> Result<SceneDocument, PersistError> {
    let mut refs = Vec::new();
    let root = record(node, None, 0, &mut refs)?;

    let mut saved = HashSet::new();
    traverse::visit(node, &mut |n| {
        saved.insert(n.core().id());
    });
    if let Some(missing) = refs.iter().find(|id| !saved.contains(id)) {
        return Err(PersistError::BrokenReference(missing.raw()));
    }

    Ok(SceneDocument {
        format: FORMAT_VERSION,
        root,
    })
}

fn record(
    node: &dyn Node,
    parent: Option<&dyn Node>,
    depth: usize,
    refs: &mut Vec<NodeId>,
) -> Result<NodeRecord, PersistError> {
    if depth > MAX_DEPTH {
        return Err(PersistError::TooDeep(MAX_DEPTH));
    }
    let core = node.core();

    let mut props = PropertyMap::default();
    node.save_properties(&mut props);
    if let Some(err) = props.error {
        return Err(err.into());
    }
    refs.extend(props.refs);

    let children = core
        .children()
        .map(|child| record(child, Some(node), depth + 1, refs))
        .collect::<Result<Vec<_>, _>>()?;

    let (slot, collection) = match parent {
        Some(parent) => (
            parent.core().slot_name_of(core.id()).map(str::to_string),
            parent.core().collection_name_of(core.id()).map(str::to_string),
        ),
        None => (None, None),
    };

    Ok(NodeRecord {
        id: core.id().raw(),
        type_tag: type_tag(node.type_name()),
        transform: core.transform,
        body: core.body().cloned(),
        props: props.values,
        slot,
        collection,
        children,
    })
}

/// Serialize `node` and its subtree to scene text.
///
/// Trees nested deeper than [`MAX_DEPTH`] fail with [`PersistError::TooDeep`].
pub fn save_node(node: &dyn Node) -> Result<String, PersistError> {
    let document = save_document(node)?;
    let json = serde_json::to_string_pretty(&document)?;
    Ok(format!("{}\n{json}", document.root.type_tag))
}

/// Serialize `node` and write it to `path`.
pub fn save_node_to_file(node: &dyn Node, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let text = save_node(node)?;
    std::fs::write(path, text)?;
    Ok(())
}

// ── Load ─────────────────────────────────────────────────────────────────

#[derive(Default)]
struct LoadState<'a> {
    remap: HashMap<u64, NodeId>,
    props: Vec<(NodeId, &'a Map<String, Value>)>,
}

/// Rebuild a node tree from scene text.
///
/// Fails without returning anything if the header is missing, a type tag is
/// not registered, the JSON does not match the document layout, or a
/// reference points outside the document.
pub fn load_node(text: &str, registry: &NodeRegistry) -> Result<Box<dyn Node>, PersistError> {
    let (header, body) = text.split_once('\n').ok_or(PersistError::MissingHeader)?;
    let header = header.trim();
    if header.is_empty() || header.starts_with('{') {
        return Err(PersistError::MissingHeader);
    }

    let document: SceneDocument = serde_json::from_str(body)?;
    if document.format != FORMAT_VERSION {
        return Err(PersistError::Malformed(format!(
            "unsupported format version {}",
            document.format
        )));
    }
    if document.root.type_tag != header {
        return Err(PersistError::Malformed(format!(
            "header `{header}` does not match root type `{}`",
            document.root.type_tag
        )));
    }
    load_document(&document, registry)
}

/// Rebuild a node tree from an already parsed document.
pub fn load_document(
    document: &SceneDocument,
    registry: &NodeRegistry,
) -> Result<Box<dyn Node>, PersistError> {
    let mut state = LoadState::default();
    let mut root = build(&document.root, registry, &mut state, 0)?;

    for &(id, values) in &state.props {
        let node = traverse::find_mut(root.as_mut(), id)
            .ok_or_else(|| PersistError::Malformed(format!("loaded node {id} vanished")))?;
        node.load_properties(&PropertyReader {
            values,
            remap: &state.remap,
        })?;
    }
    Ok(root)
}

/// Read scene text from `path` and rebuild it.
pub fn load_node_from_file(
    path: impl AsRef<Path>,
    registry: &NodeRegistry,
) -> Result<Box<dyn Node>, PersistError> {
    let text = std::fs::read_to_string(path)?;
    load_node(&text, registry)
}

fn build<'a>(
    record: &'a NodeRecord,
    registry: &NodeRegistry,
    state: &mut LoadState<'a>,
    depth: usize,
) -> Result<Box<dyn Node>, PersistError> {
    let mut node = registry.create(&record.type_tag)?;
    apply(node.as_mut(), record, registry, state, depth)?;
    Ok(node)
}

/// Write `record` onto a freshly constructed `node`, building its children.
fn apply<'a>(
    node: &mut dyn Node,
    record: &'a NodeRecord,
    registry: &NodeRegistry,
    state: &mut LoadState<'a>,
    depth: usize,
) -> Result<(), PersistError> {
    if depth > MAX_DEPTH {
        return Err(PersistError::TooDeep(MAX_DEPTH));
    }
    let actual = type_tag(node.type_name());
    if actual != record.type_tag {
        return Err(PersistError::Malformed(format!(
            "node {} is a `{}`, found `{actual}` in its place",
            record.id, record.type_tag
        )));
    }

    let id = node.core().id();
    if state.remap.insert(record.id, id).is_some() {
        return Err(PersistError::Malformed(format!("duplicate node id {}", record.id)));
    }
    state.props.push((id, &record.props));

    let core = node.core_mut();
    core.transform = record.transform;
    core.body = record.body.clone();
    core.clear_unbound_children();

    let mut order = Vec::with_capacity(record.children.len());
    for child in &record.children {
        if let Some(slot) = &child.slot {
            let slot_id = node.core().slot_id(slot).ok_or_else(|| {
                PersistError::Malformed(format!("`{}` has no capability `{slot}`", record.type_tag))
            })?;
            if order.contains(&slot_id) {
                return Err(PersistError::Malformed(format!("capability `{slot}` saved twice")));
            }
            let slot_node = node
                .core_mut()
                .child_mut(slot_id)
                .ok_or_else(|| PersistError::Malformed(format!("capability `{slot}` is unbound")))?;
            apply(slot_node, child, registry, state, depth + 1)?;
            order.push(slot_id);
            continue;
        }

        let built = build(child, registry, state, depth + 1)?;
        let child_id = match &child.collection {
            Some(name) => node
                .core_mut()
                .attach_to_collection(name, built)
                .map_err(|(_, refusal)| match refusal {
                    AttachRefusal::NoSuchCollection => PersistError::Malformed(format!(
                        "`{}` has no collection `{name}`",
                        record.type_tag
                    )),
                    AttachRefusal::WrongType { expected } => PersistError::Malformed(format!(
                        "collection `{name}` holds `{}`, found `{}`",
                        type_tag(expected),
                        child.type_tag
                    )),
                })?,
            None => node.core_mut().attach_child(built),
        };
        order.push(child_id);
    }
    node.core_mut().reorder_children(&order);
    Ok(())
}
