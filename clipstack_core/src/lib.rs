//! Object-graph clipboard engine: captures live object state into a
//! self-contained, serializable graph and pastes it back into the same or
//! another host, matching values by name and retargeting references.

#![forbid(unsafe_code)]

pub mod bridge;
pub mod clipboard;
pub mod codec;
pub mod node;
pub mod resolve;

pub use clipboard::{PasteError, PasteSettings, SerializedClipboard};
pub use codec::ReadError;
pub use node::{
    AssetEntry, ComponentRecord, HierarchyNode, ManagedEntry, Node, NodeTag, RelationStep,
    RemovedComponentRecord, SceneObjectEntry, TypeEntry,
};
pub use resolve::ResolveSession;
