//! Engine objects: scene nodes, the components attached to them, and assets.

use clipstack_ids::{ObjectId, TypeId};
use smallvec::SmallVec;

use crate::property::PropertySet;

/// Object is hidden from the hierarchy view.
pub const HIDE_FLAG_HIDDEN: u32 = 1 << 0;
/// Object is not saved with the scene.
pub const HIDE_FLAG_DONT_SAVE: u32 = 1 << 1;
/// Object rejects edits (and therefore pastes).
pub const HIDE_FLAG_NOT_EDITABLE: u32 = 1 << 3;

#[derive(Clone, Debug)]
pub struct NodeData {
    pub parent: ObjectId,
    pub children: SmallVec<[ObjectId; 8]>,
    pub components: SmallVec<[ObjectId; 4]>,
    pub active: bool,
    pub layer: u32,
    pub tag: String,
    pub static_flags: u32,
    /// Owning prefab asset when this node lives inside a prefab template
    /// rather than the scene; nil for scene nodes.
    pub asset: ObjectId,
    /// Template node this instance was instantiated from; nil when the node
    /// is not part of a prefab instance.
    pub prefab_source: ObjectId,
    /// Template components removed on this instance (instance root only).
    pub removed_components: Vec<ObjectId>,
}

impl NodeData {
    pub fn new(parent: ObjectId) -> Self {
        Self {
            parent,
            children: SmallVec::new(),
            components: SmallVec::new(),
            active: true,
            layer: 0,
            tag: String::new(),
            static_flags: 0,
            asset: ObjectId::nil(),
            prefab_source: ObjectId::nil(),
            removed_components: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ComponentData {
    pub owner: ObjectId,
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct AssetData {
    /// Stable project-relative path, e.g. `res://prefabs/turret.pfb`.
    pub path: String,
    /// Root node of the prefab template; nil for plain (non-prefab) assets.
    pub template_root: ObjectId,
}

#[derive(Clone, Debug)]
pub enum ObjectKind {
    Node(NodeData),
    Component(ComponentData),
    Asset(AssetData),
}

#[derive(Clone, Debug)]
pub struct EngineObject {
    pub name: String,
    pub type_id: TypeId,
    pub hide_flags: u32,
    pub kind: ObjectKind,
    pub properties: PropertySet,
}

impl EngineObject {
    #[inline]
    pub fn is_editable(&self) -> bool {
        self.hide_flags & HIDE_FLAG_NOT_EDITABLE == 0
    }

    #[inline]
    pub fn as_node(&self) -> Option<&NodeData> {
        match &self.kind {
            ObjectKind::Node(n) => Some(n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_node_mut(&mut self) -> Option<&mut NodeData> {
        match &mut self.kind {
            ObjectKind::Node(n) => Some(n),
            _ => None,
        }
    }

    #[inline]
    pub fn as_component(&self) -> Option<&ComponentData> {
        match &self.kind {
            ObjectKind::Component(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub fn as_component_mut(&mut self) -> Option<&mut ComponentData> {
        match &mut self.kind {
            ObjectKind::Component(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub fn as_asset(&self) -> Option<&AssetData> {
        match &self.kind {
            ObjectKind::Asset(a) => Some(a),
            _ => None,
        }
    }
}
