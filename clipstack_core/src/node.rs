//! The flattened graph-node model. Each clipboard value kind has one node
//! variant; reference-bearing fields carry integer indices into the owning
//! clipboard's side tables instead of live handles, so the whole graph can be
//! written as a linear binary stream and shared/cyclic references survive.

use clipstack_ids::TypeId;
use clipstack_model::registry::TypeResolver;
use clipstack_variant::{Color, VectorValue};
use once_cell::sync::OnceCell;

use crate::clipboard::SerializedClipboard;

/// Recorded type: simple name plus qualified name, lazily resolved against
/// the live registry. Resolution tolerates module-name drift between the
/// build that wrote the clipboard and the one reading it; a miss means
/// "reference lost", never an error.
#[derive(Clone, Debug)]
pub struct TypeEntry {
    pub name: String,
    pub qualified_name: String,
    cache: OnceCell<Option<TypeId>>,
}

impl TypeEntry {
    pub fn new(name: impl Into<String>, qualified_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualified_name: qualified_name.into(),
            cache: OnceCell::new(),
        }
    }

    pub fn resolve(&self, resolver: &dyn TypeResolver) -> Option<TypeId> {
        *self
            .cache
            .get_or_init(|| resolver.resolve(&self.qualified_name))
    }
}

impl PartialEq for TypeEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.qualified_name == other.qualified_name
    }
}

/// One step of a relative path from the copy-time context object to a
/// referenced object. `Down` descends to the `occurrence`-th child of the
/// given name; sibling order is assumed stable between copy and paste
/// (a known limitation, not guarded against).
#[derive(Clone, Debug, PartialEq)]
pub enum RelationStep {
    /// The context object itself.
    Here,
    /// One parent hop.
    Up,
    Down { name: String, occurrence: u32 },
}

/// Scene-object reference table entry. `path` is the absolute hierarchy path
/// of the owner node; `relative_path` enables retargeting onto an analogous
/// object in the destination's own hierarchy. `component_ordinal` is -1 when
/// the reference is the node itself, otherwise the ordinal among same-type
/// components on the owner.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneObjectEntry {
    pub type_index: u32,
    pub name: String,
    pub path: Vec<String>,
    pub relative_path: Vec<RelationStep>,
    pub component_ordinal: i32,
}

/// Asset reference table entry; `path` is the asset's stable project path.
/// `name` differs from the asset's own name when the reference points inside
/// a prefab template.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetEntry {
    pub type_index: u32,
    pub name: String,
    pub path: String,
}

/// Managed-object table entry: the data fields as one JSON blob, plus the
/// reference fields keyed by field name. Indices below -1 never occur; -1
/// encodes a nil reference.
#[derive(Clone, Debug, PartialEq)]
pub struct ManagedEntry {
    pub type_index: u32,
    pub json: String,
    pub managed_refs: Vec<(String, i32)>,
    pub scene_refs: Vec<(String, i32)>,
    pub asset_refs: Vec<(String, i32)>,
}

/// Captured component inside a hierarchy node: identity by type + ordinal
/// among same-type siblings, values as a nested clipboard pasted in phase 2.
#[derive(Clone, Debug, PartialEq)]
pub struct ComponentRecord {
    pub type_index: u32,
    pub ordinal: u32,
    pub enabled: bool,
    pub hide_flags: u32,
    pub clipboard: SerializedClipboard,
}

/// Component present on the source prefab but removed on the captured
/// instance.
#[derive(Clone, Debug, PartialEq)]
pub struct RemovedComponentRecord {
    pub type_index: u32,
    pub ordinal: u32,
}

/// Recursive capture of a scene-node subtree.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchyNode {
    pub name: String,
    pub active: bool,
    pub layer: u32,
    pub tag: String,
    pub static_flags: u32,
    pub hide_flags: u32,
    /// Node was part of its parent's prefab content; used to match live
    /// children when pasting onto an existing prefab instance.
    pub from_prefab: bool,
    /// Asset table index of the source prefab for instance roots, -1 otherwise.
    pub prefab_asset: i32,
    pub sibling_index: u32,
    pub components: Vec<ComponentRecord>,
    pub removed_components: Vec<RemovedComponentRecord>,
    pub children: Vec<HierarchyNode>,
}

/// One flattened graph node. `name` is the originating field/property name
/// (empty when unnamed); paste matches on it.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Null {
        name: String,
    },
    Bool {
        name: String,
        value: bool,
    },
    Long {
        name: String,
        value: i64,
    },
    Double {
        name: String,
        value: f64,
    },
    String {
        name: String,
        value: String,
    },
    Color {
        name: String,
        value: Color,
    },
    Vector {
        name: String,
        value: VectorValue,
    },
    Curve {
        name: String,
        json: String,
    },
    Gradient {
        name: String,
        json: String,
    },
    Array {
        name: String,
        element_type: String,
        elements: Vec<Node>,
    },
    Generic {
        name: String,
        type_index: u32,
        children: Vec<Node>,
    },
    SceneRef {
        name: String,
        index: u32,
    },
    AssetRef {
        name: String,
        index: u32,
    },
    ManagedRef {
        name: String,
        index: u32,
    },
    Hierarchy {
        name: String,
        root: HierarchyNode,
    },
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Null { name }
            | Node::Bool { name, .. }
            | Node::Long { name, .. }
            | Node::Double { name, .. }
            | Node::String { name, .. }
            | Node::Color { name, .. }
            | Node::Vector { name, .. }
            | Node::Curve { name, .. }
            | Node::Gradient { name, .. }
            | Node::Array { name, .. }
            | Node::Generic { name, .. }
            | Node::SceneRef { name, .. }
            | Node::AssetRef { name, .. }
            | Node::ManagedRef { name, .. }
            | Node::Hierarchy { name, .. } => name,
        }
    }
}

/// The single tag-to-variant table shared by `serialize` and `deserialize`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeTag {
    Null = 0,
    Bool = 1,
    Long = 2,
    Double = 3,
    String = 4,
    Color = 5,
    Vector = 6,
    Curve = 7,
    Gradient = 8,
    Array = 9,
    Generic = 10,
    SceneRef = 11,
    AssetRef = 12,
    ManagedRef = 13,
    Hierarchy = 14,
}

impl NodeTag {
    pub fn of(node: &Node) -> NodeTag {
        match node {
            Node::Null { .. } => NodeTag::Null,
            Node::Bool { .. } => NodeTag::Bool,
            Node::Long { .. } => NodeTag::Long,
            Node::Double { .. } => NodeTag::Double,
            Node::String { .. } => NodeTag::String,
            Node::Color { .. } => NodeTag::Color,
            Node::Vector { .. } => NodeTag::Vector,
            Node::Curve { .. } => NodeTag::Curve,
            Node::Gradient { .. } => NodeTag::Gradient,
            Node::Array { .. } => NodeTag::Array,
            Node::Generic { .. } => NodeTag::Generic,
            Node::SceneRef { .. } => NodeTag::SceneRef,
            Node::AssetRef { .. } => NodeTag::AssetRef,
            Node::ManagedRef { .. } => NodeTag::ManagedRef,
            Node::Hierarchy { .. } => NodeTag::Hierarchy,
        }
    }

    pub fn from_u8(value: u8) -> Option<NodeTag> {
        Some(match value {
            0 => NodeTag::Null,
            1 => NodeTag::Bool,
            2 => NodeTag::Long,
            3 => NodeTag::Double,
            4 => NodeTag::String,
            5 => NodeTag::Color,
            6 => NodeTag::Vector,
            7 => NodeTag::Curve,
            8 => NodeTag::Gradient,
            9 => NodeTag::Array,
            10 => NodeTag::Generic,
            11 => NodeTag::SceneRef,
            12 => NodeTag::AssetRef,
            13 => NodeTag::ManagedRef,
            14 => NodeTag::Hierarchy,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_table_roundtrips() {
        for raw in 0..=14u8 {
            let tag = NodeTag::from_u8(raw).unwrap();
            assert_eq!(tag as u8, raw);
        }
        assert_eq!(NodeTag::from_u8(15), None);
    }

    #[test]
    fn type_entry_caches_resolution() {
        use clipstack_model::{TypeCategory, TypeDescriptor, TypeRegistry};

        let mut registry = TypeRegistry::new();
        let id = registry.register(TypeDescriptor {
            simple_name: "Mover".to_string(),
            qualified_name: "game::Mover".to_string(),
            category: TypeCategory::Component,
            defaults: Default::default(),
        });
        let entry = TypeEntry::new("Mover", "game::Mover");
        assert_eq!(entry.resolve(&registry), Some(id));
        // Cached: answer is stable even if the registry changes afterward.
        assert_eq!(entry.resolve(&registry), Some(id));
    }
}
