//! Capture and paste of object graphs.
//!
//! A capture flattens live values into [`Node`]s plus four deduplicated side
//! tables (types, scene objects, assets, managed objects); every reference to
//! the same live object lands on the same table index, so shared and cyclic
//! references keep their identity through serialization. `values[0]` always
//! describes the capture root; `values[1..]` are the individual properties,
//! matched by name on paste so values move freely between components of
//! different types.

use std::io::{self, Read, Write};

use clipstack_ids::{ManagedId, ObjectId, TypeId};
use clipstack_model::{Host, ManagedField, ModelError, ObjectKind, TypeCategory};
use clipstack_variant::ClipValue;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::bridge;
use crate::codec::{self, ReadError};
use crate::node::{
    AssetEntry, ComponentRecord, HierarchyNode, ManagedEntry, Node, RemovedComponentRecord,
    SceneObjectEntry, TypeEntry,
};
use crate::resolve::{ResolveSession, relation_steps};

#[derive(Debug, Error)]
pub enum PasteError {
    #[error("clipboard holds no pasteable values")]
    Empty,
    #[error("object {0} is not editable")]
    NotEditable(ObjectId),
    #[error("clipboard does not hold a component capture")]
    NotAComponent,
    #[error("clipboard does not hold a node hierarchy")]
    NotAHierarchy,
    #[error("clipboard value does not fit property `{0}`")]
    Incompatible(String),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Knobs for one paste operation. `smart_paste` turns on relative-path
/// retargeting of scene references; it is forced on for the component values
/// of a hierarchy paste so intra-hierarchy references land on the newly
/// created objects.
#[derive(Clone, Copy, Debug)]
pub struct PasteSettings {
    pub smart_paste: bool,
}

impl Default for PasteSettings {
    fn default() -> Self {
        Self { smart_paste: true }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SerializedClipboard {
    /// Free-form display label, e.g. the source object's name.
    pub label: String,
    pub types: Vec<TypeEntry>,
    pub scene_objects: Vec<SceneObjectEntry>,
    pub assets: Vec<AssetEntry>,
    pub managed: Vec<ManagedEntry>,
    /// `values[0]` is the capture root; the rest are property values.
    pub values: Vec<Node>,
}

// -------------------- Capture --------------------

struct Builder<'h> {
    host: &'h Host,
    /// Copy-time context node; relative paths are recorded from here.
    context: ObjectId,
    types: Vec<TypeEntry>,
    type_map: FxHashMap<String, u32>,
    scene_objects: Vec<SceneObjectEntry>,
    scene_map: FxHashMap<ObjectId, u32>,
    assets: Vec<AssetEntry>,
    asset_map: FxHashMap<ObjectId, u32>,
    managed: Vec<ManagedEntry>,
    managed_map: FxHashMap<ManagedId, u32>,
}

impl<'h> Builder<'h> {
    fn new(host: &'h Host, context: ObjectId) -> Self {
        Self {
            host,
            context,
            types: Vec::new(),
            type_map: FxHashMap::default(),
            scene_objects: Vec::new(),
            scene_map: FxHashMap::default(),
            assets: Vec::new(),
            asset_map: FxHashMap::default(),
            managed: Vec::new(),
            managed_map: FxHashMap::default(),
        }
    }

    fn finish(self, label: String, values: Vec<Node>) -> SerializedClipboard {
        SerializedClipboard {
            label,
            types: self.types,
            scene_objects: self.scene_objects,
            assets: self.assets,
            managed: self.managed,
            values,
        }
    }

    fn type_index_by_name(&mut self, simple: &str, qualified: &str) -> u32 {
        if let Some(&index) = self.type_map.get(qualified) {
            return index;
        }
        let index = self.types.len() as u32;
        self.types.push(TypeEntry::new(simple, qualified));
        self.type_map.insert(qualified.to_string(), index);
        index
    }

    fn type_index(&mut self, id: TypeId) -> u32 {
        match self.host.registry.descriptor(id) {
            Some(descriptor) => {
                let (simple, qualified) = (
                    descriptor.simple_name.clone(),
                    descriptor.qualified_name.clone(),
                );
                self.type_index_by_name(&simple, &qualified)
            }
            None => self.type_index_by_name("", ""),
        }
    }

    fn node_of(&mut self, name: &str, value: &ClipValue) -> Node {
        let name = name.to_string();
        match value {
            ClipValue::Null => Node::Null { name },
            ClipValue::Bool(v) => Node::Bool { name, value: *v },
            ClipValue::Long(v) => Node::Long { name, value: *v },
            ClipValue::Double(v) => Node::Double { name, value: *v },
            ClipValue::String(v) => Node::String {
                name,
                value: v.to_string(),
            },
            ClipValue::Color(v) => Node::Color { name, value: *v },
            ClipValue::Vector(v) => Node::Vector { name, value: *v },
            ClipValue::Curve(json) => Node::Curve {
                name,
                json: json.to_string(),
            },
            ClipValue::Gradient(json) => Node::Gradient {
                name,
                json: json.to_string(),
            },
            ClipValue::Array(array) => Node::Array {
                name,
                element_type: array.element_type.to_string(),
                elements: array
                    .elements
                    .iter()
                    .map(|element| self.node_of("", element))
                    .collect(),
            },
            ClipValue::Generic(generic) => {
                let qualified = generic.type_name.to_string();
                let simple = qualified.rsplit("::").next().unwrap_or(&qualified);
                let type_index = self.type_index_by_name(simple, &qualified);
                Node::Generic {
                    name,
                    type_index,
                    children: generic
                        .fields
                        .iter()
                        .map(|(field, value)| {
                            let field = field.to_string();
                            self.node_of(&field, value)
                        })
                        .collect(),
                }
            }
            ClipValue::Object(id) => {
                if id.is_nil() || self.host.object(*id).is_none() {
                    Node::Null { name }
                } else if self.host.is_asset(*id) {
                    Node::AssetRef {
                        name,
                        index: self.register_asset(*id),
                    }
                } else {
                    Node::SceneRef {
                        name,
                        index: self.register_scene(*id),
                    }
                }
            }
            ClipValue::Managed(id) => match self.register_managed(*id) {
                Some(index) => Node::ManagedRef { name, index },
                None => Node::Null { name },
            },
        }
    }

    fn register_scene(&mut self, id: ObjectId) -> u32 {
        if let Some(&index) = self.scene_map.get(&id) {
            return index;
        }
        let owner = self.host.owner_node_of(id);
        let component_ordinal = match self.host.object(id).map(|o| &o.kind) {
            Some(ObjectKind::Component(_)) => {
                self.host.index_of_component_by_type(id).unwrap_or(0) as i32
            }
            _ => -1,
        };
        let entry = SceneObjectEntry {
            type_index: self.type_index(self.host.type_of(id)),
            name: self.host.name_of(id).to_string(),
            path: self.host.node_path(id),
            relative_path: relation_steps(self.host, self.context, owner),
            component_ordinal,
        };
        let index = self.scene_objects.len() as u32;
        self.scene_objects.push(entry);
        self.scene_map.insert(id, index);
        index
    }

    fn register_asset(&mut self, id: ObjectId) -> u32 {
        if let Some(&index) = self.asset_map.get(&id) {
            return index;
        }
        // References into a prefab template record the owning asset's path
        // plus the template node's name; the asset object itself records its
        // own name.
        let (name, path) = match self.host.object(id).map(|o| (&o.kind, &o.name)) {
            Some((ObjectKind::Asset(asset), object_name)) => {
                (object_name.clone(), asset.path.clone())
            }
            Some((ObjectKind::Node(node), object_name)) => {
                (object_name.clone(), self.host.asset_path(node.asset).to_string())
            }
            Some((ObjectKind::Component(component), _)) => {
                let owner = component.owner;
                let asset = self
                    .host
                    .object(owner)
                    .and_then(|o| o.as_node())
                    .map(|n| n.asset)
                    .unwrap_or_default();
                (
                    self.host.name_of(owner).to_string(),
                    self.host.asset_path(asset).to_string(),
                )
            }
            None => (String::new(), String::new()),
        };
        let entry = AssetEntry {
            type_index: self.type_index(self.host.type_of(id)),
            name,
            path,
        };
        let index = self.assets.len() as u32;
        self.assets.push(entry);
        self.asset_map.insert(id, index);
        index
    }

    fn register_managed(&mut self, id: ManagedId) -> Option<u32> {
        if let Some(&index) = self.managed_map.get(&id) {
            return Some(index);
        }
        let object = self.host.managed(id)?;
        let type_index = self.type_index(object.type_id);
        let index = self.managed.len() as u32;
        // Placeholder first: a cyclic field chain reaching back here finds
        // the index instead of recursing forever.
        self.managed.push(ManagedEntry {
            type_index,
            json: String::new(),
            managed_refs: Vec::new(),
            scene_refs: Vec::new(),
            asset_refs: Vec::new(),
        });
        self.managed_map.insert(id, index);

        let json = serde_json::to_string(&object.data_json()).unwrap_or_default();
        let mut managed_refs = Vec::new();
        let mut scene_refs = Vec::new();
        let mut asset_refs = Vec::new();
        for (field, value) in &object.fields {
            match value {
                ManagedField::Json(_) => {}
                ManagedField::Managed(target) => {
                    let target_index = if target.is_nil() {
                        -1
                    } else {
                        self.register_managed(*target)
                            .map(|i| i as i32)
                            .unwrap_or(-1)
                    };
                    managed_refs.push((field.clone(), target_index));
                }
                ManagedField::Object(target) => {
                    if target.is_nil() || self.host.object(*target).is_none() {
                        scene_refs.push((field.clone(), -1));
                    } else if self.host.is_asset(*target) {
                        asset_refs.push((field.clone(), self.register_asset(*target) as i32));
                    } else {
                        scene_refs.push((field.clone(), self.register_scene(*target) as i32));
                    }
                }
            }
        }
        let entry = &mut self.managed[index as usize];
        entry.json = json;
        entry.managed_refs = managed_refs;
        entry.scene_refs = scene_refs;
        entry.asset_refs = asset_refs;
        Some(index)
    }
}

impl SerializedClipboard {
    /// Capture every serialized property of one object (component, node or
    /// asset). Relative paths are recorded from the object's owner node.
    pub fn from_object(
        host: &Host,
        object: ObjectId,
        label: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let source = host.object(object).ok_or(ModelError::InvalidObject(object))?;
        let mut builder = Builder::new(host, host.owner_node_of(object));
        let mut values = Vec::with_capacity(source.properties.len() + 1);
        values.push(builder.node_of(&source.name, &ClipValue::Object(object)));
        for (name, value) in &source.properties {
            values.push(builder.node_of(name, &bridge::copy_value(value)));
        }
        Ok(builder.finish(label.into(), values))
    }

    /// Capture a single property.
    pub fn from_property(
        host: &Host,
        object: ObjectId,
        property: &str,
        label: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let source = host.object(object).ok_or(ModelError::InvalidObject(object))?;
        let value = source
            .properties
            .get(property)
            .ok_or_else(|| ModelError::MissingProperty {
                object,
                name: property.to_string(),
            })?;
        let mut builder = Builder::new(host, host.owner_node_of(object));
        let root = builder.node_of(&source.name, &ClipValue::Object(object));
        let node = builder.node_of(property, &bridge::copy_value(value));
        Ok(builder.finish(label.into(), vec![root, node]))
    }

    /// Capture a scene-node subtree: node data, components (each as a nested
    /// clipboard), prefab linkage and removed prefab components, recursively.
    pub fn from_hierarchy(
        host: &Host,
        node: ObjectId,
        label: impl Into<String>,
    ) -> Result<Self, ModelError> {
        let name = host.name_of(node).to_string();
        let mut builder = Builder::new(host, host.parent_of(node));
        let root = capture_hierarchy(host, &mut builder, node)?;
        Ok(builder.finish(label.into(), vec![Node::Hierarchy { name, root }]))
    }

    // -------------------- Serialization --------------------

    pub fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        codec::write_clipboard(writer, self)
    }

    pub fn deserialize<R: Read>(reader: &mut R) -> Result<Self, ReadError> {
        codec::read_clipboard(reader)
    }

    // -------------------- Paste --------------------

    pub fn root(&self) -> Option<&Node> {
        self.values.first()
    }

    fn root_scene_entry(&self) -> Option<&SceneObjectEntry> {
        match self.root()? {
            Node::SceneRef { index, .. } => self.scene_objects.get(*index as usize),
            _ => None,
        }
    }

    pub fn can_paste_to_object(&self, host: &Host, object: ObjectId) -> bool {
        if self.values.len() <= 1 || !host.is_editable(object) {
            return false;
        }
        let Some(properties) = host.properties(object) else {
            return false;
        };
        self.values[1..]
            .iter()
            .any(|node| properties.contains_key(node.name()))
    }

    /// Name-matched partial paste: each captured value whose name exists on
    /// the destination and fits its slot is committed; the rest are skipped.
    /// Returns the names of the values that were pasted.
    pub fn paste_to_object(
        &self,
        host: &mut Host,
        object: ObjectId,
        settings: PasteSettings,
    ) -> Result<Vec<String>, PasteError> {
        if self.values.len() <= 1 {
            return Err(PasteError::Empty);
        }
        if !host.is_editable(object) {
            return Err(PasteError::NotEditable(object));
        }
        let mut session = ResolveSession::new(self, host.owner_node_of(object), settings);
        let mut changed = Vec::new();
        for node in &self.values[1..] {
            let Some(existing) = host.property(object, node.name()).cloned() else {
                debug!("destination has no property `{}`", node.name());
                continue;
            };
            let value = session.resolve(host, node);
            match bridge::apply_value(host, &existing, &value) {
                Some(updated) => {
                    host.set_property(object, node.name(), updated)?;
                    changed.push(node.name().to_string());
                }
                None => debug!("value `{}` does not fit its destination slot", node.name()),
            }
        }
        info!(
            "pasted {} value(s) onto `{}`: [{}]",
            changed.len(),
            host.name_of(object),
            changed.join(", ")
        );
        Ok(changed)
    }

    /// Paste a single-value capture onto the named property.
    pub fn paste_to_property(
        &self,
        host: &mut Host,
        object: ObjectId,
        property: &str,
        settings: PasteSettings,
    ) -> Result<(), PasteError> {
        let node = self.values.get(1).ok_or(PasteError::Empty)?;
        if !host.is_editable(object) {
            return Err(PasteError::NotEditable(object));
        }
        let existing = host
            .property(object, property)
            .cloned()
            .ok_or_else(|| ModelError::MissingProperty {
                object,
                name: property.to_string(),
            })?;
        let mut session = ResolveSession::new(self, host.owner_node_of(object), settings);
        let value = session.resolve(host, node);
        let updated = bridge::apply_value(host, &existing, &value)
            .ok_or_else(|| PasteError::Incompatible(property.to_string()))?;
        host.set_property(object, property, updated)?;
        Ok(())
    }

    /// The component type this capture was taken from, when the root is a
    /// component and the type still resolves.
    fn captured_component_type(&self, host: &Host) -> Option<TypeId> {
        let entry = self.root_scene_entry()?;
        if entry.component_ordinal < 0 {
            return None;
        }
        let id = self
            .types
            .get(entry.type_index as usize)?
            .resolve(&host.registry)?;
        (host.registry.descriptor(id)?.category == TypeCategory::Component).then_some(id)
    }

    pub fn can_paste_as_new_component(&self, host: &Host, node: ObjectId) -> bool {
        host.is_editable(node)
            && host.object(node).is_some_and(|o| o.as_node().is_some())
            && self.captured_component_type(host).is_some()
    }

    /// Add a component of the captured type to `node` and paste the values
    /// onto it.
    pub fn paste_as_new_component(
        &self,
        host: &mut Host,
        node: ObjectId,
        settings: PasteSettings,
    ) -> Result<ObjectId, PasteError> {
        let type_id = self
            .captured_component_type(host)
            .ok_or(PasteError::NotAComponent)?;
        let component = host.add_component(node, type_id)?;
        if self.values.len() > 1 {
            self.paste_to_object(host, component, settings)?;
        }
        Ok(component)
    }

    /// Recreate a captured subtree under `parent`, in two phases. Phase one
    /// builds the structure: prefabs are re-instantiated from their assets,
    /// plain nodes created, components matched by type and ordinal or added,
    /// and recorded prefab removals replayed. Phase two pastes every
    /// component's values, so references between pasted objects resolve onto
    /// the newly built structure.
    pub fn paste_hierarchy(
        &self,
        host: &mut Host,
        parent: ObjectId,
        settings: PasteSettings,
    ) -> Result<ObjectId, PasteError> {
        let Some(Node::Hierarchy { root, .. }) = self.values.first() else {
            return Err(PasteError::NotAHierarchy);
        };
        let session = ResolveSession::new(self, parent, settings);
        let mut pending = Vec::new();
        let created = self.build_hierarchy_node(host, &session, root, parent, &mut pending)?;

        let component_settings = PasteSettings { smart_paste: true };
        for (component, record) in pending {
            if record.clipboard.values.len() > 1 && host.is_editable(component) {
                record
                    .clipboard
                    .paste_to_object(host, component, component_settings)?;
            }
        }
        Ok(created)
    }

    fn build_hierarchy_node<'s>(
        &'s self,
        host: &mut Host,
        session: &ResolveSession<'_>,
        record: &'s HierarchyNode,
        parent: ObjectId,
        pending: &mut Vec<(ObjectId, &'s ComponentRecord)>,
    ) -> Result<ObjectId, PasteError> {
        let prefab_asset = (record.prefab_asset >= 0)
            .then(|| self.assets.get(record.prefab_asset as usize))
            .flatten()
            .and_then(|entry| session.resolve_asset(host, entry))
            .filter(|&asset| !host.template_root_of(asset).is_nil());
        let node = match prefab_asset {
            Some(asset) => host.instantiate_prefab(asset, parent)?,
            None => {
                if record.prefab_asset >= 0 {
                    warn!(
                        "prefab for `{}` is missing, pasting a plain subtree",
                        record.name
                    );
                }
                host.create_node(record.name.clone(), parent)?
            }
        };
        self.populate_hierarchy_node(host, session, record, node, pending)?;
        Ok(node)
    }

    fn populate_hierarchy_node<'s>(
        &'s self,
        host: &mut Host,
        session: &ResolveSession<'_>,
        record: &'s HierarchyNode,
        node: ObjectId,
        pending: &mut Vec<(ObjectId, &'s ComponentRecord)>,
    ) -> Result<(), PasteError> {
        if let Some(object) = host.object_mut(node) {
            object.name = record.name.clone();
            object.hide_flags = record.hide_flags;
        }
        if let Some(data) = host.object_mut(node).and_then(|o| o.as_node_mut()) {
            data.active = record.active;
            data.layer = record.layer;
            data.tag = record.tag.clone();
            data.static_flags = record.static_flags;
        }

        for removed in &record.removed_components {
            let Some(type_id) = self
                .types
                .get(removed.type_index as usize)
                .and_then(|t| t.resolve(&host.registry))
            else {
                warn!("removed-component type is unknown, skipped");
                continue;
            };
            let template = host.prefab_source_of(node);
            let Some(template_component) =
                host.find_component_of_type_closest_to_index(template, type_id, removed.ordinal)
            else {
                continue;
            };
            if let Err(err) = host.remove_prefab_component(node, template_component) {
                warn!("could not replay prefab component removal: {err}");
            }
        }

        for component_record in &record.components {
            let Some(type_id) = self
                .types
                .get(component_record.type_index as usize)
                .and_then(|t| t.resolve(&host.registry))
            else {
                let name = self
                    .types
                    .get(component_record.type_index as usize)
                    .map(|t| t.qualified_name.as_str())
                    .unwrap_or("");
                warn!("component type `{name}` is unknown, skipped");
                continue;
            };
            let same_type = host
                .components_of(node)
                .iter()
                .filter(|&&c| host.type_of(c) == type_id)
                .count() as u32;
            let component = if component_record.ordinal < same_type {
                match host.find_component_of_type_closest_to_index(
                    node,
                    type_id,
                    component_record.ordinal,
                ) {
                    Some(existing) => existing,
                    None => host.add_component(node, type_id)?,
                }
            } else {
                host.add_component(node, type_id)?
            };
            host.set_component_enabled(component, component_record.enabled);
            if let Some(object) = host.object_mut(component) {
                object.hide_flags = component_record.hide_flags;
            }
            pending.push((component, component_record));
        }

        for child in &record.children {
            // Children the prefab already provides are matched by name and
            // merged onto; everything else is created.
            let existing = if child.from_prefab {
                host.child_named(node, &child.name, 0)
            } else {
                None
            };
            let child_node = match existing {
                Some(existing) => {
                    self.populate_hierarchy_node(host, session, child, existing, pending)?;
                    existing
                }
                None => self.build_hierarchy_node(host, session, child, node, pending)?,
            };
            host.set_sibling_index(child_node, child.sibling_index as usize);
        }
        Ok(())
    }

    // -------------------- Diff --------------------

    /// Names of captured values that are present on `object` but hold a
    /// different value there. References compare by recorded identity (path,
    /// name, ordinal), not by resolving them.
    pub fn differing_values(&self, host: &Host, object: ObjectId) -> Vec<String> {
        let Ok(other) = SerializedClipboard::from_object(host, object, "") else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for node in self.values.iter().skip(1) {
            let Some(counterpart) = other
                .values
                .iter()
                .skip(1)
                .find(|candidate| candidate.name() == node.name())
            else {
                continue;
            };
            if !self.nodes_equivalent(node, &other, counterpart) {
                out.push(node.name().to_string());
            }
        }
        out
    }

    fn type_name(&self, index: u32) -> &str {
        self.types
            .get(index as usize)
            .map(|t| t.qualified_name.as_str())
            .unwrap_or("")
    }

    fn nodes_equivalent(&self, a: &Node, other: &SerializedClipboard, b: &Node) -> bool {
        match (a, b) {
            (Node::Null { .. }, Node::Null { .. }) => true,
            (Node::Bool { value: x, .. }, Node::Bool { value: y, .. }) => x == y,
            (Node::Long { value: x, .. }, Node::Long { value: y, .. }) => x == y,
            (Node::Double { value: x, .. }, Node::Double { value: y, .. }) => x == y,
            (Node::String { value: x, .. }, Node::String { value: y, .. }) => x == y,
            (Node::Color { value: x, .. }, Node::Color { value: y, .. }) => x == y,
            (Node::Vector { value: x, .. }, Node::Vector { value: y, .. }) => x == y,
            (Node::Curve { json: x, .. }, Node::Curve { json: y, .. }) => x == y,
            (Node::Gradient { json: x, .. }, Node::Gradient { json: y, .. }) => x == y,
            (
                Node::Array {
                    element_type: ta,
                    elements: ea,
                    ..
                },
                Node::Array {
                    element_type: tb,
                    elements: eb,
                    ..
                },
            ) => {
                ta == tb
                    && ea.len() == eb.len()
                    && ea
                        .iter()
                        .zip(eb)
                        .all(|(x, y)| self.nodes_equivalent(x, other, y))
            }
            (
                Node::Generic {
                    type_index: ia,
                    children: ca,
                    ..
                },
                Node::Generic {
                    type_index: ib,
                    children: cb,
                    ..
                },
            ) => {
                self.type_name(*ia) == other.type_name(*ib)
                    && ca.len() == cb.len()
                    && ca.iter().zip(cb).all(|(x, y)| {
                        x.name() == y.name() && self.nodes_equivalent(x, other, y)
                    })
            }
            (Node::SceneRef { index: ia, .. }, Node::SceneRef { index: ib, .. }) => {
                match (
                    self.scene_objects.get(*ia as usize),
                    other.scene_objects.get(*ib as usize),
                ) {
                    (Some(x), Some(y)) => {
                        x.name == y.name
                            && x.path == y.path
                            && x.component_ordinal == y.component_ordinal
                            && self.type_name(x.type_index) == other.type_name(y.type_index)
                    }
                    _ => false,
                }
            }
            (Node::AssetRef { index: ia, .. }, Node::AssetRef { index: ib, .. }) => {
                match (self.assets.get(*ia as usize), other.assets.get(*ib as usize)) {
                    (Some(x), Some(y)) => {
                        x.name == y.name
                            && x.path == y.path
                            && self.type_name(x.type_index) == other.type_name(y.type_index)
                    }
                    _ => false,
                }
            }
            (Node::ManagedRef { index: ia, .. }, Node::ManagedRef { index: ib, .. }) => {
                match (
                    self.managed.get(*ia as usize),
                    other.managed.get(*ib as usize),
                ) {
                    (Some(x), Some(y)) => {
                        x.json == y.json
                            && self.type_name(x.type_index) == other.type_name(y.type_index)
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

fn capture_hierarchy(
    host: &Host,
    builder: &mut Builder<'_>,
    node: ObjectId,
) -> Result<HierarchyNode, ModelError> {
    let object = host.object(node).ok_or(ModelError::InvalidObject(node))?;
    let data = object.as_node().ok_or(ModelError::NotANode(node))?;

    let prefab_asset = if host.is_prefab_instance_root(node) {
        let asset = host.prefab_asset_of(node);
        if asset.is_nil() {
            -1
        } else {
            builder.register_asset(asset) as i32
        }
    } else {
        -1
    };
    let from_prefab = !host.prefab_source_of(node).is_nil() && !host.is_prefab_instance_root(node);

    let mut components = Vec::new();
    for &component in host.components_of(node) {
        components.push(ComponentRecord {
            type_index: builder.type_index(host.type_of(component)),
            ordinal: host.index_of_component_by_type(component).unwrap_or(0),
            enabled: host.is_component_enabled(component),
            hide_flags: host.object(component).map(|o| o.hide_flags).unwrap_or(0),
            clipboard: SerializedClipboard::from_object(host, component, "")?,
        });
    }

    let mut removed_components = Vec::new();
    for &template_component in host.removed_prefab_components(node) {
        removed_components.push(RemovedComponentRecord {
            type_index: builder.type_index(host.type_of(template_component)),
            ordinal: host
                .index_of_component_by_type(template_component)
                .unwrap_or(0),
        });
    }

    let mut children = Vec::new();
    for &child in host.children_of(node) {
        children.push(capture_hierarchy(host, builder, child)?);
    }

    Ok(HierarchyNode {
        name: object.name.clone(),
        active: data.active,
        layer: data.layer,
        tag: data.tag.clone(),
        static_flags: data.static_flags,
        hide_flags: object.hide_flags,
        from_prefab,
        prefab_asset,
        sibling_index: host.sibling_index(node).unwrap_or(0) as u32,
        components,
        removed_components,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstack_model::{ObjectRef, PropertySet, PropertyValue, TypeDescriptor};
    use clipstack_variant::VectorValue;
    use serde_json::json;
    use std::io::Cursor;

    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn register_component(
        host: &mut Host,
        simple: &str,
        defaults: &[(&str, PropertyValue)],
    ) -> TypeId {
        let mut set = PropertySet::new();
        for (name, value) in defaults {
            set.insert(name.to_string(), value.clone());
        }
        host.registry.register(TypeDescriptor {
            simple_name: simple.to_string(),
            qualified_name: format!("game::{simple}"),
            category: TypeCategory::Component,
            defaults: set,
        })
    }

    fn register_managed_type(host: &mut Host, simple: &str) -> TypeId {
        host.registry.register(TypeDescriptor {
            simple_name: simple.to_string(),
            qualified_name: format!("game::{simple}"),
            category: TypeCategory::Managed,
            defaults: PropertySet::new(),
        })
    }

    #[test]
    fn paste_matches_values_by_name() {
        init_logs();
        let mut host = Host::new();
        let src_ty = register_component(
            &mut host,
            "Source",
            &[
                ("x", PropertyValue::Float(0.0)),
                ("y", PropertyValue::Float(0.0)),
                ("z", PropertyValue::Float(0.0)),
            ],
        );
        let dst_ty = register_component(
            &mut host,
            "Dest",
            &[
                ("x", PropertyValue::Float(0.0)),
                ("z", PropertyValue::Float(0.0)),
                ("w", PropertyValue::Float(0.0)),
            ],
        );
        let node = host.create_node("N", ObjectId::nil()).unwrap();
        let src = host.add_component(node, src_ty).unwrap();
        host.set_property(src, "x", PropertyValue::Float(1.0)).unwrap();
        host.set_property(src, "y", PropertyValue::Float(2.0)).unwrap();
        host.set_property(src, "z", PropertyValue::Float(3.0)).unwrap();
        let dst = host.add_component(node, dst_ty).unwrap();

        let clipboard = SerializedClipboard::from_object(&host, src, "src").unwrap();
        assert!(clipboard.can_paste_to_object(&host, dst));
        let pasted = clipboard
            .paste_to_object(&mut host, dst, PasteSettings::default())
            .unwrap();

        // x and z match by name; y has no counterpart, w is untouched.
        assert_eq!(pasted, ["x", "z"]);
        assert_eq!(host.property(dst, "x"), Some(&PropertyValue::Float(1.0)));
        assert_eq!(host.property(dst, "z"), Some(&PropertyValue::Float(3.0)));
        assert_eq!(host.property(dst, "w"), Some(&PropertyValue::Float(0.0)));
    }

    #[test]
    fn scene_references_retarget_relative_to_destination() {
        init_logs();
        let mut host = Host::new();
        let node_type = host.node_type();
        let ty = register_component(
            &mut host,
            "Tracker",
            &[(
                "target",
                PropertyValue::ObjectRef(ObjectRef {
                    target: ObjectId::nil(),
                    expected: node_type,
                }),
            )],
        );
        let left = host.create_node("Left", ObjectId::nil()).unwrap();
        let left_arm = host.create_node("Arm", left).unwrap();
        let right = host.create_node("Right", ObjectId::nil()).unwrap();
        let right_arm = host.create_node("Arm", right).unwrap();

        let src = host.add_component(left, ty).unwrap();
        host.set_property(
            src,
            "target",
            PropertyValue::ObjectRef(ObjectRef {
                target: left_arm,
                expected: node_type,
            }),
        )
        .unwrap();
        let dst = host.add_component(right, ty).unwrap();

        let clipboard = SerializedClipboard::from_object(&host, src, "tracker").unwrap();

        clipboard
            .paste_to_object(&mut host, dst, PasteSettings { smart_paste: true })
            .unwrap();
        let Some(PropertyValue::ObjectRef(smart)) = host.property(dst, "target") else {
            panic!("target must stay an object reference");
        };
        assert_eq!(smart.target, right_arm);

        clipboard
            .paste_to_object(&mut host, dst, PasteSettings { smart_paste: false })
            .unwrap();
        let Some(PropertyValue::ObjectRef(absolute)) = host.property(dst, "target") else {
            panic!("target must stay an object reference");
        };
        assert_eq!(absolute.target, left_arm);
    }

    #[test]
    fn shared_managed_reference_keeps_identity() {
        let mut host = Host::new();
        let payload = register_managed_type(&mut host, "Payload");
        let ty = register_component(
            &mut host,
            "Holder",
            &[
                ("a", PropertyValue::ManagedRef(ManagedId::nil())),
                ("b", PropertyValue::ManagedRef(ManagedId::nil())),
            ],
        );
        let node = host.create_node("N", ObjectId::nil()).unwrap();
        let component = host.add_component(node, ty).unwrap();
        let shared = host.create_managed(payload);
        host.set_managed_field(shared, "hp", ManagedField::Json(json!(5)));
        host.set_property(component, "a", PropertyValue::ManagedRef(shared))
            .unwrap();
        host.set_property(component, "b", PropertyValue::ManagedRef(shared))
            .unwrap();

        let clipboard = SerializedClipboard::from_object(&host, component, "holder").unwrap();
        assert_eq!(clipboard.managed.len(), 1);

        let mut dest = Host::new();
        register_managed_type(&mut dest, "Payload");
        let dest_ty = register_component(
            &mut dest,
            "Holder",
            &[
                ("a", PropertyValue::ManagedRef(ManagedId::nil())),
                ("b", PropertyValue::ManagedRef(ManagedId::nil())),
            ],
        );
        let dest_node = dest.create_node("M", ObjectId::nil()).unwrap();
        let dest_component = dest.add_component(dest_node, dest_ty).unwrap();
        clipboard
            .paste_to_object(&mut dest, dest_component, PasteSettings::default())
            .unwrap();

        let Some(PropertyValue::ManagedRef(a)) = dest.property(dest_component, "a") else {
            panic!("a must be a managed reference");
        };
        let Some(PropertyValue::ManagedRef(b)) = dest.property(dest_component, "b") else {
            panic!("b must be a managed reference");
        };
        assert!(!a.is_nil());
        // One capture entry, one reconstruction: both slots share it.
        assert_eq!(a, b);
        assert_eq!(
            dest.managed(*a).and_then(|m| m.fields.get("hp")),
            Some(&ManagedField::Json(json!(5)))
        );
    }

    #[test]
    fn cyclic_managed_chains_capture_and_paste() {
        let mut host = Host::new();
        let payload = register_managed_type(&mut host, "Link");
        let ty = register_component(
            &mut host,
            "Chain",
            &[("head", PropertyValue::ManagedRef(ManagedId::nil()))],
        );
        let node = host.create_node("N", ObjectId::nil()).unwrap();
        let component = host.add_component(node, ty).unwrap();
        let a = host.create_managed(payload);
        let b = host.create_managed(payload);
        host.set_managed_field(a, "next", ManagedField::Managed(b));
        host.set_managed_field(b, "next", ManagedField::Managed(a));
        host.set_property(component, "head", PropertyValue::ManagedRef(a))
            .unwrap();

        let clipboard = SerializedClipboard::from_object(&host, component, "chain").unwrap();
        assert_eq!(clipboard.managed.len(), 2);

        let mut dest = Host::new();
        register_managed_type(&mut dest, "Link");
        let dest_ty = register_component(
            &mut dest,
            "Chain",
            &[("head", PropertyValue::ManagedRef(ManagedId::nil()))],
        );
        let dest_node = dest.create_node("M", ObjectId::nil()).unwrap();
        let dest_component = dest.add_component(dest_node, dest_ty).unwrap();
        clipboard
            .paste_to_object(&mut dest, dest_component, PasteSettings::default())
            .unwrap();

        let Some(PropertyValue::ManagedRef(head)) = dest.property(dest_component, "head") else {
            panic!("head must be a managed reference");
        };
        let Some(&ManagedField::Managed(second)) =
            dest.managed(*head).and_then(|m| m.fields.get("next"))
        else {
            panic!("head must link onward");
        };
        assert_eq!(
            dest.managed(second).and_then(|m| m.fields.get("next")),
            Some(&ManagedField::Managed(*head))
        );
    }

    #[test]
    fn paste_as_new_component_recreates_the_source() {
        let mut host = Host::new();
        let ty = register_component(&mut host, "Mover", &[("speed", PropertyValue::Float(0.0))]);
        let a = host.create_node("A", ObjectId::nil()).unwrap();
        let b = host.create_node("B", ObjectId::nil()).unwrap();
        let src = host.add_component(a, ty).unwrap();
        host.set_property(src, "speed", PropertyValue::Float(4.5))
            .unwrap();

        let clipboard = SerializedClipboard::from_object(&host, src, "mover").unwrap();
        assert!(clipboard.can_paste_as_new_component(&host, b));
        let created = clipboard
            .paste_as_new_component(&mut host, b, PasteSettings::default())
            .unwrap();

        assert_eq!(host.type_of(created), ty);
        assert_eq!(
            host.property(created, "speed"),
            Some(&PropertyValue::Float(4.5))
        );
    }

    #[test]
    fn node_capture_does_not_offer_component_paste() {
        let mut host = Host::new();
        let a = host.create_node("A", ObjectId::nil()).unwrap();
        let b = host.create_node("B", ObjectId::nil()).unwrap();
        let clipboard = SerializedClipboard::from_object(&host, a, "node").unwrap();
        assert!(!clipboard.can_paste_as_new_component(&host, b));
        assert!(matches!(
            clipboard.paste_as_new_component(&mut host, b, PasteSettings::default()),
            Err(PasteError::NotAComponent)
        ));
    }

    #[test]
    fn hierarchy_paste_rebuilds_values_and_structure() {
        let mut host = Host::new();
        let ty = register_component(&mut host, "Emitter", &[("rate", PropertyValue::Float(0.0))]);
        let root = host.create_node("Rig", ObjectId::nil()).unwrap();
        let child = host.create_node("Nozzle", root).unwrap();
        let component = host.add_component(child, ty).unwrap();
        host.set_property(component, "rate", PropertyValue::Float(7.5))
            .unwrap();

        let clipboard = SerializedClipboard::from_hierarchy(&host, root, "rig").unwrap();
        let parent = host.create_node("Elsewhere", ObjectId::nil()).unwrap();
        let pasted = clipboard
            .paste_hierarchy(&mut host, parent, PasteSettings::default())
            .unwrap();

        assert_eq!(host.parent_of(pasted), parent);
        assert_eq!(host.name_of(pasted), "Rig");
        let pasted_child = host.child_named(pasted, "Nozzle", 0).unwrap();
        let &[pasted_component] = host.components_of(pasted_child) else {
            panic!("pasted child must carry the captured component");
        };
        assert_eq!(
            host.property(pasted_component, "rate"),
            Some(&PropertyValue::Float(7.5))
        );
    }

    #[test]
    fn hierarchy_paste_replays_prefab_shape() {
        let mut host = Host::new();
        let turret = register_component(&mut host, "Turret", &[("damage", PropertyValue::Float(0.0))]);
        let (asset, template_root) = host.create_prefab_asset("Tower", "res://tower.pfb").unwrap();
        let template_component = host.add_component(template_root, turret).unwrap();
        host.create_node("Barrel", template_root).unwrap();

        let scene = host.create_node("SceneA", ObjectId::nil()).unwrap();
        let instance = host.instantiate_prefab(asset, scene).unwrap();
        host.remove_prefab_component(instance, template_component)
            .unwrap();
        host.create_node("Extra", instance).unwrap();

        let clipboard = SerializedClipboard::from_hierarchy(&host, instance, "tower").unwrap();
        let dest = host.create_node("SceneB", ObjectId::nil()).unwrap();
        let pasted = clipboard
            .paste_hierarchy(&mut host, dest, PasteSettings::default())
            .unwrap();

        assert_eq!(host.parent_of(pasted), dest);
        assert_eq!(host.prefab_source_of(pasted), template_root);
        // The recorded removal is replayed on the fresh instance.
        assert!(host.components_of(pasted).is_empty());
        // The prefab-provided child is matched, not duplicated; the extra
        // child is created alongside it.
        assert_eq!(host.children_of(pasted).len(), 2);
        assert!(host.child_named(pasted, "Barrel", 0).is_some());
        assert!(host.child_named(pasted, "Extra", 0).is_some());
    }

    #[test]
    fn differing_values_lists_changed_names() {
        let mut host = Host::new();
        let ty = register_component(
            &mut host,
            "Pair",
            &[
                ("x", PropertyValue::Float(0.0)),
                ("y", PropertyValue::Float(0.0)),
            ],
        );
        let node = host.create_node("N", ObjectId::nil()).unwrap();
        let first = host.add_component(node, ty).unwrap();
        let second = host.add_component(node, ty).unwrap();
        host.set_property(first, "x", PropertyValue::Float(1.0)).unwrap();
        host.set_property(first, "y", PropertyValue::Float(2.0)).unwrap();
        host.set_property(second, "x", PropertyValue::Float(1.0)).unwrap();
        host.set_property(second, "y", PropertyValue::Float(9.0)).unwrap();

        let clipboard = SerializedClipboard::from_object(&host, first, "pair").unwrap();
        assert_eq!(
            clipboard.differing_values(&host, second),
            vec!["y".to_string()]
        );
    }

    // -------------------- Wire format --------------------

    fn lcg(state: &mut u64) -> u64 {
        *state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        *state >> 33
    }

    fn random_node(state: &mut u64, depth: u32) -> Node {
        let name = format!("n{}", lcg(state) % 100);
        let pick = if depth == 0 {
            lcg(state) % 7
        } else {
            lcg(state) % 9
        };
        match pick {
            0 => Node::Null { name },
            1 => Node::Bool {
                name,
                value: lcg(state) % 2 == 0,
            },
            2 => Node::Long {
                name,
                value: lcg(state) as i64 - (1 << 30),
            },
            3 => Node::Double {
                name,
                value: (lcg(state) % 10_000) as f64 / 8.0,
            },
            4 => Node::String {
                name,
                value: format!("s{}", lcg(state) % 1000),
            },
            5 => Node::Vector {
                name,
                value: VectorValue::new(
                    (lcg(state) % 100) as f32,
                    (lcg(state) % 100) as f32,
                    (lcg(state) % 100) as f32,
                    0.0,
                    0.0,
                    0.0,
                ),
            },
            6 => Node::SceneRef {
                name,
                index: (lcg(state) % 2) as u32,
            },
            7 => {
                let len = lcg(state) % 4;
                Node::Array {
                    name,
                    element_type: "Entry".to_string(),
                    elements: (0..len).map(|_| random_node(state, depth - 1)).collect(),
                }
            }
            _ => {
                let len = 1 + lcg(state) % 3;
                Node::Generic {
                    name,
                    type_index: (lcg(state) % 2) as u32,
                    children: (0..len).map(|_| random_node(state, depth - 1)).collect(),
                }
            }
        }
    }

    #[test]
    fn random_graphs_roundtrip_through_the_wire_format() {
        let mut state = 0x9E37_79B9_7F4A_7C15u64;
        for _ in 0..20 {
            let clipboard = SerializedClipboard {
                label: "roundtrip".to_string(),
                types: vec![TypeEntry::new("A", "m::A"), TypeEntry::new("B", "n::B")],
                scene_objects: vec![SceneObjectEntry {
                    type_index: 0,
                    name: "Thing".to_string(),
                    path: vec!["Root".to_string(), "Thing".to_string()],
                    relative_path: vec![
                        crate::node::RelationStep::Up,
                        crate::node::RelationStep::Down {
                            name: "Thing".to_string(),
                            occurrence: 1,
                        },
                    ],
                    component_ordinal: -1,
                }],
                assets: vec![AssetEntry {
                    type_index: 1,
                    name: "Tex".to_string(),
                    path: "res://tex.png".to_string(),
                }],
                managed: vec![ManagedEntry {
                    type_index: 1,
                    json: "{\"hp\":5}".to_string(),
                    managed_refs: vec![("next".to_string(), 0)],
                    scene_refs: vec![("owner".to_string(), -1)],
                    asset_refs: vec![("icon".to_string(), 0)],
                }],
                values: (0..4).map(|_| random_node(&mut state, 5)).collect(),
            };
            let mut buf = Vec::new();
            clipboard.serialize(&mut buf).unwrap();
            let back = SerializedClipboard::deserialize(&mut Cursor::new(buf)).unwrap();
            assert_eq!(back, clipboard);
        }
    }
}
