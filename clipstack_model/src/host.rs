//! The host object model: one arena of engine objects (scene nodes,
//! components, assets), one arena of managed objects, the type registry, and
//! the undo journal. The clipboard engine talks exclusively to this surface.

use clipstack_ids::{ManagedId, ObjectId, TypeId};
use log::debug;

use crate::arena::SlotArena;
use crate::error::ModelError;
use crate::managed::{ManagedField, ManagedObject};
use crate::object::{AssetData, ComponentData, EngineObject, NodeData, ObjectKind};
use crate::property::{PropertySet, PropertyValue};
use crate::registry::{TypeCategory, TypeDescriptor, TypeRegistry};
use crate::undo::{UndoJournal, UndoStep};

pub struct Host {
    objects: SlotArena<EngineObject>,
    managed: SlotArena<ManagedObject>,
    roots: Vec<ObjectId>,
    assets: Vec<ObjectId>,
    pub registry: TypeRegistry,
    pub undo: UndoJournal,
    node_type: TypeId,
    prefab_type: TypeId,
}

impl Host {
    pub fn new() -> Self {
        let mut registry = TypeRegistry::new();
        let node_type = registry.register(TypeDescriptor {
            simple_name: "Node".to_string(),
            qualified_name: "engine::Node".to_string(),
            category: TypeCategory::Node,
            defaults: PropertySet::new(),
        });
        let prefab_type = registry.register(TypeDescriptor {
            simple_name: "Prefab".to_string(),
            qualified_name: "engine::Prefab".to_string(),
            category: TypeCategory::Asset,
            defaults: PropertySet::new(),
        });
        Self {
            objects: SlotArena::new(),
            managed: SlotArena::new(),
            roots: Vec::new(),
            assets: Vec::new(),
            registry,
            undo: UndoJournal::new(),
            node_type,
            prefab_type,
        }
    }

    #[inline]
    pub fn node_type(&self) -> TypeId {
        self.node_type
    }

    // -------------------- Object access --------------------

    #[inline]
    pub fn object(&self, id: ObjectId) -> Option<&EngineObject> {
        self.objects.get(id.index(), id.generation())
    }

    #[inline]
    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut EngineObject> {
        self.objects.get_mut(id.index(), id.generation())
    }

    pub fn name_of(&self, id: ObjectId) -> &str {
        self.object(id).map(|o| o.name.as_str()).unwrap_or("")
    }

    pub fn type_of(&self, id: ObjectId) -> TypeId {
        self.object(id).map(|o| o.type_id).unwrap_or_default()
    }

    pub fn is_editable(&self, id: ObjectId) -> bool {
        self.object(id).is_some_and(|o| o.is_editable())
    }

    /// True for assets, nodes inside a prefab template, and components owned
    /// by such nodes.
    pub fn is_asset(&self, id: ObjectId) -> bool {
        let Some(object) = self.object(id) else {
            return false;
        };
        match &object.kind {
            ObjectKind::Asset(_) => true,
            ObjectKind::Node(n) => !n.asset.is_nil(),
            ObjectKind::Component(c) => self
                .object(c.owner)
                .and_then(|o| o.as_node())
                .is_some_and(|n| !n.asset.is_nil()),
        }
    }

    /// The node an object hangs off: a component's owner, a node itself.
    pub fn owner_node_of(&self, id: ObjectId) -> ObjectId {
        match self.object(id).map(|o| &o.kind) {
            Some(ObjectKind::Component(c)) => c.owner,
            Some(ObjectKind::Node(_)) => id,
            _ => ObjectId::nil(),
        }
    }

    fn id_of(index: u32, generation: u32) -> ObjectId {
        ObjectId::from_parts(index, generation)
    }

    // -------------------- Scene nodes --------------------

    pub fn create_node(
        &mut self,
        name: impl Into<String>,
        parent: ObjectId,
    ) -> Result<ObjectId, ModelError> {
        let mut data = NodeData::new(parent);
        if !parent.is_nil() {
            let parent_node = self
                .object(parent)
                .ok_or(ModelError::InvalidObject(parent))?
                .as_node()
                .ok_or(ModelError::NotANode(parent))?;
            data.asset = parent_node.asset;
        }
        let object = EngineObject {
            name: name.into(),
            type_id: self.node_type,
            hide_flags: 0,
            kind: ObjectKind::Node(data),
            properties: PropertySet::new(),
        };
        let (index, generation) = self.objects.insert(object);
        let id = Self::id_of(index, generation);
        if parent.is_nil() {
            self.roots.push(id);
        } else if let Some(node) = self.object_mut(parent).and_then(|o| o.as_node_mut()) {
            node.children.push(id);
        }
        self.undo.record(UndoStep::CreatedObject(id));
        Ok(id)
    }

    pub fn roots(&self) -> &[ObjectId] {
        &self.roots
    }

    pub fn parent_of(&self, node: ObjectId) -> ObjectId {
        self.object(node)
            .and_then(|o| o.as_node())
            .map(|n| n.parent)
            .unwrap_or_default()
    }

    pub fn children_of(&self, node: ObjectId) -> &[ObjectId] {
        self.object(node)
            .and_then(|o| o.as_node())
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    fn sibling_list(&self, node: ObjectId) -> &[ObjectId] {
        let parent = self.parent_of(node);
        if parent.is_nil() {
            &self.roots
        } else {
            self.children_of(parent)
        }
    }

    pub fn sibling_index(&self, node: ObjectId) -> Option<usize> {
        self.sibling_list(node).iter().position(|&c| c == node)
    }

    pub fn set_sibling_index(&mut self, node: ObjectId, index: usize) {
        let parent = self.parent_of(node);
        let list: &mut Vec<ObjectId>;
        let mut small_storage;
        if parent.is_nil() {
            list = &mut self.roots;
            if let Some(current) = list.iter().position(|&c| c == node) {
                let id = list.remove(current);
                let index = index.min(list.len());
                list.insert(index, id);
            }
        } else if let Some(n) = self.object_mut(parent).and_then(|o| o.as_node_mut()) {
            small_storage = std::mem::take(&mut n.children);
            if let Some(current) = small_storage.iter().position(|&c| c == node) {
                let id = small_storage.remove(current);
                let index = index.min(small_storage.len());
                small_storage.insert(index, id);
            }
            if let Some(n) = self.object_mut(parent).and_then(|o| o.as_node_mut()) {
                n.children = small_storage;
            }
        }
    }

    /// Among this node's same-named siblings, which one is it (0-based)?
    pub fn name_occurrence(&self, node: ObjectId) -> u32 {
        let name = self.name_of(node).to_string();
        let mut occurrence = 0;
        for &sibling in self.sibling_list(node) {
            if sibling == node {
                return occurrence;
            }
            if self.name_of(sibling) == name {
                occurrence += 1;
            }
        }
        occurrence
    }

    /// The `occurrence`-th child named `name` (0-based among same-named).
    pub fn child_named(&self, parent: ObjectId, name: &str, occurrence: u32) -> Option<ObjectId> {
        let list = if parent.is_nil() {
            &self.roots[..]
        } else {
            self.children_of(parent)
        };
        let mut seen = 0;
        for &child in list {
            if self.name_of(child) == name {
                if seen == occurrence {
                    return Some(child);
                }
                seen += 1;
            }
        }
        // Sibling order may have changed since the path was recorded; fall
        // back to the last same-named child rather than losing the reference.
        let mut last = None;
        for &child in list {
            if self.name_of(child) == name {
                last = Some(child);
            }
        }
        last
    }

    /// Absolute hierarchy path (root-relative name sequence). Components
    /// report their owner's path.
    pub fn node_path(&self, id: ObjectId) -> Vec<String> {
        let mut current = self.owner_node_of(id);
        let mut path = Vec::new();
        while !current.is_nil() {
            path.push(self.name_of(current).to_string());
            current = self.parent_of(current);
        }
        path.reverse();
        path
    }

    pub fn find_node_by_path(&self, path: &[String]) -> Option<ObjectId> {
        let first = path.first()?;
        let mut current = *self
            .roots
            .iter()
            .find(|&&r| self.name_of(r) == first.as_str())?;
        for segment in &path[1..] {
            current = *self
                .children_of(current)
                .iter()
                .find(|&&c| self.name_of(c) == segment.as_str())?;
        }
        Some(current)
    }

    /// Scene-wide search by name; used as the last resort when a recorded
    /// path no longer matches anything.
    pub fn find_node_named(&self, name: &str) -> Option<ObjectId> {
        self.objects.iter().find_map(|(index, generation, object)| {
            match (&object.kind, object.name == name) {
                (ObjectKind::Node(n), true) if n.asset.is_nil() => {
                    Some(Self::id_of(index, generation))
                }
                _ => None,
            }
        })
    }

    // -------------------- Components --------------------

    pub fn add_component(
        &mut self,
        node: ObjectId,
        type_id: TypeId,
    ) -> Result<ObjectId, ModelError> {
        self.object(node)
            .ok_or(ModelError::InvalidObject(node))?
            .as_node()
            .ok_or(ModelError::NotANode(node))?;
        let descriptor = self
            .registry
            .descriptor(type_id)
            .ok_or_else(|| ModelError::UnknownType(format!("{type_id}")))?;
        if descriptor.category != TypeCategory::Component {
            return Err(ModelError::NotAComponentType(
                descriptor.simple_name.clone(),
            ));
        }
        let object = EngineObject {
            name: descriptor.simple_name.clone(),
            type_id,
            hide_flags: 0,
            kind: ObjectKind::Component(ComponentData {
                owner: node,
                enabled: true,
            }),
            properties: descriptor.defaults.clone(),
        };
        let (index, generation) = self.objects.insert(object);
        let id = Self::id_of(index, generation);
        if let Some(n) = self.object_mut(node).and_then(|o| o.as_node_mut()) {
            n.components.push(id);
        }
        self.undo.record(UndoStep::AddedComponent {
            node,
            component: id,
        });
        Ok(id)
    }

    pub fn destroy_component(&mut self, component: ObjectId) -> Result<(), ModelError> {
        let owner = self
            .object(component)
            .ok_or(ModelError::InvalidObject(component))?
            .as_component()
            .ok_or(ModelError::NotAComponent(component))?
            .owner;
        if let Some(n) = self.object_mut(owner).and_then(|o| o.as_node_mut()) {
            n.components.retain(|c| *c != component);
        }
        let snapshot = self
            .objects
            .remove(component.index(), component.generation())
            .ok_or(ModelError::InvalidObject(component))?;
        self.undo.record(UndoStep::DestroyedComponent {
            node: owner,
            snapshot: Box::new(snapshot),
        });
        Ok(())
    }

    pub fn components_of(&self, node: ObjectId) -> &[ObjectId] {
        self.object(node)
            .and_then(|o| o.as_node())
            .map(|n| n.components.as_slice())
            .unwrap_or(&[])
    }

    pub fn set_component_enabled(&mut self, component: ObjectId, enabled: bool) {
        if let Some(c) = self.object_mut(component).and_then(|o| o.as_component_mut()) {
            c.enabled = enabled;
        }
    }

    pub fn is_component_enabled(&self, component: ObjectId) -> bool {
        self.object(component)
            .and_then(|o| o.as_component())
            .is_some_and(|c| c.enabled)
    }

    /// Ordinal of a component among same-type components on its owner.
    /// Component references survive serialization through this index, since a
    /// node can carry several components of one type.
    pub fn index_of_component_by_type(&self, component: ObjectId) -> Option<u32> {
        let owner = self.object(component)?.as_component()?.owner;
        let type_id = self.type_of(component);
        let mut ordinal = 0;
        for &c in self.components_of(owner) {
            if c == component {
                return Some(ordinal);
            }
            if self.type_of(c) == type_id {
                ordinal += 1;
            }
        }
        None
    }

    /// The same-type component whose ordinal is closest to `ordinal`
    /// (ties resolve to the lower index). None when the node has no
    /// component of that type.
    pub fn find_component_of_type_closest_to_index(
        &self,
        node: ObjectId,
        type_id: TypeId,
        ordinal: u32,
    ) -> Option<ObjectId> {
        let mut best: Option<(u32, ObjectId)> = None;
        let mut current = 0u32;
        for &c in self.components_of(node) {
            if self.type_of(c) != type_id {
                continue;
            }
            let distance = current.abs_diff(ordinal);
            if best.is_none_or(|(d, _)| distance < d) {
                best = Some((distance, c));
            }
            current += 1;
        }
        best.map(|(_, c)| c)
    }

    // -------------------- Assets & prefabs --------------------

    pub fn create_asset(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
        type_id: TypeId,
    ) -> Result<ObjectId, ModelError> {
        let descriptor = self
            .registry
            .descriptor(type_id)
            .ok_or_else(|| ModelError::UnknownType(format!("{type_id}")))?;
        let object = EngineObject {
            name: name.into(),
            type_id,
            hide_flags: 0,
            kind: ObjectKind::Asset(AssetData {
                path: path.into(),
                template_root: ObjectId::nil(),
            }),
            properties: descriptor.defaults.clone(),
        };
        let (index, generation) = self.objects.insert(object);
        let id = Self::id_of(index, generation);
        self.assets.push(id);
        Ok(id)
    }

    /// Create a prefab asset plus its (initially bare) template root node.
    pub fn create_prefab_asset(
        &mut self,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Result<(ObjectId, ObjectId), ModelError> {
        let name = name.into();
        let asset = EngineObject {
            name: name.clone(),
            type_id: self.prefab_type,
            hide_flags: 0,
            kind: ObjectKind::Asset(AssetData {
                path: path.into(),
                template_root: ObjectId::nil(),
            }),
            properties: PropertySet::new(),
        };
        let (index, generation) = self.objects.insert(asset);
        let asset_id = Self::id_of(index, generation);
        self.assets.push(asset_id);

        let mut data = NodeData::new(ObjectId::nil());
        data.asset = asset_id;
        let root = EngineObject {
            name,
            type_id: self.node_type,
            hide_flags: 0,
            kind: ObjectKind::Node(data),
            properties: PropertySet::new(),
        };
        let (index, generation) = self.objects.insert(root);
        let root_id = Self::id_of(index, generation);
        if let Some(ObjectKind::Asset(a)) = self.object_mut(asset_id).map(|o| &mut o.kind) {
            a.template_root = root_id;
        }
        Ok((asset_id, root_id))
    }

    pub fn assets(&self) -> &[ObjectId] {
        &self.assets
    }

    pub fn asset_path(&self, asset: ObjectId) -> &str {
        self.object(asset)
            .and_then(|o| o.as_asset())
            .map(|a| a.path.as_str())
            .unwrap_or("")
    }

    pub fn find_asset_by_path(&self, path: &str) -> Option<ObjectId> {
        self.assets
            .iter()
            .copied()
            .find(|&a| self.asset_path(a) == path)
    }

    pub fn find_asset_named(&self, name: &str) -> Option<ObjectId> {
        self.assets
            .iter()
            .copied()
            .find(|&a| self.name_of(a) == name)
    }

    pub fn template_root_of(&self, asset: ObjectId) -> ObjectId {
        self.object(asset)
            .and_then(|o| o.as_asset())
            .map(|a| a.template_root)
            .unwrap_or_default()
    }

    /// Template node this instance node was instantiated from (nil if none).
    pub fn prefab_source_of(&self, node: ObjectId) -> ObjectId {
        self.object(node)
            .and_then(|o| o.as_node())
            .map(|n| n.prefab_source)
            .unwrap_or_default()
    }

    /// The prefab asset a node instance ultimately came from, or nil.
    pub fn prefab_asset_of(&self, node: ObjectId) -> ObjectId {
        let template = self.prefab_source_of(node);
        self.object(template)
            .and_then(|o| o.as_node())
            .map(|n| n.asset)
            .unwrap_or_default()
    }

    pub fn is_prefab_instance_root(&self, node: ObjectId) -> bool {
        let template = self.prefab_source_of(node);
        !template.is_nil() && self.parent_of(template).is_nil()
    }

    pub fn removed_prefab_components(&self, node: ObjectId) -> &[ObjectId] {
        self.object(node)
            .and_then(|o| o.as_node())
            .map(|n| n.removed_components.as_slice())
            .unwrap_or(&[])
    }

    /// Instantiate a prefab's template subtree under `parent`, linking every
    /// created node back to its template counterpart.
    pub fn instantiate_prefab(
        &mut self,
        asset: ObjectId,
        parent: ObjectId,
    ) -> Result<ObjectId, ModelError> {
        let template_root = self.template_root_of(asset);
        if template_root.is_nil() {
            return Err(ModelError::NotAPrefab(asset));
        }
        let root = self.clone_template(template_root, parent)?;
        debug!(
            "instantiated prefab `{}` as `{}`",
            self.asset_path(asset),
            self.name_of(root)
        );
        Ok(root)
    }

    fn clone_template(
        &mut self,
        template: ObjectId,
        parent: ObjectId,
    ) -> Result<ObjectId, ModelError> {
        let source = self
            .object(template)
            .ok_or(ModelError::InvalidObject(template))?
            .clone();
        let source_node = source.as_node().ok_or(ModelError::NotANode(template))?;
        let (active, layer, tag, static_flags) = (
            source_node.active,
            source_node.layer,
            source_node.tag.clone(),
            source_node.static_flags,
        );
        let components: Vec<ObjectId> = source_node.components.to_vec();
        let children: Vec<ObjectId> = source_node.children.to_vec();

        let instance = self.create_node(source.name.clone(), parent)?;
        if let Some(n) = self.object_mut(instance).and_then(|o| o.as_node_mut()) {
            n.active = active;
            n.layer = layer;
            n.tag = tag;
            n.static_flags = static_flags;
            n.prefab_source = template;
        }
        if let Some(o) = self.object_mut(instance) {
            o.properties = source.properties.clone();
        }

        for template_component in components {
            let Some(source_component) = self.object(template_component).cloned() else {
                continue;
            };
            let Some(data) = source_component.as_component() else {
                continue;
            };
            let enabled = data.enabled;
            let copy = EngineObject {
                name: source_component.name.clone(),
                type_id: source_component.type_id,
                hide_flags: source_component.hide_flags,
                kind: ObjectKind::Component(ComponentData {
                    owner: instance,
                    enabled,
                }),
                properties: source_component.properties.clone(),
            };
            let (index, generation) = self.objects.insert(copy);
            let id = Self::id_of(index, generation);
            if let Some(n) = self.object_mut(instance).and_then(|o| o.as_node_mut()) {
                n.components.push(id);
            }
            self.undo.record(UndoStep::AddedComponent {
                node: instance,
                component: id,
            });
        }

        for template_child in children {
            self.clone_template(template_child, instance)?;
        }
        Ok(instance)
    }

    /// Destroy the instance component corresponding to `template_component`
    /// and record the removal against the instance node, the way a prefab
    /// instance tracks components deleted relative to its source.
    pub fn remove_prefab_component(
        &mut self,
        node: ObjectId,
        template_component: ObjectId,
    ) -> Result<(), ModelError> {
        let type_id = self.type_of(template_component);
        let ordinal = self
            .index_of_component_by_type(template_component)
            .unwrap_or(0);
        let instance_component = self
            .find_component_of_type_closest_to_index(node, type_id, ordinal)
            .ok_or(ModelError::InvalidObject(template_component))?;
        self.destroy_component(instance_component)?;
        if let Some(n) = self.object_mut(node).and_then(|o| o.as_node_mut()) {
            n.removed_components.push(template_component);
        }
        Ok(())
    }

    // -------------------- Properties --------------------

    pub fn properties(&self, object: ObjectId) -> Option<&PropertySet> {
        self.object(object).map(|o| &o.properties)
    }

    pub fn property(&self, object: ObjectId, name: &str) -> Option<&PropertyValue> {
        self.object(object)?.properties.get(name)
    }

    /// Install a property without journaling; fixture/setup path.
    pub fn insert_property(
        &mut self,
        object: ObjectId,
        name: impl Into<String>,
        value: PropertyValue,
    ) -> Result<(), ModelError> {
        let target = self
            .object_mut(object)
            .ok_or(ModelError::InvalidObject(object))?;
        target.properties.insert(name.into(), value);
        Ok(())
    }

    /// Commit a new value to an existing property, journaling the previous
    /// value. Each call commits independently.
    pub fn set_property(
        &mut self,
        object: ObjectId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), ModelError> {
        if !self.is_editable(object) {
            return Err(ModelError::NotEditable(object));
        }
        let target = self
            .object_mut(object)
            .ok_or(ModelError::InvalidObject(object))?;
        let slot = target
            .properties
            .get_mut(name)
            .ok_or_else(|| ModelError::MissingProperty {
                object,
                name: name.to_string(),
            })?;
        let previous = std::mem::replace(slot, value);
        self.undo.record(UndoStep::PropertyChanged {
            object,
            name: name.to_string(),
            previous,
        });
        Ok(())
    }

    // -------------------- Managed objects --------------------

    pub fn create_managed(&mut self, type_id: TypeId) -> ManagedId {
        let (index, generation) = self.managed.insert(ManagedObject::new(type_id));
        ManagedId::from_parts(index, generation)
    }

    pub fn managed(&self, id: ManagedId) -> Option<&ManagedObject> {
        self.managed.get(id.index(), id.generation())
    }

    pub fn managed_mut(&mut self, id: ManagedId) -> Option<&mut ManagedObject> {
        self.managed.get_mut(id.index(), id.generation())
    }

    pub fn set_managed_field(
        &mut self,
        id: ManagedId,
        name: impl Into<String>,
        field: ManagedField,
    ) {
        if let Some(object) = self.managed_mut(id) {
            object.fields.insert(name.into(), field);
        }
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyValue;

    fn component_type(host: &mut Host, simple: &str) -> TypeId {
        let mut defaults = PropertySet::new();
        defaults.insert("value".to_string(), PropertyValue::Float(0.0));
        host.registry.register(TypeDescriptor {
            simple_name: simple.to_string(),
            qualified_name: format!("game::{simple}"),
            category: TypeCategory::Component,
            defaults,
        })
    }

    #[test]
    fn paths_roundtrip_through_lookup() {
        let mut host = Host::new();
        let root = host.create_node("Root", ObjectId::nil()).unwrap();
        let child = host.create_node("Child", root).unwrap();
        let grandchild = host.create_node("Leaf", child).unwrap();

        let path = host.node_path(grandchild);
        assert_eq!(path, vec!["Root", "Child", "Leaf"]);
        assert_eq!(host.find_node_by_path(&path), Some(grandchild));
    }

    #[test]
    fn component_ordinals_among_same_type() {
        let mut host = Host::new();
        let ty = component_type(&mut host, "Mover");
        let other = component_type(&mut host, "Health");
        let node = host.create_node("N", ObjectId::nil()).unwrap();
        let a = host.add_component(node, ty).unwrap();
        let _b = host.add_component(node, other).unwrap();
        let c = host.add_component(node, ty).unwrap();

        assert_eq!(host.index_of_component_by_type(a), Some(0));
        assert_eq!(host.index_of_component_by_type(c), Some(1));
        assert_eq!(
            host.find_component_of_type_closest_to_index(node, ty, 1),
            Some(c)
        );
        // Ordinal beyond what exists picks the closest.
        assert_eq!(
            host.find_component_of_type_closest_to_index(node, ty, 7),
            Some(c)
        );
    }

    #[test]
    fn prefab_instantiation_links_back_to_template() {
        let mut host = Host::new();
        let ty = component_type(&mut host, "Turret");
        let (asset, template_root) = host.create_prefab_asset("Tower", "res://tower.pfb").unwrap();
        let template_child = host.create_node("Barrel", template_root).unwrap();
        host.add_component(template_child, ty).unwrap();

        let instance = host.instantiate_prefab(asset, ObjectId::nil()).unwrap();
        assert_eq!(host.prefab_source_of(instance), template_root);
        assert!(host.is_prefab_instance_root(instance));
        assert_eq!(host.prefab_asset_of(instance), asset);

        let child = host.child_named(instance, "Barrel", 0).unwrap();
        assert_eq!(host.components_of(child).len(), 1);
        assert!(!host.is_prefab_instance_root(child));
    }

    #[test]
    fn removing_prefab_component_records_it() {
        let mut host = Host::new();
        let ty = component_type(&mut host, "Turret");
        let (asset, template_root) = host.create_prefab_asset("Tower", "res://tower.pfb").unwrap();
        let template_component = host.add_component(template_root, ty).unwrap();

        let instance = host.instantiate_prefab(asset, ObjectId::nil()).unwrap();
        assert_eq!(host.components_of(instance).len(), 1);
        host.remove_prefab_component(instance, template_component)
            .unwrap();
        assert!(host.components_of(instance).is_empty());
        assert_eq!(
            host.removed_prefab_components(instance),
            &[template_component]
        );
    }

    #[test]
    fn destroying_a_component_detaches_it_from_its_node() {
        let mut host = Host::new();
        let ty = component_type(&mut host, "Mover");
        let node = host.create_node("N", ObjectId::nil()).unwrap();
        let doomed = host.add_component(node, ty).unwrap();
        let kept = host.add_component(node, ty).unwrap();

        host.destroy_component(doomed).unwrap();
        assert_eq!(host.components_of(node), &[kept]);
        assert!(host.object(doomed).is_none());
        assert!(matches!(
            host.undo.steps().last(),
            Some(UndoStep::DestroyedComponent { node: owner, .. }) if *owner == node
        ));
    }

    #[test]
    fn set_property_journals_previous_value() {
        let mut host = Host::new();
        let ty = component_type(&mut host, "Mover");
        let node = host.create_node("N", ObjectId::nil()).unwrap();
        let component = host.add_component(node, ty).unwrap();
        let journal_before = host.undo.len();

        host.set_property(component, "value", PropertyValue::Float(3.5))
            .unwrap();
        assert_eq!(
            host.property(component, "value"),
            Some(&PropertyValue::Float(3.5))
        );
        assert_eq!(host.undo.len(), journal_before + 1);

        let err = host.set_property(component, "missing", PropertyValue::Float(1.0));
        assert!(err.is_err());
    }

    #[test]
    fn name_occurrence_counts_same_named_siblings() {
        let mut host = Host::new();
        let root = host.create_node("Root", ObjectId::nil()).unwrap();
        let _a = host.create_node("Twin", root).unwrap();
        let b = host.create_node("Twin", root).unwrap();
        assert_eq!(host.name_occurrence(b), 1);
        assert_eq!(host.child_named(root, "Twin", 1), Some(b));
    }
}
