//! Turns graph nodes back into live values against a destination host.
//!
//! Reference resolution is best-effort: a reference that cannot be located
//! resolves to `Null` with a warning, never an error, so one lost reference
//! does not abort a paste. Managed objects are reconstructed at most once per
//! session; the memo arena is written before nested fields are resolved so
//! reference cycles terminate.

use clipstack_ids::ObjectId;
use clipstack_model::{Host, TypeCategory};
use clipstack_variant::{ClipValue, GenericValue};
use log::warn;
use rustc_hash::FxHashMap;

use crate::clipboard::{PasteSettings, SerializedClipboard};
use crate::node::{AssetEntry, Node, RelationStep, SceneObjectEntry};

enum MemoState {
    /// Reconstruction of this entry is on the stack right now. Observing this
    /// state would mean a field of the entry is resolved before the entry's
    /// own id is recorded, which the construction order rules out; it is kept
    /// as a guard rather than an expected path.
    InProgress,
    Done(clipstack_ids::ManagedId),
}

/// One paste operation's resolution state. `context` is the destination node
/// that relative paths are walked from; memoized managed objects are shared
/// across every value resolved in the same session, which is what preserves
/// copied reference identity.
pub struct ResolveSession<'c> {
    clipboard: &'c SerializedClipboard,
    context: ObjectId,
    settings: PasteSettings,
    memo: FxHashMap<u32, MemoState>,
}

impl<'c> ResolveSession<'c> {
    pub fn new(
        clipboard: &'c SerializedClipboard,
        context: ObjectId,
        settings: PasteSettings,
    ) -> Self {
        Self {
            clipboard,
            context,
            settings,
            memo: FxHashMap::default(),
        }
    }

    pub fn resolve(&mut self, host: &mut Host, node: &Node) -> ClipValue {
        match node {
            Node::Null { .. } => ClipValue::Null,
            Node::Bool { value, .. } => ClipValue::Bool(*value),
            Node::Long { value, .. } => ClipValue::Long(*value),
            Node::Double { value, .. } => ClipValue::Double(*value),
            Node::String { value, .. } => ClipValue::string(value),
            Node::Color { value, .. } => ClipValue::Color(*value),
            Node::Vector { value, .. } => ClipValue::Vector(*value),
            Node::Curve { json, .. } => ClipValue::Curve(json.as_str().into()),
            Node::Gradient { json, .. } => ClipValue::Gradient(json.as_str().into()),
            Node::Array {
                element_type,
                elements,
                ..
            } => ClipValue::array(
                element_type.as_str(),
                elements.iter().map(|e| self.resolve(host, e)).collect(),
            ),
            Node::Generic {
                type_index,
                children,
                ..
            } => {
                let type_name = self
                    .clipboard
                    .types
                    .get(*type_index as usize)
                    .map(|t| t.qualified_name.as_str())
                    .unwrap_or("");
                ClipValue::Generic(Box::new(GenericValue {
                    type_name: type_name.into(),
                    fields: children
                        .iter()
                        .map(|child| (child.name().into(), self.resolve(host, child)))
                        .collect(),
                }))
            }
            Node::SceneRef { index, .. } => {
                match self
                    .clipboard
                    .scene_objects
                    .get(*index as usize)
                    .and_then(|entry| self.resolve_scene(host, entry))
                {
                    Some(id) => ClipValue::Object(id),
                    None => {
                        if let Some(entry) = self.clipboard.scene_objects.get(*index as usize) {
                            warn!("scene reference `{}` could not be resolved", entry.name);
                        }
                        ClipValue::Null
                    }
                }
            }
            Node::AssetRef { index, .. } => {
                match self
                    .clipboard
                    .assets
                    .get(*index as usize)
                    .and_then(|entry| self.resolve_asset(host, entry))
                {
                    Some(id) => ClipValue::Object(id),
                    None => {
                        if let Some(entry) = self.clipboard.assets.get(*index as usize) {
                            warn!("asset reference `{}` could not be resolved", entry.path);
                        }
                        ClipValue::Null
                    }
                }
            }
            Node::ManagedRef { index, .. } => match self.resolve_managed(host, *index) {
                Some(id) => ClipValue::Managed(id),
                None => ClipValue::Null,
            },
            Node::Hierarchy { .. } => {
                // Hierarchies are pasted structurally, never as a value.
                warn!("hierarchy node resolved in value position");
                ClipValue::Null
            }
        }
    }

    // -------------------- Scene objects --------------------

    pub(crate) fn resolve_scene(&self, host: &Host, entry: &SceneObjectEntry) -> Option<ObjectId> {
        let node = self.resolve_scene_node(host, entry)?;
        if entry.component_ordinal < 0 {
            return Some(node);
        }
        let type_id = self
            .clipboard
            .types
            .get(entry.type_index as usize)?
            .resolve(&host.registry)?;
        host.find_component_of_type_closest_to_index(node, type_id, entry.component_ordinal as u32)
    }

    fn resolve_scene_node(&self, host: &Host, entry: &SceneObjectEntry) -> Option<ObjectId> {
        // With smart paste on, the recorded relation to the copy context is
        // walked from the paste context first, so a reference into the copied
        // object's own neighborhood retargets onto the destination's
        // analogous neighbor. Absolute path and scene-wide name search are
        // the fallbacks (and the primary strategies when smart paste is off).
        if self.settings.smart_paste
            && let Some(found) = walk_steps(host, self.context, &entry.relative_path)
        {
            return Some(found);
        }
        if let Some(found) = host.find_node_by_path(&entry.path) {
            return Some(found);
        }
        let owner_name = entry.path.last().map(String::as_str).unwrap_or(&entry.name);
        host.find_node_named(owner_name)
    }

    // -------------------- Assets --------------------

    pub(crate) fn resolve_asset(&self, host: &Host, entry: &AssetEntry) -> Option<ObjectId> {
        let asset = host.find_asset_by_path(&entry.path)?;
        let type_entry = self.clipboard.types.get(entry.type_index as usize);
        let category = type_entry
            .and_then(|t| t.resolve(&host.registry))
            .and_then(|id| host.registry.descriptor(id))
            .map(|d| d.category);
        match category {
            // The asset object itself; also the answer when the recorded type
            // no longer resolves.
            None | Some(TypeCategory::Asset) | Some(TypeCategory::Managed) => Some(asset),
            Some(TypeCategory::Node) => {
                find_in_template(host, host.template_root_of(asset), &entry.name)
            }
            Some(TypeCategory::Component) => {
                // `name` is the owning template node; the component is found
                // by type on it.
                let node = find_in_template(host, host.template_root_of(asset), &entry.name)?;
                let type_id = type_entry?.resolve(&host.registry)?;
                host.find_component_of_type_closest_to_index(node, type_id, 0)
            }
        }
    }

    // -------------------- Managed objects --------------------

    pub(crate) fn resolve_managed(
        &mut self,
        host: &mut Host,
        index: u32,
    ) -> Option<clipstack_ids::ManagedId> {
        match self.memo.get(&index) {
            Some(MemoState::Done(id)) => return Some(*id),
            Some(MemoState::InProgress) => {
                warn!("managed entry {index} is part of an unresolvable cycle");
                return None;
            }
            None => {}
        }
        let entry = self.clipboard.managed.get(index as usize)?;
        let Some(type_id) = self
            .clipboard
            .types
            .get(entry.type_index as usize)
            .and_then(|t| t.resolve(&host.registry))
        else {
            warn!("managed entry {index} has an unknown type");
            return None;
        };

        self.memo.insert(index, MemoState::InProgress);
        let id = host.create_managed(type_id);
        // Recorded before nested references resolve; a cycle back to this
        // entry finds the finished id.
        self.memo.insert(index, MemoState::Done(id));

        match serde_json::from_str::<serde_json::Value>(&entry.json) {
            Ok(serde_json::Value::Object(map)) => {
                for (name, value) in map {
                    host.set_managed_field(id, name, clipstack_model::ManagedField::Json(value));
                }
            }
            Ok(_) | Err(_) => {
                if !entry.json.is_empty() {
                    warn!("managed entry {index} carries malformed data");
                }
            }
        }

        let managed_refs = entry.managed_refs.clone();
        for (field, target) in managed_refs {
            let target_id = if target < 0 {
                None
            } else {
                self.resolve_managed(host, target as u32)
            };
            host.set_managed_field(
                id,
                field,
                clipstack_model::ManagedField::Managed(target_id.unwrap_or_default()),
            );
        }
        for (field, target) in &entry.scene_refs {
            let target_id = if *target < 0 {
                None
            } else {
                self.clipboard
                    .scene_objects
                    .get(*target as usize)
                    .and_then(|e| self.resolve_scene(host, e))
            };
            host.set_managed_field(
                id,
                field.clone(),
                clipstack_model::ManagedField::Object(target_id.unwrap_or_default()),
            );
        }
        for (field, target) in &entry.asset_refs {
            let target_id = if *target < 0 {
                None
            } else {
                self.clipboard
                    .assets
                    .get(*target as usize)
                    .and_then(|e| self.resolve_asset(host, e))
            };
            host.set_managed_field(
                id,
                field.clone(),
                clipstack_model::ManagedField::Object(target_id.unwrap_or_default()),
            );
        }
        Some(id)
    }
}

/// Walk a recorded relation from `start`. A nil current node stands for the
/// virtual super-root whose children are the scene roots.
fn walk_steps(host: &Host, start: ObjectId, steps: &[RelationStep]) -> Option<ObjectId> {
    if steps.is_empty() {
        return None;
    }
    let mut current = start;
    for step in steps {
        match step {
            RelationStep::Here => {}
            RelationStep::Up => {
                if current.is_nil() {
                    return None;
                }
                current = host.parent_of(current);
            }
            RelationStep::Down { name, occurrence } => {
                current = host.child_named(current, name, *occurrence)?;
            }
        }
    }
    (!current.is_nil()).then_some(current)
}

/// Compute the relation from `from` to `to` as up-hops to the deepest common
/// ancestor followed by named descents. The inverse of [`walk_steps`].
pub(crate) fn relation_steps(host: &Host, from: ObjectId, to: ObjectId) -> Vec<RelationStep> {
    if !from.is_nil() && from == to {
        return vec![RelationStep::Here];
    }
    let chain = |mut node: ObjectId| {
        let mut out = Vec::new();
        while !node.is_nil() {
            out.push(node);
            node = host.parent_of(node);
        }
        out.push(ObjectId::nil());
        out
    };
    let from_chain = chain(from);
    let to_chain = chain(to);
    let mut ups = from_chain.len();
    let mut downs = to_chain.len();
    while ups > 0 && downs > 0 && from_chain[ups - 1] == to_chain[downs - 1] {
        ups -= 1;
        downs -= 1;
    }
    let mut steps = vec![RelationStep::Up; ups];
    for &node in to_chain[..downs].iter().rev() {
        steps.push(RelationStep::Down {
            name: host.name_of(node).to_string(),
            occurrence: host.name_occurrence(node),
        });
    }
    steps
}

fn find_in_template(host: &Host, root: ObjectId, name: &str) -> Option<ObjectId> {
    if root.is_nil() {
        return None;
    }
    if host.name_of(root) == name {
        return Some(root);
    }
    for &child in host.children_of(root) {
        if let Some(found) = find_in_template(host, child, name) {
            return Some(found);
        }
    }
    None
}
