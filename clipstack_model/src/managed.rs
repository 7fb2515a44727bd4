//! Managed objects: plain polymorphic objects reachable through serialized
//! reference fields. Their data fields round-trip through JSON; reference
//! fields point back into the object model and may form cycles.

use clipstack_ids::{ManagedId, ObjectId, TypeId};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, PartialEq)]
pub enum ManagedField {
    /// Plain data, serialized verbatim.
    Json(JsonValue),
    /// Reference to another managed object (possibly this one).
    Managed(ManagedId),
    /// Reference to an engine object.
    Object(ObjectId),
}

#[derive(Clone, Debug)]
pub struct ManagedObject {
    pub type_id: TypeId,
    pub fields: IndexMap<String, ManagedField>,
}

impl ManagedObject {
    pub fn new(type_id: TypeId) -> Self {
        Self {
            type_id,
            fields: IndexMap::new(),
        }
    }

    /// The JSON blob of the data fields only; reference fields are carried
    /// separately (keyed by field name) so they can be retargeted on paste.
    pub fn data_json(&self) -> JsonValue {
        let mut map = serde_json::Map::new();
        for (name, field) in &self.fields {
            if let ManagedField::Json(value) = field {
                map.insert(name.clone(), value.clone());
            }
        }
        JsonValue::Object(map)
    }
}
