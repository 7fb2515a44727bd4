//! The serialized-property surface of the host object model: a closed set of
//! property kinds, the property value tree, and the curve/gradient payloads
//! that round-trip through JSON.

use clipstack_ids::{ManagedId, ObjectId, TypeId};
use clipstack_variant::{
    Bounds, BoundsInt, Color, Quaternion, Rect, RectInt, Vector2, Vector2Int, Vector3, Vector3Int,
    Vector4,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Closed, enumerable set of property kinds. There is no open extensibility;
/// every consumer matches exhaustively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKind {
    Bool,
    Integer,
    Float,
    String,
    Color,
    Vector2,
    Vector3,
    Vector4,
    Quaternion,
    Rect,
    Bounds,
    Vector2Int,
    Vector3Int,
    RectInt,
    BoundsInt,
    Curve,
    Gradient,
    Array,
    Generic,
    ObjectRef,
    ManagedRef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    pub time: f32,
    pub value: f32,
    pub in_tangent: f32,
    pub out_tangent: f32,
}

/// Animation curve payload. Serialized as an opaque JSON blob on the
/// clipboard; the engine never interprets the keys.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurveData {
    pub keys: Vec<CurveKey>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GradientColorKey {
    pub color: Color,
    pub time: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GradientAlphaKey {
    pub alpha: f32,
    pub time: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GradientData {
    pub color_keys: Vec<GradientColorKey>,
    pub alpha_keys: Vec<GradientAlphaKey>,
}

/// Homogeneous array property. `element_kind`/`element_type` describe the
/// declared element so the array can grow on paste even when empty.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayProperty {
    pub element_kind: PropertyKind,
    pub element_type: String,
    pub elements: Vec<PropertyValue>,
}

/// Engine-object reference with the declared (expected) type of the field.
/// `target` may be nil.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObjectRef {
    pub target: ObjectId,
    pub expected: TypeId,
}

/// Structured sub-object: a type tag plus ordered named children. Children
/// are counted by traversal, never by a stored length.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericProperty {
    pub type_name: String,
    pub fields: Vec<(String, PropertyValue)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Color(Color),
    Vector2(Vector2),
    Vector3(Vector3),
    Vector4(Vector4),
    Quaternion(Quaternion),
    Rect(Rect),
    Bounds(Bounds),
    Vector2Int(Vector2Int),
    Vector3Int(Vector3Int),
    RectInt(RectInt),
    BoundsInt(BoundsInt),
    Curve(CurveData),
    Gradient(GradientData),
    Array(ArrayProperty),
    Generic(GenericProperty),
    ObjectRef(ObjectRef),
    /// Reference to a managed (plain polymorphic) object; nil means none.
    ManagedRef(ManagedId),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Bool(_) => PropertyKind::Bool,
            PropertyValue::Integer(_) => PropertyKind::Integer,
            PropertyValue::Float(_) => PropertyKind::Float,
            PropertyValue::String(_) => PropertyKind::String,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::Vector2(_) => PropertyKind::Vector2,
            PropertyValue::Vector3(_) => PropertyKind::Vector3,
            PropertyValue::Vector4(_) => PropertyKind::Vector4,
            PropertyValue::Quaternion(_) => PropertyKind::Quaternion,
            PropertyValue::Rect(_) => PropertyKind::Rect,
            PropertyValue::Bounds(_) => PropertyKind::Bounds,
            PropertyValue::Vector2Int(_) => PropertyKind::Vector2Int,
            PropertyValue::Vector3Int(_) => PropertyKind::Vector3Int,
            PropertyValue::RectInt(_) => PropertyKind::RectInt,
            PropertyValue::BoundsInt(_) => PropertyKind::BoundsInt,
            PropertyValue::Curve(_) => PropertyKind::Curve,
            PropertyValue::Gradient(_) => PropertyKind::Gradient,
            PropertyValue::Array(_) => PropertyKind::Array,
            PropertyValue::Generic(_) => PropertyKind::Generic,
            PropertyValue::ObjectRef(_) => PropertyKind::ObjectRef,
            PropertyValue::ManagedRef(_) => PropertyKind::ManagedRef,
        }
    }
}

/// Ordered set of named serialized properties on one object.
pub type PropertySet = IndexMap<String, PropertyValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(PropertyValue::Bool(true).kind(), PropertyKind::Bool);
        assert_eq!(
            PropertyValue::Array(ArrayProperty {
                element_kind: PropertyKind::Float,
                element_type: "float".to_string(),
                elements: Vec::new(),
            })
            .kind(),
            PropertyKind::Array
        );
        assert_eq!(
            PropertyValue::ManagedRef(ManagedId::nil()).kind(),
            PropertyKind::ManagedRef
        );
    }

    #[test]
    fn curve_json_roundtrip() {
        let curve = CurveData {
            keys: vec![CurveKey {
                time: 0.0,
                value: 1.0,
                in_tangent: 0.0,
                out_tangent: -1.0,
            }],
        };
        let json = serde_json::to_string(&curve).unwrap();
        let back: CurveData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, curve);
    }
}
