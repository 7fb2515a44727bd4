use std::fmt;
use std::sync::Arc;

use clipstack_ids::{ManagedId, ObjectId};

use crate::math::{Color, VectorValue};

/// Homogeneous array of clipboard values.
///
/// `element_type` is the declared element type name from the source property;
/// it is matched (not trusted) against the destination on paste.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayValue {
    pub element_type: Arc<str>,
    pub elements: Vec<ClipValue>,
}

/// Structured (plain nested) object: ordered named fields.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericValue {
    pub type_name: Arc<str>,
    pub fields: Vec<(Arc<str>, ClipValue)>,
}

impl GenericValue {
    pub fn field(&self, name: &str) -> Option<&ClipValue> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }
}

/// The closed set of copyable value shapes.
///
/// Curves and gradients travel as opaque JSON blobs produced by the host's
/// JSON serializer; `Vector` is the shared six-float slot (see
/// [`VectorValue`]); `Object`/`Managed` are live handles into the host object
/// model and are replaced by table indices once the value is flattened into a
/// clipboard graph node.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipValue {
    // --- Nullary ---
    Null,

    // --- Primitives ---
    Bool(bool),
    Long(i64),
    Double(f64),
    String(Arc<str>),

    // --- Fixed-size composites ---
    Color(Color),
    Vector(VectorValue),

    // --- Opaque JSON payloads ---
    Curve(Arc<str>),
    Gradient(Arc<str>),

    // --- Containers ---
    Array(Box<ArrayValue>),
    Generic(Box<GenericValue>),

    // --- References into the host object model ---
    Object(ObjectId),
    Managed(ManagedId),
}

impl ClipValue {
    #[inline]
    pub const fn null() -> Self {
        ClipValue::Null
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, ClipValue::Null)
    }

    #[inline]
    pub fn string<S: AsRef<str>>(s: S) -> Self {
        ClipValue::String(Arc::<str>::from(s.as_ref()))
    }

    pub fn array<S: AsRef<str>>(element_type: S, elements: Vec<ClipValue>) -> Self {
        ClipValue::Array(Box::new(ArrayValue {
            element_type: Arc::<str>::from(element_type.as_ref()),
            elements,
        }))
    }

    /// Structural comparison used by the diffing UI. Same as `==`, named for
    /// clarity at call sites: two references are "the same value" only when
    /// they point at the identical host object.
    #[inline]
    pub fn same_value(&self, other: &ClipValue) -> bool {
        self == other
    }
}

// -------------------- Accessors --------------------

impl ClipValue {
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ClipValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_long(&self) -> Option<i64> {
        match *self {
            ClipValue::Long(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_double(&self) -> Option<f64> {
        match *self {
            ClipValue::Double(v) => Some(v),
            _ => None,
        }
    }

    /// Numeric widening: a float destination accepts a stored long as well.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            ClipValue::Long(v) => Some(v as f64),
            ClipValue::Double(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClipValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn as_color(&self) -> Option<Color> {
        match *self {
            ClipValue::Color(c) => Some(c),
            _ => None,
        }
    }

    #[inline]
    pub fn as_vector(&self) -> Option<VectorValue> {
        match *self {
            ClipValue::Vector(v) => Some(v),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            ClipValue::Array(a) => Some(a),
            _ => None,
        }
    }

    #[inline]
    pub fn as_generic(&self) -> Option<&GenericValue> {
        match self {
            ClipValue::Generic(g) => Some(g),
            _ => None,
        }
    }

    #[inline]
    pub fn as_object(&self) -> Option<ObjectId> {
        match *self {
            ClipValue::Object(id) => Some(id),
            _ => None,
        }
    }

    #[inline]
    pub fn as_managed(&self) -> Option<ManagedId> {
        match *self {
            ClipValue::Managed(id) => Some(id),
            _ => None,
        }
    }
}

// -------------------- From impls --------------------

impl From<bool> for ClipValue {
    #[inline]
    fn from(v: bool) -> Self {
        ClipValue::Bool(v)
    }
}
impl From<i64> for ClipValue {
    #[inline]
    fn from(v: i64) -> Self {
        ClipValue::Long(v)
    }
}
impl From<i32> for ClipValue {
    #[inline]
    fn from(v: i32) -> Self {
        ClipValue::Long(v as i64)
    }
}
impl From<f64> for ClipValue {
    #[inline]
    fn from(v: f64) -> Self {
        ClipValue::Double(v)
    }
}
impl From<f32> for ClipValue {
    #[inline]
    fn from(v: f32) -> Self {
        ClipValue::Double(v as f64)
    }
}
impl From<&str> for ClipValue {
    #[inline]
    fn from(v: &str) -> Self {
        ClipValue::string(v)
    }
}
impl From<Color> for ClipValue {
    #[inline]
    fn from(v: Color) -> Self {
        ClipValue::Color(v)
    }
}
impl From<VectorValue> for ClipValue {
    #[inline]
    fn from(v: VectorValue) -> Self {
        ClipValue::Vector(v)
    }
}
impl From<ObjectId> for ClipValue {
    #[inline]
    fn from(v: ObjectId) -> Self {
        ClipValue::Object(v)
    }
}
impl From<ManagedId> for ClipValue {
    #[inline]
    fn from(v: ManagedId) -> Self {
        ClipValue::Managed(v)
    }
}

impl fmt::Display for ClipValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipValue::Null => write!(f, "null"),
            ClipValue::Bool(v) => write!(f, "{v}"),
            ClipValue::Long(v) => write!(f, "{v}"),
            ClipValue::Double(v) => write!(f, "{v}"),
            ClipValue::String(v) => write!(f, "{:?}", v.as_ref()),
            ClipValue::Color(c) => write!(f, "rgba({}, {}, {}, {})", c.r, c.g, c.b, c.a),
            ClipValue::Vector(v) => write!(
                f,
                "({}, {}, {}, {}, {}, {})",
                v.c1, v.c2, v.c3, v.c4, v.c5, v.c6
            ),
            ClipValue::Curve(_) => write!(f, "<curve>"),
            ClipValue::Gradient(_) => write!(f, "<gradient>"),
            ClipValue::Array(a) => {
                write!(f, "[")?;
                for (i, value) in a.elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, "]")
            }
            ClipValue::Generic(g) => {
                write!(f, "{} {{", g.type_name)?;
                for (i, (key, value)) in g.fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key.as_ref(), value)?;
                }
                write!(f, "}}")
            }
            ClipValue::Object(id) => write!(f, "<object {id}>"),
            ClipValue::Managed(id) => write!(f, "<managed {id}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality_on_nested_values() {
        let a = ClipValue::array("int", vec![1i64.into(), 2i64.into()]);
        let b = ClipValue::array("int", vec![1i64.into(), 2i64.into()]);
        assert!(a.same_value(&b));

        let c = ClipValue::array("int", vec![1i64.into(), 3i64.into()]);
        assert!(!a.same_value(&c));
    }

    #[test]
    fn numeric_widening_accessor() {
        assert_eq!(ClipValue::Long(4).as_number(), Some(4.0));
        assert_eq!(ClipValue::Double(0.5).as_number(), Some(0.5));
        assert_eq!(ClipValue::Bool(true).as_number(), None);
    }

    #[test]
    fn generic_field_lookup() {
        let g = GenericValue {
            type_name: "Settings".into(),
            fields: vec![("speed".into(), 2.5f64.into())],
        };
        assert_eq!(g.field("speed"), Some(&ClipValue::Double(2.5)));
        assert_eq!(g.field("missing"), None);
    }
}
