//! Conversions between host property values and clipboard values.
//!
//! `copy_value` lifts a property into the closed clipboard value set;
//! `apply_value` fits a clipboard value back into an existing property slot,
//! returning `None` when the shapes are incompatible. Fitting is lenient in
//! exactly the ways that make cross-component paste useful: longs widen into
//! float slots, the six-float vector slot projects into any vector-family
//! kind, `Null` clears reference slots, and object references coerce between
//! a node and its component when the destination's declared type says so.

use clipstack_ids::ObjectId;
use clipstack_model::{
    ArrayProperty, CurveData, GradientData, Host, ObjectRef, PropertyKind, PropertyValue,
    TypeCategory,
};
use clipstack_variant::{ClipValue, GenericValue};
use log::debug;

// -------------------- Host -> clipboard --------------------

pub fn copy_value(value: &PropertyValue) -> ClipValue {
    match value {
        PropertyValue::Bool(v) => ClipValue::Bool(*v),
        PropertyValue::Integer(v) => ClipValue::Long(*v),
        PropertyValue::Float(v) => ClipValue::Double(*v),
        PropertyValue::String(v) => ClipValue::string(v),
        PropertyValue::Color(v) => ClipValue::Color(*v),
        PropertyValue::Vector2(v) => ClipValue::Vector((*v).into()),
        PropertyValue::Vector3(v) => ClipValue::Vector((*v).into()),
        PropertyValue::Vector4(v) => ClipValue::Vector((*v).into()),
        PropertyValue::Quaternion(v) => ClipValue::Vector((*v).into()),
        PropertyValue::Rect(v) => ClipValue::Vector((*v).into()),
        PropertyValue::Bounds(v) => ClipValue::Vector((*v).into()),
        PropertyValue::Vector2Int(v) => ClipValue::Vector((*v).into()),
        PropertyValue::Vector3Int(v) => ClipValue::Vector((*v).into()),
        PropertyValue::RectInt(v) => ClipValue::Vector((*v).into()),
        PropertyValue::BoundsInt(v) => ClipValue::Vector((*v).into()),
        PropertyValue::Curve(curve) => {
            ClipValue::Curve(serde_json::to_string(curve).unwrap_or_default().into())
        }
        PropertyValue::Gradient(gradient) => {
            ClipValue::Gradient(serde_json::to_string(gradient).unwrap_or_default().into())
        }
        PropertyValue::Array(array) => ClipValue::array(
            array.element_type.as_str(),
            array.elements.iter().map(copy_value).collect(),
        ),
        PropertyValue::Generic(generic) => ClipValue::Generic(Box::new(GenericValue {
            type_name: generic.type_name.as_str().into(),
            fields: generic
                .fields
                .iter()
                .map(|(name, value)| (name.as_str().into(), copy_value(value)))
                .collect(),
        })),
        PropertyValue::ObjectRef(r) => {
            if r.target.is_nil() {
                ClipValue::Null
            } else {
                ClipValue::Object(r.target)
            }
        }
        PropertyValue::ManagedRef(id) => {
            if id.is_nil() {
                ClipValue::Null
            } else {
                ClipValue::Managed(*id)
            }
        }
    }
}

// -------------------- Clipboard -> host --------------------

/// Fit `value` into the slot currently holding `existing`. The destination's
/// kind never changes; `None` means the paste of this one value is skipped.
pub fn apply_value(host: &Host, existing: &PropertyValue, value: &ClipValue) -> Option<PropertyValue> {
    match existing {
        PropertyValue::Bool(_) => value.as_bool().map(PropertyValue::Bool),
        PropertyValue::Integer(_) => value.as_long().map(PropertyValue::Integer),
        // Widening only: a stored long fits a float slot, never the reverse.
        PropertyValue::Float(_) => value.as_number().map(PropertyValue::Float),
        PropertyValue::String(_) => value.as_str().map(|s| PropertyValue::String(s.to_string())),
        PropertyValue::Color(_) => value.as_color().map(PropertyValue::Color),
        PropertyValue::Vector2(_) => value
            .as_vector()
            .map(|v| PropertyValue::Vector2(v.to_vector2())),
        PropertyValue::Vector3(_) => value
            .as_vector()
            .map(|v| PropertyValue::Vector3(v.to_vector3())),
        PropertyValue::Vector4(_) => value
            .as_vector()
            .map(|v| PropertyValue::Vector4(v.to_vector4())),
        PropertyValue::Quaternion(_) => value
            .as_vector()
            .map(|v| PropertyValue::Quaternion(v.to_quaternion())),
        PropertyValue::Rect(_) => value.as_vector().map(|v| PropertyValue::Rect(v.to_rect())),
        PropertyValue::Bounds(_) => value
            .as_vector()
            .map(|v| PropertyValue::Bounds(v.to_bounds())),
        PropertyValue::Vector2Int(_) => value
            .as_vector()
            .map(|v| PropertyValue::Vector2Int(v.to_vector2_int())),
        PropertyValue::Vector3Int(_) => value
            .as_vector()
            .map(|v| PropertyValue::Vector3Int(v.to_vector3_int())),
        PropertyValue::RectInt(_) => value
            .as_vector()
            .map(|v| PropertyValue::RectInt(v.to_rect_int())),
        PropertyValue::BoundsInt(_) => value
            .as_vector()
            .map(|v| PropertyValue::BoundsInt(v.to_bounds_int())),
        PropertyValue::Curve(_) => match value {
            ClipValue::Curve(json) => serde_json::from_str::<CurveData>(json)
                .ok()
                .map(PropertyValue::Curve),
            _ => None,
        },
        PropertyValue::Gradient(_) => match value {
            ClipValue::Gradient(json) => serde_json::from_str::<GradientData>(json)
                .ok()
                .map(PropertyValue::Gradient),
            _ => None,
        },
        PropertyValue::Array(dest) => apply_array(host, dest, value),
        PropertyValue::Generic(dest) => {
            let source = value.as_generic()?;
            let mut out = dest.clone();
            for (name, slot) in &mut out.fields {
                if let Some(incoming) = source.field(name)
                    && let Some(updated) = apply_value(host, slot, incoming)
                {
                    *slot = updated;
                }
            }
            Some(PropertyValue::Generic(out))
        }
        PropertyValue::ObjectRef(dest) => apply_object_ref(host, dest, value),
        PropertyValue::ManagedRef(_) => match value {
            ClipValue::Null => Some(PropertyValue::ManagedRef(Default::default())),
            ClipValue::Managed(id) => Some(PropertyValue::ManagedRef(*id)),
            _ => None,
        },
    }
}

pub fn can_paste_value(host: &Host, existing: &PropertyValue, value: &ClipValue) -> bool {
    apply_value(host, existing, value).is_some()
}

fn apply_array(host: &Host, dest: &ArrayProperty, value: &ClipValue) -> Option<PropertyValue> {
    let source = value.as_array()?;
    // The destination grows or shrinks to the source length; new slots are
    // cloned from the last existing element (arrays are homogeneous) or, for
    // an empty destination, from the declared element kind's default. The
    // template is only demanded once the source outgrows the destination, so
    // shrinking (or emptying) an array never needs one.
    let mut template = None;
    let mut elements = Vec::with_capacity(source.elements.len());
    for element in &source.elements {
        let slot = match dest.elements.get(elements.len()) {
            Some(slot) => slot,
            None => {
                if template.is_none() {
                    template = Some(
                        dest.elements
                            .last()
                            .cloned()
                            .or_else(|| default_for_kind(dest.element_kind))?,
                    );
                }
                template.as_ref()?
            }
        };
        elements.push(apply_value(host, slot, element)?);
    }
    Some(PropertyValue::Array(ArrayProperty {
        element_kind: dest.element_kind,
        element_type: dest.element_type.clone(),
        elements,
    }))
}

fn apply_object_ref(host: &Host, dest: &ObjectRef, value: &ClipValue) -> Option<PropertyValue> {
    let target = match value {
        ClipValue::Null => ObjectId::nil(),
        ClipValue::Object(id) => coerce_object(host, *id, dest)?,
        _ => return None,
    };
    Some(PropertyValue::ObjectRef(ObjectRef {
        target,
        expected: dest.expected,
    }))
}

/// Try-assign: accept the object as-is when its type matches the slot's
/// declared type, otherwise hop between a node and its components to find a
/// match. A nil declared type accepts anything.
fn coerce_object(host: &Host, id: ObjectId, dest: &ObjectRef) -> Option<ObjectId> {
    if dest.expected.is_nil() || host.type_of(id) == dest.expected {
        return Some(id);
    }
    let category = host.registry.descriptor(dest.expected).map(|d| d.category);
    match category {
        Some(TypeCategory::Component) => {
            // A node (or a sibling component) stands in for one of the owner
            // node's components of the declared type.
            let node = host.owner_node_of(id);
            let found = host.find_component_of_type_closest_to_index(node, dest.expected, 0);
            if found.is_none() {
                debug!(
                    "object `{}` has no component of the declared reference type",
                    host.name_of(id)
                );
            }
            found
        }
        Some(TypeCategory::Node) => {
            let node = host.owner_node_of(id);
            (!node.is_nil()).then_some(node)
        }
        _ => None,
    }
}

fn default_for_kind(kind: PropertyKind) -> Option<PropertyValue> {
    Some(match kind {
        PropertyKind::Bool => PropertyValue::Bool(false),
        PropertyKind::Integer => PropertyValue::Integer(0),
        PropertyKind::Float => PropertyValue::Float(0.0),
        PropertyKind::String => PropertyValue::String(String::new()),
        PropertyKind::Color => PropertyValue::Color(Default::default()),
        PropertyKind::Vector2 => PropertyValue::Vector2(Default::default()),
        PropertyKind::Vector3 => PropertyValue::Vector3(Default::default()),
        PropertyKind::Vector4 => PropertyValue::Vector4(Default::default()),
        PropertyKind::Quaternion => PropertyValue::Quaternion(Default::default()),
        PropertyKind::Rect => PropertyValue::Rect(Default::default()),
        PropertyKind::Bounds => PropertyValue::Bounds(Default::default()),
        PropertyKind::Vector2Int => PropertyValue::Vector2Int(Default::default()),
        PropertyKind::Vector3Int => PropertyValue::Vector3Int(Default::default()),
        PropertyKind::RectInt => PropertyValue::RectInt(Default::default()),
        PropertyKind::BoundsInt => PropertyValue::BoundsInt(Default::default()),
        PropertyKind::Curve => PropertyValue::Curve(CurveData::default()),
        PropertyKind::Gradient => PropertyValue::Gradient(GradientData::default()),
        PropertyKind::ObjectRef => PropertyValue::ObjectRef(ObjectRef {
            target: ObjectId::nil(),
            expected: Default::default(),
        }),
        PropertyKind::ManagedRef => PropertyValue::ManagedRef(Default::default()),
        // Nested containers need a live template element to grow from.
        PropertyKind::Array | PropertyKind::Generic => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstack_model::{TypeCategory, TypeDescriptor};
    use clipstack_variant::{Vector3, VectorValue};

    fn host_with_component() -> (Host, clipstack_ids::TypeId, ObjectId, ObjectId) {
        let mut host = Host::new();
        let ty = host.registry.register(TypeDescriptor {
            simple_name: "Mover".to_string(),
            qualified_name: "game::Mover".to_string(),
            category: TypeCategory::Component,
            defaults: Default::default(),
        });
        let node = host.create_node("N", ObjectId::nil()).unwrap();
        let component = host.add_component(node, ty).unwrap();
        (host, ty, node, component)
    }

    #[test]
    fn numeric_widening_is_one_directional() {
        let host = Host::new();
        assert_eq!(
            apply_value(&host, &PropertyValue::Float(0.0), &ClipValue::Long(3)),
            Some(PropertyValue::Float(3.0))
        );
        assert_eq!(
            apply_value(&host, &PropertyValue::Integer(0), &ClipValue::Double(3.0)),
            None
        );
    }

    #[test]
    fn vector_slot_projects_into_destination_kind() {
        let host = Host::new();
        let stored = ClipValue::Vector(VectorValue::from(Vector3 {
            x: 1.0,
            y: 2.0,
            z: 3.0,
        }));
        assert_eq!(
            apply_value(&host, &PropertyValue::Vector2(Default::default()), &stored),
            Some(PropertyValue::Vector2(clipstack_variant::Vector2 {
                x: 1.0,
                y: 2.0
            }))
        );
        assert_eq!(
            apply_value(
                &host,
                &PropertyValue::Vector3Int(Default::default()),
                &stored
            ),
            Some(PropertyValue::Vector3Int(clipstack_variant::Vector3Int {
                x: 1,
                y: 2,
                z: 3
            }))
        );
    }

    #[test]
    fn null_clears_reference_slots() {
        let (host, ty, _node, component) = host_with_component();
        let slot = PropertyValue::ObjectRef(ObjectRef {
            target: component,
            expected: ty,
        });
        let Some(PropertyValue::ObjectRef(cleared)) =
            apply_value(&host, &slot, &ClipValue::Null)
        else {
            panic!("null must fit a reference slot");
        };
        assert!(cleared.target.is_nil());
        assert_eq!(cleared.expected, ty);
    }

    #[test]
    fn node_coerces_to_its_component_and_back() {
        let (host, ty, node, component) = host_with_component();
        let want_component = PropertyValue::ObjectRef(ObjectRef {
            target: ObjectId::nil(),
            expected: ty,
        });
        assert_eq!(
            apply_value(&host, &want_component, &ClipValue::Object(node)),
            Some(PropertyValue::ObjectRef(ObjectRef {
                target: component,
                expected: ty,
            }))
        );

        let want_node = PropertyValue::ObjectRef(ObjectRef {
            target: ObjectId::nil(),
            expected: host.node_type(),
        });
        assert_eq!(
            apply_value(&host, &want_node, &ClipValue::Object(component)),
            Some(PropertyValue::ObjectRef(ObjectRef {
                target: node,
                expected: host.node_type(),
            }))
        );
    }

    #[test]
    fn arrays_grow_from_the_last_element() {
        let host = Host::new();
        let dest = PropertyValue::Array(ArrayProperty {
            element_kind: PropertyKind::Float,
            element_type: "float".to_string(),
            elements: vec![PropertyValue::Float(9.0)],
        });
        let source = ClipValue::array(
            "float",
            vec![ClipValue::Double(1.0), ClipValue::Long(2), ClipValue::Double(3.0)],
        );
        let Some(PropertyValue::Array(out)) = apply_value(&host, &dest, &source) else {
            panic!("array paste must fit");
        };
        assert_eq!(
            out.elements,
            vec![
                PropertyValue::Float(1.0),
                PropertyValue::Float(2.0),
                PropertyValue::Float(3.0)
            ]
        );
    }

    #[test]
    fn empty_array_fits_without_a_template_element() {
        let host = Host::new();
        // Generic elements have no synthesized default, but pasting an empty
        // (or shorter) array never needs one.
        let dest = PropertyValue::Array(ArrayProperty {
            element_kind: PropertyKind::Generic,
            element_type: "Entry".to_string(),
            elements: vec![],
        });
        let Some(PropertyValue::Array(out)) =
            apply_value(&host, &dest, &ClipValue::array("Entry", vec![]))
        else {
            panic!("empty array paste must fit");
        };
        assert!(out.elements.is_empty());
    }

    #[test]
    fn generic_merges_by_field_name() {
        let host = Host::new();
        let dest = PropertyValue::Generic(clipstack_model::GenericProperty {
            type_name: "Settings".to_string(),
            fields: vec![
                ("speed".to_string(), PropertyValue::Float(1.0)),
                ("label".to_string(), PropertyValue::String("old".to_string())),
            ],
        });
        let source = ClipValue::Generic(Box::new(GenericValue {
            type_name: "Settings".into(),
            fields: vec![("speed".into(), ClipValue::Double(4.0))],
        }));
        let Some(PropertyValue::Generic(out)) = apply_value(&host, &dest, &source) else {
            panic!("generic paste must fit");
        };
        assert_eq!(out.fields[0].1, PropertyValue::Float(4.0));
        // Fields absent from the source keep their destination value.
        assert_eq!(out.fields[1].1, PropertyValue::String("old".to_string()));
    }
}
