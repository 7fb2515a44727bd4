//! Hand-rolled binary wire format: little-endian fixed-width numbers and
//! u32-length-prefixed UTF-8 strings, in a stable field order. Zero length
//! always means "empty"; the API never distinguishes empty from absent.
//!
//! Layout of one clipboard:
//!   label, types[], scene_objects[], assets[], managed[], values[]
//! where every array is `u32 length` followed by the elements, and every
//! value node is `u8 tag` + name + variant payload (one exhaustive tag
//! table, shared by both directions).

use std::io::{self, Read, Write};

use clipstack_variant::{Color, VectorValue};
use thiserror::Error;

use crate::clipboard::SerializedClipboard;
use crate::node::{
    AssetEntry, ComponentRecord, HierarchyNode, ManagedEntry, Node, NodeTag, RelationStep,
    RemovedComponentRecord, SceneObjectEntry, TypeEntry,
};

/// A reader observing a truncated or mid-write stream must fail cleanly,
/// never hang or panic; callers degrade to "empty clipboard".
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("unknown node tag {0}")]
    InvalidTag(u8),
    #[error("corrupt clipboard data: {0}")]
    Corrupt(&'static str),
}

/// Upper bound on any length prefix; larger values mean a corrupt stream,
/// rejected before allocation.
const MAX_LEN: u32 = 1 << 24;

// -------------------- Primitives --------------------

fn read_exact_array<const N: usize, R: Read>(reader: &mut R) -> io::Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

pub fn read_u8<R: Read>(reader: &mut R) -> io::Result<u8> {
    Ok(read_exact_array::<1, _>(reader)?[0])
}

pub fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    Ok(u32::from_le_bytes(read_exact_array::<4, _>(reader)?))
}

pub fn read_i32<R: Read>(reader: &mut R) -> io::Result<i32> {
    Ok(i32::from_le_bytes(read_exact_array::<4, _>(reader)?))
}

pub fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    Ok(i64::from_le_bytes(read_exact_array::<8, _>(reader)?))
}

pub fn read_f32<R: Read>(reader: &mut R) -> io::Result<f32> {
    Ok(f32::from_le_bytes(read_exact_array::<4, _>(reader)?))
}

pub fn read_f64<R: Read>(reader: &mut R) -> io::Result<f64> {
    Ok(f64::from_le_bytes(read_exact_array::<8, _>(reader)?))
}

pub fn write_u8<W: Write>(writer: &mut W, value: u8) -> io::Result<()> {
    writer.write_all(&[value])
}

pub fn write_u32<W: Write>(writer: &mut W, value: u32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn write_i32<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn write_i64<W: Write>(writer: &mut W, value: i64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn write_f32<W: Write>(writer: &mut W, value: f32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn write_f64<W: Write>(writer: &mut W, value: f64) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

fn read_len<R: Read>(reader: &mut R) -> Result<u32, ReadError> {
    let len = read_u32(reader)?;
    if len > MAX_LEN {
        return Err(ReadError::Corrupt("length prefix out of range"));
    }
    Ok(len)
}

/// Capacity for a vector about to hold `len` decoded elements. Clamped so a
/// corrupt length prefix costs at most a small reserve before the element
/// reads hit end-of-stream; real collections this large still work, they
/// just grow.
fn sized_vec<T>(len: u32) -> Vec<T> {
    Vec::with_capacity((len as usize).min(1024))
}

pub fn read_string<R: Read>(reader: &mut R) -> Result<String, ReadError> {
    let len = read_len(reader)? as usize;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|_| ReadError::Corrupt("string is not valid UTF-8"))
}

pub fn write_string<W: Write>(writer: &mut W, value: &str) -> io::Result<()> {
    write_u32(writer, value.len() as u32)?;
    writer.write_all(value.as_bytes())
}

fn read_bool<R: Read>(reader: &mut R) -> io::Result<bool> {
    Ok(read_u8(reader)? != 0)
}

fn write_bool<W: Write>(writer: &mut W, value: bool) -> io::Result<()> {
    write_u8(writer, value as u8)
}

fn read_string_list<R: Read>(reader: &mut R) -> Result<Vec<String>, ReadError> {
    let len = read_len(reader)?;
    let mut out = sized_vec(len);
    for _ in 0..len {
        out.push(read_string(reader)?);
    }
    Ok(out)
}

fn write_string_list<W: Write>(writer: &mut W, values: &[String]) -> io::Result<()> {
    write_u32(writer, values.len() as u32)?;
    for value in values {
        write_string(writer, value)?;
    }
    Ok(())
}

fn read_ref_list<R: Read>(reader: &mut R) -> Result<Vec<(String, i32)>, ReadError> {
    let len = read_len(reader)?;
    let mut out = sized_vec(len);
    for _ in 0..len {
        let field = read_string(reader)?;
        let index = read_i32(reader)?;
        out.push((field, index));
    }
    Ok(out)
}

fn write_ref_list<W: Write>(writer: &mut W, refs: &[(String, i32)]) -> io::Result<()> {
    write_u32(writer, refs.len() as u32)?;
    for (field, index) in refs {
        write_string(writer, field)?;
        write_i32(writer, *index)?;
    }
    Ok(())
}

fn read_color<R: Read>(reader: &mut R) -> io::Result<Color> {
    Ok(Color {
        r: read_f32(reader)?,
        g: read_f32(reader)?,
        b: read_f32(reader)?,
        a: read_f32(reader)?,
    })
}

fn write_color<W: Write>(writer: &mut W, color: &Color) -> io::Result<()> {
    write_f32(writer, color.r)?;
    write_f32(writer, color.g)?;
    write_f32(writer, color.b)?;
    write_f32(writer, color.a)
}

fn read_vector<R: Read>(reader: &mut R) -> io::Result<VectorValue> {
    Ok(VectorValue {
        c1: read_f32(reader)?,
        c2: read_f32(reader)?,
        c3: read_f32(reader)?,
        c4: read_f32(reader)?,
        c5: read_f32(reader)?,
        c6: read_f32(reader)?,
    })
}

fn write_vector<W: Write>(writer: &mut W, v: &VectorValue) -> io::Result<()> {
    write_f32(writer, v.c1)?;
    write_f32(writer, v.c2)?;
    write_f32(writer, v.c3)?;
    write_f32(writer, v.c4)?;
    write_f32(writer, v.c5)?;
    write_f32(writer, v.c6)
}

// -------------------- Relation steps --------------------

fn read_steps<R: Read>(reader: &mut R) -> Result<Vec<RelationStep>, ReadError> {
    let len = read_len(reader)?;
    let mut out = sized_vec(len);
    for _ in 0..len {
        out.push(match read_u8(reader)? {
            0 => RelationStep::Here,
            1 => RelationStep::Up,
            2 => {
                let name = read_string(reader)?;
                let occurrence = read_u32(reader)?;
                RelationStep::Down { name, occurrence }
            }
            _ => return Err(ReadError::Corrupt("unknown relation step")),
        });
    }
    Ok(out)
}

fn write_steps<W: Write>(writer: &mut W, steps: &[RelationStep]) -> io::Result<()> {
    write_u32(writer, steps.len() as u32)?;
    for step in steps {
        match step {
            RelationStep::Here => write_u8(writer, 0)?,
            RelationStep::Up => write_u8(writer, 1)?,
            RelationStep::Down { name, occurrence } => {
                write_u8(writer, 2)?;
                write_string(writer, name)?;
                write_u32(writer, *occurrence)?;
            }
        }
    }
    Ok(())
}

// -------------------- Nodes --------------------

pub fn write_node<W: Write>(writer: &mut W, node: &Node) -> io::Result<()> {
    write_u8(writer, NodeTag::of(node) as u8)?;
    write_string(writer, node.name())?;
    match node {
        Node::Null { .. } => Ok(()),
        Node::Bool { value, .. } => write_bool(writer, *value),
        Node::Long { value, .. } => write_i64(writer, *value),
        Node::Double { value, .. } => write_f64(writer, *value),
        Node::String { value, .. } => write_string(writer, value),
        Node::Color { value, .. } => write_color(writer, value),
        Node::Vector { value, .. } => write_vector(writer, value),
        Node::Curve { json, .. } | Node::Gradient { json, .. } => write_string(writer, json),
        Node::Array {
            element_type,
            elements,
            ..
        } => {
            write_string(writer, element_type)?;
            write_u32(writer, elements.len() as u32)?;
            for element in elements {
                write_node(writer, element)?;
            }
            Ok(())
        }
        Node::Generic {
            type_index,
            children,
            ..
        } => {
            write_u32(writer, *type_index)?;
            write_u32(writer, children.len() as u32)?;
            for child in children {
                write_node(writer, child)?;
            }
            Ok(())
        }
        Node::SceneRef { index, .. }
        | Node::AssetRef { index, .. }
        | Node::ManagedRef { index, .. } => write_u32(writer, *index),
        Node::Hierarchy { root, .. } => write_hierarchy(writer, root),
    }
}

pub fn read_node<R: Read>(reader: &mut R) -> Result<Node, ReadError> {
    let raw = read_u8(reader)?;
    let tag = NodeTag::from_u8(raw).ok_or(ReadError::InvalidTag(raw))?;
    let name = read_string(reader)?;
    Ok(match tag {
        NodeTag::Null => Node::Null { name },
        NodeTag::Bool => Node::Bool {
            name,
            value: read_bool(reader)?,
        },
        NodeTag::Long => Node::Long {
            name,
            value: read_i64(reader)?,
        },
        NodeTag::Double => Node::Double {
            name,
            value: read_f64(reader)?,
        },
        NodeTag::String => Node::String {
            name,
            value: read_string(reader)?,
        },
        NodeTag::Color => Node::Color {
            name,
            value: read_color(reader)?,
        },
        NodeTag::Vector => Node::Vector {
            name,
            value: read_vector(reader)?,
        },
        NodeTag::Curve => Node::Curve {
            name,
            json: read_string(reader)?,
        },
        NodeTag::Gradient => Node::Gradient {
            name,
            json: read_string(reader)?,
        },
        NodeTag::Array => {
            let element_type = read_string(reader)?;
            let len = read_len(reader)?;
            let mut elements = sized_vec(len);
            for _ in 0..len {
                elements.push(read_node(reader)?);
            }
            Node::Array {
                name,
                element_type,
                elements,
            }
        }
        NodeTag::Generic => {
            let type_index = read_u32(reader)?;
            let len = read_len(reader)?;
            let mut children = sized_vec(len);
            for _ in 0..len {
                children.push(read_node(reader)?);
            }
            Node::Generic {
                name,
                type_index,
                children,
            }
        }
        NodeTag::SceneRef => Node::SceneRef {
            name,
            index: read_u32(reader)?,
        },
        NodeTag::AssetRef => Node::AssetRef {
            name,
            index: read_u32(reader)?,
        },
        NodeTag::ManagedRef => Node::ManagedRef {
            name,
            index: read_u32(reader)?,
        },
        NodeTag::Hierarchy => Node::Hierarchy {
            name,
            root: read_hierarchy(reader)?,
        },
    })
}

// -------------------- Hierarchy --------------------

fn write_hierarchy<W: Write>(writer: &mut W, node: &HierarchyNode) -> io::Result<()> {
    write_string(writer, &node.name)?;
    write_bool(writer, node.active)?;
    write_u32(writer, node.layer)?;
    write_string(writer, &node.tag)?;
    write_u32(writer, node.static_flags)?;
    write_u32(writer, node.hide_flags)?;
    write_bool(writer, node.from_prefab)?;
    write_i32(writer, node.prefab_asset)?;
    write_u32(writer, node.sibling_index)?;
    write_u32(writer, node.components.len() as u32)?;
    for component in &node.components {
        write_u32(writer, component.type_index)?;
        write_u32(writer, component.ordinal)?;
        write_bool(writer, component.enabled)?;
        write_u32(writer, component.hide_flags)?;
        write_clipboard(writer, &component.clipboard)?;
    }
    write_u32(writer, node.removed_components.len() as u32)?;
    for removed in &node.removed_components {
        write_u32(writer, removed.type_index)?;
        write_u32(writer, removed.ordinal)?;
    }
    write_u32(writer, node.children.len() as u32)?;
    for child in &node.children {
        write_hierarchy(writer, child)?;
    }
    Ok(())
}

fn read_hierarchy<R: Read>(reader: &mut R) -> Result<HierarchyNode, ReadError> {
    let name = read_string(reader)?;
    let active = read_bool(reader)?;
    let layer = read_u32(reader)?;
    let tag = read_string(reader)?;
    let static_flags = read_u32(reader)?;
    let hide_flags = read_u32(reader)?;
    let from_prefab = read_bool(reader)?;
    let prefab_asset = read_i32(reader)?;
    let sibling_index = read_u32(reader)?;

    let len = read_len(reader)?;
    let mut components = sized_vec(len);
    for _ in 0..len {
        let type_index = read_u32(reader)?;
        let ordinal = read_u32(reader)?;
        let enabled = read_bool(reader)?;
        let hide_flags = read_u32(reader)?;
        let clipboard = read_clipboard(reader)?;
        components.push(ComponentRecord {
            type_index,
            ordinal,
            enabled,
            hide_flags,
            clipboard,
        });
    }

    let len = read_len(reader)?;
    let mut removed_components = sized_vec(len);
    for _ in 0..len {
        removed_components.push(RemovedComponentRecord {
            type_index: read_u32(reader)?,
            ordinal: read_u32(reader)?,
        });
    }

    let len = read_len(reader)?;
    let mut children = sized_vec(len);
    for _ in 0..len {
        children.push(read_hierarchy(reader)?);
    }

    Ok(HierarchyNode {
        name,
        active,
        layer,
        tag,
        static_flags,
        hide_flags,
        from_prefab,
        prefab_asset,
        sibling_index,
        components,
        removed_components,
        children,
    })
}

// -------------------- Clipboard --------------------

pub fn write_clipboard<W: Write>(writer: &mut W, clipboard: &SerializedClipboard) -> io::Result<()> {
    write_string(writer, &clipboard.label)?;

    write_u32(writer, clipboard.types.len() as u32)?;
    for entry in &clipboard.types {
        write_string(writer, &entry.name)?;
        write_string(writer, &entry.qualified_name)?;
    }

    write_u32(writer, clipboard.scene_objects.len() as u32)?;
    for entry in &clipboard.scene_objects {
        write_u32(writer, entry.type_index)?;
        write_string(writer, &entry.name)?;
        write_string_list(writer, &entry.path)?;
        write_steps(writer, &entry.relative_path)?;
        write_i32(writer, entry.component_ordinal)?;
    }

    write_u32(writer, clipboard.assets.len() as u32)?;
    for entry in &clipboard.assets {
        write_u32(writer, entry.type_index)?;
        write_string(writer, &entry.name)?;
        write_string(writer, &entry.path)?;
    }

    write_u32(writer, clipboard.managed.len() as u32)?;
    for entry in &clipboard.managed {
        write_u32(writer, entry.type_index)?;
        write_string(writer, &entry.json)?;
        write_ref_list(writer, &entry.managed_refs)?;
        write_ref_list(writer, &entry.scene_refs)?;
        write_ref_list(writer, &entry.asset_refs)?;
    }

    write_u32(writer, clipboard.values.len() as u32)?;
    for node in &clipboard.values {
        write_node(writer, node)?;
    }
    Ok(())
}

pub fn read_clipboard<R: Read>(reader: &mut R) -> Result<SerializedClipboard, ReadError> {
    let label = read_string(reader)?;

    let len = read_len(reader)?;
    let mut types = sized_vec(len);
    for _ in 0..len {
        let name = read_string(reader)?;
        let qualified_name = read_string(reader)?;
        types.push(TypeEntry::new(name, qualified_name));
    }

    let len = read_len(reader)?;
    let mut scene_objects = sized_vec(len);
    for _ in 0..len {
        scene_objects.push(SceneObjectEntry {
            type_index: read_u32(reader)?,
            name: read_string(reader)?,
            path: read_string_list(reader)?,
            relative_path: read_steps(reader)?,
            component_ordinal: read_i32(reader)?,
        });
    }

    let len = read_len(reader)?;
    let mut assets = sized_vec(len);
    for _ in 0..len {
        assets.push(AssetEntry {
            type_index: read_u32(reader)?,
            name: read_string(reader)?,
            path: read_string(reader)?,
        });
    }

    let len = read_len(reader)?;
    let mut managed = sized_vec(len);
    for _ in 0..len {
        managed.push(ManagedEntry {
            type_index: read_u32(reader)?,
            json: read_string(reader)?,
            managed_refs: read_ref_list(reader)?,
            scene_refs: read_ref_list(reader)?,
            asset_refs: read_ref_list(reader)?,
        });
    }

    let len = read_len(reader)?;
    let mut values = sized_vec(len);
    for _ in 0..len {
        values.push(read_node(reader)?);
    }

    Ok(SerializedClipboard {
        label,
        types,
        scene_objects,
        assets,
        managed,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(node: Node) -> Node {
        let mut buf = Vec::new();
        write_node(&mut buf, &node).unwrap();
        read_node(&mut Cursor::new(buf)).unwrap()
    }

    #[test]
    fn scalar_nodes_roundtrip() {
        let nodes = vec![
            Node::Null {
                name: "a".to_string(),
            },
            Node::Bool {
                name: "b".to_string(),
                value: true,
            },
            Node::Long {
                name: "c".to_string(),
                value: -42,
            },
            Node::Double {
                name: String::new(),
                value: 2.5,
            },
            Node::String {
                name: "s".to_string(),
                value: "hello".to_string(),
            },
            Node::Vector {
                name: "v".to_string(),
                value: VectorValue::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0),
            },
        ];
        for node in nodes {
            assert_eq!(roundtrip(node.clone()), node);
        }
    }

    #[test]
    fn nested_containers_roundtrip() {
        let node = Node::Array {
            name: "items".to_string(),
            element_type: "Entry".to_string(),
            elements: vec![Node::Generic {
                name: String::new(),
                type_index: 0,
                children: vec![
                    Node::Long {
                        name: "id".to_string(),
                        value: 7,
                    },
                    Node::SceneRef {
                        name: "target".to_string(),
                        index: 3,
                    },
                ],
            }],
        };
        assert_eq!(roundtrip(node.clone()), node);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = read_node(&mut Cursor::new(vec![99u8, 0, 0, 0, 0])).unwrap_err();
        assert!(matches!(err, ReadError::InvalidTag(99)));
    }

    #[test]
    fn truncated_stream_is_an_error_not_a_hang() {
        let mut buf = Vec::new();
        write_node(
            &mut buf,
            &Node::String {
                name: "s".to_string(),
                value: "truncate me".to_string(),
            },
        )
        .unwrap();
        buf.truncate(buf.len() - 4);
        assert!(read_node(&mut Cursor::new(buf)).is_err());
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        // Array node claiming u32::MAX elements.
        let mut buf = Vec::new();
        write_u8(&mut buf, NodeTag::Array as u8).unwrap();
        write_string(&mut buf, "a").unwrap();
        write_string(&mut buf, "int").unwrap();
        write_u32(&mut buf, u32::MAX).unwrap();
        assert!(matches!(
            read_node(&mut Cursor::new(buf)),
            Err(ReadError::Corrupt(_))
        ));
    }

    #[test]
    fn huge_count_with_no_elements_fails_without_a_huge_reserve() {
        // A count inside the allowed range but far beyond the stream's
        // content must die at end-of-stream, not in the allocator.
        let mut buf = Vec::new();
        write_u8(&mut buf, NodeTag::Array as u8).unwrap();
        write_string(&mut buf, "a").unwrap();
        write_string(&mut buf, "int").unwrap();
        write_u32(&mut buf, MAX_LEN - 1).unwrap();
        assert!(matches!(
            read_node(&mut Cursor::new(buf)),
            Err(ReadError::Io(_))
        ));
    }
}
