#![forbid(unsafe_code)]

pub mod arena;
pub mod error;
pub mod host;
pub mod managed;
pub mod object;
pub mod property;
pub mod registry;
pub mod undo;

pub use error::ModelError;
pub use host::Host;
pub use managed::{ManagedField, ManagedObject};
pub use object::{
    AssetData, ComponentData, EngineObject, HIDE_FLAG_DONT_SAVE, HIDE_FLAG_HIDDEN,
    HIDE_FLAG_NOT_EDITABLE, NodeData, ObjectKind,
};
pub use property::{
    ArrayProperty, CurveData, CurveKey, GenericProperty, GradientAlphaKey, GradientColorKey,
    GradientData, ObjectRef, PropertyKind, PropertySet, PropertyValue,
};
pub use registry::{TypeCategory, TypeDescriptor, TypeRegistry, TypeResolver};
pub use undo::{UndoJournal, UndoStep};
