use clipstack_ids::ObjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown type `{0}`")]
    UnknownType(String),
    #[error("type `{0}` is not a component type")]
    NotAComponentType(String),
    #[error("object {0} does not exist")]
    InvalidObject(ObjectId),
    #[error("object {0} is not a scene node")]
    NotANode(ObjectId),
    #[error("object {0} is not a component")]
    NotAComponent(ObjectId),
    #[error("asset {0} is not a prefab")]
    NotAPrefab(ObjectId),
    #[error("object {0} is not editable")]
    NotEditable(ObjectId),
    #[error("object {object} has no property `{name}`")]
    MissingProperty { object: ObjectId, name: String },
}
