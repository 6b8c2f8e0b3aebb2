//! Field reflection: entity metadata, field references and their resolution into
//! [`FieldDescriptor`]s with stable wire aliases.

pub mod field_ref;
pub mod meta;

pub use field_ref::{FieldDescriptor, FieldInfo, FieldRef, FieldSource, LabelField, Reflector};
pub use meta::{FieldType, ForeignKey, ModelField, ModelMeta, RelationshipMeta, humanize};
