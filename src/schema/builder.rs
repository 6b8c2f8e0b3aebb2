use std::collections::HashSet;

use super::{DerivedSchema, SchemaField, SchemaKind};
use crate::reflect::{FieldDescriptor, FieldType};

fn schema_name(model: &str, kind: SchemaKind) -> String {
    format!("{model}{}", kind.suffix())
}

/// Projected fields, all optional; join-derived extras pass through.
#[must_use]
pub fn build_list(model: &str, fields: &[FieldDescriptor]) -> DerivedSchema {
    DerivedSchema {
        name: schema_name(model, SchemaKind::List),
        kind: SchemaKind::List,
        fields: fields
            .iter()
            .map(|descriptor| SchemaField {
                descriptor: descriptor.clone(),
                wire_type: descriptor.field_type.clone(),
                required: false,
                nullable: true,
            })
            .collect(),
        extra_allowed: true,
    }
}

/// Filterable fields, all optional. Anything that is not a bool, enum or string
/// travels as a string so it can carry an operator prefix such as `"[>]10"`.
#[must_use]
pub fn build_filter(model: &str, fields: &[FieldDescriptor]) -> DerivedSchema {
    DerivedSchema {
        name: schema_name(model, SchemaKind::Filter),
        kind: SchemaKind::Filter,
        fields: fields
            .iter()
            .map(|descriptor| SchemaField {
                descriptor: descriptor.clone(),
                wire_type: if descriptor.field_type.is_filter_native() {
                    descriptor.field_type.clone()
                } else {
                    FieldType::String
                },
                required: false,
                nullable: true,
            })
            .collect(),
        extra_allowed: false,
    }
}

/// Persisted columns minus `exclude`; required unless the column may be omitted on insert.
#[must_use]
pub fn build_create(model: &str, fields: &[FieldDescriptor], exclude: &HashSet<String>) -> DerivedSchema {
    DerivedSchema {
        name: schema_name(model, SchemaKind::Create),
        kind: SchemaKind::Create,
        fields: writable(fields, exclude)
            .map(|descriptor| SchemaField {
                descriptor: descriptor.clone(),
                wire_type: descriptor.field_type.clone(),
                required: !descriptor.is_optional_on_create(),
                nullable: descriptor.nullable,
            })
            .collect(),
        extra_allowed: false,
    }
}

/// Explicit read fields; `None` when nothing was opted in.
#[must_use]
pub fn build_read(model: &str, fields: &[FieldDescriptor]) -> Option<DerivedSchema> {
    if fields.is_empty() {
        return None;
    }
    Some(DerivedSchema {
        name: schema_name(model, SchemaKind::Read),
        kind: SchemaKind::Read,
        fields: fields
            .iter()
            .map(|descriptor| SchemaField {
                descriptor: descriptor.clone(),
                wire_type: descriptor.field_type.clone(),
                required: !descriptor.nullable,
                nullable: descriptor.nullable,
            })
            .collect(),
        extra_allowed: false,
    })
}

/// Persisted columns minus `exclude`, all optional.
#[must_use]
pub fn build_update(model: &str, fields: &[FieldDescriptor], exclude: &HashSet<String>) -> DerivedSchema {
    DerivedSchema {
        name: schema_name(model, SchemaKind::Update),
        kind: SchemaKind::Update,
        fields: writable(fields, exclude)
            .map(|descriptor| SchemaField {
                descriptor: descriptor.clone(),
                wire_type: descriptor.field_type.clone(),
                required: false,
                nullable: true,
            })
            .collect(),
        extra_allowed: false,
    }
}

fn writable<'a>(
    fields: &'a [FieldDescriptor],
    exclude: &'a HashSet<String>,
) -> impl Iterator<Item = &'a FieldDescriptor> {
    fields
        .iter()
        .filter(|descriptor| descriptor.is_column() && !exclude.contains(&descriptor.name))
}
