//! Render derived schemas as OpenAPI component schemas.
//!
//! Schemas here are built at runtime from reflected metadata, so they are
//! assembled with utoipa's builders instead of `#[derive(ToSchema)]`.

use serde_json::{Map, Value as JsonValue};
use utoipa::openapi::{
    Components, ComponentsBuilder, InfoBuilder, OpenApi, OpenApiBuilder, RefOr,
    schema::{AdditionalProperties, KnownFormat, ObjectBuilder, Schema, SchemaFormat, SchemaType, Type},
};

use crate::core::Orchestrator;
use crate::reflect::FieldType;
use crate::schema::{DerivedSchema, SchemaField};

fn base_type(field_type: &FieldType) -> (Option<Type>, Option<SchemaFormat>) {
    match field_type {
        FieldType::Bool => (Some(Type::Boolean), None),
        FieldType::Integer => (Some(Type::Integer), Some(SchemaFormat::KnownFormat(KnownFormat::Int64))),
        FieldType::Float | FieldType::Decimal => {
            (Some(Type::Number), Some(SchemaFormat::KnownFormat(KnownFormat::Double)))
        }
        FieldType::String | FieldType::Text | FieldType::Enum(_) => (Some(Type::String), None),
        FieldType::Date => (Some(Type::String), Some(SchemaFormat::KnownFormat(KnownFormat::Date))),
        FieldType::DateTime | FieldType::DateTimeTz => {
            (Some(Type::String), Some(SchemaFormat::KnownFormat(KnownFormat::DateTime)))
        }
        FieldType::Time => (Some(Type::String), Some(SchemaFormat::Custom("time".to_owned()))),
        FieldType::Uuid => (Some(Type::String), Some(SchemaFormat::Custom("uuid".to_owned()))),
        FieldType::Binary => (Some(Type::String), Some(SchemaFormat::KnownFormat(KnownFormat::Binary))),
        FieldType::Json => (None, None),
    }
}

/// Schema of one field. Nullable fields are typed `[T, "null"]`.
#[must_use]
pub fn field_schema(field: &SchemaField) -> Schema {
    let descriptor = &field.descriptor;
    let info = &descriptor.info;
    let (kind, format) = base_type(&field.wire_type);

    let schema_type = match kind {
        None => SchemaType::AnyValue,
        Some(kind) if field.nullable => SchemaType::from_iter([kind, Type::Null]),
        Some(kind) => SchemaType::Type(kind),
    };

    let mut builder = ObjectBuilder::new()
        .schema_type(schema_type)
        .format(format)
        .title(Some(descriptor.title.clone()))
        .description(info.description.clone());

    if let FieldType::Enum(choices) = &field.wire_type {
        builder = builder.enum_values(Some(choices.iter().cloned()));
    }
    if matches!(field.wire_type, FieldType::String | FieldType::Text) {
        builder = builder.min_length(info.min_length).max_length(info.max_length);
    }
    if field.wire_type.is_numeric() {
        builder = builder.minimum(info.ge).maximum(info.le);
    }

    Schema::Object(builder.build())
}

/// Object schema of a whole derived schema.
#[must_use]
pub fn schema_of(schema: &DerivedSchema) -> Schema {
    let mut builder = ObjectBuilder::new().schema_type(Type::Object).title(Some(schema.name.clone()));
    for field in &schema.fields {
        builder = builder.property(field.alias(), RefOr::T(field_schema(field)));
        if field.required {
            builder = builder.required(field.alias());
        }
    }
    if schema.extra_allowed {
        builder = builder.additional_properties(Some(AdditionalProperties::FreeForm(true)));
    }
    Schema::Object(builder.build())
}

/// `{name: schema}` for the given derived schemas, as plain JSON.
#[must_use]
pub fn schema_map<'a>(schemas: impl IntoIterator<Item = &'a DerivedSchema>) -> JsonValue {
    let map: Map<String, JsonValue> = schemas
        .into_iter()
        .map(|schema| {
            let rendered = serde_json::to_value(schema_of(schema)).unwrap_or(JsonValue::Null);
            (schema.name.clone(), rendered)
        })
        .collect();
    JsonValue::Object(map)
}

#[must_use]
pub fn components<'a>(schemas: impl IntoIterator<Item = &'a DerivedSchema>) -> Components {
    schemas
        .into_iter()
        .fold(ComponentsBuilder::new(), |builder, schema| {
            builder.schema(schema.name.clone(), RefOr::T(schema_of(schema)))
        })
        .build()
}

/// OpenAPI document carrying every registered admin's schemas as components.
#[must_use]
pub fn document<'a>(title: &str, version: &str, admins: impl IntoIterator<Item = &'a Orchestrator>) -> OpenApi {
    let schemas: Vec<&DerivedSchema> = admins.into_iter().flat_map(Orchestrator::schemas).collect();
    OpenApiBuilder::new()
        .info(InfoBuilder::new().title(title).version(version))
        .components(Some(components(schemas)))
        .build()
}
