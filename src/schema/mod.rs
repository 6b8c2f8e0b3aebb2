//! Derived request/response shapes.
//!
//! A [`DerivedSchema`] is built from resolved [`FieldDescriptor`]s with one of
//! five policies ([`SchemaKind`]). Besides describing the wire shape it does the
//! coercion work: turning create/update payloads into storage values and
//! fetched rows into wire objects.

pub mod builder;
pub mod coerce;

use sea_orm::Value;
use serde_json::{Map, Value as JsonValue};

use crate::reflect::{FieldDescriptor, FieldType};
use crate::validation::{ValidationError, ValidationErrors, validators};

pub use builder::{build_create, build_filter, build_list, build_read, build_update};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    List,
    Filter,
    Create,
    Read,
    Update,
}

impl SchemaKind {
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::List => "List",
            Self::Filter => "Filter",
            Self::Create => "Create",
            Self::Read => "Read",
            Self::Update => "Update",
        }
    }
}

/// One entry of a derived schema.
#[derive(Debug, Clone)]
pub struct SchemaField {
    /// Private copy of the resolved descriptor.
    pub descriptor: FieldDescriptor,
    /// Type carried on the wire; differs from the column type for filters.
    pub wire_type: FieldType,
    pub required: bool,
    pub nullable: bool,
}

impl SchemaField {
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.descriptor.alias
    }
}

#[derive(Debug, Clone)]
pub struct DerivedSchema {
    pub name: String,
    pub kind: SchemaKind,
    pub fields: Vec<SchemaField>,
    pub extra_allowed: bool,
}

impl DerivedSchema {
    #[must_use]
    pub fn field(&self, alias: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|field| field.alias() == alias)
    }

    #[must_use]
    pub fn aliases(&self) -> Vec<&str> {
        self.fields.iter().map(SchemaField::alias).collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Coerce one create item into `(column, value)` pairs.
    ///
    /// Absent optional fields are left to the database, as are explicit nulls on
    /// non-nullable columns with a default. A primary key sent with a falsy value
    /// (`0`, `""`, `null`) is dropped so storage assigns it.
    ///
    /// # Errors
    /// Collects missing required fields, type mismatches and constraint violations.
    pub fn parse_create(&self, item: &JsonValue) -> Result<Vec<(String, Value)>, ValidationErrors> {
        let object = as_object(item)?;
        let mut errors = ValidationErrors::new();
        let mut values = Vec::new();

        for field in &self.fields {
            let descriptor = &field.descriptor;
            match object.get(descriptor.alias.as_str()) {
                Some(raw) if descriptor.primary_key && coerce::is_falsy(raw) => {}
                None | Some(JsonValue::Null) if field.required => {
                    errors.add(ValidationError::new(&descriptor.alias, "field required"));
                }
                None => {}
                // Non-nullable but optional: the column has a default, let storage fill it.
                Some(JsonValue::Null) if !descriptor.nullable => {}
                Some(JsonValue::Null) => {
                    values.push((descriptor.name.clone(), coerce::null_value(&descriptor.field_type)));
                }
                Some(raw) => {
                    if let Some(value) = coerce_checked(field, raw, &mut errors) {
                        values.push((descriptor.name.clone(), value));
                    }
                }
            }
        }

        errors.result().map(|()| values)
    }

    /// Coerce a partial update into `(column, value)` pairs.
    ///
    /// Only keys present in the payload are considered; explicit nulls survive
    /// only for nullable columns. An empty result is not an error here.
    ///
    /// # Errors
    /// Collects type mismatches and constraint violations.
    pub fn parse_update(&self, body: &JsonValue) -> Result<Vec<(String, Value)>, ValidationErrors> {
        let object = as_object(body)?;
        let mut errors = ValidationErrors::new();
        let mut values = Vec::new();

        for field in &self.fields {
            let descriptor = &field.descriptor;
            match object.get(descriptor.alias.as_str()) {
                None => {}
                Some(JsonValue::Null) => {
                    if descriptor.nullable {
                        values.push((descriptor.name.clone(), coerce::null_value(&descriptor.field_type)));
                    }
                }
                Some(raw) => {
                    if let Some(value) = coerce_checked(field, raw, &mut errors) {
                        values.push((descriptor.name.clone(), value));
                    }
                }
            }
        }

        errors.result().map(|()| values)
    }

    /// Shape a fetched row: every alias present (missing ones as `null`), values
    /// normalised to their wire form, extras kept only when allowed.
    #[must_use]
    pub fn shape_row(&self, row: JsonValue) -> JsonValue {
        let JsonValue::Object(mut source) = row else {
            return row;
        };

        let mut shaped = Map::new();
        for field in &self.fields {
            let value = source.remove(field.alias()).unwrap_or(JsonValue::Null);
            shaped.insert(
                field.alias().to_owned(),
                coerce::normalize_output(value, &field.descriptor.field_type),
            );
        }
        if self.extra_allowed {
            shaped.extend(source);
        }
        JsonValue::Object(shaped)
    }
}

fn as_object(body: &JsonValue) -> Result<&Map<String, JsonValue>, ValidationErrors> {
    body.as_object()
        .ok_or_else(|| ValidationError::new("body", "expected an object").into())
}

fn coerce_checked(field: &SchemaField, raw: &JsonValue, errors: &mut ValidationErrors) -> Option<Value> {
    let descriptor = &field.descriptor;
    let alias = descriptor.alias.as_str();
    let info = &descriptor.info;

    let value = match coerce::json_to_value(raw, &descriptor.field_type) {
        Ok(value) => value,
        Err(message) => {
            errors.add(ValidationError::new(alias, message));
            return None;
        }
    };

    let before = errors.len();
    if let Some(text) = raw.as_str() {
        errors.check(validators::validate_length(alias, text, info.min_length, info.max_length));
        if let FieldType::Enum(choices) = &descriptor.field_type {
            errors.check(validators::validate_choice(alias, text, choices));
        }
    }
    if descriptor.field_type.is_numeric()
        && let Some(number) = raw.as_f64().or_else(|| raw.as_str().and_then(|s| s.trim().parse().ok()))
    {
        errors.check(validators::validate_range(alias, number, info.ge, info.le));
    }

    (errors.len() == before).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::{FieldInfo, FieldRef, ModelMeta, Reflector};
    use serde_json::json;
    use std::collections::HashSet;

    mod note {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
        #[sea_orm(table_name = "note")]
        pub struct Model {
            #[sea_orm(primary_key)]
            pub id: i32,
            pub title: String,
            pub body: Option<String>,
            pub rating: i32,
            #[sea_orm(default_value = "0")]
            pub views: i32,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    fn fields(reflector: &Reflector) -> Vec<FieldDescriptor> {
        reflector.filter_instrumented(&[FieldRef::model::<note::Entity>()], false)
    }

    fn reflector() -> Reflector {
        let mut reflector = Reflector::new(ModelMeta::of::<note::Entity>());
        reflector.set_info("title", FieldInfo::new().length(Some(2), Some(10)));
        reflector.set_info("rating", FieldInfo::new().bounds(Some(1.0), Some(5.0)));
        reflector
    }

    fn exclude_id() -> HashSet<String> {
        HashSet::from(["id".to_string()])
    }

    #[test]
    fn test_create_reports_missing_required_fields() {
        let reflector = reflector();
        let schema = build_create("Note", &fields(&reflector), &exclude_id());
        let errors = schema.parse_create(&json!({"body": "x"})).unwrap_err();
        let fields: Vec<_> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "rating"]);
    }

    #[test]
    fn test_create_leaves_defaults_to_storage() {
        let reflector = reflector();
        let schema = build_create("Note", &fields(&reflector), &exclude_id());
        let values = schema.parse_create(&json!({"title": "hello", "rating": 3})).unwrap();
        let columns: Vec<_> = values.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, vec!["title", "rating"]);
    }

    #[test]
    fn test_create_null_on_defaulted_column_is_left_out() {
        let reflector = reflector();
        let schema = build_create("Note", &fields(&reflector), &exclude_id());
        let values = schema
            .parse_create(&json!({"title": "hello", "rating": 3, "views": null, "body": null}))
            .unwrap();
        let columns: Vec<_> = values.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(columns, vec!["title", "body", "rating"]);
        assert_eq!(values[1].1, Value::String(None));
    }

    #[test]
    fn test_create_strips_falsy_primary_key() {
        let reflector = reflector();
        let schema = build_create("Note", &fields(&reflector), &HashSet::new());
        let values = schema
            .parse_create(&json!({"id": 0, "title": "hello", "rating": 3}))
            .unwrap();
        assert!(values.iter().all(|(column, _)| column != "id"));

        let explicit = schema
            .parse_create(&json!({"id": 9, "title": "hello", "rating": 3}))
            .unwrap();
        assert_eq!(explicit[0], ("id".to_string(), Value::BigInt(Some(9))));
    }

    #[test]
    fn test_create_checks_constraints() {
        let reflector = reflector();
        let schema = build_create("Note", &fields(&reflector), &exclude_id());
        let errors = schema
            .parse_create(&json!({"title": "a", "rating": 9}))
            .unwrap_err();
        assert_eq!(errors.len(), 2);
        let errors = schema
            .parse_create(&json!({"title": "fine", "rating": "many"}))
            .unwrap_err();
        assert_eq!(errors.errors()[0].message, "expected an integer");
    }

    #[test]
    fn test_update_drops_unset_and_non_nullable_nulls() {
        let reflector = reflector();
        let schema = build_update("Note", &fields(&reflector), &exclude_id());
        let values = schema
            .parse_update(&json!({"body": null, "title": null}))
            .unwrap();
        assert_eq!(values, vec![("body".to_string(), Value::String(None))]);

        assert!(schema.parse_update(&json!({})).unwrap().is_empty());
        assert!(schema.parse_update(&json!({"unknown": 1})).unwrap().is_empty());
    }

    #[test]
    fn test_payload_must_be_an_object() {
        let reflector = reflector();
        let schema = build_update("Note", &fields(&reflector), &exclude_id());
        assert!(schema.parse_update(&json!([1, 2])).is_err());
    }

    #[test]
    fn test_shape_row_fills_missing_aliases() {
        let reflector = reflector();
        let list = build_list("Note", &fields(&reflector));
        let shaped = list.shape_row(json!({"id": 1, "title": "t", "extra": true}));
        assert_eq!(shaped["body"], JsonValue::Null);
        assert_eq!(shaped["extra"], json!(true));

        let read = build_read("Note", &fields(&reflector)).unwrap();
        let shaped = read.shape_row(json!({"id": 1, "extra": true}));
        assert!(shaped.get("extra").is_none());
    }
}
