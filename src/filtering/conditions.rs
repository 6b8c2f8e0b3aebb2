use sea_orm::Condition;
use serde_json::{Map, Value as JsonValue};

use super::parser::{FilterPredicate, parse};
use crate::reflect::FieldDescriptor;

// Basic safety limits
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

fn is_valid_field_name(field_name: &str) -> bool {
    !field_name.is_empty() && field_name.len() <= 100
}

fn is_within_limits(value: &JsonValue) -> bool {
    match value {
        JsonValue::String(text) => text.len() <= MAX_FIELD_VALUE_LENGTH,
        JsonValue::Array(items) => items.len() <= MAX_FIELD_VALUE_LENGTH,
        _ => true,
    }
}

/// Parse a filter body against the filterable fields.
///
/// Keys that match no filterable alias are ignored, as are values that parse to
/// no predicate. Predicates follow the order of `filterable`.
#[must_use]
pub fn parse_filters(body: &JsonValue, filterable: &[FieldDescriptor]) -> Vec<FilterPredicate> {
    let Some(filters) = body.as_object() else {
        return Vec::new();
    };

    for key in filters.keys() {
        if !filterable.iter().any(|field| &field.alias == key) {
            tracing::trace!(field = %key, "Ignoring unknown filter key");
        }
    }

    filterable
        .iter()
        .filter(|field| is_valid_field_name(&field.alias))
        .filter_map(|field| {
            let raw = filters.get(field.alias.as_str())?;
            if !is_within_limits(raw) {
                tracing::debug!(field = %field.alias, "Skipping oversized filter value");
                return None;
            }
            parse(raw, field)
        })
        .collect()
}

/// AND of every predicate.
#[must_use]
pub fn apply_filters(predicates: &[FilterPredicate]) -> Condition {
    predicates
        .iter()
        .fold(Condition::all(), |condition, predicate| condition.add(predicate.to_condition()))
}

/// Raw values of the filters that took effect, keyed by alias.
#[must_use]
pub fn echo_filters(body: &JsonValue, predicates: &[FilterPredicate]) -> JsonValue {
    let mut echo = Map::new();
    for predicate in predicates {
        if let Some(raw) = body.get(predicate.field.alias.as_str()) {
            echo.insert(predicate.field.alias.clone(), raw.clone());
        }
    }
    JsonValue::Object(echo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::parser::FilterOperator;
    use crate::reflect::{FieldRef, FieldType, ModelField, ModelMeta, Reflector};
    use serde_json::json;

    fn filterable() -> Vec<FieldDescriptor> {
        let column = |name: &str, field_type: FieldType| ModelField {
            table: "task".into(),
            name: name.into(),
            field_type,
            nullable: false,
            unique: false,
            has_default: false,
            primary_key: name == "id",
            auto_increment: name == "id",
            max_length: None,
        };
        let meta = ModelMeta {
            name: "Task".into(),
            table: "task".into(),
            fields: vec![
                column("id", FieldType::Integer),
                column("title", FieldType::String),
                column("done", FieldType::Bool),
            ],
            foreign_keys: vec![],
        };
        Reflector::new(meta.clone()).filter_instrumented(&[FieldRef::Model(meta)], false)
    }

    #[test]
    fn test_unknown_keys_and_empty_values_are_ignored() {
        let predicates = parse_filters(
            &json!({"id": "[>]2", "bogus": "1", "title": "", "done": null}),
            &filterable(),
        );
        assert_eq!(predicates.len(), 1);
        assert_eq!(predicates[0].field.alias, "id");
        assert_eq!(predicates[0].operator, FilterOperator::Gt);
    }

    #[test]
    fn test_non_object_body_yields_nothing() {
        assert!(parse_filters(&json!("id=1"), &filterable()).is_empty());
        assert!(parse_filters(&json!(null), &filterable()).is_empty());
    }

    #[test]
    fn test_oversized_values_are_skipped() {
        let huge = "x".repeat(MAX_FIELD_VALUE_LENGTH + 1);
        assert!(parse_filters(&json!({ "title": huge }), &filterable()).is_empty());
    }

    #[test]
    fn test_condition_combines_predicates() {
        let predicates = parse_filters(&json!({"id": "[*]1,2", "done": true}), &filterable());
        assert_eq!(predicates.len(), 2);
        assert!(!apply_filters(&predicates).is_empty());
        assert!(apply_filters(&[]).is_empty());
    }

    #[test]
    fn test_echo_only_applied_filters() {
        let body = json!({"id": "[>]2", "title": "", "bogus": 1});
        let predicates = parse_filters(&body, &filterable());
        assert_eq!(echo_filters(&body, &predicates), json!({"id": "[>]2"}));
    }
}
