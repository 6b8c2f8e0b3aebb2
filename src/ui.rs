//! Page-building hand-off: plain data objects describing form items and table
//! columns.
//!
//! These render with `null`s omitted and camelCase keys. The core only decides
//! which widget a field uses; layout belongs to the page builder consuming them.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::reflect::{FieldDescriptor, FieldType};
use crate::schema::DerivedSchema;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// One input of a create/update form.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormItem {
    #[serde(rename = "type")]
    pub widget: String,
    pub name: String,
    pub label: String,
    pub required: Option<bool>,
    pub description: Option<String>,
    pub options: Option<Vec<SelectOption>>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// One column of the list table.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableColumn {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sortable: bool,
    pub searchable: Option<bool>,
}

/// Widget for a field: the explicit override, else one picked from the field type.
#[must_use]
pub fn widget_for(descriptor: &FieldDescriptor) -> String {
    if let Some(widget) = &descriptor.info.widget {
        return widget.clone();
    }
    let widget = match &descriptor.field_type {
        FieldType::Bool => "switch",
        FieldType::Integer | FieldType::Float | FieldType::Decimal => "input-number",
        FieldType::Date => "input-date",
        FieldType::DateTime | FieldType::DateTimeTz => "input-datetime",
        FieldType::Time => "input-time",
        FieldType::Enum(_) => "select",
        FieldType::Text => "textarea",
        FieldType::Json => "json-editor",
        FieldType::String | FieldType::Uuid | FieldType::Binary => "input-text",
    };
    widget.to_owned()
}

fn column_kind(field_type: &FieldType) -> Option<&'static str> {
    match field_type {
        FieldType::Bool => Some("status"),
        FieldType::Date | FieldType::DateTime | FieldType::DateTimeTz => Some("date"),
        FieldType::Json => Some("json"),
        _ => None,
    }
}

impl FormItem {
    #[must_use]
    pub fn from_descriptor(descriptor: &FieldDescriptor, required: bool) -> Self {
        let info = &descriptor.info;
        let options = match &descriptor.field_type {
            FieldType::Enum(choices) => Some(
                choices
                    .iter()
                    .map(|choice| SelectOption {
                        label: choice.clone(),
                        value: choice.clone(),
                    })
                    .collect(),
            ),
            _ => None,
        };
        Self {
            widget: widget_for(descriptor),
            name: descriptor.alias.clone(),
            label: descriptor.title.clone(),
            required: required.then_some(true),
            description: info.description.clone(),
            options,
            min_length: info.min_length,
            max_length: info.max_length,
            min: info.ge,
            max: info.le,
        }
    }
}

impl TableColumn {
    #[must_use]
    pub fn from_descriptor(descriptor: &FieldDescriptor, searchable: bool) -> Self {
        Self {
            name: descriptor.alias.clone(),
            label: descriptor.title.clone(),
            kind: column_kind(&descriptor.field_type).map(str::to_owned),
            sortable: true,
            searchable: searchable.then_some(true),
        }
    }
}

/// Form items for every field of a create or update schema.
#[must_use]
pub fn form_items(schema: &DerivedSchema) -> Vec<FormItem> {
    schema
        .fields
        .iter()
        .map(|field| FormItem::from_descriptor(&field.descriptor, field.required))
        .collect()
}

/// Table columns for a list schema; filterable aliases are flagged searchable.
#[must_use]
pub fn table_columns(list: &DerivedSchema, filter: &DerivedSchema) -> Vec<TableColumn> {
    list.fields
        .iter()
        .map(|field| TableColumn::from_descriptor(&field.descriptor, filter.field(field.alias()).is_some()))
        .collect()
}

/// Render a UI object without `null`s.
#[must_use]
pub fn to_json<T: Serialize>(item: &T) -> JsonValue {
    serde_json::to_value(item).unwrap_or(JsonValue::Null)
}
