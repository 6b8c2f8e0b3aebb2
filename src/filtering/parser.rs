//! Bracket-operator filter expressions.
//!
//! A filter value may start with an operator token in square brackets; the
//! remainder is the literal. This is a wire protocol shared with frontend query
//! builders, so the token set is fixed:
//!
//! | token | operator | literals |
//! |---|---|---|
//! | `[=]` | equals | 1 |
//! | `[<]` `[<=]` `[>]` `[>=]` | ordering | 1 |
//! | `[!]` `[!=]` `[<>]` | not-equals | 1 |
//! | `[*]` | in-set | comma list |
//! | `[!*]` | not-in-set | comma list |
//! | `[~]` | like (`%..%` added when the literal has no `%`) | 1 |
//! | `[!~]` | not-like | 1 |
//! | `[-]` | between | first two of a comma list |
//!
//! Without a token the whole string is an equality literal. An empty literal
//! produces no predicate.

use sea_orm::{
    Value,
    sea_query::{Expr, SimpleExpr},
};
use serde_json::Value as JsonValue;

use crate::reflect::{FieldDescriptor, FieldType};
use crate::schema::coerce::{json_to_value, literal_to_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
    Like,
    NotLike,
    Between,
}

impl FilterOperator {
    /// Operator for the text between the brackets of a token.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "=" => Self::Eq,
            "!" | "!=" | "<>" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "*" => Self::In,
            "!*" => Self::NotIn,
            "~" => Self::Like,
            "!~" => Self::NotLike,
            "-" => Self::Between,
            _ => return None,
        })
    }

    /// Canonical token symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "*",
            Self::NotIn => "!*",
            Self::Like => "~",
            Self::NotLike => "!~",
            Self::Between => "-",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterLiteral {
    Single(Value),
    Many(Vec<Value>),
    Range(Value, Value),
}

/// A parsed filter ready to become a `WHERE` clause.
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    pub field: FieldDescriptor,
    pub operator: FilterOperator,
    pub literal: FilterLiteral,
}

impl FilterPredicate {
    #[must_use]
    pub fn to_condition(&self) -> SimpleExpr {
        let column = Expr::expr(self.field.expr());
        match (&self.operator, &self.literal) {
            (FilterOperator::Eq, FilterLiteral::Single(v)) => column.eq(v.clone()),
            (FilterOperator::Ne, FilterLiteral::Single(v)) => column.ne(v.clone()),
            (FilterOperator::Lt, FilterLiteral::Single(v)) => column.lt(v.clone()),
            (FilterOperator::Le, FilterLiteral::Single(v)) => column.lte(v.clone()),
            (FilterOperator::Gt, FilterLiteral::Single(v)) => column.gt(v.clone()),
            (FilterOperator::Ge, FilterLiteral::Single(v)) => column.gte(v.clone()),
            (FilterOperator::Like, FilterLiteral::Single(v)) => column.like(like_pattern(v)),
            (FilterOperator::NotLike, FilterLiteral::Single(v)) => column.not_like(like_pattern(v)),
            (FilterOperator::NotIn, FilterLiteral::Many(values)) => column.is_not_in(values.clone()),
            (FilterOperator::Between, FilterLiteral::Range(low, high)) => {
                column.between(low.clone(), high.clone())
            }
            (_, FilterLiteral::Many(values)) => column.is_in(values.clone()),
            (_, FilterLiteral::Single(v)) => column.eq(v.clone()),
            (_, FilterLiteral::Range(low, high)) => column.between(low.clone(), high.clone()),
        }
    }
}

// Like literals are built as strings by `parse_expression`.
fn like_pattern(value: &Value) -> String {
    match value {
        Value::String(Some(s)) => s.to_string(),
        _ => "%".to_string(),
    }
}

/// Parse a raw filter value for `field`.
///
/// `null` and objects mean "not filtered". Numbers and booleans are equality
/// literals; arrays are in-set literals; strings go through the bracket grammar.
#[must_use]
pub fn parse(raw: &JsonValue, field: &FieldDescriptor) -> Option<FilterPredicate> {
    let (operator, literal) = match raw {
        JsonValue::Null | JsonValue::Object(_) => return None,
        JsonValue::String(text) => parse_expression(text, &field.field_type)?,
        JsonValue::Array(items) => {
            let values = dedup(items.iter().map(|item| json_literal(item, &field.field_type)));
            if values.is_empty() {
                return None;
            }
            (FilterOperator::In, FilterLiteral::Many(values))
        }
        other => (
            FilterOperator::Eq,
            FilterLiteral::Single(json_literal(other, &field.field_type)),
        ),
    };

    Some(FilterPredicate {
        field: field.clone(),
        operator,
        literal,
    })
}

fn json_literal(raw: &JsonValue, field_type: &FieldType) -> Value {
    match raw {
        JsonValue::String(text) => literal_to_value(text, field_type),
        other => json_to_value(other, field_type).unwrap_or_else(|_| Value::from(other.to_string())),
    }
}

/// Split an optional leading `[op]` token off `raw`.
#[must_use]
pub fn split_operator(raw: &str) -> (Option<FilterOperator>, &str) {
    if let Some(rest) = raw.strip_prefix('[')
        && let Some(end) = rest.find(']')
        && let Some(operator) = FilterOperator::from_symbol(&rest[..end])
    {
        return (Some(operator), &rest[end + 1..]);
    }
    (None, raw)
}

/// Parse the bracket grammar and coerce literals to `field_type`.
#[must_use]
pub fn parse_expression(raw: &str, field_type: &FieldType) -> Option<(FilterOperator, FilterLiteral)> {
    let (operator, remainder) = split_operator(raw);
    if remainder.is_empty() {
        return None;
    }
    let operator = operator.unwrap_or(FilterOperator::Eq);

    let literal = match operator {
        FilterOperator::In | FilterOperator::NotIn => {
            let values = dedup(split_list(remainder).map(|item| literal_to_value(item, field_type)));
            if values.is_empty() {
                return None;
            }
            FilterLiteral::Many(values)
        }
        FilterOperator::Between => {
            let mut bounds = remainder.split(',').map(str::trim);
            match (bounds.next(), bounds.next()) {
                (Some(low), Some(high)) if !low.is_empty() && !high.is_empty() => FilterLiteral::Range(
                    literal_to_value(low, field_type),
                    literal_to_value(high, field_type),
                ),
                _ => return None,
            }
        }
        FilterOperator::Like | FilterOperator::NotLike => {
            let pattern = if remainder.contains('%') {
                remainder.to_owned()
            } else {
                format!("%{remainder}%")
            };
            FilterLiteral::Single(Value::from(pattern))
        }
        _ => FilterLiteral::Single(literal_to_value(remainder, field_type)),
    };

    Some((operator, literal))
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn dedup(values: impl Iterator<Item = Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::new();
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use serde_json::json;

    fn int(v: i64) -> Value {
        Value::BigInt(Some(v))
    }

    fn op(raw: &str) -> Option<(FilterOperator, FilterLiteral)> {
        parse_expression(raw, &FieldType::Integer)
    }

    #[test]
    fn test_every_symbol_maps_to_its_operator() {
        let cases = [
            ("=", FilterOperator::Eq),
            ("<", FilterOperator::Lt),
            ("<=", FilterOperator::Le),
            (">", FilterOperator::Gt),
            (">=", FilterOperator::Ge),
            ("!", FilterOperator::Ne),
            ("!=", FilterOperator::Ne),
            ("<>", FilterOperator::Ne),
        ];
        for (symbol, expected) in cases {
            assert_eq!(
                op(&format!("[{symbol}]10")),
                Some((expected, FilterLiteral::Single(int(10)))),
                "symbol {symbol}"
            );
        }
        assert_eq!(op("[*]1"), Some((FilterOperator::In, FilterLiteral::Many(vec![int(1)]))));
        assert_eq!(op("[!*]1"), Some((FilterOperator::NotIn, FilterLiteral::Many(vec![int(1)]))));
        assert_eq!(
            op("[-]1,2"),
            Some((FilterOperator::Between, FilterLiteral::Range(int(1), int(2))))
        );
    }

    #[test]
    fn test_no_token_means_equality() {
        assert_eq!(op("7"), Some((FilterOperator::Eq, FilterLiteral::Single(int(7)))));
        assert_eq!(
            parse_expression("[draft]", &FieldType::String),
            Some((FilterOperator::Eq, FilterLiteral::Single(Value::from("[draft]".to_string()))))
        );
    }

    #[test]
    fn test_empty_literal_yields_nothing() {
        assert_eq!(op(""), None);
        assert_eq!(op("[>]"), None);
        assert_eq!(op("[*]"), None);
        assert_eq!(op("[*] , "), None);
    }

    #[test]
    fn test_between_truncates_to_two() {
        assert_eq!(
            op("[-]1,2,3"),
            Some((FilterOperator::Between, FilterLiteral::Range(int(1), int(2))))
        );
        assert_eq!(op("[-]1"), None);
    }

    #[test]
    fn test_between_with_an_empty_bound_yields_nothing() {
        assert_eq!(op("[-],2,4"), None);
        assert_eq!(op("[-]2,,4"), None);
        assert_eq!(op("[-]2,"), None);
    }

    #[test]
    fn test_in_set_is_deduplicated() {
        assert_eq!(
            op("[*]1,2,2,3"),
            Some((FilterOperator::In, FilterLiteral::Many(vec![int(1), int(2), int(3)])))
        );
    }

    #[test]
    fn test_like_wraps_only_without_wildcards() {
        let like = |raw| parse_expression(raw, &FieldType::String).unwrap().1;
        assert_eq!(like("[~]rust"), FilterLiteral::Single(Value::from("%rust%".to_string())));
        assert_eq!(like("[~]rust%"), FilterLiteral::Single(Value::from("rust%".to_string())));
        assert_eq!(like("[!~]x"), FilterLiteral::Single(Value::from("%x%".to_string())));
        // literal keeps its text even on numeric fields
        assert_eq!(op("[~]12").unwrap().1, FilterLiteral::Single(Value::from("%12%".to_string())));
    }

    #[test]
    fn test_datetime_range_literals() {
        let (operator, literal) = parse_expression(
            "[-]2022-01-02 00:00:00,2022-01-04 01:00:00",
            &FieldType::DateTime,
        )
        .unwrap();
        assert_eq!(operator, FilterOperator::Between);
        let at = |raw| Value::from(NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").unwrap());
        assert_eq!(
            literal,
            FilterLiteral::Range(at("2022-01-02 00:00:00"), at("2022-01-04 01:00:00"))
        );
    }

    #[test]
    fn test_split_operator() {
        assert_eq!(split_operator("[>=]5"), (Some(FilterOperator::Ge), "5"));
        assert_eq!(split_operator("[?]5"), (None, "[?]5"));
        assert_eq!(split_operator("[>=5"), (None, "[>=5"));
    }

    #[test]
    fn test_symbols_round_trip() {
        for symbol in ["=", "<", "<=", ">", ">=", "!=", "*", "!*", "~", "!~", "-"] {
            let operator = FilterOperator::from_symbol(symbol).unwrap();
            assert_eq!(operator.symbol(), symbol);
        }
    }

    #[test]
    fn test_non_string_raw_values() {
        let reflector = crate::reflect::Reflector::new(crate::reflect::ModelMeta {
            name: "Thing".into(),
            table: "thing".into(),
            fields: vec![crate::reflect::ModelField {
                table: "thing".into(),
                name: "size".into(),
                field_type: FieldType::Integer,
                nullable: false,
                unique: false,
                has_default: false,
                primary_key: false,
                auto_increment: false,
                max_length: None,
            }],
            foreign_keys: vec![],
        });
        let field = reflector.resolve(&"size".into()).remove(0);

        let predicate = parse(&json!(4), &field).unwrap();
        assert_eq!(predicate.operator, FilterOperator::Eq);
        assert_eq!(predicate.literal, FilterLiteral::Single(int(4)));

        let predicate = parse(&json!([1, 1, 2]), &field).unwrap();
        assert_eq!(predicate.literal, FilterLiteral::Many(vec![int(1), int(2)]));

        assert!(parse(&json!(null), &field).is_none());
        assert!(parse(&json!({"a": 1}), &field).is_none());
    }
}
