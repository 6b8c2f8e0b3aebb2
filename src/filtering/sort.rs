use sea_orm::sea_query::{Order, SimpleExpr};

use crate::reflect::FieldDescriptor;

/// `desc` (any case) sorts descending; anything else ascending.
#[must_use]
pub fn parse_order(direction: Option<&str>) -> Order {
    match direction {
        Some(direction) if direction.trim().eq_ignore_ascii_case("desc") => Order::Desc,
        _ => Order::Asc,
    }
}

/// Find a field by wire alias in the first list that knows it.
#[must_use]
pub fn find_field<'a>(alias: &str, candidates: &[&'a [FieldDescriptor]]) -> Option<&'a FieldDescriptor> {
    candidates
        .iter()
        .find_map(|fields| fields.iter().find(|field| field.alias == alias))
}

/// Ordering for a list request.
///
/// A known `order_by` alias wins; otherwise the configured default applies.
#[must_use]
pub fn resolve_ordering(
    order_by: Option<&str>,
    order_dir: Option<&str>,
    candidates: &[&[FieldDescriptor]],
    default: &[(SimpleExpr, Order)],
) -> Vec<(SimpleExpr, Order)> {
    order_by
        .and_then(|alias| find_field(alias, candidates))
        .map_or_else(
            || default.to_vec(),
            |field| vec![(field.expr(), parse_order(order_dir))],
        )
}
