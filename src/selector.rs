//! Query building for one admin: projection, joins, filters, ordering and the
//! link-table clauses, independent of HTTP.

use std::collections::HashMap;

use sea_orm::{
    Condition, RelationDef, Value,
    sea_query::{
        Alias, Asterisk, Expr, JoinType, Order, Query,
        SelectStatement, SimpleExpr,
    },
};
use serde_json::Value as JsonValue;

use crate::filtering::{self, FilterPredicate};
use crate::link::LinkAssociation;
use crate::reflect::{FieldDescriptor, FieldRef, FieldType, Reflector, meta};
use crate::schema::coerce::literal_to_value;

/// Alias of the count column in [`Selector::count_select`].
pub const COUNT_ALIAS: &str = "num_items";

/// A `LEFT JOIN` captured from a sea-orm relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    pub table: String,
    pub on: ((String, String), (String, String)),
}

impl JoinSpec {
    /// Join towards whichever side of `def` is not `base_table`.
    ///
    /// Relations over composite keys are not supported.
    #[must_use]
    pub fn from_relation(base_table: &str, def: &RelationDef) -> Option<Self> {
        let from_table = meta::table_name(&def.from_tbl)?;
        let to_table = meta::table_name(&def.to_tbl)?;
        let from_col = meta::single_column(&def.from_col)?;
        let to_col = meta::single_column(&def.to_col)?;
        let table = if to_table == base_table {
            from_table.clone()
        } else {
            to_table.clone()
        };
        Some(Self {
            table,
            on: ((from_table, from_col), (to_table, to_col)),
        })
    }

    fn apply(&self, select: &mut SelectStatement) {
        let ((from_table, from_col), (to_table, to_col)) = &self.on;
        select.join(
            JoinType::LeftJoin,
            Alias::new(self.table.as_str()),
            Expr::col((Alias::new(from_table.as_str()), Alias::new(from_col.as_str())))
                .equals((Alias::new(to_table.as_str()), Alias::new(to_col.as_str()))),
        );
    }
}

/// Per-admin query configuration.
#[derive(Debug)]
pub struct Selector {
    reflector: Reflector,
    primary_key: FieldDescriptor,
    fields: Vec<FieldDescriptor>,
    list_filter: Vec<FieldDescriptor>,
    ordering: Vec<(SimpleExpr, Order)>,
    joins: Vec<JoinSpec>,
    links: HashMap<String, LinkAssociation>,
}

impl Selector {
    /// Assemble a selector.
    ///
    /// `fields` falls back to every column of the default model when empty, and
    /// always starts with the primary key. `ordering` falls back to the primary
    /// key ascending.
    #[must_use]
    pub fn new(
        reflector: Reflector,
        primary_key: FieldDescriptor,
        fields: Vec<FieldDescriptor>,
        list_filter: Vec<FieldDescriptor>,
        ordering: Vec<(SimpleExpr, Order)>,
        joins: Vec<JoinSpec>,
    ) -> Self {
        let mut fields = if fields.is_empty() {
            reflector.filter_instrumented(&[FieldRef::Model(reflector.model().clone())], false)
        } else {
            fields
        };
        if !fields.iter().any(|field| field.alias == primary_key.alias) {
            fields.insert(0, primary_key.clone());
        }
        let ordering = if ordering.is_empty() {
            vec![(primary_key.expr(), Order::Asc)]
        } else {
            ordering
        };

        Self {
            reflector,
            primary_key,
            fields,
            list_filter,
            ordering,
            joins,
            links: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn reflector(&self) -> &Reflector {
        &self.reflector
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.reflector.model().table
    }

    #[must_use]
    pub const fn primary_key(&self) -> &FieldDescriptor {
        &self.primary_key
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    #[must_use]
    pub fn list_filter(&self) -> &[FieldDescriptor] {
        &self.list_filter
    }

    #[must_use]
    pub fn link(&self, related_table: &str) -> Option<&LinkAssociation> {
        self.links.get(related_table)
    }

    /// Register a link association keyed by the related table. Assembly-time only.
    pub fn register_link(&mut self, related_table: impl Into<String>, link: LinkAssociation) {
        self.links.insert(related_table.into(), link);
    }

    /// Projection of `fields` (the configured projection when `None`) over the joins.
    #[must_use]
    pub fn base_select(&self, fields: Option<&[FieldDescriptor]>) -> SelectStatement {
        let mut select = Query::select();
        select.from(Alias::new(self.table()));
        let fields = fields.unwrap_or(&self.fields);
        if !fields.iter().any(|field| field.alias == self.primary_key.alias) {
            select.expr_as(self.primary_key.expr(), Alias::new(self.primary_key.alias.as_str()));
        }
        for field in fields {
            select.expr_as(field.expr(), Alias::new(field.alias.as_str()));
        }
        for join in &self.joins {
            join.apply(&mut select);
        }
        select
    }

    /// Only the primary key, over the same joins; used to find visible ids.
    #[must_use]
    pub fn key_select(&self) -> SelectStatement {
        let mut select = Query::select();
        select
            .from(Alias::new(self.table()))
            .expr_as(self.primary_key.expr(), Alias::new(self.primary_key.alias.as_str()));
        for join in &self.joins {
            join.apply(&mut select);
        }
        select
    }

    /// `SELECT COUNT(*)` over `select` as a subquery.
    #[must_use]
    pub fn count_select(select: SelectStatement) -> SelectStatement {
        let mut count = Query::select();
        count
            .expr_as(Expr::col(Asterisk).count(), Alias::new(COUNT_ALIAS))
            .from_subquery(select, Alias::new("counted"));
        count
    }

    /// Parse a filter body against `list_filter`.
    #[must_use]
    pub fn apply_filters(&self, body: &JsonValue) -> Vec<FilterPredicate> {
        filtering::parse_filters(body, &self.list_filter)
    }

    /// Ordering for a request; unknown aliases fall back to the default ordering.
    #[must_use]
    pub fn apply_ordering(&self, order_by: Option<&str>, order_dir: Option<&str>) -> Vec<(SimpleExpr, Order)> {
        let mut ordering = filtering::resolve_ordering(
            order_by,
            order_dir,
            &[self.fields.as_slice(), self.list_filter.as_slice()],
            &self.ordering,
        );
        // Primary key breaks ties so paging is stable.
        let key = self.primary_key.expr();
        if !ordering.iter().any(|(expr, _)| *expr == key) {
            ordering.push((key, Order::Asc));
        }
        ordering
    }

    /// Link-table restriction for rows related to `related_ids` of `related_table`.
    ///
    /// `None` when no association is registered for that table or no id survives parsing.
    #[must_use]
    pub fn apply_link_clause(&self, related_table: &str, related_ids: &str, negate: bool) -> Option<SimpleExpr> {
        let link = self.links.get(related_table)?;
        let ids = parse_ids(related_ids, &link.remote_key_type);
        if ids.is_empty() {
            return None;
        }
        Some(link.clause(self.primary_key.expr(), ids, negate))
    }

    /// `pk IN ids`
    #[must_use]
    pub fn key_in(&self, ids: Vec<Value>) -> SimpleExpr {
        Expr::expr(self.primary_key.expr()).is_in(ids)
    }

    /// Unqualified `pk IN ids`, for `UPDATE` and `DELETE`.
    #[must_use]
    pub fn bare_key_in(&self, ids: Vec<Value>) -> SimpleExpr {
        Expr::col(Alias::new(self.primary_key.name.as_str())).is_in(ids)
    }

    /// Add ordering, scope and filter clauses to a select.
    pub fn restrict(select: &mut SelectStatement, scope: Option<Condition>, condition: Condition) {
        if let Some(scope) = scope {
            select.cond_where(scope);
        }
        if !condition.is_empty() {
            select.cond_where(condition);
        }
    }

    pub fn order(select: &mut SelectStatement, ordering: Vec<(SimpleExpr, Order)>) {
        for (expr, order) in ordering {
            select.order_by_expr(expr, order);
        }
    }
}

/// Comma-separated ids: trimmed, empty segments dropped, coerced to `key_type`, de-duplicated.
#[must_use]
pub fn parse_ids(raw: &str, key_type: &FieldType) -> Vec<Value> {
    let mut ids: Vec<Value> = Vec::new();
    for segment in raw.split(',').map(str::trim).filter(|segment| !segment.is_empty()) {
        let id = literal_to_value(segment, key_type);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}
