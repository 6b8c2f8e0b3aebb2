//! The CRUD verbs of one admin.
//!
//! Every verb follows the same order: parse and validate the request, consult
//! the permission strategy, then touch storage. Mutations run inside a
//! transaction that is committed on success and rolled back on any error, so a
//! failed batch never leaves partial rows behind.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use sea_orm::{
    Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction, FromQueryResult,
    TransactionTrait, Value,
    sea_query::{Alias, InsertStatement, Query, SelectStatement, SimpleExpr},
};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};

use super::permissions::{AdminPermissions, RequestContext};
use crate::config::AdminSettings;
use crate::errors::ApiError;
use crate::filtering::{self, Page};
use crate::link::LinkAssociation;
use crate::models::{ListOutcome, ListParams};
use crate::reflect::{FieldDescriptor, FieldType};
use crate::schema::{self, DerivedSchema, coerce};
use crate::selector::{COUNT_ALIAS, Selector, parse_ids};
use crate::validation::ValidationErrors;

/// Message of the 400 returned when a request carries nothing to write.
pub const EMPTY_DATA_MESSAGE: &str = "error data handle";

/// Result of a create call: the refreshed row for a single object, a count for an array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Created {
    Item(JsonValue),
    Count(u64),
}

#[derive(Debug, Default)]
struct SchemaCache {
    list: OnceLock<DerivedSchema>,
    filter: OnceLock<DerivedSchema>,
    create: OnceLock<DerivedSchema>,
    read: OnceLock<Option<DerivedSchema>>,
    update: OnceLock<DerivedSchema>,
}

type Row = Vec<(String, Value)>;

pub struct Orchestrator {
    path: String,
    selector: Selector,
    columns: Vec<FieldDescriptor>,
    read_fields: Vec<FieldDescriptor>,
    create_exclude: HashSet<String>,
    update_exclude: HashSet<String>,
    owned_links: HashMap<String, LinkAssociation>,
    permissions: Arc<dyn AdminPermissions>,
    schemas: SchemaCache,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("path", &self.path)
            .field("table", &self.selector.table())
            .field("links", &self.owned_links.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    pub(crate) fn new(
        path: String,
        selector: Selector,
        columns: Vec<FieldDescriptor>,
        read_fields: Vec<FieldDescriptor>,
        create_exclude: HashSet<String>,
        update_exclude: HashSet<String>,
        permissions: Arc<dyn AdminPermissions>,
    ) -> Self {
        Self {
            path,
            selector,
            columns,
            read_fields,
            create_exclude,
            update_exclude,
            owned_links: HashMap::new(),
            permissions,
            schemas: SchemaCache::default(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn table(&self) -> &str {
        self.selector.table()
    }

    #[must_use]
    pub fn model_name(&self) -> &str {
        &self.selector.reflector().model().name
    }

    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    #[must_use]
    pub fn key_type(&self) -> &FieldType {
        &self.selector.primary_key().field_type
    }

    /// Paths of the link sub-resources this admin owns.
    pub fn link_paths(&self) -> impl Iterator<Item = &str> {
        self.owned_links.keys().map(String::as_str)
    }

    pub(crate) fn register_owned_link(&mut self, path: String, link: LinkAssociation) {
        self.selector.register_link(link.remote_table.clone(), link.clone());
        self.owned_links.insert(path, link);
    }

    pub(crate) fn register_inverse_link(&mut self, owner_table: String, link: LinkAssociation) {
        self.selector.register_link(owner_table, link);
    }

    pub fn list_schema(&self) -> &DerivedSchema {
        self.schemas
            .list
            .get_or_init(|| schema::build_list(self.model_name(), self.selector.fields()))
    }

    pub fn filter_schema(&self) -> &DerivedSchema {
        self.schemas
            .filter
            .get_or_init(|| schema::build_filter(self.model_name(), self.selector.list_filter()))
    }

    pub fn create_schema(&self) -> &DerivedSchema {
        self.schemas
            .create
            .get_or_init(|| schema::build_create(self.model_name(), &self.columns, &self.create_exclude))
    }

    /// `None` when no read fields were configured.
    pub fn read_schema(&self) -> Option<&DerivedSchema> {
        self.schemas
            .read
            .get_or_init(|| schema::build_read(self.model_name(), &self.read_fields))
            .as_ref()
    }

    pub fn update_schema(&self) -> &DerivedSchema {
        self.schemas
            .update
            .get_or_init(|| schema::build_update(self.model_name(), &self.columns, &self.update_exclude))
    }

    /// Every schema this admin exposes, in a stable order.
    pub fn schemas(&self) -> Vec<&DerivedSchema> {
        let mut schemas = vec![self.list_schema(), self.filter_schema(), self.create_schema()];
        schemas.extend(self.read_schema());
        schemas.push(self.update_schema());
        schemas
    }

    /// `POST /list`
    ///
    /// # Errors
    /// 401 when `can_list` refuses, storage errors otherwise.
    pub async fn list(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        params: &ListParams,
        body: &JsonValue,
        settings: &AdminSettings,
    ) -> Result<ListOutcome, ApiError> {
        let page = Page::resolve(params.page, params.per_page, settings);
        let predicates = self.selector.apply_filters(body);
        if !self.permissions.can_list(ctx, &page, &predicates).await {
            return Err(self.denied("list"));
        }
        let scope = self.permissions.scope(ctx).await;

        let mut condition = filtering::apply_filters(&predicates);
        if let (Some(model), Some(ids)) = (&params.link_model, &params.link_item_id)
            && let Some(clause) =
                self.selector
                    .apply_link_clause(model, ids, params.link_not.unwrap_or(false))
        {
            condition = condition.add(clause);
        }

        let mut select = self.selector.base_select(None);
        Selector::restrict(&mut select, scope, condition);

        let show_total = params.show_total.unwrap_or(settings.show_total_default);
        let total = if show_total {
            Some(self.count(db, select.clone()).await?)
        } else {
            None
        };

        Selector::order(
            &mut select,
            self.selector
                .apply_ordering(params.order_by.as_deref(), params.order_dir.as_deref()),
        );
        select.limit(page.limit()).offset(page.offset());

        let schema = self.list_schema();
        let items: Vec<JsonValue> = fetch_json(db, &select)
            .await?
            .into_iter()
            .map(|row| schema.shape_row(row))
            .collect();

        tracing::debug!(admin = %self.path, items = items.len(), total = ?total, "Listed rows");

        Ok(ListOutcome {
            items,
            total,
            query: json!({
                "page": page.page,
                "perPage": page.per_page,
                "orderBy": params.order_by,
                "orderDir": params.order_dir,
                "showTotal": show_total,
            }),
            filters: filtering::echo_filters(body, &predicates),
        })
    }

    /// `POST /item`
    ///
    /// # Errors
    /// 422 for payloads that fail the create schema or violate a constraint,
    /// 401 when `can_create` refuses.
    pub async fn create(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        body: JsonValue,
    ) -> Result<Created, ApiError> {
        let (items, bulk) = match body {
            JsonValue::Array(items) => (items, true),
            item => (vec![item], false),
        };
        if items.is_empty() {
            return Err(ApiError::bad_request(EMPTY_DATA_MESSAGE));
        }

        let schema = self.create_schema();
        let mut errors = ValidationErrors::new();
        let mut rows = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match schema.parse_create(item) {
                Ok(row) => rows.push(row),
                Err(err) if bulk => errors.merge(err.nested(&format!("[{index}]"))),
                Err(err) => errors.merge(err),
            }
        }
        errors.result()?;

        if !self.permissions.can_create(ctx, &items).await {
            return Err(self.denied("create"));
        }

        let txn = db.begin().await.map_err(ApiError::database)?;
        let outcome = if bulk {
            self.insert_many(&txn, rows).await.map(Created::Count)
        } else {
            self.insert_and_fetch(&txn, rows.into_iter().next().unwrap_or_default())
                .await
                .map(Created::Item)
        };
        let created = finish(txn, outcome).await?;

        tracing::debug!(admin = %self.path, items = items.len(), "Created rows");
        Ok(created)
    }

    /// `GET /item/{ids}`: one object for one id, an array otherwise.
    ///
    /// # Errors
    /// 404 when a single id is not visible to the caller.
    pub async fn read(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        raw_ids: &str,
    ) -> Result<JsonValue, ApiError> {
        let schema = self
            .read_schema()
            .ok_or_else(|| ApiError::not_found(self.model_name(), None))?;
        let ids = self.parse_item_ids(raw_ids)?;
        if !self.permissions.can_read(ctx, &ids).await {
            return Err(self.denied("read"));
        }
        let scope = self.permissions.scope(ctx).await;

        let single = ids.len() == 1;
        let mut select = self.selector.base_select(Some(&self.read_fields));
        Selector::restrict(&mut select, scope, Condition::all().add(self.selector.key_in(ids)));
        Selector::order(&mut select, self.selector.apply_ordering(None, None));

        let mut rows: Vec<JsonValue> = fetch_json(db, &select)
            .await?
            .into_iter()
            .map(|row| schema.shape_row(row))
            .collect();

        if single {
            rows.pop()
                .ok_or_else(|| ApiError::not_found(self.model_name(), Some(raw_ids.trim().to_owned())))
        } else {
            Ok(JsonValue::Array(rows))
        }
    }

    /// `PUT /item/{ids}`: the same values are written to every visible id.
    ///
    /// # Errors
    /// 400 when nothing writable remains in the body.
    pub async fn update(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        raw_ids: &str,
        body: &JsonValue,
    ) -> Result<u64, ApiError> {
        let ids = self.parse_item_ids(raw_ids)?;
        let values = self.update_schema().parse_update(body)?;
        if values.is_empty() {
            return Err(ApiError::bad_request(EMPTY_DATA_MESSAGE));
        }
        if !self.permissions.can_update(ctx, &ids, &values).await {
            return Err(self.denied("update"));
        }
        let scope = self.permissions.scope(ctx).await;

        let txn = db.begin().await.map_err(ApiError::database)?;
        let outcome = self.update_visible(&txn, scope, ids, values).await;
        let count = finish(txn, outcome).await?;

        tracing::debug!(admin = %self.path, count, "Updated rows");
        Ok(count)
    }

    /// `DELETE /item/{ids}`
    ///
    /// # Errors
    /// 401 when `can_delete` refuses.
    pub async fn delete(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        raw_ids: &str,
    ) -> Result<u64, ApiError> {
        let ids = self.parse_item_ids(raw_ids)?;
        if !self.permissions.can_delete(ctx, &ids).await {
            return Err(self.denied("delete"));
        }
        let scope = self.permissions.scope(ctx).await;

        let txn = db.begin().await.map_err(ApiError::database)?;
        let outcome = self.delete_visible(&txn, scope, ids).await;
        let count = finish(txn, outcome).await?;

        tracing::debug!(admin = %self.path, count, "Deleted rows");
        Ok(count)
    }

    /// `POST /{related}/{item_id}?link_id=...`
    ///
    /// # Errors
    /// 404 for an unknown link path or an invisible owner, 422 for duplicate pairs.
    pub async fn create_links(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        related: &str,
        raw_item_ids: &str,
        raw_link_ids: &str,
    ) -> Result<u64, ApiError> {
        let (link, local_ids, remote_ids) = self.link_request(ctx, related, raw_item_ids, raw_link_ids).await?;
        let scope = self.permissions.scope(ctx).await;

        let txn = db.begin().await.map_err(ApiError::database)?;
        let outcome = async {
            let visible = self.visible_ids(&txn, scope, local_ids).await?;
            if visible.is_empty() {
                return Err(ApiError::not_found(self.model_name(), Some(raw_item_ids.trim().to_owned())));
            }
            link.create_links(&txn, &visible, &remote_ids).await
        }
        .await;
        let count = finish(txn, outcome).await?;

        tracing::debug!(admin = %self.path, related, count, "Linked rows");
        Ok(count)
    }

    /// `DELETE /{related}/{item_id}?link_id=...`
    ///
    /// # Errors
    /// 404 for an unknown link path.
    pub async fn delete_links(
        &self,
        db: &DatabaseConnection,
        ctx: &RequestContext,
        related: &str,
        raw_item_ids: &str,
        raw_link_ids: &str,
    ) -> Result<u64, ApiError> {
        let (link, local_ids, remote_ids) = self.link_request(ctx, related, raw_item_ids, raw_link_ids).await?;
        let scope = self.permissions.scope(ctx).await;

        let txn = db.begin().await.map_err(ApiError::database)?;
        let outcome = async {
            let visible = self.visible_ids(&txn, scope, local_ids).await?;
            link.delete_links(&txn, &visible, &remote_ids).await
        }
        .await;
        let count = finish(txn, outcome).await?;

        tracing::debug!(admin = %self.path, related, count, "Unlinked rows");
        Ok(count)
    }

    async fn link_request(
        &self,
        ctx: &RequestContext,
        related: &str,
        raw_item_ids: &str,
        raw_link_ids: &str,
    ) -> Result<(&LinkAssociation, Vec<Value>, Vec<Value>), ApiError> {
        let link = self
            .owned_links
            .get(related)
            .ok_or_else(|| ApiError::not_found(format!("Link {related}"), None))?;
        let local_ids = self.parse_item_ids(raw_item_ids)?;
        let remote_ids = parse_ids(raw_link_ids, &link.remote_key_type);
        if remote_ids.is_empty() {
            return Err(ApiError::bad_request(EMPTY_DATA_MESSAGE));
        }
        // Changing associations counts as updating the owning rows.
        if !self.permissions.can_update(ctx, &local_ids, &[]).await {
            return Err(self.denied("update"));
        }
        Ok((link, local_ids, remote_ids))
    }

    fn parse_item_ids(&self, raw: &str) -> Result<Vec<Value>, ApiError> {
        let ids = parse_ids(raw, self.key_type());
        if ids.is_empty() {
            return Err(ApiError::bad_request("No item id given"));
        }
        Ok(ids)
    }

    fn denied(&self, action: &str) -> ApiError {
        ApiError::unauthorized(format!("No permission to {action} {}", self.model_name()))
    }

    fn key_of(&self, row: &JsonValue) -> Option<Value> {
        let key = self.selector.primary_key();
        let raw = row.get(key.alias.as_str())?;
        coerce::json_to_value(raw, &key.field_type).ok()
    }

    async fn count<C: ConnectionTrait>(&self, conn: &C, select: SelectStatement) -> Result<u64, ApiError> {
        let backend = conn.get_database_backend();
        let row = conn
            .query_one(backend.build(&Selector::count_select(select)))
            .await
            .map_err(ApiError::database)?;
        let total: i64 = match row {
            Some(row) => row.try_get("", COUNT_ALIAS).map_err(ApiError::database)?,
            None => 0,
        };
        Ok(u64::try_from(total).unwrap_or_default())
    }

    async fn visible_ids<C: ConnectionTrait>(
        &self,
        conn: &C,
        scope: Option<Condition>,
        ids: Vec<Value>,
    ) -> Result<Vec<Value>, ApiError> {
        let mut select = self.selector.key_select();
        Selector::restrict(&mut select, scope, Condition::all().add(self.selector.key_in(ids)));
        Ok(fetch_json(conn, &select)
            .await?
            .iter()
            .filter_map(|row| self.key_of(row))
            .collect())
    }

    async fn update_visible<C: ConnectionTrait>(
        &self,
        conn: &C,
        scope: Option<Condition>,
        ids: Vec<Value>,
        values: Row,
    ) -> Result<u64, ApiError> {
        let visible = self.visible_ids(conn, scope, ids).await?;
        if visible.is_empty() {
            return Ok(0);
        }
        let mut update = Query::update();
        update
            .table(Alias::new(self.table()))
            .values(
                values
                    .into_iter()
                    .map(|(column, value)| (Alias::new(column), SimpleExpr::Value(value))),
            )
            .and_where(self.selector.bare_key_in(visible));
        let backend = conn.get_database_backend();
        let result = conn.execute(backend.build(&update)).await.map_err(ApiError::database)?;
        Ok(result.rows_affected())
    }

    async fn delete_visible<C: ConnectionTrait>(
        &self,
        conn: &C,
        scope: Option<Condition>,
        ids: Vec<Value>,
    ) -> Result<u64, ApiError> {
        let visible = self.visible_ids(conn, scope, ids).await?;
        if visible.is_empty() {
            return Ok(0);
        }
        let mut delete = Query::delete();
        delete
            .from_table(Alias::new(self.table()))
            .and_where(self.selector.bare_key_in(visible));
        let backend = conn.get_database_backend();
        let result = conn.execute(backend.build(&delete)).await.map_err(ApiError::database)?;
        Ok(result.rows_affected())
    }

    /// Rows sharing a column set go out as one multi-row insert.
    async fn insert_many<C: ConnectionTrait>(&self, conn: &C, rows: Vec<Row>) -> Result<u64, ApiError> {
        let mut groups: Vec<(Vec<String>, Vec<Row>)> = Vec::new();
        for row in rows {
            let columns: Vec<String> = row.iter().map(|(column, _)| column.clone()).collect();
            match groups.iter_mut().find(|(existing, _)| *existing == columns) {
                Some((_, group)) => group.push(row),
                None => groups.push((columns, vec![row])),
            }
        }

        let backend = conn.get_database_backend();
        let mut inserted = 0;
        for (_, group) in &groups {
            let insert = self.insert_statement(group)?;
            let result = conn.execute(backend.build(&insert)).await.map_err(ApiError::database)?;
            inserted += result.rows_affected();
        }
        Ok(inserted)
    }

    /// Insert one row and read it back with storage-assigned values filled in.
    async fn insert_and_fetch<C: ConnectionTrait>(&self, conn: &C, row: Row) -> Result<JsonValue, ApiError> {
        let key = self.selector.primary_key();
        let supplied = row
            .iter()
            .find(|(column, _)| *column == key.name)
            .map(|(_, value)| value.clone());
        let mut insert = self.insert_statement(std::slice::from_ref(&row))?;
        let backend = conn.get_database_backend();

        let id = if let Some(id) = supplied {
            conn.execute(backend.build(&insert)).await.map_err(ApiError::database)?;
            id
        } else if conn.support_returning() {
            insert.returning_col(Alias::new(key.name.as_str()));
            let returned = conn
                .query_one(backend.build(&insert))
                .await
                .map_err(ApiError::database)?
                .ok_or_else(|| ApiError::internal("Insert returned no row", None))?;
            let returned = JsonValue::from_query_result(&returned, "").map_err(ApiError::database)?;
            self.key_of(&returned)
                .ok_or_else(|| ApiError::internal("Insert returned no primary key", None))?
        } else {
            let result = conn.execute(backend.build(&insert)).await.map_err(ApiError::database)?;
            let id = i64::try_from(result.last_insert_id())
                .map_err(|err| ApiError::internal("Inserted key out of range", Some(err.to_string())))?;
            Value::BigInt(Some(id))
        };

        let fields = (!self.read_fields.is_empty()).then_some(self.read_fields.as_slice());
        let mut select = self.selector.base_select(fields);
        select.and_where(self.selector.key_in(vec![id]));
        let schema = self.read_schema().unwrap_or_else(|| self.list_schema());
        fetch_json(conn, &select)
            .await?
            .into_iter()
            .next()
            .map(|row| schema.shape_row(row))
            .ok_or_else(|| ApiError::internal("Created row could not be read back", None))
    }

    fn insert_statement(&self, rows: &[Row]) -> Result<InsertStatement, ApiError> {
        let mut insert = Query::insert();
        insert.into_table(Alias::new(self.table()));

        let columns: Vec<&str> = rows
            .first()
            .map(|row| row.iter().map(|(column, _)| column.as_str()).collect())
            .unwrap_or_default();
        if columns.is_empty() {
            insert.or_default_values_many(u32::try_from(rows.len()).unwrap_or(u32::MAX));
            return Ok(insert);
        }

        insert.columns(columns.into_iter().map(Alias::new));
        for row in rows {
            insert
                .values(row.iter().map(|(_, value)| SimpleExpr::Value(value.clone())))
                .map_err(|err| ApiError::internal("Failed to build insert", Some(err.to_string())))?;
        }
        Ok(insert)
    }
}

async fn fetch_json<C: ConnectionTrait>(conn: &C, select: &SelectStatement) -> Result<Vec<JsonValue>, ApiError> {
    let backend = conn.get_database_backend();
    let rows = conn.query_all(backend.build(select)).await.map_err(ApiError::database)?;
    rows.iter()
        .map(|row| JsonValue::from_query_result(row, "").map_err(ApiError::database))
        .collect()
}

async fn finish<T>(txn: DatabaseTransaction, outcome: Result<T, ApiError>) -> Result<T, ApiError> {
    match outcome {
        Ok(value) => {
            txn.commit().await.map_err(ApiError::database)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = txn.rollback().await {
                tracing::error!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}
