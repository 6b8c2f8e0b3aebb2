//! HTTP surface of one admin.
//!
//! Bodies arrive as raw bytes and are parsed here so malformed JSON still gets
//! the standard envelope instead of axum's plain-text rejection.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use serde_json::{Value as JsonValue, json};

use crate::config::AdminSettings;
use crate::core::{Created, Orchestrator, RequestContext};
use crate::errors::ApiError;
use crate::filtering::{Page, calculate_content_range};
use crate::models::{ApiResponse, LinkParams, ListParams};
use crate::ui;

/// Shared state of an admin's router.
#[derive(Clone)]
pub struct AdminState {
    pub db: DatabaseConnection,
    pub admin: Arc<Orchestrator>,
    pub settings: Arc<AdminSettings>,
}

impl AdminState {
    fn context(&self, headers: HeaderMap) -> RequestContext {
        RequestContext::new(self.admin.path(), headers)
    }
}

/// Routes of one admin, relative to its own prefix.
///
/// `GET /item/{ids}` is only mounted when the admin has read fields.
pub fn admin_router(state: AdminState) -> Router {
    let item = if state.admin.read_schema().is_some() {
        get(read_items).put(update_items).delete(delete_items)
    } else {
        axum::routing::put(update_items).delete(delete_items)
    };

    Router::new()
        .route("/list", post(list_items))
        .route("/item", post(create_items))
        .route("/item/{ids}", item)
        .route("/schema", get(describe))
        .route("/{related}/{item_id}", post(link_items).delete(unlink_items))
        .with_state(state)
}

fn parse_body(body: &Bytes, empty_default: JsonValue) -> Result<JsonValue, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(empty_default);
    }
    serde_json::from_slice(body).map_err(|err| ApiError::bad_request(format!("Invalid JSON body: {err}")))
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

async fn list_items(
    State(state): State<AdminState>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let params = query(params)?;
    let filters = parse_body(&body, json!({}))?;
    let ctx = state.context(headers);
    let outcome = state
        .admin
        .list(&state.db, &ctx, &params, &filters, &state.settings)
        .await?;

    let range = outcome.total.map(|total| {
        let offset = Page::resolve(params.page, params.per_page, &state.settings).offset();
        let returned = u64::try_from(outcome.items.len()).unwrap_or(u64::MAX);
        calculate_content_range(offset, returned, total, state.admin.path())
    });
    let body = ApiResponse::success(outcome);
    Ok(match range {
        Some(headers) => (headers, body).into_response(),
        None => body.into_response(),
    })
}

async fn create_items(
    State(state): State<AdminState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<ApiResponse<Created>, ApiError> {
    let payload = parse_body(&body, JsonValue::Null)?;
    let ctx = state.context(headers);
    let created = state.admin.create(&state.db, &ctx, payload).await?;
    Ok(ApiResponse::success(created))
}

async fn read_items(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Path(ids): Path<String>,
) -> Result<ApiResponse<JsonValue>, ApiError> {
    let ctx = state.context(headers);
    let item = state.admin.read(&state.db, &ctx, &ids).await?;
    Ok(ApiResponse::success(item))
}

async fn update_items(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Path(ids): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<u64>, ApiError> {
    let payload = parse_body(&body, json!({}))?;
    let ctx = state.context(headers);
    let count = state.admin.update(&state.db, &ctx, &ids, &payload).await?;
    Ok(ApiResponse::success(count))
}

async fn delete_items(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Path(ids): Path<String>,
) -> Result<ApiResponse<u64>, ApiError> {
    let ctx = state.context(headers);
    let count = state.admin.delete(&state.db, &ctx, &ids).await?;
    Ok(ApiResponse::success(count))
}

async fn link_items(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Path((related, item_id)): Path<(String, String)>,
    params: Result<Query<LinkParams>, QueryRejection>,
) -> Result<ApiResponse<u64>, ApiError> {
    let params = query(params)?;
    let ctx = state.context(headers);
    let count = state
        .admin
        .create_links(&state.db, &ctx, &related, &item_id, &params.link_id)
        .await?;
    Ok(ApiResponse::success(count))
}

async fn unlink_items(
    State(state): State<AdminState>,
    headers: HeaderMap,
    Path((related, item_id)): Path<(String, String)>,
    params: Result<Query<LinkParams>, QueryRejection>,
) -> Result<ApiResponse<u64>, ApiError> {
    let params = query(params)?;
    let ctx = state.context(headers);
    let count = state
        .admin
        .delete_links(&state.db, &ctx, &related, &item_id, &params.link_id)
        .await?;
    Ok(ApiResponse::success(count))
}

/// Derived schemas plus the table columns and form items built from them.
async fn describe(State(state): State<AdminState>) -> ApiResponse<JsonValue> {
    let admin = &state.admin;
    let columns: Vec<JsonValue> = ui::table_columns(admin.list_schema(), admin.filter_schema())
        .iter()
        .map(ui::to_json)
        .collect();
    let form: Vec<JsonValue> = ui::form_items(admin.create_schema()).iter().map(ui::to_json).collect();

    ApiResponse::success(json!({
        "schemas": crate::openapi::schema_map(admin.schemas()),
        "columns": columns,
        "form": form,
        "links": admin.link_paths().collect::<Vec<_>>(),
    }))
}
