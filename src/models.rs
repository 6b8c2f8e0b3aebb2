use axum::{
    Json,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::{IntoParams, ToSchema};

/// Envelope shared by every admin response.
///
/// `status` is `0` on success and the HTTP status code on failure; `data` is
/// `null` whenever `status` is non-zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: 0,
            msg: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(status: u16, msg: impl Into<String>) -> Self {
        Self {
            status,
            msg: msg.into(),
            data: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Query parameters accepted by `POST {prefix}/list`.
///
/// The request body carries the filter object; these parameters carry paging,
/// ordering and the optional link-table restriction.
///
/// # Pagination
/// `page` is 1-based; `perPage` falls back to the site's default page size and
/// is clamped to its maximum.
///
/// # Ordering
/// `orderBy` takes any projected or filterable alias; `orderDir=desc` sorts
/// descending, anything else ascending.
///
/// # Link filtering
/// `linkModel` names the table of a many-to-many owner and `linkItemId` a
/// comma-separated id list of that owner. Only rows linked to one of those ids
/// are returned, or only rows *not* linked when `linkNot=true`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// 1-based page number.
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Page size.
    #[param(example = 10)]
    pub per_page: Option<u64>,
    /// Alias to order by.
    #[param(example = "create_time")]
    pub order_by: Option<String>,
    /// `asc` or `desc`.
    #[param(example = "desc")]
    pub order_dir: Option<String>,
    /// Whether to count all matching rows.
    pub show_total: Option<bool>,
    /// Table name of the linked owner model.
    #[param(example = "article")]
    pub link_model: Option<String>,
    /// Comma-separated ids of the linked owner rows.
    #[param(example = "1,2")]
    pub link_item_id: Option<String>,
    /// Invert the link restriction.
    pub link_not: Option<bool>,
}

/// Query parameters of the link sub-resource.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct LinkParams {
    /// Comma-separated ids of the target rows.
    #[param(example = "3,4")]
    pub link_id: String,
}

/// Payload of a successful list call.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListOutcome {
    pub items: Vec<JsonValue>,
    pub total: Option<u64>,
    pub query: JsonValue,
    pub filters: JsonValue,
}
