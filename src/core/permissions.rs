use async_trait::async_trait;
use axum::http::HeaderMap;
use sea_orm::{Condition, Value};
use serde_json::Value as JsonValue;

use crate::filtering::{FilterPredicate, Page};

/// What a permission hook gets to see about the caller.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub headers: HeaderMap,
    /// Registration path of the admin being called.
    pub admin: String,
}

impl RequestContext {
    #[must_use]
    pub fn new(admin: impl Into<String>, headers: HeaderMap) -> Self {
        Self {
            headers,
            admin: admin.into(),
        }
    }

    /// Convenience accessor for a header as UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

/// Permission strategy consulted before every data access.
///
/// Every hook defaults to allowing the operation. A hook returning `false`
/// short-circuits the request with a 401 response.
///
/// ```rust,ignore
/// struct ReadOnly;
///
/// #[async_trait]
/// impl AdminPermissions for ReadOnly {
///     async fn can_create(&self, _: &RequestContext, _: &[JsonValue]) -> bool { false }
///     async fn can_update(&self, _: &RequestContext, _: &[Value], _: &[(String, Value)]) -> bool { false }
///     async fn can_delete(&self, _: &RequestContext, _: &[Value]) -> bool { false }
/// }
/// ```
#[async_trait]
pub trait AdminPermissions: Send + Sync {
    async fn can_list(&self, _ctx: &RequestContext, _page: &Page, _filters: &[FilterPredicate]) -> bool {
        true
    }

    /// Checked once per create call, for the whole batch.
    async fn can_create(&self, _ctx: &RequestContext, _items: &[JsonValue]) -> bool {
        true
    }

    async fn can_read(&self, _ctx: &RequestContext, _ids: &[Value]) -> bool {
        true
    }

    /// Also guards link-table mutations, with `values` empty.
    async fn can_update(&self, _ctx: &RequestContext, _ids: &[Value], _values: &[(String, Value)]) -> bool {
        true
    }

    async fn can_delete(&self, _ctx: &RequestContext, _ids: &[Value]) -> bool {
        true
    }

    /// Extra restriction on the rows visible to this caller.
    async fn scope(&self, _ctx: &RequestContext) -> Option<Condition> {
        None
    }
}

/// Allows everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AdminPermissions for AllowAll {}
