//! # admincrate
//!
//! Admin-panel endpoints generated at runtime from sea-orm entities.
//!
//! Register a [`ModelAdmin`] per entity on an [`AdminSite`]. Each admin reflects
//! its entity's columns, derives list/filter/create/read/update schemas from
//! them, and serves CRUD routes whose list endpoint understands a small
//! bracket-operator filter language:
//!
//! | Value | Meaning |
//! |-------|---------|
//! | `"[>]10"` | greater than 10 |
//! | `"[-]2022-01-02,2022-01-04"` | between two values |
//! | `"[*]1,2,3"` | in set |
//! | `"[!*]2,3"` | not in set |
//! | `"[~]rust"` | LIKE `%rust%` |
//!
//! ```rust,ignore
//! use admincrate::{AdminSite, ModelAdmin};
//!
//! let site = AdminSite::builder(db)
//!     .register(
//!         ModelAdmin::new::<article::Entity>()
//!             .fields(["id", "title", "create_time"])
//!             .read_fields(["id", "title", "description", "create_time"])
//!             .many_to_many::<tag::Entity, article_tag::Entity>("tags"),
//!     )
//!     .register(ModelAdmin::new::<tag::Entity>())
//!     .build()?;
//!
//! let app = site.router(); // POST /admin/article/list, GET /admin/article/item/1,2 ...
//! ```
//!
//! Every response uses the envelope `{"status": 0, "msg": "success", "data": ...}`;
//! failures carry the HTTP status code in `status` and `null` data.

pub mod config;
pub mod core;
pub mod errors;
pub mod filtering;
pub mod link;
pub mod models;
pub mod openapi;
pub mod reflect;
pub mod routes;
pub mod schema;
pub mod selector;
pub mod site;
pub mod ui;
pub mod validation;

pub use config::AdminSettings;
pub use crate::core::{AdminPermissions, AllowAll, Created, ModelAdmin, Orchestrator, RequestContext};
pub use errors::ApiError;
pub use filtering::{FilterLiteral, FilterOperator, FilterPredicate};
pub use models::{ApiResponse, ListOutcome, ListParams};
pub use reflect::{FieldInfo, FieldRef, FieldType};
pub use site::AdminSite;

// Re-exported so entity crates and permission impls need no extra dependency.
pub use async_trait::async_trait;
pub use sea_orm::sea_query::Order;
