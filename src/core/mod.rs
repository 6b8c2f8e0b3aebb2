// Admin configuration, permission strategy and the CRUD verbs

pub mod admin;
pub mod crud;
pub mod permissions;

pub use admin::ModelAdmin;
pub use crud::{Created, EMPTY_DATA_MESSAGE, Orchestrator};
pub use permissions::{AdminPermissions, AllowAll, RequestContext};
