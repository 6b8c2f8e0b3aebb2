//! Site assembly: registered admins, their link associations and the combined router.

use std::sync::{Arc, OnceLock};

use axum::{Router, routing::get};
use sea_orm::DatabaseConnection;

use crate::config::{AdminSettings, normalize_prefix};
use crate::core::{ModelAdmin, Orchestrator};
use crate::errors::ApiError;
use crate::link;
use crate::models::ApiResponse;
use crate::routes::{AdminState, admin_router};

/// Every registered admin plus the connection and settings they share.
///
/// This is the explicit context handed to whatever serves requests; nothing
/// inside the crate reads the optional global installed by [`install_global`].
#[derive(Debug, Clone)]
pub struct AdminSite {
    db: DatabaseConnection,
    settings: Arc<AdminSettings>,
    admins: Vec<Arc<Orchestrator>>,
}

#[derive(Debug)]
pub struct AdminSiteBuilder {
    db: DatabaseConnection,
    settings: AdminSettings,
    admins: Vec<ModelAdmin>,
}

impl AdminSite {
    #[must_use]
    pub fn builder(db: DatabaseConnection) -> AdminSiteBuilder {
        AdminSiteBuilder {
            db,
            settings: AdminSettings::default(),
            admins: Vec::new(),
        }
    }

    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    #[must_use]
    pub fn settings(&self) -> &AdminSettings {
        &self.settings
    }

    /// Admin registered under `path`.
    #[must_use]
    pub fn admin(&self, path: &str) -> Option<&Arc<Orchestrator>> {
        self.admins.iter().find(|admin| admin.path() == path)
    }

    pub fn admins(&self) -> impl Iterator<Item = &Orchestrator> {
        self.admins.iter().map(AsRef::as_ref)
    }

    /// Every admin nested under `{site_prefix}/{path}`, plus
    /// `GET {site_prefix}/openapi.json`.
    #[must_use]
    pub fn router(&self) -> Router {
        let prefix = self.settings.site_prefix.trim_end_matches('/');
        let mut router = Router::new();
        for admin in &self.admins {
            let state = AdminState {
                db: self.db.clone(),
                admin: Arc::clone(admin),
                settings: Arc::clone(&self.settings),
            };
            router = router.nest(&format!("{prefix}/{}", admin.path()), admin_router(state));
        }

        let document = crate::openapi::document("Admin", env!("CARGO_PKG_VERSION"), self.admins());
        router.route(
            &format!("{prefix}/openapi.json"),
            get(move || {
                let document = document.clone();
                async move { ApiResponse::success(document) }
            }),
        )
    }
}

impl AdminSiteBuilder {
    #[must_use]
    pub fn settings(mut self, settings: AdminSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn register(mut self, admin: ModelAdmin) -> Self {
        self.admins.push(admin);
        self
    }

    /// Freeze every admin and wire up link associations.
    ///
    /// A declared many-to-many relationship is registered on its owner under
    /// its path and on the owner's selector keyed by the target table. When the
    /// target is also registered, it gets the reversed association keyed by the
    /// owner's table. Relationships whose join table cannot be resolved are
    /// skipped with a warning.
    ///
    /// # Errors
    /// Fails on duplicate paths or a model without a primary key.
    pub fn build(self) -> Result<AdminSite, ApiError> {
        let mut settings = self.settings;
        settings.site_prefix = normalize_prefix(&settings.site_prefix);

        let mut declared = Vec::new();
        let mut admins = Vec::with_capacity(self.admins.len());
        for admin in self.admins {
            if admins.iter().any(|existing: &Orchestrator| existing.path() == admin.path) {
                return Err(ApiError::internal(
                    format!("Admin path '{}' is registered twice", admin.path),
                    None,
                ));
            }
            for (path, relationship) in &admin.relationships {
                match link::discover(&admin.model, relationship) {
                    Some(association) => declared.push((admins.len(), path.clone(), association)),
                    None => tracing::warn!(
                        admin = %admin.path,
                        relationship = %path,
                        "Relationship has no usable join table; link routes not registered"
                    ),
                }
            }
            admins.push(admin.into_orchestrator()?);
        }

        for (owner, path, association) in declared {
            let owner_table = admins[owner].table().to_owned();
            let owner_key = admins[owner].key_type().clone();
            let reversed = association.reversed(&owner_table, owner_key);
            for target in admins
                .iter_mut()
                .filter(|admin| admin.table() == association.remote_table)
            {
                target.register_inverse_link(owner_table.clone(), reversed.clone());
            }
            tracing::debug!(owner = %owner_table, link = %path, join = %association.join_table, "Registered link");
            admins[owner].register_owned_link(path, association);
        }

        Ok(AdminSite {
            db: self.db,
            settings: Arc::new(settings),
            admins: admins.into_iter().map(Arc::new).collect(),
        })
    }
}

static GLOBAL: OnceLock<Arc<AdminSite>> = OnceLock::new();

/// Install a process-wide site for scripts and CLIs. The first install wins.
pub fn install_global(site: AdminSite) -> Arc<AdminSite> {
    let installed = GLOBAL.get_or_init(|| Arc::new(site));
    Arc::clone(installed)
}

#[must_use]
pub fn global() -> Option<Arc<AdminSite>> {
    GLOBAL.get().cloned()
}
