use std::collections::HashSet;
use std::sync::Arc;

use sea_orm::{EntityTrait, RelationTrait, sea_query::Order};

use super::crud::Orchestrator;
use super::permissions::{AdminPermissions, AllowAll};
use crate::errors::ApiError;
use crate::reflect::{FieldInfo, FieldRef, ModelMeta, Reflector, RelationshipMeta};
use crate::selector::{JoinSpec, Selector};

/// Declarative configuration for one administered model.
///
/// ```rust,ignore
/// let articles = ModelAdmin::new::<article::Entity>()
///     .fields(["id", "title", "create_time"])
///     .list_filter(["id", "title", "create_time"])
///     .read_fields(["id", "title", "description", "create_time"])
///     .ordering("create_time", Order::Desc)
///     .many_to_many::<tag::Entity, article_tag::Entity>("tags");
/// ```
pub struct ModelAdmin {
    pub(crate) path: String,
    pub(crate) model: ModelMeta,
    fields: Vec<FieldRef>,
    list_filter: Option<Vec<FieldRef>>,
    read_fields: Vec<FieldRef>,
    ordering: Vec<(FieldRef, Order)>,
    joins: Vec<JoinSpec>,
    infos: Vec<(String, FieldInfo)>,
    create_exclude: Option<HashSet<String>>,
    update_exclude: Option<HashSet<String>>,
    pub(crate) relationships: Vec<(String, RelationshipMeta)>,
    permissions: Arc<dyn AdminPermissions>,
}

impl std::fmt::Debug for ModelAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdmin")
            .field("path", &self.path)
            .field("table", &self.model.table)
            .finish_non_exhaustive()
    }
}

impl ModelAdmin {
    /// Start from an entity; the registration path defaults to its table name.
    #[must_use]
    pub fn new<E: EntityTrait>() -> Self {
        let model = ModelMeta::of::<E>();
        Self {
            path: model.table.clone(),
            model,
            fields: Vec::new(),
            list_filter: None,
            read_fields: Vec::new(),
            ordering: Vec::new(),
            joins: Vec::new(),
            infos: Vec::new(),
            create_exclude: None,
            update_exclude: None,
            relationships: Vec::new(),
            permissions: Arc::new(AllowAll),
        }
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into().trim_matches('/').to_owned();
        self
    }

    /// Projection of the list endpoint. Defaults to every column.
    #[must_use]
    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldRef>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Filterable fields. Defaults to the projected columns.
    #[must_use]
    pub fn list_filter<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldRef>,
    {
        self.list_filter = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Fields of the read endpoint. Without any, `GET /item/{ids}` is not mounted.
    #[must_use]
    pub fn read_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FieldRef>,
    {
        self.read_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Append a default ordering term.
    #[must_use]
    pub fn ordering(mut self, field: impl Into<FieldRef>, order: Order) -> Self {
        self.ordering.push((field.into(), order));
        self
    }

    /// `LEFT JOIN` a related table so its columns can be projected and filtered.
    #[must_use]
    pub fn join<R: RelationTrait>(mut self, relation: R) -> Self {
        match JoinSpec::from_relation(&self.model.table, &relation.def()) {
            Some(join) => self.joins.push(join),
            None => tracing::warn!(table = %self.model.table, "Skipping join over a composite key"),
        }
        self
    }

    /// Attach labels, bounds or a widget override to a field, by alias.
    #[must_use]
    pub fn field_info(mut self, alias: impl Into<String>, info: FieldInfo) -> Self {
        self.infos.push((alias.into(), info));
        self
    }

    /// Columns never accepted on create. Defaults to an auto-increment primary key.
    #[must_use]
    pub fn create_exclude<I: IntoIterator<Item = S>, S: Into<String>>(mut self, columns: I) -> Self {
        self.create_exclude = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Columns never accepted on update. Defaults to the primary key.
    #[must_use]
    pub fn update_exclude<I: IntoIterator<Item = S>, S: Into<String>>(mut self, columns: I) -> Self {
        self.update_exclude = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Declare a many-to-many relationship through `Via`, exposed under `{path}`.
    #[must_use]
    pub fn many_to_many<Target: EntityTrait, Via: EntityTrait>(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        let relationship = RelationshipMeta::many_to_many::<Target, Via>(path.clone());
        self.relationships.push((path, relationship));
        self
    }

    #[must_use]
    pub fn permissions(mut self, permissions: impl AdminPermissions + 'static) -> Self {
        self.permissions = Arc::new(permissions);
        self
    }

    /// Resolve every field reference and freeze the configuration.
    ///
    /// # Errors
    /// Fails when the model has no primary key.
    pub fn into_orchestrator(self) -> Result<Orchestrator, ApiError> {
        let primary_key = self.model.primary_key().cloned().ok_or_else(|| {
            ApiError::internal(
                format!("{} has no primary key", self.model.name),
                None,
            )
        })?;

        let mut reflector = Reflector::new(self.model.clone());
        for (alias, info) in self.infos {
            reflector.set_info(alias, info);
        }

        let primary_key = reflector
            .resolve(&FieldRef::Column(primary_key))
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::internal("Primary key did not resolve", None))?;

        let fields = reflector.filter_instrumented(&self.fields, true);
        let list_filter = match &self.list_filter {
            Some(references) => reflector.filter_instrumented(references, false),
            None => {
                let mut projected: Vec<_> = fields.iter().filter(|field| field.is_column()).cloned().collect();
                if !projected.iter().any(|field| field.alias == primary_key.alias) {
                    projected.insert(0, primary_key.clone());
                }
                projected
            }
        };
        let read_fields = reflector.filter_instrumented(&self.read_fields, true);
        let columns = reflector.filter_instrumented(&[FieldRef::Model(self.model.clone())], false);
        let list_filter = if self.fields.is_empty() && self.list_filter.is_none() {
            columns.clone()
        } else {
            list_filter
        };

        let ordering = self
            .ordering
            .iter()
            .flat_map(|(reference, order)| {
                reflector
                    .resolve(reference)
                    .into_iter()
                    .map(move |field| (field.expr(), order.clone()))
            })
            .collect();

        let create_exclude = self.create_exclude.unwrap_or_else(|| {
            if primary_key.auto_increment {
                HashSet::from([primary_key.name.clone()])
            } else {
                HashSet::new()
            }
        });
        let update_exclude = self
            .update_exclude
            .unwrap_or_else(|| HashSet::from([primary_key.name.clone()]));

        let selector = Selector::new(reflector, primary_key, fields, list_filter, ordering, self.joins);

        Ok(Orchestrator::new(
            self.path,
            selector,
            columns,
            read_fields,
            create_exclude,
            update_exclude,
            self.permissions,
        ))
    }
}
