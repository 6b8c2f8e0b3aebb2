use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use sea_orm::{
    ColumnTrait, EntityTrait, IdenStatic,
    sea_query::{Alias, Expr, SimpleExpr},
};
use serde::{Deserialize, Serialize};

use super::meta::{FieldType, ModelField, ModelMeta, humanize};

/// Reference to one or more model attributes, resolved against a default model.
#[derive(Debug, Clone)]
pub enum FieldRef {
    /// A column handle taken from any entity.
    Column(ModelField),
    /// An attribute name on the default model.
    Name(String),
    /// Every persisted attribute of a whole entity.
    Model(ModelMeta),
    /// A computed expression projected under its own name.
    Label(LabelField),
}

#[derive(Debug, Clone)]
pub struct LabelField {
    pub name: String,
    pub expr: SimpleExpr,
    pub field_type: FieldType,
}

impl FieldRef {
    /// Capture a column handle, e.g. `FieldRef::column(article::Column::Title)`.
    #[must_use]
    pub fn column<C>(column: C) -> Self
    where
        C: ColumnTrait,
        C::EntityName: EntityTrait,
    {
        let meta = ModelMeta::of::<C::EntityName>();
        let field = meta
            .fields
            .into_iter()
            .find(|field| field.name == column.as_str());
        match field {
            Some(field) => Self::Column(field),
            None => Self::Name(column.as_str().to_owned()),
        }
    }

    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    #[must_use]
    pub fn model<E: EntityTrait>() -> Self {
        Self::Model(ModelMeta::of::<E>())
    }

    #[must_use]
    pub fn label(name: impl Into<String>, expr: impl Into<SimpleExpr>, field_type: FieldType) -> Self {
        Self::Label(LabelField {
            name: name.into(),
            expr: expr.into(),
            field_type,
        })
    }

    fn cache_key(&self) -> String {
        match self {
            Self::Column(field) => format!("column:{}.{}", field.table, field.name),
            Self::Name(name) => format!("name:{name}"),
            Self::Model(meta) => format!("model:{}", meta.table),
            Self::Label(label) => format!("label:{}", label.name),
        }
    }
}

impl From<&str> for FieldRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for FieldRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// Declared metadata for an attribute: labels, validation bounds and widget override.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub widget: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub ge: Option<f64>,
    pub le: Option<f64>,
}

impl FieldInfo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn widget(mut self, widget: impl Into<String>) -> Self {
        self.widget = Some(widget.into());
        self
    }

    #[must_use]
    pub const fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    #[must_use]
    pub const fn bounds(mut self, ge: Option<f64>, le: Option<f64>) -> Self {
        self.ge = ge;
        self.le = le;
        self
    }
}

#[derive(Debug, Clone)]
pub enum FieldSource {
    Column,
    Label(SimpleExpr),
}

/// Resolved metadata for one projected attribute.
///
/// Immutable once built; schemas clone descriptors rather than share them.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub name: String,
    pub alias: String,
    pub table: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub has_default: bool,
    pub title: String,
    pub info: FieldInfo,
    pub source: FieldSource,
}

impl FieldDescriptor {
    /// Table-qualified column expression, or the label's expression.
    #[must_use]
    pub fn expr(&self) -> SimpleExpr {
        match &self.source {
            FieldSource::Column => {
                Expr::col((Alias::new(self.table.as_str()), Alias::new(self.name.as_str()))).into()
            }
            FieldSource::Label(expr) => expr.clone(),
        }
    }

    #[must_use]
    pub const fn is_column(&self) -> bool {
        matches!(self.source, FieldSource::Column)
    }

    /// Whether the value can be omitted on insert.
    #[must_use]
    pub const fn is_optional_on_create(&self) -> bool {
        self.nullable || self.has_default || self.auto_increment
    }
}

/// Resolves field references against a default model, memoising the result per reference.
#[derive(Debug)]
pub struct Reflector {
    model: ModelMeta,
    infos: HashMap<String, FieldInfo>,
    cache: RwLock<HashMap<String, Vec<FieldDescriptor>>>,
}

impl Reflector {
    #[must_use]
    pub fn new(model: ModelMeta) -> Self {
        Self {
            model,
            infos: HashMap::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn model(&self) -> &ModelMeta {
        &self.model
    }

    /// Attach metadata to an attribute by wire alias. Clears memoised descriptors.
    pub fn set_info(&mut self, alias: impl Into<String>, info: FieldInfo) {
        self.infos.insert(alias.into(), info);
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
    }

    /// Wire alias: the bare name on the default table, `{table}__{name}` elsewhere.
    #[must_use]
    pub fn alias(&self, table: &str, name: &str) -> String {
        if table == self.model.table {
            name.to_owned()
        } else {
            format!("{table}__{name}")
        }
    }

    /// Resolve a reference to zero or more descriptors.
    ///
    /// Unknown names resolve to nothing.
    #[must_use]
    pub fn resolve(&self, reference: &FieldRef) -> Vec<FieldDescriptor> {
        let key = reference.cache_key();
        if let Some(hit) = self.cache.read().ok().and_then(|cache| cache.get(&key).cloned()) {
            return hit;
        }

        let resolved = match reference {
            FieldRef::Column(field) => vec![self.describe(field)],
            FieldRef::Name(name) => match self.model.field(name) {
                Some(field) => vec![self.describe(field)],
                None => {
                    tracing::debug!(field = %name, table = %self.model.table, "Dropping unknown field");
                    Vec::new()
                }
            },
            FieldRef::Model(meta) => meta.fields.iter().map(|field| self.describe(field)).collect(),
            FieldRef::Label(label) => vec![self.describe_label(label)],
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key, resolved.clone());
        }
        resolved
    }

    /// Flatten heterogeneous references into concrete entries, dropping anything unresolvable.
    ///
    /// Labels pass through only when `allow_labels` is set. Repeated attributes keep
    /// their first position.
    #[must_use]
    pub fn filter_instrumented(&self, references: &[FieldRef], allow_labels: bool) -> Vec<FieldDescriptor> {
        let mut seen = HashSet::new();
        references
            .iter()
            .filter(|reference| allow_labels || !matches!(reference, FieldRef::Label(_)))
            .flat_map(|reference| self.resolve(reference))
            .filter(|descriptor| seen.insert(descriptor.alias.clone()))
            .collect()
    }

    fn describe(&self, field: &ModelField) -> FieldDescriptor {
        let alias = self.alias(&field.table, &field.name);
        let mut info = self.infos.get(&alias).cloned().unwrap_or_default();
        if info.max_length.is_none() {
            info.max_length = field.max_length.and_then(|len| usize::try_from(len).ok());
        }
        // Joined columns may be absent from a LEFT JOIN row.
        let nullable = field.nullable || field.table != self.model.table;
        FieldDescriptor {
            title: info.title.clone().unwrap_or_else(|| humanize(&field.name)),
            name: field.name.clone(),
            alias,
            table: field.table.clone(),
            field_type: field.field_type.clone(),
            nullable,
            primary_key: field.primary_key,
            auto_increment: field.auto_increment,
            has_default: field.has_default,
            info,
            source: FieldSource::Column,
        }
    }

    fn describe_label(&self, label: &LabelField) -> FieldDescriptor {
        let info = self.infos.get(&label.name).cloned().unwrap_or_default();
        FieldDescriptor {
            title: info.title.clone().unwrap_or_else(|| humanize(&label.name)),
            name: label.name.clone(),
            alias: label.name.clone(),
            table: self.model.table.clone(),
            field_type: label.field_type.clone(),
            nullable: true,
            primary_key: false,
            auto_increment: false,
            has_default: false,
            info,
            source: FieldSource::Label(label.expr.clone()),
        }
    }
}
