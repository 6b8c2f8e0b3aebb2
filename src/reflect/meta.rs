//! Entity metadata captured from sea-orm's static column and relation definitions.

use sea_orm::{
    ColumnTrait, ColumnType, EntityName, EntityTrait, IdenStatic, Identity, Iterable, PrimaryKeyToColumn,
    PrimaryKeyTrait, RelationTrait, RelationType, sea_query::{StringLen, TableRef},
};

/// Semantic type of a persisted attribute, collapsed from sea-orm's `ColumnType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Integer,
    Float,
    Decimal,
    String,
    Text,
    Enum(Vec<String>),
    Date,
    DateTime,
    DateTimeTz,
    Time,
    Uuid,
    Json,
    Binary,
}

impl FieldType {
    #[must_use]
    pub fn from_column_type(column_type: &ColumnType) -> Self {
        match column_type {
            ColumnType::Boolean => Self::Bool,
            ColumnType::TinyInteger
            | ColumnType::SmallInteger
            | ColumnType::Integer
            | ColumnType::BigInteger
            | ColumnType::TinyUnsigned
            | ColumnType::SmallUnsigned
            | ColumnType::Unsigned
            | ColumnType::BigUnsigned
            | ColumnType::Year => Self::Integer,
            ColumnType::Float | ColumnType::Double => Self::Float,
            ColumnType::Decimal(_) | ColumnType::Money(_) => Self::Decimal,
            ColumnType::Text => Self::Text,
            ColumnType::Enum { variants, .. } => {
                Self::Enum(variants.iter().map(|variant| variant.to_string()).collect())
            }
            ColumnType::Date => Self::Date,
            ColumnType::DateTime | ColumnType::Timestamp => Self::DateTime,
            ColumnType::TimestampWithTimeZone => Self::DateTimeTz,
            ColumnType::Time => Self::Time,
            ColumnType::Uuid => Self::Uuid,
            ColumnType::Json | ColumnType::JsonBinary => Self::Json,
            ColumnType::Blob
            | ColumnType::Binary(_)
            | ColumnType::VarBinary(_)
            | ColumnType::Bit(_)
            | ColumnType::VarBit(_) => Self::Binary,
            _ => Self::String,
        }
    }

    /// Types whose wire value is already a bool, an enum choice or a string.
    ///
    /// Filter schemas keep these as-is; every other type is carried as a string
    /// so it can hold the bracket-operator prefix.
    #[must_use]
    pub const fn is_filter_native(&self) -> bool {
        matches!(self, Self::Bool | Self::Enum(_) | Self::String | Self::Text)
    }

    #[must_use]
    pub const fn is_textual(&self) -> bool {
        matches!(self, Self::String | Self::Text)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Float | Self::Decimal)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Decimal => "decimal",
            Self::String => "string",
            Self::Text => "text",
            Self::Enum(_) => "enum",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::DateTimeTz => "datetime_tz",
            Self::Time => "time",
            Self::Uuid => "uuid",
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }
}

fn max_length_of(column_type: &ColumnType) -> Option<u32> {
    match column_type {
        ColumnType::Char(Some(len)) | ColumnType::String(StringLen::N(len)) => Some(*len),
        _ => None,
    }
}

/// One persisted attribute of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelField {
    pub table: String,
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
    pub unique: bool,
    pub has_default: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub max_length: Option<u32>,
}

impl ModelField {
    fn from_column<C: ColumnTrait>(column: &C, primary_key: bool, auto_increment: bool) -> Self {
        let def = column.def();
        let column_type = def.get_column_type();
        Self {
            table: column.entity_name().to_string(),
            name: column.as_str().to_owned(),
            field_type: FieldType::from_column_type(column_type),
            nullable: def.is_null(),
            unique: def.is_unique(),
            has_default: def.get_column_default().is_some(),
            primary_key,
            auto_increment: primary_key && auto_increment,
            max_length: max_length_of(column_type),
        }
    }
}

/// A single-column foreign key declared through a `belongs_to` relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub references_table: String,
    pub references_column: String,
}

/// Reflected shape of one entity: its table, ordered columns and foreign keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelMeta {
    pub name: String,
    pub table: String,
    pub fields: Vec<ModelField>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl ModelMeta {
    /// Reflect an entity's columns and `belongs_to` relations.
    #[must_use]
    pub fn of<E: EntityTrait>() -> Self {
        let table = E::default().table_name().to_owned();
        let key_columns: Vec<String> = E::PrimaryKey::iter()
            .map(|key| key.into_column().as_str().to_owned())
            .collect();
        let auto_increment = <E::PrimaryKey as PrimaryKeyTrait>::auto_increment();

        let fields = E::Column::iter()
            .map(|column| {
                let primary_key = key_columns.iter().any(|key| key == column.as_str());
                ModelField::from_column(&column, primary_key, auto_increment)
            })
            .collect();

        let foreign_keys = E::Relation::iter()
            .filter_map(|relation| {
                let def = relation.def();
                if def.is_owner || !matches!(def.rel_type, RelationType::HasOne) {
                    return None;
                }
                Some(ForeignKey {
                    column: single_column(&def.from_col)?,
                    references_table: table_name(&def.to_tbl)?,
                    references_column: single_column(&def.to_col)?,
                })
            })
            .collect();

        Self {
            name: pascal_case(&table),
            table,
            fields,
            foreign_keys,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&ModelField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// First primary key column. Composite keys are addressed by their leading column only.
    #[must_use]
    pub fn primary_key(&self) -> Option<&ModelField> {
        self.fields.iter().find(|field| field.primary_key)
    }

    #[must_use]
    pub fn foreign_keys_to(&self, table: &str) -> Vec<&ForeignKey> {
        self.foreign_keys
            .iter()
            .filter(|fk| fk.references_table == table)
            .collect()
    }
}

/// Declared relationship of an owning entity, optionally through a join entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipMeta {
    pub name: String,
    pub target: ModelMeta,
    pub secondary: Option<ModelMeta>,
}

impl RelationshipMeta {
    /// Relationship reached through the join entity `Via`.
    #[must_use]
    pub fn many_to_many<Target: EntityTrait, Via: EntityTrait>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: ModelMeta::of::<Target>(),
            secondary: Some(ModelMeta::of::<Via>()),
        }
    }

    /// Plain relationship without a join table.
    #[must_use]
    pub fn direct<Target: EntityTrait>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: ModelMeta::of::<Target>(),
            secondary: None,
        }
    }
}

pub(crate) fn table_name(table: &TableRef) -> Option<String> {
    match table {
        TableRef::Table(iden)
        | TableRef::SchemaTable(_, iden)
        | TableRef::DatabaseSchemaTable(_, _, iden)
        | TableRef::TableAlias(iden, _)
        | TableRef::SchemaTableAlias(_, iden, _)
        | TableRef::DatabaseSchemaTableAlias(_, _, iden, _) => Some(iden.to_string()),
        _ => None,
    }
}

pub(crate) fn single_column(identity: &Identity) -> Option<String> {
    match identity {
        Identity::Unary(iden) => Some(iden.to_string()),
        _ => None,
    }
}

/// `create_time` -> `Create Time`
#[must_use]
pub fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `article_tag` -> `ArticleTag`
#[must_use]
pub fn pascal_case(name: &str) -> String {
    name.split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
