//! Many-to-many associations through a join table.
//!
//! A [`LinkAssociation`] is always seen from the admin that holds it: `local`
//! is the join-table column pointing at that admin's rows, `remote` the column
//! pointing at the other side.

use sea_orm::{
    ConnectionTrait, Value,
    sea_query::{Alias, Expr, Query, SimpleExpr},
};

use crate::errors::ApiError;
use crate::reflect::{FieldType, ModelMeta, RelationshipMeta};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkAssociation {
    pub join_table: String,
    pub local_column: String,
    pub remote_column: String,
    /// Table at the other end of the join.
    pub remote_table: String,
    /// Key type of the other end, used to coerce its ids.
    pub remote_key_type: FieldType,
}

impl LinkAssociation {
    /// The same association seen from the other end.
    #[must_use]
    pub fn reversed(&self, local_table: &str, local_key_type: FieldType) -> Self {
        Self {
            join_table: self.join_table.clone(),
            local_column: self.remote_column.clone(),
            remote_column: self.local_column.clone(),
            remote_table: local_table.to_owned(),
            remote_key_type: local_key_type,
        }
    }

    /// `local_key IN (SELECT local FROM join WHERE remote IN remote_ids)`, or `NOT IN` when negated.
    #[must_use]
    pub fn clause(&self, local_key: SimpleExpr, remote_ids: Vec<Value>, negate: bool) -> SimpleExpr {
        let mut linked = Query::select();
        linked
            .column(Alias::new(self.local_column.as_str()))
            .from(Alias::new(self.join_table.as_str()))
            .and_where(Expr::col(Alias::new(self.remote_column.as_str())).is_in(remote_ids));

        let key = Expr::expr(local_key);
        if negate {
            key.not_in_subquery(linked)
        } else {
            key.in_subquery(linked)
        }
    }

    /// Insert every `(local, remote)` pair. Returns the number of rows written.
    ///
    /// # Errors
    /// Constraint violations (e.g. a pair that already exists) surface as
    /// [`ApiError::Integrity`].
    pub async fn create_links<C: ConnectionTrait>(
        &self,
        conn: &C,
        local_ids: &[Value],
        remote_ids: &[Value],
    ) -> Result<u64, ApiError> {
        if local_ids.is_empty() || remote_ids.is_empty() {
            return Ok(0);
        }

        let mut insert = Query::insert();
        insert.into_table(Alias::new(self.join_table.as_str())).columns([
            Alias::new(self.local_column.as_str()),
            Alias::new(self.remote_column.as_str()),
        ]);
        for local in local_ids {
            for remote in remote_ids {
                insert
                    .values([local.clone().into(), remote.clone().into()])
                    .map_err(|err| ApiError::internal("Failed to build link insert", Some(err.to_string())))?;
            }
        }

        let backend = conn.get_database_backend();
        let result = conn.execute(backend.build(&insert)).await.map_err(ApiError::database)?;
        Ok(result.rows_affected())
    }

    /// Delete join rows matching `local IN local_ids AND remote IN remote_ids`.
    ///
    /// # Errors
    /// Returns the classified storage error.
    pub async fn delete_links<C: ConnectionTrait>(
        &self,
        conn: &C,
        local_ids: &[Value],
        remote_ids: &[Value],
    ) -> Result<u64, ApiError> {
        if local_ids.is_empty() || remote_ids.is_empty() {
            return Ok(0);
        }

        let mut delete = Query::delete();
        delete
            .from_table(Alias::new(self.join_table.as_str()))
            .and_where(Expr::col(Alias::new(self.local_column.as_str())).is_in(local_ids.to_vec()))
            .and_where(Expr::col(Alias::new(self.remote_column.as_str())).is_in(remote_ids.to_vec()));

        let backend = conn.get_database_backend();
        let result = conn.execute(backend.build(&delete)).await.map_err(ApiError::database)?;
        Ok(result.rows_affected())
    }
}

/// Resolve a relationship into a link association seen from `owning`.
///
/// Returns `None` when the relationship has no join table, when the join table
/// does not carry exactly one foreign key to each side, or when both sides are
/// the same table.
#[must_use]
pub fn discover(owning: &ModelMeta, relationship: &RelationshipMeta) -> Option<LinkAssociation> {
    let secondary = relationship.secondary.as_ref()?;
    let target = &relationship.target;
    if owning.table == target.table {
        return None;
    }

    let owning_side = secondary.foreign_keys_to(&owning.table);
    let target_side = secondary.foreign_keys_to(&target.table);
    match (owning_side.as_slice(), target_side.as_slice()) {
        ([local], [remote]) => Some(LinkAssociation {
            join_table: secondary.table.clone(),
            local_column: local.column.clone(),
            remote_column: remote.column.clone(),
            remote_table: target.table.clone(),
            remote_key_type: target
                .primary_key()
                .map_or(FieldType::Integer, |key| key.field_type.clone()),
        }),
        _ => None,
    }
}
