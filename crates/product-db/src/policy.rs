//! Policy for writes that are scoped by a filter rather than an existence
//! check.
//!
//! Order update/delete and token revocation are expressed as
//! `UPDATE ... WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL`. When
//! the filter matches nothing (foreign row, already deleted, never existed)
//! the statement still succeeds. [`WritePolicy`] decides what the caller
//! sees in that case.

use serde::Deserialize;

use crate::error::DbError;

/// What a scoped write reports when its filter matched zero rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritePolicy {
    /// Zero matched rows is success. Callers cannot tell "nothing to do"
    /// apart from "done".
    #[default]
    Permissive,
    /// Zero matched rows is [`DbError::NotFound`] and the surrounding
    /// transaction is rolled back.
    Strict,
}

impl WritePolicy {
    /// Judge the outcome of a scoped write.
    ///
    /// Returns `Ok(true)` when rows were affected, `Ok(false)` when none were
    /// and the policy is permissive.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] when no rows were affected and the
    /// policy is strict.
    pub const fn check(
        self,
        rows_affected: u64,
        entity: &'static str,
        id: i64,
    ) -> Result<bool, DbError> {
        if rows_affected > 0 {
            return Ok(true);
        }
        match self {
            Self::Permissive => Ok(false),
            Self::Strict => Err(DbError::NotFound { entity, id }),
        }
    }
}
