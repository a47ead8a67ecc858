//! Error types for the data layer.
//!
//! All store operations return [`DbError`]. The variants are grouped by how a
//! caller is expected to react:
//!
//! - connectivity: [`DbError::Unreachable`], and [`DbError::Postgres`] when
//!   [`DbError::is_transient`] says so
//! - constraint violations: [`DbError::DuplicateUsername`]
//! - credential and session lookups: [`DbError::InvalidCredentials`] and
//!   [`DbError::InvalidToken`], which never say *why* the lookup failed
//! - scoped writes under [`WritePolicy::Strict`]: [`DbError::NotFound`]
//!
//! The data layer never logs an error; it only hands it back.
//!
//! [`WritePolicy::Strict`]: crate::policy::WritePolicy::Strict

/// Name of the unique constraint on `users.username`.
pub(crate) const USERNAME_UNIQUE_CONSTRAINT: &str = "users_username_key";

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The store could not be reached within the bootstrap retry budget.
    #[error("PostgreSQL unreachable after {attempts} attempt(s): {source}")]
    Unreachable {
        /// How many connection attempts were made.
        attempts: u32,
        /// The error from the last attempt.
        #[source]
        source: Box<Self>,
    },

    /// The username is already taken.
    #[error("user already exists: {0}")]
    DuplicateUsername(String),

    /// Username/password did not match an account.
    ///
    /// Unknown usernames and wrong passwords both produce this variant.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The password is longer than the hash function reads.
    #[error("password exceeds {max} bytes")]
    PasswordTooLong {
        /// Longest accepted password, in bytes.
        max: usize,
    },

    /// The session token does not exist, belongs to someone else, or was
    /// revoked.
    #[error("invalid token")]
    InvalidToken,

    /// A scoped write matched no row and the write policy is strict.
    #[error("{entity} {id} not found")]
    NotFound {
        /// The kind of row that was targeted.
        entity: &'static str,
        /// The identifier that was targeted.
        id: i64,
    },

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    /// Whether the error belongs to the connectivity class.
    ///
    /// Only bootstrap retries on these; everywhere else they are surfaced to
    /// the caller as-is.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Unreachable { .. } => true,
            Self::Postgres(err) => matches!(
                err,
                sqlx::Error::Io(_)
                    | sqlx::Error::Tls(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::WorkerCrashed
            ),
            _ => false,
        }
    }

    /// Map a failed `users` insert onto [`DbError::DuplicateUsername`] when
    /// the username constraint was the cause.
    pub(crate) fn from_user_insert(err: sqlx::Error, username: &str) -> Self {
        let duplicate = err.as_database_error().is_some_and(|db| {
            db.is_unique_violation() && db.constraint() == Some(USERNAME_UNIQUE_CONSTRAINT)
        });
        if duplicate {
            Self::DuplicateUsername(username.to_owned())
        } else {
            Self::Postgres(err)
        }
    }
}
