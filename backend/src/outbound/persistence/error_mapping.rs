//! Shared classification of pool and Diesel failures.
//!
//! Adapters translate a [`DbFailure`] into their port's error enum, keeping
//! the match on driver error kinds in one place.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Driver-agnostic failure categories.
#[derive(Debug, Clone)]
pub(crate) enum DbFailure {
    /// The database could not be reached.
    Connection(String),
    /// A query failed.
    Query(String),
    /// A uniqueness constraint fired.
    UniqueViolation(String),
}

/// Classify a pool failure.
pub(crate) fn classify_pool(error: PoolError) -> DbFailure {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            DbFailure::Connection(message)
        }
    }
}

/// Classify a Diesel failure.
pub(crate) fn classify_diesel(error: DieselError) -> DbFailure {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        other => debug!(
            error_type = %std::any::type_name_of_val(other),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => DbFailure::Query("record not found".to_owned()),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            DbFailure::UniqueViolation(info.message().to_owned())
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            DbFailure::Connection("database connection error".to_owned())
        }
        DieselError::DatabaseError(_, _) => DbFailure::Query("database error".to_owned()),
        _ => DbFailure::Query("database error".to_owned()),
    }
}
