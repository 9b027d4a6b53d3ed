//! # Store Errors
//!
//! Everything the ledger store can fail with, classified so the engine can
//! tell a client mistake from a store problem.
//!
//! ```text
//! sqlx::Error ──► DbError ──► LedgerError (pdv-engine)
//!
//!   UNIQUE constraint failed: sales.id     UniqueViolation      Conflict
//!   FOREIGN KEY constraint failed          ForeignKeyViolation  Referential
//!   CHECK constraint failed: stock >= 0    CheckViolation       Validation
//!   RowNotFound / 0 rows on keyed update   NotFound             NotFound
//!   guarded update missed a present row    StaleWrite           Conflict
//!   pool timeout, I/O, begin/commit        the rest             TransientStore
//! ```

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    /// A keyed lookup or update found no row.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A UNIQUE index rejected the row. `constraint` is SQLite's
    /// `table.column` list.
    ///
    /// ## When This Occurs
    /// - Two requests race to insert the same sale id
    /// - Two terminals sync a debt with the same local id
    #[error("Duplicate key on {constraint}")]
    UniqueViolation { constraint: String },

    /// A guarded update found its row in a state other than the one the
    /// caller validated against.
    ///
    /// ## When This Occurs
    /// - A payment would push a debt past its total, or the debt is
    ///   already settled
    #[error("{entity} {id} changed since it was read")]
    StaleWrite { entity: String, id: String },

    /// A line or payment points at a row that does not exist.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// A CHECK rejected a value (negative stock, unknown debt status).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// The database file could not be opened or the pool is closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// The statement failed for a reason other than a constraint.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Begin, commit or savepoint release failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free within the acquire timeout.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("Internal database error: {0}")]
    Internal(String),
}

pub type DbResult<T> = Result<T, DbError>;

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Maps an error raised by `begin`/`commit`/`rollback`. Constraint
    /// failures deferred to commit keep their class.
    pub fn transaction(err: sqlx::Error) -> Self {
        match DbError::from(err) {
            DbError::Internal(msg) | DbError::QueryFailed(msg) => DbError::TransactionFailed(msg),
            other => other,
        }
    }

    /// Failures a caller may retry unchanged.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_)
                | DbError::TransactionFailed(_)
                | DbError::PoolExhausted
                | DbError::QueryFailed(_)
                | DbError::Internal(_)
        )
    }

    fn from_database(err: &dyn sqlx::error::DatabaseError) -> Self {
        let message = err.message();

        match err.kind() {
            sqlx::error::ErrorKind::UniqueViolation => DbError::UniqueViolation {
                constraint: message
                    .strip_prefix("UNIQUE constraint failed: ")
                    .unwrap_or(message)
                    .to_string(),
            },
            sqlx::error::ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation {
                message: message.to_string(),
            },
            sqlx::error::ErrorKind::CheckViolation => DbError::CheckViolation {
                message: message.to_string(),
            },
            _ => DbError::QueryFailed(message.to_string()),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => DbError::from_database(db_err.as_ref()),
            sqlx::Error::RowNotFound => DbError::not_found("Row", "unknown"),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".to_string()),
            other => DbError::Internal(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn test_transient_classes() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, DbError::PoolExhausted));
        assert!(err.is_transient());

        let dup = DbError::UniqueViolation {
            constraint: "sales.id".into(),
        };
        assert!(!dup.is_transient());
        assert_eq!(dup.to_string(), "Duplicate key on sales.id");
    }

    #[tokio::test]
    async fn test_sqlite_constraint_codes_are_classified() {
        use sqlx::Connection;

        let mut conn = sqlx::SqliteConnection::connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE t (id TEXT PRIMARY KEY, qty REAL CHECK (qty >= 0))")
            .execute(&mut conn)
            .await
            .unwrap();
        sqlx::query("INSERT INTO t VALUES ('a', 1)")
            .execute(&mut conn)
            .await
            .unwrap();

        let dup: DbError = sqlx::query("INSERT INTO t VALUES ('a', 2)")
            .execute(&mut conn)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(dup, DbError::UniqueViolation { ref constraint } if constraint == "t.id"));

        let check: DbError = sqlx::query("INSERT INTO t VALUES ('b', -1)")
            .execute(&mut conn)
            .await
            .unwrap_err()
            .into();
        assert!(matches!(check, DbError::CheckViolation { .. }));
    }
}
