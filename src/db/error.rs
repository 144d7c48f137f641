use sea_orm::{DbErr, SqlErr, TransactionError};

/// Errors surfaced by the data access layer.
///
/// Absence is never an error here: lookups return `Option` and deletes
/// return `bool`.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),
    #[error("Database error: {0}")]
    Db(DbErr),
}

impl From<DbErr> for StorageError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                StorageError::UniqueViolation(detail)
            }
            _ => StorageError::Db(err),
        }
    }
}

impl From<TransactionError<StorageError>> for StorageError {
    fn from(err: TransactionError<StorageError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => db_err.into(),
            TransactionError::Transaction(inner) => inner,
        }
    }
}

impl StorageError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StorageError::UniqueViolation(_))
    }
}
