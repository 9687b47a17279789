use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("duplicate value: {0}")]
    Duplicate(String),
    #[error("database error: {0}")]
    Db(String),
}

/// True when the database rejected a write on a unique index.
pub fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl From<DbErr> for ModelError {
    fn from(e: DbErr) -> Self {
        if is_unique_violation(&e) {
            return ModelError::Duplicate(e.to_string());
        }
        ModelError::Db(e.to_string())
    }
}
