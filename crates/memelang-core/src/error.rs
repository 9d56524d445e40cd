use thiserror::Error;

/// A backend failure surfaced through the [`crate::resolver::Database`] seam.
///
/// `memelang-core` never talks to a database directly; it only knows that a
/// `Database` call can fail and wraps whatever the implementation reports.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum MemelangError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown key: {0}")]
    Unknown(String),

    #[error("duplicate key: '{key}' is already bound to id {existing}, cannot rebind to {attempted}")]
    DuplicateKey {
        key: String,
        existing: i64,
        attempted: i64,
    },

    #[error("shape violation: {0}")]
    ShapeViolation(String),

    #[error("invalid id: {0} must be greater than the reserved ceiling")]
    InvalidId(i64),

    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub type Result<T> = std::result::Result<T, MemelangError>;
