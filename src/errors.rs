use crate::types::DocumentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Serde JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("BSON: {0}")]
    Bson(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Checksum mismatch in operation log at offset {offset}")]
    Checksum { offset: u64 },

    #[error("Query error: {0}")]
    QueryError(String),
}

impl From<std::io::Error> for DbError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Domain errors raised by the students service.
#[derive(Debug, Error)]
pub enum StudentsError {
    #[error("student with id {0} already exists")]
    AlreadyExists(DocumentId),

    #[error("student with id {0} doesn't exist")]
    StudentNotFound(DocumentId),

    #[error("no marks recorded for any student")]
    NoMarks,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Store(#[from] DbError),
}

impl StudentsError {
    /// True for the errors that report a missing target (unknown student, no marks at all).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::StudentNotFound(_) | Self::NoMarks)
    }
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Read { path: String, message: String },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}
