//! Error types for SchemaMirror

use thiserror::Error;

/// Result type for SchemaMirror operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for SchemaMirror
#[derive(Error, Debug)]
pub enum Error {
    /// A schema or diff violates one of the structural invariants
    /// (duplicate positions, two primary indexes, uneven foreign key columns, ...)
    #[error("Malformed schema: {0}")]
    MalformedSchema(String),

    /// A default value looks like a function call the generator does not know
    #[error("Unsupported default expression on column `{column}`: {value}")]
    UnsupportedDefaultExpression { column: String, value: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// Shorthand used by the validators
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedSchema(message.into())
    }
}

/// Convert Serde JSON errors to SchemaMirror errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to SchemaMirror errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
