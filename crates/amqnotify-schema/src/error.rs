/// Errors that can occur while loading or resolving schemas.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// No local file or registry entry matches the schema name.
    #[error("schema not found: {0}")]
    NotFound(String),

    /// The schema source is not a usable schema document.
    #[error("schema {name} is not valid: {message}")]
    Malformed { name: String, message: String },

    /// The schema file could not be read.
    #[error("failed to load schema: {0}")]
    LoadFailed(String),

    /// The validator was constructed without a usable schema location.
    #[error("schema configuration error: {0}")]
    Config(String),

    /// The document is not valid JSON.
    #[error("document is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl SchemaError {
    pub(crate) fn malformed(name: &str, message: impl Into<String>) -> Self {
        SchemaError::Malformed {
            name: name.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchemaError>;
