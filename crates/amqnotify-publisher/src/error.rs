/// Errors that can occur while configuring a publisher or sending a notification.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// Publisher configuration is incomplete or inconsistent.
    #[error("invalid publisher configuration: {0}")]
    Config(String),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] amqnotify_transport::TransportError),

    /// Schema loading error.
    #[error("schema error: {0}")]
    Schema(#[from] amqnotify_schema::SchemaError),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PublishError>;
