use std::fmt;
use std::io;

use amqnotify_publisher::PublishError;
use amqnotify_schema::SchemaError;
use amqnotify_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::InvalidEndpoint(_) | TransportError::NoEndpoints => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Io(source) => io_error(context, source),
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn schema_error(context: &str, err: SchemaError) -> CliError {
    match err {
        SchemaError::NotFound(_) => CliError::new(FAILURE, format!("{context}: {err}")),
        SchemaError::Malformed { .. } | SchemaError::InvalidJson(_) => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SchemaError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        SchemaError::LoadFailed(_) => CliError::new(INTERNAL, format!("{context}: {err}")),
    }
}

pub fn publish_error(context: &str, err: PublishError) -> CliError {
    match err {
        PublishError::Config(_) => CliError::new(USAGE, format!("{context}: {err}")),
        PublishError::Transport(err) => transport_error(context, err),
        PublishError::Schema(err) => schema_error(context, err),
        PublishError::Json(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_errors_are_usage_errors() {
        let err = transport_error("bad endpoint", TransportError::InvalidEndpoint("x".into()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn broker_refusal_is_a_transport_error() {
        let err = transport_error(
            "connect failed",
            TransportError::Connect {
                endpoint: "broker:61613".into(),
                reason: "refused".into(),
            },
        );
        assert_eq!(err.code, TRANSPORT_ERROR);
        assert!(err.message.contains("broker:61613"));
    }

    #[test]
    fn config_errors_map_to_usage() {
        let err = publish_error("config", PublishError::Config("producer must not be empty".into()));
        assert_eq!(err.code, USAGE);
        let err = schema_error("schema", SchemaError::Config("unset".into()));
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn missing_input_file_is_usage() {
        let err = io_error("read", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.code, USAGE);
    }
}
