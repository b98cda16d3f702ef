use amqnotify_frame::FrameError;

/// Errors that can occur in broker transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No endpoint was configured for the connection.
    #[error("no broker endpoints configured")]
    NoEndpoints,

    /// An endpoint string is not `host:port`.
    #[error("invalid broker endpoint {0:?} (expected host:port)")]
    InvalidEndpoint(String),

    /// Connecting to (or logging in at) an endpoint failed.
    #[error("failed to connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// TLS material could not be loaded or is unusable.
    #[error("TLS setup failed: {0}")]
    Tls(String),

    /// The operation needs an established session.
    #[error("not connected")]
    NotConnected,

    /// The broker answered with an ERROR frame.
    #[error("broker error: {0}")]
    Broker(String),

    /// Frame-level error on an established session.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True when the error means no session was ever established.
    pub fn is_connect_failure(&self) -> bool {
        matches!(
            self,
            TransportError::NoEndpoints
                | TransportError::InvalidEndpoint(_)
                | TransportError::Connect { .. }
                | TransportError::Tls(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_failures_are_classified() {
        assert!(TransportError::NoEndpoints.is_connect_failure());
        assert!(TransportError::Tls("no key".into()).is_connect_failure());
        assert!(TransportError::Connect {
            endpoint: "mq:61613".into(),
            reason: "refused".into(),
        }
        .is_connect_failure());

        assert!(!TransportError::NotConnected.is_connect_failure());
        assert!(!TransportError::Frame(FrameError::ConnectionClosed).is_connect_failure());
    }
}
