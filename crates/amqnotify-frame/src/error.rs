/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The command line does not name a STOMP command.
    #[error("unknown STOMP command: {0:?}")]
    UnknownCommand(String),

    /// A header line is not `name:value` or uses an undefined escape.
    #[error("malformed header line: {0:?}")]
    InvalidHeader(String),

    /// The `content-length` header is not a valid length.
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// The body is not followed by the NUL terminator.
    #[error("frame body is not NUL terminated")]
    MissingTerminator,

    /// The body exceeds the configured maximum size.
    #[error("body too large ({size} bytes, max {max})")]
    BodyTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
