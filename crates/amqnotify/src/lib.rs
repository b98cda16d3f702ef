//! Publish schema-checked JSON notifications to STOMP message brokers.
//!
//! amqnotify wraps application payloads into a standard envelope, checks
//! them against named schemas and delivers them in batches over a STOMP
//! connection, reporting every body that could not be sent.
//!
//! # Crate Structure
//!
//! - [`frame`]: STOMP 1.2 frame model and codec
//! - [`transport`]: Broker connection capability and blocking STOMP client
//! - [`schema`]: Schema registry, local schema cache and key validation (behind `schema` feature)
//! - [`publisher`]: Notification builder and batch publisher (behind `publisher` feature)

/// Re-export frame types.
pub mod frame {
    pub use amqnotify_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use amqnotify_transport::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use amqnotify_schema::*;
}

/// Re-export publisher types (requires `publisher` feature).
#[cfg(feature = "publisher")]
pub mod publisher {
    pub use amqnotify_publisher::*;
}
