//! Broker connection capability.
//!
//! The publisher only ever talks to a [`Connection`]: connect, send, check
//! liveness, disconnect. [`StompConnection`] is the shipped implementation,
//! a blocking STOMP 1.2 client over TCP with optional TLS client
//! certificates. Lifecycle events are reported to registered
//! [`ConnectionListener`]s.
//!
//! Heart-beating, subscriptions and reconnection are not provided.

pub mod endpoint;
pub mod error;
pub mod listener;
pub mod stomp;
pub mod traits;

mod stream;
mod tls;

pub use endpoint::{AckMode, Credentials, Endpoint, TlsIdentity};
pub use error::{Result, TransportError};
pub use listener::{ConnectionListener, LoggingListener};
pub use stomp::{ConnectOptions, StompConnection};
pub use traits::Connection;
