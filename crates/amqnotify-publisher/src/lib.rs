//! Notification construction and delivery.
//!
//! [`NotificationBuilder`] wraps an application payload into the standard
//! envelope (headers, body, metadata) and optionally checks it against a
//! schema. [`Publisher`] opens a broker connection per call, sends a batch
//! in order and reports which bodies could not be delivered.

pub mod builder;
pub mod config;
pub mod error;
pub mod notification;
pub mod session;

pub use builder::{BuildOptions, BuildOutput, NotificationBuilder};
pub use config::{Auth, PublisherConfig, PublisherConfigBuilder, DEFAULT_ENDPOINT};
pub use error::{PublishError, Result};
pub use notification::{Body, Headers, Metadata, Notification, NOTIFICATION_VERSION};
pub use session::{Batch, Connector, Publisher, SendOutcome, StompConnector};
