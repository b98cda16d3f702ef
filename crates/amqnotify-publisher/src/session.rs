use amqnotify_transport::{
    AckMode, ConnectOptions, Connection, Endpoint, LoggingListener, StompConnection,
};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::{Auth, PublisherConfig};
use crate::error::Result;
use crate::notification::Notification;

/// Name under which the logging listener is registered on every connection.
const LOGGING_LISTENER: &str = "logging";

/// Opens broker connections for a publisher.
pub trait Connector {
    type Conn: Connection;

    /// A fresh, not yet connected connection to `endpoints`.
    fn open(&self, endpoints: &[Endpoint]) -> Self::Conn;
}

/// Connects through [`StompConnection`].
#[derive(Debug, Clone, Default)]
pub struct StompConnector {
    options: ConnectOptions,
}

impl StompConnector {
    pub fn new(options: ConnectOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }
}

impl Connector for StompConnector {
    type Conn = StompConnection;

    fn open(&self, endpoints: &[Endpoint]) -> StompConnection {
        StompConnection::with_options(endpoints.to_vec(), self.options.clone())
    }
}

/// Ordered notifications delivered over one connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch(Vec<Notification>);

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.0.push(notification);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Notification> {
        self.0.iter()
    }
}

impl From<Notification> for Batch {
    fn from(notification: Notification) -> Self {
        Self(vec![notification])
    }
}

impl From<Vec<Notification>> for Batch {
    fn from(notifications: Vec<Notification>) -> Self {
        Self(notifications)
    }
}

impl FromIterator<Notification> for Batch {
    fn from_iter<I: IntoIterator<Item = Notification>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Notification;
    type IntoIter = std::slice::Iter<'a, Notification>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Result of one [`Publisher::send`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct SendOutcome {
    /// Whether a connection was established and sending was attempted.
    pub attempted: bool,
    /// Bodies that could not be sent, in batch order.
    pub failures: Vec<Value>,
    /// Number of notifications in the batch.
    pub total: usize,
}

impl SendOutcome {
    fn not_attempted(total: usize) -> Self {
        Self {
            attempted: false,
            failures: Vec::new(),
            total,
        }
    }

    /// Bodies that could not be sent. Empty both on full success and when no
    /// connection could be made; check [`SendOutcome::attempted`] to tell them apart.
    pub fn failed_bodies(&self) -> &[Value] {
        &self.failures
    }

    /// Number of notifications handed to the broker.
    pub fn delivered(&self) -> usize {
        if self.attempted {
            self.total.saturating_sub(self.failures.len())
        } else {
            0
        }
    }

    /// Connected and sent every notification.
    pub fn is_delivered(&self) -> bool {
        self.attempted && self.failures.is_empty()
    }
}

/// Sends notification batches to the configured topic.
///
/// Each [`Publisher::send`] opens its own connection and closes it before
/// returning. Calls block; a broker that stops responding blocks the caller
/// until the connector's timeouts expire.
pub struct Publisher<C: Connector = StompConnector> {
    config: PublisherConfig,
    connector: C,
}

impl Publisher<StompConnector> {
    pub fn new(config: PublisherConfig) -> Self {
        Self::with_connector(config, StompConnector::default())
    }
}

impl<C: Connector> Publisher<C> {
    pub fn with_connector(config: PublisherConfig, connector: C) -> Self {
        Self { config, connector }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// Connect, send every notification in order, disconnect.
    ///
    /// Per-item failures are logged and their bodies recorded; the remaining
    /// notifications are still sent.
    pub fn send(&self, batch: impl Into<Batch>) -> SendOutcome {
        let batch = batch.into();
        let total = batch.len();

        let mut connection = self.connector.open(&self.config.endpoints);
        connection.set_listener(LOGGING_LISTENER, Box::new(LoggingListener::new()));
        let credentials = match &self.config.auth {
            Auth::Certificate(identity) => {
                connection.set_tls(identity.clone());
                None
            }
            Auth::Credentials(credentials) => Some(credentials),
        };

        if let Err(err) = connection.connect(credentials) {
            error!(error = %err, "connection to broker failed");
            return SendOutcome::not_attempted(total);
        }

        let mut failures = Vec::new();
        for notification in &batch {
            if let Err(err) = self.send_one(&mut connection, notification) {
                error!(
                    headers = ?notification.wire_headers(),
                    error = %err,
                    "failed to send notification"
                );
                failures.push(notification.body_value());
            }
        }

        if connection.is_connected() {
            if let Err(err) = connection.disconnect() {
                warn!(error = %err, "disconnect from broker failed");
            }
        }

        if failures.is_empty() {
            debug!(total, topic = %self.config.topic, "sent all notifications");
        } else {
            warn!("failed to send {} docs out of {}", failures.len(), total);
        }

        SendOutcome {
            attempted: true,
            failures,
            total,
        }
    }

    fn send_one(&self, connection: &mut C::Conn, notification: &Notification) -> Result<()> {
        let body = notification.body_json()?;
        connection.send(
            &self.config.topic,
            &notification.wire_headers(),
            &body,
            AckMode::Auto,
        )?;
        Ok(())
    }
}
