use std::collections::BTreeMap;

use crate::endpoint::{AckMode, Credentials, TlsIdentity};
use crate::error::Result;
use crate::listener::ConnectionListener;

/// A broker connection, as seen by the publisher.
///
/// Implementations are blocking: `connect` returns once the broker has
/// accepted or refused the session. A connection that failed to connect
/// reports `is_connected() == false` and must not be sent on.
pub trait Connection {
    /// Use TLS with a client certificate for subsequent connects.
    fn set_tls(&mut self, identity: TlsIdentity);

    /// Register a lifecycle listener, replacing any listener with the same name.
    fn set_listener(&mut self, name: &str, listener: Box<dyn ConnectionListener>);

    /// Open the session. `None` credentials means certificate authentication.
    fn connect(&mut self, credentials: Option<&Credentials>) -> Result<()>;

    /// Send one message to `destination`.
    fn send(
        &mut self,
        destination: &str,
        headers: &BTreeMap<String, String>,
        body: &str,
        ack: AckMode,
    ) -> Result<()>;

    fn is_connected(&self) -> bool;

    /// Close the session. Disconnecting an idle connection is a no-op.
    fn disconnect(&mut self) -> Result<()>;
}
