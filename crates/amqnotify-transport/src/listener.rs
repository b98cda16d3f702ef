use amqnotify_frame::Frame;
use tracing::debug;

use crate::endpoint::Endpoint;

/// Maximum number of body characters echoed by [`LoggingListener::on_send`].
const SEND_PREVIEW_CHARS: usize = 160;

/// Observer of connection lifecycle events.
///
/// Every callback defaults to a no-op. Listeners have no control-flow role:
/// `on_before_message` must hand back what it was given.
pub trait ConnectionListener: Send {
    fn on_connecting(&mut self, _endpoint: &Endpoint) {}

    fn on_connected(&mut self, _headers: &[(String, String)], _body: &str) {}

    fn on_error(&mut self, _headers: &[(String, String)], _body: &str) {}

    fn on_message(&mut self, _headers: &[(String, String)], _body: &str) {}

    fn on_heartbeat(&mut self) {}

    fn on_heartbeat_timeout(&mut self) {}

    fn on_send(&mut self, _frame: &Frame) {}

    fn on_disconnected(&mut self) {}

    fn on_before_message(
        &mut self,
        headers: Vec<(String, String)>,
        body: String,
    ) -> (Vec<(String, String)>, String) {
        (headers, body)
    }
}

/// Writes every lifecycle event to the `debug` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingListener;

impl LoggingListener {
    pub fn new() -> Self {
        Self
    }
}

impl ConnectionListener for LoggingListener {
    fn on_connecting(&mut self, endpoint: &Endpoint) {
        debug!(%endpoint, "on_connecting");
    }

    fn on_connected(&mut self, headers: &[(String, String)], body: &str) {
        debug!(?headers, body, "on_connected");
    }

    fn on_error(&mut self, headers: &[(String, String)], body: &str) {
        debug!(?headers, body, "received an error");
    }

    fn on_message(&mut self, headers: &[(String, String)], body: &str) {
        debug!(?headers, body, "on_message");
    }

    fn on_heartbeat(&mut self) {
        debug!("on_heartbeat");
    }

    fn on_heartbeat_timeout(&mut self) {
        debug!("on_heartbeat_timeout");
    }

    fn on_send(&mut self, frame: &Frame) {
        let body = frame.body_text();
        let preview: String = body.chars().take(SEND_PREVIEW_CHARS).collect();
        debug!(headers = ?frame.headers, body = %preview, "on_send");
    }

    fn on_disconnected(&mut self) {
        debug!("on_disconnected");
    }

    fn on_before_message(
        &mut self,
        headers: Vec<(String, String)>,
        body: String,
    ) -> (Vec<(String, String)>, String) {
        debug!(?headers, body = %body, "on_before_message");
        (headers, body)
    }
}
