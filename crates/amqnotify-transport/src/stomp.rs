use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use amqnotify_frame::{Command, Frame, FrameConfig, FrameError, FrameReader, FrameWriter};
use bytes::Bytes;
use rustls::pki_types::ServerName;
use rustls::ClientConfig;
use tracing::{debug, warn};

use crate::endpoint::{AckMode, Credentials, Endpoint, TlsIdentity};
use crate::error::{Result, TransportError};
use crate::listener::ConnectionListener;
use crate::stream::SharedStream;
use crate::tls;
use crate::traits::Connection;

const STOMP_VERSION: &str = "1.2";
const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";
const DISCONNECT_RECEIPT: &str = "amqnotify-disconnect";

/// Socket and session options for [`StompConnection`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// TCP connect timeout per resolved address. `None` blocks until the OS gives up.
    pub connect_timeout: Option<Duration>,
    /// Read timeout while waiting for CONNECTED and the disconnect receipt.
    pub read_timeout: Option<Duration>,
    /// Write timeout for outgoing frames.
    pub write_timeout: Option<Duration>,
    /// Request a RECEIPT for DISCONNECT and wait for it.
    pub receipt_on_disconnect: bool,
    /// Value of the CONNECT `host` header. Defaults to the endpoint host.
    pub virtual_host: Option<String>,
    /// Maximum body size accepted from the broker.
    pub max_body_size: usize,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Some(Duration::from_secs(10)),
            read_timeout: Some(Duration::from_secs(10)),
            write_timeout: Some(Duration::from_secs(10)),
            receipt_on_disconnect: true,
            virtual_host: None,
            max_body_size: amqnotify_frame::DEFAULT_MAX_BODY,
        }
    }
}

struct Session {
    endpoint: Endpoint,
    stream: SharedStream,
    reader: FrameReader<SharedStream>,
    writer: FrameWriter<SharedStream>,
}

type Listeners = Vec<(String, Box<dyn ConnectionListener>)>;

/// Blocking STOMP 1.2 client connection.
///
/// Endpoints are tried in order; the first one that answers CONNECTED wins.
pub struct StompConnection {
    endpoints: Vec<Endpoint>,
    options: ConnectOptions,
    tls: Option<TlsIdentity>,
    listeners: Listeners,
    session: Option<Session>,
}

impl StompConnection {
    pub fn new(endpoints: Vec<Endpoint>) -> Self {
        Self::with_options(endpoints, ConnectOptions::default())
    }

    pub fn with_options(endpoints: Vec<Endpoint>, options: ConnectOptions) -> Self {
        Self {
            endpoints,
            options,
            tls: None,
            listeners: Vec::new(),
            session: None,
        }
    }

    /// Endpoint of the established session.
    pub fn connected_endpoint(&self) -> Option<&Endpoint> {
        self.session.as_ref().map(|session| &session.endpoint)
    }

    fn open_session(
        &mut self,
        endpoint: &Endpoint,
        tls_config: Option<Arc<ClientConfig>>,
        credentials: Option<&Credentials>,
    ) -> Result<Session> {
        let tcp = self.dial(endpoint)?;
        tcp.set_read_timeout(self.options.read_timeout)?;
        tcp.set_write_timeout(self.options.write_timeout)?;
        tcp.set_nodelay(true)?;

        let stream = match tls_config {
            Some(config) => {
                let name = ServerName::try_from(endpoint.host.clone())
                    .map_err(|err| TransportError::Tls(format!("{}: {err}", endpoint.host)))?;
                let connection = rustls::ClientConnection::new(config, name)
                    .map_err(|err| TransportError::Tls(err.to_string()))?;
                SharedStream::tls(connection, tcp)
            }
            None => SharedStream::plain(tcp),
        };

        let frame_config = FrameConfig {
            max_body_size: self.options.max_body_size,
        };
        let mut reader = FrameReader::with_config(stream.clone(), frame_config);
        let mut writer = FrameWriter::with_config(stream.clone(), frame_config);

        let host = self
            .options
            .virtual_host
            .clone()
            .unwrap_or_else(|| endpoint.host.clone());
        let mut connect = Frame::new(Command::Connect)
            .with_header("accept-version", STOMP_VERSION)
            .with_header("host", host)
            .with_header("heart-beat", "0,0");
        if let Some(credentials) = credentials {
            connect.push_header("login", credentials.username.as_str());
            connect.push_header("passcode", credentials.password.as_str());
        }
        writer.write_frame(&connect)?;

        loop {
            let reply = reader.read_frame()?;
            match reply.command {
                Command::Heartbeat => notify(&mut self.listeners, |l| l.on_heartbeat()),
                Command::Connected => {
                    let body = reply.body_text();
                    notify(&mut self.listeners, |l| l.on_connected(&reply.headers, &body));
                    debug!(%endpoint, version = ?reply.header("version"), "stomp session established");
                    return Ok(Session {
                        endpoint: endpoint.clone(),
                        stream,
                        reader,
                        writer,
                    });
                }
                Command::Error => {
                    let body = reply.body_text();
                    notify(&mut self.listeners, |l| l.on_error(&reply.headers, &body));
                    let _ = stream.shutdown();
                    return Err(TransportError::Broker(error_message(&reply)));
                }
                other => {
                    let _ = stream.shutdown();
                    return Err(TransportError::Broker(format!(
                        "unexpected {other} frame while connecting"
                    )));
                }
            }
        }
    }

    fn dial(&self, endpoint: &Endpoint) -> Result<TcpStream> {
        let addrs = (endpoint.host.as_str(), endpoint.port).to_socket_addrs()?;
        let mut last_err = None;
        for addr in addrs {
            let attempt = match self.options.connect_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }
        Err(last_err
            .unwrap_or_else(|| std::io::Error::new(ErrorKind::NotFound, "host did not resolve"))
            .into())
    }

    fn drop_session(&mut self) {
        if let Some(session) = self.session.take() {
            let _ = session.stream.shutdown();
            notify(&mut self.listeners, |l| l.on_disconnected());
        }
    }
}

impl Connection for StompConnection {
    fn set_tls(&mut self, identity: TlsIdentity) {
        self.tls = Some(identity);
    }

    fn set_listener(&mut self, name: &str, listener: Box<dyn ConnectionListener>) {
        match self.listeners.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = listener,
            None => self.listeners.push((name.to_string(), listener)),
        }
    }

    fn connect(&mut self, credentials: Option<&Credentials>) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }
        if self.endpoints.is_empty() {
            return Err(TransportError::NoEndpoints);
        }

        let tls_config = self.tls.as_ref().map(tls::client_config).transpose()?;

        let mut last_err = TransportError::NoEndpoints;
        for endpoint in self.endpoints.clone() {
            notify(&mut self.listeners, |l| l.on_connecting(&endpoint));
            match self.open_session(&endpoint, tls_config.clone(), credentials) {
                Ok(session) => {
                    self.session = Some(session);
                    return Ok(());
                }
                Err(err) => {
                    warn!(%endpoint, error = %err, "broker endpoint refused session");
                    last_err = TransportError::Connect {
                        endpoint: endpoint.to_string(),
                        reason: err.to_string(),
                    };
                }
            }
        }
        Err(last_err)
    }

    fn send(
        &mut self,
        destination: &str,
        headers: &BTreeMap<String, String>,
        body: &str,
        ack: AckMode,
    ) -> Result<()> {
        let session = self.session.as_mut().ok_or(TransportError::NotConnected)?;

        let mut frame = Frame::new(Command::Send)
            .with_header("destination", destination)
            .with_header("ack", ack.as_str())
            .with_header("content-type", JSON_CONTENT_TYPE);
        for (name, value) in headers {
            frame.push_header(name.as_str(), value.as_str());
        }
        frame.body = Bytes::copy_from_slice(body.as_bytes());

        notify(&mut self.listeners, |l| l.on_send(&frame));
        match session.writer.write_frame(&frame) {
            Ok(()) => Ok(()),
            Err(err) => {
                // A partially written frame leaves the stream unusable.
                self.drop_session();
                Err(err.into())
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn disconnect(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            return Ok(());
        };

        let mut frame = Frame::new(Command::Disconnect);
        if self.options.receipt_on_disconnect {
            frame.push_header("receipt", DISCONNECT_RECEIPT);
        }

        let result = session
            .writer
            .write_frame(&frame)
            .map_err(TransportError::from)
            .and_then(|()| {
                if self.options.receipt_on_disconnect {
                    await_receipt(&mut session.reader, &mut self.listeners)
                } else {
                    Ok(())
                }
            });

        let _ = session.stream.shutdown();
        notify(&mut self.listeners, |l| l.on_disconnected());
        debug!(endpoint = %session.endpoint, "stomp session closed");
        result
    }
}

impl Drop for StompConnection {
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.disconnect();
        }
    }
}

fn await_receipt(reader: &mut FrameReader<SharedStream>, listeners: &mut Listeners) -> Result<()> {
    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => return Ok(()),
            Err(FrameError::Io(err))
                if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                debug!("no disconnect receipt before read timeout");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        match frame.command {
            Command::Receipt if frame.header("receipt-id") == Some(DISCONNECT_RECEIPT) => {
                return Ok(());
            }
            Command::Heartbeat => notify(listeners, |l| l.on_heartbeat()),
            Command::Error => {
                let body = frame.body_text();
                notify(listeners, |l| l.on_error(&frame.headers, &body));
                return Err(TransportError::Broker(error_message(&frame)));
            }
            Command::Message => deliver_message(frame, listeners),
            _ => {}
        }
    }
}

fn deliver_message(frame: Frame, listeners: &mut Listeners) {
    let Frame { mut headers, body, .. } = frame;
    let mut body = String::from_utf8_lossy(&body).into_owned();
    for (_, listener) in listeners.iter_mut() {
        (headers, body) = listener.on_before_message(headers, body);
    }
    notify(listeners, |l| l.on_message(&headers, &body));
}

fn notify(listeners: &mut Listeners, mut event: impl FnMut(&mut dyn ConnectionListener)) {
    for (_, listener) in listeners.iter_mut() {
        event(listener.as_mut());
    }
}

fn error_message(frame: &Frame) -> String {
    match frame.header("message") {
        Some(message) => message.to_string(),
        None => frame.body_text().trim().to_string(),
    }
}
