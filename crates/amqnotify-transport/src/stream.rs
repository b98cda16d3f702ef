use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Mutex, MutexGuard};

use rustls::{ClientConnection, StreamOwned};

/// A connected broker socket, plain or TLS.
///
/// Clones share the socket so that a frame reader and a frame writer can
/// each own a handle. Sessions are driven from one thread at a time.
#[derive(Clone)]
pub(crate) struct SharedStream {
    inner: Arc<Mutex<StreamInner>>,
}

enum StreamInner {
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
}

impl SharedStream {
    pub(crate) fn plain(stream: TcpStream) -> Self {
        Self::from_inner(StreamInner::Plain(stream))
    }

    pub(crate) fn tls(connection: ClientConnection, stream: TcpStream) -> Self {
        Self::from_inner(StreamInner::Tls(Box::new(StreamOwned::new(
            connection, stream,
        ))))
    }

    fn from_inner(inner: StreamInner) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, StreamInner>> {
        self.inner
            .lock()
            .map_err(|_| io::Error::other("broker stream lock poisoned"))
    }

    /// Send TLS close_notify when applicable, then shut the socket down.
    pub(crate) fn shutdown(&self) -> io::Result<()> {
        let mut inner = self.lock()?;
        match &mut *inner {
            StreamInner::Plain(stream) => stream.shutdown(Shutdown::Both),
            StreamInner::Tls(stream) => {
                stream.conn.send_close_notify();
                let _ = stream.flush();
                stream.sock.shutdown(Shutdown::Both)
            }
        }
    }
}

impl Read for SharedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut *self.lock()? {
            StreamInner::Plain(stream) => stream.read(buf),
            StreamInner::Tls(stream) => stream.read(buf),
        }
    }
}

impl Write for SharedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut *self.lock()? {
            StreamInner::Plain(stream) => stream.write(buf),
            StreamInner::Tls(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.lock()? {
            StreamInner::Plain(stream) => stream.flush(),
            StreamInner::Tls(stream) => stream.flush(),
        }
    }
}

impl std::fmt::Debug for SharedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.lock().as_deref() {
            Ok(StreamInner::Plain(_)) => "tcp",
            Ok(StreamInner::Tls(_)) => "tls",
            Err(_) => "poisoned",
        };
        f.debug_struct("SharedStream").field("type", &kind).finish()
    }
}
