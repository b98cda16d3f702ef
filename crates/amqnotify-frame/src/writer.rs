use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Encodes frames onto a byte stream, one flushed write per frame.
pub struct FrameWriter<T> {
    inner: T,
    scratch: BytesMut,
    max_body_size: usize,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Enforce `config.max_body_size` on every frame.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            scratch: BytesMut::new(),
            max_body_size: config.max_body_size,
        }
    }

    /// Write `frame` and flush. Bodies over the configured limit are rejected
    /// before any byte reaches the stream.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.body.len() > self.max_body_size {
            return Err(FrameError::BodyTooLarge {
                size: frame.body.len(),
                max: self.max_body_size,
            });
        }

        self.scratch.clear();
        encode_frame(frame, &mut self.scratch)?;
        self.inner
            .write_all(&self.scratch)
            .and_then(|()| self.inner.flush())
            .map_err(|err| match err.kind() {
                ErrorKind::WriteZero => FrameError::ConnectionClosed,
                _ => FrameError::Io(err),
            })
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}
