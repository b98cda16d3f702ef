use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Pulls STOMP frames off a byte stream.
///
/// Bytes past the end of one frame stay buffered for the next call, so a
/// broker that pipelines RECEIPT after MESSAGE in one segment loses nothing.
pub struct FrameReader<T> {
    inner: T,
    pending: BytesMut,
    chunk: Box<[u8]>,
    max_body_size: usize,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Enforce `config.max_body_size` on every frame.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            pending: BytesMut::with_capacity(READ_CHUNK_SIZE),
            chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            max_body_size: config.max_body_size,
        }
    }

    /// Block until one whole frame is available. Heart-beats are returned as frames.
    ///
    /// EOF, even in the middle of a frame, is `FrameError::ConnectionClosed`.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = decode_frame(&mut self.pending, self.max_body_size)? {
                return Ok(frame);
            }
            self.fill()?;
        }
    }

    /// Bytes received but not yet consumed as frames.
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    fn fill(&mut self) -> Result<()> {
        loop {
            match self.inner.read(&mut self.chunk) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(read) => {
                    self.pending.extend_from_slice(&self.chunk[..read]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::encode_frame;
    use crate::command::Command;

    fn wire_of(frames: &[Frame]) -> Vec<u8> {
        let mut wire = BytesMut::new();
        for frame in frames {
            encode_frame(frame, &mut wire).unwrap();
        }
        wire.to_vec()
    }

    #[test]
    fn read_multiple_frames() {
        let wire = wire_of(&[
            Frame::new(Command::Connected).with_header("version", "1.2"),
            Frame::heartbeat(),
            Frame::new(Command::Receipt).with_header("receipt-id", "bye"),
        ]);

        let mut reader = FrameReader::new(Cursor::new(wire));

        assert_eq!(reader.read_frame().unwrap().command, Command::Connected);
        assert!(reader.read_frame().unwrap().is_heartbeat());
        let receipt = reader.read_frame().unwrap();
        assert_eq!(receipt.header("receipt-id"), Some("bye"));
    }

    #[test]
    fn pipelined_frames_stay_buffered() {
        let wire = wire_of(&[
            Frame::new(Command::Message).with_body(&b"one"[..]),
            Frame::new(Command::Receipt).with_header("receipt-id", "r"),
        ]);
        let total = wire.len();

        let mut reader = FrameReader::new(Cursor::new(wire));
        let first = reader.read_frame().unwrap();
        assert!(reader.buffered() > 0);
        assert!(reader.buffered() < total);
        assert_eq!(first.body.as_ref(), b"one");

        reader.read_frame().unwrap();
        assert_eq!(reader.buffered(), 0);
        assert_eq!(reader.get_ref().position() as usize, total);
    }

    #[test]
    fn partial_read_handling() {
        let wire = wire_of(&[Frame::new(Command::Message).with_body(&b"slow"[..])]);

        let byte_reader = ByteByByteReader {
            bytes: wire,
            pos: 0,
        };
        let mut reader = FrameReader::new(byte_reader);

        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.body.as_ref(), b"slow");
    }

    #[test]
    fn connection_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn connection_closed_mid_frame() {
        let mut reader = FrameReader::new(Cursor::new(b"MESSAGE\ncontent-length:16\n\nonly".to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn garbage_in_stream() {
        let mut reader = FrameReader::new(Cursor::new(b"HELLO\n\n\0".to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::UnknownCommand(_)));
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }
}
