use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::command::Command;
use crate::error::{FrameError, Result};

/// Default maximum body size: 16 MiB.
pub const DEFAULT_MAX_BODY: usize = 16 * 1024 * 1024;

const CONTENT_LENGTH: &str = "content-length";

/// A STOMP frame: command, ordered headers and an opaque body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The frame command.
    pub command: Command,
    /// Headers in wire order. Repeated names are kept; the first one wins on lookup.
    pub headers: Vec<(String, String)>,
    /// The frame body.
    pub body: Bytes,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// A heart-beat (bare EOL).
    pub fn heartbeat() -> Self {
        Self::new(Command::Heartbeat)
    }

    /// Append a header, builder style.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_header(name, value);
        self
    }

    /// Append a header.
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Set the body, builder style.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_heartbeat(&self) -> bool {
        self.command == Command::Heartbeat
    }
}

/// Encode a frame into the wire format.
///
/// A `content-length` header is added when the body is non-empty and the
/// caller did not set one.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    if frame.is_heartbeat() {
        dst.put_u8(b'\n');
        return Ok(());
    }

    let escape = frame.command.escapes_headers();
    dst.reserve(frame.command.as_str().len() + frame.body.len() + 64);
    dst.put_slice(frame.command.as_str().as_bytes());
    dst.put_u8(b'\n');

    for (name, value) in &frame.headers {
        put_header_text(dst, name, escape);
        dst.put_u8(b':');
        put_header_text(dst, value, escape);
        dst.put_u8(b'\n');
    }

    if !frame.body.is_empty() && frame.header(CONTENT_LENGTH).is_none() {
        dst.put_slice(format!("{CONTENT_LENGTH}:{}\n", frame.body.len()).as_bytes());
    }

    dst.put_u8(b'\n');
    dst.put_slice(&frame.body);
    dst.put_u8(0);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_body: usize) -> Result<Option<Frame>> {
    match src.first() {
        None => return Ok(None),
        Some(b'\n') => {
            src.advance(1);
            return Ok(Some(Frame::heartbeat()));
        }
        Some(b'\r') => match src.get(1) {
            None => return Ok(None),
            Some(b'\n') => {
                src.advance(2);
                return Ok(Some(Frame::heartbeat()));
            }
            Some(_) => {}
        },
        Some(_) => {}
    }

    let mut pos = 0usize;
    let command_line = match next_line(src, &mut pos)? {
        Some(line) => line,
        None => return Ok(None),
    };
    let command = Command::parse(command_line)?;
    let escaped = command.escapes_headers();

    let mut headers = Vec::new();
    loop {
        let line = match next_line(src, &mut pos)? {
            Some(line) => line,
            None => return Ok(None),
        };
        if line.is_empty() {
            break;
        }
        headers.push(parse_header(line, escaped)?);
    }

    let body_start = pos;
    let content_length = headers
        .iter()
        .find(|(name, _)| name == CONTENT_LENGTH)
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| FrameError::InvalidContentLength(value.clone()))
        })
        .transpose()?;

    let body_len = match content_length {
        Some(len) => {
            if len > max_body {
                return Err(FrameError::BodyTooLarge {
                    size: len,
                    max: max_body,
                });
            }
            if src.len() < body_start + len + 1 {
                return Ok(None);
            }
            if src[body_start + len] != 0 {
                return Err(FrameError::MissingTerminator);
            }
            len
        }
        None => match src[body_start..].iter().position(|byte| *byte == 0) {
            Some(len) if len > max_body => {
                return Err(FrameError::BodyTooLarge {
                    size: len,
                    max: max_body,
                });
            }
            Some(len) => len,
            None if src.len() - body_start > max_body => {
                return Err(FrameError::BodyTooLarge {
                    size: src.len() - body_start,
                    max: max_body,
                });
            }
            None => return Ok(None),
        },
    };

    src.advance(body_start);
    let body = src.split_to(body_len).freeze();
    src.advance(1);

    Ok(Some(Frame {
        command,
        headers,
        body,
    }))
}

/// Limits applied by [`FrameReader`](crate::FrameReader) and [`FrameWriter`](crate::FrameWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum body size in bytes. Default: 16 MiB.
    pub max_body_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_body_size: DEFAULT_MAX_BODY,
        }
    }
}

fn next_line<'a>(src: &'a BytesMut, pos: &mut usize) -> Result<Option<&'a str>> {
    let rest = &src[*pos..];
    let Some(newline) = rest.iter().position(|byte| *byte == b'\n') else {
        return Ok(None);
    };
    let mut line = &rest[..newline];
    if let Some(stripped) = line.strip_suffix(b"\r") {
        line = stripped;
    }
    *pos += newline + 1;
    std::str::from_utf8(line)
        .map(Some)
        .map_err(|_| FrameError::InvalidHeader(String::from_utf8_lossy(line).into_owned()))
}

fn parse_header(line: &str, escaped: bool) -> Result<(String, String)> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| FrameError::InvalidHeader(line.to_string()))?;
    if !escaped {
        return Ok((name.to_string(), value.to_string()));
    }
    Ok((unescape(name, line)?, unescape(value, line)?))
}

fn unescape(text: &str, line: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some('\\') => out.push('\\'),
            _ => return Err(FrameError::InvalidHeader(line.to_string())),
        }
    }
    Ok(out)
}

fn put_header_text(dst: &mut BytesMut, text: &str, escape: bool) {
    if !escape {
        dst.put_slice(text.as_bytes());
        return;
    }
    for ch in text.chars() {
        match ch {
            '\\' => dst.put_slice(b"\\\\"),
            '\n' => dst.put_slice(b"\\n"),
            '\r' => dst.put_slice(b"\\r"),
            ':' => dst.put_slice(b"\\c"),
            other => {
                let mut utf8 = [0u8; 4];
                dst.put_slice(other.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_frame_wire_layout() {
        let frame = Frame::new(Command::Send)
            .with_header("destination", "/topic/cms.monit")
            .with_body(&b"{\"a\":1}"[..]);

        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf).unwrap();

        assert_eq!(
            buf.as_ref(),
            b"SEND\ndestination:/topic/cms.monit\ncontent-length:7\n\n{\"a\":1}\0"
        );
    }

    #[test]
    fn decode_consumes_exactly_one_frame() {
        let mut buf = BytesMut::new();
        encode_frame(&Frame::new(Command::Receipt).with_header("receipt-id", "1"), &mut buf)
            .unwrap();
        encode_frame(&Frame::new(Command::Receipt).with_header("receipt-id", "2"), &mut buf)
            .unwrap();

        let first = decode_frame(&mut buf, DEFAULT_MAX_BODY).unwrap().unwrap();
        assert_eq!(first.header("receipt-id"), Some("1"));
        let second = decode_frame(&mut buf, DEFAULT_MAX_BODY).unwrap().unwrap();
        assert_eq!(second.header("receipt-id"), Some("2"));
        assert!(buf.is_empty());
    }

    #[test]
    fn header_values_are_escaped_and_restored() {
        let frame = Frame::new(Command::Send).with_header("note", "a:b\nc\\d");
        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf).unwrap();
        assert!(buf.as_ref().starts_with(b"SEND\nnote:a\\cb\\nc\\\\d\n"));

        let decoded = decode_frame(&mut buf, DEFAULT_MAX_BODY).unwrap().unwrap();
        assert_eq!(decoded.header("note"), Some("a:b\nc\\d"));
    }

    #[test]
    fn connect_headers_are_not_escaped() {
        let frame = Frame::new(Command::Connect).with_header("passcode", "p:w");
        let mut buf = BytesMut::new();
        encode_frame(&frame, &mut buf).unwrap();
        assert_eq!(buf.as_ref(), b"CONNECT\npasscode:p:w\n\n\0");

        let mut wire = BytesMut::from(&b"CONNECTED\nserver:broker/1.0:x\n\n\0"[..]);
        let decoded = decode_frame(&mut wire, DEFAULT_MAX_BODY).unwrap().unwrap();
        assert_eq!(decoded.header("server"), Some("broker/1.0:x"));
    }

    #[test]
    fn heartbeats_between_frames() {
        let mut wire = BytesMut::from(&b"\n\r\nRECEIPT\nreceipt-id:9\n\n\0"[..]);

        assert!(decode_frame(&mut wire, DEFAULT_MAX_BODY)
            .unwrap()
            .unwrap()
            .is_heartbeat());
        assert!(decode_frame(&mut wire, DEFAULT_MAX_BODY)
            .unwrap()
            .unwrap()
            .is_heartbeat());
        let frame = decode_frame(&mut wire, DEFAULT_MAX_BODY).unwrap().unwrap();
        assert_eq!(frame.command, Command::Receipt);
    }

    #[test]
    fn crlf_line_endings_accepted() {
        let mut wire = BytesMut::from(&b"ERROR\r\nmessage:bad login\r\n\r\ndenied\0"[..]);
        let frame = decode_frame(&mut wire, DEFAULT_MAX_BODY).unwrap().unwrap();
        assert_eq!(frame.command, Command::Error);
        assert_eq!(frame.header("message"), Some("bad login"));
        assert_eq!(frame.body_text(), "denied");
    }

    #[test]
    fn content_length_allows_embedded_nul() {
        let mut wire = BytesMut::from(&b"MESSAGE\ncontent-length:3\n\na\0b\0"[..]);
        let frame = decode_frame(&mut wire, DEFAULT_MAX_BODY).unwrap().unwrap();
        assert_eq!(frame.body.as_ref(), b"a\0b");
        assert!(wire.is_empty());
    }

    #[test]
    fn incomplete_frame_returns_none() {
        let mut wire = BytesMut::from(&b"MESSAGE\ncontent-length:10\n\nabc"[..]);
        assert!(decode_frame(&mut wire, DEFAULT_MAX_BODY).unwrap().is_none());

        let mut wire = BytesMut::from(&b"CONNECTED\nversion:1.2"[..]);
        assert!(decode_frame(&mut wire, DEFAULT_MAX_BODY).unwrap().is_none());
    }

    #[test]
    fn missing_terminator_after_declared_length() {
        let mut wire = BytesMut::from(&b"MESSAGE\ncontent-length:1\n\nab\0"[..]);
        assert!(matches!(
            decode_frame(&mut wire, DEFAULT_MAX_BODY),
            Err(FrameError::MissingTerminator)
        ));
    }

    #[test]
    fn oversized_body_rejected() {
        let mut wire = BytesMut::from(&b"MESSAGE\ncontent-length:64\n\n"[..]);
        assert!(matches!(
            decode_frame(&mut wire, 16),
            Err(FrameError::BodyTooLarge { size: 64, max: 16 })
        ));
    }

    #[test]
    fn bad_header_escape_rejected() {
        let mut wire = BytesMut::from(&b"MESSAGE\nkey:va\\tl\n\n\0"[..]);
        assert!(matches!(
            decode_frame(&mut wire, DEFAULT_MAX_BODY),
            Err(FrameError::InvalidHeader(_))
        ));
    }

    #[test]
    fn invalid_content_length_rejected() {
        let mut wire = BytesMut::from(&b"MESSAGE\ncontent-length:ten\n\n\0"[..]);
        assert!(matches!(
            decode_frame(&mut wire, DEFAULT_MAX_BODY),
            Err(FrameError::InvalidContentLength(_))
        ));
    }
}
