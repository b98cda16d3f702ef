//! STOMP 1.2 frame model and codec.
//!
//! Every frame on the wire is:
//! - a command line (`SEND`, `CONNECT`, ...)
//! - zero or more `name:value` header lines
//! - a blank line, the body, and a terminating NUL octet
//!
//! Bare end-of-line octets between frames are heart-beats and surface as
//! [`Command::Heartbeat`] frames.

pub mod command;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, Frame, FrameConfig, DEFAULT_MAX_BODY};
pub use command::Command;
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
