//! STOMP commands.
//!
//! Client frames: `CONNECT`, `STOMP`, `SEND`, `DISCONNECT`.
//! Server frames: `CONNECTED`, `MESSAGE`, `RECEIPT`, `ERROR`.

use std::fmt;

use crate::error::FrameError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Stomp,
    Send,
    Disconnect,
    Connected,
    Message,
    Receipt,
    Error,
    /// A bare EOL between frames.
    Heartbeat,
}

impl Command {
    /// Wire spelling of the command. Empty for heart-beats.
    pub fn as_str(self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Send => "SEND",
            Command::Disconnect => "DISCONNECT",
            Command::Connected => "CONNECTED",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
            Command::Heartbeat => "",
        }
    }

    /// Header values of `CONNECT` and `CONNECTED` frames are never escaped.
    pub fn escapes_headers(self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }

    /// Returns true for frames the broker sends to a client.
    pub fn is_server_frame(self) -> bool {
        matches!(
            self,
            Command::Connected | Command::Message | Command::Receipt | Command::Error
        )
    }

    pub(crate) fn parse(line: &str) -> Result<Self, FrameError> {
        match line {
            "CONNECT" => Ok(Command::Connect),
            "STOMP" => Ok(Command::Stomp),
            "SEND" => Ok(Command::Send),
            "DISCONNECT" => Ok(Command::Disconnect),
            "CONNECTED" => Ok(Command::Connected),
            "MESSAGE" => Ok(Command::Message),
            "RECEIPT" => Ok(Command::Receipt),
            "ERROR" => Ok(Command::Error),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Heartbeat => f.write_str("HEARTBEAT"),
            other => f.write_str(other.as_str()),
        }
    }
}
