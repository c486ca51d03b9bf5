//! Broker wire commands and replies.
//!
//! ```text
//! POP\n         → <oldest payload>\n | EMPTY\n
//! <payload>\n   → ACK\n
//! ```

pub const POP: &str = "POP";
pub const EMPTY: &str = "EMPTY";
pub const ACK: &str = "ACK";

/// One request line, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    Pop,
    Push(&'a str),
}

impl<'a> Command<'a> {
    /// Anything that is not exactly `POP` is a payload to push.
    pub fn parse(line: &'a str) -> Self {
        if line == POP {
            Command::Pop
        } else {
            Command::Push(line)
        }
    }
}

/// One reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Empty,
    Message(String),
}

impl Reply {
    /// Decode a reply line received by a client.
    pub fn parse(line: &str) -> Self {
        match line {
            ACK => Reply::Ack,
            EMPTY => Reply::Empty,
            other => Reply::Message(other.to_string()),
        }
    }

    /// Encode without the trailing newline.
    pub fn into_line(self) -> String {
        match self {
            Reply::Ack => ACK.to_string(),
            Reply::Empty => EMPTY.to_string(),
            Reply::Message(payload) => payload,
        }
    }
}
