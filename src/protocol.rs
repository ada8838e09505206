//! Text wire formats for the discovery and acknowledgment channels.
//!
//! Every message is one UTF-8 line with no framing of its own: a discovery
//! message is a whole datagram, an acknowledgment is a whole connection.
//!
//! ```text
//! Conectando
//! Saindo
//! participantes: ['10.0.0.1', '10.0.0.2']
//! shot:<col>,<row>
//! lost
//! hit | destroyed            (acknowledgment channel)
//! ```

use core::fmt;
use core::str::FromStr;
use std::net::IpAddr;

use serde::Serialize;
use thiserror::Error;

use crate::cellset::Cell;
use crate::config::GRID_SIZE;

pub const CONNECTING: &str = "Conectando";
pub const LEAVING: &str = "Saindo";
pub const PARTICIPANTS_PREFIX: &str = "participantes:";
pub const SHOT_PREFIX: &str = "shot:";
pub const LOST: &str = "lost";
pub const HIT: &str = "hit";
pub const DESTROYED: &str = "destroyed";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,
    #[error("unrecognised message {0:?}")]
    Unknown(String),
    #[error("malformed shot {0:?}: expected shot:<col>,<row> inside the grid")]
    MalformedShot(String),
    #[error("participant list is missing {0:?}")]
    MissingBracket(char),
    #[error("participant list is empty")]
    EmptyParticipantList,
    #[error("unterminated quote in participant token {0:?}")]
    UnterminatedQuote(String),
    #[error("participant token {0:?} is not an IP address")]
    InvalidAddress(String),
}

/// Messages carried by the discovery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Broadcast by a peer joining the session.
    Connecting,
    /// Broadcast by a peer leaving the session.
    Leaving,
    /// Unicast membership snapshot sent in reply to `Connecting`.
    Participants(Vec<IpAddr>),
    /// The sender fired at this cell of the receiver's board.
    Shot(Cell),
    /// The sender has lost all of its ships.
    Lost,
}

impl Message {
    /// Decode one trimmed datagram. Any deviation from the grammar is an
    /// error; nothing is guessed.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ProtocolError::Empty);
        }
        if text == CONNECTING {
            return Ok(Message::Connecting);
        }
        if text == LEAVING {
            return Ok(Message::Leaving);
        }
        if text == LOST {
            return Ok(Message::Lost);
        }
        if let Some(body) = text.strip_prefix(PARTICIPANTS_PREFIX) {
            return decode_participants(body).map(Message::Participants);
        }
        if let Some(body) = text.strip_prefix(SHOT_PREFIX) {
            return decode_shot(body).map(Message::Shot);
        }
        Err(ProtocolError::Unknown(text.to_string()))
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Connecting => f.write_str(CONNECTING),
            Message::Leaving => f.write_str(LEAVING),
            Message::Lost => f.write_str(LOST),
            Message::Shot(cell) => write!(f, "{}{}", SHOT_PREFIX, cell),
            Message::Participants(addrs) => {
                write!(f, "{} [", PARTICIPANTS_PREFIX)?;
                for (i, addr) in addrs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}'", addr)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Message::decode(s)
    }
}

/// `'[' token (',' token)* ']'` where a token is an address, optionally
/// wrapped in matching single or double quotes.
fn decode_participants(body: &str) -> Result<Vec<IpAddr>, ProtocolError> {
    let body = body.trim();
    let inner = body
        .strip_prefix('[')
        .ok_or(ProtocolError::MissingBracket('['))?
        .strip_suffix(']')
        .ok_or(ProtocolError::MissingBracket(']'))?;
    if inner.trim().is_empty() {
        return Err(ProtocolError::EmptyParticipantList);
    }
    inner.split(',').map(|token| decode_address(token.trim())).collect()
}

fn decode_address(token: &str) -> Result<IpAddr, ProtocolError> {
    let unquoted = match token.chars().next() {
        Some(quote @ ('\'' | '"')) => token[1..]
            .strip_suffix(quote)
            .ok_or_else(|| ProtocolError::UnterminatedQuote(token.to_string()))?,
        _ => token,
    };
    unquoted
        .parse()
        .map_err(|_| ProtocolError::InvalidAddress(token.to_string()))
}

fn decode_shot(body: &str) -> Result<Cell, ProtocolError> {
    let malformed = || ProtocolError::MalformedShot(format!("{}{}", SHOT_PREFIX, body));
    let (col, row) = body.split_once(',').ok_or_else(malformed)?;
    let col = col.trim().parse().map_err(|_| malformed())?;
    let row = row.trim().parse().map_err(|_| malformed())?;
    let cell = Cell::new(col, row);
    if !cell.in_bounds(GRID_SIZE) {
        return Err(malformed());
    }
    Ok(cell)
}

/// Confirmations carried by the acknowledgment channel, always sent by the
/// defender back to the peer that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AckMessage {
    /// Your shot struck one of my ships.
    Hit,
    /// Your shot sank one of my ships.
    Destroyed,
}

impl AckMessage {
    pub fn as_str(&self) -> &'static str {
        match self {
            AckMessage::Hit => HIT,
            AckMessage::Destroyed => DESTROYED,
        }
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        match text.trim() {
            "" => Err(ProtocolError::Empty),
            HIT => Ok(AckMessage::Hit),
            DESTROYED => Ok(AckMessage::Destroyed),
            other => Err(ProtocolError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for AckMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AckMessage {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AckMessage::decode(s)
    }
}
