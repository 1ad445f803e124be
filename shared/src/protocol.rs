//! Client-to-server control message.
//!
//! ```text
//! session_token (8, BE) | turn_direction (1) | next_expected_event_no (4, BE) | player_name (0..=20)
//! ```
//!
//! The name is not terminated; its length is whatever is left of the datagram
//! after the 13-byte header.

use crate::error::CodecError;
use crate::{wire_options, CLIENT_MESSAGE_HEADER_LEN, MAX_CLIENT_MESSAGE_LEN, MAX_NAME_LEN};
use bincode::Options;
use serde::{Deserialize, Serialize};

/// Direction a player asks its worm to turn on every round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnIntent {
    #[default]
    Straight,
    Right,
    Left,
}

impl TurnIntent {
    pub fn as_byte(self) -> u8 {
        match self {
            TurnIntent::Straight => 0,
            TurnIntent::Right => 1,
            TurnIntent::Left => 2,
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(TurnIntent::Straight),
            1 => Some(TurnIntent::Right),
            2 => Some(TurnIntent::Left),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct MessageHeader {
    session_token: u64,
    turn_direction: u8,
    next_expected_event_no: u32,
}

/// A decoded client datagram. An empty `player_name` marks an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientMessage {
    pub session_token: u64,
    pub turn_intent: TurnIntent,
    pub next_expected_event_no: u32,
    pub player_name: String,
}

impl ClientMessage {
    pub fn is_observer(&self) -> bool {
        self.player_name.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        validate_player_name(self.player_name.as_bytes())?;

        let header = MessageHeader {
            session_token: self.session_token,
            turn_direction: self.turn_intent.as_byte(),
            next_expected_event_no: self.next_expected_event_no,
        };

        let mut data = wire_options().serialize(&header)?;
        data.extend_from_slice(self.player_name.as_bytes());
        Ok(data)
    }

    pub fn decode(datagram: &[u8]) -> Result<Self, CodecError> {
        if datagram.len() < CLIENT_MESSAGE_HEADER_LEN {
            return Err(CodecError::Truncated {
                need: CLIENT_MESSAGE_HEADER_LEN,
                got: datagram.len(),
            });
        }
        if datagram.len() > MAX_CLIENT_MESSAGE_LEN {
            return Err(CodecError::NameTooLong(
                datagram.len() - CLIENT_MESSAGE_HEADER_LEN,
            ));
        }

        let (head, name) = datagram.split_at(CLIENT_MESSAGE_HEADER_LEN);
        let header: MessageHeader = wire_options().deserialize(head)?;

        let turn_intent = TurnIntent::from_byte(header.turn_direction)
            .ok_or(CodecError::InvalidTurnIntent(header.turn_direction))?;
        validate_player_name(name)?;

        Ok(Self {
            session_token: header.session_token,
            turn_intent,
            next_expected_event_no: header.next_expected_event_no,
            // Every byte was checked to be printable ASCII above.
            player_name: name.iter().map(|&b| b as char).collect(),
        })
    }
}

/// Checks that a player name is at most 20 bytes, each within 33..=126.
/// The empty name is valid and denotes an observer.
pub fn validate_player_name(name: &[u8]) -> Result<(), CodecError> {
    if name.len() > MAX_NAME_LEN {
        return Err(CodecError::NameTooLong(name.len()));
    }
    match name.iter().find(|b| !(33..=126).contains(*b)) {
        Some(&bad) => Err(CodecError::InvalidNameByte(bad)),
        None => Ok(()),
    }
}
