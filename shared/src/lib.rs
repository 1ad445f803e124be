//! # Shared Protocol Library
//!
//! Everything both ends of the game agree on: the byte layout of client
//! messages and event frames, the limits on names, players and boards, and
//! the deterministic generator the server uses to place worms.
//!
//! ## Protocol Overview
//!
//! Clients send a small control message to the server roughly every 30 ms.
//! It carries the client's session token, the direction its worm should
//! turn, and the number of the first event it has not yet seen. The server
//! answers with checksummed event frames: live ones as they happen, and a
//! catch-up of everything from the requested number onward.
//!
//! Both codecs are pure functions over byte slices and can be tested
//! without sockets.

pub mod error;
pub mod event;
pub mod protocol;
pub mod rng;

pub use error::CodecError;
pub use event::{decode_frame, decode_frames, encode_frame, pack_datagrams, DecodedFrame, Event, Frames};
pub use protocol::{validate_player_name, ClientMessage, TurnIntent};
pub use rng::GameRng;

use bincode::Options;

pub const DEFAULT_SERVER_PORT: u16 = 2021;
pub const MAX_NAME_LEN: usize = 20;
pub const MAX_PLAYERS: usize = 25;
pub const BOARD_SIZE_MIN: u32 = 16;
pub const BOARD_SIZE_MAX: u32 = 4096;

pub const CLIENT_MESSAGE_HEADER_LEN: usize = 13;
pub const MAX_CLIENT_MESSAGE_LEN: usize = CLIENT_MESSAGE_HEADER_LEN + MAX_NAME_LEN;
/// Upper bound on a server datagram. Catch-up frames are packed up to this.
pub const MAX_DATAGRAM_SIZE: usize = 550;

/// Fixed-width big-endian integers, no length prefixes.
pub(crate) fn wire_options() -> impl Options + Copy {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_big_endian()
        .allow_trailing_bytes()
}
