use thiserror::Error;

/// Event history from the server that no correct server can produce.
/// Receiving one ends the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("NewGame carries event number {0}, expected 0")]
    NewGameNotFirst(u32),

    #[error("event {0} arrived before the NewGame of its game")]
    NoGameInProgress(u32),

    #[error("board size {width}x{height} is out of range")]
    BoardSize { width: u32, height: u32 },

    #[error("event {event_no} refers to unknown player number {player_number}")]
    UnknownPlayer { event_no: u32, player_number: u8 },

    #[error("event {event_no} places a pixel at ({x}, {y}), outside the board")]
    PixelOutsideBoard { event_no: u32, x: u32, y: u32 },
}
