use thiserror::Error;

/// Reasons a datagram or frame is rejected by the codec.
///
/// None of these are fatal on their own: the receiving side drops the
/// offending datagram and carries on.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("buffer truncated: need {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    #[error("invalid turn direction byte {0}")]
    InvalidTurnIntent(u8),

    #[error("player name byte {0:#04x} outside printable range")]
    InvalidNameByte(u8),

    #[error("player name is {0} bytes long")]
    NameTooLong(usize),

    #[error("checksum mismatch: frame says {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    #[error("payload of {got} bytes does not fit event type {event_type}")]
    LengthMismatch { event_type: u8, got: usize },

    #[error("malformed player name list")]
    InvalidNameList,

    #[error("fixed-width field encoding failed: {0}")]
    Bincode(#[from] bincode::Error),
}
