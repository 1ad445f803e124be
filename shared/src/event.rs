//! Server-to-client event frames.
//!
//! ```text
//! len (4, BE) | event_no (4, BE) | event_type (1) | payload | crc32 (4, BE)
//! ```
//!
//! `len` covers `event_no`, `event_type` and the payload. The checksum covers
//! everything before it, `len` included. Several frames may share one datagram.

use crate::error::CodecError;
use crate::protocol::validate_player_name;
use crate::wire_options;
use bincode::Options;
use serde::{Deserialize, Serialize};

pub const TYPE_NEW_GAME: u8 = 0;
pub const TYPE_PIXEL: u8 = 1;
pub const TYPE_PLAYER_ELIMINATED: u8 = 2;
pub const TYPE_GAME_OVER: u8 = 3;

/// Bytes of `len`, `event_no` and `event_type`.
pub const FRAME_HEADER_LEN: usize = 9;
/// Bytes around the payload: the header plus the trailing checksum.
pub const FRAME_OVERHEAD: usize = FRAME_HEADER_LEN + 4;

/// Something that happened in a game. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    NewGame {
        width: u32,
        height: u32,
        names: Vec<String>,
    },
    Pixel {
        player_number: u8,
        x: u32,
        y: u32,
    },
    PlayerEliminated {
        player_number: u8,
    },
    GameOver,
}

#[derive(Serialize, Deserialize)]
struct FrameHeader {
    len: u32,
    event_no: u32,
    event_type: u8,
}

#[derive(Serialize, Deserialize)]
struct BoardSize {
    width: u32,
    height: u32,
}

#[derive(Serialize, Deserialize)]
struct PixelPayload {
    player_number: u8,
    x: u32,
    y: u32,
}

impl Event {
    pub fn event_type(&self) -> u8 {
        match self {
            Event::NewGame { .. } => TYPE_NEW_GAME,
            Event::Pixel { .. } => TYPE_PIXEL,
            Event::PlayerEliminated { .. } => TYPE_PLAYER_ELIMINATED,
            Event::GameOver => TYPE_GAME_OVER,
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>, CodecError> {
        let opts = wire_options();
        let payload = match self {
            Event::NewGame {
                width,
                height,
                names,
            } => {
                let mut payload = opts.serialize(&BoardSize {
                    width: *width,
                    height: *height,
                })?;
                for name in names {
                    payload.extend_from_slice(name.as_bytes());
                    payload.push(0);
                }
                payload
            }
            Event::Pixel {
                player_number,
                x,
                y,
            } => opts.serialize(&PixelPayload {
                player_number: *player_number,
                x: *x,
                y: *y,
            })?,
            Event::PlayerEliminated { player_number } => vec![*player_number],
            Event::GameOver => Vec::new(),
        };
        Ok(payload)
    }

    /// Parses a payload of a known type. `Ok(None)` means the type is unknown.
    fn decode_payload(event_type: u8, payload: &[u8]) -> Result<Option<Self>, CodecError> {
        let opts = wire_options();
        let mismatch = || CodecError::LengthMismatch {
            event_type,
            got: payload.len(),
        };

        let event = match event_type {
            TYPE_NEW_GAME => {
                if payload.len() < 8 {
                    return Err(mismatch());
                }
                let (size, list) = payload.split_at(8);
                let size: BoardSize = opts.deserialize(size)?;
                Event::NewGame {
                    width: size.width,
                    height: size.height,
                    names: decode_name_list(list)?,
                }
            }
            TYPE_PIXEL => {
                if payload.len() != 9 {
                    return Err(mismatch());
                }
                let pixel: PixelPayload = opts.deserialize(payload)?;
                Event::Pixel {
                    player_number: pixel.player_number,
                    x: pixel.x,
                    y: pixel.y,
                }
            }
            TYPE_PLAYER_ELIMINATED => match payload {
                [player_number] => Event::PlayerEliminated {
                    player_number: *player_number,
                },
                _ => return Err(mismatch()),
            },
            TYPE_GAME_OVER => {
                if !payload.is_empty() {
                    return Err(mismatch());
                }
                Event::GameOver
            }
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

fn decode_name_list(list: &[u8]) -> Result<Vec<String>, CodecError> {
    if list.is_empty() {
        return Ok(Vec::new());
    }
    let Some((&0, body)) = list.split_last() else {
        return Err(CodecError::InvalidNameList);
    };

    body.split(|&b| b == 0)
        .map(|name| {
            if name.is_empty() {
                return Err(CodecError::InvalidNameList);
            }
            validate_player_name(name)?;
            Ok(name.iter().map(|&b| b as char).collect())
        })
        .collect()
}

/// Serialises one event into a checksummed frame.
pub fn encode_frame(event_no: u32, event: &Event) -> Result<Vec<u8>, CodecError> {
    let payload = event.encode_payload()?;
    let header = FrameHeader {
        len: (FRAME_HEADER_LEN - 4 + payload.len()) as u32,
        event_no,
        event_type: event.event_type(),
    };

    let mut frame = wire_options().serialize(&header)?;
    frame.reserve(payload.len() + 4);
    frame.extend_from_slice(&payload);
    let crc = crc32fast::hash(&frame);
    frame.extend_from_slice(&crc.to_be_bytes());
    Ok(frame)
}

/// A frame parsed off the front of a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    pub event_no: u32,
    /// `None` for a well-formed frame of a type this codec does not know.
    pub event: Option<Event>,
    /// Bytes of the buffer the frame occupied.
    pub consumed: usize,
}

/// Parses and checksums the frame at the start of `buf`.
pub fn decode_frame(buf: &[u8]) -> Result<DecodedFrame, CodecError> {
    let Some(len_bytes) = buf.get(..4) else {
        return Err(CodecError::Truncated {
            need: 4,
            got: buf.len(),
        });
    };
    let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    if len < FRAME_HEADER_LEN - 4 {
        return Err(CodecError::Truncated {
            need: FRAME_HEADER_LEN - 4,
            got: len,
        });
    }

    let total = len.saturating_add(8);
    if buf.len() < total {
        return Err(CodecError::Truncated {
            need: total,
            got: buf.len(),
        });
    }

    let (checked, crc_bytes) = buf[..total].split_at(len + 4);
    let expected = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    let computed = crc32fast::hash(checked);
    if expected != computed {
        return Err(CodecError::ChecksumMismatch { expected, computed });
    }

    let header: FrameHeader = wire_options().deserialize(&checked[..FRAME_HEADER_LEN])?;
    let event = Event::decode_payload(header.event_type, &checked[FRAME_HEADER_LEN..])?;

    Ok(DecodedFrame {
        event_no: header.event_no,
        event,
        consumed: total,
    })
}

/// Iterator over the frames packed into one datagram.
///
/// Frames of unknown type are skipped. The first malformed frame is yielded
/// as an error and ends the iteration: nothing after it in the datagram can
/// be trusted.
#[derive(Debug, Clone)]
pub struct Frames<'a> {
    rest: &'a [u8],
    failed: bool,
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<(u32, Event), CodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && !self.rest.is_empty() {
            match decode_frame(self.rest) {
                Ok(frame) => {
                    self.rest = &self.rest[frame.consumed..];
                    if let Some(event) = frame.event {
                        return Some(Ok((frame.event_no, event)));
                    }
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

pub fn decode_frames(datagram: &[u8]) -> Frames<'_> {
    Frames {
        rest: datagram,
        failed: false,
    }
}

/// Concatenates encoded frames into as few datagrams of at most `max_size`
/// bytes as possible, never splitting a frame. A frame larger than
/// `max_size` travels alone.
pub fn pack_datagrams<I>(frames: I, max_size: usize) -> Vec<Vec<u8>>
where
    I: IntoIterator<Item = Vec<u8>>,
{
    let mut datagrams = Vec::new();
    let mut current: Vec<u8> = Vec::new();

    for frame in frames {
        if !current.is_empty() && current.len() + frame.len() > max_size {
            datagrams.push(std::mem::take(&mut current));
        }
        current.extend_from_slice(&frame);
    }
    if !current.is_empty() {
        datagrams.push(current);
    }
    datagrams
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn new_game() -> Event {
        Event::NewGame {
            width: 640,
            height: 480,
            names: vec!["Ala".to_string(), "Bartek".to_string()],
        }
    }

    fn sample_events() -> Vec<Event> {
        vec![
            new_game(),
            Event::Pixel {
                player_number: 1,
                x: 17,
                y: 4095,
            },
            Event::PlayerEliminated { player_number: 0 },
            Event::GameOver,
        ]
    }

    #[test]
    fn test_pixel_frame_layout() {
        let frame = encode_frame(
            7,
            &Event::Pixel {
                player_number: 3,
                x: 0x0102,
                y: 0x0304,
            },
        )
        .unwrap();

        assert_eq!(frame.len(), 22);
        assert_eq!(&frame[0..4], &14u32.to_be_bytes());
        assert_eq!(&frame[4..8], &7u32.to_be_bytes());
        assert_eq!(frame[8], TYPE_PIXEL);
        assert_eq!(frame[9], 3);
        assert_eq!(&frame[10..14], &[0, 0, 1, 2]);
        assert_eq!(&frame[14..18], &[0, 0, 3, 4]);

        let crc = crc32fast::hash(&frame[..18]);
        assert_eq!(&frame[18..22], &crc.to_be_bytes());
    }

    #[test]
    fn test_new_game_name_list_is_null_terminated() {
        let frame = encode_frame(0, &new_game()).unwrap();
        let len = u32::from_be_bytes([frame[0], frame[1], frame[2], frame[3]]) as usize;

        assert_eq!(len, 5 + 8 + "Ala\0Bartek\0".len());
        assert_eq!(frame.len(), len + 8);
        assert_eq!(&frame[17..len + 4], b"Ala\0Bartek\0");
    }

    #[test]
    fn test_frame_sizes_per_type() {
        let sizes: Vec<usize> = sample_events()
            .iter()
            .map(|e| encode_frame(0, e).unwrap().len())
            .collect();
        assert_eq!(sizes, vec![13 + 8 + 11, 22, 14, 13]);
    }

    #[test]
    fn test_decode_frame_reproduces_event() {
        for (no, event) in sample_events().into_iter().enumerate() {
            let frame = encode_frame(no as u32, &event).unwrap();
            let decoded = decode_frame(&frame).unwrap();

            assert_eq!(decoded.event_no, no as u32);
            assert_eq!(decoded.event, Some(event));
            assert_eq!(decoded.consumed, frame.len());
        }
    }

    #[test]
    fn test_corrupted_byte_is_rejected() {
        let frame = encode_frame(12, &new_game()).unwrap();
        let mut rng = rand::thread_rng();

        for _ in 0..64 {
            let mut corrupted = frame.clone();
            // Leave `len` intact so the corruption is caught by the checksum.
            let index = rng.gen_range(4..frame.len());
            corrupted[index] ^= rng.gen_range(1..=255u8);

            assert!(matches!(
                decode_frame(&corrupted),
                Err(CodecError::ChecksumMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_decode_frames_reads_concatenated_frames() {
        let datagram: Vec<u8> = sample_events()
            .iter()
            .enumerate()
            .flat_map(|(no, e)| encode_frame(no as u32, e).unwrap())
            .collect();

        let decoded: Vec<(u32, Event)> = decode_frames(&datagram)
            .collect::<Result<_, _>>()
            .unwrap();

        let expected: Vec<(u32, Event)> = sample_events()
            .into_iter()
            .enumerate()
            .map(|(no, e)| (no as u32, e))
            .collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_decode_frames_stops_at_first_bad_checksum() {
        let first = encode_frame(0, &new_game()).unwrap();
        let mut second = encode_frame(1, &Event::PlayerEliminated { player_number: 1 }).unwrap();
        let third = encode_frame(2, &Event::GameOver).unwrap();
        second[9] ^= 0xFF;

        let datagram = [first, second, third].concat();
        let results: Vec<_> = decode_frames(&datagram).collect();

        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Ok((0, Event::NewGame { .. }))));
        assert!(matches!(results[1], Err(CodecError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_unknown_event_type_is_skipped() {
        let mut unknown = vec![0, 0, 0, 6, 0, 0, 0, 5, 42, 9];
        let crc = crc32fast::hash(&unknown);
        unknown.extend_from_slice(&crc.to_be_bytes());
        let known = encode_frame(6, &Event::GameOver).unwrap();

        let datagram = [unknown, known].concat();
        let decoded: Vec<_> = decode_frames(&datagram).collect();

        assert_eq!(decoded.len(), 1);
        assert!(matches!(decoded[0], Ok((6, Event::GameOver))));
    }

    #[test]
    fn test_truncated_frame_is_rejected() {
        let frame = encode_frame(3, &Event::PlayerEliminated { player_number: 2 }).unwrap();
        assert!(matches!(
            decode_frame(&frame[..frame.len() - 1]),
            Err(CodecError::Truncated { .. })
        ));
    }

    #[test]
    fn test_bad_name_list_is_rejected() {
        let mut frame = vec![0, 0, 0, 0, 0, 0, 0, 0, TYPE_NEW_GAME];
        frame.extend_from_slice(&[0, 0, 0, 16, 0, 0, 0, 16]);
        frame.extend_from_slice(b"a\0\0b\0");
        let len = (frame.len() - 4) as u32;
        frame[0..4].copy_from_slice(&len.to_be_bytes());
        let crc = crc32fast::hash(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());

        assert!(matches!(
            decode_frame(&frame),
            Err(CodecError::InvalidNameList)
        ));
    }

    #[test]
    fn test_pixel_with_wrong_length_is_rejected() {
        let mut frame = vec![0, 0, 0, 6, 0, 0, 0, 1, TYPE_PIXEL, 0];
        let crc = crc32fast::hash(&frame);
        frame.extend_from_slice(&crc.to_be_bytes());

        assert!(matches!(
            decode_frame(&frame),
            Err(CodecError::LengthMismatch {
                event_type: TYPE_PIXEL,
                got: 1
            })
        ));
    }

    #[test]
    fn test_pack_datagrams_respects_limit() {
        let frames: Vec<Vec<u8>> = (0..100)
            .map(|no| {
                encode_frame(
                    no,
                    &Event::Pixel {
                        player_number: 0,
                        x: no,
                        y: no,
                    },
                )
                .unwrap()
            })
            .collect();

        let datagrams = pack_datagrams(frames.clone(), 550);

        // 22-byte frames, 25 per datagram.
        assert_eq!(datagrams.len(), 4);
        assert!(datagrams.iter().all(|d| d.len() <= 550));
        assert_eq!(datagrams.concat(), frames.concat());
    }

    #[test]
    fn test_pack_datagrams_empty() {
        assert!(pack_datagrams(Vec::new(), 550).is_empty());
    }
}
