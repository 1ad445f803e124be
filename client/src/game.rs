//! Turns the lossy, reordered event stream from the server into the ordered,
//! gap-free sequence of commands for the display.

use crate::display::DisplayCommand;
use crate::error::ProtocolViolation;
use log::{debug, info};
use shared::{decode_frame, Event, BOARD_SIZE_MAX, BOARD_SIZE_MIN};
use std::collections::BTreeMap;

/// Holds frames that arrived ahead of the next expected event number.
///
/// A slot holding `None` is a frame of a type this client does not know;
/// it still occupies its number so the sequence can move past it.
#[derive(Debug, Default)]
pub struct ReassemblyBuffer {
    next_expected: u32,
    pending: BTreeMap<u32, Option<Event>>,
}

impl ReassemblyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lowest event number not yet released.
    pub fn next_expected(&self) -> u32 {
        self.next_expected
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Stores a frame. Already released numbers and duplicates are ignored.
    pub fn insert(&mut self, event_no: u32, event: Option<Event>) {
        if event_no < self.next_expected {
            return;
        }
        self.pending.entry(event_no).or_insert(event);
    }

    /// Releases the next frame in sequence, if it has arrived.
    pub fn pop_ready(&mut self) -> Option<(u32, Option<Event>)> {
        let event = self.pending.remove(&self.next_expected)?;
        let event_no = self.next_expected;
        self.next_expected += 1;
        Some((event_no, event))
    }

    /// Drops everything buffered and restarts the sequence at `next_expected`.
    pub fn reset(&mut self, next_expected: u32) {
        self.pending.clear();
        self.next_expected = next_expected;
    }
}

#[derive(Debug, Clone)]
struct CurrentGame {
    width: u32,
    height: u32,
    names: Vec<String>,
}

impl CurrentGame {
    fn name(&self, event_no: u32, player_number: u8) -> Result<&str, ProtocolViolation> {
        self.names
            .get(player_number as usize)
            .map(String::as_str)
            .ok_or(ProtocolViolation::UnknownPlayer {
                event_no,
                player_number,
            })
    }
}

/// Client-side view of the server's event log across consecutive games.
#[derive(Debug, Default)]
pub struct ClientGame {
    buffer: ReassemblyBuffer,
    current: Option<CurrentGame>,
    /// Event number of the last game's `GameOver`, until the next game shows up
    finished_at: Option<u32>,
}

impl ClientGame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for the `next_expected_event_no` field of outgoing messages.
    pub fn next_expected_event_no(&self) -> u32 {
        self.buffer.next_expected()
    }

    pub fn is_game_over(&self) -> bool {
        self.finished_at.is_some()
    }

    /// Decodes every frame of a datagram and returns the display commands
    /// that became ready. A corrupt frame ends decoding of the datagram.
    pub fn receive_datagram(&mut self, datagram: &[u8]) -> Result<Vec<DisplayCommand>, ProtocolViolation> {
        let mut commands = Vec::new();
        let mut rest = datagram;

        while !rest.is_empty() {
            let frame = match decode_frame(rest) {
                Ok(frame) => frame,
                Err(e) => {
                    debug!("Dropping rest of datagram: {}", e);
                    break;
                }
            };
            rest = &rest[frame.consumed..];
            commands.extend(self.receive(frame.event_no, frame.event)?);
        }

        Ok(commands)
    }

    /// Accepts one decoded frame and returns the display commands released
    /// by it, in event-number order.
    pub fn receive(
        &mut self,
        event_no: u32,
        event: Option<Event>,
    ) -> Result<Vec<DisplayCommand>, ProtocolViolation> {
        if matches!(event, Some(Event::NewGame { .. })) && event_no != 0 {
            return Err(ProtocolViolation::NewGameNotFirst(event_no));
        }

        // NewGame #0 only ever starts a game, and this client never asks for
        // event 0 once past it, so it means the next game even if this
        // game's GameOver was lost. Likewise nothing follows GameOver, so a
        // higher number after it belongs to a game whose NewGame was lost.
        let next_game = if matches!(event, Some(Event::NewGame { .. })) {
            self.buffer.next_expected() > 0
        } else {
            matches!(self.finished_at, Some(game_over_no) if event_no > game_over_no)
        };
        if next_game {
            debug!("Next game detected at event {}", event_no);
            self.finished_at = None;
            self.current = None;
            self.buffer.reset(0);
        }

        self.buffer.insert(event_no, event);

        let mut commands = Vec::new();
        while let Some((event_no, event)) = self.buffer.pop_ready() {
            if let Some(event) = event {
                if let Some(command) = self.apply(event_no, event)? {
                    commands.push(command);
                }
            }
            if self.finished_at.is_some() {
                break;
            }
        }
        Ok(commands)
    }

    fn apply(&mut self, event_no: u32, event: Event) -> Result<Option<DisplayCommand>, ProtocolViolation> {
        if let Event::NewGame {
            width,
            height,
            names,
        } = event
        {
            let allowed = BOARD_SIZE_MIN..=BOARD_SIZE_MAX;
            if !allowed.contains(&width) || !allowed.contains(&height) {
                return Err(ProtocolViolation::BoardSize { width, height });
            }

            info!("New game {}x{}: {}", width, height, names.join(" "));
            self.current = Some(CurrentGame {
                width,
                height,
                names: names.clone(),
            });
            return Ok(Some(DisplayCommand::NewGame {
                width,
                height,
                names,
            }));
        }

        let game = self
            .current
            .as_ref()
            .ok_or(ProtocolViolation::NoGameInProgress(event_no))?;

        match event {
            Event::Pixel { player_number, x, y } => {
                let name = game.name(event_no, player_number)?;
                if x >= game.width || y >= game.height {
                    return Err(ProtocolViolation::PixelOutsideBoard { event_no, x, y });
                }
                Ok(Some(DisplayCommand::Pixel {
                    x,
                    y,
                    name: name.to_string(),
                }))
            }
            Event::PlayerEliminated { player_number } => {
                let name = game.name(event_no, player_number)?;
                info!("{} eliminated", name);
                Ok(Some(DisplayCommand::PlayerEliminated {
                    name: name.to_string(),
                }))
            }
            Event::GameOver => {
                info!("Game over after {} events", event_no + 1);
                self.finished_at = Some(event_no);
                Ok(None)
            }
            Event::NewGame { .. } => Ok(None),
        }
    }
}
