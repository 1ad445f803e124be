//! Numbered, append-only record of the current game's events.

use shared::Event;

#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
    /// Events below this index have already been broadcast.
    delivered: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event and returns its number.
    pub fn append(&mut self, event: Event) -> u32 {
        let event_no = self.events.len() as u32;
        self.events.push(event);
        event_no
    }

    pub fn len(&self) -> u32 {
        self.events.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, event_no: u32) -> Option<&Event> {
        self.events.get(event_no as usize)
    }

    /// Every event numbered `from` or higher, in order. The iterator is
    /// `Clone`, so a catch-up can be replayed without touching the log.
    pub fn events_since(&self, from: u32) -> impl Iterator<Item = (u32, &Event)> + Clone {
        let start = (from as usize).min(self.events.len());
        self.events[start..]
            .iter()
            .enumerate()
            .map(move |(offset, event)| ((start + offset) as u32, event))
    }

    /// Events appended since the previous call, marking them delivered.
    pub fn take_undelivered(&mut self) -> impl Iterator<Item = (u32, &Event)> + Clone {
        let from = self.delivered;
        self.delivered = self.events.len();
        self.events_since(from as u32)
    }

    /// Drops the previous game. Numbering restarts at 0.
    pub fn clear(&mut self) {
        self.events.clear();
        self.delivered = 0;
    }
}
