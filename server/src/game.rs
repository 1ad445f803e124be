//! Authoritative game simulation.
//!
//! Worms move one unit per round along their heading, leaving a trail of
//! occupied cells. Entering an occupied or off-board cell eliminates the
//! worm; the game ends the moment at most one worm is left. Every change is
//! appended to the [`EventLog`].

use crate::event_log::EventLog;
use log::{debug, info};
use shared::{Event, GameRng, TurnIntent};
use std::f64::consts::PI;

/// Occupancy grid, one flag per cell.
#[derive(Debug, Clone)]
pub struct Board {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl Board {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    pub fn reset(&mut self) {
        self.cells.fill(false);
    }

    /// The cell of a continuous position, found by truncating towards zero,
    /// or `None` off the board. Positions in (-1, 0) land in row or column 0.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        let (cx, cy) = (x.trunc(), y.trunc());
        if cx <= -1.0 || cy <= -1.0 || cx >= self.width as f64 || cy >= self.height as f64 {
            return None;
        }
        Some((cx as u32, cy as u32))
    }

    pub fn is_occupied(&self, (x, y): (u32, u32)) -> bool {
        self.cells[self.index(x, y)]
    }

    pub fn occupy(&mut self, (x, y): (u32, u32)) {
        let index = self.index(x, y);
        self.cells[index] = true;
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// A player's worm for the duration of one game. Its player number is its
/// index in [`GameEngine::worms`].
#[derive(Debug, Clone)]
pub struct Worm {
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Degrees; not normalised.
    pub heading: f64,
    pub turn_intent: TurnIntent,
    pub alive: bool,
}

impl Worm {
    fn cell(&self) -> (i64, i64) {
        (self.x.trunc() as i64, self.y.trunc() as i64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Lobby,
    Running,
}

/// Result of starting a game or playing a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    Running,
    /// `GameOver` was appended; the engine is back in the lobby.
    Finished,
}

pub struct GameEngine {
    width: u32,
    height: u32,
    turning_speed: u32,
    rng: GameRng,
    board: Board,
    worms: Vec<Worm>,
    log: EventLog,
    phase: GamePhase,
}

impl GameEngine {
    pub fn new(width: u32, height: u32, turning_speed: u32, seed: u64) -> Self {
        Self {
            width,
            height,
            turning_speed,
            rng: GameRng::new(seed),
            board: Board::new(width, height),
            worms: Vec::new(),
            log: EventLog::new(),
            phase: GamePhase::Lobby,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == GamePhase::Running
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn worms(&self) -> &[Worm] {
        &self.worms
    }

    pub fn alive_count(&self) -> usize {
        self.worms.iter().filter(|w| w.alive).count()
    }

    /// Starts a game for `lineup`, which must be in ascending name order.
    ///
    /// Clears the previous game's log, emits `NewGame`, then places each
    /// worm in turn. A worm placed on an occupied cell is eliminated on the
    /// spot.
    pub fn start(&mut self, lineup: &[(String, TurnIntent)]) -> GameStatus {
        self.log.clear();
        self.board.reset();
        self.phase = GamePhase::Running;
        self.worms = lineup
            .iter()
            .map(|(name, turn_intent)| Worm {
                name: name.clone(),
                x: 0.0,
                y: 0.0,
                heading: 0.0,
                turn_intent: *turn_intent,
                alive: true,
            })
            .collect();

        info!(
            "New game on {}x{} board with {} players",
            self.width,
            self.height,
            self.worms.len()
        );
        self.log.append(Event::NewGame {
            width: self.width,
            height: self.height,
            names: self.worms.iter().map(|w| w.name.clone()).collect(),
        });

        for number in 0..self.worms.len() {
            let x = (self.rng.next_u32() % (self.width - 1)) as f64 + 0.5;
            let y = (self.rng.next_u32() % (self.height - 1)) as f64 + 0.5;
            let heading = (self.rng.next_u32() % 360) as f64;

            let worm = &mut self.worms[number];
            worm.x = x;
            worm.y = y;
            worm.heading = heading;

            if self.step_into_cell(number) == GameStatus::Finished {
                return GameStatus::Finished;
            }
        }
        GameStatus::Running
    }

    /// Updates the turn direction of a worm in the running game.
    pub fn set_turn(&mut self, name: &str, turn_intent: TurnIntent) {
        if let Some(worm) = self.worms.iter_mut().find(|w| w.name == name) {
            worm.turn_intent = turn_intent;
        }
    }

    /// Advances every living worm by one step, in player-number order.
    pub fn play_round(&mut self) -> GameStatus {
        if !self.is_running() {
            return GameStatus::Finished;
        }

        for number in 0..self.worms.len() {
            let turning_speed = self.turning_speed as f64;
            let worm = &mut self.worms[number];
            if !worm.alive {
                continue;
            }

            match worm.turn_intent {
                TurnIntent::Right => worm.heading += turning_speed,
                TurnIntent::Left => worm.heading -= turning_speed,
                TurnIntent::Straight => {}
            }

            let before = worm.cell();
            let radians = worm.heading / 180.0 * PI;
            worm.x += radians.cos();
            worm.y += radians.sin();
            if worm.cell() == before {
                continue;
            }

            if self.step_into_cell(number) == GameStatus::Finished {
                return GameStatus::Finished;
            }
        }
        GameStatus::Running
    }

    /// Claims the cell under worm `number`, or eliminates it.
    fn step_into_cell(&mut self, number: usize) -> GameStatus {
        let worm = &self.worms[number];
        match self.board.cell_at(worm.x, worm.y) {
            Some(cell) if !self.board.is_occupied(cell) => {
                self.board.occupy(cell);
                self.log.append(Event::Pixel {
                    player_number: number as u8,
                    x: cell.0,
                    y: cell.1,
                });
                GameStatus::Running
            }
            _ => self.eliminate(number),
        }
    }

    fn eliminate(&mut self, number: usize) -> GameStatus {
        self.worms[number].alive = false;
        self.log.append(Event::PlayerEliminated {
            player_number: number as u8,
        });
        debug!("Player {} ({}) eliminated", number, self.worms[number].name);

        if self.alive_count() > 1 {
            return GameStatus::Running;
        }

        let event_no = self.log.append(Event::GameOver);
        self.phase = GamePhase::Lobby;
        info!("Game over after {} events", event_no + 1);
        GameStatus::Finished
    }
}
