//! Session and identity management for players and observers
//!
//! Every datagram arrives on one unauthenticated UDP socket, so this module
//! decides who sent it:
//! - An empty name means an observer, identified by its session token
//! - A non-empty name means a player; the name is the durable identity and
//!   the session token only orders competing sessions for that name
//! - Each identity carries a liveness deadline, refreshed by every accepted
//!   message
//!
//! Players who time out mid-game stay in the table, marked disconnected,
//! until the game ends.

use crate::liveness::{Identity, LivenessTimers, LIVENESS_TIMEOUT};
use log::{debug, info};
use shared::{ClientMessage, TurnIntent};
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::time::Instant;

/// A named participant and its current session
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub name: String,
    pub session_token: u64,
    pub addr: SocketAddr,
    pub turn_intent: TurnIntent,
    /// Has sent a non-straight intent since joining or since the last game
    pub ready: bool,
    /// False once the liveness deadline fired; the entry then waits for purge
    pub connected: bool,
}

/// Outcome of matching a message against the session tables
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// A new or returning observer
    Observer { new: bool },
    /// A new or returning player; `reconnected` when its token changed
    Player {
        name: String,
        new: bool,
        reconnected: bool,
    },
    Rejected(Rejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The session token already owns a different player name
    TokenOwnsOtherName,
    /// The token is older than the one the player is using
    StaleSession,
    /// The player timed out during a game and waits to be purged
    PendingPurge,
    /// No room for another session
    ServerFull,
}

/// Tracks every player and observer known to the server
pub struct ClientManager {
    /// Players by name; iteration order is the in-game numbering order
    players: BTreeMap<String, PlayerSession>,
    /// Session token of each player to its name
    player_tokens: HashMap<u64, String>,
    observers: HashMap<u64, SocketAddr>,
    ready_count: usize,
    timers: LivenessTimers,
    max_sessions: usize,
}

impl ClientManager {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            players: BTreeMap::new(),
            player_tokens: HashMap::new(),
            observers: HashMap::new(),
            ready_count: 0,
            timers: LivenessTimers::new(LIVENESS_TIMEOUT),
            max_sessions,
        }
    }

    /// Resolves the sender of a valid message and updates its session.
    ///
    /// Accepted messages re-arm the sender's liveness deadline. Rejected
    /// ones leave every table untouched.
    pub fn handle_message(
        &mut self,
        msg: &ClientMessage,
        addr: SocketAddr,
        now: Instant,
    ) -> Admission {
        if msg.is_observer() {
            self.handle_observer(msg.session_token, addr, now)
        } else {
            self.handle_player(msg, addr, now)
        }
    }

    fn handle_observer(&mut self, token: u64, addr: SocketAddr, now: Instant) -> Admission {
        let new = !self.observers.contains_key(&token);
        if new && self.session_count() >= self.max_sessions {
            return Admission::Rejected(Rejection::ServerFull);
        }

        self.observers.insert(token, addr);
        self.timers.arm(Identity::Observer(token), now);
        if new {
            info!("Observer {} joined from {}", token, addr);
        }
        Admission::Observer { new }
    }

    fn handle_player(&mut self, msg: &ClientMessage, addr: SocketAddr, now: Instant) -> Admission {
        let token = msg.session_token;
        let name = &msg.player_name;

        if let Some(owner) = self.player_tokens.get(&token) {
            if owner != name {
                return Admission::Rejected(Rejection::TokenOwnsOtherName);
            }
        }

        let Some(player) = self.players.get_mut(name) else {
            if self.session_count() >= self.max_sessions {
                return Admission::Rejected(Rejection::ServerFull);
            }

            let ready = msg.turn_intent != TurnIntent::Straight;
            if ready {
                self.ready_count += 1;
            }
            self.players.insert(
                name.clone(),
                PlayerSession {
                    name: name.clone(),
                    session_token: token,
                    addr,
                    turn_intent: msg.turn_intent,
                    ready,
                    connected: true,
                },
            );
            self.player_tokens.insert(token, name.clone());
            self.timers.arm(Identity::Player(name.clone()), now);
            info!("Player {} joined from {} (session {})", name, addr, token);

            return Admission::Player {
                name: name.clone(),
                new: true,
                reconnected: false,
            };
        };

        if !player.connected {
            return Admission::Rejected(Rejection::PendingPurge);
        }
        if token < player.session_token {
            return Admission::Rejected(Rejection::StaleSession);
        }

        let reconnected = token != player.session_token;
        if reconnected {
            self.player_tokens.remove(&player.session_token);
            self.player_tokens.insert(token, name.clone());
            info!(
                "Player {} reconnected from {} (session {} -> {})",
                name, addr, player.session_token, token
            );
            player.session_token = token;
        }
        player.addr = addr;
        player.turn_intent = msg.turn_intent;
        if !player.ready && msg.turn_intent != TurnIntent::Straight {
            player.ready = true;
            self.ready_count += 1;
            debug!("Player {} is ready", name);
        }
        self.timers.arm(Identity::Player(name.clone()), now);

        Admission::Player {
            name: name.clone(),
            new: false,
            reconnected,
        }
    }

    /// Handles every liveness deadline that passed by `now`.
    ///
    /// Observers are dropped at once. Players are dropped at once in the
    /// lobby; during a game they are only marked disconnected and are
    /// purged by [`ClientManager::finish_game`].
    pub fn expire(&mut self, now: Instant, game_running: bool) -> Vec<Identity> {
        let expired = self.timers.expire(now);

        for identity in &expired {
            match identity {
                Identity::Observer(token) => {
                    self.observers.remove(token);
                    info!("Observer {} timed out", token);
                }
                Identity::Player(name) => {
                    if game_running {
                        if let Some(player) = self.players.get_mut(name) {
                            player.connected = false;
                            info!("Player {} timed out, removal deferred until game over", name);
                        }
                    } else {
                        self.purge_player(name);
                        info!("Player {} timed out", name);
                    }
                }
            }
        }
        expired
    }

    fn purge_player(&mut self, name: &str) {
        if let Some(player) = self.players.remove(name) {
            self.player_tokens.remove(&player.session_token);
            self.timers.release(&Identity::Player(player.name));
            if player.ready {
                self.ready_count -= 1;
            }
        }
    }

    /// Returns to the lobby: clears readiness and purges disconnected players.
    pub fn finish_game(&mut self) {
        let gone: Vec<String> = self
            .players
            .values()
            .filter(|p| !p.connected)
            .map(|p| p.name.clone())
            .collect();
        for name in &gone {
            self.purge_player(name);
            info!("Purged disconnected player {}", name);
        }

        for player in self.players.values_mut() {
            player.ready = false;
        }
        self.ready_count = 0;
    }

    /// True when at least two players are known and all of them are ready
    pub fn all_ready(&self) -> bool {
        self.ready_count >= 2 && self.ready_count == self.players.len()
    }

    /// Names and current intents of all players in ascending name order
    pub fn lineup(&self) -> Vec<(String, TurnIntent)> {
        self.players
            .values()
            .map(|p| (p.name.clone(), p.turn_intent))
            .collect()
    }

    /// Addresses that receive live events: connected players and observers
    pub fn recipients(&self) -> Vec<SocketAddr> {
        self.players
            .values()
            .filter(|p| p.connected)
            .map(|p| p.addr)
            .chain(self.observers.values().copied())
            .collect()
    }

    pub fn player(&self, name: &str) -> Option<&PlayerSession> {
        self.players.get(name)
    }

    pub fn player_by_token(&self, token: u64) -> Option<&PlayerSession> {
        self.player_tokens
            .get(&token)
            .and_then(|name| self.players.get(name))
    }

    pub fn is_observer(&self, token: u64) -> bool {
        self.observers.contains_key(&token)
    }

    pub fn ready_count(&self) -> usize {
        self.ready_count
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn session_count(&self) -> usize {
        self.players.len() + self.observers.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn has_deadline(&self, identity: &Identity) -> bool {
        self.timers.is_armed(identity)
    }
}
