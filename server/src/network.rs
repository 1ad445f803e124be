//! Server network layer: datagram dispatch and the single-threaded event loop

use crate::client_manager::{Admission, ClientManager};
use crate::config::ServerConfig;
use crate::game::{GameEngine, GameStatus};
use log::{debug, error, info, trace, warn};
use shared::{encode_frame, pack_datagrams, ClientMessage, Event, MAX_CLIENT_MESSAGE_LEN, MAX_DATAGRAM_SIZE, MAX_PLAYERS};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep_until, MissedTickBehavior};

/// Datagrams read from the socket per wake-up before timers get a turn
pub const MAX_DATAGRAMS_PER_WAKE: usize = 20;

/// A datagram queued for sending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub addr: SocketAddr,
    pub data: Vec<u8>,
}

/// Socket-free server state: sessions, simulation and the outgoing queue.
///
/// Every entry point runs to completion before returning, so the loop never
/// observes a half-applied update.
pub struct GameServer {
    engine: GameEngine,
    clients: ClientManager,
    outgoing: Vec<Outgoing>,
}

impl GameServer {
    pub fn new(config: &ServerConfig) -> Self {
        let seed = config.resolved_seed();
        info!(
            "Board {}x{}, turning speed {}, {} rounds/s, seed {}",
            config.width, config.height, config.turning_speed, config.rounds_per_sec, seed
        );

        Self {
            engine: GameEngine::new(config.width, config.height, config.turning_speed, seed),
            clients: ClientManager::new(MAX_PLAYERS),
            outgoing: Vec::new(),
        }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    /// Handles one inbound datagram. Malformed or unwelcome datagrams are
    /// dropped without a reply.
    pub fn handle_datagram(&mut self, data: &[u8], addr: SocketAddr, now: Instant) {
        let msg = match ClientMessage::decode(data) {
            Ok(msg) => msg,
            Err(e) => {
                trace!("Dropping datagram from {}: {}", addr, e);
                return;
            }
        };

        match self.clients.handle_message(&msg, addr, now) {
            Admission::Rejected(reason) => {
                debug!(
                    "Ignoring session {} ({:?}) from {}: {:?}",
                    msg.session_token, msg.player_name, addr, reason
                );
                return;
            }
            Admission::Player { name, .. } => {
                if self.engine.is_running() {
                    self.engine.set_turn(&name, msg.turn_intent);
                }
            }
            Admission::Observer { .. } => {}
        }

        self.send_catch_up(msg.next_expected_event_no, addr);
    }

    /// Runs one tick of the round timer: starts a game when everyone is
    /// ready, otherwise advances the running one.
    pub fn handle_round(&mut self) {
        let status = if self.engine.is_running() {
            self.engine.play_round()
        } else if self.clients.all_ready() {
            let lineup = self.clients.lineup();
            self.engine.start(&lineup)
        } else {
            return;
        };

        self.broadcast_new_events();

        if status == GameStatus::Finished {
            self.clients.finish_game();
        }
    }

    /// Applies every liveness deadline that has passed by `now`.
    pub fn expire_sessions(&mut self, now: Instant) {
        self.clients.expire(now, self.engine.is_running());
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.clients.next_deadline()
    }

    pub fn take_outgoing(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outgoing)
    }

    fn send_catch_up(&mut self, from: u32, addr: SocketAddr) {
        if from >= self.engine.log().len() {
            return;
        }

        let frames = self.engine.log().events_since(from).filter_map(|(no, e)| encode(no, e));
        for data in pack_datagrams(frames, MAX_DATAGRAM_SIZE) {
            self.outgoing.push(Outgoing { addr, data });
        }
    }

    /// Sends each newly logged event, one frame per datagram, to every
    /// connected player and observer.
    fn broadcast_new_events(&mut self) {
        let frames: Vec<Vec<u8>> = self
            .engine
            .log_mut()
            .take_undelivered()
            .filter_map(|(no, e)| encode(no, e))
            .collect();
        let recipients = self.clients.recipients();

        for data in frames {
            for addr in &recipients {
                self.outgoing.push(Outgoing {
                    addr: *addr,
                    data: data.clone(),
                });
            }
        }
    }
}

fn encode(event_no: u32, event: &Event) -> Option<Vec<u8>> {
    match encode_frame(event_no, event) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to encode event {}: {}", event_no, e);
            None
        }
    }
}

/// The UDP endpoint and the loop multiplexing it with the round timer and
/// the liveness deadlines
pub struct Server {
    socket: UdpSocket,
    core: GameServer,
    config: ServerConfig,
}

impl Server {
    pub async fn new(config: ServerConfig, addr: SocketAddr) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind(addr).await?;
        info!("Server listening on {}", socket.local_addr()?);

        Ok(Server {
            socket,
            core: GameServer::new(&config),
            config,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Main server loop; returns only on a socket failure
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut round_interval = interval(self.config.round_duration());
        round_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("Server started successfully");

        loop {
            let deadline = self.core.next_deadline();

            tokio::select! {
                ready = self.socket.readable() => {
                    ready?;
                    self.drain_socket();
                },

                _ = round_interval.tick() => {
                    self.core.handle_round();
                },

                _ = wait_for(deadline) => {
                    self.core.expire_sessions(Instant::now());
                },
            }

            self.flush_outgoing();
        }
    }

    /// Reads up to [`MAX_DATAGRAMS_PER_WAKE`] datagrams without blocking
    fn drain_socket(&mut self) {
        // One spare byte so an oversized datagram is seen as too long.
        let mut buffer = [0u8; MAX_CLIENT_MESSAGE_LEN + 1];

        for _ in 0..MAX_DATAGRAMS_PER_WAKE {
            match self.socket.try_recv_from(&mut buffer) {
                Ok((len, addr)) => self.core.handle_datagram(&buffer[..len], addr, Instant::now()),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("Error receiving datagram: {}", e);
                    break;
                }
            }
        }
    }

    /// Sends queued datagrams without blocking; a full socket buffer drops
    /// the datagram, which clients recover from like any other loss
    fn flush_outgoing(&mut self) {
        for Outgoing { addr, data } in self.core.take_outgoing() {
            if let Err(e) = self.socket.try_send_to(&data, addr) {
                debug!("Failed to send {} bytes to {}: {}", data.len(), addr, e);
            }
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline.into()).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{decode_frames, TurnIntent};
    use std::time::Duration;

    fn test_config() -> ServerConfig {
        ServerConfig {
            seed: Some(1),
            width: 16,
            height: 16,
            ..ServerConfig::default()
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn datagram(token: u64, name: &str, turn_intent: TurnIntent, next: u32) -> Vec<u8> {
        ClientMessage {
            session_token: token,
            turn_intent,
            next_expected_event_no: next,
            player_name: name.to_string(),
        }
        .encode()
        .unwrap()
    }

    fn events_to(outgoing: &[Outgoing], to: SocketAddr) -> Vec<(u32, Event)> {
        outgoing
            .iter()
            .filter(|o| o.addr == to)
            .flat_map(|o| decode_frames(&o.data).collect::<Result<Vec<_>, _>>().unwrap())
            .collect()
    }

    #[test]
    fn test_server_binds_ephemeral_port() {
        let server = tokio_test::block_on(Server::new(test_config(), addr(0))).unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn test_malformed_datagram_is_ignored() {
        let mut server = GameServer::new(&test_config());
        let mut data = datagram(1, "Ala", TurnIntent::Left, 0);
        data[8] = 9;

        server.handle_datagram(&data, addr(1000), Instant::now());
        server.handle_datagram(&[1, 2, 3], addr(1000), Instant::now());

        assert_eq!(server.clients().session_count(), 0);
        assert!(server.take_outgoing().is_empty());
    }

    #[test]
    fn test_game_starts_when_all_ready() {
        let mut server = GameServer::new(&test_config());
        let now = Instant::now();

        server.handle_datagram(&datagram(1, "A", TurnIntent::Left, 0), addr(1000), now);
        server.handle_round();
        assert!(!server.engine().is_running());

        server.handle_datagram(&datagram(2, "B", TurnIntent::Straight, 0), addr(1001), now);
        server.handle_round();
        assert!(!server.engine().is_running());

        server.handle_datagram(&datagram(2, "B", TurnIntent::Right, 0), addr(1001), now);
        server.handle_round();
        assert!(server.engine().is_running());

        let events = events_to(&server.take_outgoing(), addr(1000));
        assert_eq!(
            events[0],
            (
                0,
                Event::NewGame {
                    width: 16,
                    height: 16,
                    names: vec!["A".to_string(), "B".to_string()],
                }
            )
        );
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_observer_receives_live_events_and_catch_up() {
        let mut server = GameServer::new(&test_config());
        let now = Instant::now();

        server.handle_datagram(&datagram(9, "", TurnIntent::Straight, 0), addr(2000), now);
        server.handle_datagram(&datagram(1, "A", TurnIntent::Left, 0), addr(1000), now);
        server.handle_datagram(&datagram(2, "B", TurnIntent::Left, 0), addr(1001), now);
        assert!(server.take_outgoing().is_empty(), "nothing to catch up on yet");

        server.handle_round();
        let live = events_to(&server.take_outgoing(), addr(2000));
        assert_eq!(live.iter().map(|(no, _)| *no).collect::<Vec<_>>(), vec![0, 1, 2]);

        // Asking again from event 1 replays the tail in a single datagram.
        server.handle_datagram(&datagram(9, "", TurnIntent::Straight, 1), addr(2000), now);
        let outgoing = server.take_outgoing();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(events_to(&outgoing, addr(2000)), live[1..].to_vec());
    }

    #[test]
    fn test_turn_intent_reaches_running_game() {
        let mut server = GameServer::new(&test_config());
        let now = Instant::now();
        server.handle_datagram(&datagram(1, "A", TurnIntent::Left, 0), addr(1000), now);
        server.handle_datagram(&datagram(2, "B", TurnIntent::Left, 0), addr(1001), now);
        server.handle_round();

        server.handle_datagram(&datagram(1, "A", TurnIntent::Right, 3), addr(1000), now);
        assert_eq!(server.engine().worms()[0].turn_intent, TurnIntent::Right);
        assert_eq!(server.engine().worms()[1].turn_intent, TurnIntent::Left);
    }

    #[test]
    fn test_stale_session_changes_nothing() {
        let mut server = GameServer::new(&test_config());
        let now = Instant::now();
        server.handle_datagram(&datagram(50, "A", TurnIntent::Straight, 0), addr(1000), now);

        for token in (40..50).rev() {
            server.handle_datagram(&datagram(token, "A", TurnIntent::Left, 0), addr(1001), now);
        }

        let player = server.clients().player("A").unwrap();
        assert_eq!(player.session_token, 50);
        assert_eq!(player.addr, addr(1000));
        assert!(!player.ready);
    }

    #[test]
    fn test_lobby_timeout_removes_player() {
        let mut server = GameServer::new(&test_config());
        let start = Instant::now();
        server.handle_datagram(&datagram(1, "A", TurnIntent::Left, 0), addr(1000), start);
        server.handle_datagram(&datagram(2, "B", TurnIntent::Straight, 0), addr(1001), start);

        assert_eq!(server.next_deadline(), Some(start + Duration::from_secs(2)));
        server.expire_sessions(start + Duration::from_secs(2));

        assert_eq!(server.clients().player_count(), 0);
        assert_eq!(server.clients().ready_count(), 0);
        assert_eq!(server.next_deadline(), None);
    }

    #[test]
    fn test_disconnected_player_is_skipped_then_purged() {
        let mut server = GameServer::new(&test_config());
        let start = Instant::now();
        server.handle_datagram(&datagram(1, "A", TurnIntent::Left, 0), addr(1000), start);
        server.handle_datagram(&datagram(2, "B", TurnIntent::Left, 0), addr(1001), start);
        server.handle_round();
        server.take_outgoing();

        // B keeps the session alive, A falls silent mid-game.
        let later = start + Duration::from_secs(1);
        server.handle_datagram(&datagram(2, "B", TurnIntent::Left, 0), addr(1001), later);
        server.take_outgoing();
        server.expire_sessions(start + Duration::from_secs(2));
        assert!(!server.clients().player("A").unwrap().connected);

        let mut rounds = 0;
        while server.engine().is_running() {
            server.handle_round();
            assert!(
                server.take_outgoing().iter().all(|o| o.addr == addr(1001)),
                "disconnected player must not receive events"
            );
            rounds += 1;
            assert!(rounds < 100);
        }

        assert!(server.clients().player("A").is_none());
        assert!(server.clients().player("B").is_some());
        assert_eq!(server.clients().ready_count(), 0);
    }

    #[test]
    fn test_log_survives_until_next_game() {
        let mut server = GameServer::new(&test_config());
        let now = Instant::now();
        server.handle_datagram(&datagram(1, "A", TurnIntent::Left, 0), addr(1000), now);
        server.handle_datagram(&datagram(2, "B", TurnIntent::Left, 0), addr(1001), now);

        let mut rounds = 0;
        server.handle_round();
        while server.engine().is_running() {
            server.handle_round();
            rounds += 1;
            assert!(rounds < 1000);
        }
        server.take_outgoing();

        let total = server.engine().log().len();
        server.handle_datagram(&datagram(9, "", TurnIntent::Straight, 0), addr(2000), now);
        let replay = events_to(&server.take_outgoing(), addr(2000));

        assert_eq!(replay.len() as u32, total);
        assert_eq!(replay.last().map(|(_, e)| e), Some(&Event::GameOver));
    }
}
