//! Client event loop: the UDP link to the game server and the TCP link to
//! the display process, multiplexed on one task.

use crate::config::ClientConfig;
use crate::display::DisplayCommand;
use crate::game::ClientGame;
use crate::input::{InputManager, KeyEvent};
use log::{debug, info, warn};
use shared::{ClientMessage, TurnIntent};
use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{lookup_host, TcpStream, UdpSocket};
use tokio::time::{interval, MissedTickBehavior};

/// How often the current message is re-sent, whether or not it changed
pub const SEND_INTERVAL: Duration = Duration::from_millis(30);

const MAX_DATAGRAMS_PER_WAKE: usize = 20;

pub struct Client {
    socket: UdpSocket,
    server_addr: SocketAddr,

    display_lines: Lines<BufReader<OwnedReadHalf>>,
    display_writer: OwnedWriteHalf,

    message: ClientMessage,
    game: ClientGame,
    input: InputManager,
}

impl Client {
    /// Resolves both peers from the command line and connects to the display.
    pub async fn connect(config: &ClientConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let server_addr = resolve(&config.game_server, config.port).await?;
        let display_addr = resolve(&config.gui_server, config.gui_port).await?;

        info!("Connecting to display at {}", display_addr);
        let display = TcpStream::connect(display_addr).await?;

        Self::new(server_addr, display, config.player_name.clone()).await
    }

    pub async fn new(
        server_addr: SocketAddr,
        display: TcpStream,
        player_name: String,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        display.set_nodelay(true)?;

        let bind_addr = if server_addr.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        info!(
            "Client socket bound to {}, game server {}",
            socket.local_addr()?,
            server_addr
        );

        let (reader, display_writer) = display.into_split();

        Ok(Client {
            socket,
            server_addr,
            display_lines: BufReader::new(reader).lines(),
            display_writer,
            message: ClientMessage {
                session_token: session_token(),
                turn_intent: TurnIntent::Straight,
                next_expected_event_no: 0,
                player_name,
            },
            game: ClientGame::new(),
            input: InputManager::new(),
        })
    }

    pub fn session_token(&self) -> u64 {
        self.message.session_token
    }

    /// Runs until the display disconnects, a socket fails or the server
    /// breaks the protocol.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut send_interval = interval(SEND_INTERVAL);
        send_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                ready = self.socket.readable() => {
                    ready?;
                    let commands = self.drain_socket()?;
                    self.forward(&commands).await?;
                },

                line = self.display_lines.next_line() => {
                    match line? {
                        Some(line) => self.handle_display_line(&line),
                        None => {
                            return Err(io::Error::new(ErrorKind::UnexpectedEof, "display connection closed").into());
                        }
                    }
                },

                _ = send_interval.tick() => {
                    self.send_message().await;
                },
            }
        }
    }

    fn drain_socket(&mut self) -> Result<Vec<DisplayCommand>, Box<dyn std::error::Error>> {
        let mut buffer = [0u8; 2048];
        let mut commands = Vec::new();

        for _ in 0..MAX_DATAGRAMS_PER_WAKE {
            match self.socket.try_recv_from(&mut buffer) {
                Ok((len, addr)) if addr == self.server_addr => {
                    commands.extend(self.game.receive_datagram(&buffer[..len])?);
                }
                Ok((_, addr)) => debug!("Ignoring datagram from {}", addr),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!("Error receiving datagram: {}", e);
                    break;
                }
            }
        }

        Ok(commands)
    }

    async fn forward(&mut self, commands: &[DisplayCommand]) -> io::Result<()> {
        for command in commands {
            self.display_writer.write_all(command.to_line().as_bytes()).await?;
        }
        Ok(())
    }

    fn handle_display_line(&mut self, line: &str) {
        match line.parse::<KeyEvent>() {
            Ok(key) => {
                let turn_intent = self.input.apply(key);
                debug!("{:?} -> {:?}", key, turn_intent);
            }
            Err(()) => debug!("Ignoring display line {:?}", line),
        }
    }

    async fn send_message(&mut self) {
        self.message.turn_intent = self.input.turn_intent();
        self.message.next_expected_event_no = self.game.next_expected_event_no();

        let data = match self.message.encode() {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to encode message: {}", e);
                return;
            }
        };
        if let Err(e) = self.socket.send_to(&data, self.server_addr).await {
            warn!("Failed to send to {}: {}", self.server_addr, e);
        }
    }
}

async fn resolve(host: &str, port: u16) -> io::Result<SocketAddr> {
    lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| io::Error::new(ErrorKind::NotFound, format!("no address for {}", host)))
}

/// Microseconds since the epoch, so a restarted client outranks its
/// previous session.
fn session_token() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_micros() as u64
}
