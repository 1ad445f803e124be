//! Diagnostic client: joins a server under a fixed name and intent and
//! prints every event it receives, in order.

use clap::{Parser, ValueEnum};
use shared::{decode_frames, ClientMessage, Event, TurnIntent, DEFAULT_SERVER_PORT, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::UdpSocket;
use tokio::time::{interval, Instant};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Turn {
    Straight,
    Right,
    Left,
}

impl From<Turn> for TurnIntent {
    fn from(turn: Turn) -> Self {
        match turn {
            Turn::Straight => TurnIntent::Straight,
            Turn::Right => TurnIntent::Right,
            Turn::Left => TurnIntent::Left,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Sends fixed turn intents and prints received events")]
struct Args {
    /// Server address
    #[arg(short, long, default_value_t = SocketAddr::from(([127, 0, 0, 1], DEFAULT_SERVER_PORT)))]
    server: SocketAddr,

    /// Player name; empty joins as an observer
    #[arg(short, long, default_value = "")]
    name: String,

    /// Turn intent sent with every message
    #[arg(short, long, value_enum, default_value_t = Turn::Left)]
    turn: Turn,

    /// Seconds to run for
    #[arg(short, long, default_value_t = 10)]
    duration: u64,
}

// Microseconds since the epoch, so a restarted client outranks its old session
fn session_token() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_micros() as u64
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let bind_addr = if args.server.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
    let socket = UdpSocket::bind(bind_addr).await?;
    println!("Client socket bound to {}", socket.local_addr()?);

    let mut message = ClientMessage {
        session_token: session_token(),
        turn_intent: args.turn.into(),
        next_expected_event_no: 0,
        player_name: args.name.clone(),
    };

    let mut send_timer = interval(Duration::from_millis(30));
    let deadline = Instant::now() + Duration::from_secs(args.duration);
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];
    let mut received = 0usize;

    loop {
        tokio::select! {
            _ = send_timer.tick() => {
                socket.send_to(&message.encode()?, args.server).await?;
            }

            result = socket.recv_from(&mut buf) => {
                let (len, _) = result?;
                for frame in decode_frames(&buf[..len]) {
                    let (event_no, event) = match frame {
                        Ok(frame) => frame,
                        Err(e) => {
                            println!("Dropping rest of datagram: {}", e);
                            break;
                        }
                    };

                    let fresh_game = event_no == 0 && matches!(event, Event::NewGame { .. });
                    if fresh_game || event_no == message.next_expected_event_no {
                        println!("#{:<6} {:?}", event_no, event);
                        message.next_expected_event_no = event_no + 1;
                        received += 1;
                    }
                }
            }

            _ = tokio::time::sleep_until(deadline) => break,
        }
    }

    println!("Test client finished after {} events", received);
    Ok(())
}
