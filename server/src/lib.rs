//! # Worms Game Server Library
//!
//! Authoritative server for the multiplayer worms game. The server owns the
//! board, simulates every worm and keeps the numbered log of game events;
//! clients only report their turn intent and ask for the events they are
//! missing.
//!
//! ## Architecture
//!
//! ### Single-Threaded Event Loop
//! One task multiplexes the UDP socket, the round timer and the per-session
//! liveness deadlines with `tokio::select!`. Each wake-up is handled to
//! completion before the next one, so game state needs no locking.
//!
//! ### Pull-Based Delivery
//! New events are pushed once to every connected session as they happen.
//! Anything lost on the way is recovered by the client itself: each message
//! it sends carries the number of the next event it expects, and the server
//! answers with everything from that number on.
//!
//! ## Module Organization
//!
//! - [`client_manager`]: player and observer sessions, readiness, reconnects
//! - [`config`]: command line options
//! - [`event_log`]: the numbered event log of the current game
//! - [`game`]: board, worms and round simulation
//! - [`liveness`]: two-second inactivity deadlines
//! - [`network`]: datagram dispatch and the event loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use std::net::{Ipv6Addr, SocketAddr};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::parse();
//!     let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.port));
//!
//!     let mut server = Server::new(config, addr).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod config;
pub mod event_log;
pub mod game;
pub mod liveness;
pub mod network;
