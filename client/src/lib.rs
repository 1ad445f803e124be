//! # Worms Game Client Library
//!
//! The client sits between a game server and a local display process. It
//! never simulates anything itself: it reports the player's turn intent to
//! the server and relays the server's events to the display as text lines.
//!
//! ## Event Reassembly
//! Events arrive over UDP, so they may be lost, duplicated or reordered.
//! [`game::ClientGame`] buffers them and releases them strictly in event
//! number order, checking each against the rules of the game. Every message
//! sent to the server carries the lowest event number not yet released, and
//! the server answers with everything from there on, which fills the gaps.
//!
//! ## Module Organization
//!
//! - [`config`]: command line options
//! - [`display`]: lines sent to the display process
//! - [`error`]: protocol violations that end the client
//! - [`game`]: reassembly buffer and per-game checks
//! - [`input`]: key events and the resulting turn intent
//! - [`network`]: the event loop over both connections
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use clap::Parser;
//! use client::config::ClientConfig;
//! use client::network::Client;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::parse();
//!     let mut client = Client::connect(&config).await?;
//!     client.run().await
//! }
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod game;
pub mod input;
pub mod network;

pub use error::ProtocolViolation;
