//! Server command line and derived settings.

use clap::Parser;
use shared::{BOARD_SIZE_MAX, BOARD_SIZE_MIN, DEFAULT_SERVER_PORT};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Authoritative server for the worms game")]
pub struct ServerConfig {
    /// UDP port to listen on
    #[arg(short = 'p', long, default_value_t = DEFAULT_SERVER_PORT,
          value_parser = clap::value_parser!(u16).range(2..))]
    pub port: u16,

    /// Seed for worm placement (defaults to the current time)
    #[arg(short = 's', long, value_parser = clap::value_parser!(u64).range(1..=u32::MAX as u64))]
    pub seed: Option<u64>,

    /// Degrees a worm turns per round
    #[arg(short = 't', long, default_value_t = 6,
          value_parser = clap::value_parser!(u32).range(1..=90))]
    pub turning_speed: u32,

    /// Rounds simulated per second
    #[arg(short = 'v', long, default_value_t = 50,
          value_parser = clap::value_parser!(u32).range(1..=250))]
    pub rounds_per_sec: u32,

    /// Board width in pixels
    #[arg(short = 'w', long, default_value_t = 640,
          value_parser = clap::value_parser!(u32).range(BOARD_SIZE_MIN as i64..=BOARD_SIZE_MAX as i64))]
    pub width: u32,

    /// Board height in pixels (short flag is upper case, -h is help)
    #[arg(short = 'H', long, default_value_t = 480,
          value_parser = clap::value_parser!(u32).range(BOARD_SIZE_MIN as i64..=BOARD_SIZE_MAX as i64))]
    pub height: u32,
}

impl ServerConfig {
    /// The configured seed, or wall-clock seconds when none was given.
    pub fn resolved_seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::from_secs(1))
                .as_secs()
        })
    }

    pub fn round_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.rounds_per_sec as u64)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_SERVER_PORT,
            seed: None,
            turning_speed: 6,
            rounds_per_sec: 50,
            width: 640,
            height: 480,
        }
    }
}
