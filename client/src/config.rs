//! Client command line.

use clap::Parser;
use shared::{validate_player_name, DEFAULT_SERVER_PORT};

pub const DEFAULT_GUI_PORT: u16 = 20210;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Bridges a worms game server and a display process")]
pub struct ClientConfig {
    /// Game server host name or address
    pub game_server: String,

    /// Player name; leave empty to watch as an observer
    #[arg(short = 'n', long, default_value = "", value_parser = parse_player_name)]
    pub player_name: String,

    /// Game server UDP port
    #[arg(short = 'p', long, default_value_t = DEFAULT_SERVER_PORT,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub port: u16,

    /// Display process host name or address
    #[arg(short = 'i', long, default_value = "localhost")]
    pub gui_server: String,

    /// Display process TCP port
    #[arg(short = 'r', long, default_value_t = DEFAULT_GUI_PORT,
          value_parser = clap::value_parser!(u16).range(1..))]
    pub gui_port: u16,
}

fn parse_player_name(name: &str) -> Result<String, String> {
    validate_player_name(name.as_bytes()).map_err(|e| e.to_string())?;
    Ok(name.to_string())
}
