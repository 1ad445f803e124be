use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::network::Server;
use std::net::{Ipv6Addr, SocketAddr};

/// Parses the command line, binds the dual-stack socket and runs the server
/// until it fails or Ctrl+C is pressed.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ServerConfig::parse();
    let addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.port));

    let mut server = Server::new(config, addr).await?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server stopped: {}", e);
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
