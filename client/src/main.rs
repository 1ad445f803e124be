use clap::Parser;
use client::config::ClientConfig;
use client::network::Client;
use log::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ClientConfig::parse();

    if config.player_name.is_empty() {
        info!("Joining {} as an observer", config.game_server);
    } else {
        info!("Joining {} as {}", config.game_server, config.player_name);
    }

    let mut client = Client::connect(&config).await?;
    client.run().await?;

    Ok(())
}
