use log::{error, info, warn};
use std::net::SocketAddr;

use rusty_rooms::config::ServerConfig;
use rusty_rooms::App;

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG from the file applies
    let dotenv = dotenvy::dotenv();

    // Initialize logging
    env_logger::init();

    match dotenv {
        Ok(path) => info!("Environment variables loaded from {}", path.display()),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: host={}, port={}, room_auth={}, default_room_capacity={}",
        config.host, config.port, config.room_auth_enabled, config.default_room_capacity
    );

    let app = App::build(&config).await;
    app.revocations
        .clone()
        .start_cleanup_task(config.revocation_cleanup_interval);

    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Failed to parse server address: {}", e);
            std::process::exit(1);
        }
    };

    info!("Starting Rusty Rooms server on {}", addr);
    warp::serve(app.routes()).run(addr).await;
}
