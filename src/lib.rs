pub mod config;
mod discord;
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod presence;
pub mod sampler;
mod steam;

use std::sync::Arc;

use host::StateFileHost;
use lifecycle::{connect_backends, PresenceMod};
use sampler::Sampler;

pub use discord::DiscordPresence;
#[cfg(feature = "steam")]
pub use steam::SteamPresence;

/// Run the mod until Ctrl-C, mirroring the bridge state file to presence backends
pub async fn run() {
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}, using defaults", e);
            config::Config::default()
        }
    };

    let host = Arc::new(StateFileHost::new(config.state_file.clone()));
    tracing::info!("Reading game state from {}", host.path().display());
    let sampler = Sampler::new(host.clone(), host);

    let connections = connect_backends(&config).await;

    let mut presence_mod = PresenceMod::new(config.poll_interval());
    presence_mod.init(sampler, connections);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }

    tracing::info!("Shutting down");
    presence_mod.unload().await;
}
