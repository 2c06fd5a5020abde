use async_trait::async_trait;
use steamworks::Client;

use crate::error::PresenceError;
use crate::presence::{PresenceProvider, PresenceStatus};

/// Localization token the Steam friends list renders for our status
const STEAM_DISPLAY_TOKEN: &str = "#Status";

/// Steam-specific presence provider
pub struct SteamPresence {
    client: Client,
}

impl SteamPresence {
    pub fn init(app_id: u32) -> Result<Self, PresenceError> {
        tracing::debug!("Initializing Steam client for app {}", app_id);
        let client =
            Client::init_app(app_id).map_err(|e| PresenceError::SteamInit(e.to_string()))?;
        tracing::info!("Steam Rich Presence initialized");
        Ok(Self { client })
    }

    fn set(&self, key: &'static str, value: &str) -> Result<(), PresenceError> {
        if self.client.friends().set_rich_presence(key, Some(value)) {
            Ok(())
        } else {
            Err(PresenceError::SteamRejected { key })
        }
    }
}

#[async_trait]
impl PresenceProvider for SteamPresence {
    fn name(&self) -> &'static str {
        "Steam"
    }

    fn update_presence(&mut self, status: &PresenceStatus) -> Result<(), PresenceError> {
        tracing::debug!("Setting Steam presence: {}", status.headline);
        self.set("status", &status.headline)?;
        self.set("steam_display", STEAM_DISPLAY_TOKEN)?;
        self.set("steam_status_detail", &status.subline)
    }

    fn clear_presence(&mut self) -> Result<(), PresenceError> {
        self.client.friends().clear_rich_presence();
        Ok(())
    }

    fn poll(&mut self) {
        self.client.run_callbacks();
    }

    async fn shutdown(self: Box<Self>) {
        // Dropping the last client handle shuts the Steam API down
        drop(self);
    }
}
