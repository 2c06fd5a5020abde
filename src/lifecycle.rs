//! Init/unload lifecycle of the presence mod

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::discord::DiscordPresence;
use crate::presence::{
    start_presence_background_task, BackendConnection, PresenceManager, PresenceProvider,
};
use crate::sampler::Sampler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModState {
    Stopped,
    Running,
}

struct Session {
    cancel: CancellationToken,
    task: JoinHandle<PresenceManager>,
}

/// Owns the polling loop between `init` and `unload`
pub struct PresenceMod {
    poll_interval: Duration,
    session: Option<Session>,
}

impl PresenceMod {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            session: None,
        }
    }

    pub fn state(&self) -> ModState {
        if self.session.is_some() {
            ModState::Running
        } else {
            ModState::Stopped
        }
    }

    /// Start publishing presence with whichever backends connected.
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(&mut self, sampler: Sampler, connections: Vec<BackendConnection>) {
        if self.session.is_some() {
            tracing::warn!("HollowPresence is already running, ignoring init");
            return;
        }

        let mut manager = PresenceManager::new(Utc::now());
        for connection in connections {
            manager.add_connection(connection);
        }

        if manager.provider_names().is_empty() {
            tracing::warn!("No presence backend available, status will only be logged");
        }

        let cancel = CancellationToken::new();
        let task =
            start_presence_background_task(manager, sampler, self.poll_interval, cancel.clone());

        tracing::info!(
            "HollowPresence initialized, updating every {:?}",
            self.poll_interval
        );
        self.session = Some(Session { cancel, task });
    }

    /// Stop polling, then clear and release every backend
    pub async fn unload(&mut self) {
        let Some(Session { cancel, task }) = self.session.take() else {
            return;
        };

        cancel.cancel();
        match task.await {
            Ok(manager) => manager.shutdown().await,
            Err(e) => tracing::error!("Presence loop ended abnormally: {}", e),
        }

        tracing::info!("HollowPresence unloaded");
    }
}

/// Open every enabled backend, reporting failures instead of aborting
pub async fn connect_backends(config: &Config) -> Vec<BackendConnection> {
    let mut connections: Vec<BackendConnection> = Vec::new();

    if config.enable_discord {
        let discord = DiscordPresence::connect(config)
            .await
            .map(|p| Box::new(p) as Box<dyn PresenceProvider>);
        connections.push(("Discord", discord));
    } else {
        tracing::info!("Discord presence disabled in config");
    }

    if config.enable_steam {
        #[cfg(feature = "steam")]
        {
            let steam = crate::steam::SteamPresence::init(config.steam_app_id)
                .map(|p| Box::new(p) as Box<dyn PresenceProvider>);
            connections.push(("Steam", steam));
        }

        #[cfg(not(feature = "steam"))]
        tracing::warn!(
            "Steam presence is enabled but this build lacks the steam feature, skipping it"
        );
    } else {
        tracing::info!("Steam presence disabled in config");
    }

    connections
}
