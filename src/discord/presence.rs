//! Discord Rich Presence integration using discord-sdk

use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use discord_sdk::{
    activity::{ActivityBuilder, Assets},
    registration::{Application, LaunchCommand},
    wheel::{UserState, Wheel},
    Discord, Subscriptions,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::PresenceError;
use crate::presence::{PresenceProvider, PresenceStatus};

/// Timeout for waiting for Discord handshake
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

enum DiscordCommand {
    Update(PresenceStatus),
    Clear,
}

/// Large image shown on every activity
#[derive(Debug, Clone)]
struct LargeImage {
    key: String,
    text: String,
}

/// Discord presence provider.
///
/// The connection lives in a background task; updates are queued to it so a
/// slow Discord client never holds up a tick.
pub struct DiscordPresence {
    update_tx: mpsc::UnboundedSender<DiscordCommand>,
    task: JoinHandle<()>,
}

impl DiscordPresence {
    /// Connect to the local Discord client and wait for the handshake
    pub async fn connect(config: &Config) -> Result<Self, PresenceError> {
        // Register app with Discord (allows Discord to launch the game via Steam)
        if let Err(e) = discord_sdk::registration::register_app(Application {
            id: config.discord_app_id,
            name: Some(config.large_image_text.clone()),
            command: LaunchCommand::Steam(config.steam_app_id),
        }) {
            tracing::warn!("Failed to register Discord app: {:?}", e);
        }

        let (wheel, handler) = Wheel::new(Box::new(|err| {
            tracing::warn!("Discord error: {:?}", err);
        }));

        let mut user_spoke = wheel.user();

        let discord = Discord::new(
            config.discord_app_id,
            Subscriptions::ACTIVITY,
            Box::new(handler),
        )
        .map_err(|e| PresenceError::DiscordUnavailable(format!("{:?}", e)))?;

        tracing::info!("Discord connecting...");

        let handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, async {
            if user_spoke.0.changed().await.is_err() {
                Err("Discord connection closed".to_string())
            } else {
                match &*user_spoke.0.borrow() {
                    UserState::Connected(user) => Ok(user.clone()),
                    UserState::Disconnected(err) => Err(format!("Discord disconnected: {:?}", err)),
                }
            }
        })
        .await;

        let user = match handshake {
            Ok(Ok(user)) => user,
            Ok(Err(e)) => {
                discord.disconnect().await;
                return Err(PresenceError::DiscordUnavailable(e));
            }
            Err(_) => {
                discord.disconnect().await;
                return Err(PresenceError::HandshakeTimeout);
            }
        };

        tracing::info!(
            "Discord Rich Presence connected as {}#{}",
            user.username,
            user.discriminator.unwrap_or(0)
        );

        let large = LargeImage {
            key: config.large_image_key.clone(),
            text: config.large_image_text.clone(),
        };
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Self::run_discord_task(discord, update_rx, large));

        Ok(Self { update_tx, task })
    }

    /// Background task that owns the Discord connection and applies queued updates
    async fn run_discord_task(
        discord: Discord,
        mut update_rx: mpsc::UnboundedReceiver<DiscordCommand>,
        large: LargeImage,
    ) {
        while let Some(command) = update_rx.recv().await {
            let result = match command {
                DiscordCommand::Update(status) => {
                    discord.update_activity(build_activity(&status, &large)).await
                }
                DiscordCommand::Clear => discord.clear_activity().await,
            };

            if let Err(e) = result {
                tracing::debug!("Failed to update Discord activity: {:?}", e);
            }
        }

        discord.disconnect().await;
        tracing::info!("Discord Rich Presence disconnected");
    }

    fn send(&self, command: DiscordCommand) -> Result<(), PresenceError> {
        self.update_tx
            .send(command)
            .map_err(|_| PresenceError::Disconnected("Discord"))
    }
}

fn build_activity(status: &PresenceStatus, large: &LargeImage) -> ActivityBuilder {
    ActivityBuilder::new()
        .details(status.headline.clone())
        .state(status.subline.clone())
        .assets(
            Assets::default()
                .large(large.key.clone(), Some(large.text.clone()))
                .small(status.icon_key, Some(status.icon_text.clone())),
        )
        .start_timestamp(SystemTime::from(status.session_start))
}

#[async_trait]
impl PresenceProvider for DiscordPresence {
    fn name(&self) -> &'static str {
        "Discord"
    }

    fn update_presence(&mut self, status: &PresenceStatus) -> Result<(), PresenceError> {
        self.send(DiscordCommand::Update(status.clone()))
    }

    fn clear_presence(&mut self) -> Result<(), PresenceError> {
        self.send(DiscordCommand::Clear)
    }

    async fn shutdown(self: Box<Self>) {
        let Self { update_tx, task } = *self;
        // Closing the channel lets the task drain and disconnect
        drop(update_tx);

        if let Err(e) = task.await {
            tracing::warn!("Discord task ended abnormally: {}", e);
        }
    }
}
