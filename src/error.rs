//! Error types shared across the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading state from the game host.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host has not finished initializing (no scene loaded, no player data yet).
    #[error("game host is not ready")]
    NotReady,

    #[error("failed to read game state from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed game state in {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to a presence backend.
#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("Discord is not available: {0}")]
    DiscordUnavailable(String),

    #[error("Discord handshake timed out")]
    HandshakeTimeout,

    #[error("{0} connection is closed")]
    Disconnected(&'static str),

    #[error("Steam initialization failed: {0}")]
    SteamInit(String),

    #[error("Steam rejected rich presence key {key:?}")]
    SteamRejected { key: &'static str },
}

/// Failures loading the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
