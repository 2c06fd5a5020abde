#[cfg(feature = "steam")]
mod presence;

#[cfg(feature = "steam")]
pub use presence::SteamPresence;

/// Hollow Knight's Steam app id
pub const STEAM_APP_ID: u32 = 367520;
