//! Read-only views of the running game.
//!
//! The sampler only ever sees these traits, so the same classification code
//! runs against the state-file bridge in production and against fakes in tests.

mod state_file;

pub use state_file::StateFileHost;

use crate::error::HostError;
use crate::sampler::Entity;

/// Player data key holding the current map zone label.
pub const CURRENT_MAP_ZONE: &str = "currentMapZone";

/// Player data key set while the knight sits on a bench.
pub const AT_BENCH: &str = "atBench";

/// Scene and entity accessors of the game world
pub trait GameWorld: Send + Sync {
    /// Capture the frame every following read is served from.
    ///
    /// The sampler calls this once per sample so the scene, player data and
    /// entities of one snapshot all come from the same game frame.
    fn begin_frame(&self) -> Result<(), HostError> {
        Ok(())
    }

    /// Name of the active scene
    fn active_scene(&self) -> Result<String, HostError>;

    /// Entities currently alive in the scene, in host order
    fn active_entities(&self) -> Result<Vec<Entity>, HostError>;
}

/// Typed key/value store of the player's save data
pub trait PlayerData: Send + Sync {
    fn get_string(&self, key: &str) -> Result<Option<String>, HostError>;

    fn get_bool(&self, key: &str) -> Result<Option<bool>, HostError>;
}
