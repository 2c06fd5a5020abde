//! Reads one snapshot of game state per tick

use std::sync::Arc;

use crate::error::HostError;
use crate::host::{GameWorld, PlayerData, AT_BENCH, CURRENT_MAP_ZONE};

/// Object tag the game puts on boss enemies
const BOSS_TAG: &str = "Boss";

/// An entity alive in the active scene
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub name: String,
    pub is_boss: bool,
}

impl Entity {
    pub fn new(name: impl Into<String>, is_boss: bool) -> Self {
        Self {
            name: name.into(),
            is_boss,
        }
    }

    /// Build an entity from its object name and tag.
    ///
    /// Some bosses are not tagged, so a name containing "boss" counts too.
    pub fn tagged(name: impl Into<String>, tag: Option<&str>) -> Self {
        let name = name.into();
        let is_boss = tag == Some(BOSS_TAG) || name.to_lowercase().contains("boss");
        Self { name, is_boss }
    }
}

/// One tick's read of the game state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub scene_name: String,
    pub zone_label: String,
    pub is_resting: bool,
    pub active_entities: Vec<Entity>,
}

impl Snapshot {
    /// True for the snapshot returned while the host is still initializing
    pub fn is_empty(&self) -> bool {
        self.scene_name.is_empty()
    }

    /// First entity carrying the boss marker
    pub fn first_boss(&self) -> Option<&Entity> {
        self.active_entities.iter().find(|e| e.is_boss)
    }
}

/// Samples the host through its injected collaborators
pub struct Sampler {
    world: Arc<dyn GameWorld>,
    player: Arc<dyn PlayerData>,
}

impl Sampler {
    pub fn new(world: Arc<dyn GameWorld>, player: Arc<dyn PlayerData>) -> Self {
        Self { world, player }
    }

    /// Read the current state.
    ///
    /// Returns the empty snapshot while the host is not ready; any other
    /// host failure is passed on to the caller.
    pub fn sample(&self) -> Result<Snapshot, HostError> {
        match self.read() {
            Err(HostError::NotReady) => {
                tracing::trace!("Game host not ready, using empty snapshot");
                Ok(Snapshot::default())
            }
            other => other,
        }
    }

    fn read(&self) -> Result<Snapshot, HostError> {
        self.world.begin_frame()?;
        let scene_name = self.world.active_scene()?;
        let zone_label = self
            .player
            .get_string(CURRENT_MAP_ZONE)?
            .unwrap_or_default();
        let is_resting = self.player.get_bool(AT_BENCH)?.unwrap_or(false);
        let active_entities = self.world.active_entities()?;

        Ok(Snapshot {
            scene_name,
            zone_label,
            is_resting,
            active_entities,
        })
    }
}
