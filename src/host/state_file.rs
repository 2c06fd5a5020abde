//! Game host backed by the JSON state file the in-game bridge writes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::Deserialize;

use super::{GameWorld, PlayerData};
use crate::error::HostError;
use crate::sampler::Entity;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GameState {
    scene: Option<String>,
    player_data: serde_json::Map<String, serde_json::Value>,
    entities: Vec<EntityRecord>,
}

#[derive(Debug, Deserialize)]
struct EntityRecord {
    #[serde(default)]
    name: String,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    boss: Option<bool>,
}

impl EntityRecord {
    /// An explicit boss flag from the bridge wins over the tag heuristic
    fn into_entity(self) -> Entity {
        match self.boss {
            Some(is_boss) => Entity::new(self.name, is_boss),
            None => Entity::tagged(self.name, self.tag.as_deref()),
        }
    }
}

/// One parsed document from the bridge
#[derive(Debug)]
struct Frame {
    scene: Option<String>,
    player_data: serde_json::Map<String, serde_json::Value>,
    entities: Vec<Entity>,
}

impl From<GameState> for Frame {
    fn from(state: GameState) -> Self {
        let entities = state
            .entities
            .into_iter()
            // Nameless records are objects the bridge caught mid-destroy
            .filter(|record| !record.name.is_empty())
            .map(EntityRecord::into_entity)
            .collect();

        Self {
            scene: state.scene,
            player_data: state.player_data,
            entities,
        }
    }
}

/// Reads the game state from the JSON file the bridge writes.
///
/// The file is parsed once per [`GameWorld::begin_frame`]; every accessor is
/// then served from that frame until the next one. A missing file means the
/// game has not started (or the bridge has not written its first frame yet)
/// and is reported as [`HostError::NotReady`].
pub struct StateFileHost {
    path: PathBuf,
    frame: Mutex<Option<Arc<Frame>>>,
}

impl StateFileHost {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            frame: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Frame, HostError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(HostError::NotReady),
            Err(source) => {
                return Err(HostError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        // The bridge truncates before writing, so an empty read is a frame in progress
        if contents.trim().is_empty() {
            return Err(HostError::NotReady);
        }

        serde_json::from_str::<GameState>(&contents)
            .map(Frame::from)
            .map_err(|source| HostError::Malformed {
                path: self.path.clone(),
                source,
            })
    }

    /// The captured frame, loading one if nothing has been captured yet
    fn current(&self) -> Result<Arc<Frame>, HostError> {
        let mut frame = self.frame.lock().unwrap();
        if let Some(current) = frame.as_ref() {
            return Ok(Arc::clone(current));
        }

        let loaded = Arc::new(self.load()?);
        *frame = Some(Arc::clone(&loaded));
        Ok(loaded)
    }
}

impl GameWorld for StateFileHost {
    fn begin_frame(&self) -> Result<(), HostError> {
        let loaded = self.load();
        let mut frame = self.frame.lock().unwrap();
        match loaded {
            Ok(loaded) => {
                *frame = Some(Arc::new(loaded));
                Ok(())
            }
            Err(e) => {
                *frame = None;
                Err(e)
            }
        }
    }

    fn active_scene(&self) -> Result<String, HostError> {
        match &self.current()?.scene {
            Some(scene) if !scene.is_empty() => Ok(scene.clone()),
            _ => Err(HostError::NotReady),
        }
    }

    fn active_entities(&self) -> Result<Vec<Entity>, HostError> {
        Ok(self.current()?.entities.clone())
    }
}

impl PlayerData for StateFileHost {
    fn get_string(&self, key: &str) -> Result<Option<String>, HostError> {
        Ok(self
            .current()?
            .player_data
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, HostError> {
        Ok(self
            .current()?
            .player_data
            .get(key)
            .and_then(|v| v.as_bool()))
    }
}
