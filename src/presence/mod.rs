mod manager;
mod status;
mod traits;

pub use manager::{start_presence_background_task, BackendConnection, PresenceManager};
pub use status::{boss_name, classify, Activity, PresenceStatus, DEFAULT_ICON, UNKNOWN_BOSS};
pub use traits::PresenceProvider;

#[cfg(test)]
pub(crate) use manager::tests as test_support;
