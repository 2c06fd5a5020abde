use async_trait::async_trait;

use super::status::PresenceStatus;
use crate::error::PresenceError;

/// Trait for presence backends (Steam, Discord, etc.)
#[async_trait]
pub trait PresenceProvider: Send {
    /// Returns the name of this presence provider (for logging)
    fn name(&self) -> &'static str;

    /// Publish a new status
    fn update_presence(&mut self, status: &PresenceStatus) -> Result<(), PresenceError>;

    /// Clear all presence data
    fn clear_presence(&mut self) -> Result<(), PresenceError>;

    /// Service SDK callbacks, called once per tick
    fn poll(&mut self) {}

    /// Release the connection. The manager clears presence right before this.
    async fn shutdown(self: Box<Self>);
}
