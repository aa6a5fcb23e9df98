//! SetCenterLockHandler - Command handler for the manual center lock.

use std::sync::Arc;

use crate::domain::capacity::{Center, CenterError};
use crate::domain::foundation::{CenterId, Timestamp};
use crate::ports::CenterRepository;

/// Command to lock or unlock a center.
#[derive(Debug, Clone)]
pub struct SetCenterLockCommand {
    pub center_id: CenterId,
    pub locked: bool,
}

/// Handler for the manual lock flag. Existing seats are not affected.
pub struct SetCenterLockHandler {
    centers: Arc<dyn CenterRepository>,
}

impl SetCenterLockHandler {
    pub fn new(centers: Arc<dyn CenterRepository>) -> Self {
        Self { centers }
    }

    pub async fn handle(&self, cmd: SetCenterLockCommand) -> Result<Center, CenterError> {
        let center = self
            .centers
            .set_locked(&cmd.center_id, cmd.locked, Timestamp::now())
            .await?
            .ok_or_else(|| CenterError::not_found(cmd.center_id))?;

        tracing::info!(center_id = %center.id, locked = cmd.locked, "Center lock changed");
        Ok(center)
    }
}
