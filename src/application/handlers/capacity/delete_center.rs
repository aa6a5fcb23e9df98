//! DeleteCenterHandler - Command handler for removing an unused center.

use std::sync::Arc;

use crate::domain::capacity::CenterError;
use crate::domain::foundation::CenterId;
use crate::ports::{CenterDeletion, CenterRepository};

/// Command to delete a center.
#[derive(Debug, Clone)]
pub struct DeleteCenterCommand {
    pub center_id: CenterId,
}

/// Handler for center deletion.
///
/// Refused while any Pending or Active enrollment references the center.
pub struct DeleteCenterHandler {
    centers: Arc<dyn CenterRepository>,
}

impl DeleteCenterHandler {
    pub fn new(centers: Arc<dyn CenterRepository>) -> Self {
        Self { centers }
    }

    pub async fn handle(&self, cmd: DeleteCenterCommand) -> Result<(), CenterError> {
        match self.centers.delete_if_unused(&cmd.center_id).await? {
            CenterDeletion::Deleted => {
                tracing::info!(center_id = %cmd.center_id, "Center deleted");
                Ok(())
            }
            CenterDeletion::NotFound => Err(CenterError::not_found(cmd.center_id)),
            CenterDeletion::InUse { seats_held } => {
                tracing::warn!(
                    center_id = %cmd.center_id,
                    seats_held,
                    "Refused to delete center with seats held"
                );
                Err(CenterError::in_use(cmd.center_id, seats_held))
            }
        }
    }
}
