//! EjectEnrollmentHandler - Admin command that ejects an Active holder.

use std::sync::Arc;

use crate::domain::billing::BillingPolicy;
use crate::domain::enrollment::{Enrollment, EnrollmentError};
use crate::domain::foundation::{EnrollmentId, Timestamp};
use crate::ports::{EnrollmentRepository, Notifier};

use super::{commit_update, ejection_notice, load, MAX_COMMIT_ATTEMPTS};
use crate::application::handlers::notify::send_best_effort;

#[derive(Debug, Clone)]
pub struct EjectEnrollmentCommand {
    pub enrollment_id: EnrollmentId,
}

/// Ejects regardless of the due date, releases the seat and notifies the
/// student.
pub struct EjectEnrollmentHandler {
    enrollments: Arc<dyn EnrollmentRepository>,
    notifier: Arc<dyn Notifier>,
    policy: BillingPolicy,
}

impl EjectEnrollmentHandler {
    pub fn new(
        enrollments: Arc<dyn EnrollmentRepository>,
        notifier: Arc<dyn Notifier>,
        policy: BillingPolicy,
    ) -> Self {
        Self {
            enrollments,
            notifier,
            policy,
        }
    }

    pub async fn handle(&self, cmd: EjectEnrollmentCommand) -> Result<Enrollment, EnrollmentError> {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let mut enrollment = load(self.enrollments.as_ref(), &cmd.enrollment_id).await?;
            let version = enrollment.version;
            let now = Timestamp::now();
            let effect = enrollment.eject_by_admin(now)?;

            if let Some(saved) =
                commit_update(self.enrollments.as_ref(), enrollment, version, effect, now).await?
            {
                tracing::info!(
                    enrollment_id = %saved.id,
                    ejection_count = saved.ejection_count,
                    "Enrollment ejected by admin"
                );
                send_best_effort(self.notifier.as_ref(), ejection_notice(&saved, now, &self.policy)).await;
                return Ok(saved);
            }
        }
        Err(EnrollmentError::Conflict(cmd.enrollment_id))
    }
}
