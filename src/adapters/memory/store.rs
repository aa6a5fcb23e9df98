//! In-memory store implementing every storage port.
//!
//! All state sits behind one async mutex, so an enrollment write and its
//! ledger effect are applied under the same lock: the whole change is
//! validated first and then written, or nothing is written.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::capacity::Center;
use crate::domain::enrollment::{Enrollment, EnrollmentStatus, LedgerEffect};
use crate::domain::foundation::{
    CenterId, CourseId, DomainError, EnrollmentId, ErrorCode, Timestamp, UserId,
};
use crate::domain::subscription::UserAccount;
use crate::ports::{
    CenterDeletion, CenterRepository, CommitOutcome, CourseReader, CourseSummary,
    EnrollmentChange, EnrollmentRepository, PaymentApplication, PaymentEventLog,
    PaymentEventRecord, SaveResult, SubscriptionPayment, SubscriptionRepository,
};

#[derive(Debug, Default)]
struct State {
    courses: HashMap<CourseId, CourseSummary>,
    centers: HashMap<CenterId, Center>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
    accounts: HashMap<UserId, UserAccount>,
    subscription_payments: HashSet<String>,
    events: HashMap<(String, String), PaymentEventRecord>,
    /// Commits left to fail with a database error (test hook).
    failing_commits: u32,
}

/// In-memory implementation of the storage ports.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

/// Centers touched by an effect, or the center that refused a seat.
enum EffectPlan {
    Apply(Vec<Center>),
    SeatUnavailable(CenterId),
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a course (course content is managed elsewhere).
    pub async fn insert_course(&self, course: CourseSummary) {
        self.state.lock().await.courses.insert(course.id, course);
    }

    /// Makes the next `count` enrollment commits fail as if the database
    /// was unreachable.
    pub async fn fail_next_commits(&self, count: u32) {
        self.state.lock().await.failing_commits = count;
    }

    /// Number of enrollment records.
    pub async fn enrollment_count(&self) -> usize {
        self.state.lock().await.enrollments.len()
    }

    /// All recorded gateway deliveries.
    pub async fn payment_events(&self) -> Vec<PaymentEventRecord> {
        self.state.lock().await.events.values().cloned().collect()
    }

    fn plan_effect(
        centers: &HashMap<CenterId, Center>,
        effect: LedgerEffect,
        at: Timestamp,
    ) -> Result<EffectPlan, DomainError> {
        let load = |id: CenterId| {
            centers.get(&id).cloned().ok_or_else(|| {
                DomainError::new(ErrorCode::CenterNotFound, format!("Center not found: {}", id))
            })
        };

        let touched = match effect {
            LedgerEffect::None => Vec::new(),
            LedgerEffect::Reserve { center_id } => {
                let mut center = load(center_id)?;
                if center.try_reserve(at).is_err() {
                    return Ok(EffectPlan::SeatUnavailable(center_id));
                }
                vec![center]
            }
            LedgerEffect::Release { center_id } => {
                let mut center = load(center_id)?;
                center.release(at);
                vec![center]
            }
            LedgerEffect::Credit { center_id, amount } => {
                let mut center = load(center_id)?;
                center.credit(amount, at);
                vec![center]
            }
            LedgerEffect::Restore { center_id } => {
                let mut center = load(center_id)?;
                if !center.try_occupy(at) {
                    return Ok(EffectPlan::SeatUnavailable(center_id));
                }
                vec![center]
            }
            LedgerEffect::RestoreAndCredit { center_id, amount } => {
                let mut center = load(center_id)?;
                if !center.try_occupy(at) {
                    return Ok(EffectPlan::SeatUnavailable(center_id));
                }
                center.credit(amount, at);
                vec![center]
            }
            LedgerEffect::Transfer { from, to } => {
                let mut target = load(to)?;
                if !target.try_occupy(at) {
                    return Ok(EffectPlan::SeatUnavailable(to));
                }
                let mut source = load(from)?;
                source.release(at);
                vec![source, target]
            }
        };
        Ok(EffectPlan::Apply(touched))
    }
}

#[async_trait]
impl CourseReader for InMemoryStore {
    async fn find_by_id(&self, id: &CourseId) -> Result<Option<CourseSummary>, DomainError> {
        Ok(self.state.lock().await.courses.get(id).cloned())
    }
}

#[async_trait]
impl CenterRepository for InMemoryStore {
    async fn insert(&self, center: &Center) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        if !state.courses.contains_key(&center.course_id) {
            return Err(DomainError::new(
                ErrorCode::CourseNotFound,
                format!("Course not found: {}", center.course_id),
            ));
        }
        state.centers.insert(center.id, center.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &CenterId) -> Result<Option<Center>, DomainError> {
        Ok(self.state.lock().await.centers.get(id).cloned())
    }

    async fn list_by_course(&self, course_id: &CourseId) -> Result<Vec<Center>, DomainError> {
        let state = self.state.lock().await;
        let mut centers: Vec<Center> = state
            .centers
            .values()
            .filter(|c| &c.course_id == course_id)
            .cloned()
            .collect();
        centers.sort_by_key(|c| c.created_at);
        Ok(centers)
    }

    async fn set_locked(
        &self,
        id: &CenterId,
        locked: bool,
        at: Timestamp,
    ) -> Result<Option<Center>, DomainError> {
        let mut state = self.state.lock().await;
        Ok(state.centers.get_mut(id).map(|center| {
            center.is_locked = locked;
            center.updated_at = at;
            center.clone()
        }))
    }

    async fn delete_if_unused(&self, id: &CenterId) -> Result<CenterDeletion, DomainError> {
        let mut state = self.state.lock().await;
        if !state.centers.contains_key(id) {
            return Ok(CenterDeletion::NotFound);
        }
        let seats_held = state
            .enrollments
            .values()
            .filter(|e| e.center_id.as_ref() == Some(id) && e.status.holds_seat())
            .count() as u64;
        if seats_held > 0 {
            return Ok(CenterDeletion::InUse { seats_held });
        }
        state.centers.remove(id);
        Ok(CenterDeletion::Deleted)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryStore {
    async fn commit(&self, change: EnrollmentChange) -> Result<CommitOutcome, DomainError> {
        let mut state = self.state.lock().await;

        if state.failing_commits > 0 {
            state.failing_commits -= 1;
            return Err(DomainError::database("connection reset during commit"));
        }

        let EnrollmentChange {
            mut enrollment,
            expected_version,
            effect,
            at,
        } = change;

        match expected_version {
            None => {
                let duplicate = state.enrollments.contains_key(&enrollment.id)
                    || state.enrollments.values().any(|e| {
                        e.user_id == enrollment.user_id && e.course_id == enrollment.course_id
                    });
                if duplicate {
                    return Ok(CommitOutcome::Conflict);
                }
                enrollment.version = 1;
            }
            Some(expected) => match state.enrollments.get(&enrollment.id) {
                Some(current) if current.version == expected => {
                    enrollment.version = expected + 1;
                }
                _ => return Ok(CommitOutcome::Conflict),
            },
        }

        if let Some(tx) = enrollment.transaction_id.as_deref() {
            let taken = state
                .enrollments
                .values()
                .any(|e| e.id != enrollment.id && e.transaction_id.as_deref() == Some(tx));
            if taken {
                return Err(DomainError::database(format!(
                    "transaction id {} already belongs to another enrollment",
                    tx
                )));
            }
        }

        let touched = match Self::plan_effect(&state.centers, effect, at)? {
            EffectPlan::Apply(touched) => touched,
            EffectPlan::SeatUnavailable(center_id) => {
                return Ok(CommitOutcome::SeatUnavailable { center_id })
            }
        };

        for center in touched {
            state.centers.insert(center.id, center);
        }
        state.enrollments.insert(enrollment.id, enrollment.clone());
        Ok(CommitOutcome::Applied(enrollment))
    }

    async fn find_by_id(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, DomainError> {
        Ok(self.state.lock().await.enrollments.get(id).cloned())
    }

    async fn find_by_user_and_course(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<Enrollment>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .enrollments
            .values()
            .find(|e| &e.user_id == user_id && &e.course_id == course_id)
            .cloned())
    }

    async fn find_by_payment_id(&self, payment_id: &str) -> Result<Option<Enrollment>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .enrollments
            .values()
            .find(|e| {
                e.transaction_id.as_deref() == Some(payment_id)
                    || e.settled_payment_id.as_deref() == Some(payment_id)
            })
            .cloned())
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Enrollment>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .enrollments
            .values()
            .find(|e| e.payment_reference.as_deref() == Some(reference))
            .cloned())
    }

    async fn find_due_for_warning(
        &self,
        now: Timestamp,
        horizon: Timestamp,
    ) -> Result<Vec<Enrollment>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .enrollments
            .values()
            .filter(|e| {
                e.status == EnrollmentStatus::Active && is_held_seat(e) && !e.warning_email_sent
            })
            .filter(|e| {
                e.next_payment_due
                    .map(|due| !due.is_before(&now) && !due.is_after(&horizon))
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn find_overdue(&self, now: Timestamp) -> Result<Vec<Enrollment>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .enrollments
            .values()
            .filter(|e| is_held_seat(e))
            .filter(|e| e.next_payment_due.map(|due| due.is_before(&now)).unwrap_or(false))
            .cloned()
            .collect())
    }
}

/// Pending or Active, not ejected, at a center.
fn is_held_seat(e: &Enrollment) -> bool {
    e.status != EnrollmentStatus::Cancelled && !e.is_ejected && e.center_id.is_some()
}

#[async_trait]
impl SubscriptionRepository for InMemoryStore {
    async fn find(&self, user_id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        Ok(self.state.lock().await.accounts.get(user_id).cloned())
    }

    async fn find_or_create(&self, account: &UserAccount) -> Result<UserAccount, DomainError> {
        let mut state = self.state.lock().await;
        let stored = state
            .accounts
            .entry(account.user_id.clone())
            .or_insert_with(|| account.clone());
        if account.role.is_some() && stored.role != account.role {
            stored.role = account.role.clone();
        }
        if account.email.is_some() && stored.email != account.email {
            stored.email = account.email.clone();
        }
        Ok(stored.clone())
    }

    async fn record_trial_start(&self, user_id: &UserId, at: Timestamp) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        match state.accounts.get_mut(user_id) {
            Some(account) if account.trial_started_at.is_none() => {
                account.trial_started_at = Some(at);
                account.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn apply_payment(
        &self,
        payment: SubscriptionPayment,
    ) -> Result<PaymentApplication, DomainError> {
        let mut state = self.state.lock().await;
        if state.subscription_payments.contains(&payment.payment_id) {
            return Ok(PaymentApplication::AlreadyApplied);
        }
        let Some(account) = state.accounts.get_mut(&payment.user_id) else {
            return Ok(PaymentApplication::UnknownUser);
        };
        let paid_until = account.extend(payment.at, &payment.billing);
        state.subscription_payments.insert(payment.payment_id);
        Ok(PaymentApplication::Applied { paid_until })
    }

    async fn find_expiring(
        &self,
        now: Timestamp,
        horizon: Timestamp,
    ) -> Result<Vec<UserAccount>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .accounts
            .values()
            .filter(|a| match a.paid_until {
                Some(until) => {
                    !until.is_before(&now)
                        && !until.is_after(&horizon)
                        && a.warning_sent_for != Some(until)
                }
                None => false,
            })
            .cloned()
            .collect())
    }

    async fn mark_warning_sent(
        &self,
        user_id: &UserId,
        paid_until: Timestamp,
    ) -> Result<bool, DomainError> {
        let mut state = self.state.lock().await;
        match state.accounts.get_mut(user_id) {
            Some(account)
                if account.paid_until == Some(paid_until)
                    && account.warning_sent_for != Some(paid_until) =>
            {
                account.warning_sent_for = Some(paid_until);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl PaymentEventLog for InMemoryStore {
    async fn record(&self, record: PaymentEventRecord) -> Result<SaveResult, DomainError> {
        let mut state = self.state.lock().await;
        let key = (record.payment_id.clone(), record.status.clone());
        if state.events.contains_key(&key) {
            return Ok(SaveResult::AlreadyExists);
        }
        state.events.insert(key, record);
        Ok(SaveResult::Inserted)
    }

    async fn find(
        &self,
        payment_id: &str,
        status: &str,
    ) -> Result<Option<PaymentEventRecord>, DomainError> {
        let state = self.state.lock().await;
        Ok(state
            .events
            .get(&(payment_id.to_string(), status.to_string()))
            .cloned())
    }
}
