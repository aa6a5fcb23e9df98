//! Site-wide access gate: a one-time trial, then a monthly platform fee.

use serde::{Deserialize, Serialize};

use crate::domain::billing::{BillingPolicy, Enforcement, RecurringObligation};
use crate::domain::foundation::{Timestamp, UserId};

use super::SubscriptionError;

/// Trial length, price and exempt roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionPolicy {
    pub trial_days: i64,
    pub price: i64,
    /// Subscription period and warning lookahead.
    pub billing: BillingPolicy,
    pub excluded_roles: Vec<String>,
}

impl SubscriptionPolicy {
    /// Whether `role` bypasses the gate. Case-insensitive.
    pub fn is_excluded(&self, role: Option<&str>) -> bool {
        role.map(|r| {
            self.excluded_roles
                .iter()
                .any(|excluded| excluded.eq_ignore_ascii_case(r.trim()))
        })
        .unwrap_or(false)
    }
}

impl Default for SubscriptionPolicy {
    fn default() -> Self {
        Self {
            trial_days: 7,
            price: 1000,
            billing: BillingPolicy::default(),
            excluded_roles: vec!["admin".to_string(), "staff".to_string()],
        }
    }
}

/// Outcome of a trial start request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialOutcome {
    TrialStarted,
    SkippedAdmin,
    TrialAlreadyStarted,
    HasSubscription,
}

/// Point-in-time view of a user's access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessStatus {
    pub needs_to_pay: bool,
    pub is_excluded: bool,
    pub trial_active: bool,
    pub trial_days_remaining: u32,
    pub has_active_subscription: bool,
    pub subscription_days_remaining: u32,
    pub paid_until: Option<Timestamp>,
    pub price: i64,
}

/// Subscription fields of a user account.
///
/// # Invariants
///
/// - `trial_started_at` is set at most once and never cleared
/// - `paid_until` only moves forward
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: UserId,
    pub role: Option<String>,
    pub email: Option<String>,
    pub trial_started_at: Option<Timestamp>,
    pub paid_until: Option<Timestamp>,
    /// The `paid_until` value the expiry warning was sent for.
    pub warning_sent_for: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserAccount {
    pub fn new(user_id: UserId, role: Option<String>, email: Option<String>, now: Timestamp) -> Self {
        Self {
            user_id,
            role,
            email,
            trial_started_at: None,
            paid_until: None,
            warning_sent_for: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Days left in the trial, rounded up; 0 when never started or over.
    pub fn trial_days_remaining(&self, now: Timestamp, policy: &SubscriptionPolicy) -> u32 {
        self.trial_started_at
            .map(|started| started.plus_days(policy.trial_days).days_until_ceil(&now))
            .unwrap_or(0)
    }

    pub fn trial_active(&self, now: Timestamp, policy: &SubscriptionPolicy) -> bool {
        self.trial_days_remaining(now, policy) > 0
    }

    pub fn has_active_subscription(&self, now: Timestamp) -> bool {
        self.paid_until.map(|until| until.is_after(&now)).unwrap_or(false)
    }

    /// Days of paid access left, rounded up.
    pub fn subscription_days_remaining(&self, now: Timestamp) -> u32 {
        self.paid_until
            .map(|until| until.days_until_ceil(&now))
            .unwrap_or(0)
    }

    /// Excluded roles never pay; everyone else pays once the trial is over
    /// and no paid period is running.
    pub fn needs_to_pay(&self, now: Timestamp, policy: &SubscriptionPolicy) -> bool {
        !policy.is_excluded(self.role.as_deref())
            && !self.trial_active(now, policy)
            && !self.has_active_subscription(now)
    }

    pub fn access_status(&self, now: Timestamp, policy: &SubscriptionPolicy) -> AccessStatus {
        AccessStatus {
            needs_to_pay: self.needs_to_pay(now, policy),
            is_excluded: policy.is_excluded(self.role.as_deref()),
            trial_active: self.trial_active(now, policy),
            trial_days_remaining: self.trial_days_remaining(now, policy),
            has_active_subscription: self.has_active_subscription(now),
            subscription_days_remaining: self.subscription_days_remaining(now),
            paid_until: self.paid_until,
            price: policy.price,
        }
    }

    /// Starts the trial if nothing else applies. Only `TrialStarted` mutates.
    pub fn start_trial(&mut self, now: Timestamp, policy: &SubscriptionPolicy) -> TrialOutcome {
        if policy.is_excluded(self.role.as_deref()) {
            return TrialOutcome::SkippedAdmin;
        }
        if self.trial_started_at.is_some() {
            return TrialOutcome::TrialAlreadyStarted;
        }
        if self.has_active_subscription(now) {
            return TrialOutcome::HasSubscription;
        }
        self.trial_started_at = Some(now);
        self.updated_at = now;
        TrialOutcome::TrialStarted
    }

    /// Refuses a new purchase while a paid period is running.
    pub fn ensure_can_purchase(&self, now: Timestamp) -> Result<(), SubscriptionError> {
        if self.has_active_subscription(now) {
            return Err(SubscriptionError::already_active(self.user_id.clone(), self.paid_until));
        }
        Ok(())
    }

    /// Extends paid access by one period from the later of now and the
    /// current end. Returns the new end.
    pub fn extend(&mut self, now: Timestamp, billing: &BillingPolicy) -> Timestamp {
        let from = self.paid_until.map(|until| until.latest(now)).unwrap_or(now);
        let until = billing.next_due(from);
        self.paid_until = Some(until);
        self.updated_at = now;
        until
    }

    /// Records that the expiry warning for the current `paid_until` went out.
    pub fn mark_warning_sent(&mut self, now: Timestamp) {
        self.warning_sent_for = self.paid_until;
        self.updated_at = now;
    }
}

impl RecurringObligation for UserAccount {
    const ENFORCEMENT: Enforcement = Enforcement::BlockAccess;

    fn due_at(&self) -> Option<Timestamp> {
        self.paid_until
    }

    fn warned(&self) -> bool {
        self.paid_until.is_some() && self.warning_sent_for == self.paid_until
    }

    fn enforced(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(role: Option<&str>) -> UserAccount {
        UserAccount::new(
            UserId::new("user-1").unwrap(),
            role.map(str::to_string),
            None,
            Timestamp::now(),
        )
    }

    #[test]
    fn excluded_roles_are_case_insensitive() {
        let policy = SubscriptionPolicy::default();
        assert!(policy.is_excluded(Some("Admin")));
        assert!(policy.is_excluded(Some("STAFF")));
        assert!(!policy.is_excluded(Some("student")));
        assert!(!policy.is_excluded(None));
    }

    #[test]
    fn new_user_without_trial_needs_to_pay() {
        let policy = SubscriptionPolicy::default();
        assert!(account(None).needs_to_pay(Timestamp::now(), &policy));
    }

    #[test]
    fn admin_never_needs_to_pay() {
        let policy = SubscriptionPolicy::default();
        assert!(!account(Some("admin")).needs_to_pay(Timestamp::now(), &policy));
    }

    #[test]
    fn trial_runs_seven_days() {
        let policy = SubscriptionPolicy::default();
        let now = Timestamp::now();
        let mut a = account(None);
        assert_eq!(a.start_trial(now, &policy), TrialOutcome::TrialStarted);
        assert_eq!(a.trial_days_remaining(now, &policy), 7);
        assert_eq!(a.trial_days_remaining(now.plus_secs(3600), &policy), 7);
        assert!(!a.needs_to_pay(now.plus_days(6), &policy));
        assert!(a.needs_to_pay(now.plus_days(7), &policy));
        assert_eq!(a.trial_days_remaining(now.plus_days(8), &policy), 0);
    }

    #[test]
    fn trial_starts_only_once() {
        let policy = SubscriptionPolicy::default();
        let now = Timestamp::now();
        let mut a = account(None);
        a.start_trial(now, &policy);
        assert_eq!(
            a.start_trial(now.plus_days(30), &policy),
            TrialOutcome::TrialAlreadyStarted
        );
        assert_eq!(a.trial_started_at, Some(now));
    }

    #[test]
    fn trial_skipped_for_admin_and_subscribers() {
        let policy = SubscriptionPolicy::default();
        let now = Timestamp::now();
        assert_eq!(
            account(Some("staff")).start_trial(now, &policy),
            TrialOutcome::SkippedAdmin
        );

        let mut subscriber = account(None);
        subscriber.paid_until = Some(now.plus_days(10));
        assert_eq!(subscriber.start_trial(now, &policy), TrialOutcome::HasSubscription);
        assert!(subscriber.trial_started_at.is_none());
    }

    #[test]
    fn extend_stacks_on_unexpired_period() {
        let policy = SubscriptionPolicy::default();
        let now = Timestamp::now();
        let mut a = account(None);
        assert_eq!(a.extend(now, &policy.billing), now.plus_days(30));
        assert_eq!(a.extend(now.plus_days(10), &policy.billing), now.plus_days(60));
    }

    #[test]
    fn extend_after_lapse_counts_from_now() {
        let policy = SubscriptionPolicy::default();
        let now = Timestamp::now();
        let mut a = account(None);
        a.paid_until = Some(now.minus_days(5));
        assert_eq!(a.extend(now, &policy.billing), now.plus_days(30));
    }

    #[test]
    fn purchase_refused_while_active() {
        let now = Timestamp::now();
        let mut a = account(None);
        a.paid_until = Some(now.plus_days(1));
        assert!(a.ensure_can_purchase(now).is_err());
        assert!(a.ensure_can_purchase(now.plus_days(2)).is_ok());
    }

    #[test]
    fn warning_is_keyed_on_paid_until() {
        let policy = SubscriptionPolicy::default();
        let now = Timestamp::now();
        let mut a = account(None);
        a.paid_until = Some(now.plus_days(2));
        assert!(a.needs_warning(now, &policy.billing));

        a.mark_warning_sent(now);
        assert!(!a.needs_warning(now, &policy.billing));

        a.extend(now, &policy.billing);
        a.paid_until = Some(now.plus_days(1));
        assert!(a.needs_warning(now, &policy.billing));
    }

    #[test]
    fn gate_is_never_enforced_by_sweep() {
        let now = Timestamp::now();
        let mut a = account(None);
        a.paid_until = Some(now.minus_days(3));
        assert!(!a.needs_enforcement(now));
        assert!(a.needs_to_pay(now, &SubscriptionPolicy::default()));
    }

    #[test]
    fn access_status_reports_days() {
        let policy = SubscriptionPolicy::default();
        let now = Timestamp::now();
        let mut a = account(None);
        a.paid_until = Some(now.plus_secs(36 * 3600));
        let status = a.access_status(now, &policy);
        assert!(!status.needs_to_pay);
        assert!(status.has_active_subscription);
        assert_eq!(status.subscription_days_remaining, 2);
        assert_eq!(status.price, 1000);
    }
}
