//! Policy expiration notifier.
//!
//! On every check the notifier asks the store for policies whose end date has
//! been reached, keeps those whose end instant (midnight of the end date) lies
//! in `[now - window, now]`, and logs each one exactly once for the lifetime of
//! the notifier.
//!
//! The set of reported ids lives in memory only. After a restart a policy whose
//! end instant is still inside the window is logged again.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::errors::InsuranceResult;
use crate::server::database::DbScope;
use crate::server::models::InsurancePolicy;

use super::JobError;

/// Read-only view of policies, as needed by the notifier.
#[async_trait]
pub trait PolicyStore: Send {
    /// All policies whose end date is on or before `date`.
    async fn policies_ending_on_or_before(
        &mut self,
        date: NaiveDate,
    ) -> InsuranceResult<Vec<InsurancePolicy>>;
}

#[async_trait]
impl PolicyStore for DbScope {
    async fn policies_ending_on_or_before(
        &mut self,
        date: NaiveDate,
    ) -> InsuranceResult<Vec<InsurancePolicy>> {
        DbScope::policies_ending_on_or_before(self, date).await
    }
}

/// Log line emitted for a newly expired policy.
pub fn expiration_message(policy: &InsurancePolicy) -> String {
    format!(
        "Policy with ID {} for Car ID {} expired on {}.",
        policy.id, policy.car_id, policy.end_date
    )
}

/// Instant at which a policy is considered expired: midnight of its end date.
pub fn expiration_instant(policy: &InsurancePolicy) -> NaiveDateTime {
    policy.end_date.and_time(NaiveTime::MIN)
}

/// Reports each policy once, when its expiration instant enters the window.
pub struct PolicyExpirationNotifier<C> {
    clock: C,
    window: Duration,
    reported: HashSet<i64>,
}

impl<C: Clock> PolicyExpirationNotifier<C> {
    /// Notifier with the default one-hour window.
    pub fn new(clock: C) -> Self {
        Self::with_window(clock, Duration::hours(1))
    }

    pub fn with_window(clock: C, window: Duration) -> Self {
        Self {
            clock,
            window,
            reported: HashSet::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether this policy id has already been reported.
    pub fn is_reported(&self, policy_id: i64) -> bool {
        self.reported.contains(&policy_id)
    }

    pub fn reported_count(&self) -> usize {
        self.reported.len()
    }

    /// Run one expiration check against `store`.
    ///
    /// Logs one line per newly expired policy, in store order, and returns
    /// those policies. Store failures are returned unchanged; nothing is
    /// marked as reported in that case. A window reaching before the earliest
    /// representable instant fails the check.
    pub async fn check<S>(&mut self, store: &mut S) -> Result<Vec<InsurancePolicy>, JobError>
    where
        S: PolicyStore + ?Sized,
    {
        let now = self.clock.now();
        let window_start = now.checked_sub_signed(self.window).ok_or_else(|| {
            JobError::ExecutionError(format!(
                "expiration window {} reaches past the earliest representable instant",
                self.window
            ))
        })?;

        debug!("Checking for expired policies at {}", now);

        // Midnight of end_date <= now  <=>  end_date <= now.date()
        let candidates = store.policies_ending_on_or_before(now.date()).await?;

        let mut newly_expired = Vec::new();

        for policy in candidates {
            let expired_at = expiration_instant(&policy);
            if expired_at > now || expired_at < window_start {
                continue;
            }
            if !self.reported.insert(policy.id) {
                continue;
            }

            info!("{}", expiration_message(&policy));
            newly_expired.push(policy);
        }

        Ok(newly_expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::errors::InsuranceError;

    /// In-memory store that applies the same pre-filter as the database.
    struct VecStore {
        policies: Vec<InsurancePolicy>,
        queries: usize,
    }

    impl VecStore {
        fn new(policies: Vec<InsurancePolicy>) -> Self {
            Self {
                policies,
                queries: 0,
            }
        }
    }

    #[async_trait]
    impl PolicyStore for VecStore {
        async fn policies_ending_on_or_before(
            &mut self,
            date: NaiveDate,
        ) -> InsuranceResult<Vec<InsurancePolicy>> {
            self.queries += 1;
            Ok(self
                .policies
                .iter()
                .filter(|p| p.end_date <= date)
                .cloned()
                .collect())
        }
    }

    struct FailingStore;

    #[async_trait]
    impl PolicyStore for FailingStore {
        async fn policies_ending_on_or_before(
            &mut self,
            _date: NaiveDate,
        ) -> InsuranceResult<Vec<InsurancePolicy>> {
            Err(InsuranceError::DatabaseError("connection reset".to_string()))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, min: u32, s: u32) -> NaiveDateTime {
        d.and_hms_opt(h, min, s).unwrap()
    }

    fn policy(id: i64, car_id: i64, end_date: NaiveDate) -> InsurancePolicy {
        InsurancePolicy {
            id,
            car_id,
            provider: "Test".to_string(),
            start_date: date(2025, 1, 1),
            end_date,
        }
    }

    #[test]
    fn message_format() {
        let p = policy(7, 3, date(2025, 8, 29));
        assert_eq!(
            expiration_message(&p),
            "Policy with ID 7 for Car ID 3 expired on 2025-08-29."
        );
    }

    #[tokio::test]
    async fn reports_policy_one_second_after_midnight() {
        let end = date(2025, 8, 29);
        let mut notifier = PolicyExpirationNotifier::new(FixedClock::new(at(end, 0, 0, 1)));
        let mut store = VecStore::new(vec![policy(1, 1, end)]);

        let expired = notifier.check(&mut store).await.unwrap();

        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, 1);
        assert!(notifier.is_reported(1));
    }

    #[tokio::test]
    async fn window_boundaries_are_inclusive() {
        let end = date(2025, 8, 29);

        // Exactly at now.
        let mut at_now = PolicyExpirationNotifier::new(FixedClock::new(at(end, 0, 0, 0)));
        let mut store = VecStore::new(vec![policy(1, 1, end)]);
        assert_eq!(at_now.check(&mut store).await.unwrap().len(), 1);

        // Exactly at now - 1h.
        let mut at_edge = PolicyExpirationNotifier::new(FixedClock::new(at(end, 1, 0, 0)));
        let mut store = VecStore::new(vec![policy(1, 1, end)]);
        assert_eq!(at_edge.check(&mut store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ignores_policies_outside_window() {
        let end = date(2025, 8, 29);
        let mut store = VecStore::new(vec![
            policy(1, 1, end),
            policy(2, 1, date(2025, 8, 28)),
            policy(3, 1, date(2025, 8, 30)),
        ]);

        // One second past the window for policy 1.
        let mut notifier = PolicyExpirationNotifier::new(FixedClock::new(at(end, 1, 0, 1)));
        let expired = notifier.check(&mut store).await.unwrap();

        assert!(expired.is_empty());
        assert_eq!(notifier.reported_count(), 0);
    }

    #[tokio::test]
    async fn future_policy_is_not_reported() {
        let clock = FixedClock::new(at(date(2025, 8, 28), 23, 59, 59));
        let mut notifier = PolicyExpirationNotifier::new(clock);
        let mut store = VecStore::new(vec![policy(1, 1, date(2025, 8, 29))]);

        assert!(notifier.check(&mut store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn repeated_checks_report_once() {
        let end = date(2025, 8, 29);
        let mut notifier = PolicyExpirationNotifier::new(FixedClock::new(at(end, 0, 0, 0)));
        let mut store = VecStore::new(vec![policy(1, 1, end), policy(2, 2, end)]);

        let first = notifier.check(&mut store).await.unwrap();
        let second = notifier.check(&mut store).await.unwrap();

        notifier.clock().advance(Duration::minutes(30));
        let third = notifier.check(&mut store).await.unwrap();

        notifier.clock().set(at(end, 1, 0, 0));
        let fourth = notifier.check(&mut store).await.unwrap();

        assert_eq!(first.len(), 2);
        assert!(second.is_empty());
        assert!(third.is_empty());
        assert!(fourth.is_empty());
        assert_eq!(notifier.reported_count(), 2);
        assert_eq!(store.queries, 4);
    }

    #[tokio::test]
    async fn policy_entering_window_later_is_reported_then() {
        let mut notifier =
            PolicyExpirationNotifier::new(FixedClock::new(at(date(2025, 8, 28), 23, 50, 0)));
        let mut store = VecStore::new(vec![policy(5, 9, date(2025, 8, 29))]);

        assert!(notifier.check(&mut store).await.unwrap().is_empty());

        notifier.clock().advance(Duration::minutes(10));
        let expired = notifier.check(&mut store).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].car_id, 9);
    }

    #[tokio::test]
    async fn empty_store_reports_nothing() {
        let mut notifier =
            PolicyExpirationNotifier::new(FixedClock::new(at(date(2025, 8, 29), 0, 0, 1)));
        let mut store = VecStore::new(Vec::new());

        assert!(notifier.check(&mut store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn custom_window_widens_reporting() {
        let end = date(2025, 8, 29);
        let clock = FixedClock::new(at(end, 5, 0, 0));
        let mut notifier = PolicyExpirationNotifier::with_window(clock, Duration::hours(6));
        let mut store = VecStore::new(vec![policy(1, 1, end)]);

        assert_eq!(notifier.check(&mut store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn oversized_window_is_an_error() {
        let clock = FixedClock::new(at(date(2025, 8, 29), 0, 0, 1));
        let mut notifier =
            PolicyExpirationNotifier::with_window(clock, Duration::seconds(100_000_000_000_000));
        let mut store = VecStore::new(vec![policy(1, 1, date(2025, 8, 29))]);

        let err = notifier.check(&mut store).await.unwrap_err();

        assert!(matches!(err, JobError::ExecutionError(_)));
        assert_eq!(store.queries, 0);
        assert_eq!(notifier.reported_count(), 0);
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let mut notifier =
            PolicyExpirationNotifier::new(FixedClock::new(at(date(2025, 8, 29), 0, 0, 1)));

        let err = notifier.check(&mut FailingStore).await.unwrap_err();

        assert!(matches!(err, JobError::DatabaseError(_)));
        assert_eq!(notifier.reported_count(), 0);
    }
}
