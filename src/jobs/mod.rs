//! Background jobs.
//!
//! Requires the `background-jobs` feature to be enabled.
//!
//! # Available Jobs
//!
//! - **Policy Expiration**: every `expiration_check_interval` (default 10 minutes)
//!   logs policies whose end date was reached within the last
//!   `expiration_window` (default 1 hour). Each policy is logged once per process.
//!
//! # Usage
//!
//! ```rust,ignore
//! use car_insurance::clock::SystemClock;
//! use car_insurance::jobs::{JobConfig, PolicyExpirationJob};
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let job = PolicyExpirationJob::new(db, SystemClock, &JobConfig::default())?;
//! let handle = job.spawn(token.clone());
//! // ... on shutdown
//! token.cancel();
//! handle.await??;
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::clock::Clock;
use crate::config::JobsConfig;
use crate::errors::{InsuranceError, InsuranceResult};
use crate::server::database::{Database, DbScope};
use crate::server::models::InsurancePolicy;

mod policy_expiration;

pub use policy_expiration::{
    expiration_instant, expiration_message, PolicyExpirationNotifier, PolicyStore,
};

/// Configuration for background jobs.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Time between policy expiration checks (default: 10 minutes)
    pub expiration_check_interval: Duration,
    /// How far back an expiration is still reported (default: 1 hour)
    pub expiration_window: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            expiration_check_interval: Duration::from_secs(10 * 60),
            expiration_window: Duration::from_secs(60 * 60),
        }
    }
}

impl JobConfig {
    pub fn from_config(config: &JobsConfig) -> Self {
        Self {
            expiration_check_interval: Duration::from_secs(config.expiration_check_interval_secs),
            expiration_window: Duration::from_secs(config.expiration_window_secs),
        }
    }
}

/// Hands out a fresh store scope for each unit of work.
///
/// The scope is released when dropped.
#[async_trait]
pub trait PolicyStoreSource: Send + Sync {
    type Scope: PolicyStore;

    async fn open_scope(&self) -> InsuranceResult<Self::Scope>;
}

#[async_trait]
impl PolicyStoreSource for Database {
    type Scope = DbScope;

    async fn open_scope(&self) -> InsuranceResult<DbScope> {
        self.acquire().await
    }
}

#[async_trait]
impl<T: PolicyStoreSource + ?Sized> PolicyStoreSource for Arc<T> {
    type Scope = T::Scope;

    async fn open_scope(&self) -> InsuranceResult<Self::Scope> {
        (**self).open_scope().await
    }
}

/// Recurring policy expiration check.
///
/// Lifecycle is `Running -> Stopped`: the loop stops when the cancellation
/// token fires or an iteration fails. Cancellation is observed before each
/// iteration and while waiting between iterations; an iteration already
/// running is not interrupted.
pub struct PolicyExpirationJob<S, C> {
    source: S,
    notifier: PolicyExpirationNotifier<C>,
    interval: Duration,
}

impl<S, C> PolicyExpirationJob<S, C>
where
    S: PolicyStoreSource,
    C: Clock,
{
    /// Fails when the configured window does not fit a `chrono::Duration`.
    pub fn new(source: S, clock: C, config: &JobConfig) -> Result<Self, JobError> {
        let window = chrono::Duration::from_std(config.expiration_window).map_err(|e| {
            JobError::ExecutionError(format!(
                "expiration window {:?} out of range: {e}",
                config.expiration_window
            ))
        })?;

        Ok(Self {
            source,
            notifier: PolicyExpirationNotifier::with_window(clock, window),
            interval: config.expiration_check_interval,
        })
    }

    pub fn notifier(&self) -> &PolicyExpirationNotifier<C> {
        &self.notifier
    }

    /// Run a single check with a freshly opened scope.
    ///
    /// Useful for manual triggers and tests.
    pub async fn run_once(&mut self) -> Result<Vec<InsurancePolicy>, JobError> {
        let mut scope = self.source.open_scope().await?;
        self.notifier.check(&mut scope).await
    }

    /// Run checks every `interval` until `token` is cancelled.
    ///
    /// Returns the first iteration error; there is no retry.
    pub async fn run_until_cancelled(mut self, token: CancellationToken) -> Result<(), JobError> {
        info!(
            "Policy expiration job started (interval: {:?}, window: {})",
            self.interval,
            self.notifier.window()
        );

        loop {
            if token.is_cancelled() {
                break;
            }

            let expired = self.run_once().await?;
            if !expired.is_empty() {
                info!("Policy expiration check: {} policies expired", expired.len());
            }

            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Policy expiration job stopped");
        Ok(())
    }
}

impl<S, C> PolicyExpirationJob<S, C>
where
    S: PolicyStoreSource + 'static,
    C: Clock + 'static,
{
    /// Spawn the loop onto the tokio runtime.
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<Result<(), JobError>> {
        tokio::spawn(async move {
            let result = self.run_until_cancelled(token).await;
            if let Err(e) = &result {
                error!("Policy expiration job failed: {}", e);
            }
            result
        })
    }
}

/// Errors that can occur in background jobs.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Job execution error: {0}")]
    ExecutionError(String),
}

impl From<InsuranceError> for JobError {
    fn from(err: InsuranceError) -> Self {
        match err {
            InsuranceError::DatabaseError(msg) => JobError::DatabaseError(msg),
            other => JobError::ExecutionError(other.to_string()),
        }
    }
}
