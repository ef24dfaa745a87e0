//! Account-based lockout.
//!
//! The ledger tracks failed sign-in attempts per account identity and blocks
//! further attempts once `max_failed_attempts` consecutive failures have been
//! recorded within `block_duration` of each other.
//!
//! # Features
//!
//! - Lazy expiry: the check that finds a block elapsed also resets the count
//! - Success resets the count immediately
//! - Background eviction of records nobody has touched for `retention`
//!
//! # Example
//!
//! ```rust
//! use wicket_core::services::{AttemptLedger, LockoutConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let ledger = AttemptLedger::new(LockoutConfig::default());
//!
//! for _ in 0..5 {
//!     ledger.record_attempt("user@example.com", false);
//! }
//! assert!(ledger.is_blocked("user@example.com"));
//! # }
//! ```

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::time::Instant;

use crate::validation::normalize_identity_key;

#[derive(Debug, Clone, Copy)]
pub struct LockoutConfig {
    /// Whether lockout is enforced at all
    pub enabled: bool,
    /// Consecutive failures before the account is blocked
    pub max_failed_attempts: u32,
    /// How long a block lasts after the last attempt
    pub block_duration: Duration,
    /// Untouched records older than this are evicted by the cleanup task
    pub retention: Duration,
    pub cleanup_interval: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_attempts: 5,
            block_duration: Duration::from_secs(30),
            retention: Duration::from_secs(600),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

impl LockoutConfig {
    /// Ledger that records nothing and never blocks.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Lockout is only enforced with a threshold of at least one failure.
    pub fn is_enabled(&self) -> bool {
        self.enabled && self.max_failed_attempts > 0
    }

    pub fn with_max_failed_attempts(mut self, max: u32) -> Self {
        self.max_failed_attempts = max;
        self
    }

    pub fn with_block_duration(mut self, duration: Duration) -> Self {
        self.block_duration = duration;
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct AttemptRecord {
    failures: u32,
    last_attempt: Instant,
}

/// Concurrent per-account failure counter.
///
/// Every transition on one key runs under that key's map entry lock, so two
/// simultaneous failures never both increment from the same stale count.
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct AttemptLedger {
    config: LockoutConfig,
    records: Arc<DashMap<String, AttemptRecord>>,
}

impl AttemptLedger {
    pub fn new(config: LockoutConfig) -> Self {
        Self {
            config,
            records: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.is_enabled()
    }

    /// Whether `identity` is currently blocked.
    ///
    /// A record whose last attempt is at least `block_duration` old has its
    /// failure count reset by this call.
    pub fn is_blocked(&self, identity: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }

        let key = normalize_identity_key(identity);
        let Some(mut record) = self.records.get_mut(&key) else {
            return false;
        };

        if record.last_attempt.elapsed() >= self.config.block_duration {
            record.failures = 0;
            return false;
        }

        record.failures >= self.config.max_failed_attempts
    }

    /// Record the outcome of an attempt and return the failure count afterwards.
    pub fn record_attempt(&self, identity: &str, success: bool) -> u32 {
        if !self.is_enabled() {
            return 0;
        }

        let now = Instant::now();
        let mut record = self
            .records
            .entry(normalize_identity_key(identity))
            .or_insert(AttemptRecord {
                failures: 0,
                last_attempt: now,
            });

        if success || now.duration_since(record.last_attempt) >= self.config.block_duration {
            record.failures = 0;
        }
        if !success {
            record.failures = record.failures.saturating_add(1);
        }
        record.last_attempt = now;

        record.failures
    }

    /// Failures currently counted against `identity`, without side effects.
    pub fn failure_count(&self, identity: &str) -> u32 {
        self.records
            .get(&normalize_identity_key(identity))
            .filter(|r| r.last_attempt.elapsed() < self.config.block_duration)
            .map_or(0, |r| r.failures)
    }

    /// Time left on the block for `identity`, if it is blocked.
    pub fn retry_after(&self, identity: &str) -> Option<Duration> {
        if !self.is_enabled() {
            return None;
        }

        let record = self.records.get(&normalize_identity_key(identity))?;
        if record.failures < self.config.max_failed_attempts {
            return None;
        }
        self.config
            .block_duration
            .checked_sub(record.last_attempt.elapsed())
            .filter(|d| !d.is_zero())
    }

    /// Drop records with no attempt in the last `retention`.
    ///
    /// Retention shorter than the block duration is raised to it, so an
    /// active block is never evicted.
    pub fn evict_stale(&self, retention: Duration) -> usize {
        let retention = retention.max(self.config.block_duration);
        let before = self.records.len();
        self.records
            .retain(|_, record| record.last_attempt.elapsed() < retention);
        before.saturating_sub(self.records.len())
    }

    /// Number of identities with a record
    pub fn tracked_identities(&self) -> usize {
        self.records.len()
    }

    /// Start the background eviction task.
    ///
    /// This spawns a task that runs [`AttemptLedger::evict_stale`] with the
    /// configured retention every `cleanup_interval`, until `shutdown` changes.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let ledger = self.clone();
        let period = self.config.cleanup_interval;
        let retention = self.config.retention;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let count = ledger.evict_stale(retention);
                        if count > 0 {
                            tracing::info!(count, "Evicted stale login attempt records");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down attempt ledger cleanup task");
                        break;
                    }
                }
            }
        })
    }
}
