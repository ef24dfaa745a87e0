//! Fixed-window admission gate keyed by client address.
//!
//! Every login submission must obtain a permit before it may reach credential
//! checking. Each partition key gets `permit_limit` permits per window; the
//! window starts with the first request after the previous one elapsed. There
//! is no queue: requests over the limit are rejected immediately.
//!
//! # Example
//!
//! ```rust
//! use wicket_core::services::{AdmissionConfig, AdmissionDecision, WindowedAdmission};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let admission = WindowedAdmission::new(AdmissionConfig::default());
//!
//! assert!(admission.admit("ip:10.0.0.1").is_allowed());
//! assert!(admission.admit("ip:10.0.0.1").is_allowed());
//! assert!(matches!(
//!     admission.admit("ip:10.0.0.1"),
//!     AdmissionDecision::Rejected { .. }
//! ));
//! # }
//! ```

use std::{net::IpAddr, sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::time::Instant;

/// Partition key shared by every caller whose address could not be determined.
pub const UNKNOWN_PARTITION: &str = "ip:unknown";

/// Derive the admission partition key for a client address.
///
/// IPv4-mapped IPv6 addresses collapse to their IPv4 form so that a dual-stack
/// listener does not give one client two buckets.
pub fn partition_key(ip: Option<IpAddr>) -> String {
    match ip {
        Some(ip) => format!("ip:{}", ip.to_canonical()),
        None => UNKNOWN_PARTITION.to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdmissionConfig {
    /// Permits per window. Zero disables the gate.
    pub permit_limit: u32,
    pub window: Duration,
    /// How often the background task drops elapsed windows
    pub cleanup_interval: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            permit_limit: 2,
            window: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(300),
        }
    }
}

impl AdmissionConfig {
    /// A configuration that admits everything.
    pub fn disabled() -> Self {
        Self {
            permit_limit: 0,
            ..Default::default()
        }
    }

    pub fn with_permit_limit(mut self, permit_limit: u32) -> Self {
        self.permit_limit = permit_limit;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.permit_limit > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionDecision {
    /// Permit granted. `remaining` is what is left in the current window,
    /// `u32::MAX` when the gate is disabled.
    Allowed { remaining: u32 },
    /// No permit left; `retry_after` is the time until the window rolls over.
    Rejected { retry_after: Option<Duration> },
}

impl AdmissionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionDecision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started_at: Instant,
    permits: u32,
}

impl WindowState {
    fn is_elapsed(&self, window: Duration, now: Instant) -> bool {
        now.duration_since(self.started_at) >= window
    }
}

/// Per-key fixed-window limiter.
///
/// Cloning is cheap and clones share the same window map.
#[derive(Clone)]
pub struct WindowedAdmission {
    config: AdmissionConfig,
    windows: Arc<DashMap<String, WindowState>>,
}

impl WindowedAdmission {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            config,
            windows: Arc::new(DashMap::new()),
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Try to take a permit for `partition_key`.
    pub fn admit(&self, partition_key: &str) -> AdmissionDecision {
        if !self.config.is_enabled() {
            return AdmissionDecision::Allowed {
                remaining: u32::MAX,
            };
        }

        let now = Instant::now();
        let limit = self.config.permit_limit;

        // The entry guard holds the shard lock for the whole transition.
        let mut state = self
            .windows
            .entry(partition_key.to_string())
            .or_insert(WindowState {
                started_at: now,
                permits: 0,
            });

        if state.is_elapsed(self.config.window, now) {
            state.started_at = now;
            state.permits = 0;
        }

        if state.permits < limit {
            state.permits += 1;
            let remaining = limit - state.permits;
            tracing::debug!(partition_key, remaining, "Admission granted");
            AdmissionDecision::Allowed { remaining }
        } else {
            let retry_after = self
                .config
                .window
                .checked_sub(now.duration_since(state.started_at));
            tracing::debug!(
                partition_key,
                retry_after_secs = ?retry_after.map(|d| d.as_secs()),
                "Admission rejected"
            );
            AdmissionDecision::Rejected { retry_after }
        }
    }

    /// Remove every window that has fully elapsed. Returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let window = self.config.window;
        let before = self.windows.len();
        self.windows.retain(|_, state| !state.is_elapsed(window, now));
        before.saturating_sub(self.windows.len())
    }

    /// Number of partition keys currently holding a window
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    /// Start the background eviction task.
    ///
    /// Runs [`WindowedAdmission::evict_expired`] every `cleanup_interval` until
    /// `shutdown` changes.
    pub fn start_cleanup_task(
        &self,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let admission = self.clone();
        let period = self.config.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let count = admission.evict_expired();
                        if count > 0 {
                            tracing::debug!(count, "Evicted elapsed admission windows");
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("Shutting down admission cleanup task");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_third_request_in_window_is_rejected() {
        let admission = WindowedAdmission::new(AdmissionConfig::default());

        assert_eq!(
            admission.admit("ip:10.0.0.1"),
            AdmissionDecision::Allowed { remaining: 1 }
        );
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(
            admission.admit("ip:10.0.0.1"),
            AdmissionDecision::Allowed { remaining: 0 }
        );

        tokio::time::advance(Duration::from_secs(5)).await;
        let decision = admission.admit("ip:10.0.0.1");
        assert_eq!(
            decision,
            AdmissionDecision::Rejected {
                retry_after: Some(Duration::from_secs(45))
            }
        );

        // Rejections do not extend the window.
        tokio::time::advance(Duration::from_secs(44)).await;
        assert!(!admission.admit("ip:10.0.0.1").is_allowed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_rolls_over() {
        let admission = WindowedAdmission::new(AdmissionConfig::default());
        admission.admit("ip:10.0.0.1");
        admission.admit("ip:10.0.0.1");
        assert!(!admission.admit("ip:10.0.0.1").is_allowed());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(
            admission.admit("ip:10.0.0.1"),
            AdmissionDecision::Allowed { remaining: 1 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let admission = WindowedAdmission::new(AdmissionConfig::default());
        admission.admit("ip:10.0.0.1");
        admission.admit("ip:10.0.0.1");

        assert!(!admission.admit("ip:10.0.0.1").is_allowed());
        assert!(admission.admit("ip:10.0.0.2").is_allowed());
        assert_eq!(admission.tracked_keys(), 2);
    }

    #[tokio::test]
    async fn test_disabled_admits_everything() {
        let admission = WindowedAdmission::new(AdmissionConfig::disabled());
        for _ in 0..10 {
            assert!(admission.admit(UNKNOWN_PARTITION).is_allowed());
        }
        assert_eq!(admission.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired_keeps_live_windows() {
        let admission = WindowedAdmission::new(AdmissionConfig::default());
        admission.admit("ip:10.0.0.1");
        tokio::time::advance(Duration::from_secs(30)).await;
        admission.admit("ip:10.0.0.2");
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(admission.evict_expired(), 1);
        assert_eq!(admission.tracked_keys(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_evicts_and_stops() {
        let admission = WindowedAdmission::new(
            AdmissionConfig::default().with_cleanup_interval(Duration::from_secs(30)),
        );
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let handle = admission.start_cleanup_task(shutdown_rx);

        admission.admit("ip:10.0.0.1");
        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(admission.tracked_keys(), 0);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_exceed_limit() {
        let admission = WindowedAdmission::new(AdmissionConfig::default());
        let granted = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..64 {
            let admission = admission.clone();
            let granted = granted.clone();
            handles.push(tokio::spawn(async move {
                if admission.admit("ip:10.0.0.1").is_allowed() {
                    granted.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(granted.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_partition_key() {
        let v4 = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(partition_key(Some(v4)), "ip:10.0.0.1");

        let mapped = IpAddr::V6(Ipv4Addr::new(10, 0, 0, 1).to_ipv6_mapped());
        assert_eq!(partition_key(Some(mapped)), "ip:10.0.0.1");

        let v6 = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        assert_eq!(partition_key(Some(v6)), "ip:2001:db8::1");

        assert_eq!(partition_key(None), "ip:unknown");
    }
}
