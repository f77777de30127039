//! Runtime manager.
//!
//! Owns the live runtime set and drives the lifecycle of every [`Runtime`]:
//!
//! ```text
//! CREATED ──create()──▶ ACTIVE ──close()──▶ CLOSED
//!                          │
//!                          └──sweep()───▶ EXPIRED
//! ```
//!
//! Terminal runtimes are removed from the live set, so [`RuntimeManager::get`]
//! never returns them. The set is a `DashMap`: create and close are linearizable per
//! id, and unrelated runtimes never contend on a single lock.
//!
//! Time comes from an injected [`mockable::Clock`] so that expiration can be tested
//! without waiting.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use mockable::{Clock, DefaultClock};
use switchyard_core::RuntimeId;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::runtime::{Runtime, RuntimeState};

/// Default inactivity window.
pub const DEFAULT_INACTIVITY: Duration = Duration::from_secs(15 * 60);

/// Shortest sweep period; shorter intervals are raised to it.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// When runtimes are reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpirationPolicy {
    /// Expire runtimes idle for strictly longer than the given duration.
    Inactivity(Duration),
    /// Runtimes live until explicitly closed.
    Explicit,
}

impl ExpirationPolicy {
    pub fn inactivity_minutes(minutes: u64) -> Self {
        Self::Inactivity(Duration::from_secs(minutes.saturating_mul(60)))
    }
}

impl Default for ExpirationPolicy {
    fn default() -> Self {
        Self::Inactivity(DEFAULT_INACTIVITY)
    }
}

/// Counters for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub live: usize,
    pub created: u64,
    pub closed: u64,
    pub expired: u64,
}

#[derive(Debug, Default)]
struct Counters {
    created: AtomicU64,
    closed: AtomicU64,
    expired: AtomicU64,
}

/// Creates, looks up, closes and expires runtimes.
pub struct RuntimeManager {
    runtimes: DashMap<RuntimeId, Arc<Runtime>>,
    policy: ExpirationPolicy,
    clock: Arc<dyn Clock + Send + Sync>,
    counters: Counters,
}

impl RuntimeManager {
    pub fn new(policy: ExpirationPolicy) -> Self {
        Self::with_clock(policy, Arc::new(DefaultClock))
    }

    pub fn with_clock(policy: ExpirationPolicy, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            runtimes: DashMap::new(),
            policy,
            clock,
            counters: Counters::default(),
        }
    }

    pub fn policy(&self) -> ExpirationPolicy {
        self.policy
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.utc()
    }

    pub(crate) fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        Arc::clone(&self.clock)
    }

    /// Starts a new runtime and adds it to the live set.
    pub fn create(&self) -> Arc<Runtime> {
        loop {
            let id = RuntimeId::new();
            if let Entry::Vacant(slot) = self.runtimes.entry(id) {
                let runtime = Arc::new(Runtime::new(id, self.now()));
                runtime.activate();
                slot.insert(Arc::clone(&runtime));
                self.counters.created.fetch_add(1, Ordering::Relaxed);
                debug!(runtime_id = %id, "Runtime created");
                return runtime;
            }
        }
    }

    /// Returns the runtime if it is still live.
    pub fn get(&self, id: RuntimeId) -> Option<Arc<Runtime>> {
        self.runtimes
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|runtime| !runtime.is_closed())
    }

    /// Records activity. Returns whether the runtime was live.
    pub fn touch(&self, id: RuntimeId) -> bool {
        let Some(runtime) = self.get(id) else {
            return false;
        };
        runtime.touch(self.now());
        trace!(runtime_id = %id, "Runtime touched");
        true
    }

    /// Closes a runtime and releases its instance scope. Idempotent.
    ///
    /// Returns `true` only for the call that actually closed it.
    pub fn close(&self, id: RuntimeId) -> bool {
        let Some((_, runtime)) = self.runtimes.remove(&id) else {
            return false;
        };
        let closed = runtime.terminate(RuntimeState::Closed);
        if closed {
            self.counters.closed.fetch_add(1, Ordering::Relaxed);
            debug!(runtime_id = %id, "Runtime closed");
        }
        closed
    }

    /// Expires every runtime idle for longer than the inactivity threshold.
    ///
    /// A no-op under [`ExpirationPolicy::Explicit`]. Returns the number of runtimes
    /// expired by this call.
    pub fn sweep(&self) -> usize {
        let ExpirationPolicy::Inactivity(threshold) = self.policy else {
            return 0;
        };
        let threshold = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
        let now = self.now();

        // Snapshot first so no shard lock is held while runtimes are terminated.
        let candidates: Vec<RuntimeId> = self
            .runtimes
            .iter()
            .filter(|entry| is_expired(entry.value().last_active_at(), now, threshold))
            .map(|entry| *entry.key())
            .collect();

        let mut expired = 0;
        for id in candidates {
            // Re-check under the entry lock: a dispatch may have touched it meanwhile.
            let removed = self.runtimes.remove_if(&id, |_, runtime| {
                is_expired(runtime.last_active_at(), now, threshold)
            });
            if let Some((_, runtime)) = removed {
                if runtime.terminate(RuntimeState::Expired) {
                    expired += 1;
                    debug!(runtime_id = %id, "Runtime expired");
                }
            }
        }

        if expired > 0 {
            self.counters
                .expired
                .fetch_add(expired as u64, Ordering::Relaxed);
            info!(expired, live = self.runtimes.len(), "Swept inactive runtimes");
        }
        expired
    }

    /// Runs [`sweep`](Self::sweep) every `interval` until `token` is cancelled.
    ///
    /// `interval` is clamped to at least [`MIN_SWEEP_INTERVAL`].
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        token: CancellationToken,
    ) -> JoinHandle<()> {
        let interval = interval.max(MIN_SWEEP_INTERVAL);
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = interval.as_secs(), policy = ?manager.policy, "Runtime sweeper started");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.sweep();
                    }
                    () = token.cancelled() => {
                        info!("Runtime sweeper stopped");
                        break;
                    }
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.runtimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runtimes.is_empty()
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            live: self.runtimes.len(),
            created: self.counters.created.load(Ordering::Relaxed),
            closed: self.counters.closed.load(Ordering::Relaxed),
            expired: self.counters.expired.load(Ordering::Relaxed),
        }
    }
}

impl Default for RuntimeManager {
    fn default() -> Self {
        Self::new(ExpirationPolicy::default())
    }
}

impl std::fmt::Debug for RuntimeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeManager")
            .field("policy", &self.policy)
            .field("live", &self.runtimes.len())
            .finish_non_exhaustive()
    }
}

/// Strict: a runtime idle for exactly `threshold` is still alive.
fn is_expired(last_active_at: DateTime<Utc>, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
    now.signed_duration_since(last_active_at) > threshold
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Local;
    use parking_lot::Mutex;

    /// A clock that only moves when told to.
    pub(crate) struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Utc::now()),
            })
        }

        pub(crate) fn advance(&self, by: TimeDelta) {
            *self.now.lock() += by;
        }
    }

    impl Clock for ManualClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    fn manager(clock: &Arc<ManualClock>) -> RuntimeManager {
        RuntimeManager::with_clock(ExpirationPolicy::inactivity_minutes(15), clock.clone())
    }

    #[test]
    fn test_inactivity_boundaries() {
        for (elapsed, alive) in [(14, true), (15, true), (16, false)] {
            let clock = ManualClock::new();
            let manager = manager(&clock);
            let runtime = manager.create();

            clock.advance(TimeDelta::minutes(elapsed));
            manager.sweep();

            assert_eq!(manager.get(runtime.id()).is_some(), alive, "after {elapsed} minutes");
            assert_eq!(runtime.is_closed(), !alive);
        }
    }

    #[test]
    fn test_touch_postpones_expiry() {
        let clock = ManualClock::new();
        let manager = manager(&clock);
        let runtime = manager.create();

        clock.advance(TimeDelta::minutes(10));
        assert!(manager.touch(runtime.id()));
        clock.advance(TimeDelta::minutes(10));
        assert_eq!(manager.sweep(), 0);

        clock.advance(TimeDelta::minutes(6));
        assert_eq!(manager.sweep(), 1);
        assert!(!manager.touch(runtime.id()));
        assert_eq!(runtime.state(), RuntimeState::Expired);
        assert_eq!(manager.stats().expired, 1);
    }

    #[test]
    fn test_explicit_policy_never_expires() {
        let clock = ManualClock::new();
        let manager = RuntimeManager::with_clock(ExpirationPolicy::Explicit, clock.clone());
        let runtime = manager.create();
        clock.advance(TimeDelta::days(30));
        assert_eq!(manager.sweep(), 0);
        assert!(manager.get(runtime.id()).is_some());
    }

    #[test]
    fn test_close_is_idempotent() {
        let manager = RuntimeManager::default();
        let runtime = manager.create();
        assert_eq!(runtime.state(), RuntimeState::Active);

        assert!(manager.close(runtime.id()));
        assert!(!manager.close(runtime.id()));
        assert!(manager.get(runtime.id()).is_none());
        assert_eq!(runtime.state(), RuntimeState::Closed);

        let stats = manager.stats();
        assert_eq!((stats.live, stats.created, stats.closed), (0, 1, 1));
    }

    #[test]
    fn test_ids_are_unique() {
        let manager = RuntimeManager::default();
        let ids: std::collections::HashSet<_> = (0..256).map(|_| manager.create().id()).collect();
        assert_eq!(ids.len(), 256);
        assert_eq!(manager.len(), 256);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_until_cancelled() {
        let clock = ManualClock::new();
        let manager = Arc::new(manager(&clock));
        let runtime = manager.create();
        let token = CancellationToken::new();
        let handle = manager.spawn_sweeper(Duration::from_secs(60), token.clone());

        clock.advance(TimeDelta::minutes(16));
        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(manager.get(runtime.id()).is_none());

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_sweep_interval_is_clamped() {
        let clock = ManualClock::new();
        let manager = Arc::new(manager(&clock));
        let runtime = manager.create();
        let token = CancellationToken::new();
        let handle = manager.spawn_sweeper(Duration::ZERO, token.clone());

        clock.advance(TimeDelta::minutes(16));
        tokio::time::sleep(MIN_SWEEP_INTERVAL * 2).await;
        assert!(runtime.is_closed());

        token.cancel();
        handle.await.unwrap();
    }
}
