//! Concurrent lease registry with eviction and self-preservation

use crate::config::RegistryConfig;
use crate::error::Result;
use crate::lease::Lease;
use crate::recent_changes::RecentChangeQueue;
use beacon_types::{ActionType, Applications, DeltaEntry, InstanceId, InstanceRecord, InstanceStatus};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rand::seq::SliceRandom;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Capacity of the mutation broadcast feeding the peer replicator
const MUTATION_CHANNEL_CAPACITY: usize = 4096;

/// Outcome of a registry write.
///
/// `StaleWrite` means the incoming dirty timestamp was older than the stored
/// one; the write was ignored but this is not an error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    NotFound,
    StaleWrite,
}

/// A local mutation announced to replication.
///
/// Only writes applied with `is_replication = false` are announced, so a
/// replication-received write is never fanned out again.
#[derive(Debug, Clone)]
pub enum RegistryMutation {
    Register {
        record: InstanceRecord,
        lease_duration_secs: u64,
    },
    Renew {
        app_name: String,
        instance_id: InstanceId,
    },
    Cancel {
        app_name: String,
        instance_id: InstanceId,
    },
    StatusUpdate {
        record: InstanceRecord,
    },
}

/// Result of one eviction sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionSweep {
    /// Leases found expired at sweep time
    pub expired: usize,
    /// Leases actually evicted this cycle
    pub evicted: usize,
    /// Whether self-preservation suppressed the sweep
    pub self_preservation_active: bool,
}

/// The authoritative instance store of one registry node.
///
/// Two-level mapping of application name → instance id → lease. Per-key
/// mutations are atomic; cross-key reads (snapshot, sweep) see a
/// consistent-enough point-in-time view without a global lock.
pub struct LeaseRegistry {
    config: RegistryConfig,
    apps: DashMap<String, HashMap<InstanceId, Lease>>,
    recent_changes: Mutex<RecentChangeQueue>,
    registered_count: AtomicUsize,
    /// Minimum count of live leases below which eviction is suspended.
    /// Recomputed whenever the registered count changes.
    renewal_threshold: AtomicU64,
    below_threshold: AtomicBool,
    /// Bumped on every change that affects the full snapshot; lets the
    /// response cache recompute only when something actually changed.
    generation: AtomicU64,
    mutation_tx: broadcast::Sender<RegistryMutation>,
}

impl LeaseRegistry {
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let (mutation_tx, _) = broadcast::channel(MUTATION_CHANNEL_CAPACITY);
        let retention = config.delta_retention_secs;

        Ok(Self {
            config,
            apps: DashMap::new(),
            recent_changes: Mutex::new(RecentChangeQueue::new(retention)),
            registered_count: AtomicUsize::new(0),
            renewal_threshold: AtomicU64::new(1),
            below_threshold: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            mutation_tx,
        })
    }

    /// Subscribe to locally applied mutations (used by the peer replicator).
    pub fn subscribe_mutations(&self) -> broadcast::Receiver<RegistryMutation> {
        self.mutation_tx.subscribe()
    }

    /// Insert or overwrite the lease for (application, instance id).
    ///
    /// Last-writer-wins by dirty timestamp: a strictly older incoming record
    /// is ignored, an equal one is applied without resetting the renewal
    /// timestamp, a newer one replaces the record and renews the lease.
    pub fn register(
        &self,
        record: InstanceRecord,
        lease_duration_secs: Option<u64>,
        is_replication: bool,
    ) -> WriteOutcome {
        let now = Utc::now();
        let duration = lease_duration_secs
            .or(record.lease_duration_secs)
            .unwrap_or(self.config.default_lease_duration_secs);

        let mut fresh = false;
        {
            let mut app = self.apps.entry(record.app_name.clone()).or_default();
            match app.get_mut(&record.instance_id) {
                Some(lease) => {
                    let stored_ts = lease.record().dirty_timestamp;
                    if record.dirty_timestamp < stored_ts {
                        debug!(
                            app_name = %record.app_name,
                            instance_id = %record.instance_id,
                            incoming = record.dirty_timestamp,
                            stored = stored_ts,
                            "Ignoring stale re-registration"
                        );
                        return WriteOutcome::StaleWrite;
                    }
                    let newer = record.dirty_timestamp > stored_ts;
                    lease.set_record(record.clone());
                    if newer {
                        lease.set_duration(duration);
                        lease.renew(now);
                    }
                }
                None => {
                    app.insert(
                        record.instance_id.clone(),
                        Lease::new(record.clone(), duration, now),
                    );
                    fresh = true;
                }
            }
        }

        if fresh {
            let count = self.registered_count.fetch_add(1, Ordering::SeqCst) + 1;
            self.update_renewal_threshold(count);
        }

        self.enqueue_change(record.clone(), ActionType::Added, now);
        self.generation.fetch_add(1, Ordering::SeqCst);

        info!(
            app_name = %record.app_name,
            instance_id = %record.instance_id,
            status = %record.status,
            is_replication,
            "Registered instance"
        );

        if !is_replication {
            let _ = self.mutation_tx.send(RegistryMutation::Register {
                record,
                lease_duration_secs: duration,
            });
        }

        WriteOutcome::Applied
    }

    /// Renew the lease for an instance.
    ///
    /// Returns `NotFound` if no lease exists; the caller decides whether to
    /// fall back to a fresh registration. A renewal never produces a
    /// recent-change entry.
    pub fn renew(&self, app_name: &str, instance_id: &InstanceId, is_replication: bool) -> WriteOutcome {
        let now = Utc::now();

        let found = match self.apps.get_mut(app_name) {
            Some(mut app) => match app.get_mut(instance_id) {
                Some(lease) => {
                    lease.renew(now);
                    true
                }
                None => false,
            },
            None => false,
        };

        if !found {
            debug!(app_name, instance_id = %instance_id, "Renewal for unknown lease");
            return WriteOutcome::NotFound;
        }

        if !is_replication {
            let _ = self.mutation_tx.send(RegistryMutation::Renew {
                app_name: app_name.to_string(),
                instance_id: instance_id.clone(),
            });
        }

        WriteOutcome::Applied
    }

    /// Remove the lease for an instance.
    ///
    /// Idempotent: cancelling an absent lease returns `NotFound`, which
    /// callers treat as already satisfied.
    pub fn cancel(&self, app_name: &str, instance_id: &InstanceId, is_replication: bool) -> WriteOutcome {
        let now = Utc::now();

        let removed = match self.apps.get_mut(app_name) {
            Some(mut app) => app.remove(instance_id),
            None => None,
        };

        let Some(mut lease) = removed else {
            return WriteOutcome::NotFound;
        };
        lease.evict(now);
        self.drop_app_if_empty(app_name);

        let count = self.registered_count.fetch_sub(1, Ordering::SeqCst) - 1;
        self.update_renewal_threshold(count);

        self.enqueue_change(lease.record().clone(), ActionType::Deleted, now);
        self.generation.fetch_add(1, Ordering::SeqCst);

        info!(app_name, instance_id = %instance_id, is_replication, "Cancelled lease");

        if !is_replication {
            let _ = self.mutation_tx.send(RegistryMutation::Cancel {
                app_name: app_name.to_string(),
                instance_id: instance_id.clone(),
            });
        }

        WriteOutcome::Applied
    }

    /// Update the status of a registered instance in place.
    ///
    /// Conflict-resolved by dirty timestamp: an equal-or-newer incoming
    /// timestamp wins, a strictly older one is ignored.
    pub fn status_update(
        &self,
        app_name: &str,
        instance_id: &InstanceId,
        status: InstanceStatus,
        dirty_timestamp: i64,
        is_replication: bool,
    ) -> WriteOutcome {
        let now = Utc::now();

        let updated = {
            let Some(mut app) = self.apps.get_mut(app_name) else {
                return WriteOutcome::NotFound;
            };
            let Some(lease) = app.get_mut(instance_id) else {
                return WriteOutcome::NotFound;
            };

            let stored_ts = lease.record().dirty_timestamp;
            if dirty_timestamp < stored_ts {
                debug!(
                    app_name,
                    instance_id = %instance_id,
                    incoming = dirty_timestamp,
                    stored = stored_ts,
                    "Ignoring stale status update"
                );
                return WriteOutcome::StaleWrite;
            }

            let record = lease.record_mut();
            record.status = status;
            record.dirty_timestamp = dirty_timestamp;
            record.clone()
        };

        self.enqueue_change(updated.clone(), ActionType::Modified, now);
        self.generation.fetch_add(1, Ordering::SeqCst);

        info!(app_name, instance_id = %instance_id, status = %status, "Status updated");

        if !is_replication {
            let _ = self
                .mutation_tx
                .send(RegistryMutation::StatusUpdate { record: updated });
        }

        WriteOutcome::Applied
    }

    /// Point-in-time snapshot of all registered instances.
    pub fn snapshot(&self) -> Applications {
        Applications::from_records(
            self.apps
                .iter()
                .flat_map(|app| {
                    app.value()
                        .values()
                        .map(|lease| lease.record().clone())
                        .collect::<Vec<_>>()
                }),
        )
    }

    /// Recent-change entries still inside the retention window.
    pub fn delta_entries(&self, now: DateTime<Utc>) -> Vec<DeltaEntry> {
        self.recent_changes
            .lock()
            .expect("recent-change queue poisoned")
            .entries(now)
    }

    /// Copy of the lease for one instance, if present.
    pub fn lease_of(&self, app_name: &str, instance_id: &InstanceId) -> Option<Lease> {
        self.apps.get(app_name)?.get(instance_id).cloned()
    }

    pub fn registered_count(&self) -> usize {
        self.registered_count.load(Ordering::SeqCst)
    }

    /// Snapshot generation; bumped by every applied change.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Whether the last sweep found renewals below the self-preservation
    /// threshold.
    pub fn is_below_renewal_threshold(&self) -> bool {
        self.below_threshold.load(Ordering::SeqCst)
    }

    /// Minimum count of live leases required for eviction to run.
    pub fn self_preservation_threshold(&self) -> u64 {
        self.renewal_threshold.load(Ordering::SeqCst)
    }

    /// Sweep expired leases, honoring self-preservation and the per-cycle
    /// eviction cap. Eviction is a local decision and is never replicated;
    /// every peer runs its own sweep.
    pub fn evict_expired_leases(&self, now: DateTime<Utc>) -> EvictionSweep {
        let mut expired: Vec<(String, InstanceId)> = Vec::new();
        for app in self.apps.iter() {
            for (instance_id, lease) in app.value() {
                if lease.is_expired_at(now) {
                    expired.push((app.key().clone(), instance_id.clone()));
                }
            }
        }

        let total = self.registered_count();
        let alive = total.saturating_sub(expired.len());
        let threshold = self.self_preservation_threshold();

        if expired.is_empty() {
            self.below_threshold.store(false, Ordering::SeqCst);
            return EvictionSweep {
                expired: 0,
                evicted: 0,
                self_preservation_active: false,
            };
        }

        if self.config.self_preservation_enabled && (alive as u64) < threshold {
            self.below_threshold.store(true, Ordering::SeqCst);
            warn!(
                expired = expired.len(),
                alive,
                threshold,
                "Renewals below threshold, self-preservation suppressing eviction"
            );
            return EvictionSweep {
                expired: expired.len(),
                evicted: 0,
                self_preservation_active: true,
            };
        }
        self.below_threshold.store(false, Ordering::SeqCst);

        // Randomize and cap so one sweep never removes a large chunk of the
        // registry synchronously.
        let cap = ((total as f64) * self.config.eviction_burst_fraction).ceil() as usize;
        let cap = cap.max(1);
        expired.shuffle(&mut rand::thread_rng());

        let mut evicted = 0;
        let found = expired.len();
        for (app_name, instance_id) in expired.into_iter().take(cap) {
            if self.evict_one(&app_name, &instance_id, now) {
                evicted += 1;
            }
        }

        info!(expired = found, evicted, "Eviction sweep completed");

        EvictionSweep {
            expired: found,
            evicted,
            self_preservation_active: false,
        }
    }

    /// Periodic eviction sweep; runs until the shutdown signal flips.
    pub async fn run_eviction_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.config.eviction_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.evict_expired_leases(Utc::now());
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("Eviction loop stopping");
                        break;
                    }
                }
            }
        }
    }

    fn evict_one(&self, app_name: &str, instance_id: &InstanceId, now: DateTime<Utc>) -> bool {
        let removed = match self.apps.get_mut(app_name) {
            // Re-check expiry under the entry lock; a renewal may have raced
            // the sweep.
            Some(mut app) => match app.get(instance_id) {
                Some(lease) if lease.is_expired_at(now) => app.remove(instance_id),
                _ => None,
            },
            None => None,
        };

        let Some(mut lease) = removed else {
            return false;
        };
        lease.evict(now);
        self.drop_app_if_empty(app_name);

        let count = self.registered_count.fetch_sub(1, Ordering::SeqCst) - 1;
        self.update_renewal_threshold(count);

        self.enqueue_change(lease.record().clone(), ActionType::Deleted, now);
        self.generation.fetch_add(1, Ordering::SeqCst);

        info!(app_name, instance_id = %instance_id, "Evicted expired lease");
        true
    }

    fn drop_app_if_empty(&self, app_name: &str) {
        self.apps.remove_if(app_name, |_, instances| instances.is_empty());
    }

    fn update_renewal_threshold(&self, registered: usize) {
        let threshold = ((registered as f64) * self.config.renewal_percent_threshold).ceil() as u64;
        // Floor of one expected renewal so an empty or near-empty registry
        // can neither divide by zero nor trip the valve forever.
        self.renewal_threshold
            .store(threshold.max(1), Ordering::SeqCst);
    }

    fn enqueue_change(&self, record: InstanceRecord, action: ActionType, now: DateTime<Utc>) {
        let entry = DeltaEntry {
            record,
            action,
            enqueued_at: now,
        };
        self.recent_changes
            .lock()
            .expect("recent-change queue poisoned")
            .push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::InstanceStatus;

    fn registry() -> LeaseRegistry {
        LeaseRegistry::new(RegistryConfig::default()).unwrap()
    }

    fn record(app: &str, id: &str, status: InstanceStatus) -> InstanceRecord {
        InstanceRecord::new(app, InstanceId::new(id), "10.0.0.1", 8080).with_status(status)
    }

    #[test]
    fn register_and_lookup() {
        let reg = registry();
        let outcome = reg.register(record("billing", "i-1", InstanceStatus::Up), None, false);
        assert_eq!(outcome, WriteOutcome::Applied);
        assert_eq!(reg.registered_count(), 1);

        let snapshot = reg.snapshot();
        assert_eq!(snapshot.get("billing").len(), 1);
    }

    #[test]
    fn reregister_overwrites_never_duplicates() {
        let reg = registry();
        let mut r = record("billing", "i-1", InstanceStatus::Starting);
        reg.register(r.clone(), None, false);

        r.set_status(InstanceStatus::Up, Utc::now());
        reg.register(r, None, false);

        assert_eq!(reg.registered_count(), 1);
        let snapshot = reg.snapshot();
        assert_eq!(snapshot.get("billing").len(), 1);
        assert_eq!(snapshot.get("billing")[0].status, InstanceStatus::Up);
    }

    #[test]
    fn stale_register_is_ignored() {
        let reg = registry();
        let mut newer = record("billing", "i-1", InstanceStatus::Up);
        newer.dirty_timestamp = 2_000;
        reg.register(newer, None, false);

        let mut stale = record("billing", "i-1", InstanceStatus::Down);
        stale.dirty_timestamp = 1_000;
        let outcome = reg.register(stale, None, false);

        assert_eq!(outcome, WriteOutcome::StaleWrite);
        assert_eq!(reg.snapshot().get("billing")[0].status, InstanceStatus::Up);
    }

    #[test]
    fn identical_reregister_keeps_renewal_timestamp() {
        let reg = registry();
        let r = record("billing", "i-1", InstanceStatus::Up);
        reg.register(r.clone(), None, false);
        let renewed_before = reg
            .lease_of("billing", &InstanceId::new("i-1"))
            .unwrap()
            .last_renewed_at();

        // Same dirty timestamp: applied, but no observable change.
        reg.register(r, None, false);
        let lease = reg.lease_of("billing", &InstanceId::new("i-1")).unwrap();
        assert_eq!(lease.last_renewed_at(), renewed_before);
        assert_eq!(lease.record().status, InstanceStatus::Up);
    }

    #[test]
    fn renew_unknown_lease_is_not_found() {
        let reg = registry();
        let outcome = reg.renew("billing", &InstanceId::new("ghost"), false);
        assert_eq!(outcome, WriteOutcome::NotFound);
    }

    #[test]
    fn renew_leaves_no_delta_entry() {
        let reg = registry();
        reg.register(record("billing", "i-1", InstanceStatus::Up), None, false);
        let before = reg.delta_entries(Utc::now()).len();

        reg.renew("billing", &InstanceId::new("i-1"), false);
        assert_eq!(reg.delta_entries(Utc::now()).len(), before);
    }

    #[test]
    fn cancel_is_idempotent() {
        let reg = registry();
        reg.register(record("billing", "i-1", InstanceStatus::Up), None, false);

        assert_eq!(
            reg.cancel("billing", &InstanceId::new("i-1"), false),
            WriteOutcome::Applied
        );
        assert_eq!(
            reg.cancel("billing", &InstanceId::new("i-1"), false),
            WriteOutcome::NotFound
        );
        assert_eq!(reg.registered_count(), 0);
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn cancel_produces_deleted_entry() {
        let reg = registry();
        reg.register(record("billing", "i-1", InstanceStatus::Up), None, false);
        reg.cancel("billing", &InstanceId::new("i-1"), false);

        let entries = reg.delta_entries(Utc::now());
        let last = entries.last().unwrap();
        assert_eq!(last.action, ActionType::Deleted);
        assert_eq!(last.record.instance_id.as_str(), "i-1");
    }

    #[test]
    fn status_update_conflict_resolution() {
        let reg = registry();
        let mut r = record("billing", "i-1", InstanceStatus::Up);
        r.dirty_timestamp = 1_000;
        reg.register(r, None, false);
        let id = InstanceId::new("i-1");

        // Older timestamp is ignored.
        assert_eq!(
            reg.status_update("billing", &id, InstanceStatus::Down, 500, true),
            WriteOutcome::StaleWrite
        );
        assert_eq!(reg.snapshot().get("billing")[0].status, InstanceStatus::Up);

        // Equal-or-newer wins.
        assert_eq!(
            reg.status_update("billing", &id, InstanceStatus::Down, 1_000, true),
            WriteOutcome::Applied
        );
        assert_eq!(reg.snapshot().get("billing")[0].status, InstanceStatus::Down);
    }

    #[test]
    fn order_independence_under_timestamp_tiebreak() {
        // Applying writes in any order converges to the highest-timestamp state.
        let forward = registry();
        let backward = registry();
        let id = InstanceId::new("i-1");

        let mut writes = Vec::new();
        for (ts, status) in [
            (1_000, InstanceStatus::Starting),
            (2_000, InstanceStatus::Up),
            (3_000, InstanceStatus::Down),
        ] {
            let mut r = record("billing", "i-1", status);
            r.dirty_timestamp = ts;
            writes.push(r);
        }

        for w in &writes {
            forward.register(w.clone(), None, true);
        }
        for w in writes.iter().rev() {
            backward.register(w.clone(), None, true);
        }

        let f = forward.lease_of("billing", &id).unwrap();
        let b = backward.lease_of("billing", &id).unwrap();
        assert_eq!(f.record().status, b.record().status);
        assert_eq!(f.record().dirty_timestamp, b.record().dirty_timestamp);
        assert_eq!(forward.snapshot().checksum(), backward.snapshot().checksum());
    }

    #[test]
    fn replication_writes_are_not_reannounced() {
        let reg = registry();
        let mut rx = reg.subscribe_mutations();

        reg.register(record("billing", "i-1", InstanceStatus::Up), None, true);
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));

        reg.register(record("billing", "i-2", InstanceStatus::Up), None, false);
        assert!(matches!(rx.try_recv(), Ok(RegistryMutation::Register { .. })));
    }

    #[test]
    fn self_preservation_suppresses_mass_eviction() {
        let config = RegistryConfig {
            default_lease_duration_secs: 1,
            ..Default::default()
        };
        let reg = LeaseRegistry::new(config).unwrap();
        for i in 0..10 {
            reg.register(
                record("billing", &format!("i-{i}"), InstanceStatus::Up),
                None,
                false,
            );
        }

        // All leases expired: alive ratio 0 is below the 85% threshold.
        let later = Utc::now() + chrono::Duration::seconds(5);
        let sweep = reg.evict_expired_leases(later);
        assert!(sweep.self_preservation_active);
        assert_eq!(sweep.evicted, 0);
        assert_eq!(reg.registered_count(), 10);
        assert!(reg.is_below_renewal_threshold());
    }

    #[test]
    fn eviction_resumes_when_renewals_recover() {
        let config = RegistryConfig {
            default_lease_duration_secs: 1,
            eviction_burst_fraction: 1.0,
            ..Default::default()
        };
        let reg = LeaseRegistry::new(config).unwrap();
        for i in 0..10 {
            reg.register(
                record("billing", &format!("i-{i}"), InstanceStatus::Up),
                None,
                false,
            );
        }

        let later = Utc::now() + chrono::Duration::seconds(5);

        // Nine of ten re-register with a longer lease; one stays expired.
        // Alive ratio 90% >= 85%, so eviction runs again.
        for i in 1..10 {
            let mut r = record("billing", &format!("i-{i}"), InstanceStatus::Up);
            r.dirty_timestamp = i64::MAX - 1;
            reg.register(r, Some(3600), false);
        }

        let sweep = reg.evict_expired_leases(later);
        assert!(!sweep.self_preservation_active);
        assert_eq!(sweep.expired, 1);
        assert_eq!(sweep.evicted, 1);
        assert_eq!(reg.registered_count(), 9);
        assert!(!reg.is_below_renewal_threshold());
    }

    #[test]
    fn eviction_burst_is_capped() {
        let config = RegistryConfig {
            default_lease_duration_secs: 1,
            self_preservation_enabled: false,
            eviction_burst_fraction: 0.15,
            ..Default::default()
        };
        let reg = LeaseRegistry::new(config).unwrap();
        for i in 0..20 {
            reg.register(
                record("billing", &format!("i-{i}"), InstanceStatus::Up),
                None,
                false,
            );
        }

        let later = Utc::now() + chrono::Duration::seconds(5);
        let sweep = reg.evict_expired_leases(later);

        // ceil(20 * 0.15) = 3 per cycle.
        assert_eq!(sweep.expired, 20);
        assert_eq!(sweep.evicted, 3);

        // Repeated sweeps eventually clear everything.
        let mut remaining = reg.registered_count();
        while remaining > 0 {
            reg.evict_expired_leases(later);
            let now_remaining = reg.registered_count();
            assert!(now_remaining < remaining);
            remaining = now_remaining;
        }
    }

    #[test]
    fn delta_between_snapshots_reproduces_second_snapshot() {
        let reg = registry();
        reg.register(record("billing", "i-1", InstanceStatus::Up), None, false);

        let mut first = reg.snapshot();

        let id = InstanceId::new("i-1");
        let ts = Utc::now().timestamp_millis() + 10;
        reg.status_update("billing", &id, InstanceStatus::Down, ts, false);
        reg.register(record("auth", "i-2", InstanceStatus::Up), None, false);
        let second = reg.snapshot();

        // Apply every delta entry newer than the first snapshot.
        for entry in reg.delta_entries(Utc::now()) {
            first.apply(&entry);
        }
        assert_eq!(first.checksum(), second.checksum());
    }
}
