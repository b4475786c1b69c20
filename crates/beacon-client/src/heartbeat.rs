//! Heartbeat scheduler
//!
//! Renews this instance's own lease on a fixed interval. A NOT_FOUND
//! response means the server lost the lease (e.g. after a restart) and
//! triggers an immediate re-registration. Transport failures escalate a
//! capped backoff and, past a threshold, a degraded-health signal; they
//! never crash the client.

use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::{BeaconEvent, EventDispatcher};
use crate::health::HealthCheckHandler;
use beacon_transport::{RegistryTransport, WriteAck};
use beacon_types::{InstanceRecord, InstanceStatus};
use chrono::Utc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Periodic lease renewal and registration retry for one instance.
pub struct HeartbeatScheduler {
    transport: Arc<dyn RegistryTransport>,
    config: ClientConfig,
    record: RwLock<InstanceRecord>,
    health: Arc<dyn HealthCheckHandler>,
    dispatcher: Arc<EventDispatcher>,
    consecutive_failures: AtomicU32,
    /// Status last acknowledged by the server for this instance.
    remote_status: RwLock<InstanceStatus>,
}

impl HeartbeatScheduler {
    pub fn new(
        transport: Arc<dyn RegistryTransport>,
        config: ClientConfig,
        record: InstanceRecord,
        health: Arc<dyn HealthCheckHandler>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Self {
        Self {
            transport,
            config,
            record: RwLock::new(record),
            health,
            dispatcher,
            consecutive_failures: AtomicU32::new(0),
            remote_status: RwLock::new(InstanceStatus::Unknown),
        }
    }

    /// The record this scheduler registers and renews.
    pub fn record(&self) -> InstanceRecord {
        self.record.read().expect("self record poisoned").clone()
    }

    /// Status the server last acknowledged for this instance.
    pub fn remote_status(&self) -> InstanceStatus {
        *self.remote_status.read().expect("remote status poisoned")
    }

    /// Degraded once consecutive heartbeat failures pass the threshold.
    pub fn is_degraded(&self) -> bool {
        self.consecutive_failures.load(Ordering::SeqCst) >= self.config.degraded_failure_threshold
    }

    /// Register this instance with the server.
    pub async fn register_self(&self) -> Result<()> {
        let record = self.record();
        let ack = self
            .transport
            .register(record.clone(), Some(self.config.lease_duration_secs), false)
            .await?;
        debug!(ack = ?ack, "Registered self");
        self.acknowledge_status(record.status);
        Ok(())
    }

    /// Deregister on shutdown; best-effort.
    pub async fn deregister_self(&self) -> Result<()> {
        let record = self.record();
        self.transport
            .cancel(&record.app_name, &record.instance_id, false)
            .await?;
        info!(instance_id = %record.instance_id, "Deregistered self");
        Ok(())
    }

    /// One heartbeat cycle: poll health, push a status change if any, then
    /// renew, falling back to registration on NOT_FOUND.
    pub async fn beat(&self) -> Result<()> {
        let reported = self.record().status;
        let desired = self.health.current_status(reported).await;

        if desired != reported {
            let updated = {
                let mut record = self.record.write().expect("self record poisoned");
                record.set_status(desired, Utc::now());
                record.clone()
            };
            let ack = self
                .transport
                .status_update(
                    &updated.app_name,
                    &updated.instance_id,
                    updated.status,
                    updated.dirty_timestamp,
                    false,
                )
                .await?;
            match ack {
                WriteAck::NotFound => {
                    debug!("Status update found no lease, re-registering");
                    self.register_self().await?;
                    return Ok(());
                }
                _ => self.acknowledge_status(desired),
            }
        }

        let record = self.record();
        let ack = self
            .transport
            .renew(&record.app_name, &record.instance_id, false)
            .await?;

        if ack == WriteAck::NotFound {
            // Server lost the lease; recover immediately instead of waiting
            // for the next scheduled attempt.
            info!(instance_id = %record.instance_id, "Lease unknown to server, re-registering");
            self.register_self().await?;
        }
        Ok(())
    }

    /// Heartbeat loop with escalating, capped backoff on failure.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        // Initial registration, retried on the same backoff schedule.
        let mut attempt: u32 = 0;
        loop {
            tokio::select! {
                result = self.register_self() => {
                    match result {
                        Ok(()) => {
                            self.consecutive_failures.store(0, Ordering::SeqCst);
                            break;
                        }
                        Err(e) => {
                            self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
                            let backoff = self.backoff(attempt);
                            warn!(error = %e, backoff_secs = backoff.as_secs(), "Registration failed");
                            attempt = attempt.saturating_add(1);
                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        return;
                    }
                }
            }
        }

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(
            self.config.heartbeat_interval_secs,
        ));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut failures: u32 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.beat().await {
                        Ok(()) => {
                            failures = 0;
                            self.consecutive_failures.store(0, Ordering::SeqCst);
                        }
                        Err(e) => {
                            failures = failures.saturating_add(1);
                            self.consecutive_failures.store(failures, Ordering::SeqCst);
                            let backoff = self.backoff(failures);
                            warn!(
                                error = %e,
                                consecutive = failures,
                                backoff_secs = backoff.as_secs(),
                                "Heartbeat failed"
                            );
                            tokio::time::sleep(backoff).await;
                        }
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        debug!("Heartbeat loop stopping");
                        return;
                    }
                }
            }
        }
    }

    fn acknowledge_status(&self, status: InstanceStatus) {
        let previous = {
            let mut remote = self.remote_status.write().expect("remote status poisoned");
            std::mem::replace(&mut *remote, status)
        };
        if previous != status {
            self.dispatcher.dispatch(BeaconEvent::StatusChanged {
                previous,
                current: status,
            });
        }
    }

    fn backoff(&self, attempt: u32) -> std::time::Duration {
        let secs = self
            .config
            .heartbeat_interval_secs
            .saturating_mul(1u64 << attempt.min(8))
            .min(self.config.backoff_ceiling_secs);
        std::time::Duration::from_secs(secs)
    }
}
