//! Per-peer replication worker
//!
//! One worker per peer drains that peer's bounded queue, coalesces
//! consecutive instructions for the same instance, and submits batches with
//! bounded retry. Exhausted batches are logged and dropped; replication is
//! best-effort and never blocks the local write path.

use crate::config::ReplicationConfig;
use beacon_transport::{RegistryTransport, ReplicationInstruction, WriteAck};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Drop superseded instructions from a drained batch.
///
/// The last instruction per (application, instance id) wins, in particular a
/// cancel that follows a not-yet-sent register. Relative order of the
/// surviving instructions is preserved.
pub fn coalesce(batch: Vec<ReplicationInstruction>) -> Vec<ReplicationInstruction> {
    let mut slots: Vec<Option<ReplicationInstruction>> = Vec::with_capacity(batch.len());
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for instruction in batch {
        let (app, id) = instruction.key();
        let key = (app.to_string(), id.as_str().to_string());
        match index.get(&key) {
            Some(&slot) => {
                slots[slot] = Some(instruction);
            }
            None => {
                index.insert(key, slots.len());
                slots.push(Some(instruction));
            }
        }
    }

    slots.into_iter().flatten().collect()
}

/// Run one peer's drain loop until the queue sender is dropped.
pub async fn run_peer_worker(
    peer_url: String,
    transport: Arc<dyn RegistryTransport>,
    mut rx: mpsc::Receiver<ReplicationInstruction>,
    config: ReplicationConfig,
) {
    debug!(peer = %peer_url, "Replication worker started");

    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];
        while batch.len() < config.batch_size {
            match rx.try_recv() {
                Ok(instruction) => batch.push(instruction),
                Err(_) => break,
            }
        }

        let batch = coalesce(batch);
        submit_with_retry(&peer_url, transport.as_ref(), batch, &config).await;
    }

    debug!(peer = %peer_url, "Replication worker stopped");
}

async fn submit_with_retry(
    peer_url: &str,
    transport: &dyn RegistryTransport,
    batch: Vec<ReplicationInstruction>,
    config: &ReplicationConfig,
) {
    for attempt in 0..config.retry_attempts {
        match transport.submit_batch(batch.clone()).await {
            Ok(acks) => {
                for (instruction, ack) in batch.iter().zip(&acks) {
                    if !matches!(ack, WriteAck::Applied) {
                        let (app, id) = instruction.key();
                        debug!(
                            peer = %peer_url,
                            app_name = app,
                            instance_id = %id,
                            ack = ?ack,
                            "Peer did not apply replicated instruction"
                        );
                    }
                }
                return;
            }
            Err(e) => {
                let backoff = config.backoff_for_attempt(attempt);
                warn!(
                    peer = %peer_url,
                    attempt = attempt + 1,
                    max_attempts = config.retry_attempts,
                    error = %e,
                    "Replication batch failed"
                );
                if attempt + 1 < config.retry_attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    warn!(
        peer = %peer_url,
        dropped = batch.len(),
        "Replication retries exhausted, dropping batch"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::{InstanceId, InstanceRecord, InstanceStatus};

    fn record(app: &str, id: &str) -> InstanceRecord {
        InstanceRecord::new(app, InstanceId::new(id), "10.0.0.1", 8080)
            .with_status(InstanceStatus::Up)
    }

    fn register(app: &str, id: &str) -> ReplicationInstruction {
        ReplicationInstruction::Register {
            record: record(app, id),
            lease_duration_secs: None,
        }
    }

    fn cancel(app: &str, id: &str) -> ReplicationInstruction {
        ReplicationInstruction::Cancel {
            app_name: app.into(),
            instance_id: InstanceId::new(id),
        }
    }

    #[test]
    fn cancel_supersedes_unsent_register() {
        let batch = vec![register("billing", "i-1"), cancel("billing", "i-1")];
        let coalesced = coalesce(batch);

        assert_eq!(coalesced.len(), 1);
        assert!(coalesced[0].is_cancel());
    }

    #[test]
    fn distinct_instances_are_untouched() {
        let batch = vec![
            register("billing", "i-1"),
            register("billing", "i-2"),
            cancel("auth", "i-1"),
        ];
        let coalesced = coalesce(batch);
        assert_eq!(coalesced.len(), 3);
    }

    #[test]
    fn surviving_order_is_preserved() {
        let batch = vec![
            register("billing", "i-1"),
            register("auth", "i-2"),
            cancel("billing", "i-1"),
        ];
        let coalesced = coalesce(batch);

        assert_eq!(coalesced.len(), 2);
        // i-1's slot keeps its original position, now holding the cancel.
        assert!(coalesced[0].is_cancel());
        assert_eq!(coalesced[1].key().0, "auth");
    }
}
