//! Wire request and response shapes

use beacon_registry::WriteOutcome;
use beacon_types::{Applications, DeltaEntry, InstanceId, InstanceRecord, InstanceStatus};
use serde::{Deserialize, Serialize};

/// Acknowledgment of a registry write.
///
/// `Stale` is the CONFLICT-equivalent: the write carried a dirty timestamp
/// older than the stored one and was ignored. Not an error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteAck {
    Applied,
    NotFound,
    Stale,
}

impl From<WriteOutcome> for WriteAck {
    fn from(outcome: WriteOutcome) -> Self {
        match outcome {
            WriteOutcome::Applied => WriteAck::Applied,
            WriteOutcome::NotFound => WriteAck::NotFound,
            WriteOutcome::StaleWrite => WriteAck::Stale,
        }
    }
}

/// Body of a registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub record: InstanceRecord,
    #[serde(default)]
    pub lease_duration_secs: Option<u64>,
}

/// Body of a status-update request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: InstanceStatus,
    pub dirty_timestamp: i64,
}

/// Full-snapshot fetch response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullRegistryResponse {
    pub applications: Applications,
    pub checksum: String,
}

/// Delta fetch response: ordered change entries plus the checksum of the
/// server's current full state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaResponse {
    pub entries: Vec<DeltaEntry>,
    pub checksum: String,
}

/// One replicated mutation, shipped node-to-node in batches.
///
/// Always applied with `is_replication = true` on the receiving side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplicationInstruction {
    Register {
        record: InstanceRecord,
        #[serde(default)]
        lease_duration_secs: Option<u64>,
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

impl ReplicationInstruction {
    /// The (application, instance id) pair this instruction acts on.
    pub fn key(&self) -> (&str, &InstanceId) {
        match self {
            ReplicationInstruction::Register { record, .. }
            | ReplicationInstruction::StatusUpdate { record } => {
                (record.app_name.as_str(), &record.instance_id)
            }
            ReplicationInstruction::Renew {
                app_name,
                instance_id,
            }
            | ReplicationInstruction::Cancel {
                app_name,
                instance_id,
            } => (app_name.as_str(), instance_id),
        }
    }

    pub fn is_cancel(&self) -> bool {
        matches!(self, ReplicationInstruction::Cancel { .. })
    }
}

/// Response to a replication batch: one ack per instruction, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub acks: Vec<WriteAck>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instruction_wire_format_is_tagged() {
        let instruction = ReplicationInstruction::Cancel {
            app_name: "billing".into(),
            instance_id: InstanceId::new("i-1"),
        };
        let json = serde_json::to_value(&instruction).unwrap();
        assert_eq!(json["op"], "cancel");
        assert_eq!(json["app_name"], "billing");
    }

    #[test]
    fn ack_roundtrip() {
        let json = serde_json::to_string(&WriteAck::NotFound).unwrap();
        assert_eq!(json, "\"NOT_FOUND\"");
        let back: WriteAck = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WriteAck::NotFound);
    }
}
