//! Recent-change queue entries

use crate::InstanceRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of mutation a delta entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Added,
    Modified,
    Deleted,
}

/// One entry of the server's recent-change queue.
///
/// Delta fetches return these in chronological (insertion) order; clients
/// apply them in the order received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaEntry {
    pub record: InstanceRecord,
    pub action: ActionType,
    pub enqueued_at: DateTime<Utc>,
}

impl DeltaEntry {
    pub fn new(record: InstanceRecord, action: ActionType) -> Self {
        Self {
            record,
            action,
            enqueued_at: Utc::now(),
        }
    }
}
