//! Retention-bounded queue of recent registry mutations

use beacon_types::DeltaEntry;
use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;

/// Chronological queue of recent changes, answering delta fetches.
///
/// Entries older than the retention window are purged lazily on access.
#[derive(Debug)]
pub struct RecentChangeQueue {
    entries: VecDeque<DeltaEntry>,
    retention: Duration,
}

impl RecentChangeQueue {
    pub fn new(retention_secs: u64) -> Self {
        Self {
            entries: VecDeque::new(),
            retention: Duration::seconds(retention_secs as i64),
        }
    }

    /// Append an entry, purging anything that fell out of the window.
    pub fn push(&mut self, entry: DeltaEntry) {
        self.purge(entry.enqueued_at);
        self.entries.push_back(entry);
    }

    /// All entries still inside the retention window, oldest first.
    pub fn entries(&mut self, now: DateTime<Utc>) -> Vec<DeltaEntry> {
        self.purge(now);
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn purge(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        while let Some(front) = self.entries.front() {
            if front.enqueued_at < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::{ActionType, InstanceId, InstanceRecord, InstanceStatus};

    fn entry(id: &str, action: ActionType, at: DateTime<Utc>) -> DeltaEntry {
        let record = InstanceRecord::new("billing", InstanceId::new(id), "localhost", 8080)
            .with_status(InstanceStatus::Up);
        DeltaEntry {
            record,
            action,
            enqueued_at: at,
        }
    }

    #[test]
    fn keeps_insertion_order() {
        let now = Utc::now();
        let mut queue = RecentChangeQueue::new(180);
        queue.push(entry("i-1", ActionType::Added, now));
        queue.push(entry("i-2", ActionType::Added, now + Duration::seconds(1)));

        let entries = queue.entries(now + Duration::seconds(2));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].record.instance_id.as_str(), "i-1");
        assert_eq!(entries[1].record.instance_id.as_str(), "i-2");
    }

    #[test]
    fn purges_expired_entries_on_access() {
        let now = Utc::now();
        let mut queue = RecentChangeQueue::new(180);
        queue.push(entry("i-1", ActionType::Added, now));
        queue.push(entry("i-2", ActionType::Modified, now + Duration::seconds(100)));

        // i-1 is past the window, i-2 is still inside it.
        let entries = queue.entries(now + Duration::seconds(200));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.instance_id.as_str(), "i-2");
    }
}
