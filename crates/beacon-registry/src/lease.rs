//! Lease bookkeeping for one registered instance

use beacon_types::InstanceRecord;
use chrono::{DateTime, Duration, Utc};

/// A time-bounded registration requiring periodic renewal to stay alive.
///
/// Owned exclusively by the registry entry it is attached to. Once the
/// eviction timestamp is set it is never cleared; an evicted lease is
/// removed from the store, not resurrected.
#[derive(Debug, Clone)]
pub struct Lease {
    record: InstanceRecord,
    duration_secs: u64,
    registered_at: DateTime<Utc>,
    last_renewed_at: DateTime<Utc>,
    evicted_at: Option<DateTime<Utc>>,
}

impl Lease {
    pub fn new(record: InstanceRecord, duration_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            record,
            duration_secs,
            registered_at: now,
            last_renewed_at: now,
            evicted_at: None,
        }
    }

    pub fn record(&self) -> &InstanceRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut InstanceRecord {
        &mut self.record
    }

    /// Replace the wrapped record, keeping the lease timestamps.
    pub fn set_record(&mut self, record: InstanceRecord) {
        self.record = record;
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    /// Adopt a new duration-until-expiry (re-registration may change it).
    pub fn set_duration(&mut self, duration_secs: u64) {
        self.duration_secs = duration_secs;
    }

    pub fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    pub fn last_renewed_at(&self) -> DateTime<Utc> {
        self.last_renewed_at
    }

    pub fn evicted_at(&self) -> Option<DateTime<Utc>> {
        self.evicted_at
    }

    /// Mark the lease as renewed at `now`.
    pub fn renew(&mut self, now: DateTime<Utc>) {
        self.last_renewed_at = now;
    }

    /// Mark the lease evicted. Set once, never unset.
    pub fn evict(&mut self, now: DateTime<Utc>) {
        if self.evicted_at.is_none() {
            self.evicted_at = Some(now);
        }
    }

    /// A lease is alive while `last_renewed_at + duration >= now` and it has
    /// not been evicted.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if self.evicted_at.is_some() {
            return true;
        }
        self.last_renewed_at + Duration::seconds(self.duration_secs as i64) < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_types::{InstanceId, InstanceStatus};

    fn test_record() -> InstanceRecord {
        InstanceRecord::new("billing", InstanceId::new("i-1"), "10.0.0.1", 8080)
            .with_status(InstanceStatus::Up)
    }

    #[test]
    fn fresh_lease_is_alive() {
        let now = Utc::now();
        let lease = Lease::new(test_record(), 90, now);
        assert!(!lease.is_expired_at(now));
        assert!(!lease.is_expired_at(now + Duration::seconds(90)));
    }

    #[test]
    fn unrenewed_lease_expires() {
        let now = Utc::now();
        let lease = Lease::new(test_record(), 90, now);
        assert!(lease.is_expired_at(now + Duration::seconds(91)));
    }

    #[test]
    fn renewal_extends_lease() {
        let now = Utc::now();
        let mut lease = Lease::new(test_record(), 90, now);
        lease.renew(now + Duration::seconds(60));
        assert!(!lease.is_expired_at(now + Duration::seconds(120)));
    }

    #[test]
    fn eviction_is_permanent() {
        let now = Utc::now();
        let mut lease = Lease::new(test_record(), 90, now);
        lease.evict(now);
        let first = lease.evicted_at().unwrap();

        // A second evict call does not move the timestamp.
        lease.evict(now + Duration::seconds(10));
        assert_eq!(lease.evicted_at().unwrap(), first);
        assert!(lease.is_expired_at(now));
    }
}
