//! Snapshot container for the full registry view
//!
//! `Applications` is the serializable shape returned by a full-registry
//! fetch and held by the client cache. Delta entries patch it in place.

use crate::{registry_checksum, ActionType, DeltaEntry, InstanceId, InstanceRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Application name → ordered instance list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Applications {
    apps: BTreeMap<String, Vec<InstanceRecord>>,
}

impl Applications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from an iterator of records.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = InstanceRecord>,
    {
        let mut apps = Self::new();
        for record in records {
            apps.upsert(record);
        }
        apps
    }

    /// Instances registered under an application; empty slice if unknown.
    pub fn get(&self, app_name: &str) -> &[InstanceRecord] {
        self.apps.get(app_name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All application names currently present.
    pub fn app_names(&self) -> impl Iterator<Item = &str> {
        self.apps.keys().map(String::as_str)
    }

    /// All instances across all applications, in application order.
    pub fn iter(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.apps.values().flatten()
    }

    /// Instances whose vip address matches.
    pub fn instances_by_vip(&self, vip: &str) -> Vec<&InstanceRecord> {
        self.iter()
            .filter(|r| r.vip_address.as_deref() == Some(vip))
            .collect()
    }

    /// Instances registered in a region.
    pub fn instances_by_region(&self, region: &str) -> Vec<&InstanceRecord> {
        self.iter()
            .filter(|r| r.region.as_deref() == Some(region))
            .collect()
    }

    /// Total instance count across applications.
    pub fn len(&self) -> usize {
        self.apps.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert or replace the record for its (application, instance id) pair.
    pub fn upsert(&mut self, record: InstanceRecord) {
        let instances = self.apps.entry(record.app_name.clone()).or_default();
        match instances
            .iter_mut()
            .find(|r| r.instance_id == record.instance_id)
        {
            Some(existing) => *existing = record,
            None => instances.push(record),
        }
    }

    /// Remove one instance; empty applications are dropped from the map.
    pub fn remove(&mut self, app_name: &str, instance_id: &InstanceId) {
        if let Some(instances) = self.apps.get_mut(app_name) {
            instances.retain(|r| &r.instance_id != instance_id);
            if instances.is_empty() {
                self.apps.remove(app_name);
            }
        }
    }

    /// Apply one delta entry.
    pub fn apply(&mut self, entry: &DeltaEntry) {
        match entry.action {
            ActionType::Added | ActionType::Modified => self.upsert(entry.record.clone()),
            ActionType::Deleted => {
                self.remove(&entry.record.app_name, &entry.record.instance_id)
            }
        }
    }

    /// Consistency checksum of this snapshot.
    pub fn checksum(&self) -> String {
        registry_checksum(
            self.iter()
                .map(|r| (r.app_name.as_str(), r.instance_id.as_str(), r.status)),
        )
    }
}
