//! Nullable store: thread-safe in-memory group persistence for testing.

use roster_store::{GroupRecord, GroupStore, StoreError};
use roster_types::{CryptoIdentity, GroupIdentifier};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

type Key = (CryptoIdentity, GroupIdentifier);

/// An in-memory group store for testing.
///
/// Writes can be made to fail on demand to exercise error paths.
pub struct NullGroupStore {
    groups: Mutex<HashMap<Key, GroupRecord>>,
    fail_writes: AtomicBool,
}

impl NullGroupStore {
    pub fn new() -> Self {
        Self {
            groups: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail with a backend error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.groups.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("writes disabled".into()));
        }
        Ok(())
    }
}

impl Default for NullGroupStore {
    fn default() -> Self {
        Self::new()
    }
}

fn describe(owner: &CryptoIdentity, identifier: &GroupIdentifier) -> String {
    format!("{owner}/{identifier}")
}

impl GroupStore for NullGroupStore {
    fn get_group(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<GroupRecord, StoreError> {
        self.groups
            .lock()
            .unwrap()
            .get(&(*owner, identifier.clone()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(describe(owner, identifier)))
    }

    fn insert_group(&self, record: &GroupRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut groups = self.groups.lock().unwrap();
        let key = (record.owner, record.identifier.clone());
        if groups.contains_key(&key) {
            return Err(StoreError::Duplicate(describe(&record.owner, &record.identifier)));
        }
        groups.insert(key, record.clone());
        Ok(())
    }

    fn put_group(&self, record: &GroupRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut groups = self.groups.lock().unwrap();
        let slot = groups
            .get_mut(&(record.owner, record.identifier.clone()))
            .ok_or_else(|| StoreError::NotFound(describe(&record.owner, &record.identifier)))?;
        *slot = record.clone();
        Ok(())
    }

    fn delete_group(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<GroupRecord, StoreError> {
        self.check_writable()?;
        self.groups
            .lock()
            .unwrap()
            .remove(&(*owner, identifier.clone()))
            .ok_or_else(|| StoreError::NotFound(describe(owner, identifier)))
    }

    fn group_exists(
        &self,
        owner: &CryptoIdentity,
        identifier: &GroupIdentifier,
    ) -> Result<bool, StoreError> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .contains_key(&(*owner, identifier.clone())))
    }

    fn groups_of_owner(&self, owner: &CryptoIdentity) -> Result<Vec<GroupRecord>, StoreError> {
        let mut records: Vec<GroupRecord> = self
            .groups
            .lock()
            .unwrap()
            .values()
            .filter(|r| &r.owner == owner)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
        Ok(records)
    }
}
