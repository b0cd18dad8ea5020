use crate::{CompositeRecord, RecordStore, Sighting, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use time::OffsetDateTime;

/// Keeps records in process memory. For tests and local runs.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, CompositeRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn upsert(&self, sighting: &Sighting, seen_at: OffsetDateTime) -> Result<(), StoreError> {
        match self.records.lock().entry(sighting.composite_id.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().last_seen = seen_at,
            Entry::Vacant(entry) => {
                entry.insert(CompositeRecord::new(sighting, seen_at));
            }
        }
        Ok(())
    }

    async fn get(&self, composite_id: &str) -> Result<Option<CompositeRecord>, StoreError> {
        Ok(self.records.lock().get(composite_id).cloned())
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
