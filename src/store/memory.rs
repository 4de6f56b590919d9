use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::store::{Record, Store, StoreError};

pub struct MemoryStore<T: Record> {
    records: DashMap<Uuid, T>,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Store<T> for MemoryStore<T> {
    fn create(&self, record: T) -> Result<T, StoreError> {
        match self.records.entry(record.id()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                collection: T::COLLECTION,
                id: record.id(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    fn find_by_id(&self, id: &Uuid) -> Result<Option<T>, StoreError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    fn find_many(&self, filter: &dyn Fn(&T) -> bool) -> Result<Vec<T>, StoreError> {
        Ok(self
            .records
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect())
    }

    fn update_by_id(
        &self,
        id: &Uuid,
        patch: &mut dyn FnMut(&mut T),
    ) -> Result<Option<T>, StoreError> {
        Ok(self.records.get_mut(id).map(|mut entry| {
            patch(entry.value_mut());
            entry.value().clone()
        }))
    }

    fn delete_by_id(&self, id: &Uuid) -> Result<Option<T>, StoreError> {
        Ok(self.records.remove(id).map(|(_, record)| record))
    }

    fn claim_by_id(&self, id: &Uuid, expected: &T::Status) -> Result<Option<T>, StoreError> {
        Ok(self
            .records
            .remove_if(id, |_, record| record.status() == *expected)
            .map(|(_, record)| record))
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }
}
