use super::{LogCategory, LogStore, PlateRecord, TIMESTAMP_FORMAT};
use crate::error::StorageError;
use crate::plate::PlateNumber;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-local plate logs, used for dry runs and tests.
///
/// The store can be taken offline with [`MemoryLogStore::set_available`], or
/// made to reject only appends with [`MemoryLogStore::set_read_only`], to
/// exercise storage failure handling.
#[derive(Debug)]
pub struct MemoryLogStore {
    logs: Mutex<HashMap<LogCategory, Vec<PlateRecord>>>,
    available: AtomicBool,
    read_only: AtomicBool,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self {
            logs: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
            read_only: AtomicBool::new(false),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Keep serving reads but fail every append
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of records appended to `category`
    pub fn len(&self, category: LogCategory) -> usize {
        self.logs.lock().get(&category).map_or(0, Vec::len)
    }

    /// Plates of `category` in append order
    pub fn plates(&self, category: LogCategory) -> Vec<PlateNumber> {
        self.logs
            .lock()
            .get(&category)
            .map(|records| records.iter().map(|r| r.plate.clone()).collect())
            .unwrap_or_default()
    }

    fn check_available(&self, category: LogCategory) -> Result<(), StorageError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StorageError::unavailable(category, "store is offline"))
        }
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn ensure_category(&self, category: LogCategory) -> Result<(), StorageError> {
        self.check_available(category)?;
        self.logs.lock().entry(category).or_default();
        Ok(())
    }

    async fn load_records(&self, category: LogCategory) -> Result<Vec<PlateRecord>, StorageError> {
        self.check_available(category)?;
        Ok(self.logs.lock().get(&category).cloned().unwrap_or_default())
    }

    async fn append(
        &self,
        category: LogCategory,
        plate: &PlateNumber,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.check_available(category)?;
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(category, "store is read-only"));
        }
        self.logs.lock().entry(category).or_default().push(PlateRecord {
            plate: plate.clone(),
            recorded_at: timestamp.format(TIMESTAMP_FORMAT).to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::plate;

    #[tokio::test]
    async fn test_memory_store_appends_in_order() {
        let store = MemoryLogStore::new();
        store.ensure_all().await.unwrap();

        store.append(LogCategory::Entry, &plate("MH12AB1234"), Utc::now()).await.unwrap();
        store.append(LogCategory::Entry, &plate("KA01MJ2022"), Utc::now()).await.unwrap();

        assert_eq!(store.len(LogCategory::Entry), 2);
        assert_eq!(store.len(LogCategory::Exit), 0);
        assert_eq!(
            store.plates(LogCategory::Entry),
            vec![plate("MH12AB1234"), plate("KA01MJ2022")]
        );
    }

    #[tokio::test]
    async fn test_offline_store_rejects_everything() {
        let store = MemoryLogStore::new();
        store.set_available(false);

        assert!(store.load_membership(LogCategory::Entry).await.is_err());
        let err = store
            .append(LogCategory::Fishy, &plate("MH12AB1234"), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err.category(), LogCategory::Fishy);

        store.set_available(true);
        assert_eq!(store.len(LogCategory::Fishy), 0);
    }

    #[tokio::test]
    async fn test_read_only_store_still_loads() {
        let store = MemoryLogStore::new();
        store.append(LogCategory::Entry, &plate("MH12AB1234"), Utc::now()).await.unwrap();
        store.set_read_only(true);

        assert_eq!(store.load_membership(LogCategory::Entry).await.unwrap().len(), 1);
        assert!(store
            .append(LogCategory::Entry, &plate("KA01MJ2022"), Utc::now())
            .await
            .is_err());
        assert_eq!(store.len(LogCategory::Entry), 1);
    }
}
