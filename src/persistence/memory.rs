//! In-memory storage backend

use super::{PersistenceError, PersistenceResult, Storage};

/// Keeps the record in memory. Can be told to reject writes.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    /// Last successfully written record
    pub record: Option<String>,
    /// When set, every write fails with `Unavailable`
    pub fail_writes: bool,
    /// Number of successful writes
    pub writes: usize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with a raw record (as if written by an earlier version)
    pub fn with_record(json: impl Into<String>) -> Self {
        Self {
            record: Some(json.into()),
            ..Self::default()
        }
    }
}

impl Storage for MemoryStorage {
    fn read(&self) -> PersistenceResult<Option<String>> {
        Ok(self.record.clone())
    }

    fn write(&mut self, json: &str) -> PersistenceResult<()> {
        if self.fail_writes {
            return Err(PersistenceError::Unavailable("writes disabled".to_string()));
        }
        self.record = Some(json.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let mut storage = MemoryStorage::new();
        assert!(storage.read().unwrap().is_none());
        storage.write("{\"coins\":3}").unwrap();
        assert_eq!(storage.read().unwrap().as_deref(), Some("{\"coins\":3}"));
        assert_eq!(storage.writes, 1);
    }

    #[test]
    fn failing_writes_keep_old_record() {
        let mut storage = MemoryStorage::with_record("{}");
        storage.fail_writes = true;
        assert!(storage.write("{\"coins\":1}").is_err());
        assert_eq!(storage.record.as_deref(), Some("{}"));
        assert_eq!(storage.writes, 0);
    }
}
