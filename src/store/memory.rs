//! In-process document store with fault injection

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{DocumentStore, StoreError};
use crate::config::ConfigDocument;

/// Keeps the document in memory; reads and writes can be made to fail
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<ConfigDocument>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(document: ConfigDocument) -> Self {
        Self {
            document: Mutex::new(document),
            ..Self::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful replace calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of the stored document
    pub fn current(&self) -> ConfigDocument {
        match self.document.lock() {
            Ok(document) => document.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl DocumentStore for MemoryStore {
    async fn get_document(&self) -> Result<ConfigDocument, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }
        Ok(self.current())
    }

    async fn replace_document(&self, document: ConfigDocument) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write refused".to_string()));
        }
        let mut stored = self
            .document
            .lock()
            .map_err(|_| StoreError::Unavailable("document lock poisoned".to_string()))?;
        *stored = document;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
