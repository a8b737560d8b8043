//! In-memory lookup, used by tests and dry runs.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::traits::DataLookup;
use crate::domain::LookupRecord;
use crate::error::{Result, VerimathError};

/// HashMap-backed lookup keyed by `(partition_key, sort_key)`.
#[derive(Debug, Default)]
pub struct MemoryLookup {
    items: RwLock<HashMap<(String, String), LookupRecord>>,
}

impl MemoryLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_item(self, partition_key: impl Into<String>, sort_key: impl Into<String>, record: LookupRecord) -> Self {
        if let Ok(mut items) = self.items.write() {
            items.insert((partition_key.into(), sort_key.into()), record);
        }
        self
    }

    pub fn insert(&self, partition_key: impl Into<String>, sort_key: impl Into<String>, record: LookupRecord) -> Result<()> {
        self.items
            .write()
            .map_err(|e| VerimathError::Storage(e.to_string()))?
            .insert((partition_key.into(), sort_key.into()), record);
        Ok(())
    }
}

#[async_trait]
impl DataLookup for MemoryLookup {
    async fn get_item(&self, partition_key: &str, sort_key: &str) -> Result<Option<LookupRecord>> {
        let items = self.items.read().map_err(|e| VerimathError::Storage(e.to_string()))?;
        Ok(items
            .get(&(partition_key.to_string(), sort_key.to_string()))
            .cloned())
    }
}
