//! Data-lookup trait and key conventions.

use async_trait::async_trait;

use crate::domain::LookupRecord;
use crate::error::Result;

/// Collaborator that fetches a stored item by partition/sort key.
///
/// A missing item is `Ok(None)`, not an error.
#[async_trait]
pub trait DataLookup: Send + Sync {
    async fn get_item(&self, partition_key: &str, sort_key: &str) -> Result<Option<LookupRecord>>;
}

/// Partition key for a user's items.
pub fn user_partition_key(user_id: &str) -> String {
    format!("USER#{}", user_id)
}

/// Sort key for a stored pair.
pub fn pair_sort_key(pair_id: &str) -> String {
    format!("PAIR#{}", pair_id)
}
