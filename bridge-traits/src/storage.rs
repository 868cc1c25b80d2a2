//! Preference Storage Abstraction
//!
//! Small typed key-value store. The sync orchestrator keeps its per-provider
//! last-completed timestamps and the last full-sync timestamp here so that
//! staleness decisions survive restarts.

use async_trait::async_trait;

use crate::error::Result;

/// Key-value settings storage
///
/// Implementations must be safe to call concurrently and should treat a
/// type mismatch on read as an error rather than silently converting.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_sync(store: &dyn SettingsStore, at: i64) -> Result<()> {
///     store.set_i64("sync.last_full_sync", at).await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys in lexical order
    async fn list_keys(&self) -> Result<Vec<String>>;
}
