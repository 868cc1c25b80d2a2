//! # Core Configuration Module
//!
//! Builder-based configuration for the library sync engine.
//!
//! ## Overview
//!
//! [`CoreConfig`] collects the host bridges and tuning knobs the engine
//! needs. The builder fails fast: missing required bridges produce
//! [`Error::CapabilityMissing`] with an actionable message, and out-of-range
//! values produce [`Error::Config`].
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - remote API access (desktop default: reqwest)
//! - `SettingsStore` - persisted sync timestamps (desktop default: SQLite)
//!
//! ## Optional Dependencies
//!
//! - `MediaLibrary` - on-device catalog; the local library provider is only
//!   available when one is injected
//! - `Clock` - wall clock used for staleness decisions (default: system clock)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CoreConfig, SyncConfig};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/path/to/library.db")
//!     .remote_api_base_url("https://api.example.com/v1")
//!     .http_client(Arc::new(MyHttpClient))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .sync(SyncConfig::default().with_page_size(100))
//!     .build()?;
//! ```
#![cfg_attr(
    not(feature = "desktop-shims"),
    doc = r#"
Missing bridges are reported when the desktop shims are disabled:

```should_panic
use core_runtime::config::CoreConfig;

let config = CoreConfig::builder()
    .database_path("/path/to/library.db")
    .build()
    .expect("Should fail - missing required bridges");
```
"#
)]

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, MediaLibrary, SettingsStore, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Tuning knobs for sync runs.
///
/// Defaults match the behavior users expect from the library screen: an
/// unforced "sync all" leaves a provider alone for five minutes after it
/// last completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Minimum age of a provider's last completion before an unforced
    /// `sync_all` runs it again.
    pub staleness_threshold: Duration,
    /// Items processed between cooperative yields.
    pub yield_every: usize,
    /// Bound on the local library's first page fetch.
    pub first_page_timeout: Duration,
    /// Attempts made for a rate-limited request before giving up.
    pub rate_limit_max_attempts: u32,
    /// Wait used when a 429 response carries no retry hint.
    pub rate_limit_fallback_delay: Duration,
    /// Items requested per page.
    pub page_size: u32,
    /// Preferred artwork edge length in pixels.
    pub artwork_target_size: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            staleness_threshold: Duration::from_secs(5 * 60),
            yield_every: 100,
            first_page_timeout: Duration::from_secs(60),
            rate_limit_max_attempts: 5,
            rate_limit_fallback_delay: Duration::from_secs(2),
            page_size: 50,
            artwork_target_size: 600,
        }
    }
}

impl SyncConfig {
    pub fn with_staleness_threshold(mut self, threshold: Duration) -> Self {
        self.staleness_threshold = threshold;
        self
    }

    pub fn with_yield_every(mut self, every: usize) -> Self {
        self.yield_every = every;
        self
    }

    pub fn with_first_page_timeout(mut self, timeout: Duration) -> Self {
        self.first_page_timeout = timeout;
        self
    }

    pub fn with_rate_limit(mut self, max_attempts: u32, fallback_delay: Duration) -> Self {
        self.rate_limit_max_attempts = max_attempts;
        self.rate_limit_fallback_delay = fallback_delay;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_artwork_target_size(mut self, size: u32) -> Self {
        self.artwork_target_size = size;
        self
    }

    /// Rejects values that would stall or spin a sync run.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("Page size must be greater than 0".to_string()));
        }

        if self.yield_every == 0 {
            return Err(Error::Config(
                "Yield interval must be greater than 0 items".to_string(),
            ));
        }

        if self.rate_limit_max_attempts == 0 {
            return Err(Error::Config(
                "Rate limit attempts must be at least 1".to_string(),
            ));
        }

        if self.first_page_timeout.is_zero() {
            return Err(Error::Config(
                "First page timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Core configuration for the library sync engine.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite library database
    pub database_path: PathBuf,

    /// Base URL of the remote music API; `None` disables the remote provider
    pub remote_api_base_url: Option<String>,

    /// HTTP client used by the remote provider
    pub http_client: Arc<dyn HttpClient>,

    /// Persisted sync timestamps
    pub settings_store: Arc<dyn SettingsStore>,

    /// On-device catalog; `None` disables the local library provider
    pub media_library: Option<Arc<dyn MediaLibrary>>,

    /// Wall clock for staleness decisions
    pub clock: Arc<dyn Clock>,

    /// Sync tuning
    pub sync: SyncConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("remote_api_base_url", &self.remote_api_base_url)
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field(
                "media_library",
                &self.media_library.as_ref().map(|_| "MediaLibrary { ... }"),
            )
            .field("sync", &self.sync)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        if let Some(url) = &self.remote_api_base_url {
            if url.trim().is_empty() {
                return Err(Error::Config(
                    "Remote API base URL cannot be empty".to_string(),
                ));
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(Error::Config(format!(
                    "Remote API base URL must be http(s): {}",
                    url
                )));
            }
        }

        self.sync.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for the remote API provider. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Mobile: inject the platform HTTP stack."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required to persist sync timestamps. \
                 Desktop: enable the 'desktop-shims' feature to use the default SqliteSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new().map_err(|e| {
        Error::Internal(format!("Failed to initialize default HttpClient: {}", e))
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use core_async::runtime::{Handle, Runtime};
    use std::thread;

    let candidate = database_path
        .parent()
        .map(|parent| parent.join("settings.db"))
        .unwrap_or_else(|| PathBuf::from("settings.db"));

    let init_store = |path: PathBuf| -> Result<_> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!(
                "Failed to create Tokio runtime for default settings store: {}",
                e
            ))
        })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // A runtime cannot be nested inside another; build the store on a
    // scratch thread when called from async code.
    let store = match Handle::try_current() {
        Ok(_) => {
            let path = candidate.clone();
            thread::spawn(move || init_store(path))
                .join()
                .map_err(|_| {
                    Error::Internal(
                        "Worker thread panicked while creating default SettingsStore".to_string(),
                    )
                })??
        }
        Err(_) => init_store(candidate)?,
    };

    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_database_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    remote_api_base_url: Option<String>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    media_library: Option<Arc<dyn MediaLibrary>>,
    clock: Option<Arc<dyn Clock>>,
    sync: Option<SyncConfig>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/path/to/library.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Enables the remote API provider against `url`.
    pub fn remote_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.remote_api_base_url = Some(url.into());
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the reqwest-based client is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the settings store implementation.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Enables the local library provider over `library`.
    pub fn media_library(mut self, library: Arc<dyn MediaLibrary>) -> Self {
        self.media_library = Some(library);
        self
    }

    /// Overrides the wall clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets sync tuning.
    pub fn sync(mut self, sync: SyncConfig) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// Fails if the database path is missing, a required bridge is missing
    /// and no desktop default is available, or any value is out of range.
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&database_path)?,
        };

        let config = CoreConfig {
            database_path,
            remote_api_base_url: self.remote_api_base_url,
            http_client,
            settings_store,
            media_library: self.media_library,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            sync: self.sync.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, HttpRequest, HttpResponse};

    struct MockHttpClient;

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Err(BridgeError::NotAvailable("offline".to_string()))
        }
    }

    struct MockSettingsStore;

    #[async_trait]
    impl SettingsStore for MockSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> std::result::Result<Option<String>, BridgeError> {
            Ok(None)
        }

        async fn set_i64(&self, _key: &str, _value: i64) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_i64(&self, _key: &str) -> std::result::Result<Option<i64>, BridgeError> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn has_key(&self, _key: &str) -> std::result::Result<bool, BridgeError> {
            Ok(false)
        }

        async fn list_keys(&self) -> std::result::Result<Vec<String>, BridgeError> {
            Ok(Vec::new())
        }
    }

    fn builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .database_path("/tmp/library.db")
            .http_client(Arc::new(MockHttpClient))
            .settings_store(Arc::new(MockSettingsStore))
    }

    #[test]
    fn test_sync_defaults() {
        let sync = SyncConfig::default();
        assert_eq!(sync.staleness_threshold, Duration::from_secs(300));
        assert_eq!(sync.yield_every, 100);
        assert_eq!(sync.first_page_timeout, Duration::from_secs(60));
        assert_eq!(sync.rate_limit_max_attempts, 5);
        assert_eq!(sync.page_size, 50);
    }

    #[test]
    fn test_build_with_bridges() {
        let config = builder()
            .remote_api_base_url("https://api.example.com/v1")
            .sync(SyncConfig::default().with_page_size(100))
            .build()
            .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/library.db"));
        assert_eq!(config.sync.page_size, 100);
        assert!(config.media_library.is_none());
    }

    #[test]
    fn test_missing_database_path() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(MockHttpClient))
            .settings_store(Arc::new(MockSettingsStore))
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Database path")));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_settings_store_is_capability_error() {
        let result = CoreConfig::builder()
            .database_path("/tmp/library.db")
            .http_client(Arc::new(MockHttpClient))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "SettingsStore")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_remote_url() {
        let result = builder().remote_api_base_url("ftp://example.com").build();
        assert!(matches!(result, Err(Error::Config(_))));

        let result = builder().remote_api_base_url("  ").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_zero_values() {
        for sync in [
            SyncConfig::default().with_page_size(0),
            SyncConfig::default().with_yield_every(0),
            SyncConfig::default().with_rate_limit(0, Duration::ZERO),
            SyncConfig::default().with_first_page_timeout(Duration::ZERO),
        ] {
            assert!(builder().sync(sync).build().is_err());
        }
    }

    #[test]
    fn test_zero_fallback_delay_is_allowed() {
        let config = builder()
            .sync(SyncConfig::default().with_rate_limit(3, Duration::ZERO))
            .build()
            .unwrap();
        assert_eq!(config.sync.rate_limit_fallback_delay, Duration::ZERO);
    }
}
