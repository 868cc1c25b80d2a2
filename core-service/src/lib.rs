//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges (HTTP, settings, device media
//! library, clock) into the sync engine: it opens the library database,
//! builds one adapter per enabled provider and hands them to a
//! [`SyncOrchestrator`]. Desktop apps typically enable the `desktop-shims`
//! feature so missing HTTP and settings bridges fall back to the
//! `bridge-desktop` defaults.
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .database_path(data_dir.join("library.db"))
//!     .media_library(device_library)
//!     .remote_api_base_url("https://api.example.com/v1")
//!     .build()?;
//!
//! let core = CoreService::bootstrap(config, Some(token_manager)).await?;
//! let report = core.sync_all(false).await;
//! ```

pub mod error;

pub use error::{CoreError, Result};
pub use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};

use std::sync::Arc;

use core_auth::{CredentialProvider, ProviderKind};
use core_library::{create_pool, DatabaseConfig, LibraryStore, ProviderPurge, SqliteLibraryStore};
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use core_sync::{
    CatalogAdapter, ProviderAdapter, ProviderRunReport, ProviderSyncStatus, SyncAllReport,
    SyncOrchestrator,
};
use provider_local_library::LocalLibraryCatalog;
use provider_remote_api::RemoteApiCatalog;
use tracing::{info, warn};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: CoreConfig,
    store: Arc<SqliteLibraryStore>,
    orchestrator: Arc<SyncOrchestrator>,
    event_bus: EventBus,
}

impl CoreService {
    /// Opens the library and connects every provider the configuration enables.
    ///
    /// The remote provider needs both a base URL and `credentials`; with only
    /// the URL it stays disconnected until [`connect_remote_api`](Self::connect_remote_api).
    pub async fn bootstrap(
        config: CoreConfig,
        credentials: Option<Arc<dyn CredentialProvider>>,
    ) -> Result<Self> {
        config.validate()?;

        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        let store = Arc::new(SqliteLibraryStore::new(pool));
        let event_bus = EventBus::default();

        let orchestrator = Arc::new(SyncOrchestrator::new(
            store.clone(),
            config.settings_store.clone(),
            config.clock.clone(),
            event_bus.clone(),
            &config.sync,
        ));

        let service = Self {
            config,
            store,
            orchestrator,
            event_bus,
        };

        if let Some(library) = service.config.media_library.clone() {
            let catalog = LocalLibraryCatalog::new(library, &service.config.sync);
            service.register(Arc::new(catalog)).await;
        }

        match credentials {
            Some(credentials) => service.connect_remote_api(credentials).await?,
            None if service.config.remote_api_base_url.is_some() => {
                info!("Remote API configured without credentials, waiting for sign-in");
            }
            None => {}
        }

        service.orchestrator.restore().await?;

        info!(
            providers = ?service.orchestrator.connected_providers().await,
            "Core service ready"
        );
        Ok(service)
    }

    async fn register(&self, source: Arc<dyn core_sync::CatalogSource>) {
        let adapter: Arc<dyn ProviderAdapter> = Arc::new(CatalogAdapter::new(
            source,
            &self.config.sync,
            self.config.clock.clone(),
        ));
        self.orchestrator.register_adapter(adapter).await;
    }

    /// Connects the remote provider after the host's sign-in completes.
    pub async fn connect_remote_api(&self, credentials: Arc<dyn CredentialProvider>) -> Result<()> {
        let Some(base_url) = self.config.remote_api_base_url.clone() else {
            warn!("Remote API credentials supplied but no base URL is configured");
            return Err(CoreError::InitializationFailed(
                "remote API base URL is not configured".to_string(),
            ));
        };

        let catalog = RemoteApiCatalog::new(
            self.config.http_client.clone(),
            credentials,
            base_url,
            &self.config.sync,
        );
        self.register(Arc::new(catalog)).await;
        Ok(())
    }

    pub fn orchestrator(&self) -> Arc<SyncOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    pub fn library(&self) -> Arc<dyn LibraryStore> {
        self.store.clone()
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    pub async fn sync_all(&self, force: bool) -> SyncAllReport {
        self.orchestrator.sync_all(force).await
    }

    pub async fn sync_source(&self, provider: ProviderKind) -> Result<ProviderRunReport> {
        Ok(self.orchestrator.sync_source(provider).await?)
    }

    pub async fn disconnect(&self, provider: ProviderKind) -> Result<ProviderPurge> {
        Ok(self.orchestrator.disconnect(provider).await?)
    }

    pub async fn statuses(&self) -> Vec<(ProviderKind, ProviderSyncStatus)> {
        self.orchestrator.statuses().await
    }

    /// Waits for queued runs to finish, then closes the database.
    ///
    /// Requests made afterwards fail with a storage-unavailable error.
    pub async fn shutdown(&self) {
        let _ticket = self.orchestrator.wait_idle().await;
        self.store.pool().close().await;
        info!("Core service shut down");
    }
}
