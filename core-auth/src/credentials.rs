//! Credential access for provider adapters.
//!
//! Adapters only ever see [`CredentialProvider::access_token`]. The
//! [`TokenManager`] behind it keeps the current [`OAuthTokens`] in memory,
//! refreshes them shortly before expiry and makes sure concurrent callers
//! trigger a single refresh.

use crate::error::{AuthError, Result};
use crate::types::{OAuthTokens, ProviderKind};
use async_trait::async_trait;
use core_async::sync::{Mutex, RwLock};
use core_async::time::{timeout, Duration};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Tokens expiring within this window are refreshed before use.
const TOKEN_REFRESH_BUFFER: Duration = Duration::from_secs(5 * 60);

/// Upper bound for a single refresh round trip.
const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplies bearer tokens to adapters.
///
/// Implementations refresh transparently; an error means the sync must
/// fail as unauthenticated.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// Exchanges a refresh token for a new token set.
///
/// Implemented by the host, which owns the OAuth client configuration.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens>;
}

/// Caching, refreshing [`CredentialProvider`] for one provider.
pub struct TokenManager {
    provider: ProviderKind,
    tokens: RwLock<Option<OAuthTokens>>,
    refresher: Arc<dyn TokenRefresher>,
    refresh_lock: Mutex<()>,
    event_bus: Option<EventBus>,
    refresh_timeout: Duration,
}

impl TokenManager {
    pub fn new(provider: ProviderKind, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            provider,
            tokens: RwLock::new(None),
            refresher,
            refresh_lock: Mutex::new(()),
            event_bus: None,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Publish refresh outcomes on `bus`.
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn with_refresh_timeout(mut self, refresh_timeout: Duration) -> Self {
        self.refresh_timeout = refresh_timeout;
        self
    }

    /// Installs tokens obtained by the host's sign-in flow.
    pub async fn set_tokens(&self, tokens: OAuthTokens) {
        debug!(provider = %self.provider, "Storing tokens");
        *self.tokens.write().await = Some(tokens);
    }

    /// Forgets the current tokens; later calls fail as unauthenticated.
    pub async fn clear(&self) {
        *self.tokens.write().await = None;
    }

    pub async fn has_tokens(&self) -> bool {
        self.tokens.read().await.is_some()
    }

    fn emit(&self, event: AuthEvent) {
        if let Some(bus) = &self.event_bus {
            let _ = bus.emit(CoreEvent::Auth(event));
        }
    }

    fn fail(&self, err: AuthError) -> AuthError {
        self.emit(AuthEvent::AuthError {
            provider: self.provider.as_str().to_string(),
            message: err.to_string(),
        });
        err
    }

    async fn current(&self) -> Result<OAuthTokens> {
        self.tokens
            .read()
            .await
            .clone()
            .ok_or(AuthError::NotAuthenticated)
    }

    #[instrument(skip(self), fields(provider = %self.provider))]
    async fn refresh(&self) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock.
        let tokens = self.current().await?;
        if !tokens.is_expired_with_buffer(TOKEN_REFRESH_BUFFER.as_secs() as i64) {
            return Ok(tokens.access_token);
        }

        let refresh_token = tokens.refresh_token.clone().ok_or_else(|| {
            error!("No refresh token available");
            self.fail(AuthError::NoRefreshToken(self.provider.as_str().to_string()))
        })?;

        info!("Token expired or expiring soon, refreshing");

        let refreshed = match timeout(self.refresh_timeout, self.refresher.refresh(&refresh_token))
            .await
        {
            Ok(Ok(refreshed)) => refreshed,
            Ok(Err(e)) => {
                error!(error = %e, "Token refresh failed");
                return Err(self.fail(e));
            }
            Err(_) => {
                error!("Token refresh timed out");
                return Err(self.fail(AuthError::RefreshTimeout(
                    self.refresh_timeout.as_secs(),
                )));
            }
        };

        // Providers may omit the refresh token when it did not rotate.
        let refreshed = OAuthTokens {
            refresh_token: refreshed.refresh_token.or(Some(refresh_token)),
            ..refreshed
        };
        let access_token = refreshed.access_token.clone();
        let expires_at = refreshed.expires_at.timestamp();
        *self.tokens.write().await = Some(refreshed);

        self.emit(AuthEvent::TokenRefreshed {
            provider: self.provider.as_str().to_string(),
            expires_at,
        });
        info!("Token refreshed successfully");

        Ok(access_token)
    }
}

#[async_trait]
impl CredentialProvider for TokenManager {
    async fn access_token(&self) -> Result<String> {
        let tokens = match self.current().await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(provider = %self.provider, "No tokens available");
                return Err(e);
            }
        };

        if !tokens.is_expired_with_buffer(TOKEN_REFRESH_BUFFER.as_secs() as i64) {
            return Ok(tokens.access_token);
        }

        self.refresh().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};

    mock! {
        Refresher {}

        #[async_trait]
        impl TokenRefresher for Refresher {
            async fn refresh(&self, refresh_token: &str) -> Result<OAuthTokens>;
        }
    }

    fn expired(refresh: Option<&str>) -> OAuthTokens {
        OAuthTokens {
            access_token: "old".to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Utc::now() - chrono::Duration::minutes(1),
        }
    }

    #[core_async::test]
    async fn test_missing_tokens_is_not_authenticated() {
        let manager = TokenManager::new(ProviderKind::RemoteApi, Arc::new(MockRefresher::new()));
        assert!(matches!(
            manager.access_token().await,
            Err(AuthError::NotAuthenticated)
        ));
    }

    #[core_async::test]
    async fn test_fresh_token_is_returned_without_refresh() {
        let mut refresher = MockRefresher::new();
        refresher.expect_refresh().never();

        let manager = TokenManager::new(ProviderKind::RemoteApi, Arc::new(refresher));
        manager
            .set_tokens(OAuthTokens::new("fresh", Some("r".to_string()), 3600))
            .await;

        assert_eq!(manager.access_token().await.unwrap(), "fresh");
    }

    #[core_async::test]
    async fn test_expired_token_is_refreshed_and_event_emitted() {
        let mut refresher = MockRefresher::new();
        refresher
            .expect_refresh()
            .withf(|token| token == "refresh-1")
            .times(1)
            .returning(|_| Ok(OAuthTokens::new("new", None, 3600)));

        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let manager = TokenManager::new(ProviderKind::RemoteApi, Arc::new(refresher))
            .with_event_bus(bus);
        manager.set_tokens(expired(Some("refresh-1"))).await;

        assert_eq!(manager.access_token().await.unwrap(), "new");
        // Second call uses the cached refreshed token
        assert_eq!(manager.access_token().await.unwrap(), "new");

        match rx.recv().await.unwrap() {
            CoreEvent::Auth(AuthEvent::TokenRefreshed { provider, .. }) => {
                assert_eq!(provider, "remote_api")
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[core_async::test]
    async fn test_missing_refresh_token_fails() {
        let manager = TokenManager::new(ProviderKind::RemoteApi, Arc::new(MockRefresher::new()));
        manager.set_tokens(expired(None)).await;

        assert!(matches!(
            manager.access_token().await,
            Err(AuthError::NoRefreshToken(_))
        ));
    }

    #[core_async::test]
    async fn test_refresh_failure_emits_auth_error() {
        let mut refresher = MockRefresher::new();
        refresher
            .expect_refresh()
            .returning(|_| Err(AuthError::TokenRefreshFailed("invalid_grant".to_string())));

        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let manager = TokenManager::new(ProviderKind::RemoteApi, Arc::new(refresher))
            .with_event_bus(bus);
        manager.set_tokens(expired(Some("r"))).await;

        assert!(matches!(
            manager.access_token().await,
            Err(AuthError::TokenRefreshFailed(_))
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            CoreEvent::Auth(AuthEvent::AuthError { .. })
        ));
    }

    struct SlowRefresher;

    #[async_trait]
    impl TokenRefresher for SlowRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<OAuthTokens> {
            core_async::time::sleep(Duration::from_secs(5)).await;
            Ok(OAuthTokens::new("late", None, 3600))
        }
    }

    #[core_async::test]
    async fn test_refresh_timeout() {
        let manager = TokenManager::new(ProviderKind::RemoteApi, Arc::new(SlowRefresher))
            .with_refresh_timeout(Duration::from_millis(20));
        manager.set_tokens(expired(Some("r"))).await;

        assert!(matches!(
            manager.access_token().await,
            Err(AuthError::RefreshTimeout(_))
        ));
    }

    struct CountingRefresher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<OAuthTokens> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            core_async::time::sleep(Duration::from_millis(20)).await;
            Ok(OAuthTokens::new("shared", None, 3600))
        }
    }

    #[core_async::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicUsize::new(0),
        });
        let manager = Arc::new(TokenManager::new(ProviderKind::RemoteApi, refresher.clone()));
        manager.set_tokens(expired(Some("r"))).await;

        let a = core_async::task::spawn({
            let manager = manager.clone();
            async move { manager.access_token().await }
        });
        let b = core_async::task::spawn({
            let manager = manager.clone();
            async move { manager.access_token().await }
        });

        assert_eq!(a.await.unwrap().unwrap(), "shared");
        assert_eq!(b.await.unwrap().unwrap(), "shared");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }
}
