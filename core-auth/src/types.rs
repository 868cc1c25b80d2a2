use serde::{Deserialize, Serialize};
use std::fmt;

/// Library providers the engine can sync from.
///
/// The set is closed; the string form returned by [`as_str`](Self::as_str)
/// is what gets persisted and must never change for an existing variant.
///
/// # Examples
///
/// ```
/// use core_auth::ProviderKind;
///
/// let provider = ProviderKind::RemoteApi;
/// assert_eq!(provider.as_str(), "remote_api");
/// assert_eq!(ProviderKind::parse("remote_api"), Some(provider));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// The on-device music library
    LocalLibrary,
    /// The OAuth-backed remote music API
    RemoteApi,
}

impl ProviderKind {
    /// Every provider, in sync order.
    pub const ALL: [ProviderKind; 2] = [ProviderKind::LocalLibrary, ProviderKind::RemoteApi];

    /// Get the human-readable display name for this provider
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::LocalLibrary => "Local Library",
            ProviderKind::RemoteApi => "Remote API",
        }
    }

    /// Stable identifier used in storage and settings keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::LocalLibrary => "local_library",
            ProviderKind::RemoteApi => "remote_api",
        }
    }

    /// Parse a provider kind from its stored identifier.
    ///
    /// ```
    /// use core_auth::ProviderKind;
    ///
    /// assert_eq!(ProviderKind::parse("local_library"), Some(ProviderKind::LocalLibrary));
    /// assert_eq!(ProviderKind::parse("invalid"), None);
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "local_library" => Some(ProviderKind::LocalLibrary),
            "remote_api" => Some(ProviderKind::RemoteApi),
            _ => None,
        }
    }

    /// The local library is authoritative for artwork and wins dedup
    /// survivor selection.
    pub fn is_primary(&self) -> bool {
        matches!(self, ProviderKind::LocalLibrary)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth 2.0 token set.
///
/// # Security
///
/// The `Debug` implementation redacts both tokens.
///
/// ```
/// use core_auth::OAuthTokens;
///
/// let tokens = OAuthTokens::new("ya29.a0", Some("1//0g".to_string()), 3600);
/// assert!(!tokens.is_expired());
/// assert!(!format!("{:?}", tokens).contains("ya29"));
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// The access token used for API requests
    pub access_token: String,
    /// The refresh token, if the provider issued one
    pub refresh_token: Option<String>,
    /// When the access token expires (UTC)
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl OAuthTokens {
    /// Create a token set expiring `expires_in` seconds from now.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(expires_in),
        }
    }

    /// Expired, or expiring within the default five minute buffer.
    pub fn is_expired(&self) -> bool {
        self.is_expired_with_buffer(300)
    }

    /// Expired, or expiring within `buffer_seconds`.
    pub fn is_expired_with_buffer(&self, buffer_seconds: i64) -> bool {
        let now = chrono::Utc::now();
        let buffer = chrono::Duration::seconds(buffer_seconds);
        now >= self.expires_at - buffer
    }
}

impl fmt::Debug for OAuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthTokens")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
