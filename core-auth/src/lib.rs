//! # Authentication Module
//!
//! Provider identity and credential access for the sync engine.
//!
//! ## Overview
//!
//! - [`ProviderKind`]: the closed set of library providers, with the stable
//!   strings used at the storage boundary
//! - [`CredentialProvider`]: what adapters call to get a bearer token
//! - [`TokenManager`]: a `CredentialProvider` that caches OAuth tokens and
//!   refreshes them through a host-supplied [`TokenRefresher`]
//!
//! The browser-based sign-in flow stays with the host; it hands the
//! resulting tokens to [`TokenManager::set_tokens`].

pub mod credentials;
pub mod error;
pub mod types;

pub use credentials::{CredentialProvider, TokenManager, TokenRefresher};
pub use error::{AuthError, Result};
pub use types::{OAuthTokens, ProviderKind};
