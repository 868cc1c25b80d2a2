use bridge_traits::BridgeError;
use core_auth::{AuthError, ProviderKind};
use core_library::LibraryError;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Source did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Library error: {0}")]
    Library(#[source] LibraryError),

    #[error("Commit failed: {0}")]
    Commit(#[source] LibraryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Provider {0} is not connected")]
    ProviderNotConnected(ProviderKind),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LibraryError> for SyncError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Unavailable(message) => SyncError::StorageUnavailable(message),
            other => SyncError::Library(other),
        }
    }
}

impl From<AuthError> for SyncError {
    fn from(err: AuthError) -> Self {
        SyncError::Unauthenticated(err.to_string())
    }
}

impl SyncError {
    /// Storage errors that end the whole provider run rather than one phase.
    pub fn aborts_run(&self) -> bool {
        matches!(self, SyncError::Commit(_) | SyncError::StorageUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
