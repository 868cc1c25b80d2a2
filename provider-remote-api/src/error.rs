//! Error types for the remote catalog provider

use core_sync::SyncError;
use thiserror::Error;

/// Remote catalog errors
#[derive(Error, Debug)]
pub enum RemoteApiError {
    /// No usable access token
    #[error("Authentication failed: {0}")]
    Unauthenticated(String),

    /// API answered with a non-2xx status
    #[error("Remote API error (status {status}): {message}")]
    Http { status: u16, message: String },

    /// Still rate limited after the last attempt
    #[error("Rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Body did not match the expected shape
    #[error("Failed to parse API response: {0}")]
    InvalidResponse(String),

    #[error(transparent)]
    Bridge(#[from] bridge_traits::error::BridgeError),
}

/// Result type for remote catalog operations
pub type Result<T> = std::result::Result<T, RemoteApiError>;

impl From<core_auth::AuthError> for RemoteApiError {
    fn from(error: core_auth::AuthError) -> Self {
        RemoteApiError::Unauthenticated(error.to_string())
    }
}

impl From<RemoteApiError> for SyncError {
    fn from(error: RemoteApiError) -> Self {
        match error {
            RemoteApiError::Unauthenticated(msg) => SyncError::Unauthenticated(msg),
            RemoteApiError::Http { status, message } => SyncError::Http { status, message },
            RemoteApiError::RateLimited { attempts } => SyncError::RateLimited { attempts },
            RemoteApiError::InvalidResponse(msg) => SyncError::InvalidResponse(msg),
            RemoteApiError::Bridge(e) => SyncError::Bridge(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RemoteApiError::Http {
            status: 404,
            message: "Not Found".to_string(),
        };

        assert_eq!(error.to_string(), "Remote API error (status 404): Not Found");
    }

    #[test]
    fn test_error_conversion() {
        let error: SyncError = RemoteApiError::RateLimited { attempts: 5 }.into();
        assert!(matches!(error, SyncError::RateLimited { attempts: 5 }));

        let error: SyncError = RemoteApiError::Http {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(matches!(error, SyncError::Http { status: 500, .. }));
    }
}
