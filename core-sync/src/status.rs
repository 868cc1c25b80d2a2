//! # Provider Sync Status
//!
//! ```text
//! Idle ──> Syncing ──> Completed(at)
//!   ^         │  ^          │
//!   │         v  └──────────┘
//!   └──── Error(msg) ──> Syncing
//!   dismiss
//! ```
//!
//! Transitions consume the current status and return the next one, or
//! [`SyncError::InvalidStateTransition`] when the move is not allowed.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sync status of one provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum ProviderSyncStatus {
    #[default]
    Idle,
    Syncing,
    /// Last run finished; `at` is Unix seconds.
    Completed { at: i64 },
    Error { message: String },
}

impl ProviderSyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderSyncStatus::Idle => "idle",
            ProviderSyncStatus::Syncing => "syncing",
            ProviderSyncStatus::Completed { .. } => "completed",
            ProviderSyncStatus::Error { .. } => "error",
        }
    }

    pub fn is_syncing(&self) -> bool {
        matches!(self, ProviderSyncStatus::Syncing)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ProviderSyncStatus::Error { message } => Some(message),
            _ => None,
        }
    }

    fn invalid(&self, to: &str) -> SyncError {
        SyncError::InvalidStateTransition {
            from: self.as_str().to_string(),
            to: to.to_string(),
        }
    }

    /// Any settled state may start a run.
    pub fn begin(self) -> Result<Self> {
        match self {
            ProviderSyncStatus::Syncing => Err(self.invalid("syncing")),
            _ => Ok(ProviderSyncStatus::Syncing),
        }
    }

    pub fn complete(self, at: i64) -> Result<Self> {
        match self {
            ProviderSyncStatus::Syncing => Ok(ProviderSyncStatus::Completed { at }),
            other => Err(other.invalid("completed")),
        }
    }

    pub fn fail(self, message: impl Into<String>) -> Result<Self> {
        match self {
            ProviderSyncStatus::Syncing => Ok(ProviderSyncStatus::Error {
                message: message.into(),
            }),
            other => Err(other.invalid("error")),
        }
    }

    /// Clears an error. Other states are returned unchanged.
    pub fn dismiss(self) -> Self {
        match self {
            ProviderSyncStatus::Error { .. } => ProviderSyncStatus::Idle,
            other => other,
        }
    }
}

impl fmt::Display for ProviderSyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSyncStatus::Completed { at } => write!(f, "completed at {}", at),
            ProviderSyncStatus::Error { message } => write!(f, "error: {}", message),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let status = ProviderSyncStatus::Idle.begin().unwrap();
        assert!(status.is_syncing());
        let status = status.complete(42).unwrap();
        assert_eq!(status, ProviderSyncStatus::Completed { at: 42 });

        // Completed and error both re-enter syncing
        let status = status.begin().unwrap().fail("HTTP 500").unwrap();
        assert_eq!(status.error_message(), Some("HTTP 500"));
        assert!(status.begin().unwrap().is_syncing());
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(ProviderSyncStatus::Syncing.begin().is_err());
        assert!(ProviderSyncStatus::Idle.complete(1).is_err());
        assert!(matches!(
            ProviderSyncStatus::Completed { at: 1 }.fail("x"),
            Err(SyncError::InvalidStateTransition { .. })
        ));
    }

    #[test]
    fn test_dismiss_only_clears_errors() {
        let error = ProviderSyncStatus::Error {
            message: "boom".to_string(),
        };
        assert_eq!(error.dismiss(), ProviderSyncStatus::Idle);
        assert_eq!(
            ProviderSyncStatus::Completed { at: 5 }.dismiss(),
            ProviderSyncStatus::Completed { at: 5 }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_string(&ProviderSyncStatus::Completed { at: 7 }).unwrap();
        assert_eq!(json, r#"{"state":"completed","at":7}"#);
    }
}
