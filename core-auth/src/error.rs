use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("Token refresh timed out after {0}s")]
    RefreshTimeout(u64),

    #[error("No refresh token available for {0}")]
    NoRefreshToken(String),

    #[error("Invalid provider: {0}")]
    InvalidProvider(String),

    #[error("Not authenticated")]
    NotAuthenticated,
}

pub type Result<T> = std::result::Result<T, AuthError>;
