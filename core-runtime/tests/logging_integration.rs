//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};

#[test]
fn test_init_logging_installs_once() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);

    assert!(init_logging(config.clone()).is_ok());
    // A global subscriber is already installed
    assert!(init_logging(config).is_err());

    tracing::info!(provider = "local_library", "logging ready");
}

#[test]
fn test_redaction_of_credentials() {
    assert_eq!(redact_if_sensitive("access_token", "ya29.a0"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("client_secret", "s3cr3t"), "[REDACTED]");
    assert_eq!(
        redact_if_sensitive("authorization", "Bearer ya29"),
        "[REDACTED]"
    );
}

#[test]
fn test_redaction_keeps_library_fields() {
    assert_eq!(redact_if_sensitive("provider", "remote_api"), "remote_api");
    assert_eq!(redact_if_sensitive("created", "12"), "12");
    assert_eq!(redact_if_sensitive("title", "Song Name"), "Song Name");
}

#[test]
fn test_email_redaction() {
    let redacted = redact_if_sensitive("owner", "listener@example.com");
    assert!(redacted.starts_with('l'));
    assert!(!redacted.contains("example.com"));
}
