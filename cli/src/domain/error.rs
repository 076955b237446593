//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application` or `tokio`. All error types implement
//! `thiserror::Error` and convert to `anyhow::Error` via the `?` operator.

use std::time::Duration;

use thiserror::Error;

// ── Input errors ──────────────────────────────────────────────────────────────

/// Rejected installation or connection input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SiteError {
    #[error("Invalid domain '{0}': expected a fully-qualified hostname such as example.com")]
    InvalidDomain(String),

    #[error("Invalid admin username '{0}': use 3-60 characters from A-Z a-z 0-9 _ . @ -")]
    InvalidAdminUser(String),

    #[error("Invalid admin email '{0}'")]
    InvalidEmail(String),

    #[error("Invalid site title: {0}")]
    InvalidTitle(String),

    #[error("Unsupported PHP version '{requested}'\n\nSupported versions: {supported}")]
    UnsupportedPhp { requested: String, supported: String },

    #[error("Invalid SSH host '{0}'")]
    InvalidHost(String),

    #[error("No SSH credential given. Pass --password (or SITEFORGE_SSH_PASSWORD) or --identity <file>")]
    MissingCredential,
}

// ── Session errors ────────────────────────────────────────────────────────────

/// Failure to establish a remote session. Always fatal: no stage has run yet.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("authentication failed for {user}@{host}")]
    Auth { user: String, host: String },

    #[error("cannot reach {host}:{port}: {reason}")]
    Network {
        host: String,
        port: u16,
        reason: String,
    },

    #[error("connection to {host}:{port} timed out after {secs}s")]
    Timeout { host: String, port: u16, secs: u64 },

    #[error("host key for {host} does not match the pinned key in {known_hosts}")]
    HostKeyRejected { host: String, known_hosts: String },

    #[error("connection to {host} closed before the session was ready")]
    ClosedBeforeReady { host: String },

    #[error("cannot load private key: {0}")]
    InvalidKey(String),
}

// ── Command errors ────────────────────────────────────────────────────────────

/// Failure of a single remote command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("{context} failed (exit code {code}): {excerpt}")]
    NonZeroExit {
        context: String,
        code: i32,
        excerpt: String,
    },

    #[error("{context} timed out after {}s", timeout.as_secs())]
    Timeout { context: String, timeout: Duration },

    #[error("remote session is already closed")]
    SessionUnavailable,

    #[error("{context} finished without reporting an exit status")]
    MissingExitStatus { context: String },

    #[error("{context}: {reason}")]
    Transport { context: String, reason: String },
}

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Provisioning failures that are not a single failed command.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProvisionError {
    #[error("nginx rejected the site configuration:\n{0}")]
    ConfigValidation(String),

    #[error("{domain} does not resolve to any address")]
    DomainUnresolved { domain: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors in `config.yaml` contents.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("php.default_version '{default}' is not listed in php.supported_versions ({supported})")]
    DefaultPhpUnsupported { default: String, supported: String },

    #[error("{key} must be greater than zero")]
    ZeroTimeout { key: &'static str },

    #[error("php.supported_versions entry '{version}' is not of the form MAJOR.MINOR")]
    InvalidPhpVersion { version: String },

    #[error("{key} '{value}' is not a php.ini size such as 64M")]
    InvalidSize { key: &'static str, value: String },

    #[error("{key} '{value}' must be an absolute path of letters, digits, '.', '_', '-' and '/'")]
    InvalidPath { key: &'static str, value: String },
}
