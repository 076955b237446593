//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared wire types,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use siteforge_common::StreamRecord;

use crate::domain::config::SiteforgeConfig;
use crate::domain::error::{ConnectionError, ExecError};
use crate::domain::site::ConnectionSpec;

// ── Value Types ───────────────────────────────────────────────────────────────

/// Captured result of one remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutcome {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Trimmed stdout, for comparisons.
    #[must_use]
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }

    /// Best available diagnostic: stderr, else stdout, else the exit code.
    /// Never empty.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit code {}", self.exit_code)
    }
}

// ── Remote Session Ports ──────────────────────────────────────────────────────

/// One authenticated shell session on the target host.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    /// Run `script` through the remote user's shell and capture its output.
    ///
    /// `label` names the operation in errors and logs; `script` itself may
    /// carry secrets and is never logged. A non-zero exit is *not* an error
    /// here; callers decide.
    ///
    /// # Errors
    ///
    /// `Timeout` when `timeout` elapses (the remote process may still be
    /// running), `SessionUnavailable` after `close`, `MissingExitStatus` when
    /// the channel closed without an exit status, `Transport` otherwise.
    async fn exec(
        &self,
        label: &str,
        script: &str,
        timeout: Duration,
    ) -> Result<CommandOutcome, ExecError>;

    /// Close the session. Safe to call more than once; never fails.
    async fn close(&self);
}

/// Opens [`RemoteShell`] sessions.
#[allow(async_fn_in_trait)]
pub trait SessionConnector {
    type Session: RemoteShell;

    /// Connect and authenticate, bounded by the configured ceiling.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] for auth, network, timeout, host key, or
    /// premature close failures. No transport is left open on error.
    async fn open(&self, spec: &ConnectionSpec) -> Result<Self::Session, ConnectionError>;
}

// ── Name Resolution Port ──────────────────────────────────────────────────────

/// Resolves public hostnames, as a certificate authority would see them.
#[allow(async_fn_in_trait)]
pub trait DnsResolver {
    /// All addresses for `hostname`; empty when it does not resolve.
    async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Write-only stream of installation records. Sync trait.
///
/// Implementations must tolerate their reader going away at any time:
/// `emit` then becomes a no-op and never fails the run.
pub trait ProgressSink {
    fn emit(&self, record: StreamRecord);
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Loads the effective configuration.
pub trait ConfigStore {
    /// Load config, falling back to defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<SiteforgeConfig>;

    /// Path of the config file, whether or not it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}
