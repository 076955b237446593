//! Application service: connectivity probe use-case.
//!
//! Connects, gathers a few read-only facts, disconnects. Changes nothing on
//! the host. Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;
use siteforge_common::{HostFacts, ProbeReport};

use crate::application::ports::{CommandOutcome, RemoteShell, SessionConnector};
use crate::domain::config::TimeoutConfig;
use crate::domain::error::ExecError;
use crate::domain::site::ConnectionSpec;

const OS_SCRIPT: &str = r#"(. /etc/os-release 2>/dev/null && echo "$PRETTY_NAME") || uname -sr"#;
const MEMORY_SCRIPT: &str = r#"awk '/^MemTotal:/ {printf "%d MB\n", $2 / 1024}' /proc/meminfo"#;
const DISK_SCRIPT: &str = "df -h / | awk 'NR==2 {print $4}'";

fn fact(outcome: Result<CommandOutcome, ExecError>) -> Result<String> {
    let outcome = outcome?;
    let value = outcome.stdout_trimmed();
    if !outcome.success() || value.is_empty() {
        return Ok("unknown".to_string());
    }
    Ok(value.to_string())
}

/// Gather OS, memory and free disk concurrently over one session.
///
/// # Errors
///
/// Returns an error if a command could not be run at all; a command that
/// runs but fails yields `"unknown"` for that fact.
pub async fn gather_host_facts(shell: &impl RemoteShell, timeouts: &TimeoutConfig) -> Result<HostFacts> {
    let quick = timeouts.quick();
    let (os, memory, disk) = tokio::join!(
        shell.exec("reading OS release", OS_SCRIPT, quick),
        shell.exec("reading memory size", MEMORY_SCRIPT, quick),
        shell.exec("reading free disk", DISK_SCRIPT, quick),
    );
    Ok(HostFacts {
        os: fact(os)?,
        memory: fact(memory)?,
        free_disk: fact(disk)?,
    })
}

/// Check that `spec` can log in, and describe the host.
///
/// Never fails: unreachable hosts yield a report with `success = false`
/// and the reason.
pub async fn probe_host(
    connector: &impl SessionConnector,
    spec: &ConnectionSpec,
    timeouts: &TimeoutConfig,
) -> ProbeReport {
    let session = match connector.open(spec).await {
        Ok(session) => session,
        Err(err) => {
            tracing::info!(host = %spec.host, "probe failed: {err}");
            return ProbeReport::unreachable(err.to_string());
        }
    };
    let facts = gather_host_facts(&session, timeouts).await;
    session.close().await;
    match facts {
        Ok(facts) => ProbeReport::reachable(facts),
        Err(err) => ProbeReport::unreachable(format!("{err:#}")),
    }
}
