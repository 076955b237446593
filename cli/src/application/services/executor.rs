//! Command execution helpers layered on the [`RemoteShell`] port.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::time::Duration;

use crate::application::ports::{CommandOutcome, RemoteShell};
use crate::domain::error::ExecError;

/// Longest diagnostic carried in a [`ExecError::NonZeroExit`].
const EXCERPT_CHARS: usize = 800;

/// Keep the tail of `text`: package managers print the cause last.
fn excerpt(text: &str) -> String {
    let count = text.chars().count();
    if count <= EXCERPT_CHARS {
        return text.to_string();
    }
    let tail: String = text.chars().skip(count - EXCERPT_CHARS).collect();
    format!("…{tail}")
}

/// Run `script` and require exit status 0.
///
/// # Errors
///
/// Returns [`ExecError::NonZeroExit`] carrying the best available diagnostic
/// (stderr, then stdout, then the exit code), or any error from the shell.
pub async fn run_checked(
    shell: &impl RemoteShell,
    label: &str,
    script: &str,
    timeout: Duration,
) -> Result<CommandOutcome, ExecError> {
    tracing::debug!(command = label, timeout_secs = timeout.as_secs(), "running remote command");
    let outcome = shell.exec(label, script, timeout).await?;
    tracing::debug!(command = label, exit_code = outcome.exit_code, "remote command finished");
    if outcome.success() {
        return Ok(outcome);
    }
    Err(ExecError::NonZeroExit {
        context: label.to_string(),
        code: outcome.exit_code,
        excerpt: excerpt(&outcome.diagnostic()),
    })
}

/// Run a read-only check; `true` when it exits 0.
///
/// # Errors
///
/// Returns an error only when the command could not be run to completion.
pub async fn probe(
    shell: &impl RemoteShell,
    label: &str,
    script: &str,
    timeout: Duration,
) -> Result<bool, ExecError> {
    let outcome = shell.exec(label, script, timeout).await?;
    tracing::debug!(check = label, exit_code = outcome.exit_code, "remote check finished");
    Ok(outcome.success())
}
