//! JSON output helpers.
//!
//! Error objects for failed `--json` commands, and the line-per-record
//! encoding of the installation stream.

use anyhow::{Context, Result};
use serde::Serialize;
use siteforge_common::StreamRecord;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails (should not happen in
/// practice: `serde_json` only fails on non-finite floats and maps with
/// non-string keys, neither of which appear here).
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// One stream record as a single line of JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn record_line(record: &StreamRecord) -> Result<String> {
    serde_json::to_string(record).context("JSON serialization failed")
}

/// Renders values as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Print `value` as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render<T: Serialize>(&self, value: &T) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }
}
