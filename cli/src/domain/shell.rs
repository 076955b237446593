//! Pure builders for remote shell command text.
//!
//! Values that did not come from a validated identifier are quoted with
//! `shell-escape`. File and SQL payloads travel in quoted here-documents so
//! the shell never expands anything inside them.

use std::borrow::Cow;

use anyhow::Result;

/// Delimiter for file payloads.
pub const FILE_DELIMITER: &str = "SITEFORGE_EOF";

/// Delimiter for SQL payloads.
pub const SQL_DELIMITER: &str = "SITEFORGE_SQL";

/// Quote `value` for a POSIX shell.
#[must_use]
pub fn quote(value: &str) -> String {
    shell_escape::unix::escape(Cow::Borrowed(value)).into_owned()
}

/// `apt-get install` for `packages`, non-interactive.
#[must_use]
pub fn apt_install(packages: &[&str]) -> String {
    format!(
        "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y {}",
        packages.join(" ")
    )
}

/// `apt-get update`, non-interactive.
#[must_use]
pub fn apt_update() -> String {
    "sudo DEBIAN_FRONTEND=noninteractive apt-get update -y".to_string()
}

/// Enable a systemd unit at boot and start it now. Idempotent.
#[must_use]
pub fn enable_service(unit: &str) -> String {
    format!("sudo systemctl enable --now {unit}")
}

/// Exit status 0 when `binary` is on `PATH`.
#[must_use]
pub fn binary_present(binary: &str) -> String {
    format!("command -v {binary} >/dev/null 2>&1")
}

fn heredoc(delimiter: &str, head: &str, chained: Option<&str>, body: &str) -> Result<String> {
    let body = body.trim_end_matches('\n');
    anyhow::ensure!(
        !body.lines().any(|l| l.trim() == delimiter),
        "payload contains the here-document delimiter {delimiter}"
    );
    // The body starts on the next line, so a follow-up command can be
    // chained on the redirect line itself.
    let chained = chained.map(|c| format!(" && {c}")).unwrap_or_default();
    Ok(format!("{head} <<'{delimiter}'{chained}\n{body}\n{delimiter}"))
}

/// Write `content` to `path` as root: stream it into a sibling temp file,
/// then rename over the target so readers never see a partial file.
///
/// # Errors
///
/// Returns an error if `content` contains a line equal to the delimiter.
pub fn write_file(path: &str, content: &str) -> Result<String> {
    let tmp = quote(&format!("{path}.siteforge-tmp"));
    let target = quote(path);
    heredoc(
        FILE_DELIMITER,
        &format!("sudo tee {tmp} > /dev/null"),
        Some(&format!("sudo mv -f {tmp} {target}")),
        content,
    )
}

/// Feed `sql` to the local MySQL server as root over the unix socket.
///
/// # Errors
///
/// Returns an error if `sql` contains a line equal to the delimiter.
pub fn mysql_script(sql: &str) -> Result<String> {
    heredoc(SQL_DELIMITER, "sudo mysql", None, sql)
}
