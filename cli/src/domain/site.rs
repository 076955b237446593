//! Connection and site input types, validation, and derived identifiers.
//!
//! This module is intentionally free of I/O, async, and external layer imports.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::domain::error::SiteError;

/// MySQL limit for database names.
pub const DB_NAME_MAX: usize = 64;

/// MySQL limit for user names.
pub const DB_USER_MAX: usize = 32;

/// Lowercase FQDN with at least two labels and an alphabetic TLD.
pub static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$").expect("valid regex")
});

pub static ADMIN_USER_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9_.@-]{3,60}$").expect("valid regex")
});

/// Deliberately loose: no whitespace, quotes or backslashes, one `@`, a dot
/// in the domain part.
pub static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r#"^[^@\s'"\\]+@[^@\s'"\\]+\.[^@\s'"\\]+$"#).expect("valid regex")
});

// ── Connection input ─────────────────────────────────────────────────────────

/// How to authenticate the SSH session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    PrivateKey {
        /// OpenSSH or PEM encoded key material.
        pem: String,
        passphrase: Option<String>,
    },
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(***)"),
            Credential::PrivateKey { passphrase, .. } => f
                .debug_struct("PrivateKey")
                .field("passphrase", &passphrase.as_ref().map(|_| "***"))
                .finish_non_exhaustive(),
        }
    }
}

/// Where and as whom to connect. Lives only for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSpec {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub credential: Credential,
}

impl ConnectionSpec {
    /// `user@host:port`, for messages and logs.
    #[must_use]
    pub fn target(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }
}

/// Validates the SSH host field.
///
/// # Errors
///
/// Returns an error if the host is empty, too long, or contains whitespace.
pub fn validate_host(host: &str) -> Result<()> {
    if host.is_empty() || host.len() > 253 || host.chars().any(char::is_whitespace) {
        return Err(SiteError::InvalidHost(host.to_string()).into());
    }
    Ok(())
}

// ── Site input ───────────────────────────────────────────────────────────────

/// What to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteParameters {
    pub domain: String,
    pub title: String,
    pub admin_user: String,
    pub admin_email: String,
    pub php_version: String,
    pub issue_certificate: bool,
}

/// Trim, lowercase, and drop a trailing root dot.
#[must_use]
pub fn normalize_domain(raw: &str) -> String {
    raw.trim().trim_end_matches('.').to_ascii_lowercase()
}

/// # Errors
///
/// Returns an error unless `domain` is a lowercase fully-qualified hostname.
pub fn validate_domain(domain: &str) -> Result<()> {
    if domain.len() > 253 || !DOMAIN_RE.is_match(domain) {
        return Err(SiteError::InvalidDomain(domain.to_string()).into());
    }
    Ok(())
}

/// Validates every site field. `supported_php` comes from configuration.
///
/// # Errors
///
/// Returns the first field that fails validation.
pub fn validate_site(site: &SiteParameters, supported_php: &[String]) -> Result<()> {
    validate_domain(&site.domain)?;

    let title = site.title.trim();
    if title.is_empty() {
        return Err(SiteError::InvalidTitle("must not be empty".to_string()).into());
    }
    if title.chars().count() > 200 {
        return Err(SiteError::InvalidTitle("longer than 200 characters".to_string()).into());
    }
    if title.chars().any(char::is_control) {
        return Err(SiteError::InvalidTitle("contains control characters".to_string()).into());
    }

    if !ADMIN_USER_RE.is_match(&site.admin_user) {
        return Err(SiteError::InvalidAdminUser(site.admin_user.clone()).into());
    }
    if !EMAIL_RE.is_match(&site.admin_email) {
        return Err(SiteError::InvalidEmail(site.admin_email.clone()).into());
    }
    if !supported_php.iter().any(|v| v == &site.php_version) {
        return Err(SiteError::UnsupportedPhp {
            requested: site.php_version.clone(),
            supported: supported_php.join(", "),
        }
        .into());
    }
    Ok(())
}

// ── Derived identifiers ──────────────────────────────────────────────────────

fn sanitize_identifier(domain: &str) -> String {
    domain
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// First four bytes of the SHA-256 of `domain`, hex encoded.
fn domain_tag(domain: &str) -> String {
    Sha256::digest(domain.as_bytes())
        .iter()
        .take(4)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// `prefix` + sanitized `domain`, at most `max` bytes.
///
/// Dots map to `_` one-to-one, so a plain `[a-z0-9.]` domain that fits keeps
/// its readable form. Anything else that had to be rewritten, or that does
/// not fit, gets `__` and a tag derived from the full domain, so two domains
/// never share an identifier through sanitizing or truncation.
fn derived_identifier(prefix: &str, domain: &str, max: usize) -> String {
    let mut ident = format!("{prefix}{}", sanitize_identifier(domain));
    let lossless = domain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.');
    if lossless && ident.len() <= max {
        return ident;
    }
    let tag = domain_tag(domain);
    // Sanitized identifiers are pure ASCII, so byte truncation is safe.
    ident.truncate(max - tag.len() - 2);
    format!("{ident}__{tag}")
}

/// Database name for `domain`, e.g. `wp_example_com`.
#[must_use]
pub fn database_name(domain: &str) -> String {
    derived_identifier("wp_", domain, DB_NAME_MAX)
}

/// Database user for `domain`, e.g. `wpu_example_com`.
#[must_use]
pub fn database_user(domain: &str) -> String {
    derived_identifier("wpu_", domain, DB_USER_MAX)
}

/// Install directory for `domain` under `web_root`.
#[must_use]
pub fn install_dir(web_root: &str, domain: &str) -> String {
    format!("{}/{domain}", web_root.trim_end_matches('/'))
}
