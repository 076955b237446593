//! Domain types and validators for siteforge configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access. The values
//! here are loaded once at startup and passed explicitly to the services.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.siteforge/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct SiteforgeConfig {
    pub connection: ConnectionConfig,
    pub timeouts: TimeoutConfig,
    pub php: PhpConfig,
    pub paths: PathConfig,
    pub urls: UrlConfig,
}

/// Session establishment settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Ceiling for TCP connect + key exchange + authentication.
    pub connect_timeout_secs: u64,
    /// Interval between transport keep-alive probes.
    pub keepalive_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 20,
            keepalive_secs: 15,
        }
    }
}

impl ConnectionConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn keepalive(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs)
    }
}

/// Per-command timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Package installs and anything without a more specific bound.
    pub default_secs: u64,
    /// Read-only probes (`command -v`, `test -f`, ...).
    pub quick_secs: u64,
    /// `apt-get update`.
    pub package_index_secs: u64,
    /// Release archive and WP-CLI downloads.
    pub download_secs: u64,
    /// Certificate issuance.
    pub certificate_secs: u64,
    /// Outer ceiling for a whole installation run. `0` disables it.
    pub run_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: 120,
            quick_secs: 30,
            package_index_secs: 180,
            download_secs: 300,
            certificate_secs: 180,
            run_secs: 300,
        }
    }
}

impl TimeoutConfig {
    #[must_use]
    pub fn default_cmd(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }

    #[must_use]
    pub fn quick(&self) -> Duration {
        Duration::from_secs(self.quick_secs)
    }

    #[must_use]
    pub fn package_index(&self) -> Duration {
        Duration::from_secs(self.package_index_secs)
    }

    #[must_use]
    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    #[must_use]
    pub fn certificate(&self) -> Duration {
        Duration::from_secs(self.certificate_secs)
    }

    /// Outer run ceiling, `None` when disabled.
    #[must_use]
    pub fn run(&self) -> Option<Duration> {
        (self.run_secs > 0).then(|| Duration::from_secs(self.run_secs))
    }
}

/// PHP runtime selection and `php.ini` overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PhpConfig {
    pub supported_versions: Vec<String>,
    pub default_version: String,
    pub upload_max_filesize: String,
    pub post_max_size: String,
    pub max_execution_time: u32,
    pub memory_limit: String,
}

impl Default for PhpConfig {
    fn default() -> Self {
        Self {
            supported_versions: ["8.1", "8.2", "8.3", "8.4"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            default_version: "8.3".to_string(),
            upload_max_filesize: "64M".to_string(),
            post_max_size: "64M".to_string(),
            max_execution_time: 300,
            memory_limit: "256M".to_string(),
        }
    }
}

impl PhpConfig {
    /// `php.ini` directives applied by the runtime hardening stage.
    #[must_use]
    pub fn ini_overrides(&self) -> Vec<(&'static str, String)> {
        vec![
            ("upload_max_filesize", self.upload_max_filesize.clone()),
            ("post_max_size", self.post_max_size.clone()),
            ("max_execution_time", self.max_execution_time.to_string()),
            ("memory_limit", self.memory_limit.clone()),
        ]
    }
}

/// Remote filesystem locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathConfig {
    /// Sites are installed to `<web_root>/<domain>`.
    pub web_root: String,
    /// Scratch directory for the release archive. Wiped before and after use.
    pub scratch_dir: String,
    /// Where WP-CLI is installed.
    pub wp_cli: String,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            web_root: "/var/www".to_string(),
            scratch_dir: "/tmp/siteforge-wordpress".to_string(),
            wp_cli: "/usr/local/bin/wp".to_string(),
        }
    }
}

/// Upstream download locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UrlConfig {
    pub wordpress_archive: String,
    pub wp_cli_phar: String,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            wordpress_archive: "https://wordpress.org/latest.tar.gz".to_string(),
            wp_cli_phar: "https://raw.githubusercontent.com/wp-cli/builds/gh-pages/phar/wp-cli.phar"
                .to_string(),
        }
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// `major.minor`, as used in `phpX.Y` package names.
static PHP_VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\d+\.\d+$").expect("valid regex")
});

/// `php.ini` shorthand byte size, e.g. `64M`.
static INI_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^\d+[KMG]?$").expect("valid regex")
});

static REMOTE_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^/[A-Za-z0-9._/-]+$").expect("valid regex")
});

/// Validates a loaded configuration.
///
/// # Errors
///
/// Returns an error if the default PHP version is not supported or a
/// per-command timeout is zero.
pub fn validate_config(config: &SiteforgeConfig) -> Result<()> {
    if !config
        .php
        .supported_versions
        .iter()
        .any(|v| v == &config.php.default_version)
    {
        return Err(ConfigError::DefaultPhpUnsupported {
            default: config.php.default_version.clone(),
            supported: config.php.supported_versions.join(", "),
        }
        .into());
    }

    for version in &config.php.supported_versions {
        if !PHP_VERSION_RE.is_match(version) {
            return Err(ConfigError::InvalidPhpVersion {
                version: version.clone(),
            }
            .into());
        }
    }

    let php = &config.php;
    for (key, value) in [
        ("php.upload_max_filesize", &php.upload_max_filesize),
        ("php.post_max_size", &php.post_max_size),
        ("php.memory_limit", &php.memory_limit),
    ] {
        if !INI_SIZE_RE.is_match(value) {
            return Err(ConfigError::InvalidSize {
                key,
                value: value.clone(),
            }
            .into());
        }
    }

    let paths = &config.paths;
    for (key, value) in [
        ("paths.web_root", &paths.web_root),
        ("paths.scratch_dir", &paths.scratch_dir),
        ("paths.wp_cli", &paths.wp_cli),
    ] {
        if !REMOTE_PATH_RE.is_match(value) {
            return Err(ConfigError::InvalidPath {
                key,
                value: value.clone(),
            }
            .into());
        }
    }

    let t = &config.timeouts;
    for (key, value) in [
        ("timeouts.default_secs", t.default_secs),
        ("timeouts.quick_secs", t.quick_secs),
        ("timeouts.package_index_secs", t.package_index_secs),
        ("timeouts.download_secs", t.download_secs),
        ("timeouts.certificate_secs", t.certificate_secs),
        ("connection.connect_timeout_secs", config.connection.connect_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::ZeroTimeout { key }.into());
        }
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
