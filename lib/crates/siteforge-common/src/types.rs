use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stage identifiers of an installation run, in execution order.
///
/// `Connecting` precedes the numbered stages; `Complete` and `Error` only
/// ever appear on terminal records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Connecting,
    SystemUpdate,
    Nginx,
    Database,
    Php,
    DbConfig,
    Wordpress,
    WpConfig,
    NginxConfig,
    WpInstall,
    Security,
    PhpConfig,
    Ssl,
    Complete,
    Error,
}

impl Stage {
    /// The twelve provisioning stages, in the order they run.
    pub const PROVISIONING: [Stage; 12] = [
        Stage::SystemUpdate,
        Stage::Nginx,
        Stage::Database,
        Stage::Php,
        Stage::DbConfig,
        Stage::Wordpress,
        Stage::WpConfig,
        Stage::NginxConfig,
        Stage::WpInstall,
        Stage::Security,
        Stage::PhpConfig,
        Stage::Ssl,
    ];

    /// Wire identifier, e.g. `"system-update"`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Connecting => "connecting",
            Stage::SystemUpdate => "system-update",
            Stage::Nginx => "nginx",
            Stage::Database => "database",
            Stage::Php => "php",
            Stage::DbConfig => "db-config",
            Stage::Wordpress => "wordpress",
            Stage::WpConfig => "wp-config",
            Stage::NginxConfig => "nginx-config",
            Stage::WpInstall => "wp-install",
            Stage::Security => "security",
            Stage::PhpConfig => "php-config",
            Stage::Ssl => "ssl",
            Stage::Complete => "complete",
            Stage::Error => "error",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a single stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Running,
    Completed,
    Failed,
}

/// One progress record pushed by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub status: StageStatus,
    pub message: String,
    /// Free-form diagnostic, e.g. the caveat of a best-effort stage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(stage: Stage, status: StageStatus, message: impl Into<String>) -> Self {
        Self {
            stage,
            status,
            message: message.into(),
            detail: None,
            at: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Everything the caller needs after a successful installation.
///
/// Carries secrets: render it once, never log it.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstallationSummary {
    pub site_url: String,
    pub admin_url: String,
    pub admin_username: String,
    /// `None` when an existing installation was kept and no new admin
    /// account was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub install_dir: String,
    pub ssl_requested: bool,
    pub ssl_enabled: bool,
    /// Best-effort work that did not happen (skipped extensions, TLS failure).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<String>,
}

impl std::fmt::Debug for InstallationSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationSummary")
            .field("site_url", &self.site_url)
            .field("admin_username", &self.admin_username)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("install_dir", &self.install_dir)
            .field("ssl_requested", &self.ssl_requested)
            .field("ssl_enabled", &self.ssl_enabled)
            .field("caveats", &self.caveats)
            .finish_non_exhaustive()
    }
}

/// Why a run stopped, and where.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallationFailure {
    /// The stage that failed (`connecting` when the session never opened).
    pub stage: Stage,
    pub message: String,
}

/// Terminal value of one installation run. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationResult {
    Success(InstallationSummary),
    Failure(InstallationFailure),
}

impl InstallationResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, InstallationResult::Success(_))
    }
}

/// A line of the installation stream as seen by an observer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StreamRecord {
    Progress(ProgressEvent),
    Complete(InstallationSummary),
    Error(InstallationFailure),
}

impl StreamRecord {
    /// `true` for the record that closes the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamRecord::Progress(_))
    }
}
