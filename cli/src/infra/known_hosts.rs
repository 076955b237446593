//! Host key pinning (`KnownHostsManager`): trust on first use.
//!
//! One line per host: `<host>:<port> <SHA256 fingerprint>`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Result of checking a presented host key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyStatus {
    /// Matches the pinned fingerprint.
    Trusted,
    /// First contact; the fingerprint has now been pinned.
    Recorded,
    /// Differs from the pinned fingerprint.
    Mismatch { expected: String },
}

/// Manages `~/.siteforge/known_hosts`.
#[derive(Debug)]
pub struct KnownHostsManager {
    path: PathBuf,
}

impl KnownHostsManager {
    /// Creates a manager pointing at `~/.siteforge/known_hosts`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".siteforge").join("known_hosts")))
    }

    /// Creates a manager pointing at an arbitrary path (for testing).
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pinned fingerprint for `host_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn lookup(&self, host_id: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        Ok(content.lines().find_map(|line| {
            let (host, fingerprint) = line.trim().split_once(' ')?;
            (host == host_id).then(|| fingerprint.trim().to_string())
        }))
    }

    /// Pin `fingerprint` for `host_id`, creating parent dirs as needed.
    ///
    /// Sets file permissions to 600 and parent directory to 700 on Unix.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or permissions cannot be set.
    pub fn record(&self, host_id: &str, fingerprint: &str) -> Result<()> {
        use std::io::Write as _;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
            set_permissions(parent, 0o700)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open {}", self.path.display()))?;
        writeln!(file, "{host_id} {fingerprint}")
            .with_context(|| format!("write {}", self.path.display()))?;
        set_permissions(&self.path, 0o600)?;
        Ok(())
    }

    /// Check `fingerprint` against the pin for `host_id`, pinning it on
    /// first contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or written.
    pub fn verify(&self, host_id: &str, fingerprint: &str) -> Result<HostKeyStatus> {
        match self.lookup(host_id)? {
            Some(expected) if expected == fingerprint => Ok(HostKeyStatus::Trusted),
            Some(expected) => Ok(HostKeyStatus::Mismatch { expected }),
            None => {
                self.record(host_id, fingerprint)?;
                Ok(HostKeyStatus::Recorded)
            }
        }
    }
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("set permissions on {}", path.display()))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}
