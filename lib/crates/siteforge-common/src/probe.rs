use serde::{Deserialize, Serialize};

/// Read-only facts gathered from a host before anything is changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HostFacts {
    /// `PRETTY_NAME` from `/etc/os-release`, or `uname -sr` output.
    pub os: String,
    /// Total memory as reported by the host, e.g. `"1987 MB"`.
    pub memory: String,
    /// Free space on `/`, e.g. `"18G"`.
    pub free_disk: String,
}

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProbeReport {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facts: Option<HostFacts>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProbeReport {
    #[must_use]
    pub fn reachable(facts: HostFacts) -> Self {
        Self {
            success: true,
            facts: Some(facts),
            reason: None,
        }
    }

    #[must_use]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            facts: None,
            reason: Some(reason.into()),
        }
    }
}
