//! Connectivity probe against scripted hosts.

use siteforge_cli::application::services::probe::probe_host;
use siteforge_cli::domain::config::TimeoutConfig;
use siteforge_cli::domain::site::{ConnectionSpec, Credential};

use crate::mocks::{FakeConnector, Reply, Script, Timeline};

fn spec() -> ConnectionSpec {
    ConnectionSpec {
        host: "203.0.113.5".to_string(),
        port: 22,
        username: "ubuntu".to_string(),
        credential: Credential::Password("pw".to_string()),
    }
}

#[tokio::test]
async fn test_probe_reports_host_facts() {
    let timeline = Timeline::default();
    let script = Script::default()
        .on("reading OS release", Reply::stdout("Ubuntu 24.04.1 LTS\n"))
        .on("reading memory size", Reply::stdout("1987 MB\n"))
        .on("reading free disk", Reply::stdout("18G\n"));
    let connector = FakeConnector::new(script, &timeline);

    let report = probe_host(&connector, &spec(), &TimeoutConfig::default()).await;

    assert!(report.success);
    let facts = report.facts.unwrap_or_else(|| panic!("facts missing"));
    assert_eq!(facts.os, "Ubuntu 24.04.1 LTS");
    assert_eq!(facts.memory, "1987 MB");
    assert_eq!(facts.free_disk, "18G");
    assert_eq!(timeline.close_count(), 1);
}

#[tokio::test]
async fn test_failed_fact_command_reads_unknown() {
    let timeline = Timeline::default();
    let script = Script::default()
        .on("reading OS release", Reply::stdout("Debian GNU/Linux 12"))
        .on("reading free disk", Reply::fail(1, "df: /: No such file"));
    let connector = FakeConnector::new(script, &timeline);

    let report = probe_host(&connector, &spec(), &TimeoutConfig::default()).await;

    assert!(report.success);
    let facts = report.facts.unwrap_or_else(|| panic!("facts missing"));
    assert_eq!(facts.free_disk, "unknown");
    assert_eq!(facts.memory, "unknown");
}

#[tokio::test]
async fn test_refused_login_is_reported_not_raised() {
    let timeline = Timeline::default();
    let connector = FakeConnector::refusing(&timeline);

    let report = probe_host(&connector, &spec(), &TimeoutConfig::default()).await;

    assert!(!report.success);
    assert!(report.facts.is_none());
    assert_eq!(
        report.reason.as_deref(),
        Some("authentication failed for ubuntu@203.0.113.5")
    );
    assert_eq!(timeline.close_count(), 0);
}

#[tokio::test]
async fn test_lost_session_during_probe_is_unreachable() {
    let timeline = Timeline::default();
    let script = Script::default().on("reading", Reply::NoExitStatus);
    let connector = FakeConnector::new(script, &timeline);

    let report = probe_host(&connector, &spec(), &TimeoutConfig::default()).await;

    assert!(!report.success);
    assert!(report.reason.is_some());
    assert_eq!(timeline.close_count(), 1);
}
