//! Installation orchestrator: stage ordering, failure handling and the
//! terminal record, driven through scripted fakes.

#![allow(clippy::expect_used)]

use siteforge_cli::application::services::provision::{install_site, install_site_within_ceiling};
use siteforge_cli::domain::config::SiteforgeConfig;
use siteforge_cli::domain::site::{ConnectionSpec, Credential, SiteParameters};
use siteforge_cli::output::ChannelSink;
use siteforge_common::{
    InstallationResult, InstallationSummary, Stage, StageStatus, StreamRecord,
};

use crate::mocks::{FakeConnector, FakeDns, RecordingSink, Reply, Script, Timeline};

const SNIPPET_MISSING: &str = "nginx: [emerg] open() \"/etc/nginx/snippets/fastcgi-php.conf\" failed (2: No such file or directory)";

fn connection(port: u16) -> ConnectionSpec {
    ConnectionSpec {
        host: "203.0.113.5".to_string(),
        port,
        username: "root".to_string(),
        credential: Credential::Password("hunter2".to_string()),
    }
}

fn site(tls: bool) -> SiteParameters {
    SiteParameters {
        domain: "example.com".to_string(),
        title: "My Blog".to_string(),
        admin_user: "admin".to_string(),
        admin_email: "ops@example.com".to_string(),
        php_version: "8.3".to_string(),
        issue_certificate: tls,
    }
}

struct Run {
    result: InstallationResult,
    timeline: Timeline,
}

impl Run {
    fn summary(&self) -> &InstallationSummary {
        match &self.result {
            InstallationResult::Success(summary) => summary,
            InstallationResult::Failure(f) => panic!("expected success, got {f:?}"),
        }
    }

    fn failure_stage(&self) -> Stage {
        match &self.result {
            InstallationResult::Failure(f) => f.stage,
            InstallationResult::Success(_) => panic!("expected failure"),
        }
    }

    fn failure_message(&self) -> String {
        match &self.result {
            InstallationResult::Failure(f) => f.message.clone(),
            InstallationResult::Success(_) => panic!("expected failure"),
        }
    }
}

async fn run_with(script: Script, dns: FakeDns, site: &SiteParameters, port: u16) -> Run {
    let timeline = Timeline::default();
    let connector = FakeConnector::new(script, &timeline);
    let sink = RecordingSink(timeline.clone());
    let config = SiteforgeConfig::default();
    let result = install_site(&connector, &dns, &sink, &config, &connection(port), site).await;
    Run { result, timeline }
}

async fn run(script: Script) -> Run {
    run_with(script, FakeDns::default(), &site(false), 22).await
}

// ── Happy path ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fresh_host_installs_everything_over_http() {
    let run = run(Script::fresh_host()).await;

    let summary = run.summary();
    assert_eq!(summary.site_url, "http://example.com");
    assert_eq!(summary.admin_url, "http://example.com/wp-admin/");
    assert_eq!(summary.admin_username, "admin");
    assert!(summary.admin_password.is_some());
    assert_eq!(summary.db_name, "wp_example_com");
    assert_eq!(summary.db_user, "wpu_example_com");
    assert_eq!(summary.install_dir, "/var/www/example.com");
    assert!(!summary.ssl_requested);
    assert!(!summary.ssl_enabled);
    assert!(summary.caveats.is_empty());

    let labels = run.timeline.labels();
    assert!(labels.iter().any(|l| l == "apt-get install nginx"));
    assert!(labels.iter().any(|l| l == "apt-get install mysql-server"));
    assert!(labels.iter().any(|l| l == "wp core install"));
    assert!(!labels.iter().any(|l| l.starts_with("certbot")));
}

#[tokio::test]
async fn test_stages_complete_in_order_and_end_with_complete_record() {
    let run = run(Script::fresh_host()).await;

    let completed: Vec<Stage> = run
        .timeline
        .events()
        .into_iter()
        .filter(|e| e.status == StageStatus::Completed)
        .map(|e| e.stage)
        .collect();
    let mut expected = vec![Stage::Connecting];
    expected.extend(Stage::PROVISIONING.iter().copied().filter(|s| *s != Stage::Ssl));
    assert_eq!(completed, expected);

    let records = run.timeline.records();
    let last = records.last().expect("terminal record");
    assert!(matches!(last, StreamRecord::Complete(_)));
    assert_eq!(records.iter().filter(|r| r.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_running_precedes_stage_commands_and_completed_follows() {
    let run = run(Script::fresh_host()).await;
    let t = &run.timeline;

    for (stage, first_label) in [
        (Stage::Nginx, "checking for nginx"),
        (Stage::DbConfig, "creating database and user"),
        (Stage::Security, "checking for ufw"),
    ] {
        let running = t.position_of(stage, StageStatus::Running).expect("running");
        let exec = t.position_of_exec(first_label).expect("command");
        let completed = t.position_of(stage, StageStatus::Completed).expect("completed");
        assert!(running < exec, "{stage}: running after its first command");
        assert!(exec < completed, "{stage}: completed before its command");
    }
}

#[tokio::test]
async fn test_session_closed_once_before_terminal_record() {
    let run = run(Script::fresh_host()).await;
    assert_eq!(run.timeline.close_count(), 1);

    let entries = run.timeline.entries();
    let closed = entries
        .iter()
        .position(|e| matches!(e, crate::mocks::Entry::Closed))
        .expect("closed");
    let terminal = entries
        .iter()
        .position(|e| matches!(e, crate::mocks::Entry::Record(r) if r.is_terminal()))
        .expect("terminal");
    assert!(closed < terminal);
}

#[tokio::test]
async fn test_secrets_never_appear_in_progress_records() {
    let run = run(Script::fresh_host()).await;
    let summary = run.summary();
    let admin = summary.admin_password.clone().expect("admin password");

    for event in run.timeline.events() {
        let text = format!("{} {}", event.message, event.detail.unwrap_or_default());
        assert!(!text.contains(&summary.db_password));
        assert!(!text.contains(&admin));
    }
}

#[tokio::test]
async fn test_each_run_generates_fresh_passwords() {
    let first = run(Script::fresh_host()).await;
    let second = run(Script::fresh_host()).await;
    assert_ne!(first.summary().db_password, second.summary().db_password);
    assert_ne!(first.summary().admin_password, second.summary().admin_password);
}

// ── Re-runs ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rerun_on_provisioned_host_keeps_existing_site() {
    let run = run(Script::provisioned_host()).await;

    let summary = run.summary();
    assert!(summary.admin_password.is_none());
    assert!(summary.caveats.iter().any(|c| c.contains("was kept")));

    let labels = run.timeline.labels();
    assert!(!labels.iter().any(|l| l.starts_with("apt-get install") && !l.contains("php")));
    assert!(!labels.iter().any(|l| l == "wp core install"));
    assert!(labels.iter().any(|l| l == "systemctl enable nginx"));

    // The database user's password is reset to the one in wp-config.php.
    let sql = run.timeline.script("creating database and user").expect("sql");
    assert!(sql.contains(&format!("IDENTIFIED BY '{}'", summary.db_password)));
}

// ── PHP ───────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_php_package_adds_repository_first() {
    let script = Script::fresh_host().on("apt-cache show", Reply::fail(100, ""));
    let run = run(script).await;
    run.summary();

    let t = &run.timeline;
    let ppa = t.position_of_exec("add-apt-repository").expect("ppa added");
    let install = t.position_of_exec("apt-get install php8.3 extensions").expect("php installed");
    assert!(ppa < install);
}

#[tokio::test]
async fn test_existing_php_runtime_still_gets_required_extensions() {
    let script = Script::provisioned_host().on("checking for php-fpm8.3", Reply::ok());
    let run = run(script).await;
    run.summary();

    let t = &run.timeline;
    assert!(t.position_of_exec("apt-get install php8.3 extensions").is_some());
    assert!(t.position_of_exec("apt-get install php8.3-imagick").is_some());
    assert!(t.position_of_exec("add-apt-repository").is_none());
    let php_done = t
        .events()
        .into_iter()
        .find(|e| e.stage == Stage::Php && e.status == StageStatus::Completed)
        .expect("php completed");
    assert!(!php_done.message.contains("already installed"), "{}", php_done.message);
}

#[tokio::test]
async fn test_optional_extension_failure_is_a_caveat() {
    let script = Script::fresh_host().on(
        "apt-get install php8.3-imagick",
        Reply::fail(100, "E: Unable to locate package php8.3-imagick"),
    );
    let run = run(script).await;

    let summary = run.summary();
    assert!(summary.caveats.iter().any(|c| c.contains("php8.3-imagick")));
    let php_done = run
        .timeline
        .events()
        .into_iter()
        .find(|e| e.stage == Stage::Php && e.status == StageStatus::Completed)
        .expect("php completed");
    assert!(php_done.detail.is_some());
}

// ── Failures ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_database_install_failure_stops_the_run() {
    let script = Script::fresh_host().on(
        "apt-get install mysql-server",
        Reply::fail(100, "E: Unable to locate package mysql-server"),
    );
    let run = run(script).await;

    assert_eq!(run.failure_stage(), Stage::Database);
    let message = run.failure_message();
    assert!(message.contains("Installing MySQL"), "{message}");
    assert!(message.contains("Unable to locate package"), "{message}");

    assert!(!run.timeline.labels().iter().any(|l| l.contains("php")));
    assert_eq!(run.timeline.close_count(), 1);

    let last_event = run.timeline.events().pop().expect("event");
    assert_eq!((last_event.stage, last_event.status), (Stage::Database, StageStatus::Failed));
    assert!(matches!(
        run.timeline.records().last(),
        Some(StreamRecord::Error(f)) if f.stage == Stage::Database
    ));
}

#[tokio::test]
async fn test_connection_failure_reports_connecting_stage() {
    let timeline = Timeline::default();
    let connector = FakeConnector::refusing(&timeline);
    let sink = RecordingSink(timeline.clone());
    let result = install_site(
        &connector,
        &FakeDns::default(),
        &sink,
        &SiteforgeConfig::default(),
        &connection(22),
        &site(false),
    )
    .await;

    match result {
        InstallationResult::Failure(f) => {
            assert_eq!(f.stage, Stage::Connecting);
            assert!(f.message.contains("authentication failed"));
        }
        InstallationResult::Success(_) => panic!("expected failure"),
    }
    assert!(timeline.labels().is_empty());
    assert_eq!(timeline.close_count(), 0);
    assert!(!timeline.events().iter().any(|e| e.stage == Stage::SystemUpdate));
}

#[tokio::test]
async fn test_missing_exit_status_fails_the_stage() {
    let script = Script::fresh_host().on("apt-get update", Reply::NoExitStatus);
    let run = run(script).await;

    assert_eq!(run.failure_stage(), Stage::SystemUpdate);
    assert!(run.failure_message().contains("without reporting an exit status"));
    assert_eq!(run.timeline.close_count(), 1);
}

#[tokio::test]
async fn test_command_timeout_fails_the_stage() {
    let script = Script::fresh_host().on("downloading WordPress", Reply::TimedOut);
    let run = run(script).await;

    assert_eq!(run.failure_stage(), Stage::Wordpress);
    assert!(run.failure_message().contains("timed out"));
}

// ── Nginx ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_fastcgi_snippet_falls_back_to_inline_parameters() {
    let script = Script::fresh_host().on_each(
        "nginx -t",
        vec![Reply::fail(1, SNIPPET_MISSING), Reply::ok()],
    );
    let run = run(script).await;
    run.summary();

    let writes: Vec<String> = run
        .timeline
        .entries()
        .into_iter()
        .filter_map(|e| match e {
            crate::mocks::Entry::Exec { label, script } if label == "writing nginx site configuration" => {
                Some(script)
            }
            _ => None,
        })
        .collect();
    assert_eq!(writes.len(), 2);
    assert!(writes[0].contains("include snippets/fastcgi-php.conf;"));
    assert!(writes[1].contains("fastcgi_split_path_info"));
    assert!(!writes[1].contains("include snippets/fastcgi-php.conf;"));
}

#[tokio::test]
async fn test_inline_fallback_rejected_fails_nginx_config() {
    let script = Script::fresh_host().on("nginx -t", Reply::fail(1, SNIPPET_MISSING));
    let run = run(script).await;

    assert_eq!(run.failure_stage(), Stage::NginxConfig);
    assert!(run.failure_message().contains("nginx rejected the site configuration"));
    assert!(run.timeline.position_of_exec("reloading nginx").is_none());
}

#[tokio::test]
async fn test_unrelated_nginx_error_fails_without_fallback() {
    let script = Script::fresh_host().on("nginx -t", Reply::fail(1, "unknown directive \"foo\""));
    let run = run(script).await;

    assert_eq!(run.failure_stage(), Stage::NginxConfig);
    let writes = run
        .timeline
        .labels()
        .into_iter()
        .filter(|l| l == "writing nginx site configuration")
        .count();
    assert_eq!(writes, 1);
}

// ── Firewall ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_firewall_allows_session_port_before_enabling() {
    let run = run_with(Script::fresh_host(), FakeDns::default(), &site(false), 2222).await;
    run.summary();

    let t = &run.timeline;
    let ssh = t.position_of_exec("ufw allow 2222/tcp").expect("ssh rule");
    let http = t.position_of_exec("ufw allow 80/tcp").expect("http rule");
    let https = t.position_of_exec("ufw allow 443/tcp").expect("https rule");
    let enable = t.position_of_exec("ufw enable").expect("enable");
    assert!(ssh < http && http < https && https < enable);
    assert!(t.position_of_exec("ufw allow 22/tcp").is_none());
}

// ── TLS ───────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_certificate_covers_www_when_it_points_to_the_same_host() {
    let dns = FakeDns::default()
        .with("example.com", "203.0.113.5")
        .with("www.example.com", "203.0.113.5");
    let run = run_with(Script::fresh_host(), dns, &site(true), 22).await;

    let summary = run.summary();
    assert!(summary.ssl_requested);
    assert!(summary.ssl_enabled);
    assert_eq!(summary.site_url, "https://example.com");
    assert_eq!(summary.admin_url, "https://example.com/wp-admin/");

    let certbot = run.timeline.script("certbot --nginx").expect("certbot ran");
    assert!(certbot.contains("-d example.com"));
    assert!(certbot.contains("-d www.example.com"));
    assert!(run.timeline.script("wp option update home").is_some());
    assert!(run.timeline.position_of(Stage::Ssl, StageStatus::Completed).is_some());
}

#[tokio::test]
async fn test_certificate_for_bare_domain_when_www_points_elsewhere() {
    let dns = FakeDns::default()
        .with("example.com", "203.0.113.5")
        .with("www.example.com", "198.51.100.9");
    let run = run_with(Script::fresh_host(), dns, &site(true), 22).await;

    let summary = run.summary();
    assert!(summary.ssl_enabled);
    assert_eq!(summary.site_url, "https://example.com");
    assert!(summary.caveats.is_empty(), "{:?}", summary.caveats);

    let certbot = run.timeline.script("certbot --nginx").expect("certbot ran");
    assert!(certbot.contains("-d example.com"));
    assert!(!certbot.contains("www.example.com"));

    let ssl_done = run
        .timeline
        .events()
        .into_iter()
        .find(|e| e.stage == Stage::Ssl && e.status == StageStatus::Completed)
        .expect("ssl completed");
    assert!(ssl_done.message.contains("example.com only"), "{}", ssl_done.message);
}

#[tokio::test]
async fn test_url_update_failure_after_issuance_keeps_https_with_caveat() {
    let dns = FakeDns::default()
        .with("example.com", "203.0.113.5")
        .with("www.example.com", "203.0.113.5");
    let script = Script::fresh_host().on(
        "wp option update",
        Reply::fail(1, "Error: Error establishing a database connection."),
    );
    let run = run_with(script, dns, &site(true), 22).await;

    let summary = run.summary();
    assert!(summary.ssl_enabled);
    assert_eq!(summary.site_url, "https://example.com");
    assert!(
        summary.caveats.iter().any(|c| c.contains("still point to http://example.com")),
        "{:?}",
        summary.caveats
    );

    let ssl_done = run
        .timeline
        .events()
        .into_iter()
        .find(|e| e.stage == Stage::Ssl && e.status == StageStatus::Completed)
        .expect("ssl completed");
    assert!(ssl_done.message.starts_with("Certificate issued"), "{}", ssl_done.message);
    assert!(ssl_done.detail.is_some());
}

#[tokio::test]
async fn test_certificate_failure_leaves_site_on_http() {
    let dns = FakeDns::default()
        .with("example.com", "203.0.113.5")
        .with("www.example.com", "198.51.100.9");
    let script = Script::fresh_host().on(
        "certbot --nginx",
        Reply::fail(1, "Some challenges have failed."),
    );
    let run = run_with(script, dns, &site(true), 22).await;

    let summary = run.summary();
    assert!(summary.ssl_requested);
    assert!(!summary.ssl_enabled);
    assert_eq!(summary.site_url, "http://example.com");
    assert!(summary.caveats.iter().any(|c| c.contains("certbot")));

    let certbot = run.timeline.script("certbot --nginx").expect("certbot ran");
    assert!(!certbot.contains("www.example.com"));

    let ssl_done = run
        .timeline
        .events()
        .into_iter()
        .find(|e| e.stage == Stage::Ssl && e.status == StageStatus::Completed)
        .expect("ssl completed");
    assert!(ssl_done.detail.is_some());
}

#[tokio::test]
async fn test_unresolved_domain_skips_certbot() {
    let run = run_with(Script::fresh_host(), FakeDns::default(), &site(true), 22).await;

    let summary = run.summary();
    assert!(!summary.ssl_enabled);
    assert!(summary.caveats.iter().any(|c| c.contains("does not resolve")));
    assert!(run.timeline.position_of_exec("certbot --nginx").is_none());
}

// ── Run ceiling ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn test_run_ceiling_reports_the_stage_in_progress() {
    let timeline = Timeline::default();
    let script = Script::fresh_host().on("downloading WordPress", Reply::Stall);
    let connector = FakeConnector::new(script, &timeline);
    let sink = RecordingSink(timeline.clone());
    let config = SiteforgeConfig::default();

    let result = install_site_within_ceiling(
        &connector,
        &FakeDns::default(),
        &sink,
        &config,
        &connection(22),
        &site(false),
    )
    .await;

    match result {
        InstallationResult::Failure(f) => {
            assert_eq!(f.stage, Stage::Wordpress);
            assert_eq!(f.message, "installation timed out after 300s");
        }
        InstallationResult::Success(_) => panic!("expected failure"),
    }

    let records = timeline.records();
    let terminal: Vec<&StreamRecord> = records.iter().filter(|r| r.is_terminal()).collect();
    assert_eq!(terminal.len(), 1);
    assert!(matches!(
        records.last(),
        Some(StreamRecord::Error(f)) if f.stage == Stage::Wordpress
    ));
    assert!(timeline.position_of_exec("wp core install").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_run_within_ceiling_passes_result_through() {
    let timeline = Timeline::default();
    let connector = FakeConnector::new(Script::fresh_host(), &timeline);
    let sink = RecordingSink(timeline.clone());

    let result = install_site_within_ceiling(
        &connector,
        &FakeDns::default(),
        &sink,
        &SiteforgeConfig::default(),
        &connection(22),
        &site(false),
    )
    .await;

    assert!(result.is_success());
    assert_eq!(timeline.close_count(), 1);
    assert_eq!(timeline.records().iter().filter(|r| r.is_terminal()).count(), 1);
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_run_completes_when_observer_goes_away() {
    let timeline = Timeline::default();
    let connector = FakeConnector::new(Script::fresh_host(), &timeline);
    let (sink, rx) = ChannelSink::new();
    drop(rx);

    let result = install_site(
        &connector,
        &FakeDns::default(),
        &sink,
        &SiteforgeConfig::default(),
        &connection(22),
        &site(false),
    )
    .await;

    assert!(result.is_success());
    assert_eq!(timeline.close_count(), 1);
}
