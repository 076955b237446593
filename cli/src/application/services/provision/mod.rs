//! Application service: WordPress installation use-case.
//!
//! Opens one session, runs the twelve provisioning stages in order, closes
//! the session, and reports exactly one terminal record. Imports only from
//! `crate::domain` and `crate::application::ports`.

pub mod database;
pub mod nginx;
pub mod packages;
pub mod php;
pub mod security;
pub mod ssl;
pub mod wordpress;

use std::sync::{Mutex, PoisonError};

use siteforge_common::{
    InstallationFailure, InstallationResult, InstallationSummary, ProgressEvent, Stage,
    StageStatus, StreamRecord,
};

use crate::application::ports::{DnsResolver, ProgressSink, RemoteShell, SessionConnector};
use crate::application::services::step::{StageFailure, StageReport, StageRunner};
use crate::domain::config::SiteforgeConfig;
use crate::domain::secrets::{ADMIN_PASSWORD_LEN, DB_PASSWORD_LEN, Secret, generate_password};
use crate::domain::site::{ConnectionSpec, SiteParameters, database_name, database_user, install_dir};
use crate::domain::templates::FastcgiMode;

/// Read-only inputs shared by every stage.
pub struct StageCtx<'a, R, D> {
    pub shell: &'a R,
    pub dns: &'a D,
    pub config: &'a SiteforgeConfig,
    pub site: &'a SiteParameters,
    /// SSH port of the session, kept open by the firewall.
    pub ssh_port: u16,
}

/// Facts accumulated while the run progresses.
pub struct ProvisioningState {
    pub db_name: String,
    pub db_user: String,
    pub db_password: Secret,
    pub admin_password: Secret,
    pub install_dir: String,
    pub fastcgi: FastcgiMode,
    /// `false` when an existing installation was kept.
    pub admin_created: bool,
    pub ssl_enabled: bool,
    /// Optional components that could not be installed.
    pub skipped: Vec<String>,
    pub caveats: Vec<String>,
}

impl ProvisioningState {
    /// Derive names and generate fresh secrets for `site`.
    #[must_use]
    pub fn new(config: &SiteforgeConfig, site: &SiteParameters) -> Self {
        Self {
            db_name: database_name(&site.domain),
            db_user: database_user(&site.domain),
            db_password: generate_password(DB_PASSWORD_LEN),
            admin_password: generate_password(ADMIN_PASSWORD_LEN),
            install_dir: install_dir(&config.paths.web_root, &site.domain),
            fastcgi: FastcgiMode::Snippet,
            admin_created: false,
            ssl_enabled: false,
            skipped: Vec::new(),
            caveats: Vec::new(),
        }
    }

    fn note(&mut self, report: StageReport) {
        if let Some(caveat) = report.caveat {
            self.caveats.push(caveat);
        }
    }

    fn into_summary(self, site: &SiteParameters) -> InstallationSummary {
        let scheme = if self.ssl_enabled { "https" } else { "http" };
        let site_url = format!("{scheme}://{}", site.domain);
        InstallationSummary {
            admin_url: format!("{site_url}/wp-admin/"),
            site_url,
            admin_username: site.admin_user.clone(),
            admin_password: self.admin_created.then(|| self.admin_password.into_inner()),
            db_name: self.db_name,
            db_user: self.db_user,
            db_password: self.db_password.into_inner(),
            install_dir: self.install_dir,
            ssl_requested: site.issue_certificate,
            ssl_enabled: self.ssl_enabled,
            caveats: self.caveats,
        }
    }
}

/// Install WordPress on the host described by `connection`.
///
/// Never returns an error: every failure becomes an
/// [`InstallationResult::Failure`] naming the stage that failed, and the
/// same outcome is emitted to `sink` as the final record. The session is
/// closed exactly once whatever happens after it opened.
pub async fn install_site<C, D, S>(
    connector: &C,
    dns: &D,
    sink: &S,
    config: &SiteforgeConfig,
    connection: &ConnectionSpec,
    site: &SiteParameters,
) -> InstallationResult
where
    C: SessionConnector,
    D: DnsResolver,
    S: ProgressSink + ?Sized,
{
    let runner = StageRunner::new(sink);
    let target = connection.target();

    runner.emit(ProgressEvent::new(
        Stage::Connecting,
        StageStatus::Running,
        format!("Connecting to {target}"),
    ));
    let session = match connector.open(connection).await {
        Ok(session) => session,
        Err(err) => {
            let message = err.to_string();
            tracing::error!(%target, "{message}");
            runner.emit(ProgressEvent::new(Stage::Connecting, StageStatus::Failed, &message));
            return fail(sink, Stage::Connecting, message);
        }
    };
    runner.emit(ProgressEvent::new(
        Stage::Connecting,
        StageStatus::Completed,
        format!("Connected to {target}"),
    ));

    let ctx = StageCtx {
        shell: &session,
        dns,
        config,
        site,
        ssh_port: connection.port,
    };
    let outcome = provision(&ctx, &runner).await;
    session.close().await;

    match outcome {
        Ok(summary) => {
            tracing::info!(site = %summary.site_url, "installation complete");
            sink.emit(StreamRecord::Complete(summary.clone()));
            InstallationResult::Success(summary)
        }
        Err(failure) => fail(sink, failure.stage, failure.message()),
    }
}

/// [`install_site`] bounded by the configured outer run ceiling.
///
/// When the ceiling expires the run is abandoned and exactly one
/// [`StreamRecord::Error`] is emitted, naming the last stage that reported
/// progress. A zero ceiling runs unbounded.
pub async fn install_site_within_ceiling<C, D, S>(
    connector: &C,
    dns: &D,
    sink: &S,
    config: &SiteforgeConfig,
    connection: &ConnectionSpec,
    site: &SiteParameters,
) -> InstallationResult
where
    C: SessionConnector,
    D: DnsResolver,
    S: ProgressSink + ?Sized,
{
    let Some(ceiling) = config.timeouts.run() else {
        return install_site(connector, dns, sink, config, connection, site).await;
    };

    let tracker = StageTracker::new(sink);
    let install = install_site(connector, dns, &tracker, config, connection, site);
    match tokio::time::timeout(ceiling, install).await {
        Ok(result) => result,
        Err(_) => {
            // The session is owned by the dropped future; dropping it tears
            // down the SSH transport without a graceful disconnect.
            let stage = tracker.last_stage();
            let message = format!("installation timed out after {}s", ceiling.as_secs());
            tracing::error!(%stage, "{message}; session transport dropped");
            fail(sink, stage, message)
        }
    }
}

/// Forwards records and remembers the stage of the latest progress event.
struct StageTracker<'a, S: ?Sized> {
    inner: &'a S,
    last: Mutex<Stage>,
}

impl<'a, S: ProgressSink + ?Sized> StageTracker<'a, S> {
    fn new(inner: &'a S) -> Self {
        Self {
            inner,
            last: Mutex::new(Stage::Connecting),
        }
    }

    fn last_stage(&self) -> Stage {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for StageTracker<'_, S> {
    fn emit(&self, record: StreamRecord) {
        if let StreamRecord::Progress(event) = &record {
            *self.last.lock().unwrap_or_else(PoisonError::into_inner) = event.stage;
        }
        self.inner.emit(record);
    }
}

fn fail<S: ProgressSink + ?Sized>(sink: &S, stage: Stage, message: String) -> InstallationResult {
    let failure = InstallationFailure { stage, message };
    sink.emit(StreamRecord::Error(failure.clone()));
    InstallationResult::Failure(failure)
}

/// Stages 1 through 12; stops at the first mandatory failure.
async fn provision<R, D, S>(
    ctx: &StageCtx<'_, R, D>,
    runner: &StageRunner<'_, S>,
) -> Result<InstallationSummary, StageFailure>
where
    R: RemoteShell,
    D: DnsResolver,
    S: ProgressSink + ?Sized,
{
    let mut state = ProvisioningState::new(ctx.config, ctx.site);
    let php_version = &ctx.site.php_version;

    let report = runner
        .mandatory(Stage::SystemUpdate, "Updating package index", packages::refresh_index(ctx))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(Stage::Nginx, "Installing Nginx", packages::ensure_package(ctx, &packages::NGINX))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(Stage::Database, "Installing MySQL", packages::ensure_package(ctx, &packages::MYSQL))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(
            Stage::Php,
            &format!("Installing PHP {php_version}"),
            php::install(ctx, &mut state),
        )
        .await?;
    state.note(report);

    let report = runner
        .mandatory(Stage::DbConfig, "Creating database and user", database::provision(ctx, &state))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(Stage::Wordpress, "Downloading WordPress", wordpress::download(ctx, &state))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(Stage::WpConfig, "Writing wp-config.php", wordpress::write_config(ctx, &state))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(Stage::NginxConfig, "Configuring Nginx site", nginx::configure(ctx, &mut state))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(Stage::WpInstall, "Installing WordPress", wordpress::install(ctx, &mut state))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(Stage::Security, "Configuring firewall", security::enable_firewall(ctx))
        .await?;
    state.note(report);

    let report = runner
        .mandatory(
            Stage::PhpConfig,
            &format!("Tuning PHP {php_version} runtime"),
            php::tune(ctx),
        )
        .await?;
    state.note(report);

    if ctx.site.issue_certificate {
        let report = runner
            .best_effort(
                Stage::Ssl,
                "Issuing TLS certificate",
                "No certificate issued; site remains on HTTP",
                ssl::issue(ctx, &mut state),
            )
            .await;
        state.note(report);
    }

    Ok(state.into_summary(ctx.site))
}
