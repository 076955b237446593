//! `siteforge install`: provision WordPress on a fresh server.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::application::services::provision::install_site_within_ceiling;
use crate::commands::ConnectionArgs;
use crate::domain::site::{SiteParameters, normalize_domain, validate_site};
use crate::infra::known_hosts::KnownHostsManager;
use crate::infra::network::TokioDnsResolver;
use crate::infra::ssh::RusshConnector;
use crate::output::{ChannelSink, TerminalReporter};

/// Arguments for the install command.
#[derive(Args, Debug)]
pub struct InstallArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Public domain of the site, e.g. blog.example.com
    #[arg(long)]
    pub domain: String,

    /// Site title
    #[arg(long)]
    pub title: String,

    /// WordPress administrator login
    #[arg(long)]
    pub admin_user: String,

    /// WordPress administrator email (also used for Let's Encrypt)
    #[arg(long)]
    pub admin_email: String,

    /// PHP version to install [default: from config]
    #[arg(long = "php")]
    pub php_version: Option<String>,

    /// Request a Let's Encrypt certificate
    #[arg(long)]
    pub ssl: bool,
}

impl InstallArgs {
    fn site(&self, default_php: &str) -> SiteParameters {
        SiteParameters {
            domain: normalize_domain(&self.domain),
            title: self.title.trim().to_string(),
            admin_user: self.admin_user.trim().to_string(),
            admin_email: self.admin_email.trim().to_string(),
            php_version: self
                .php_version
                .clone()
                .unwrap_or_else(|| default_php.to_string()),
            issue_certificate: self.ssl,
        }
    }
}

/// Run the install command.
///
/// # Errors
///
/// Returns an error if the arguments or configuration are invalid, or the
/// confirmation prompt fails. A failed installation is reported through the
/// stream and yields a failing exit code instead.
pub async fn run(app: &AppContext, args: &InstallArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let site = args.site(&config.php.default_version);
    validate_site(&site, &config.php.supported_versions)?;
    let spec = args.connection.to_spec()?;

    if !app.is_json() {
        app.output.header(&format!("Installing WordPress on {}", spec.target()));
        app.output.kv("Domain:  ", &site.domain);
        app.output.kv("PHP:     ", &site.php_version);
        app.output.kv("TLS:     ", if site.issue_certificate { "Let's Encrypt" } else { "no" });
        println!();
    }
    if !app.confirm(
        "This installs packages and enables a firewall on the server. Continue?",
        true,
    )? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let connector = RusshConnector::new(config.connection.clone(), KnownHostsManager::new()?);
    let dns = TokioDnsResolver;
    let (sink, rx) = ChannelSink::new();
    let reporter = TerminalReporter::new(&app.output, app.mode);

    let run = async {
        let result =
            install_site_within_ceiling(&connector, &dns, &sink, &config, &spec, &site).await;
        sink.close();
        result
    };
    let (result, ()) = tokio::join!(run, reporter.consume(rx));

    Ok(if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
