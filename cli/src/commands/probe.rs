//! `siteforge probe`: check that a host accepts our credentials.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::{config_service, probe};
use crate::commands::ConnectionArgs;
use crate::infra::known_hosts::KnownHostsManager;
use crate::infra::ssh::RusshConnector;
use crate::output::progress;

/// Arguments for the probe command.
#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}

/// Run the probe command.
///
/// # Errors
///
/// Returns an error if the arguments or configuration are invalid.
pub async fn run(app: &AppContext, args: &ProbeArgs) -> Result<ExitCode> {
    let config = config_service::load_config(&app.config_store)?;
    let spec = args.connection.to_spec()?;
    let target = spec.target();
    let connector = RusshConnector::new(config.connection.clone(), KnownHostsManager::new()?);

    let pb = (app.output.show_progress() && !app.is_json())
        .then(|| progress::spinner(&format!("Connecting to {target}...")));
    let report = probe::probe_host(&connector, &spec, &config.timeouts).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    app.renderer().render_probe(&target, &report)?;
    Ok(if report.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
