//! System update, and the check / install / enable pattern shared by the
//! web server and database stages.

use anyhow::Result;

use super::StageCtx;
use crate::application::ports::RemoteShell;
use crate::application::services::executor::{probe, run_checked};
use crate::application::services::step::StageReport;
use crate::domain::shell::{apt_install, apt_update, binary_present, enable_service};

/// A system package that provides a long-running service.
#[derive(Debug, Clone, Copy)]
pub struct PackageSpec {
    pub display: &'static str,
    /// Executable whose presence means the package is installed.
    pub binary: &'static str,
    pub packages: &'static [&'static str],
    pub service: &'static str,
}

pub const NGINX: PackageSpec = PackageSpec {
    display: "Nginx",
    binary: "nginx",
    packages: &["nginx"],
    service: "nginx",
};

pub const MYSQL: PackageSpec = PackageSpec {
    display: "MySQL",
    binary: "mysqld",
    packages: &["mysql-server"],
    service: "mysql",
};

/// Stage 1: refresh the package index.
pub async fn refresh_index<R: RemoteShell, D>(ctx: &StageCtx<'_, R, D>) -> Result<StageReport> {
    run_checked(
        ctx.shell,
        "apt-get update",
        &apt_update(),
        ctx.config.timeouts.package_index(),
    )
    .await?;
    Ok(StageReport::done("Package index updated"))
}

/// Install `spec` unless its binary is already present, then make sure the
/// service is enabled and running. Safe to repeat.
pub async fn ensure_package<R: RemoteShell, D>(
    ctx: &StageCtx<'_, R, D>,
    spec: &PackageSpec,
) -> Result<StageReport> {
    let timeouts = &ctx.config.timeouts;
    let present = probe(
        ctx.shell,
        &format!("checking for {}", spec.binary),
        &binary_present(spec.binary),
        timeouts.quick(),
    )
    .await?;

    if present {
        tracing::debug!(package = spec.display, "already installed");
    } else {
        run_checked(
            ctx.shell,
            &format!("apt-get install {}", spec.packages.join(" ")),
            &apt_install(spec.packages),
            timeouts.default_cmd(),
        )
        .await?;
    }

    run_checked(
        ctx.shell,
        &format!("systemctl enable {}", spec.service),
        &enable_service(spec.service),
        timeouts.default_cmd(),
    )
    .await?;

    Ok(StageReport::done(if present {
        format!("{} already installed and running", spec.display)
    } else {
        format!("{} installed and running", spec.display)
    }))
}
