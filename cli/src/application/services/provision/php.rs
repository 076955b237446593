//! PHP runtime: installation (stage 4) and runtime limits (stage 11).

use anyhow::Result;

use super::{ProvisioningState, StageCtx};
use crate::application::ports::RemoteShell;
use crate::application::services::executor::{probe, run_checked};
use crate::application::services::step::StageReport;
use crate::domain::shell::{apt_install, apt_update, enable_service, quote};

/// Extensions WordPress cannot run without.
pub const REQUIRED_EXTENSIONS: &[&str] = &["fpm", "mysql", "curl", "gd", "mbstring", "xml", "zip"];

/// Extensions installed when available; a miss is only a caveat.
pub const OPTIONAL_EXTENSIONS: &[&str] = &["intl", "bcmath", "soap", "imagick"];

/// Third-party archive carrying PHP versions the distribution lacks.
const PHP_PPA: &str = "ppa:ondrej/php";

fn fpm_unit(version: &str) -> String {
    format!("php{version}-fpm")
}

/// Stage 4: install PHP-FPM and extensions for the requested version.
pub async fn install<R: RemoteShell, D>(
    ctx: &StageCtx<'_, R, D>,
    state: &mut ProvisioningState,
) -> Result<StageReport> {
    let version = ctx.site.php_version.as_str();
    let timeouts = &ctx.config.timeouts;
    let unit = fpm_unit(version);

    let available = probe(
        ctx.shell,
        &format!("apt-cache show {unit}"),
        &format!("apt-cache show {unit} >/dev/null 2>&1"),
        timeouts.quick(),
    )
    .await?;
    if !available {
        tracing::info!(version, "adding {PHP_PPA}");
        run_checked(
            ctx.shell,
            "apt-get install software-properties-common",
            &apt_install(&["software-properties-common"]),
            timeouts.default_cmd(),
        )
        .await?;
        run_checked(
            ctx.shell,
            &format!("add-apt-repository {PHP_PPA}"),
            &format!("sudo add-apt-repository -y {PHP_PPA}"),
            timeouts.package_index(),
        )
        .await?;
        run_checked(ctx.shell, "apt-get update", &apt_update(), timeouts.package_index()).await?;
    }

    let required: Vec<String> = REQUIRED_EXTENSIONS
        .iter()
        .map(|ext| format!("php{version}-{ext}"))
        .collect();
    let required: Vec<&str> = required.iter().map(String::as_str).collect();
    run_checked(
        ctx.shell,
        &format!("apt-get install php{version} extensions"),
        &apt_install(&required),
        timeouts.default_cmd(),
    )
    .await?;

    let mut skipped = Vec::new();
    for ext in OPTIONAL_EXTENSIONS {
        let package = format!("php{version}-{ext}");
        let attempt = run_checked(
            ctx.shell,
            &format!("apt-get install {package}"),
            &apt_install(&[package.as_str()]),
            timeouts.default_cmd(),
        )
        .await;
        if let Err(err) = attempt {
            tracing::warn!(%package, "optional extension skipped: {err}");
            skipped.push(package);
        }
    }

    run_checked(ctx.shell, &format!("systemctl enable {unit}"), &enable_service(&unit), timeouts.default_cmd())
        .await?;

    let message = format!("PHP {version} installed");
    if skipped.is_empty() {
        return Ok(StageReport::done(message));
    }
    let caveat = format!("Optional PHP extensions not installed: {}", skipped.join(", "));
    state.skipped.extend(skipped);
    Ok(StageReport::with_caveat(message, caveat))
}

/// `sed` expression replacing a directive whether or not it is commented out.
fn ini_substitution(key: &str, value: &str) -> String {
    format!("s/^;?[[:space:]]*{key}[[:space:]]*=.*/{key} = {value}/")
}

/// Stage 11: apply runtime limits to the FPM `php.ini`, then restart FPM.
///
/// Directives absent from the file are left alone.
pub async fn tune<R: RemoteShell, D>(ctx: &StageCtx<'_, R, D>) -> Result<StageReport> {
    let version = ctx.site.php_version.as_str();
    let timeouts = &ctx.config.timeouts;
    let ini = format!("/etc/php/{version}/fpm/php.ini");
    let overrides = ctx.config.php.ini_overrides();

    for (key, value) in &overrides {
        run_checked(
            ctx.shell,
            &format!("setting {key}"),
            &format!("sudo sed -i -E {} {}", quote(&ini_substitution(key, value)), quote(&ini)),
            timeouts.quick(),
        )
        .await?;
    }

    let unit = fpm_unit(version);
    run_checked(
        ctx.shell,
        &format!("systemctl restart {unit}"),
        &format!("sudo systemctl restart {unit}"),
        timeouts.default_cmd(),
    )
    .await?;

    let applied: Vec<String> = overrides.iter().map(|(k, v)| format!("{k}={v}")).collect();
    Ok(StageReport::done(format!("PHP limits applied: {}", applied.join(", "))))
}
