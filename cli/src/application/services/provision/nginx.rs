//! Stage 8: the site's nginx virtual host.

use anyhow::Result;

use super::{ProvisioningState, StageCtx};
use crate::application::ports::RemoteShell;
use crate::application::services::executor::run_checked;
use crate::application::services::step::StageReport;
use crate::domain::error::ProvisionError;
use crate::domain::shell::{quote, write_file};
use crate::domain::templates::{FASTCGI_SNIPPET, FastcgiMode, VhostParams, render_vhost};

const SITES_AVAILABLE: &str = "/etc/nginx/sites-available";
const SITES_ENABLED: &str = "/etc/nginx/sites-enabled";

/// Outcome of `nginx -t`: `None` when the configuration is valid.
async fn validation_error<R: RemoteShell, D>(ctx: &StageCtx<'_, R, D>) -> Result<Option<String>> {
    let outcome = ctx
        .shell
        .exec("nginx -t", "sudo nginx -t", ctx.config.timeouts.quick())
        .await?;
    Ok((!outcome.success()).then(|| outcome.diagnostic()))
}

async fn write_vhost<R: RemoteShell, D>(
    ctx: &StageCtx<'_, R, D>,
    state: &ProvisioningState,
    path: &str,
    mode: FastcgiMode,
) -> Result<()> {
    let content = render_vhost(&VhostParams {
        domain: &ctx.site.domain,
        root: &state.install_dir,
        php_version: &ctx.site.php_version,
        upload_limit: &ctx.config.php.upload_max_filesize,
        fastcgi: mode,
    });
    run_checked(
        ctx.shell,
        "writing nginx site configuration",
        &write_file(path, &content)?,
        ctx.config.timeouts.quick(),
    )
    .await?;
    Ok(())
}

/// Write and enable the vhost, validate, and reload.
///
/// When validation fails because the stock FastCGI snippet is missing on
/// this host, the vhost is rewritten with the directives inline and
/// validated once more.
pub async fn configure<R: RemoteShell, D>(
    ctx: &StageCtx<'_, R, D>,
    state: &mut ProvisioningState,
) -> Result<StageReport> {
    let timeouts = &ctx.config.timeouts;
    let available = format!("{SITES_AVAILABLE}/{}", ctx.site.domain);
    let enabled = format!("{SITES_ENABLED}/{}", ctx.site.domain);

    write_vhost(ctx, state, &available, FastcgiMode::Snippet).await?;
    run_checked(
        ctx.shell,
        "enabling nginx site",
        &format!("sudo ln -sf {} {}", quote(&available), quote(&enabled)),
        timeouts.quick(),
    )
    .await?;
    run_checked(
        ctx.shell,
        "disabling default nginx site",
        &format!("sudo rm -f {SITES_ENABLED}/default"),
        timeouts.quick(),
    )
    .await?;

    if let Some(diagnostic) = validation_error(ctx).await? {
        if !diagnostic.contains(FASTCGI_SNIPPET) {
            return Err(ProvisionError::ConfigValidation(diagnostic).into());
        }
        tracing::warn!("{FASTCGI_SNIPPET} unavailable, writing FastCGI parameters inline");
        write_vhost(ctx, state, &available, FastcgiMode::Inline).await?;
        if let Some(diagnostic) = validation_error(ctx).await? {
            return Err(ProvisionError::ConfigValidation(diagnostic).into());
        }
        state.fastcgi = FastcgiMode::Inline;
    }

    run_checked(ctx.shell, "reloading nginx", "sudo systemctl reload nginx", timeouts.quick()).await?;

    Ok(StageReport::done(match state.fastcgi {
        FastcgiMode::Snippet => format!("Nginx serving {}", ctx.site.domain),
        FastcgiMode::Inline => format!("Nginx serving {} (inline FastCGI parameters)", ctx.site.domain),
    }))
}
