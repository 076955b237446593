//! WordPress itself: download (stage 6), configuration (stage 7) and the
//! WP-CLI install that creates the admin account (stage 9).

use anyhow::Result;

use super::{ProvisioningState, StageCtx};
use crate::application::ports::RemoteShell;
use crate::application::services::executor::{probe, run_checked};
use crate::application::services::step::StageReport;
use crate::domain::secrets::SaltSet;
use crate::domain::shell::{quote, write_file};
use crate::domain::templates::{WpConfigParams, render_wp_config};

/// Where WP-CLI is staged before it is moved into place.
const WP_CLI_STAGING: &str = "/tmp/siteforge-wp-cli.phar";

/// Stage 6: fetch the latest release and copy it into the install directory.
pub async fn download<R: RemoteShell, D>(
    ctx: &StageCtx<'_, R, D>,
    state: &ProvisioningState,
) -> Result<StageReport> {
    let timeouts = &ctx.config.timeouts;
    let scratch = quote(&ctx.config.paths.scratch_dir);
    let dir = quote(&state.install_dir);

    run_checked(
        ctx.shell,
        "preparing scratch directory",
        &format!("rm -rf {scratch} && mkdir -p {scratch}"),
        timeouts.quick(),
    )
    .await?;
    run_checked(
        ctx.shell,
        "downloading WordPress",
        &format!(
            "curl -fsSL {} -o {scratch}/latest.tar.gz",
            quote(&ctx.config.urls.wordpress_archive)
        ),
        timeouts.download(),
    )
    .await?;
    run_checked(
        ctx.shell,
        "unpacking WordPress",
        &format!("tar -xzf {scratch}/latest.tar.gz -C {scratch}"),
        timeouts.default_cmd(),
    )
    .await?;
    run_checked(
        ctx.shell,
        "copying WordPress files",
        &format!("sudo mkdir -p {dir} && sudo cp -a {scratch}/wordpress/. {dir}/"),
        timeouts.default_cmd(),
    )
    .await?;
    run_checked(
        ctx.shell,
        "removing scratch directory",
        &format!("rm -rf {scratch}"),
        timeouts.quick(),
    )
    .await?;

    Ok(StageReport::done(format!("WordPress copied to {}", state.install_dir)))
}

/// Stage 7: write `wp-config.php`, then hand the tree to the web server user.
pub async fn write_config<R: RemoteShell, D>(
    ctx: &StageCtx<'_, R, D>,
    state: &ProvisioningState,
) -> Result<StageReport> {
    let timeouts = &ctx.config.timeouts;
    let salts = SaltSet::generate();
    let content = render_wp_config(&WpConfigParams {
        db_name: &state.db_name,
        db_user: &state.db_user,
        db_password: state.db_password.expose(),
        salts: &salts,
    });
    let path = format!("{}/wp-config.php", state.install_dir);
    let dir = quote(&state.install_dir);

    run_checked(ctx.shell, "writing wp-config.php", &write_file(&path, &content)?, timeouts.quick()).await?;
    run_checked(
        ctx.shell,
        "setting ownership",
        &format!("sudo chown -R www-data:www-data {dir}"),
        timeouts.default_cmd(),
    )
    .await?;
    run_checked(
        ctx.shell,
        "setting permissions",
        &format!(
            "sudo find {dir} -type d -exec chmod 755 {{}} + && \
             sudo find {dir} -type f -exec chmod 644 {{}} + && \
             sudo chmod 640 {}",
            quote(&path)
        ),
        timeouts.default_cmd(),
    )
    .await?;

    Ok(StageReport::done("wp-config.php written with fresh keys and salts"))
}

/// `wp` invoked as the web server user against the install directory.
fn wp_command(wp_cli: &str, install_dir: &str, args: &str) -> String {
    format!("sudo -u www-data {wp_cli} --path={} {args}", quote(install_dir))
}

async fn ensure_wp_cli<R: RemoteShell, D>(ctx: &StageCtx<'_, R, D>) -> Result<()> {
    let timeouts = &ctx.config.timeouts;
    let wp = quote(&ctx.config.paths.wp_cli);
    if probe(ctx.shell, "checking for WP-CLI", &format!("test -x {wp}"), timeouts.quick()).await? {
        return Ok(());
    }
    run_checked(
        ctx.shell,
        "downloading WP-CLI",
        &format!("curl -fsSL {} -o {WP_CLI_STAGING}", quote(&ctx.config.urls.wp_cli_phar)),
        timeouts.download(),
    )
    .await?;
    run_checked(ctx.shell, "verifying WP-CLI", &format!("php {WP_CLI_STAGING} --info"), timeouts.quick()).await?;
    run_checked(
        ctx.shell,
        "installing WP-CLI",
        &format!("chmod +x {WP_CLI_STAGING} && sudo mv -f {WP_CLI_STAGING} {wp}"),
        timeouts.quick(),
    )
    .await?;
    Ok(())
}

/// Stage 9: create the site and its admin account, unless WordPress is
/// already initialized in the install directory.
pub async fn install<R: RemoteShell, D>(
    ctx: &StageCtx<'_, R, D>,
    state: &mut ProvisioningState,
) -> Result<StageReport> {
    let timeouts = &ctx.config.timeouts;
    let site = ctx.site;
    let wp_cli = ctx.config.paths.wp_cli.as_str();

    ensure_wp_cli(ctx).await?;

    let initialized = probe(
        ctx.shell,
        "checking for an existing installation",
        &wp_command(wp_cli, &state.install_dir, "core is-installed"),
        timeouts.quick(),
    )
    .await?;
    if initialized {
        state.admin_created = false;
        return Ok(StageReport::with_caveat(
            "WordPress already initialized; existing site kept",
            format!(
                "Existing installation in {} was kept; the admin password was not changed",
                state.install_dir
            ),
        ));
    }

    let args = format!(
        "core install --url={} --title={} --admin_user={} --admin_password={} --admin_email={} --skip-email",
        quote(&format!("http://{}", site.domain)),
        quote(&site.title),
        quote(&site.admin_user),
        quote(state.admin_password.expose()),
        quote(&site.admin_email),
    );
    run_checked(
        ctx.shell,
        "wp core install",
        &wp_command(wp_cli, &state.install_dir, &args),
        timeouts.default_cmd(),
    )
    .await?;
    state.admin_created = true;

    Ok(StageReport::done(format!("WordPress installed; admin user {}", site.admin_user)))
}

/// `wp option update` for the canonical URLs, used once TLS is active.
pub(super) fn url_update_commands(wp_cli: &str, install_dir: &str, url: &str) -> [(String, String); 2] {
    ["home", "siteurl"].map(|option| {
        (
            format!("wp option update {option}"),
            wp_command(wp_cli, install_dir, &format!("option update {option} {}", quote(url))),
        )
    })
}
