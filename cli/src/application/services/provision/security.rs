//! Stage 10: host firewall.

use anyhow::Result;

use super::StageCtx;
use crate::application::ports::RemoteShell;
use crate::application::services::executor::{probe, run_checked};
use crate::application::services::step::StageReport;
use crate::domain::shell::{apt_install, binary_present};

/// `ufw` rules in the order they are applied. The session's own port comes
/// first so enabling the firewall cannot cut the connection.
#[must_use]
pub fn firewall_rules(ssh_port: u16) -> [(String, String); 3] {
    [ssh_port, 80, 443].map(|port| {
        (
            format!("ufw allow {port}/tcp"),
            format!("sudo ufw allow {port}/tcp"),
        )
    })
}

pub async fn enable_firewall<R: RemoteShell, D>(ctx: &StageCtx<'_, R, D>) -> Result<StageReport> {
    let timeouts = &ctx.config.timeouts;
    if !probe(ctx.shell, "checking for ufw", &binary_present("ufw"), timeouts.quick()).await? {
        run_checked(ctx.shell, "apt-get install ufw", &apt_install(&["ufw"]), timeouts.default_cmd()).await?;
    }
    for (label, script) in firewall_rules(ctx.ssh_port) {
        run_checked(ctx.shell, &label, &script, timeouts.quick()).await?;
    }
    run_checked(ctx.shell, "ufw enable", "sudo ufw --force enable", timeouts.quick()).await?;

    Ok(StageReport::done(format!(
        "Firewall active; allowing {}/tcp, 80/tcp, 443/tcp",
        ctx.ssh_port
    )))
}
