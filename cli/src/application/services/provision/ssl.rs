//! Stage 12: TLS certificate from Let's Encrypt via certbot.
//!
//! Run as a best-effort stage: any error here leaves the site on HTTP.

use std::net::IpAddr;

use anyhow::Result;

use super::wordpress::url_update_commands;
use super::{ProvisioningState, StageCtx};
use crate::application::ports::{DnsResolver, RemoteShell};
use crate::application::services::executor::{probe, run_checked};
use crate::application::services::step::StageReport;
use crate::domain::error::ProvisionError;
use crate::domain::shell::{apt_install, binary_present, quote};

/// Names to put on the certificate: always the bare domain, plus `www.`
/// only when it reaches the same host.
#[must_use]
pub fn certificate_names(domain: &str, bare: &[IpAddr], www: &[IpAddr]) -> Vec<String> {
    let mut names = vec![domain.to_string()];
    if www.iter().any(|addr| bare.contains(addr)) {
        names.push(format!("www.{domain}"));
    }
    names
}

fn certbot_command(names: &[String], email: &str) -> String {
    let domains: Vec<String> = names.iter().map(|n| format!("-d {}", quote(n))).collect();
    format!(
        "sudo certbot --nginx --non-interactive --agree-tos --redirect -m {} {}",
        quote(email),
        domains.join(" ")
    )
}

pub async fn issue<R: RemoteShell, D: DnsResolver>(
    ctx: &StageCtx<'_, R, D>,
    state: &mut ProvisioningState,
) -> Result<StageReport> {
    let timeouts = &ctx.config.timeouts;
    let domain = ctx.site.domain.as_str();
    let www = format!("www.{domain}");

    let (bare, alias) = tokio::join!(ctx.dns.resolve(domain), ctx.dns.resolve(&www));
    let bare = bare?;
    if bare.is_empty() {
        return Err(ProvisionError::DomainUnresolved {
            domain: domain.to_string(),
        }
        .into());
    }
    let alias = alias.unwrap_or_else(|err| {
        tracing::debug!(%www, "lookup failed: {err:#}");
        Vec::new()
    });
    let names = certificate_names(domain, &bare, &alias);

    if !probe(ctx.shell, "checking for certbot", &binary_present("certbot"), timeouts.quick()).await? {
        run_checked(
            ctx.shell,
            "apt-get install certbot",
            &apt_install(&["certbot", "python3-certbot-nginx"]),
            timeouts.default_cmd(),
        )
        .await?;
    }
    run_checked(
        ctx.shell,
        "certbot --nginx",
        &certbot_command(&names, &ctx.site.admin_email),
        timeouts.certificate(),
    )
    .await?;
    run_checked(ctx.shell, "reloading nginx", "sudo systemctl reload nginx", timeouts.quick()).await?;
    state.ssl_enabled = true;

    let issued = if names.len() == 2 {
        format!("Certificate issued for {domain} and {www}")
    } else {
        format!("Certificate issued for {domain} only; {www} does not point to the same address")
    };

    let https = format!("https://{domain}");
    for (label, script) in url_update_commands(&ctx.config.paths.wp_cli, &state.install_dir, &https) {
        // The certificate stays in place even when the stored URLs lag behind.
        if let Err(err) = run_checked(ctx.shell, &label, &script, timeouts.quick()).await {
            tracing::warn!("{label}: {err}");
            return Ok(StageReport::with_caveat(
                issued,
                format!("WordPress URLs still point to http://{domain}: {err}"),
            ));
        }
    }

    Ok(StageReport::done(issued))
}
