//! Human-readable terminal renderer.

use anyhow::{Context, Result};
use owo_colors::OwoColorize as _;
use siteforge_common::{InstallationFailure, InstallationSummary, ProbeReport};

use crate::domain::config::SiteforgeConfig;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("siteforge {version}");
    }

    /// Render the result of a connectivity probe.
    pub fn render_probe(&self, target: &str, report: &ProbeReport) {
        match (&report.facts, &report.reason) {
            (Some(facts), _) => {
                self.ctx.success(&format!("Connected to {target}"));
                self.ctx.kv("OS:         ", &facts.os);
                self.ctx.kv("Memory:     ", &facts.memory);
                self.ctx.kv("Free disk:  ", &facts.free_disk);
            }
            (None, reason) => {
                self.ctx.error(&format!(
                    "Cannot reach {target}: {}",
                    reason.as_deref().unwrap_or("unknown error")
                ));
            }
        }
    }

    /// Render the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized.
    pub fn render_config(&self, config: &SiteforgeConfig, path: &std::path::Path) -> Result<()> {
        let yaml = serde_yaml::to_string(config).context("cannot serialize config")?;
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        for line in yaml.lines() {
            println!("    {line}");
        }
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["SITEFORGE_CONFIG", "NO_COLOR", "RUST_LOG"] {
            println!(
                "    {:<18} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        println!();
        Ok(())
    }

    /// Render the credentials and URLs of a finished installation.
    ///
    /// Printed even in quiet mode: this is the only place the generated
    /// passwords are ever shown.
    pub fn render_summary(&self, summary: &InstallationSummary) {
        let styles = &self.ctx.styles;
        println!();
        println!("  {}", "WordPress is ready".style(styles.header));
        println!();
        println!("    {:<16} {}", "Site:", summary.site_url);
        println!("    {:<16} {}", "Admin:", summary.admin_url);
        println!("    {:<16} {}", "Admin user:", summary.admin_username);
        match &summary.admin_password {
            Some(password) => println!("    {:<16} {}", "Admin password:", password.style(styles.secret)),
            None => println!("    {:<16} {}", "Admin password:", "(unchanged)".style(styles.dim)),
        }
        println!("    {:<16} {}", "Database:", summary.db_name);
        println!("    {:<16} {}", "Database user:", summary.db_user);
        println!("    {:<16} {}", "DB password:", summary.db_password.style(styles.secret));
        println!("    {:<16} {}", "Installed in:", summary.install_dir);
        let tls = match (summary.ssl_requested, summary.ssl_enabled) {
            (_, true) => "enabled",
            (true, false) => "requested, not active",
            (false, false) => "not requested",
        };
        println!("    {:<16} {tls}", "TLS:");

        if !summary.caveats.is_empty() {
            println!();
            for caveat in &summary.caveats {
                println!("  {} {caveat}", "⚠".style(styles.warning));
            }
        }
        println!();
        println!(
            "  {}",
            "Store these credentials now; they are not saved anywhere.".style(styles.dim)
        );
    }

    /// Render the terminal failure of an installation.
    pub fn render_failure(&self, failure: &InstallationFailure) {
        self.ctx.error(&format!(
            "Installation failed at {}: {}",
            failure.stage.style(self.ctx.styles.stage),
            failure.message
        ));
        eprintln!(
            "    Re-running the same command resumes safely; completed steps are skipped or repeated."
        );
    }
}
