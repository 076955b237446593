//! `TerminalReporter`: renders the installation stream as it arrives.
//!
//! Runs alongside the installation and drains the receiving half of a
//! [`crate::output::sink::ChannelSink`]. Human mode shows one spinner per
//! running stage; JSON mode prints one record per line.

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;
use siteforge_common::{ProgressEvent, StageStatus, StreamRecord};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::app::OutputMode;
use crate::output::{HumanRenderer, OutputContext, json, progress};

/// Stream renderer over an `OutputContext`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    mode: OutputMode,
}

impl<'a> TerminalReporter<'a> {
    /// Create a new `TerminalReporter` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext, mode: OutputMode) -> Self {
        Self { ctx, mode }
    }

    /// Render records until the stream ends.
    pub async fn consume(&self, mut rx: UnboundedReceiver<StreamRecord>) {
        let mut spinner: Option<ProgressBar> = None;
        while let Some(record) = rx.recv().await {
            match self.mode {
                OutputMode::Json => match json::record_line(&record) {
                    Ok(line) => println!("{line}"),
                    Err(err) => tracing::warn!("cannot encode record: {err:#}"),
                },
                OutputMode::Human => self.render_human(&record, &mut spinner),
            }
        }
        if let Some(pb) = spinner.take() {
            pb.finish_and_clear();
        }
    }

    fn render_human(&self, record: &StreamRecord, spinner: &mut Option<ProgressBar>) {
        match record {
            StreamRecord::Progress(event) => self.render_event(event, spinner),
            StreamRecord::Complete(summary) => {
                HumanRenderer::new(self.ctx).render_summary(summary);
            }
            StreamRecord::Error(failure) => {
                if let Some(pb) = spinner.take() {
                    progress::finish_error(&pb, &failure.message);
                }
                HumanRenderer::new(self.ctx).render_failure(failure);
            }
        }
    }

    fn render_event(&self, event: &ProgressEvent, spinner: &mut Option<ProgressBar>) {
        match event.status {
            StageStatus::Running => {
                if let Some(pb) = spinner.take() {
                    pb.finish_and_clear();
                }
                if self.ctx.show_progress() {
                    *spinner = Some(progress::spinner(&event.message));
                } else if !self.ctx.quiet {
                    println!(
                        "  {} {} {}",
                        "→".style(self.ctx.styles.info),
                        event.stage.style(self.ctx.styles.stage),
                        event.message
                    );
                }
            }
            StageStatus::Completed => {
                match spinner.take() {
                    Some(pb) => progress::finish_ok(&pb, &event.message),
                    None => self.ctx.success(&event.message),
                }
                if let Some(detail) = &event.detail {
                    self.ctx.warn(detail);
                }
            }
            StageStatus::Failed => match spinner.take() {
                Some(pb) => progress::finish_error(&pb, &event.message),
                None => self.ctx.error(&event.message),
            },
        }
    }
}
