//! Stage bracketing: every stage reports `running`, then exactly one of
//! `completed` or `failed`, through the [`ProgressSink`].
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::future::Future;

use anyhow::Result;
use siteforge_common::{ProgressEvent, Stage, StageStatus, StreamRecord};

use crate::application::ports::ProgressSink;

/// What a finished stage reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub message: String,
    /// Something the operator should know about, even though the stage
    /// succeeded. Ends up in the summary's caveats.
    pub caveat: Option<String>,
}

impl StageReport {
    pub fn done(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            caveat: None,
        }
    }

    pub fn with_caveat(message: impl Into<String>, caveat: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            caveat: Some(caveat.into()),
        }
    }
}

/// A mandatory stage failed; the run stops here.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: anyhow::Error,
}

impl StageFailure {
    /// Operator-facing message with the full context chain.
    #[must_use]
    pub fn message(&self) -> String {
        format!("{:#}", self.error)
    }
}

/// Emits the progress brackets around each stage.
pub struct StageRunner<'a, S: ProgressSink + ?Sized> {
    sink: &'a S,
}

impl<'a, S: ProgressSink + ?Sized> StageRunner<'a, S> {
    pub fn new(sink: &'a S) -> Self {
        Self { sink }
    }

    pub fn emit(&self, event: ProgressEvent) {
        self.sink.emit(StreamRecord::Progress(event));
    }

    fn started(&self, stage: Stage, label: &str) {
        tracing::info!(%stage, "{label}");
        self.emit(ProgressEvent::new(stage, StageStatus::Running, label));
    }

    fn completed(&self, stage: Stage, report: &StageReport) {
        let event = ProgressEvent::new(stage, StageStatus::Completed, &report.message);
        self.emit(match &report.caveat {
            Some(caveat) => event.with_detail(caveat),
            None => event,
        });
    }

    /// Run a stage whose failure aborts the installation.
    ///
    /// # Errors
    ///
    /// Returns a [`StageFailure`] carrying `stage` and the error, annotated
    /// with `label`, after emitting the `failed` event.
    pub async fn mandatory<F>(&self, stage: Stage, label: &str, work: F) -> Result<StageReport, StageFailure>
    where
        F: Future<Output = Result<StageReport>>,
    {
        self.started(stage, label);
        match work.await {
            Ok(report) => {
                self.completed(stage, &report);
                Ok(report)
            }
            Err(err) => {
                let error = err.context(label.to_string());
                tracing::error!(%stage, "{error:#}");
                self.emit(ProgressEvent::new(
                    stage,
                    StageStatus::Failed,
                    &format!("{error:#}"),
                ));
                Err(StageFailure { stage, error })
            }
        }
    }

    /// Run a stage whose failure is tolerated.
    ///
    /// A failure still ends in `completed`, with `fallback` as the message
    /// and the error as detail and caveat.
    pub async fn best_effort<F>(&self, stage: Stage, label: &str, fallback: &str, work: F) -> StageReport
    where
        F: Future<Output = Result<StageReport>>,
    {
        self.started(stage, label);
        let report = match work.await {
            Ok(report) => report,
            Err(err) => {
                let error = err.context(label.to_string());
                tracing::warn!(%stage, "{error:#}");
                StageReport::with_caveat(fallback, format!("{error:#}"))
            }
        };
        self.completed(stage, &report);
        report
    }
}
