//! `ChannelSink`: Presentation-layer implementation of `ProgressSink`.
//!
//! Records go through an unbounded tokio channel to whichever task renders
//! them, so a slow terminal never stalls the installation.

use std::sync::Mutex;

use siteforge_common::StreamRecord;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::application::ports::ProgressSink;

/// Channel-backed sink.
///
/// Once the receiver is gone, or after [`ChannelSink::close`], `emit`
/// silently drops records.
pub struct ChannelSink {
    tx: Mutex<Option<UnboundedSender<StreamRecord>>>,
}

impl ChannelSink {
    #[must_use]
    pub fn new() -> (Self, UnboundedReceiver<StreamRecord>) {
        let (tx, rx) = unbounded_channel();
        let sink = Self {
            tx: Mutex::new(Some(tx)),
        };
        (sink, rx)
    }

    /// Drop the sender so the receiving side sees end of stream.
    pub fn close(&self) {
        self.tx
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, record: StreamRecord) {
        let mut tx = self.tx.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let delivered = tx.as_ref().is_some_and(|sender| sender.send(record).is_ok());
        if !delivered && tx.take().is_some() {
            tracing::debug!("progress observer went away; no further records are sent");
        }
    }
}
