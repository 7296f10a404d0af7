use serde::Serialize;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressKind {
    /// The orchestrator moved into `stage`.
    StageStarted,
    /// One item (or judge batch) of `stage` finished.
    ItemCompleted,
    /// Every item of `stage` finished or was marked undispatched.
    StageFinished,
    /// The run reached Done. `stage` is the last stage entered.
    RunCompleted,
    /// The run entered Failed while in `stage`.
    RunFailed,
}

/// Observability event. Consumers read them from the receiver half of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressEvent {
    pub kind: ProgressKind,
    pub stage: Stage,
    pub completed: usize,
    pub total: usize,
}

/// Append-only progress channel. Sending never blocks; a dropped receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<UnboundedSender<ProgressEvent>>,
}

impl ProgressReporter {
    /// Reporter that discards every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn channel() -> (Self, UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, kind: ProgressKind, stage: Stage, completed: usize, total: usize) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(ProgressEvent {
                kind,
                stage,
                completed,
                total,
            });
        }
    }
}
