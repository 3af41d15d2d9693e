use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::{NodeName, ResultKind, TaskMode};

/// Placement hints for one task: the node it would ideally run on and the
/// nodes that have already failed it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Placement {
    pub preferred: Option<NodeName>,
    /// Accumulated by the job coordinator: every node this particular
    /// partition has already failed on.
    pub blacklist: Vec<NodeName>,
}

impl Placement {
    pub fn preferring(node: impl Into<NodeName>) -> Self {
        Self {
            preferred: Some(node.into()),
            blacklist: Vec::new(),
        }
    }

    pub fn anywhere() -> Self {
        Self::default()
    }
}

/// One partition of a job, as submitted by a job coordinator.
/// Immutable once submitted.
#[derive(Debug, Clone)]
pub struct Task {
    pub jobname: String,
    pub partid: u32,
    pub mode: TaskMode,
    pub pref: Placement,
    /// Opaque payloads forwarded verbatim to the worker.
    pub input: String,
    pub data: String,
    /// Where outcome notifications for this task are delivered.
    pub reply_to: mpsc::UnboundedSender<JobEvent>,
}

/// Async notification from the master back to the job coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    /// A worker for this job terminated, in any fashion.
    Done {
        kind: ResultKind,
        message: String,
        node: NodeName,
        partid: u32,
    },
    /// The task could not be placed anywhere and has been dropped.
    MasterError { message: String },
}
