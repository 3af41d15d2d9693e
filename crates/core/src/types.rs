use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Nodes are addressed by name; name order is the deterministic tie-break
/// for scheduling decisions.
pub type NodeName = String;

pub type WorkerId = Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskMode {
    Map,
    Reduce,
}

/// Outcome reported for a finished worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResultKind {
    Ok,
    /// The input for this partition was unreadable or corrupt on the node.
    DataError,
    /// The job's own code failed.
    JobError,
    /// The worker itself died (crash, kill, timeout, lost process).
    Error,
}

/// One configured compute node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeSpec {
    pub name: NodeName,
    pub capacity: u32,
}

/// Per-node outcome counters. Monotone; never reset by a config reload.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeStats {
    pub ok: u64,
    pub data_error: u64,
    pub crash: u64,
}

impl NodeStats {
    /// Bump the counter for a reported outcome. Job errors and worker
    /// crashes both count against the node as crashes.
    pub fn record(&mut self, kind: ResultKind) {
        match kind {
            ResultKind::Ok => self.ok += 1,
            ResultKind::DataError => self.data_error += 1,
            ResultKind::JobError | ResultKind::Error => self.crash += 1,
        }
    }
}

/// One row of a cluster status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeReport {
    pub name: NodeName,
    pub capacity: u32,
    pub load: u32,
    pub stats: NodeStats,
    pub blacklisted: bool,
}

/// A currently running worker, as seen by status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveWorker {
    pub jobname: String,
    pub partid: u32,
    pub mode: TaskMode,
    pub node: NodeName,
}

/// Full cluster snapshot: configured nodes plus everything running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub nodes: Vec<NodeReport>,
    pub active: Vec<ActiveWorker>,
}

// --- Display implementations ---

impl std::fmt::Display for TaskMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskMode::Map => write!(f, "map"),
            TaskMode::Reduce => write!(f, "reduce"),
        }
    }
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultKind::Ok => write!(f, "ok"),
            ResultKind::DataError => write!(f, "data_error"),
            ResultKind::JobError => write!(f, "job_error"),
            ResultKind::Error => write!(f, "error"),
        }
    }
}
