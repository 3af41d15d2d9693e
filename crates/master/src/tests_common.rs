use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use flotilla_core::task::{JobEvent, Placement, Task};
use flotilla_core::types::{NodeSpec, TaskMode};

use crate::launcher::{KillSignal, WorkerExit, WorkerLauncher, WorkerOutcome, WorkerSpec};

pub fn init_test_log() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

pub fn specs(nodes: &[(&str, u32)]) -> Vec<NodeSpec> {
    nodes
        .iter()
        .map(|(name, capacity)| NodeSpec {
            name: name.to_string(),
            capacity: *capacity,
        })
        .collect()
}

pub fn make_spec(jobname: &str, partid: u32, node: &str) -> WorkerSpec {
    WorkerSpec {
        worker_id: Uuid::new_v4(),
        jobname: jobname.to_string(),
        partid,
        mode: TaskMode::Map,
        node: node.to_string(),
        input: format!("input://{}/{}", jobname, partid),
        data: String::new(),
    }
}

/// A task plus the receiving end of its coordinator channel.
pub fn make_task(jobname: &str, partid: u32, pref: Placement) -> (Task, mpsc::UnboundedReceiver<JobEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (task_on(&tx, jobname, partid, pref), rx)
}

/// A task reporting to an existing coordinator channel.
pub fn task_on(
    tx: &mpsc::UnboundedSender<JobEvent>,
    jobname: &str,
    partid: u32,
    pref: Placement,
) -> Task {
    Task {
        jobname: jobname.to_string(),
        partid,
        mode: TaskMode::Map,
        pref,
        input: format!("input://{}/{}", jobname, partid),
        data: String::new(),
        reply_to: tx.clone(),
    }
}

pub async fn recv_event(rx: &mut mpsc::UnboundedReceiver<JobEvent>) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no job event within 5s")
        .expect("coordinator channel closed")
}

struct Launched {
    spec: WorkerSpec,
    kill: KillSignal,
    exits: mpsc::UnboundedSender<WorkerExit>,
}

/// A launcher the test drives by hand: nothing runs, nothing exits until
/// the test says so.
#[derive(Default)]
pub struct ManualLauncher {
    launched: Mutex<Vec<Launched>>,
}

impl ManualLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Total launches so far, in dispatch order.
    pub fn count(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn spec(&self, index: usize) -> WorkerSpec {
        self.launched.lock().unwrap()[index].spec.clone()
    }

    pub fn is_killed(&self, index: usize) -> bool {
        self.launched.lock().unwrap()[index].kill.is_killed()
    }

    /// Report the worker's termination, as the worker process would.
    pub fn finish(&self, index: usize, outcome: WorkerOutcome) {
        let launched = self.launched.lock().unwrap();
        let worker = &launched[index];
        let _ = worker.exits.send(WorkerExit {
            worker_id: worker.spec.worker_id,
            outcome,
        });
    }

    /// The exit channel of a launched worker, for injecting bogus reports.
    pub fn exit_sender(&self, index: usize) -> mpsc::UnboundedSender<WorkerExit> {
        self.launched.lock().unwrap()[index].exits.clone()
    }
}

impl WorkerLauncher for ManualLauncher {
    fn launch(&self, spec: WorkerSpec, kill: KillSignal, exits: mpsc::UnboundedSender<WorkerExit>) {
        self.launched.lock().unwrap().push(Launched { spec, kill, exits });
    }
}
