//! The master loop, the scheduling and worker-lifecycle authority.
//!
//! One owning task drains a command queue; every operation that touches
//! the registry or the waitlist runs inside it, one at a time, in arrival
//! order. That serialization is the correctness backbone: node selection
//! reads load and dispatch increments it, and nothing can interleave
//! between the two. Worker terminations arrive on a second channel into
//! the same loop, so a termination's load decrement is visible to every
//! later placement decision.
//!
//! The loop is poke-driven. Submissions, terminations, whitelisting and
//! config reloads each re-run the waitlist scan; the scan dispatches
//! heads until one cannot be placed, then stops until the next poke.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use flotilla_core::config::validate_nodes;
use flotilla_core::task::{JobEvent, Task};
use flotilla_core::types::{ActiveWorker, ClusterInfo, NodeName, NodeReport, NodeSpec};
use flotilla_scheduler::{select, Selection};

use crate::error::{MasterError, MasterResult};
use crate::event_log::EventLog;
use crate::launcher::{kill_pair, WorkerExit, WorkerLauncher, WorkerSpec};
use crate::registry::{Registry, WorkerRecord};

const ALL_NODES_FAILED: &str = "Job failed on all available nodes";

enum Command {
    Submit(Task),
    KillJob {
        jobname: String,
    },
    CleanJob {
        jobname: String,
    },
    Blacklist {
        node: NodeName,
    },
    Whitelist {
        node: NodeName,
    },
    UpdateConfig {
        nodes: Vec<NodeSpec>,
    },
    GetActive {
        jobname: String,
        reply: oneshot::Sender<(Vec<NodeName>, Vec<u32>)>,
    },
    NodeInfo {
        reply: oneshot::Sender<ClusterInfo>,
    },
    NodeInfoFor {
        node: NodeName,
        reply: oneshot::Sender<Option<(NodeReport, Vec<ActiveWorker>)>>,
    },
}

pub struct Master {
    registry: Registry,
    waitlist: VecDeque<Task>,
    launcher: Arc<dyn WorkerLauncher>,
    events: Arc<dyn EventLog>,
    exit_tx: mpsc::UnboundedSender<WorkerExit>,
}

impl Master {
    /// Start the master on the current runtime and return its handle.
    /// The node table must pass validation (unique, non-empty names).
    /// The master stops once every handle is dropped.
    pub fn spawn(
        nodes: Vec<NodeSpec>,
        launcher: Arc<dyn WorkerLauncher>,
        events: Arc<dyn EventLog>,
    ) -> MasterResult<MasterHandle> {
        validate_nodes(&nodes)?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();

        let mut registry = Registry::new();
        registry.apply_config(&nodes);
        info!("Master starting with {} configured nodes", nodes.len());

        let master = Master {
            registry,
            waitlist: VecDeque::new(),
            launcher,
            events,
            exit_tx,
        };
        tokio::spawn(master.run(cmd_rx, exit_rx));

        Ok(MasterHandle { tx: cmd_tx })
    }

    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut exit_rx: mpsc::UnboundedReceiver<WorkerExit>,
    ) {
        loop {
            tokio::select! {
                command = cmd_rx.recv() => match command {
                    Some(command) => self.handle_command(command),
                    // every handle is gone; stopping drops the kill
                    // handles, which running workers observe
                    None => break,
                },
                Some(exit) = exit_rx.recv() => self.clean_worker(exit),
            }
        }
        info!("Master stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Submit(task) => {
                self.events.job_event(
                    &task.jobname,
                    format!("{}:{} added to waitlist", task.mode, task.partid),
                );
                self.waitlist.push_back(task);
                self.schedule();
            }
            Command::KillJob { jobname } => self.kill_job(&jobname),
            Command::CleanJob { jobname } => {
                self.kill_job(&jobname);
                self.events.drop_job(&jobname);
            }
            Command::Blacklist { node } => {
                if self.registry.blacklist_node(&node) {
                    self.events.cluster_event(format!("node {} blacklisted", node));
                }
            }
            Command::Whitelist { node } => {
                if self.registry.whitelist_node(&node) {
                    self.events.cluster_event(format!("node {} whitelisted", node));
                }
                self.schedule();
            }
            Command::UpdateConfig { nodes } => match validate_nodes(&nodes) {
                Ok(()) => {
                    self.registry.apply_config(&nodes);
                    self.events
                        .cluster_event(format!("cluster config reloaded: {} nodes", nodes.len()));
                    self.schedule();
                }
                // keep the current table; a half-applied reload is worse
                Err(e) => {
                    warn!("Rejecting config reload: {}", e);
                    self.events
                        .cluster_event(format!("config reload rejected: {}", e));
                }
            },
            Command::GetActive { jobname, reply } => {
                let _ = reply.send(self.registry.active_of_job(&jobname));
            }
            Command::NodeInfo { reply } => {
                let _ = reply.send(ClusterInfo {
                    nodes: self.registry.reports(),
                    active: self.registry.active_workers(),
                });
            }
            Command::NodeInfoFor { node, reply } => {
                let snapshot = self
                    .registry
                    .report_for(&node)
                    .map(|report| (report, self.registry.active_on_node(&node)));
                let _ = reply.send(snapshot);
            }
        }
    }

    /// Drain the waitlist head for as long as each head either dispatches
    /// or fails terminally. `Busy` and a retryable `AllBad` leave the head
    /// in place for the next poke; later tasks wait behind it (strict
    /// FIFO).
    fn schedule(&mut self) {
        loop {
            let selection = {
                let Some(head) = self.waitlist.front() else { break };
                select(
                    head.pref.preferred.as_deref(),
                    &head.pref.blacklist,
                    self.registry.blacklist(),
                    &self.registry.node_views(),
                )
            };
            match selection {
                Selection::Node(node) => {
                    if let Some(task) = self.waitlist.pop_front() {
                        self.start_worker(task, node);
                    }
                }
                Selection::Busy => break,
                Selection::AllBad { tried, total } => {
                    if tried >= total {
                        // failed everywhere it could ever run
                        if let Some(task) = self.waitlist.pop_front() {
                            self.fail_unplaceable(task);
                        }
                    } else {
                        // excluded for now; a whitelist or reload may free it
                        break;
                    }
                }
            }
        }
    }

    fn start_worker(&mut self, task: Task, node: NodeName) {
        let worker_id = Uuid::new_v4();
        // the slot is taken before the worker can possibly report back
        self.registry.inc_load(&node);

        let spec = WorkerSpec {
            worker_id,
            jobname: task.jobname.clone(),
            partid: task.partid,
            mode: task.mode,
            node: node.clone(),
            input: task.input,
            data: task.data,
        };
        let (kill, signal) = kill_pair();
        self.registry.insert_worker(WorkerRecord {
            id: worker_id,
            jobname: task.jobname.clone(),
            partid: task.partid,
            mode: task.mode,
            node: node.clone(),
            reply_to: task.reply_to,
            kill,
        });

        info!(
            "Dispatching {}:{} of job {} to {}",
            spec.mode, spec.partid, spec.jobname, node
        );
        self.events.job_event(
            &task.jobname,
            format!("{}:{} assigned to {}", spec.mode, spec.partid, node),
        );
        self.launcher.launch(spec, signal, self.exit_tx.clone());
    }

    fn fail_unplaceable(&mut self, task: Task) {
        warn!(
            "Job {} {}:{} has failed on every configured node",
            task.jobname, task.mode, task.partid
        );
        self.events.job_event(
            &task.jobname,
            format!("{}:{} failed on all available nodes", task.mode, task.partid),
        );
        let _ = task.reply_to.send(JobEvent::MasterError {
            message: ALL_NODES_FAILED.to_string(),
        });
    }

    /// Bookkeeping for every worker death, normal or abnormal.
    fn clean_worker(&mut self, exit: WorkerExit) {
        let Some(record) = self.registry.remove_worker(&exit.worker_id) else {
            warn!("Termination report from unknown worker {}", exit.worker_id);
            self.events.cluster_event(format!(
                "termination report from unknown worker {}",
                exit.worker_id
            ));
            return;
        };

        self.registry.record_outcome(&record.node, exit.outcome.kind);
        self.registry.dec_load(&record.node);
        self.events.job_event(
            &record.jobname,
            format!(
                "{}:{} on {} finished: {}",
                record.mode, record.partid, record.node, exit.outcome.kind
            ),
        );
        let _ = record.reply_to.send(JobEvent::Done {
            kind: exit.outcome.kind,
            message: exit.outcome.message,
            node: record.node.clone(),
            partid: record.partid,
        });

        // a slot opened up
        self.schedule();
    }

    /// Ask every running worker of the job to die and drop its waiting
    /// tasks. Best-effort: the kills are signals, and each worker's exit
    /// still flows through `clean_worker` whenever it lands.
    fn kill_job(&mut self, jobname: &str) {
        let running = self.registry.workers_of_job(jobname);
        for id in &running {
            if let Some(record) = self.registry.worker(id) {
                record.kill.kill();
            }
        }

        let before = self.waitlist.len();
        self.waitlist.retain(|task| task.jobname != jobname);
        let dropped = before - self.waitlist.len();

        info!(
            "Killing job {}: {} running workers signalled, {} waiting tasks dropped",
            jobname,
            running.len(),
            dropped
        );
        self.events.job_event(
            jobname,
            format!(
                "job killed: {} running workers signalled, {} waiting tasks dropped",
                running.len(),
                dropped
            ),
        );
    }
}

/// Cheaply clonable front door to the master. All operations enqueue onto
/// the master's command queue; fire-and-forget operations return as soon
/// as the command is queued.
#[derive(Clone)]
pub struct MasterHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl MasterHandle {
    /// Queue one task. Returns as soon as the task is on the waitlist;
    /// dispatch happens asynchronously and the outcome arrives on the
    /// task's `reply_to` channel.
    pub fn submit(&self, task: Task) -> MasterResult<()> {
        self.send(Command::Submit(task))
    }

    /// Kill every running worker of the job and drop its waiting tasks.
    pub fn kill_job(&self, jobname: impl Into<String>) -> MasterResult<()> {
        self.send(Command::KillJob {
            jobname: jobname.into(),
        })
    }

    /// `kill_job`, then forget the job's event history.
    pub fn clean_job(&self, jobname: impl Into<String>) -> MasterResult<()> {
        self.send(Command::CleanJob {
            jobname: jobname.into(),
        })
    }

    /// Administratively exclude a node from all future placement.
    pub fn blacklist(&self, node: impl Into<String>) -> MasterResult<()> {
        self.send(Command::Blacklist { node: node.into() })
    }

    /// Re-admit a black-listed node and re-examine the waitlist.
    pub fn whitelist(&self, node: impl Into<String>) -> MasterResult<()> {
        self.send(Command::Whitelist { node: node.into() })
    }

    /// Atomically replace the configured node set. Nodes that survive the
    /// reload keep their load and counters. A node table that fails
    /// validation is rejected in the loop and the current table stays in
    /// effect.
    pub fn update_config(&self, nodes: Vec<NodeSpec>) -> MasterResult<()> {
        self.send(Command::UpdateConfig { nodes })
    }

    /// The `(nodes, partids)` currently running for a job.
    pub async fn get_active(
        &self,
        jobname: impl Into<String>,
    ) -> MasterResult<(Vec<NodeName>, Vec<u32>)> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::GetActive {
            jobname: jobname.into(),
            reply,
        })?;
        rx.await.map_err(|_| MasterError::Stopped)
    }

    /// Snapshot of every configured node plus all running workers.
    pub async fn node_info(&self) -> MasterResult<ClusterInfo> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::NodeInfo { reply })?;
        rx.await.map_err(|_| MasterError::Stopped)
    }

    /// Snapshot of one configured node and the workers running on it.
    pub async fn node_info_for(
        &self,
        node: impl Into<String>,
    ) -> MasterResult<(NodeReport, Vec<ActiveWorker>)> {
        let node = node.into();
        let (reply, rx) = oneshot::channel();
        self.send(Command::NodeInfoFor {
            node: node.clone(),
            reply,
        })?;
        match rx.await {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Err(MasterError::UnknownNode(node)),
            Err(_) => Err(MasterError::Stopped),
        }
    }

    fn send(&self, command: Command) -> MasterResult<()> {
        self.tx.send(command).map_err(|_| MasterError::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::MemoryEventLog;
    use crate::launcher::{WorkerExit, WorkerOutcome};
    use crate::tests_common::*;
    use flotilla_core::task::Placement;
    use flotilla_core::types::ResultKind;

    fn start(
        nodes: &[(&str, u32)],
    ) -> (MasterHandle, Arc<ManualLauncher>, Arc<MemoryEventLog>) {
        init_test_log();
        let launcher = ManualLauncher::new();
        let events = Arc::new(MemoryEventLog::new(100));
        let handle = Master::spawn(specs(nodes), launcher.clone(), events.clone()).unwrap();
        (handle, launcher, events)
    }

    fn load_of(info: &ClusterInfo, node: &str) -> u32 {
        info.nodes
            .iter()
            .find(|report| report.name == node)
            .map(|report| report.load)
            .unwrap_or_else(|| panic!("node {} not in snapshot", node))
    }

    #[tokio::test]
    async fn test_fast_path_dispatch_and_completion() {
        let (handle, launcher, _events) = start(&[("alpha", 2), ("beta", 2)]);

        let (task, mut rx) = make_task("wordcount", 0, Placement::preferring("alpha"));
        handle.submit(task).unwrap();

        let info = handle.node_info().await.unwrap();
        assert_eq!(load_of(&info, "alpha"), 1);
        assert_eq!(load_of(&info, "beta"), 0);
        assert_eq!(launcher.count(), 1);
        assert_eq!(launcher.spec(0).node, "alpha");

        launcher.finish(0, WorkerOutcome::ok("http://alpha/out.0"));
        let event = recv_event(&mut rx).await;
        assert_eq!(
            event,
            JobEvent::Done {
                kind: ResultKind::Ok,
                message: "http://alpha/out.0".into(),
                node: "alpha".into(),
                partid: 0,
            }
        );

        let info = handle.node_info().await.unwrap();
        assert_eq!(load_of(&info, "alpha"), 0);
        let alpha = info.nodes.iter().find(|r| r.name == "alpha").unwrap();
        assert_eq!(alpha.stats.ok, 1);
        assert!(info.active.is_empty());
    }

    #[tokio::test]
    async fn test_preferred_busy_falls_back_to_open_node() {
        let (handle, launcher, _events) = start(&[("alpha", 1), ("beta", 1)]);

        let (t1, _rx1) = make_task("j", 0, Placement::preferring("alpha"));
        let (t2, _rx2) = make_task("j", 1, Placement::preferring("alpha"));
        handle.submit(t1).unwrap();
        handle.submit(t2).unwrap();

        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 2);
        assert_eq!(launcher.spec(0).node, "alpha");
        assert_eq!(launcher.spec(1).node, "beta");
    }

    #[tokio::test]
    async fn test_full_cluster_holds_task_until_slot_opens() {
        let (handle, launcher, _events) = start(&[("alpha", 1)]);

        let (t1, mut rx1) = make_task("j", 0, Placement::anywhere());
        let (t2, _rx2) = make_task("j", 1, Placement::anywhere());
        handle.submit(t1).unwrap();
        handle.submit(t2).unwrap();

        let info = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 1);
        assert_eq!(load_of(&info, "alpha"), 1);

        launcher.finish(0, WorkerOutcome::ok(""));
        let _ = recv_event(&mut rx1).await;

        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 2);
        assert_eq!(launcher.spec(1).node, "alpha");
        assert_eq!(launcher.spec(1).partid, 1);
    }

    #[tokio::test]
    async fn test_task_blacklisted_everywhere_fails_terminally() {
        let (handle, launcher, _events) = start(&[("alpha", 1), ("beta", 1)]);

        let pref = Placement {
            preferred: None,
            blacklist: vec!["alpha".into(), "beta".into()],
        };
        let (task, mut rx) = make_task("doomed", 0, pref);
        handle.submit(task).unwrap();

        let event = recv_event(&mut rx).await;
        assert_eq!(
            event,
            JobEvent::MasterError {
                message: "Job failed on all available nodes".into(),
            }
        );

        let info = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 0);
        assert!(info.active.is_empty());
        assert_eq!(load_of(&info, "alpha"), 0);
    }

    #[tokio::test]
    async fn test_retryable_all_bad_released_by_whitelist() {
        let (handle, launcher, _events) = start(&[("alpha", 1), ("beta", 1)]);

        handle.blacklist("alpha").unwrap();
        let pref = Placement {
            preferred: None,
            blacklist: vec!["beta".into()],
        };
        let (task, _rx) = make_task("j", 0, pref);
        handle.submit(task).unwrap();

        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 0);

        handle.whitelist("alpha").unwrap();

        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 1);
        assert_eq!(launcher.spec(0).node, "alpha");
    }

    #[tokio::test]
    async fn test_kill_job_signals_workers_and_drops_waitlist() {
        let (handle, launcher, _events) = start(&[("alpha", 1)]);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        for partid in 0..3 {
            handle
                .submit(task_on(&tx, "victim", partid, Placement::anywhere()))
                .unwrap();
        }

        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 1);

        handle.kill_job("victim").unwrap();

        // the running worker was asked to die but is still registered
        let (nodes, partids) = handle.get_active("victim").await.unwrap();
        assert!(launcher.is_killed(0));
        assert_eq!(nodes, vec!["alpha".to_string()]);
        assert_eq!(partids, vec![0]);

        // its exit still flows through the normal bookkeeping path
        launcher.finish(0, WorkerOutcome::error("worker killed"));
        let event = recv_event(&mut rx).await;
        assert!(matches!(
            event,
            JobEvent::Done {
                kind: ResultKind::Error,
                ..
            }
        ));

        // the waiting tasks are gone: the free slot dispatches nothing
        let (nodes, _) = handle.get_active("victim").await.unwrap();
        assert!(nodes.is_empty());
        assert_eq!(launcher.count(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_clean_job_also_drops_event_history() {
        let (handle, launcher, events) = start(&[("alpha", 1)]);

        let (task, _rx) = make_task("messy", 0, Placement::anywhere());
        handle.submit(task).unwrap();
        let _ = handle.node_info().await.unwrap();
        assert!(!events.events_of("messy").is_empty());

        handle.clean_job("messy").unwrap();
        let _ = handle.node_info().await.unwrap();

        assert!(launcher.is_killed(0));
        assert!(events.events_of("messy").is_empty());
    }

    #[tokio::test]
    async fn test_unknown_worker_exit_is_ignored() {
        let (handle, launcher, _events) = start(&[("alpha", 1)]);

        let (task, mut rx) = make_task("j", 0, Placement::anywhere());
        handle.submit(task).unwrap();
        let _ = handle.node_info().await.unwrap();

        // a report for a worker the master never started
        let _ = launcher.exit_sender(0).send(WorkerExit {
            worker_id: uuid::Uuid::new_v4(),
            outcome: WorkerOutcome::ok("stray"),
        });
        // the real exit is processed after the stray one
        launcher.finish(0, WorkerOutcome::ok(""));
        let _ = recv_event(&mut rx).await;

        let info = handle.node_info().await.unwrap();
        assert_eq!(load_of(&info, "alpha"), 0);
        let alpha = info.nodes.iter().find(|r| r.name == "alpha").unwrap();
        assert_eq!(alpha.stats.ok, 1);
        assert_eq!(alpha.stats.crash, 0);
    }

    #[tokio::test]
    async fn test_spawn_rejects_invalid_node_table() {
        init_test_log();
        let launcher = ManualLauncher::new();
        let events = Arc::new(MemoryEventLog::new(100));

        let result = Master::spawn(specs(&[("alpha", 1), ("alpha", 2)]), launcher, events);
        assert!(matches!(result, Err(MasterError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_invalid_config_reload_keeps_current_table() {
        let (handle, launcher, _events) = start(&[("alpha", 1)]);

        handle
            .update_config(specs(&[("alpha", 5), ("alpha", 2)]))
            .unwrap();

        // the duplicate table was rejected, not half-applied
        let info = handle.node_info().await.unwrap();
        assert_eq!(info.nodes.len(), 1);
        assert_eq!(info.nodes[0].capacity, 1);

        // and the previous table still schedules
        let (task, _rx) = make_task("j", 0, Placement::anywhere());
        handle.submit(task).unwrap();
        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 1);
        assert_eq!(launcher.spec(0).node, "alpha");
    }

    #[tokio::test]
    async fn test_empty_config_holds_submissions_until_reload() {
        let (handle, launcher, _events) = start(&[]);

        let (task, _rx) = make_task("j", 0, Placement::anywhere());
        handle.submit(task).unwrap();

        let info = handle.node_info().await.unwrap();
        assert!(info.nodes.is_empty());
        assert_eq!(launcher.count(), 0);

        handle.update_config(specs(&[("alpha", 1)])).unwrap();

        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 1);
        assert_eq!(launcher.spec(0).node, "alpha");
    }

    #[tokio::test]
    async fn test_config_reload_keeps_load_and_extends_capacity() {
        let (handle, launcher, _events) = start(&[("alpha", 1)]);

        let (t1, _rx1) = make_task("j", 0, Placement::anywhere());
        handle.submit(t1).unwrap();
        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 1);

        handle
            .update_config(specs(&[("alpha", 2), ("beta", 1)]))
            .unwrap();

        let info = handle.node_info().await.unwrap();
        assert_eq!(load_of(&info, "alpha"), 1);

        // beta is emptier than alpha, so the next task lands there
        let (t2, _rx2) = make_task("j", 1, Placement::anywhere());
        handle.submit(t2).unwrap();
        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.spec(1).node, "beta");
    }

    #[tokio::test]
    async fn test_notifications_follow_termination_order() {
        let (handle, launcher, _events) = start(&[("alpha", 2)]);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        handle
            .submit(task_on(&tx, "j", 0, Placement::anywhere()))
            .unwrap();
        handle
            .submit(task_on(&tx, "j", 1, Placement::anywhere()))
            .unwrap();
        let _ = handle.node_info().await.unwrap();
        assert_eq!(launcher.count(), 2);

        // the second submission finishes first
        launcher.finish(1, WorkerOutcome::ok(""));
        launcher.finish(0, WorkerOutcome::ok(""));

        let first = recv_event(&mut rx).await;
        let second = recv_event(&mut rx).await;
        assert!(matches!(first, JobEvent::Done { partid: 1, .. }));
        assert!(matches!(second, JobEvent::Done { partid: 0, .. }));
    }

    #[tokio::test]
    async fn test_node_info_for_single_node() {
        let (handle, _launcher, _events) = start(&[("alpha", 2), ("beta", 1)]);

        let (task, _rx) = make_task("j", 0, Placement::preferring("alpha"));
        handle.submit(task).unwrap();

        let (report, active) = handle.node_info_for("alpha").await.unwrap();
        assert_eq!(report.capacity, 2);
        assert_eq!(report.load, 1);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].jobname, "j");

        let (report, active) = handle.node_info_for("beta").await.unwrap();
        assert_eq!(report.load, 0);
        assert!(active.is_empty());

        let err = handle.node_info_for("ghost").await.unwrap_err();
        assert!(matches!(err, MasterError::UnknownNode(_)));
    }

    #[tokio::test]
    async fn test_blacklist_reported_in_node_info() {
        let (handle, _launcher, _events) = start(&[("alpha", 1)]);

        handle.blacklist("alpha").unwrap();
        let info = handle.node_info().await.unwrap();
        assert!(info.nodes[0].blacklisted);

        handle.whitelist("alpha").unwrap();
        let info = handle.node_info().await.unwrap();
        assert!(!info.nodes[0].blacklisted);
    }
}
