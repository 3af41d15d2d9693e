//! In-memory bookkeeping for the master: live workers, per-node load and
//! capacity, outcome counters, the global black-list. Process-local and
//! non-persistent; rebuilt from configuration after a restart. Only the
//! master's serialized loop mutates it.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tokio::sync::mpsc;
use tracing::warn;

use flotilla_core::task::JobEvent;
use flotilla_core::types::{
    ActiveWorker, NodeName, NodeReport, NodeSpec, NodeStats, ResultKind, TaskMode, WorkerId,
};
use flotilla_scheduler::NodeView;

use crate::launcher::KillHandle;

/// One live worker. Created exactly when a task is dispatched, destroyed
/// exactly when its termination report arrives.
pub struct WorkerRecord {
    pub id: WorkerId,
    pub jobname: String,
    pub partid: u32,
    pub mode: TaskMode,
    pub node: NodeName,
    pub reply_to: mpsc::UnboundedSender<JobEvent>,
    pub kill: KillHandle,
}

#[derive(Default)]
pub struct Registry {
    workers: HashMap<WorkerId, WorkerRecord>,
    // secondary indices so job- and node-scoped queries are O(matches)
    by_job: HashMap<String, HashSet<WorkerId>>,
    by_node: HashMap<NodeName, HashSet<WorkerId>>,

    /// Current concurrent workers per node. May retain entries for nodes
    /// dropped from the config: their workers still need termination
    /// bookkeeping.
    load: BTreeMap<NodeName, u32>,
    /// The configured node set, exactly the selectable universe.
    caps: BTreeMap<NodeName, u32>,
    stats: BTreeMap<NodeName, NodeStats>,
    blacklist: BTreeSet<NodeName>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // --- worker table ---

    pub fn insert_worker(&mut self, record: WorkerRecord) {
        self.by_job
            .entry(record.jobname.clone())
            .or_default()
            .insert(record.id);
        self.by_node
            .entry(record.node.clone())
            .or_default()
            .insert(record.id);
        self.workers.insert(record.id, record);
    }

    pub fn remove_worker(&mut self, id: &WorkerId) -> Option<WorkerRecord> {
        let record = self.workers.remove(id)?;
        if let Some(ids) = self.by_job.get_mut(&record.jobname) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_job.remove(&record.jobname);
            }
        }
        if let Some(ids) = self.by_node.get_mut(&record.node) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_node.remove(&record.node);
            }
        }
        Some(record)
    }

    pub fn worker(&self, id: &WorkerId) -> Option<&WorkerRecord> {
        self.workers.get(id)
    }

    pub fn live_count(&self) -> usize {
        self.workers.len()
    }

    pub fn workers_of_job(&self, jobname: &str) -> Vec<WorkerId> {
        self.by_job
            .get(jobname)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    // --- load / capacity ---

    pub fn inc_load(&mut self, node: &str) {
        *self.load.entry(node.to_string()).or_insert(0) += 1;
    }

    /// Decremented exactly once per worker, on its termination report.
    /// The floor at zero is defensive; hitting it means a double report.
    pub fn dec_load(&mut self, node: &str) {
        match self.load.get_mut(node) {
            Some(load) if *load > 0 => *load -= 1,
            _ => warn!("Load underflow for node {}, ignoring decrement", node),
        }
    }

    pub fn load_of(&self, node: &str) -> u32 {
        self.load.get(node).copied().unwrap_or(0)
    }

    pub fn is_configured(&self, node: &str) -> bool {
        self.caps.contains_key(node)
    }

    pub fn total_load(&self) -> u32 {
        self.load.values().sum()
    }

    // --- outcome counters ---

    pub fn record_outcome(&mut self, node: &str, kind: ResultKind) {
        self.stats.entry(node.to_string()).or_default().record(kind);
    }

    // --- configuration ---

    /// Replace the configured node set. Still-present nodes keep their
    /// load and counters; new nodes start from zero. Removed nodes stay
    /// in the load/stats tables for their remaining workers but are no
    /// longer selectable.
    pub fn apply_config(&mut self, nodes: &[NodeSpec]) {
        self.caps = nodes
            .iter()
            .map(|spec| (spec.name.clone(), spec.capacity))
            .collect();
        for spec in nodes {
            self.load.entry(spec.name.clone()).or_insert(0);
            self.stats.entry(spec.name.clone()).or_default();
        }
    }

    // --- black-list ---

    /// Returns false when the node was already black-listed.
    pub fn blacklist_node(&mut self, node: &str) -> bool {
        self.blacklist.insert(node.to_string())
    }

    /// Returns false when the node was not black-listed.
    pub fn whitelist_node(&mut self, node: &str) -> bool {
        self.blacklist.remove(node)
    }

    pub fn blacklist(&self) -> &BTreeSet<NodeName> {
        &self.blacklist
    }

    // --- snapshots ---

    /// Selector input: the configured nodes in name order.
    pub fn node_views(&self) -> Vec<NodeView> {
        self.caps
            .iter()
            .map(|(name, capacity)| NodeView {
                name: name.clone(),
                load: self.load_of(name),
                capacity: *capacity,
            })
            .collect()
    }

    pub fn reports(&self) -> Vec<NodeReport> {
        self.caps
            .iter()
            .map(|(name, capacity)| self.report_row(name, *capacity))
            .collect()
    }

    pub fn report_for(&self, node: &str) -> Option<NodeReport> {
        self.caps
            .get(node)
            .map(|capacity| self.report_row(node, *capacity))
    }

    fn report_row(&self, name: &str, capacity: u32) -> NodeReport {
        NodeReport {
            name: name.to_string(),
            capacity,
            load: self.load_of(name),
            stats: self.stats.get(name).copied().unwrap_or_default(),
            blacklisted: self.blacklist.contains(name),
        }
    }

    pub fn active_workers(&self) -> Vec<ActiveWorker> {
        self.workers.values().map(active_row).collect()
    }

    pub fn active_on_node(&self, node: &str) -> Vec<ActiveWorker> {
        self.by_node
            .get(node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.workers.get(id))
            .map(active_row)
            .collect()
    }

    /// The `(nodes, partids)` pair of everything running for a job.
    pub fn active_of_job(&self, jobname: &str) -> (Vec<NodeName>, Vec<u32>) {
        let mut nodes = Vec::new();
        let mut partids = Vec::new();
        for id in self.by_job.get(jobname).into_iter().flatten() {
            if let Some(record) = self.workers.get(id) {
                nodes.push(record.node.clone());
                partids.push(record.partid);
            }
        }
        (nodes, partids)
    }
}

fn active_row(record: &WorkerRecord) -> ActiveWorker {
    ActiveWorker {
        jobname: record.jobname.clone(),
        partid: record.partid,
        mode: record.mode,
        node: record.node.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launcher::kill_pair;
    use crate::tests_common::specs;
    use uuid::Uuid;

    fn record(jobname: &str, partid: u32, node: &str) -> WorkerRecord {
        let (tx, _rx) = mpsc::unbounded_channel();
        let (kill, _signal) = kill_pair();
        WorkerRecord {
            id: Uuid::new_v4(),
            jobname: jobname.to_string(),
            partid,
            mode: TaskMode::Map,
            node: node.to_string(),
            reply_to: tx,
            kill,
        }
    }

    /// One dispatch as the master performs it: load first, then the record.
    fn dispatch(registry: &mut Registry, jobname: &str, partid: u32, node: &str) -> WorkerId {
        registry.inc_load(node);
        let rec = record(jobname, partid, node);
        let id = rec.id;
        registry.insert_worker(rec);
        id
    }

    fn terminate(registry: &mut Registry, id: &WorkerId, kind: ResultKind) {
        let rec = registry.remove_worker(id).unwrap();
        registry.record_outcome(&rec.node, kind);
        registry.dec_load(&rec.node);
    }

    #[test]
    fn test_load_sum_matches_live_workers() {
        let mut registry = Registry::new();
        registry.apply_config(&specs(&[("alpha", 2), ("beta", 2)]));

        let w1 = dispatch(&mut registry, "j1", 0, "alpha");
        let w2 = dispatch(&mut registry, "j1", 1, "beta");
        let w3 = dispatch(&mut registry, "j2", 0, "alpha");
        assert_eq!(registry.total_load() as usize, registry.live_count());

        terminate(&mut registry, &w2, ResultKind::Ok);
        assert_eq!(registry.total_load() as usize, registry.live_count());

        terminate(&mut registry, &w1, ResultKind::Error);
        terminate(&mut registry, &w3, ResultKind::Ok);
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.total_load(), 0);
    }

    #[test]
    fn test_dec_load_never_underflows() {
        let mut registry = Registry::new();
        registry.apply_config(&specs(&[("alpha", 2)]));
        registry.dec_load("alpha");
        assert_eq!(registry.load_of("alpha"), 0);
    }

    #[test]
    fn test_config_reload_preserves_load_and_counters() {
        let mut registry = Registry::new();
        registry.apply_config(&specs(&[("alpha", 2), ("beta", 2)]));

        let _w = dispatch(&mut registry, "j1", 0, "alpha");
        registry.record_outcome("alpha", ResultKind::Ok);
        registry.record_outcome("alpha", ResultKind::DataError);

        // alpha survives with a new capacity, beta is dropped, gamma is new
        registry.apply_config(&specs(&[("alpha", 8), ("gamma", 1)]));

        assert_eq!(registry.load_of("alpha"), 1);
        let alpha = registry.report_for("alpha").unwrap();
        assert_eq!(alpha.capacity, 8);
        assert_eq!(alpha.stats.ok, 1);
        assert_eq!(alpha.stats.data_error, 1);

        let gamma = registry.report_for("gamma").unwrap();
        assert_eq!(gamma.load, 0);
        assert_eq!(gamma.stats, NodeStats::default());

        assert!(!registry.is_configured("beta"));
        assert!(registry.report_for("beta").is_none());
    }

    #[test]
    fn test_removed_node_still_tracks_terminations() {
        let mut registry = Registry::new();
        registry.apply_config(&specs(&[("alpha", 2)]));
        let w = dispatch(&mut registry, "j1", 0, "alpha");

        registry.apply_config(&specs(&[("beta", 1)]));
        assert!(!registry.is_configured("alpha"));
        assert_eq!(registry.load_of("alpha"), 1);

        terminate(&mut registry, &w, ResultKind::Ok);
        assert_eq!(registry.load_of("alpha"), 0);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn test_node_views_are_name_ordered() {
        let mut registry = Registry::new();
        registry.apply_config(&specs(&[("zeta", 1), ("alpha", 1), ("mike", 1)]));
        let names: Vec<_> = registry.node_views().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["alpha", "mike", "zeta"]);
    }

    #[test]
    fn test_blacklist_is_idempotent() {
        let mut registry = Registry::new();
        assert!(registry.blacklist_node("alpha"));
        assert!(!registry.blacklist_node("alpha"));
        assert_eq!(registry.blacklist().len(), 1);

        assert!(registry.whitelist_node("alpha"));
        assert!(!registry.whitelist_node("alpha"));
        assert!(registry.blacklist().is_empty());
    }

    #[test]
    fn test_job_and_node_queries() {
        let mut registry = Registry::new();
        registry.apply_config(&specs(&[("alpha", 4), ("beta", 4)]));

        dispatch(&mut registry, "wordcount", 0, "alpha");
        dispatch(&mut registry, "wordcount", 1, "beta");
        dispatch(&mut registry, "pagerank", 0, "alpha");

        let (nodes, mut partids) = registry.active_of_job("wordcount");
        partids.sort_unstable();
        assert_eq!(nodes.len(), 2);
        assert_eq!(partids, vec![0, 1]);

        assert_eq!(registry.active_on_node("alpha").len(), 2);
        assert_eq!(registry.active_on_node("beta").len(), 1);
        assert!(registry.active_on_node("gamma").is_empty());
        assert_eq!(registry.workers_of_job("pagerank").len(), 1);
        assert!(registry.workers_of_job("unknown").is_empty());
    }

    #[test]
    fn test_indices_cleaned_on_removal() {
        let mut registry = Registry::new();
        registry.apply_config(&specs(&[("alpha", 4)]));
        let w = dispatch(&mut registry, "j1", 0, "alpha");
        terminate(&mut registry, &w, ResultKind::Ok);

        assert!(registry.workers_of_job("j1").is_empty());
        assert!(registry.active_on_node("alpha").is_empty());
        assert!(registry.active_workers().is_empty());
    }
}
