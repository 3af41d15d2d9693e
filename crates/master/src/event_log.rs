//! Human-readable progress events.
//!
//! The master narrates what it does (admissions, assignments, kills,
//! config reloads) to an injected sink. Job-scoped lines are kept per
//! job so a coordinator can fetch a job's history and `clean_job` can
//! drop it; cluster-scoped lines cover everything not tied to one job.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use tracing::info;

pub trait EventLog: Send + Sync {
    fn job_event(&self, jobname: &str, line: String);
    fn cluster_event(&self, line: String);
    /// Forget a job's history (the `clean_job` log drop).
    fn drop_job(&self, jobname: &str);
}

/// Fixed-capacity per-job ring buffers. Every line is also emitted at
/// info level.
pub struct MemoryEventLog {
    capacity: usize,
    jobs: Mutex<HashMap<String, VecDeque<String>>>,
    cluster: Mutex<VecDeque<String>>,
}

impl MemoryEventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            jobs: Mutex::new(HashMap::new()),
            cluster: Mutex::new(VecDeque::new()),
        }
    }

    pub fn events_of(&self, jobname: &str) -> Vec<String> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(jobname)
            .map(|ring| ring.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn cluster_events(&self) -> Vec<String> {
        self.cluster.lock().unwrap().iter().cloned().collect()
    }

    fn push(&self, ring: &mut VecDeque<String>, line: String) {
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(line);
    }
}

impl EventLog for MemoryEventLog {
    fn job_event(&self, jobname: &str, line: String) {
        info!("[{}] {}", jobname, line);
        let mut jobs = self.jobs.lock().unwrap();
        let ring = jobs.entry(jobname.to_string()).or_default();
        self.push(ring, line);
    }

    fn cluster_event(&self, line: String) {
        info!("[master] {}", line);
        let mut cluster = self.cluster.lock().unwrap();
        self.push(&mut cluster, line);
    }

    fn drop_job(&self, jobname: &str) {
        info!("[master] dropping event log of job {}", jobname);
        self.jobs.lock().unwrap().remove(jobname);
    }
}

/// For embedders that do not care about the narration.
pub struct NullEventLog;

impl EventLog for NullEventLog {
    fn job_event(&self, _jobname: &str, _line: String) {}
    fn cluster_event(&self, _line: String) {}
    fn drop_job(&self, _jobname: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_evicts_oldest() {
        let log = MemoryEventLog::new(3);
        for i in 0..5 {
            log.job_event("j1", format!("event {}", i));
        }
        assert_eq!(log.events_of("j1"), vec!["event 2", "event 3", "event 4"]);
    }

    #[test]
    fn test_jobs_are_isolated() {
        let log = MemoryEventLog::new(10);
        log.job_event("j1", "a".into());
        log.job_event("j2", "b".into());
        log.cluster_event("c".into());

        assert_eq!(log.events_of("j1"), vec!["a"]);
        assert_eq!(log.events_of("j2"), vec!["b"]);
        assert_eq!(log.cluster_events(), vec!["c"]);
    }

    #[test]
    fn test_drop_job_forgets_history() {
        let log = MemoryEventLog::new(10);
        log.job_event("j1", "a".into());
        log.drop_job("j1");
        assert!(log.events_of("j1").is_empty());

        // unknown job is a no-op
        log.drop_job("j2");
    }
}
