//! Embed the master with an in-process launcher and run one small job.
//!
//! ```text
//! cargo run --example cluster
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::info;

use flotilla_core::config::load_config;
use flotilla_core::task::{JobEvent, Placement, Task};
use flotilla_core::types::{NodeSpec, TaskMode};
use flotilla_master::event_log::MemoryEventLog;
use flotilla_master::launcher::{TaskRunner, TokioLauncher, WorkerOutcome, WorkerSpec};
use flotilla_master::Master;

struct DemoRunner;

#[async_trait]
impl TaskRunner for DemoRunner {
    async fn run(&self, spec: &WorkerSpec) -> WorkerOutcome {
        // stand-in for real partition work
        tokio::time::sleep(Duration::from_millis(200)).await;
        WorkerOutcome::ok(format!(
            "file://{}/{}-{}.out",
            spec.node, spec.jobname, spec.partid
        ))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut config = load_config("flotilla.toml");
    if config.cluster.nodes.is_empty() {
        config.cluster.nodes = vec![
            NodeSpec {
                name: "alpha".into(),
                capacity: 2,
            },
            NodeSpec {
                name: "beta".into(),
                capacity: 2,
            },
        ];
    }
    config.cluster.validate().unwrap();

    let mut launcher = TokioLauncher::new(Arc::new(DemoRunner));
    if let Some(limit) = config.master.worker_timeout() {
        launcher = launcher.with_timeout(limit);
    }
    let events = Arc::new(MemoryEventLog::new(config.master.event_capacity));
    let handle = Master::spawn(config.cluster.nodes.clone(), Arc::new(launcher), events.clone())
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let partitions = 4;
    for partid in 0..partitions {
        let task = Task {
            jobname: "wordcount".into(),
            partid,
            mode: TaskMode::Map,
            pref: Placement::anywhere(),
            input: format!("input://corpus/{}", partid),
            data: String::new(),
            reply_to: tx.clone(),
        };
        handle.submit(task).unwrap();
    }
    drop(tx);

    let mut finished = 0;
    while let Some(event) = rx.recv().await {
        match event {
            JobEvent::Done {
                kind,
                message,
                node,
                partid,
            } => {
                info!("partition {} on {} -> {}: {}", partid, node, kind, message);
                finished += 1;
            }
            JobEvent::MasterError { message } => {
                info!("job failed: {}", message);
                break;
            }
        }
        if finished == partitions {
            break;
        }
    }

    let snapshot = handle.node_info().await.unwrap();
    for report in snapshot.nodes {
        info!(
            "node {}: capacity {}, load {}, ok {}, data_error {}, crash {}",
            report.name,
            report.capacity,
            report.load,
            report.stats.ok,
            report.stats.data_error,
            report.stats.crash
        );
    }

    for line in events.events_of("wordcount") {
        println!("{}", line);
    }
}
