//! Worker birth and death.
//!
//! The master owns only the two ends of a worker's life: it launches one
//! process per dispatched task and it consumes exactly one [`WorkerExit`]
//! per launch. What runs in between is the launcher's business. Two
//! launchers are provided: [`TokioLauncher`] runs an embedder-supplied
//! [`TaskRunner`] on the shared runtime, [`ProcessLauncher`] spawns one OS
//! process per worker.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use flotilla_core::types::{NodeName, ResultKind, TaskMode, WorkerId};

/// Exit status a worker process uses to report unreadable or corrupt input.
pub const EXIT_DATA_ERROR: i32 = 3;
/// Exit status a worker process uses to report a failure in the job's own code.
pub const EXIT_JOB_ERROR: i32 = 4;

/// The start-handshake arguments handed to a worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSpec {
    pub worker_id: WorkerId,
    pub jobname: String,
    pub partid: u32,
    pub mode: TaskMode,
    pub node: NodeName,
    pub input: String,
    pub data: String,
}

/// How a worker ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub kind: ResultKind,
    pub message: String,
}

impl WorkerOutcome {
    pub fn new(kind: ResultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(ResultKind::Ok, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ResultKind::Error, message)
    }
}

/// Termination report for one launched worker. Every launch produces
/// exactly one of these, however the worker died.
#[derive(Debug)]
pub struct WorkerExit {
    pub worker_id: WorkerId,
    pub outcome: WorkerOutcome,
}

/// Master-side end of a worker's kill switch. Best-effort and idempotent;
/// the worker's eventual exit still flows through the normal report path.
pub struct KillHandle {
    tx: watch::Sender<bool>,
}

impl KillHandle {
    pub fn kill(&self) {
        let _ = self.tx.send(true);
    }
}

/// Worker-side end of the kill switch.
pub struct KillSignal {
    rx: watch::Receiver<bool>,
}

impl KillSignal {
    pub fn is_killed(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the master asks this worker to die. Also resolves if
    /// the master itself is gone, so workers never outlive it silently.
    pub async fn killed(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub fn kill_pair() -> (KillHandle, KillSignal) {
    let (tx, rx) = watch::channel(false);
    (KillHandle { tx }, KillSignal { rx })
}

/// Launches workers on behalf of the master.
///
/// `launch` must not block: the master calls it from its serialized
/// region. Implementations must eventually send exactly one [`WorkerExit`]
/// for every launch: on success, failure, panic, kill and even spawn
/// failure (a failed start is reported like any other death).
pub trait WorkerLauncher: Send + Sync {
    fn launch(&self, spec: WorkerSpec, kill: KillSignal, exits: mpsc::UnboundedSender<WorkerExit>);
}

/// The body of an in-process worker.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn run(&self, spec: &WorkerSpec) -> WorkerOutcome;
}

/// Runs each worker as a task on the shared runtime.
pub struct TokioLauncher {
    runner: Arc<dyn TaskRunner>,
    timeout: Option<Duration>,
}

impl TokioLauncher {
    pub fn new(runner: Arc<dyn TaskRunner>) -> Self {
        Self {
            runner,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl WorkerLauncher for TokioLauncher {
    fn launch(
        &self,
        spec: WorkerSpec,
        mut kill: KillSignal,
        exits: mpsc::UnboundedSender<WorkerExit>,
    ) {
        let runner = Arc::clone(&self.runner);
        let timeout = self.timeout;

        tokio::spawn(async move {
            let worker_id = spec.worker_id;
            let body = async {
                match timeout {
                    Some(limit) => match tokio::time::timeout(limit, runner.run(&spec)).await {
                        Ok(outcome) => outcome,
                        Err(_) => WorkerOutcome::error(format!(
                            "worker timed out after {}ms",
                            limit.as_millis()
                        )),
                    },
                    None => runner.run(&spec).await,
                }
            };
            // Panic-safe: a panicking runner is reported as a crash, not lost
            let body = std::panic::AssertUnwindSafe(body).catch_unwind();

            let outcome = tokio::select! {
                _ = kill.killed() => WorkerOutcome::error("worker killed"),
                res = body => match res {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!("Worker {} panicked during execution", worker_id);
                        WorkerOutcome::error("worker panicked")
                    }
                },
            };

            let _ = exits.send(WorkerExit { worker_id, outcome });
        });
    }
}

/// Runs each worker as its own OS process.
///
/// The worker receives its [`WorkerSpec`] as JSON on stdin; stdout becomes
/// the ok-payload and the last non-empty stderr line the error detail.
/// The exit status classifies the outcome: 0 is ok, [`EXIT_DATA_ERROR`]
/// and [`EXIT_JOB_ERROR`] map to their result kinds, anything else
/// (including death by signal) is a crash.
pub struct ProcessLauncher {
    command: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl ProcessLauncher {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(
        &self,
        spec: WorkerSpec,
        kill: KillSignal,
        exits: mpsc::UnboundedSender<WorkerExit>,
    ) {
        let command = self.command.clone();
        let args = self.args.clone();
        let timeout = self.timeout;

        tokio::spawn(async move {
            let worker_id = spec.worker_id;
            let outcome = run_process(&command, &args, &spec, timeout, kill).await;
            debug!("Worker {} process finished: {}", worker_id, outcome.kind);
            let _ = exits.send(WorkerExit { worker_id, outcome });
        });
    }
}

enum WaitOutcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Killed,
}

async fn run_process(
    command: &str,
    args: &[String],
    spec: &WorkerSpec,
    timeout: Option<Duration>,
    mut kill: KillSignal,
) -> WorkerOutcome {
    let handshake = match serde_json::to_vec(spec) {
        Ok(bytes) => bytes,
        Err(e) => return WorkerOutcome::error(format!("failed to encode worker spec: {}", e)),
    };

    let mut child = match Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            return WorkerOutcome::error(format!(
                "failed to start worker process '{}': {}",
                command, e
            ))
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        // A worker that exits without reading the spec reports through its
        // exit status; the broken pipe here is not the interesting error.
        if stdin.write_all(&handshake).await.is_err() {
            debug!("Worker {} closed stdin before reading its spec", spec.worker_id);
        }
        let _ = stdin.shutdown().await;
    }

    // Drain both pipes concurrently so a chatty worker cannot wedge on a
    // full pipe buffer while we wait for its exit.
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let stdout_task = tokio::spawn(read_all(stdout_pipe));
    let stderr_task = tokio::spawn(read_all(stderr_pipe));

    let why = {
        let wait = wait_with_limit(&mut child, timeout);
        tokio::pin!(wait);
        tokio::select! {
            _ = kill.killed() => WaitOutcome::Killed,
            res = &mut wait => match res {
                Ok(Some(status)) => WaitOutcome::Exited(Ok(status)),
                Ok(None) => WaitOutcome::TimedOut,
                Err(e) => WaitOutcome::Exited(Err(e)),
            },
        }
    };

    let status = match why {
        WaitOutcome::Killed => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            return WorkerOutcome::error("worker killed");
        }
        WaitOutcome::TimedOut => {
            let _ = child.start_kill();
            let _ = child.wait().await;
            let limit_ms = timeout.map(|d| d.as_millis()).unwrap_or_default();
            return WorkerOutcome::error(format!("worker timed out after {}ms", limit_ms));
        }
        WaitOutcome::Exited(Err(e)) => {
            return WorkerOutcome::error(format!("failed waiting for worker: {}", e))
        }
        WaitOutcome::Exited(Ok(status)) => status,
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    classify_exit(status, &stdout, &stderr)
}

/// Wait for the child, bounded by the configured limit. `Ok(None)` means
/// the limit elapsed first.
async fn wait_with_limit(
    child: &mut Child,
    limit: Option<Duration>,
) -> std::io::Result<Option<std::process::ExitStatus>> {
    match limit {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(res) => res.map(Some),
            Err(_) => Ok(None),
        },
        None => child.wait().await.map(Some),
    }
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let Some(mut pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = pipe.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

fn classify_exit(status: std::process::ExitStatus, stdout: &str, stderr: &str) -> WorkerOutcome {
    let detail = |fallback: &str| {
        stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or(fallback)
            .to_string()
    };

    match status.code() {
        Some(0) => WorkerOutcome::ok(stdout.trim().to_string()),
        Some(EXIT_DATA_ERROR) => WorkerOutcome::new(ResultKind::DataError, detail("input unreadable")),
        Some(EXIT_JOB_ERROR) => WorkerOutcome::new(ResultKind::JobError, detail("job code failed")),
        Some(code) => WorkerOutcome::error(format!(
            "worker exited with status {}: {}",
            code,
            detail("no diagnostics")
        )),
        None => WorkerOutcome::error("worker terminated by signal"),
    }
}
