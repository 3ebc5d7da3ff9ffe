//! Bounded-concurrency worker supervisor.
//!
//! Workers are detached OS processes started with one encoded payload
//! argument. The supervisor never hears about exits directly: it polls
//! liveness and moves records from `pending` to `completed` when the pid
//! is gone.

use crate::codec;
use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::paths;
use crate::platform::{ProcessControl, SystemProcess, WorkerCommand};
use crate::worker_record::WorkerRecord;
use chrono::Utc;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Owns the pending/completed record lists. Dropping it signals every worker
/// that is still pending.
pub struct ProcessSupervisor<P: ProcessControl = SystemProcess> {
    capacity: usize,
    root: PathBuf,
    poll_interval: Duration,
    interpreter: Option<PathBuf>,
    extension: Option<String>,
    env: Option<Vec<(OsString, OsString)>>,
    finish_failed_spawns: bool,
    pending: Vec<WorkerRecord>,
    completed: Vec<WorkerRecord>,
    control: P,
}

impl ProcessSupervisor<SystemProcess> {
    pub fn new(config: SupervisorConfig) -> Result<Self, SupervisorError> {
        Self::with_control(config, SystemProcess::new())
    }
}

impl<P: ProcessControl> ProcessSupervisor<P> {
    /// Build a supervisor around a custom [`ProcessControl`].
    ///
    /// The environment policy is evaluated here, once; later changes to the
    /// supervisor's own environment do not reach workers.
    pub fn with_control(config: SupervisorConfig, control: P) -> Result<Self, SupervisorError> {
        let root = validate_root(&config.root_dir())?;
        let env = config.env_policy().capture();
        if let Some(vars) = &env {
            debug!(
                "Environment policy {:?} keeps {} variables",
                config.env_allow_prefixes,
                vars.len()
            );
        }

        Ok(Self {
            capacity: config.capacity,
            root,
            poll_interval: config.poll_interval(),
            interpreter: config.interpreter,
            extension: config.extension,
            env,
            finish_failed_spawns: config.finish_failed_spawns,
            pending: Vec::new(),
            completed: Vec::new(),
            control,
        })
    }

    /// Set capacity and root together. Nothing changes if the root is invalid.
    pub fn configure(
        &mut self,
        capacity: usize,
        root: impl AsRef<Path>,
    ) -> Result<(), SupervisorError> {
        self.set_root(root)?;
        self.set_capacity(capacity);
        Ok(())
    }

    /// How many workers may be pending at once before `launch` blocks; 0 = unbounded.
    pub fn set_capacity(&mut self, capacity: usize) {
        info!("Worker capacity set to {}", capacity);
        self.capacity = capacity;
    }

    pub fn set_root(&mut self, root: impl AsRef<Path>) -> Result<(), SupervisorError> {
        self.root = validate_root(root.as_ref())?;
        info!("Project root set to {}", self.root.display());
        Ok(())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn control(&self) -> &P {
        &self.control
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Start `target` with `payload` and return its pid.
    ///
    /// Blocks while `capacity` workers are pending. `Ok(None)` means the spawn
    /// itself failed; the worker is still recorded, without an identity.
    pub fn launch(&mut self, target: &str, payload: Value) -> Result<Option<u32>, SupervisorError> {
        if self.capacity > 0 {
            self.wait_below(self.capacity);
        }

        let path = paths::resolve_target(&self.root, target, self.extension.as_deref());
        if !paths::check_target(&path, self.interpreter.is_none()) {
            return Err(SupervisorError::NotFound {
                target: target.to_string(),
                path,
            });
        }

        let argument = codec::encode(&payload)?;
        let command = self.worker_command(path, argument);
        let launched_at = Utc::now();

        let identity = match self.control.spawn_detached(&command) {
            Ok(pid) => {
                debug!(
                    "Started worker {} pid={} ({} pending)",
                    target,
                    pid,
                    self.pending.len() + 1
                );
                Some(pid)
            }
            Err(err) => {
                warn!("Failed to start worker {}: {}", target, err);
                None
            }
        };

        self.pending.push(WorkerRecord::new(
            target.to_string(),
            payload,
            identity,
            launched_at,
        ));

        self.poll_completions();
        Ok(identity)
    }

    /// Move every pending worker whose process is gone to `completed`.
    pub fn poll_completions(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let now = Utc::now();
        let control = &self.control;
        let finish_failed_spawns = self.finish_failed_spawns;
        let (running, finished): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|record| match record.identity {
                Some(pid) => control.is_alive(pid),
                None => !finish_failed_spawns,
            });
        self.pending = running;

        for record in finished {
            debug!("Worker {} pid={:?} finished", record.target, record.identity);
            self.completed.push(record.mark_finished(now));
        }
    }

    /// Snapshot of all records (`None`) or the record for one pid.
    ///
    /// Pending records come first, then completed ones, each in insertion
    /// order. A lookup never fails; an unknown pid gives an empty result.
    pub fn info(&self, identity: Option<u32>) -> Vec<WorkerRecord> {
        match identity {
            None => self.records().cloned().collect(),
            Some(pid) => self.record(pid).into_iter().collect(),
        }
    }

    /// The record for `pid`. When a recycled pid matches several records the
    /// last one in `info(None)` order wins.
    pub fn record(&self, pid: u32) -> Option<WorkerRecord> {
        self.records()
            .filter(|record| record.identity == Some(pid))
            .last()
            .cloned()
    }

    /// Signal every pending worker that is still alive. Records are left untouched.
    pub fn terminate_all(&self) {
        for pid in self.pending.iter().filter_map(|record| record.identity) {
            if self.control.is_alive(pid) {
                debug!("Terminating worker pid={}", pid);
                self.control.terminate(pid);
            }
        }
    }

    /// Block until every worker with an identity has finished.
    ///
    /// Returns the completed records. Workers whose spawn failed never finish
    /// unless `finish_failed_spawns` is set, so they do not hold this up.
    pub fn wait_all(&mut self) -> Vec<WorkerRecord> {
        loop {
            self.poll_completions();
            if !self.pending.iter().any(|record| record.identity.is_some()) {
                break;
            }
            std::thread::sleep(self.poll_interval);
        }
        self.completed.clone()
    }

    fn records(&self) -> impl Iterator<Item = &WorkerRecord> {
        self.pending.iter().chain(self.completed.iter())
    }

    /// Busy-wait until fewer than `max` workers are pending.
    fn wait_below(&mut self, max: usize) {
        loop {
            self.poll_completions();
            if self.pending.len() < max {
                break;
            }
            std::thread::sleep(self.poll_interval);
        }
    }

    fn worker_command(&self, path: PathBuf, argument: String) -> WorkerCommand {
        let (program, args) = match &self.interpreter {
            Some(interpreter) => (
                interpreter.clone(),
                vec![path.into_os_string(), OsString::from(argument)],
            ),
            None => (path, vec![OsString::from(argument)]),
        };
        WorkerCommand {
            program,
            args,
            env: self.env.clone(),
        }
    }
}

impl<P: ProcessControl> Drop for ProcessSupervisor<P> {
    fn drop(&mut self) {
        self.terminate_all();
    }
}

fn validate_root(root: &Path) -> Result<PathBuf, SupervisorError> {
    if root.is_dir() {
        Ok(root.to_path_buf())
    } else {
        Err(SupervisorError::Configuration {
            path: root.to_path_buf(),
        })
    }
}
