//! OS collaborators used by the supervisor: detached spawn, liveness check and
//! signal delivery.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::{process_group_alive, SystemProcess};

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

/// Fully resolved command line for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Replacement environment; `None` inherits the supervisor's.
    pub env: Option<Vec<(OsString, OsString)>>,
}

impl WorkerCommand {
    /// Build a [`Command`] with all standard streams attached to the null device.
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(env) = &self.env {
            command.env_clear();
            command.envs(env.iter().map(|(key, value)| (key, value)));
        }
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        command
    }
}

/// Process operations the supervisor delegates to the OS.
pub trait ProcessControl {
    /// Start `command` detached from the caller and return its pid.
    fn spawn_detached(&self, command: &WorkerCommand) -> io::Result<u32>;

    /// Whether a process with this pid still exists.
    fn is_alive(&self, pid: u32) -> bool;

    /// Deliver a termination signal. Failures, including "no such process", are ignored.
    fn terminate(&self, pid: u32);
}

impl<T: ProcessControl + ?Sized> ProcessControl for Arc<T> {
    fn spawn_detached(&self, command: &WorkerCommand) -> io::Result<u32> {
        (**self).spawn_detached(command)
    }

    fn is_alive(&self, pid: u32) -> bool {
        (**self).is_alive(pid)
    }

    fn terminate(&self, pid: u32) {
        (**self).terminate(pid)
    }
}
