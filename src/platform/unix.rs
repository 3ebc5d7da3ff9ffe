use super::{ProcessControl, WorkerCommand};
use nix::errno::Errno;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{getpgid, Pid};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::os::unix::process::CommandExt;
use std::process::{Child, Command};
use tracing::debug;

/// Unix implementation of [`ProcessControl`].
///
/// Every worker becomes the leader of a new session and process group, so
/// termination reaches anything it forks. Child handles are kept so that
/// exited workers get reaped instead of lingering as zombies, which would
/// otherwise still answer liveness checks.
#[derive(Debug, Default)]
pub struct SystemProcess {
    children: Mutex<HashMap<u32, Child>>,
}

impl SystemProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reap a worker we spawned. `None` if the pid is not one of ours.
    fn reap(&self, pid: u32) -> Option<bool> {
        let mut children = self.children.lock();
        let child = children.get_mut(&pid)?;
        match child.try_wait() {
            Ok(None) => Some(true),
            Ok(Some(status)) => {
                debug!("pid={} exited with {}", pid, status);
                children.remove(&pid);
                Some(false)
            }
            Err(err) => {
                debug!("pid={} try_wait failed: {}", pid, err);
                children.remove(&pid);
                None
            }
        }
    }
}

impl ProcessControl for SystemProcess {
    fn spawn_detached(&self, worker: &WorkerCommand) -> io::Result<u32> {
        let mut command = worker.to_command();
        prepare_command(&mut command);

        let child = command.spawn()?;
        let pid = child.id();
        self.children.lock().insert(pid, child);
        Ok(pid)
    }

    fn is_alive(&self, pid: u32) -> bool {
        match self.reap(pid) {
            Some(alive) => alive,
            None => process_group_alive(pid),
        }
    }

    fn terminate(&self, pid: u32) {
        let Some(pgid) = to_pid(pid) else {
            return;
        };
        match killpg(pgid, Signal::SIGTERM) {
            Ok(()) => debug!("pid={} sent SIGTERM to process group", pid),
            Err(Errno::ESRCH) => debug!("pid={} process group already exited", pid),
            Err(err) => debug!("pid={} SIGTERM failed: {}", pid, err),
        }
    }
}

/// Detach the child into its own session before exec.
fn prepare_command(cmd: &mut Command) {
    unsafe {
        cmd.pre_exec(|| {
            if start_new_session() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// Encapsulates the unsafe setsid call
unsafe fn start_new_session() -> libc::pid_t {
    unsafe { libc::setsid() }
}

/// Whether `pid` still belongs to some process group, i.e. the process exists.
///
/// EPERM means the process exists but belongs to someone else.
pub fn process_group_alive(pid: u32) -> bool {
    let Some(pid) = to_pid(pid) else {
        return false;
    };
    match getpgid(Some(pid)) {
        Ok(_) => true,
        Err(errno) => errno == Errno::EPERM,
    }
}

// pid 0 would address our own process group
fn to_pid(pid: u32) -> Option<Pid> {
    match libc::pid_t::try_from(pid) {
        Ok(raw) if raw > 0 => Some(Pid::from_raw(raw)),
        _ => None,
    }
}
