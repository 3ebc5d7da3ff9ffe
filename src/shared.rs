//! Thread-safe handle around a [`ProcessSupervisor`].
//!
//! Every call holds one lock for its whole duration, so a `launch` blocked on
//! capacity also holds off `info` and `terminate_all` from other threads until
//! it returns. Nobody ever sees a record half-way between the two lists.

use crate::error::SupervisorError;
use crate::platform::{ProcessControl, SystemProcess};
use crate::supervisor::ProcessSupervisor;
use crate::worker_record::WorkerRecord;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

pub struct SharedSupervisor<P: ProcessControl = SystemProcess> {
    inner: Arc<Mutex<ProcessSupervisor<P>>>,
}

impl<P: ProcessControl> Clone for SharedSupervisor<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: ProcessControl> SharedSupervisor<P> {
    pub fn new(supervisor: ProcessSupervisor<P>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(supervisor)),
        }
    }

    pub fn configure(
        &self,
        capacity: usize,
        root: impl AsRef<Path>,
    ) -> Result<(), SupervisorError> {
        self.inner.lock().configure(capacity, root)
    }

    pub fn launch(&self, target: &str, payload: Value) -> Result<Option<u32>, SupervisorError> {
        self.inner.lock().launch(target, payload)
    }

    pub fn poll_completions(&self) {
        self.inner.lock().poll_completions()
    }

    pub fn info(&self, identity: Option<u32>) -> Vec<WorkerRecord> {
        self.inner.lock().info(identity)
    }

    pub fn terminate_all(&self) {
        self.inner.lock().terminate_all()
    }

    pub fn wait_all(&self) -> Vec<WorkerRecord> {
        self.inner.lock().wait_all()
    }
}
