//! procpool library
//!
//! Bounded-concurrency supervisor for detached worker processes: launch a
//! worker with an encoded payload, cap how many run at once, track them by pid
//! and signal the stragglers on shutdown.

#[cfg(not(unix))]
compile_error!("procpool manages Unix process groups and only builds on Unix targets");

pub mod codec;
pub mod config;
pub mod error;
pub mod paths;
pub mod platform;
pub mod shared;
pub mod supervisor;
pub mod utils;
pub mod worker_record;

// Re-export commonly used types for convenience
pub use config::{EnvPolicy, SupervisorConfig};
pub use error::{CodecError, ConfigError, SupervisorError};
pub use platform::{ProcessControl, SystemProcess, WorkerCommand};
pub use shared::SharedSupervisor;
pub use supervisor::ProcessSupervisor;
pub use worker_record::{WorkerRecord, WorkerStatus};
