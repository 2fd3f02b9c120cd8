//! Error types for the sandbox core.
//!
//! Physics operations never fail; only construction, configuration and
//! snapshot I/O report errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("dispatcher needs at least one worker thread")]
    ZeroWorkers,
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Config(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
