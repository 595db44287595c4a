//! Setup-time errors. Hot-path operations (`alloc`, `give`, `new_root`) keep
//! returning `None` on failure — out-of-memory is a condition the host is
//! expected to retry or degrade on, not catch — but a handful of engine
//! *setup* misuses are cheap to detect and are reported through
//! [`EngineError`] instead of silently doing the wrong thing.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("finalizer table has already been registered for this engine")]
    FinalizersAlreadySet,
    #[error("tracer table has already been registered for this engine")]
    TracersAlreadySet,
    #[error("engine config must reserve at least one initial block per ring")]
    ZeroInitialBlockCount,
}

pub type Result<T> = std::result::Result<T, EngineError>;
