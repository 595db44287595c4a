//! Engine construction-time configuration.
//!
//! There is no heap-growth *policy* to configure (see `DESIGN.md` for why no
//! generational/growth-threshold tuning exists here): both rings simply grow
//! one block at a time under pressure, same as always. What is configurable
//! is how many blocks each ring starts with, and how noisy the allocator is
//! about the out-of-memory retry path, which hosts embedding an interpreter
//! may want turned up while debugging a leak and down in production.

use crate::error::EngineError;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Log the out-of-memory retry path (`alloc` failing, triggering a major
    /// collection, and retrying) at `info` instead of `debug`.
    pub verbose: bool,
    object_blocks: usize,
    root_blocks: usize,
}

impl EngineConfig {
    /// Build a config with `object_blocks` blocks in the object ring and
    /// `root_blocks` blocks in the root ring at engine creation. Both must
    /// be at least 1; an empty ring has nowhere to put the first gateway or
    /// root slot.
    pub fn new(object_blocks: usize, root_blocks: usize) -> Result<Self, EngineError> {
        if object_blocks == 0 || root_blocks == 0 {
            return Err(EngineError::ZeroInitialBlockCount);
        }
        Ok(EngineConfig {
            verbose: false,
            object_blocks,
            root_blocks,
        })
    }

    pub(crate) fn object_blocks(&self) -> usize {
        self.object_blocks
    }

    pub(crate) fn root_blocks(&self) -> usize {
        self.root_blocks
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            verbose: false,
            object_blocks: 1,
            root_blocks: 1,
        }
    }
}
