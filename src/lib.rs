//! `tenure-gc` is a library-embeddable, single-threaded tracing garbage
//! collector for host applications — typically language interpreters — that
//! allocate heap objects through it, register root handles into it, and
//! mutate the resulting object graph freely between collections.
//!
//! An [`Engine`] owns every gateway, object block, and root block it hands
//! out. The host allocates through [`Engine::alloc`] (engine-owned data) or
//! [`Engine::give`] (host-supplied data the engine takes ownership of),
//! reads and writes sub-references through [`Gateway`]'s accessor methods,
//! and anchors liveness through root slots ([`Engine::new_root`]). Calling
//! [`Engine::collect_major`] — or simply running out of memory on
//! [`Engine::alloc`], which triggers one automatically — traces from the
//! root set and reclaims everything left unreachable.
//!
//! Objects come in two shapes, described by [`Descriptor`]: `Fixed`, a
//! statically-laid-out array of homogeneous elements (each a run of
//! sub-reference slots followed by a raw byte tail), or `Custom`, an
//! opaquely-shaped object traced by a host-supplied callback. See
//! `DESIGN.md` in the repository root for the rationale behind choices not
//! spelled out here.
//!
//! Not safe for concurrent use of the same engine from more than one
//! thread, and not reentrant: finalizers and custom tracers must not
//! allocate, collect, or mutate roots.

mod bitmap;
mod block;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod gateway;
mod root;
pub mod statistics;
pub mod tables;
mod sweeper;
mod tracer;

pub use bitmap::BLOCK_WIDTH;
pub use config::EngineConfig;
pub use descriptor::{Descriptor, NO_CALLBACK};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use gateway::Gateway;
pub use root::RootSlot;
pub use statistics::EngineStatistics;
pub use tables::{FinalizerFn, MarkFn, TracerFn};
