//! The collector itself: engine lifecycle, the allocation/collection
//! driver, and root management. This is the public surface of the crate.

use std::ffi::c_void;
use std::ptr;

use crate::block::ObjectRing;
use crate::config::EngineConfig;
use crate::descriptor::Descriptor;
use crate::error::{EngineError, Result};
use crate::gateway::Gateway;
use crate::root::{RootRing, RootSlot};
use crate::statistics::EngineStatistics;
use crate::sweeper;
use crate::tables::{FinalizerFn, FinalizerTable, TracerFn, TracerTable};
use crate::tracer;

/// A single-threaded garbage-collected heap. Not safe to share or mutate
/// concurrently from more than one thread.
pub struct Engine {
    pub(crate) objects: ObjectRing,
    pub(crate) roots: RootRing,
    pub(crate) finalizers: FinalizerTable,
    pub(crate) tracers: TracerTable,
    pub(crate) stats: EngineStatistics,
    config: EngineConfig,
}

impl Engine {
    /// Create a fresh engine with default configuration: one block in each
    /// of the object and root rings, no finalizer/tracer tables registered.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a fresh engine with `config`'s initial ring sizes and logging
    /// verbosity. `config` is already validated (see
    /// [`EngineConfig::new`](crate::config::EngineConfig::new)), so this
    /// cannot fail.
    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            objects: ObjectRing::new(config.object_blocks()),
            roots: RootRing::new(config.root_blocks()),
            finalizers: FinalizerTable::empty(),
            tracers: TracerTable::empty(),
            stats: EngineStatistics::default(),
            config,
        }
    }

    /// Register the finalizer table. May only be called once per engine;
    /// index 0 is reserved and means "no finalizer" regardless of what is
    /// passed at index 0 of `finalizers` (finalizer ids in descriptors are
    /// 1-based, matching `finalizers[id - 1]`... in practice callers should
    /// treat the returned ids from [`Engine::find_finalizer`] as opaque).
    pub fn set_finalizers(&mut self, finalizers: Vec<FinalizerFn>) -> Result<()> {
        self.finalizers.set(finalizers)
    }

    pub fn set_tracers(&mut self, tracers: Vec<TracerFn>) -> Result<()> {
        self.tracers.set(tracers)
    }

    /// Look up `finalizer`'s id in the registered table, linearly, or 0 if
    /// it isn't registered (or `finalizer` is `None`).
    pub fn find_finalizer(&self, finalizer: Option<FinalizerFn>) -> u16 {
        self.finalizers.find(finalizer)
    }

    pub fn find_tracer(&self, tracer: Option<TracerFn>) -> u16 {
        self.tracers.find(tracer)
    }

    pub fn statistics(&self) -> EngineStatistics {
        self.stats
    }

    /// Allocate a fresh, engine-owned data region of the size described by
    /// `descriptor`, plus a gateway to it. On failure, triggers a major
    /// collection and retries exactly once; if that also fails, returns
    /// `None`.
    pub fn alloc(&mut self, descriptor: Descriptor) -> Option<*mut Gateway> {
        if let Some(gw) = self.try_alloc(descriptor) {
            return Some(gw);
        }
        if self.config.verbose {
            tracing::info!("alloc failed, running a major collection and retrying once");
        } else {
            tracing::debug!("alloc failed, running a major collection and retrying once");
        }
        self.collect_major();
        self.try_alloc(descriptor)
    }

    fn try_alloc(&mut self, descriptor: Descriptor) -> Option<*mut Gateway> {
        let size = descriptor.byte_size();
        let data = if size == 0 {
            // No bytes to own, so no pointer to free later either; `null`
            // is what `finalize_and_free` checks for, matching `give`'s
            // null-data convention.
            ptr::null_mut()
        } else {
            let raw = unsafe { libc::malloc(size) };
            if raw.is_null() {
                return None;
            }
            raw.cast::<u8>()
        };
        let gw = match self.objects.alloc() {
            Some(gw) => gw,
            None => {
                if size != 0 {
                    unsafe { libc::free(data.cast::<c_void>()) };
                }
                return None;
            }
        };
        unsafe { (*gw).init(data, descriptor) };
        self.stats.add(descriptor.byte_size());
        Some(gw)
    }

    /// Hand the engine an already-allocated data region, transferring
    /// ownership of it (the caller must not use `raw_data` afterward). On
    /// failure the caller retains ownership.
    pub fn give(&mut self, raw_data: *mut u8, descriptor: Descriptor) -> Option<*mut Gateway> {
        let gw = self.objects.alloc()?;
        unsafe { (*gw).init(raw_data, descriptor) };
        self.stats.add(descriptor.byte_size());
        Some(gw)
    }

    /// Trace from the root set, then reclaim everything left unmarked.
    pub fn collect_major(&mut self) {
        tracing::trace!("major collection: begin");
        self.objects.begin_sweep();
        tracer::trace_from_roots(self);
        sweeper::sweep(self);
        tracing::trace!(stats = %self.stats, "major collection: end");
    }

    /// Allocate a root slot pointing at `gateway` (which may be null; the
    /// tracer skips null roots).
    pub fn new_root(&mut self, gateway: *mut Gateway) -> Option<*mut RootSlot> {
        let slot = self.roots.alloc()?;
        unsafe { (*slot).set(gateway) };
        Some(slot)
    }

    pub fn set_root(&mut self, slot: *mut RootSlot, gateway: *mut Gateway) {
        unsafe { (*slot).set(gateway) };
    }

    pub fn get_root(&self, slot: *mut RootSlot) -> *mut Gateway {
        unsafe { (*slot).get() }
    }

    pub fn free_root(&mut self, slot: *mut RootSlot) {
        unsafe { (*slot).set(ptr::null_mut()) };
    }

}

/// Run `gateway`'s finalizer (if it has one) and free its data region. Does
/// not touch the registry bit or the tracking counters — callers (sweep,
/// teardown) update those themselves since they know the containing block.
///
/// Freeing is gated on the data pointer being non-null, not on the
/// descriptor's byte size: `Engine::give` hands the engine a host-supplied
/// pointer paired with whatever descriptor the host chose, including a
/// zero-byte-size one, and the engine owns that pointer regardless.
pub(crate) fn finalize_and_free(finalizers: &FinalizerTable, gateway: *mut Gateway) {
    let gw = unsafe { &*gateway };
    let id = gw.descriptor().finalizer_id();
    if id != 0 {
        if let Some(finalizer) = finalizers.get(id) {
            finalizer(gw.data);
        }
    }
    if !gw.data.is_null() {
        unsafe { libc::free(gw.data.cast::<c_void>()) };
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        tracing::debug!(stats = %self.stats, "tearing down engine");
        let Engine {
            objects, finalizers, ..
        } = self;
        objects.destroy(|gateway| finalize_and_free(&*finalizers, gateway));
        self.roots.destroy();
    }
}
