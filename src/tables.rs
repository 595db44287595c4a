//! Finalizer and custom-tracer tables: engine-scoped arrays of host callbacks
//! addressed by the small integer ids stored in layout descriptors. Id 0 is
//! reserved on both tables to mean "none" (no finalizer) / "use the fixed
//! tracer" (meaningless for a `Custom` descriptor, which always has a real
//! tracer id).

use crate::engine::Engine;
use crate::error::EngineError;
use crate::gateway::Gateway;

/// Called by a finalizer exactly once, with the reclaimed object's data
/// pointer, just before that data is freed. Must not touch other managed
/// objects — their liveness during sweep is undefined.
pub type FinalizerFn = extern "C" fn(*mut u8);

/// Passed to a custom tracer; invoke once per managed sub-reference the
/// traced object holds.
pub type MarkFn = extern "C" fn(*mut Engine, *mut Gateway);

/// A host tracer for objects whose shape isn't expressible as a `Fixed`
/// array. Must call the supplied [`MarkFn`] on every sub-reference it holds
/// and must not otherwise interact with the engine (no allocation, no root
/// mutation, no re-entrant collection).
pub type TracerFn = extern "C" fn(*mut Engine, *mut u8, MarkFn);

/// Id-addressed, linear-scan lookup table. Index 0 is reserved and never
/// populated; `find` returns it for an absent or unregistered callback.
pub(crate) struct CallbackTable<F: Copy + PartialEq> {
    entries: Vec<Option<F>>,
}

impl<F: Copy + PartialEq> CallbackTable<F> {
    fn new(callbacks: Vec<F>) -> Self {
        let mut entries = Vec::with_capacity(callbacks.len() + 1);
        entries.push(None);
        entries.extend(callbacks.into_iter().map(Some));
        CallbackTable { entries }
    }

    fn get(&self, id: u16) -> Option<F> {
        self.entries.get(id as usize).copied().flatten()
    }

    /// Linear lookup, scanning from index 1 (index 0 is reserved). Returns 0
    /// if `callback` is absent or not present in the table.
    fn find(&self, callback: Option<F>) -> u16 {
        let Some(callback) = callback else {
            return 0;
        };
        self.entries
            .iter()
            .enumerate()
            .skip(1)
            .find_map(|(id, entry)| (*entry == Some(callback)).then_some(id as u16))
            .unwrap_or(0)
    }
}

pub(crate) struct FinalizerTable(Option<CallbackTable<FinalizerFn>>);
pub(crate) struct TracerTable(Option<CallbackTable<TracerFn>>);

impl FinalizerTable {
    pub(crate) fn empty() -> Self {
        FinalizerTable(None)
    }

    pub(crate) fn set(&mut self, finalizers: Vec<FinalizerFn>) -> Result<(), EngineError> {
        if self.0.is_some() {
            return Err(EngineError::FinalizersAlreadySet);
        }
        tracing::debug!(count = finalizers.len(), "registering finalizer table");
        self.0 = Some(CallbackTable::new(finalizers));
        Ok(())
    }

    pub(crate) fn get(&self, id: u16) -> Option<FinalizerFn> {
        self.0.as_ref().and_then(|t| t.get(id))
    }

    pub(crate) fn find(&self, callback: Option<FinalizerFn>) -> u16 {
        self.0.as_ref().map_or(0, |t| t.find(callback))
    }
}

impl TracerTable {
    pub(crate) fn empty() -> Self {
        TracerTable(None)
    }

    pub(crate) fn set(&mut self, tracers: Vec<TracerFn>) -> Result<(), EngineError> {
        if self.0.is_some() {
            return Err(EngineError::TracersAlreadySet);
        }
        tracing::debug!(count = tracers.len(), "registering tracer table");
        self.0 = Some(CallbackTable::new(tracers));
        Ok(())
    }

    pub(crate) fn get(&self, id: u16) -> Option<TracerFn> {
        self.0.as_ref().and_then(|t| t.get(id))
    }

    pub(crate) fn find(&self, callback: Option<TracerFn>) -> u16 {
        self.0.as_ref().map_or(0, |t| t.find(callback))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn fin_a(_: *mut u8) {}
    extern "C" fn fin_b(_: *mut u8) {}

    #[test]
    fn find_returns_zero_for_unregistered_or_absent() {
        let mut table = FinalizerTable::empty();
        table.set(vec![fin_a, fin_b]).unwrap();
        assert_eq!(table.find(Some(fin_a)), 1);
        assert_eq!(table.find(Some(fin_b)), 2);
        assert_eq!(table.find(None), 0);

        extern "C" fn unregistered(_: *mut u8) {}
        assert_eq!(table.find(Some(unregistered)), 0);
    }

    #[test]
    fn second_registration_is_rejected() {
        let mut table = FinalizerTable::empty();
        table.set(vec![fin_a]).unwrap();
        assert!(matches!(
            table.set(vec![fin_b]),
            Err(EngineError::FinalizersAlreadySet)
        ));
    }

    #[test]
    fn id_zero_is_reserved_even_with_one_entry() {
        let mut table = FinalizerTable::empty();
        table.set(vec![fin_a]).unwrap();
        assert!(table.get(0).is_none());
        assert_eq!(table.get(1), Some(fin_a as FinalizerFn));
    }
}
