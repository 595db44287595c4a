//! Root block and root ring: the host's liveness anchors into the managed
//! heap. Structurally analogous to [`ObjectBlock`]/`ObjectRing` but without a
//! bitmap — a root slot is free exactly when it holds a null pointer, so
//! "claim" is a linear scan for a null entry rather than an `ffs`.
//!
//! A ring of slabs, rather than one growable contiguous array, keeps root
//! slot addresses stable so the host can hold a long-lived `*mut RootSlot`.

use std::ptr;

use crate::bitmap::BLOCK_WIDTH;
use crate::gateway::Gateway;

/// One root handle: an optional pointer to a gateway. `free_root` merely
/// nulls the slot; it is not returned to any separate free list.
#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct RootSlot(*mut Gateway);

impl RootSlot {
    #[inline]
    pub(crate) fn get(&self) -> *mut Gateway {
        self.0
    }

    #[inline]
    pub(crate) fn set(&mut self, gateway: *mut Gateway) {
        self.0 = gateway;
    }

    #[inline]
    fn is_free(&self) -> bool {
        self.0.is_null()
    }
}

struct RootBlock {
    next: *mut RootBlock,
    slots: [RootSlot; BLOCK_WIDTH],
}

impl RootBlock {
    fn new_boxed() -> Box<Self> {
        Box::new(RootBlock {
            next: ptr::null_mut(),
            slots: [RootSlot(ptr::null_mut()); BLOCK_WIDTH],
        })
    }

    fn alloc(&mut self) -> Option<*mut RootSlot> {
        self.slots
            .iter_mut()
            .find(|slot| slot.is_free())
            .map(|slot| slot as *mut RootSlot)
    }
}

/// A circular list of [`RootBlock`]s. Always contains at least one block.
pub(crate) struct RootRing {
    current: *mut RootBlock,
}

impl RootRing {
    /// Build a ring of `initial_blocks` linked blocks (at least 1).
    pub(crate) fn new(initial_blocks: usize) -> Self {
        debug_assert!(initial_blocks >= 1);
        let first = Box::into_raw(RootBlock::new_boxed());
        let mut tail = first;
        for _ in 1..initial_blocks {
            let block = Box::into_raw(RootBlock::new_boxed());
            unsafe {
                (*tail).next = block;
            }
            tail = block;
        }
        unsafe {
            (*tail).next = first;
        }
        RootRing { current: first }
    }

    /// Acquire a free root slot, growing the ring by one block if every
    /// existing block is full.
    pub(crate) fn alloc(&mut self) -> Option<*mut RootSlot> {
        let start = self.current;
        let mut block = start;
        loop {
            if let Some(slot) = unsafe { (*block).alloc() } {
                self.current = block;
                return Some(slot);
            }
            let next = unsafe { (*block).next };
            if next == start {
                let new_block = Box::into_raw(RootBlock::new_boxed());
                unsafe {
                    (*new_block).next = start;
                    (*block).next = new_block;
                }
            }
            block = unsafe { (*block).next };
        }
    }

    /// Visit every non-null root slot (used by the tracer to find the start
    /// of the reachability walk).
    pub(crate) fn for_each_root(&self, mut visit: impl FnMut(*mut Gateway)) {
        let start = self.current;
        let mut block = start;
        loop {
            for slot in unsafe { &(*block).slots } {
                let g = slot.get();
                if !g.is_null() {
                    visit(g);
                }
            }
            block = unsafe { (*block).next };
            if block == start {
                break;
            }
        }
    }

    /// Free every root block. Called once, from `Engine`'s teardown. Root
    /// slots hold no owned data, so there is nothing to finalize.
    pub(crate) fn destroy(&mut self) {
        let start = self.current;
        let mut block = start;
        loop {
            let next = unsafe { (*block).next };
            unsafe {
                drop(Box::from_raw(block));
            }
            block = next;
            if block == start {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filling_one_root_block_grows_the_ring() {
        let mut ring = RootRing::new(1);
        let dummy = 0xdead_usize as *mut Gateway;
        for _ in 0..BLOCK_WIDTH {
            let slot = ring.alloc().expect("block has room");
            unsafe {
                (*slot).set(dummy);
            }
        }
        let slot = ring.alloc().expect("ring grows a new block");
        unsafe {
            (*slot).set(dummy);
        }
        ring.destroy();
    }

    #[test]
    fn free_root_nulls_the_slot_without_removing_it() {
        let mut ring = RootRing::new(1);
        let dummy = 0xbeef_usize as *mut Gateway;
        let slot = ring.alloc().unwrap();
        unsafe {
            (*slot).set(dummy);
            assert_eq!((*slot).get(), dummy);
            (*slot).set(ptr::null_mut());
            assert!((*slot).get().is_null());
        }
        // the slot must be reusable after being freed
        let slot2 = ring.alloc().unwrap();
        assert!(std::ptr::eq(slot, slot2));
        ring.destroy();
    }
}
