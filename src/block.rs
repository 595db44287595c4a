//! Object block and object ring: the slab allocator gateways live in.
//!
//! An [`ObjectBlock`] embeds [`BLOCK_WIDTH`] gateway slots plus one bitmap
//! word. Blocks link into a circular singly-linked list, the [`ObjectRing`];
//! allocation walks from `current`, advancing to the next block when one
//! fills, and splices in a freshly created block once the walk loops back to
//! `last_collect` without finding room.

use std::mem::MaybeUninit;
use std::ptr;

use crate::bitmap::{BlockRegistry, BLOCK_WIDTH};
use crate::gateway::Gateway;

/// A slab of [`BLOCK_WIDTH`] gateway slots with a packed bitmap registry.
pub(crate) struct ObjectBlock {
    registry: BlockRegistry,
    next: *mut ObjectBlock,
    slots: [MaybeUninit<Gateway>; BLOCK_WIDTH],
}

impl ObjectBlock {
    fn new_boxed() -> Box<Self> {
        Box::new(ObjectBlock {
            registry: BlockRegistry::empty(),
            next: ptr::null_mut(),
            slots: unsafe { MaybeUninit::uninit().assume_init() },
        })
    }

    /// Claim a free slot and return a pointer to it. The slot's `Gateway`
    /// contents are uninitialized; the caller must call
    /// [`Gateway::init`](crate::gateway::Gateway::init) before the slot is
    /// traced or swept.
    fn alloc(&mut self) -> Option<*mut Gateway> {
        let ix = self.registry.claim()?;
        Some(self.slots[ix].as_mut_ptr())
    }

    #[inline]
    pub(crate) fn is_used(&self, ix: usize) -> bool {
        self.registry.is_used(ix)
    }

    #[inline]
    pub(crate) fn release(&mut self, ix: usize) {
        self.registry.release(ix);
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    #[inline]
    pub(crate) fn slot(&self, ix: usize) -> *mut Gateway {
        // `MaybeUninit<Gateway>` and `Gateway` share layout; only called on
        // slots the registry reports as used.
        self.slots[ix].as_ptr() as *mut Gateway
    }
}

/// A circular list of [`ObjectBlock`]s. Always contains at least one block.
pub(crate) struct ObjectRing {
    current: *mut ObjectBlock,
    /// Sentinel marking the block at which the most recent sweep began.
    /// Allocation prefers scanning forward through blocks that sweep has
    /// already freed slots in before growing the ring.
    last_collect: *mut ObjectBlock,
}

impl ObjectRing {
    /// Build a ring of `initial_blocks` linked blocks (at least 1).
    pub(crate) fn new(initial_blocks: usize) -> Self {
        debug_assert!(initial_blocks >= 1);
        let first = Box::into_raw(ObjectBlock::new_boxed());
        let mut tail = first;
        for _ in 1..initial_blocks {
            let block = Box::into_raw(ObjectBlock::new_boxed());
            unsafe {
                (*tail).next = block;
            }
            tail = block;
        }
        unsafe {
            (*tail).next = first;
        }
        ObjectRing {
            current: first,
            last_collect: first,
        }
    }

    /// Acquire a gateway slot, growing the ring by one block if every
    /// existing block is full. Returns `None` only if the new block itself
    /// could not be allocated.
    pub(crate) fn alloc(&mut self) -> Option<*mut Gateway> {
        let mut block = self.current;
        loop {
            if let Some(gw) = unsafe { (*block).alloc() } {
                self.current = block;
                return Some(gw);
            }
            let next = unsafe { (*block).next };
            if next == self.last_collect {
                let new_block = Box::into_raw(ObjectBlock::new_boxed());
                tracing::debug!("object ring full, splicing in a new block");
                unsafe {
                    (*new_block).next = self.last_collect;
                    (*block).next = new_block;
                }
            }
            block = unsafe { (*block).next };
        }
    }

    /// Record the block a sweep is about to begin at, so subsequent
    /// allocations (until the next collection) search forward through
    /// recently-swept blocks before growing the ring.
    pub(crate) fn begin_sweep(&mut self) {
        self.last_collect = self.current;
    }

    /// Sweep every block, reclaiming unmarked gateways via `sweep_block`
    /// and clearing the mark bit of survivors. Blocks left fully empty are
    /// spliced out of the ring and freed, except the block the walk started
    /// at (never eligible — see the comment below), which guarantees the
    /// starting block is always a valid, stable loop terminator even though
    /// it (and every other block) may be freed elsewhere in the same walk.
    pub(crate) fn sweep_all(&mut self, mut sweep_block: impl FnMut(&mut ObjectBlock)) {
        let start = self.current;
        let mut block = start;
        let mut last_kept: Option<*mut ObjectBlock> = None;
        loop {
            sweep_block(unsafe { &mut *block });
            let next = unsafe { (*block).next };
            // The starting block is only ever considered for removal once
            // `last_kept` has already advanced past it, i.e. never, since
            // reaching `block == start` again is the loop's exit condition.
            if unsafe { (*block).is_empty() } && last_kept.is_some() {
                tracing::trace!("sweep retiring an empty object block");
                unsafe {
                    (*last_kept.unwrap()).next = next;
                    drop(Box::from_raw(block));
                }
            } else {
                last_kept = Some(block);
            }
            block = next;
            if block == start {
                break;
            }
        }
    }

    /// Finalize and free every used gateway, then free every block. Called
    /// once, from `Engine`'s teardown.
    pub(crate) fn destroy(&mut self, mut finalize_slot: impl FnMut(*mut Gateway)) {
        let start = self.current;
        let mut block = start;
        loop {
            let next = unsafe { (*block).next };
            for ix in 0..BLOCK_WIDTH {
                if unsafe { (*block).is_used(ix) } {
                    finalize_slot(unsafe { (*block).slot(ix) });
                }
            }
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
    use crate::descriptor::Descriptor;

    #[test]
    fn filling_one_block_grows_the_ring() {
        let mut ring = ObjectRing::new(1);
        let mut ptrs = Vec::new();
        for _ in 0..BLOCK_WIDTH {
            let gw = ring.alloc().expect("block has room");
            unsafe {
                (*gw).init(ptr::null_mut(), Descriptor::fixed(1, 0, 0, 0));
            }
            ptrs.push(gw);
        }
        // the 65th allocation must land in a newly spliced block, not fail
        let gw = ring.alloc().expect("ring grows a new block");
        unsafe {
            (*gw).init(ptr::null_mut(), Descriptor::fixed(1, 0, 0, 0));
        }
        ring.destroy(|_| {});
    }

    #[test]
    fn new_with_multiple_initial_blocks_links_all_of_them() {
        let mut ring = ObjectRing::new(3);
        // 3 blocks' worth of slots must be claimable before the ring needs
        // to splice in a 4th.
        let mut ptrs = Vec::new();
        for _ in 0..3 * BLOCK_WIDTH {
            let gw = ring.alloc().expect("3 initial blocks have room");
            unsafe {
                (*gw).init(ptr::null_mut(), Descriptor::fixed(1, 0, 0, 0));
            }
            ptrs.push(gw);
        }
        ring.destroy(|_| {});
    }
}
