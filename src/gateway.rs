//! [`Gateway`]: the stable indirection handle the host and sub-reference
//! slots use to refer to managed objects. A gateway's address never changes
//! between allocation and reclamation (see `block.rs`), so the host may
//! embed raw `*mut Gateway` pointers in its own data structures.

use std::mem::size_of;
use std::ptr;

use crate::descriptor::Descriptor;

/// Size in bytes of one sub-reference slot. Sub-reference slots hold a
/// (possibly null) pointer to another gateway.
pub const REF_SIZE: usize = size_of::<*mut Gateway>();

/// A stable handle: a data pointer paired with its layout descriptor.
///
/// Embedded inline inside [`ObjectBlock`](crate::block::ObjectBlock) slots;
/// never moved once initialized.
pub struct Gateway {
    pub(crate) data: *mut u8,
    pub(crate) descriptor: Descriptor,
}

impl Gateway {
    pub(crate) fn init(&mut self, data: *mut u8, mut descriptor: Descriptor) {
        descriptor.set_marked(false);
        self.data = data;
        self.descriptor = descriptor;
    }

    #[inline]
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        self.descriptor.is_marked()
    }

    #[inline]
    pub(crate) fn set_marked(&mut self) {
        self.descriptor.set_marked(true);
    }

    #[inline]
    pub(crate) fn clear_marked(&mut self) {
        self.descriptor.set_marked(false);
    }

    /// Length of a `Fixed` array (1 for a scalar object, 1 for `Custom`).
    #[inline]
    pub fn arrlen(&self) -> u32 {
        self.descriptor.arrlen()
    }

    /// Address of the raw tail (`Fixed`) or the whole opaque body
    /// (`Custom`) of a scalar object.
    ///
    /// # Safety
    /// The returned pointer is invalidated by any subsequent call to
    /// [`Engine::alloc`](crate::engine::Engine::alloc) or
    /// [`Engine::give`](crate::engine::Engine::give) on the owning engine;
    /// it must not be cached across one. The engine does not currently
    /// relocate data, but the contract reserves the right to in the future.
    pub unsafe fn raw(&self) -> *mut u8 {
        if self.descriptor.is_custom() {
            self.data
        } else {
            unsafe { self.data.add(self.descriptor.num_subrefs() as usize * REF_SIZE) }
        }
    }

    /// Address of sub-reference slot `i` of a scalar `Fixed` object
    /// (`arrlen == 1`). See [`Gateway::raw`] for the pointer-invalidation
    /// contract.
    pub unsafe fn subref(&self, i: usize) -> *mut *mut Gateway {
        unsafe { self.arr_subref(0, i) }
    }

    /// Address of the raw tail of array element `k` of a `Fixed` object.
    pub unsafe fn arr_raw(&self, k: usize) -> *mut u8 {
        let elem = unsafe { self.data.add(k * self.descriptor.element_size()) };
        unsafe { elem.add(self.descriptor.num_subrefs() as usize * REF_SIZE) }
    }

    /// Address of sub-reference slot `i` of array element `k` of a `Fixed`
    /// object.
    pub unsafe fn arr_subref(&self, k: usize, i: usize) -> *mut *mut Gateway {
        let elem = unsafe { self.data.add(k * self.descriptor.element_size()) };
        unsafe { (elem as *mut *mut Gateway).add(i) }
    }

    /// Reads sub-reference slot `i` of element `k`, or null if the pointer
    /// region has not been initialized by the host yet.
    pub(crate) unsafe fn read_arr_subref(&self, k: usize, i: usize) -> *mut Gateway {
        unsafe { ptr::read(self.arr_subref(k, i)) }
    }
}
