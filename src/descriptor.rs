//! Layout descriptors: the immutable (save for the mark bit) record copied
//! into a [`Gateway`](crate::gateway::Gateway) at allocation time describing
//! the shape of the managed bytes it points at.
//!
//! Two shapes exist. `Fixed` describes an array of `arrlen` homogeneous
//! elements, each a run of `num_subrefs` reference slots followed by
//! `num_raw_bytes` of opaque bytes (`arrlen == 1` is a plain scalar object).
//! `Custom` describes an opaquely-shaped object whose sub-references are
//! walked by a host-supplied tracer, addressed by a small integer id.
//!
//! Both variants are packed into a single 64-bit word with
//! [`modular_bitfield`], mirroring the bitfield union `gcinfo` in the C
//! prototype this design is drawn from.

use modular_bitfield::prelude::*;

use crate::gateway::REF_SIZE;

/// Reserved identifier meaning "no finalizer" / "no custom tracer".
pub const NO_CALLBACK: u16 = 0;

#[bitfield(bits = 64)]
#[derive(Clone, Copy)]
pub struct FixedWord {
    pub finalizer_id: B16,
    pub num_raw_bytes: B16,
    pub arrlen: B16,
    pub num_subrefs: B14,
    /// Always `false` for this variant; lets the two words be told apart
    /// if ever observed through a raw reinterpretation.
    pub custom: bool,
    pub mark: bool,
}

#[bitfield(bits = 64)]
#[derive(Clone, Copy)]
pub struct CustomWord {
    pub finalizer_id: B16,
    pub tracer_id: B16,
    pub total_byte_size: B30,
    pub custom: bool,
    pub mark: bool,
}

/// Compact layout record describing one managed object.
///
/// Copied by value into a [`Gateway`](crate::gateway::Gateway) at
/// allocation; every field besides the mark bit is immutable for the
/// lifetime of the gateway.
#[derive(Clone, Copy)]
pub enum Descriptor {
    Fixed(FixedWord),
    Custom(CustomWord),
}

impl Descriptor {
    /// Describe an array of `arrlen` elements, each `num_subrefs` reference
    /// slots followed by `num_raw_bytes` opaque bytes. `arrlen = 1` is a
    /// scalar object.
    pub fn fixed(arrlen: u16, num_subrefs: u16, num_raw_bytes: u16, finalizer_id: u16) -> Self {
        let word = FixedWord::new()
            .with_arrlen(arrlen)
            .with_num_subrefs(num_subrefs)
            .with_num_raw_bytes(num_raw_bytes)
            .with_finalizer_id(finalizer_id)
            .with_custom(false)
            .with_mark(false);
        Descriptor::Fixed(word)
    }

    /// Describe an opaquely-shaped object of `total_byte_size` bytes, traced
    /// by the tracer registered under `tracer_id`.
    pub fn custom(total_byte_size: u32, tracer_id: u16, finalizer_id: u16) -> Self {
        let word = CustomWord::new()
            .with_total_byte_size(total_byte_size)
            .with_tracer_id(tracer_id)
            .with_finalizer_id(finalizer_id)
            .with_custom(true)
            .with_mark(false);
        Descriptor::Custom(word)
    }

    #[inline]
    pub fn is_custom(&self) -> bool {
        matches!(self, Descriptor::Custom(_))
    }

    #[inline]
    pub fn finalizer_id(&self) -> u16 {
        match self {
            Descriptor::Fixed(w) => w.finalizer_id(),
            Descriptor::Custom(w) => w.finalizer_id(),
        }
    }

    #[inline]
    pub(crate) fn tracer_id(&self) -> u16 {
        match self {
            Descriptor::Fixed(_) => NO_CALLBACK,
            Descriptor::Custom(w) => w.tracer_id(),
        }
    }

    /// Number of elements in a `Fixed` array (1 for a scalar object); always
    /// 1 for `Custom`.
    #[inline]
    pub fn arrlen(&self) -> u32 {
        match self {
            Descriptor::Fixed(w) => u32::from(w.arrlen()),
            Descriptor::Custom(_) => 1,
        }
    }

    #[inline]
    pub(crate) fn num_subrefs(&self) -> u32 {
        match self {
            Descriptor::Fixed(w) => u32::from(w.num_subrefs()),
            Descriptor::Custom(_) => 0,
        }
    }

    #[inline]
    pub(crate) fn num_raw_bytes(&self) -> u32 {
        match self {
            Descriptor::Fixed(w) => u32::from(w.num_raw_bytes()),
            Descriptor::Custom(_) => 0,
        }
    }

    /// Byte size of a single `Fixed` array element (sub-reference slots
    /// followed by the raw tail). Meaningless for `Custom`.
    #[inline]
    pub(crate) fn element_size(&self) -> usize {
        self.num_subrefs() as usize * REF_SIZE + self.num_raw_bytes() as usize
    }

    /// Total byte size of the managed data region this descriptor describes.
    #[inline]
    pub fn byte_size(&self) -> usize {
        match self {
            Descriptor::Fixed(_) => self.arrlen() as usize * self.element_size(),
            Descriptor::Custom(w) => w.total_byte_size() as usize,
        }
    }

    #[inline]
    pub(crate) fn is_marked(&self) -> bool {
        match self {
            Descriptor::Fixed(w) => w.mark(),
            Descriptor::Custom(w) => w.mark(),
        }
    }

    #[inline]
    pub(crate) fn set_marked(&mut self, marked: bool) {
        match self {
            Descriptor::Fixed(w) => w.set_mark(marked),
            Descriptor::Custom(w) => w.set_mark(marked),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_byte_size_matches_formula() {
        let d = Descriptor::fixed(4, 2, 3, 7);
        // 4 elements * (2 subrefs * 8 bytes + 3 raw bytes) = 4 * 19 = 76
        assert_eq!(d.element_size(), 2 * REF_SIZE + 3);
        assert_eq!(d.byte_size(), 4 * (2 * REF_SIZE + 3));
        assert_eq!(d.arrlen(), 4);
        assert_eq!(d.finalizer_id(), 7);
        assert!(!d.is_custom());
    }

    #[test]
    fn custom_byte_size_is_stored_directly() {
        let d = Descriptor::custom(128, 3, 5);
        assert_eq!(d.byte_size(), 128);
        assert_eq!(d.tracer_id(), 3);
        assert_eq!(d.finalizer_id(), 5);
        assert!(d.is_custom());
    }

    #[test]
    fn mark_bit_round_trips() {
        let mut d = Descriptor::fixed(1, 0, 4, 0);
        assert!(!d.is_marked());
        d.set_marked(true);
        assert!(d.is_marked());
        d.set_marked(false);
        assert!(!d.is_marked());
    }

    #[test]
    fn scalar_fixed_has_arrlen_one() {
        let d = Descriptor::fixed(1, 1, 0, 0);
        assert_eq!(d.arrlen(), 1);
    }
}
