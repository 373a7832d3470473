use crate::{address::Address, kind_table::KindId};
use modular_bitfield::prelude::*;
use std::{cell::Cell, mem::size_of};

// ObjectHeader contains meta data per object and is prepended to each
// object payload.
//
// +-----------------+------+------------------------------------------+
// | name            | bits |                                          |
// +-----------------+------+------------------------------------------+
// | padding         |   32 | Keeps the payload word aligned.          |
// +-----------------+------+------------------------------------------+
// | kind id         |   15 | Always in the registered range.          |
// | mark bit        |    1 |                                          |
// +-----------------+------+------------------------------------------+
// | reserved        |   16 |                                          |
// +-----------------+------+------------------------------------------+
//
// Notes:
// - The kind id is written once by the heap at allocation time.
// - The mark bit is false after allocation, goes false->true at most once per
//   marking phase and is cleared again by the heap when it sweeps.
#[repr(C)]
pub struct ObjectHeader {
    _padding: u32,
    encoded: Cell<EncodedHeader>,
    _reserved: u16,
}

impl ObjectHeader {
    pub fn new(kind: KindId) -> Self {
        Self {
            _padding: 0,
            encoded: Cell::new(EncodedHeader::new().with_kind(kind.raw()).with_marked(false)),
            _reserved: 0,
        }
    }
    /// Returns header pointer for object payload at `object`.
    ///
    /// # Safety
    /// `object` must be the payload address of an allocation laid out as header followed by payload.
    #[inline(always)]
    pub unsafe fn from_object(object: Address) -> *mut Self {
        object.as_ptr::<u8>().sub(size_of::<Self>()).cast()
    }
    #[inline(always)]
    pub fn payload(&self) -> Address {
        Address::from_usize(self as *const Self as usize + size_of::<Self>())
    }
    #[inline(always)]
    pub fn kind(&self) -> KindId {
        KindId::from_raw(self.encoded.get().kind())
    }
    #[inline(always)]
    pub fn is_marked(&self) -> bool {
        self.encoded.get().marked()
    }
    /// Sets the mark bit. Returns `true` when the object was already marked.
    #[inline(always)]
    pub fn test_and_set_marked(&self) -> bool {
        let mut encoded = self.encoded.get();
        if encoded.marked() {
            return true;
        }
        encoded.set_marked(true);
        self.encoded.set(encoded);
        false
    }
    #[inline(always)]
    pub fn clear_marked(&self) {
        let mut encoded = self.encoded.get();
        encoded.set_marked(false);
        self.encoded.set(encoded);
    }
}

#[bitfield(bits = 16)]
#[derive(Clone, Copy)]
pub struct EncodedHeader {
    kind: B15,
    marked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::KIND_OFFSET;

    #[test]
    fn header_is_one_word() {
        assert_eq!(size_of::<ObjectHeader>(), 8);
    }

    #[test]
    fn mark_bit_flips_once() {
        let header = ObjectHeader::new(KindId::from_raw(KIND_OFFSET + 3));
        assert!(!header.is_marked());
        assert!(!header.test_and_set_marked());
        assert!(header.test_and_set_marked());
        assert!(header.is_marked());
        assert_eq!(header.kind(), KindId::from_raw(KIND_OFFSET + 3));
        header.clear_marked();
        assert!(!header.is_marked());
    }
}
