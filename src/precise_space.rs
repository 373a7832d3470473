use std::{mem::size_of, ptr::null_mut};

use crate::{
    address::Address,
    fatal::{invariant_violation, Violation},
    globals::ALLOCATION_GRANULARITY,
    header::ObjectHeader,
    heap::{HeapSpace, SweepResult},
    kind_table::KindId,
    util::align_up,
};

/// Precise allocation: every object gets its own malloc'd block and the `PreciseAllocation` record
/// is put just before the object header.
///
/// ```text
/// +-------------------+--------------+------------------------+
/// | PreciseAllocation | ObjectHeader | payload (cell_size)    |
/// +-------------------+--------------+------------------------+
/// ```
#[repr(C)]
pub struct PreciseAllocation {
    /// payload size
    pub cell_size: usize,
}

impl PreciseAllocation {
    /// Returns record size rounded so that the header after it stays aligned.
    pub const fn header_size() -> usize {
        align_up(size_of::<PreciseAllocation>(), ALLOCATION_GRANULARITY)
    }
    /// Return header address.
    pub fn cell(&self) -> *mut ObjectHeader {
        let addr = unsafe { (self as *const Self as *const u8).add(Self::header_size()) };
        addr as _
    }
    pub fn payload(&self) -> Address {
        Address::from_usize(self.cell() as usize + size_of::<ObjectHeader>())
    }
    /// Return true if raw_ptr is above lower bound
    pub fn above_lower_bound(&self, raw_ptr: Address) -> bool {
        raw_ptr >= self.payload()
    }
    /// Return true if raw_ptr below upper bound
    pub fn below_upper_bound(&self, raw_ptr: Address) -> bool {
        raw_ptr < self.payload().offset(self.cell_size)
    }
    /// Does this allocation contain raw_ptr?
    pub fn contains(&self, raw_ptr: Address) -> bool {
        self.above_lower_bound(raw_ptr) && self.below_upper_bound(raw_ptr)
    }

    pub fn is_marked(&self) -> bool {
        unsafe { (*self.cell()).is_marked() }
    }

    /// Try to create precise allocation. Returns null when malloc fails.
    pub fn try_create(size: usize, kind: KindId) -> *mut Self {
        let allocation_size = Self::header_size() + size_of::<ObjectHeader>() + size;
        unsafe {
            let space = libc::calloc(1, allocation_size).cast::<u8>();
            if space.is_null() {
                return null_mut();
            }
            debug_assert!(crate::util::is_aligned(
                space as usize,
                ALLOCATION_GRANULARITY
            ));
            space.cast::<Self>().write(Self { cell_size: size });
            let this = space.cast::<Self>();
            (*this).cell().write(ObjectHeader::new(kind));
            this
        }
    }

    /// return cell size
    pub fn cell_size(&self) -> usize {
        self.cell_size
    }
    /// Destroy this allocation
    pub fn destroy(&mut self) {
        unsafe {
            libc::free(self as *mut Self as _);
        }
    }
}

/// Non-moving heap where each object lives in its own malloc'd block.
///
/// Allocations are kept sorted by address so interior pointers found by conservative scanning can
/// be resolved with a binary search.
pub struct PreciseSpace {
    pub(crate) allocations: Vec<*mut PreciseAllocation>,
    pub(crate) bytes: usize,
    pub(crate) bytes_allocated_since_collection: usize,
}

impl PreciseSpace {
    pub fn new() -> Self {
        Self {
            allocations: Vec::new(),
            bytes: 0,
            bytes_allocated_since_collection: 0,
        }
    }

    /// Allocates a zeroed payload of `size` bytes tagged with `kind`. Aborts on OOM.
    pub fn allocate_raw(&mut self, kind: KindId, size: usize) -> Address {
        let size = align_up(size.max(1), ALLOCATION_GRANULARITY);
        let memory = PreciseAllocation::try_create(size, kind);
        if memory.is_null() {
            eprintln!("[gc] PreciseSpace: OOM allocating {} bytes", size);
            std::process::abort();
        }
        let index = self
            .allocations
            .partition_point(|allocation| *allocation < memory);
        self.allocations.insert(index, memory);
        self.bytes += size;
        self.bytes_allocated_since_collection += size;
        unsafe { (*memory).payload() }
    }

    /// Moves `value` into a new allocation of `kind`. Payloads are only aligned to
    /// [ALLOCATION_GRANULARITY], over-aligned types are fatal.
    pub fn allocate<T: Copy + 'static>(&mut self, kind: KindId, value: T) -> Address {
        if std::mem::align_of::<T>() > ALLOCATION_GRANULARITY {
            invariant_violation(Violation::UnsupportedAlignment {
                type_name: std::any::type_name::<T>(),
                align: std::mem::align_of::<T>(),
                granularity: ALLOCATION_GRANULARITY,
            });
        }
        let object = self.allocate_raw(kind, size_of::<T>());
        unsafe {
            object.as_ptr::<T>().write(value);
        }
        object
    }

    /// Returns true if `object` is the payload of a live allocation.
    pub fn contains(&self, object: Address) -> bool {
        self.resolve_base(object) == Some(object)
    }

    pub fn kind_of(&self, object: Address) -> Option<KindId> {
        let base = self.resolve_base(object)?;
        Some(unsafe { self.header_of(base) }.kind())
    }

    pub fn size_of(&self, object: Address) -> Option<usize> {
        self.find(object)
            .map(|allocation| unsafe { (*allocation).cell_size() })
    }

    pub fn len(&self) -> usize {
        self.allocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn bytes_allocated_since_collection(&self) -> usize {
        self.bytes_allocated_since_collection
    }

    #[inline]
    fn find(&self, pointer: Address) -> Option<*mut PreciseAllocation> {
        let first = *self.allocations.first()?;
        let last = *self.allocations.last()?;
        unsafe {
            if !(*first).above_lower_bound(pointer) || !(*last).below_upper_bound(pointer) {
                return None;
            }
        }
        let index = self
            .allocations
            .partition_point(|allocation| unsafe { (**allocation).payload() <= pointer });
        if index == 0 {
            return None;
        }
        let allocation = self.allocations[index - 1];
        if unsafe { (*allocation).contains(pointer) } {
            Some(allocation)
        } else {
            None
        }
    }
}

impl Default for PreciseSpace {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl HeapSpace for PreciseSpace {
    #[inline]
    fn resolve_base(&self, candidate: Address) -> Option<Address> {
        self.find(candidate)
            .map(|allocation| unsafe { (*allocation).payload() })
    }

    fn reclaim_unmarked(&mut self) -> SweepResult {
        let mut result = SweepResult::default();
        let mut dst_index = 0;
        for src_index in 0..self.allocations.len() {
            let allocation = self.allocations[src_index];
            unsafe {
                let size = (*allocation).cell_size();
                if !(*allocation).is_marked() {
                    self.bytes -= size;
                    result.freed_objects += 1;
                    result.freed_bytes += size;
                    (*allocation).destroy();
                    continue;
                }
                (*(*allocation).cell()).clear_marked();
                self.allocations[dst_index] = allocation;
                dst_index += 1;
                result.live_objects += 1;
                result.live_bytes += size;
            }
        }
        self.allocations.truncate(dst_index);
        self.bytes_allocated_since_collection = 0;
        result
    }

    fn bytes_allocated(&self) -> usize {
        self.bytes
    }
}

impl Drop for PreciseSpace {
    fn drop(&mut self) {
        while let Some(alloc) = self.allocations.pop() {
            unsafe {
                (*alloc).destroy();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::KIND_OFFSET;

    fn kind() -> KindId {
        KindId::from_raw(KIND_OFFSET)
    }

    #[test]
    fn resolves_interior_pointers() {
        let mut space = PreciseSpace::new();
        let object = space.allocate_raw(kind(), 64);
        assert_eq!(space.resolve_base(object), Some(object));
        assert_eq!(space.resolve_base(object.offset(17)), Some(object));
        assert_eq!(space.resolve_base(object.offset(63)), Some(object));
        assert_eq!(space.resolve_base(object.offset(64)), None);
        assert_eq!(space.resolve_base(Address::NULL), None);
        assert_eq!(space.resolve_base(Address::from_usize(usize::MAX)), None);
        assert_eq!(space.kind_of(object.offset(8)), Some(kind()));
        assert_eq!(space.size_of(object), Some(64));
    }

    #[test]
    fn header_precedes_payload() {
        let mut space = PreciseSpace::new();
        let object = space.allocate(kind(), 42u64);
        let header = space.try_header(object).unwrap();
        assert_eq!(header.payload(), object);
        assert_eq!(header.kind(), kind());
        assert!(!header.is_marked());
        assert_eq!(unsafe { *object.as_ptr::<u64>() }, 42);
    }

    #[test]
    fn sweep_frees_unmarked_and_clears_survivors() {
        let mut space = PreciseSpace::new();
        let live = space.allocate_raw(kind(), 16);
        let dead = space.allocate_raw(kind(), 32);
        space.try_header(live).unwrap().test_and_set_marked();

        let result = space.reclaim_unmarked();
        assert_eq!(result.freed_objects, 1);
        assert_eq!(result.freed_bytes, 32);
        assert_eq!(result.live_objects, 1);
        assert_eq!(result.live_bytes, 16);
        assert!(space.contains(live));
        assert!(!space.contains(dead));
        assert!(!space.try_header(live).unwrap().is_marked());
        assert_eq!(space.bytes(), 16);
        assert_eq!(space.bytes_allocated_since_collection(), 0);
    }

    #[test]
    fn allocations_stay_sorted() {
        let mut space = PreciseSpace::new();
        let objects: Vec<Address> = (0..32).map(|i| space.allocate_raw(kind(), 8 * (i + 1))).collect();
        assert!(space.allocations.windows(2).all(|w| w[0] < w[1]));
        for object in objects {
            assert!(space.contains(object));
        }
    }

    #[test]
    fn payloads_are_granularity_aligned() {
        let mut space = PreciseSpace::new();
        for size in [1, 7, 8, 24, 100] {
            let object = space.allocate_raw(kind(), size);
            assert!(crate::util::is_aligned(
                object.to_usize(),
                ALLOCATION_GRANULARITY
            ));
        }
        let object = space.allocate(kind(), 3u64);
        assert!(crate::util::is_aligned(
            object.to_usize(),
            std::mem::align_of::<u64>()
        ));
    }

    #[repr(align(16))]
    #[derive(Clone, Copy)]
    struct Wide(u64);

    #[test]
    #[should_panic(expected = "needs 16-byte alignment")]
    fn overaligned_payload_is_fatal() {
        let mut space = PreciseSpace::new();
        space.allocate(kind(), Wide(7));
    }
}
