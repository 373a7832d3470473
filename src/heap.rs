use crate::{address::Address, header::ObjectHeader};

/// Outcome of [HeapSpace::reclaim_unmarked].
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct SweepResult {
    pub freed_objects: usize,
    pub freed_bytes: usize,
    pub live_objects: usize,
    pub live_bytes: usize,
}

/// Heap the collector runs against.
///
/// The collector owns no memory. It asks the heap to map candidate pointers back to allocations,
/// reads and sets mark bits through [ObjectHeader], and hands reclamation back to the heap once
/// marking is done.
///
/// # Safety
///
/// Implementors guarantee that every address returned from [resolve_base](HeapSpace::resolve_base)
/// is the payload of a live allocation preceded by an initialized [ObjectHeader] whose kind id was
/// produced by the runtime's kind table, and that such an allocation stays valid until the next
/// [reclaim_unmarked](HeapSpace::reclaim_unmarked).
pub unsafe trait HeapSpace {
    /// Maps an interior or base pointer to the payload address of the allocation containing it.
    fn resolve_base(&self, candidate: Address) -> Option<Address>;

    /// Header of the allocation whose payload starts at `object`.
    ///
    /// # Safety
    ///
    /// `object` must be the payload address of a live allocation of this heap, as returned by
    /// [resolve_base](HeapSpace::resolve_base) since the last sweep.
    unsafe fn header_of(&self, object: Address) -> &ObjectHeader {
        &*ObjectHeader::from_object(object)
    }

    /// Header of `object` if it is the payload address of a live allocation.
    fn try_header(&self, object: Address) -> Option<&ObjectHeader> {
        if self.resolve_base(object) == Some(object) {
            Some(unsafe { self.header_of(object) })
        } else {
            None
        }
    }

    /// Frees every allocation left unmarked by the last marking phase and clears the mark bit of
    /// every survivor, so the next cycle starts with all headers unmarked.
    fn reclaim_unmarked(&mut self) -> SweepResult;

    /// Invoked once before root scanning starts.
    fn prepare_for_marking(&mut self) {}

    /// Bytes currently held by live and not yet swept allocations.
    fn bytes_allocated(&self) -> usize {
        0
    }
}
