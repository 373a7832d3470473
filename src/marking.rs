use crate::{
    fatal::{invariant_violation, Violation},
    globals::ALLOCATION_GRANULARITY,
    heap::HeapSpace,
    kind_table::{KindTable, KindTrace},
    trace_stack::TraceStack,
    util::is_aligned,
    visitor::Visitor,
};

#[derive(Clone, Copy, Default, Debug)]
pub struct MarkingStats {
    pub objects_marked: usize,
    pub objects_scanned: usize,
}

/// Drains a trace stack, marking every object on it and everything their scan functions report.
pub struct SynchronousMarking<'a> {
    heap: &'a dyn HeapSpace,
    kinds: &'a KindTable,
}

impl<'a> SynchronousMarking<'a> {
    pub fn new(heap: &'a dyn HeapSpace, kinds: &'a KindTable) -> Self {
        Self { heap, kinds }
    }

    pub fn run(&mut self, stack: &mut TraceStack) -> MarkingStats {
        let mut stats = MarkingStats::default();
        while let Some(object) = stack.pop() {
            if cfg!(debug_assertions) && !is_aligned(object.to_usize(), ALLOCATION_GRANULARITY) {
                invariant_violation(Violation::MisalignedObject { address: object });
            }
            // entries come from precise visits or resolved conservative candidates
            let header = unsafe { self.heap.header_of(object) };
            if header.test_and_set_marked() {
                continue;
            }
            stats.objects_marked += 1;

            match self.kinds.lookup(header.kind(), object) {
                KindTrace::Untracked => continue,
                KindTrace::Scan(scan) => {
                    stats.objects_scanned += 1;
                    unsafe {
                        scan(&mut Visitor::new(stack, self.heap), object);
                    }
                }
            }
        }
        stats
    }
}
