use parking_lot::Mutex;

use crate::{
    address::Address,
    fatal::{invariant_violation, Violation},
    heap::HeapSpace,
    trace_stack::TraceStack,
    visitor::Visitor,
};

/// Addresses registered once and kept alive for the lifetime of the runtime.
#[derive(Default)]
pub struct RootSet {
    statics: TraceStack,
}

impl RootSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a permanent root. `address` may point anywhere inside a live allocation, the base of
    /// that allocation is what gets recorded.
    pub fn register_static_root(&mut self, heap: &dyn HeapSpace, address: Address) -> Address {
        match heap.resolve_base(address) {
            Some(base) => {
                self.statics.push(base);
                base
            }
            None => invariant_violation(Violation::UnresolvedStaticRoot { address }),
        }
    }

    /// Trace stack seeded with every static root, with room for `additional` more entries.
    pub fn snapshot(&self, additional: usize) -> TraceStack {
        self.statics.snapshot(additional)
    }

    pub fn len(&self) -> usize {
        self.statics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statics.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.statics.iter()
    }
}

/// Source of transient roots, asked once per cycle to push whatever it can see.
///
/// Stack and register contents are not typed, so scanners normally report them through
/// [Visitor::visit_potential_range].
pub trait RootScanner {
    fn scan_roots(&mut self, visitor: &mut Visitor<'_>);
}

impl<F: FnMut(&mut Visitor<'_>)> RootScanner for F {
    fn scan_roots(&mut self, visitor: &mut Visitor<'_>) {
        self(visitor)
    }
}

pub struct RootScanners(pub(crate) Mutex<Vec<Box<dyn RootScanner>>>);

impl RootScanners {
    pub fn new() -> Self {
        Self(Mutex::new(vec![]))
    }
    pub fn add(&self, scanner: impl RootScanner + 'static) {
        self.0.lock().push(Box::new(scanner));
    }
    pub fn scan_all(&self, visitor: &mut Visitor<'_>) {
        let mut scanners = self.0.lock();
        for scanner in scanners.iter_mut() {
            scanner.scan_roots(visitor);
        }
    }
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

impl Default for RootScanners {
    fn default() -> Self {
        Self::new()
    }
}

#[inline(always)]
pub fn approximate_stack_pointer() -> *const usize {
    let marker = 0usize;
    std::hint::black_box(&marker) as *const usize
}

/// Conservatively scans the current thread's stack from the frame running the collection up to
/// an origin address in some outer frame.
///
/// Registers are not scanned. The caller must make sure every live reference has been spilled to
/// memory before collecting, and must only collect on the same thread, from a frame nested inside
/// the one holding the origin.
pub struct ConservativeStackScanner {
    origin: usize,
}

impl ConservativeStackScanner {
    /// `origin` is typically the address of a local in the outermost frame whose references
    /// should be found. The word at `origin` itself is scanned too.
    pub fn new<T>(origin: *const T) -> Self {
        Self {
            origin: origin as usize + std::mem::size_of::<usize>(),
        }
    }

    pub fn origin(&self) -> usize {
        self.origin
    }
}

impl RootScanner for ConservativeStackScanner {
    #[inline(never)]
    fn scan_roots(&mut self, visitor: &mut Visitor<'_>) {
        let current = approximate_stack_pointer() as usize;
        let (low, high) = if current < self.origin {
            (current, self.origin)
        } else {
            (self.origin, current)
        };
        let low = crate::util::align_up(low, std::mem::size_of::<usize>());
        unsafe {
            visitor.visit_potential_region(low as *const usize, high as *const usize);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{globals::KIND_OFFSET, kind_table::KindId, precise_space::PreciseSpace};

    #[test]
    fn static_roots_record_the_base() {
        let mut space = PreciseSpace::new();
        let object = space.allocate_raw(KindId::from_raw(KIND_OFFSET), 32);
        let mut roots = RootSet::new();
        assert_eq!(roots.register_static_root(&space, object.offset(8)), object);
        let mut stack = roots.snapshot(0);
        assert_eq!(stack.pop(), Some(object));
        assert_eq!(roots.len(), 1);
    }

    #[test]
    #[should_panic(expected = "does not point into a live allocation")]
    fn dangling_static_root_is_fatal() {
        let space = PreciseSpace::new();
        let mut roots = RootSet::new();
        roots.register_static_root(&space, Address::from_usize(0x1000));
    }

    #[test]
    fn closures_are_scanners() {
        let mut space = PreciseSpace::new();
        let object = space.allocate_raw(KindId::from_raw(KIND_OFFSET), 16);
        let scanners = RootScanners::new();
        let word = object.to_usize();
        scanners.add(move |vis: &mut Visitor<'_>| {
            vis.visit_potential_range(&[0, 17, word + 4]);
        });
        let mut stack = TraceStack::new();
        scanners.scan_all(&mut Visitor::new(&mut stack, &space));
        assert_eq!(stack.pop(), Some(object));
        assert_eq!(stack.pop(), None);
        assert_eq!(scanners.len(), 1);
    }
}
