use crate::{
    address::Address,
    fatal::{invariant_violation, Violation},
    heap::HeapSpace,
    internal::trace_trait::Trace,
    trace_stack::TraceStack,
};

/// Handed to scan functions and root scanners. Everything it is shown ends up on the trace stack
/// of the running cycle.
///
/// There are two families of operations:
/// - precise (`visit*`): the caller knows the value is a reference to the payload of a live
///   allocation. It must be the base payload address, interior pointers are rejected here. Debug
///   builds check this against the heap and abort on mismatch, since it means a scan function
///   misdescribes its object's layout. Interior pointers go through the conservative family or
///   [RootSet::register_static_root](crate::roots::RootSet::register_static_root), both of which
///   resolve them to the base first.
/// - conservative (`visit_potential*`): the caller is scanning words that may or may not be
///   pointers. Candidates that do not resolve to an allocation are dropped without effect.
pub struct Visitor<'a> {
    stack: &'a mut TraceStack,
    heap: &'a dyn HeapSpace,
}

impl<'a> Visitor<'a> {
    pub fn new(stack: &'a mut TraceStack, heap: &'a dyn HeapSpace) -> Self {
        Self { stack, heap }
    }

    #[inline]
    fn validate(&self, object: Address) {
        if cfg!(debug_assertions) && self.heap.resolve_base(object) != Some(object) {
            invariant_violation(Violation::InvalidPreciseReference { address: object });
        }
    }

    /// Reports a precise reference.
    #[inline]
    pub fn visit(&mut self, object: Address) {
        self.validate(object);
        self.stack.push(object);
    }

    pub fn visit_optional(&mut self, object: Option<Address>) {
        if let Some(object) = object {
            self.visit(object);
        }
    }

    /// Reports a contiguous run of precise references.
    pub fn visit_range(&mut self, objects: &[Address]) {
        for object in objects {
            self.validate(*object);
        }
        self.stack.push_all(objects);
    }

    /// Trace method for inlined values that follow heap layout but are not allocated themselves.
    pub fn trace_ref<T: Trace>(&mut self, value: &T) {
        value.trace(self);
    }

    /// Reports a word that may be a pointer into the heap. Returns `true` if it was one.
    #[inline]
    pub fn visit_potential(&mut self, word: usize) -> bool {
        match self.heap.resolve_base(Address::from_usize(word)) {
            Some(base) => {
                self.visit(base);
                true
            }
            None => false,
        }
    }

    pub fn visit_potential_range(&mut self, words: &[usize]) {
        for word in words {
            self.visit_potential(*word);
        }
    }

    /// Conservatively scans the words in `[from, to)`.
    ///
    /// # Safety
    ///
    /// The whole range must be mapped and readable. Its contents may be garbage.
    pub unsafe fn visit_potential_region(&mut self, from: *const usize, to: *const usize) {
        let mut scan = from;
        while scan < to {
            let word = scan.read_volatile();
            self.visit_potential(word);
            scan = scan.add(1);
        }
    }
}
