use crate::address::Address;

/// Explicit worklist of object addresses waiting to be marked.
///
/// Traversal order is LIFO and nothing outside the marker may depend on it. The same address can
/// be pushed any number of times, the mark bit makes sure it is scanned once per cycle.
#[derive(Clone, Default, Debug)]
pub struct TraceStack {
    entries: Vec<Address>,
}

impl TraceStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn push(&mut self, object: Address) {
        self.entries.push(object);
    }

    #[inline]
    pub fn push_all(&mut self, objects: &[Address]) {
        self.entries.extend_from_slice(objects);
    }

    /// Pops the most recently pushed address, `None` once the stack is drained.
    #[inline]
    pub fn pop(&mut self) -> Option<Address> {
        self.entries.pop()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter()
    }

    /// Copy of `self` with at least `additional` spare slots.
    pub fn snapshot(&self, additional: usize) -> Self {
        let mut entries = Vec::with_capacity(self.entries.len() + additional);
        entries.extend_from_slice(&self.entries);
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_reverse_and_then_none() {
        let mut stack = TraceStack::new();
        stack.push(Address::from_usize(8));
        stack.push_all(&[Address::from_usize(16), Address::from_usize(24)]);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.pop(), Some(Address::from_usize(24)));
        assert_eq!(stack.pop(), Some(Address::from_usize(16)));
        assert_eq!(stack.pop(), Some(Address::from_usize(8)));
        assert_eq!(stack.pop(), None);
        assert!(stack.is_empty());
    }

    #[test]
    fn snapshot_is_independent() {
        let mut roots = TraceStack::new();
        roots.push(Address::from_usize(8));
        let mut copy = roots.snapshot(16);
        copy.push(Address::from_usize(32));
        assert_eq!(copy.pop(), Some(Address::from_usize(32)));
        assert_eq!(copy.pop(), Some(Address::from_usize(8)));
        assert_eq!(roots.len(), 1);
    }
}
