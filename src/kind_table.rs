use std::fmt;

use crate::{
    address::Address,
    fatal::{invariant_violation, Violation},
    globals::{KIND_OFFSET, MAX_KINDS},
    internal::trace_trait::{ScanFn, Trace},
};

/// Runtime-registered layout of a heap allocation.
#[derive(Clone, Copy)]
pub enum AllocationKind {
    /// Objects without outgoing references, e.g. raw byte buffers. Marked live but never scanned.
    Untracked,
    /// Objects whose references are reported by `scan`.
    Traced { name: &'static str, scan: ScanFn },
}

impl AllocationKind {
    pub const fn traced(name: &'static str, scan: ScanFn) -> Self {
        Self::Traced { name, scan }
    }
    /// Kind whose scan function is `T`'s [Trace] impl.
    pub fn traced_as<T: Trace + 'static>(name: &'static str) -> Self {
        Self::Traced {
            name,
            scan: <T as Trace>::trace_,
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            Self::Untracked => "untracked",
            Self::Traced { name, .. } => name,
        }
    }
}

impl fmt::Debug for AllocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AllocationKind({})", self.name())
    }
}

/// Id stored in every object header.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct KindId(u16);

impl KindId {
    #[inline(always)]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }
    #[inline(always)]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for KindId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// What the marker does with an object once it is marked.
#[derive(Clone, Copy)]
pub enum KindTrace {
    Untracked,
    Scan(ScanFn),
}

/// Append-only table of allocation kinds.
///
/// Ids are handed out in registration order starting at [KIND_OFFSET]. At most
/// [MAX_KINDS] kinds fit; registering one more is a startup configuration error.
pub struct KindTable {
    kinds: Vec<AllocationKind>,
    untracked: Option<KindId>,
}

impl KindTable {
    pub fn new() -> Self {
        Self {
            kinds: Vec::new(),
            untracked: None,
        }
    }

    pub fn register(&mut self, kind: AllocationKind) -> KindId {
        if self.kinds.len() >= MAX_KINDS {
            invariant_violation(Violation::RegistryOverflow {
                capacity: MAX_KINDS,
            });
        }
        let id = KindId(KIND_OFFSET + self.kinds.len() as u16);
        if let AllocationKind::Untracked = kind {
            if let Some(existing) = self.untracked {
                invariant_violation(Violation::UntrackedReregistered { existing });
            }
            self.untracked = Some(id);
        }
        self.kinds.push(kind);
        id
    }

    /// Looks up what to do with `object` whose header carries `kind`.
    #[inline]
    pub fn lookup(&self, kind: KindId, object: Address) -> KindTrace {
        match self.get(kind) {
            Some(AllocationKind::Untracked) => KindTrace::Untracked,
            Some(AllocationKind::Traced { scan, .. }) => KindTrace::Scan(*scan),
            None => invariant_violation(Violation::UnknownKind { kind, object }),
        }
    }

    pub fn get(&self, kind: KindId) -> Option<&AllocationKind> {
        let index = kind.0.checked_sub(KIND_OFFSET)?;
        self.kinds.get(index as usize)
    }

    pub fn is_registered(&self, kind: KindId) -> bool {
        self.get(kind).is_some()
    }

    pub fn name_of(&self, kind: KindId) -> Option<&'static str> {
        self.get(kind).map(|kind| kind.name())
    }

    pub fn untracked_kind(&self) -> Option<KindId> {
        self.untracked
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

impl Default for KindTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor::Visitor;

    unsafe fn scan_nothing(_: &mut Visitor<'_>, _: Address) {}

    #[test]
    fn ids_are_contiguous_from_offset() {
        let mut table = KindTable::new();
        let ids: Vec<KindId> = (0..8)
            .map(|_| table.register(AllocationKind::traced("k", scan_nothing)))
            .collect();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(id.raw(), KIND_OFFSET + i as u16);
        }
        assert_eq!(table.len(), 8);
    }

    #[test]
    fn untracked_kind_is_remembered() {
        let mut table = KindTable::new();
        let traced = table.register(AllocationKind::traced("k", scan_nothing));
        let untracked = table.register(AllocationKind::Untracked);
        assert_eq!(table.untracked_kind(), Some(untracked));
        assert!(matches!(
            table.lookup(untracked, Address::NULL),
            KindTrace::Untracked
        ));
        assert!(matches!(
            table.lookup(traced, Address::NULL),
            KindTrace::Scan(_)
        ));
        assert_eq!(table.name_of(traced), Some("k"));
    }

    #[test]
    fn ids_below_offset_are_unknown() {
        let mut table = KindTable::new();
        table.register(AllocationKind::Untracked);
        assert!(!table.is_registered(KindId::from_raw(0)));
        assert!(!table.is_registered(KindId::from_raw(KIND_OFFSET + 1)));
    }

    #[test]
    fn capacity_is_reachable() {
        let mut table = KindTable::new();
        for _ in 0..MAX_KINDS {
            table.register(AllocationKind::traced("k", scan_nothing));
        }
        assert_eq!(table.len(), MAX_KINDS);
    }

    #[test]
    #[should_panic(expected = "allocation kind table exhausted")]
    fn overflow_is_fatal() {
        let mut table = KindTable::new();
        for _ in 0..=MAX_KINDS {
            table.register(AllocationKind::traced("k", scan_nothing));
        }
    }

    #[test]
    #[should_panic(expected = "untracked kind registered twice")]
    fn untracked_twice_is_fatal() {
        let mut table = KindTable::new();
        table.register(AllocationKind::Untracked);
        table.register(AllocationKind::Untracked);
    }

    #[test]
    #[should_panic(expected = "unregistered kind")]
    fn unknown_lookup_is_fatal() {
        let table = KindTable::new();
        table.lookup(KindId::from_raw(KIND_OFFSET), Address::NULL);
    }
}
