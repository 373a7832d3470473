use std::mem::size_of;

/// Maximum number of allocation kinds a single runtime can register.
pub const MAX_KINDS: usize = 1024;
/// First kind id handed out. Ids below it are never valid, so a zeroed header is caught.
pub const KIND_OFFSET: u16 = 0x111;
/// Every object payload is aligned to this many bytes.
pub const ALLOCATION_GRANULARITY: usize = size_of::<usize>();
/// A call site must see the same class more than this many times in a row before it is predicted.
pub const PREDICTION_THRESHOLD: u64 = 100;
