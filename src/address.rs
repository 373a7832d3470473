use std::fmt;

/// Opaque address of a heap object payload.
///
/// The collector never dereferences an `Address` itself, it only moves them between the trace
/// stack and the heap. Scan functions turn them back into typed pointers with [Address::as_ptr].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Address(usize);

impl Address {
    /// Never resolves to an allocation.
    pub const NULL: Self = Self(0);

    #[inline(always)]
    pub const fn from_usize(raw: usize) -> Self {
        Self(raw)
    }
    #[inline(always)]
    pub fn from_ptr<T>(ptr: *const T) -> Self {
        Self(ptr as usize)
    }
    #[inline(always)]
    pub const fn to_usize(self) -> usize {
        self.0
    }
    #[inline(always)]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
    #[inline(always)]
    pub fn as_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }
    #[inline(always)]
    pub const fn offset(self, bytes: usize) -> Self {
        Self(self.0 + bytes)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
