use crate::{address::Address, visitor::Visitor};

/// Scan function of an allocation kind. Receives the payload address of the object being scanned
/// and reports every outgoing reference to the visitor.
///
/// The marker only calls it with the payload address of a live allocation whose header carries
/// the kind the function was registered with, which is what lets it read the payload.
pub type ScanFn = unsafe fn(&mut Visitor<'_>, Address);

/// Trait specifying how the garbage collector processes an object of type `T`.
pub trait Trace: Sized {
    /// Function invoking the tracing for an object of type `T`.
    /// - `vis`: The visitor to dispatch to.
    fn trace(&self, vis: &mut Visitor<'_>) {
        let _ = vis;
    }
    /// Type-erased entry point stored in the kind table. Not recommended to override it.
    ///
    /// # Safety
    ///
    /// `this` must point to a live, initialized `Self`.
    unsafe fn trace_(vis: &mut Visitor<'_>, this: Address) {
        (*this.as_ptr::<Self>()).trace(vis);
    }
}

impl Trace for Address {
    fn trace(&self, vis: &mut Visitor<'_>) {
        vis.visit(*self);
    }
}

impl<T: Trace> Trace for Option<T> {
    fn trace(&self, vis: &mut Visitor<'_>) {
        if let Some(value) = self {
            value.trace(vis);
        }
    }
}

impl<T: Trace, const N: usize> Trace for [T; N] {
    fn trace(&self, vis: &mut Visitor<'_>) {
        for value in self.iter() {
            value.trace(vis);
        }
    }
}
