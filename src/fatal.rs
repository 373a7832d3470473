//! Fail-fast channel for broken collector invariants.
//!
//! Nothing in the collector returns a recoverable error. A violated invariant means either the
//! runtime was configured wrong at startup or the heap is corrupt, and neither can be continued
//! from, so the process is aborted after the diagnostic. Unit tests of this crate unwind instead
//! so the violations can be asserted.

use crate::{address::Address, collector::GcPhase, kind_table::KindId};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// More kinds registered than the table can hold.
    RegistryOverflow { capacity: usize },
    /// The reserved untracked kind was registered a second time.
    UntrackedReregistered { existing: KindId },
    /// A header carried a kind id that was never handed out.
    UnknownKind { kind: KindId, object: Address },
    /// A static root did not resolve to a live allocation when it was registered.
    UnresolvedStaticRoot { address: Address },
    /// A scan function reported a precise reference the heap does not know about.
    InvalidPreciseReference { address: Address },
    /// A popped trace stack entry is not aligned to the allocation granularity.
    MisalignedObject { address: Address },
    /// The collector was driven through a transition the state machine does not have.
    IllegalPhaseTransition { from: GcPhase, to: GcPhase },
    /// A payload type needs stronger alignment than the heap hands out.
    UnsupportedAlignment {
        type_name: &'static str,
        align: usize,
        granularity: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistryOverflow { capacity } => {
                write!(f, "allocation kind table exhausted ({} kinds)", capacity)
            }
            Self::UntrackedReregistered { existing } => write!(
                f,
                "untracked kind registered twice (already registered as {})",
                existing
            ),
            Self::UnknownKind { kind, object } => {
                write!(f, "object {} has unregistered kind {}", object, kind)
            }
            Self::UnresolvedStaticRoot { address } => write!(
                f,
                "static root {} does not point into a live allocation",
                address
            ),
            Self::InvalidPreciseReference { address } => write!(
                f,
                "precise reference {} is not the base of a live allocation",
                address
            ),
            Self::MisalignedObject { address } => {
                write!(f, "trace stack entry {} is misaligned", address)
            }
            Self::IllegalPhaseTransition { from, to } => {
                write!(f, "illegal collector transition {:?} -> {:?}", from, to)
            }
            Self::UnsupportedAlignment {
                type_name,
                align,
                granularity,
            } => write!(
                f,
                "payload type {} needs {}-byte alignment, heap provides {}",
                type_name, align, granularity
            ),
        }
    }
}

fn report(violation: &Violation) {
    eprintln!("[gc] fatal: {}", violation);
    eprintln!("{:?}", backtrace::Backtrace::new());
}

/// Reports `violation` on stderr together with a backtrace and aborts the process.
#[cold]
#[inline(never)]
pub fn abort_on(violation: Violation) -> ! {
    report(&violation);
    std::process::abort()
}

/// Terminates on a broken invariant. Aborts outside of this crate's unit tests.
#[cold]
#[inline(never)]
pub fn invariant_violation(violation: Violation) -> ! {
    terminate(violation)
}

#[cfg(not(test))]
fn terminate(violation: Violation) -> ! {
    abort_on(violation)
}

#[cfg(test)]
fn terminate(violation: Violation) -> ! {
    report(&violation);
    panic!("[gc] fatal: {}", violation)
}
