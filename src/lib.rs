//! # tracegc
//!
//! Memory-management core for a managed-language runtime: a stop-the-world, single pass
//! mark-sweep collector plus a small call-site type recorder that feeds a JIT's speculation.
//!
//! The collector knows nothing about object layouts by itself. Every layout is registered once
//! as an [AllocationKind](kind_table::AllocationKind) which tells the marker how to find
//! outgoing references. Kinds whose layout is not known precisely can scan their memory
//! conservatively through [Visitor::visit_potential_range](visitor::Visitor::visit_potential_range).
//!
//! ```ignore
//! use tracegc::{Runtime, Config, kind_table::AllocationKind};
//!
//! let mut rt = Runtime::with_precise_space(Config::default());
//! let node = rt.register_kind(AllocationKind::traced_as::<Node>("node"));
//! let root = rt.heap_mut().allocate(node, Node { next: None });
//! rt.register_static_root(root);
//! rt.collect_garbage();
//! ```

macro_rules! logln_if {
    ($cond: expr, $($t:tt)*) => {
        if $cond {
            eprintln!($($t)*);
        }
    };
}

pub mod address;
pub mod collector;
pub mod fatal;
pub mod globals;
pub mod header;
pub mod heap;
pub mod internal;
pub mod kind_table;
pub mod marking;
pub mod precise_space;
pub mod roots;
pub mod runtime;
pub mod statistics;
pub mod trace_stack;
pub mod type_recording;
pub mod util;
pub mod visitor;


#[cfg(doctest)]
#[doc = include_str!("../README.md")]
pub struct ReadmeDoctests;

pub use address::Address;
pub use collector::GcPhase;
pub use heap::HeapSpace;
pub use internal::trace_trait::Trace;
pub use kind_table::{AllocationKind, KindId};
pub use precise_space::PreciseSpace;
pub use roots::{ConservativeStackScanner, RootScanner};
pub use runtime::Runtime;
pub use statistics::CollectionStats;
pub use type_recording::{ClassId, Classify, SiteId, TypeRecorder};
pub use visitor::Visitor;

/// Configuration for runtime constructor.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// GC verbosity. `1` prints a pause summary per cycle, `2` also prints cycle indices
    /// and kind registrations.
    pub verbose: u8,
    /// Enables speculative class prediction. Recording happens regardless of this flag.
    pub enable_type_feedback: bool,
    /// Initial capacity of the trace stack used by each cycle.
    pub trace_stack_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose: 0,
            enable_type_feedback: false,
            trace_stack_capacity: 1024,
        }
    }
}
