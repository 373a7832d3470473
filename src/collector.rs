use crate::{
    fatal::{invariant_violation, Violation},
    statistics::CollectionStats,
};

/// Collector state. A cycle always runs Idle -> Marking -> Sweeping -> Idle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GcPhase {
    Idle,
    Marking,
    Sweeping,
}

impl GcPhase {
    fn next(self) -> Self {
        match self {
            Self::Idle => Self::Marking,
            Self::Marking => Self::Sweeping,
            Self::Sweeping => Self::Idle,
        }
    }
}

/// Phase and cycle bookkeeping. Only ever driven from the thread running the collection.
pub struct Collector {
    phase: GcPhase,
    total_gcs: usize,
    last_cycle: Option<CollectionStats>,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            phase: GcPhase::Idle,
            total_gcs: 0,
            last_cycle: None,
        }
    }

    pub fn phase(&self) -> GcPhase {
        self.phase
    }

    /// Moves to `to`, which must be the successor of the current phase.
    pub(crate) fn transition(&mut self, to: GcPhase) {
        let from = self.phase;
        if from.next() != to {
            invariant_violation(Violation::IllegalPhaseTransition { from, to });
        }
        self.phase = to;
    }

    /// Closes the running cycle and records its statistics.
    pub(crate) fn finish_cycle(&mut self, stats: CollectionStats) {
        self.transition(GcPhase::Idle);
        self.total_gcs += 1;
        self.last_cycle = Some(stats);
    }

    /// Index the next cycle will be reported with.
    pub fn next_cycle_index(&self) -> usize {
        self.total_gcs
    }

    pub fn total_gc_cycles_count(&self) -> usize {
        self.total_gcs
    }

    pub fn last_cycle(&self) -> Option<&CollectionStats> {
        self.last_cycle.as_ref()
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
