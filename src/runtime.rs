use std::time::Instant;

use crate::{
    address::Address,
    collector::{Collector, GcPhase},
    heap::HeapSpace,
    kind_table::{AllocationKind, KindId, KindTable},
    marking::SynchronousMarking,
    precise_space::PreciseSpace,
    roots::{RootScanner, RootScanners, RootSet},
    statistics::{CollectionStats, CycleLabel},
    type_recording::{ClassId, Classify, SiteId, TypeFeedback, TypeRecorder},
    util::formatted_size,
    visitor::Visitor,
    Config,
};

/// Memory-management state of one runtime instance: kind table, static roots, root scanners,
/// collector and call-site type feedback, all owned together with the heap they describe.
///
/// Nothing is global, so independent runtimes can live side by side (one per test, for example).
pub struct Runtime<H: HeapSpace = PreciseSpace> {
    heap: H,
    kinds: KindTable,
    roots: RootSet,
    scanners: RootScanners,
    collector: Collector,
    type_feedback: TypeFeedback,
    untracked: KindId,
    config: Config,
}

impl Runtime<PreciseSpace> {
    pub fn with_precise_space(config: Config) -> Self {
        Self::new(PreciseSpace::new(), config)
    }
}

impl<H: HeapSpace> Runtime<H> {
    /// Creates a runtime around `heap`. The untracked kind is registered first and is therefore
    /// always [KIND_OFFSET](crate::globals::KIND_OFFSET).
    pub fn new(heap: H, config: Config) -> Self {
        let mut kinds = KindTable::new();
        let untracked = kinds.register(AllocationKind::Untracked);
        Self {
            heap,
            kinds,
            roots: RootSet::new(),
            scanners: RootScanners::new(),
            collector: Collector::new(),
            type_feedback: TypeFeedback::new(config.enable_type_feedback),
            untracked,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn heap(&self) -> &H {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut H {
        &mut self.heap
    }

    pub fn kinds(&self) -> &KindTable {
        &self.kinds
    }

    pub fn untracked_kind(&self) -> KindId {
        self.untracked
    }

    /// Registers an object layout. Meant to be called once per layout at startup.
    pub fn register_kind(&mut self, kind: AllocationKind) -> KindId {
        let id = self.kinds.register(kind);
        logln_if!(
            self.config.verbose >= 2,
            "[gc] registered kind {} as {}",
            kind.name(),
            id
        );
        id
    }

    /// Keeps the allocation containing `address` alive for the lifetime of the runtime.
    pub fn register_static_root(&mut self, address: Address) -> Address {
        self.roots.register_static_root(&self.heap, address)
    }

    pub fn static_roots(&self) -> &RootSet {
        &self.roots
    }

    /// Adds a source of transient roots, consulted at the start of every cycle.
    pub fn add_root_scanner(&self, scanner: impl RootScanner + 'static) {
        self.scanners.add(scanner);
    }

    pub fn phase(&self) -> GcPhase {
        self.collector.phase()
    }

    pub fn total_gc_cycles_count(&self) -> usize {
        self.collector.total_gc_cycles_count()
    }

    pub fn last_cycle(&self) -> Option<&CollectionStats> {
        self.collector.last_cycle()
    }

    /// Runs one full stop-the-world cycle: mark everything reachable from the static roots and
    /// the root scanners, then let the heap reclaim the rest.
    ///
    /// Every other mutator must be parked with its references spilled where a root scanner can
    /// see them before this is called.
    pub fn collect_garbage(&mut self) -> CollectionStats {
        let start = Instant::now();
        let cycle = self.collector.next_cycle_index();
        logln_if!(self.config.verbose >= 2, "{}", CycleLabel(cycle));

        let bytes_before = self.heap.bytes_allocated();
        self.collector.transition(GcPhase::Marking);
        self.heap.prepare_for_marking();

        let mut stack = self.roots.snapshot(self.config.trace_stack_capacity);
        let static_roots = stack.len();
        self.scanners
            .scan_all(&mut Visitor::new(&mut stack, &self.heap));
        let transient_roots = stack.len() - static_roots;

        let marking = SynchronousMarking::new(&self.heap, &self.kinds).run(&mut stack);

        self.collector.transition(GcPhase::Sweeping);
        let sweep = self.heap.reclaim_unmarked();

        let stats = CollectionStats {
            cycle,
            static_roots,
            transient_roots,
            objects_marked: marking.objects_marked,
            objects_scanned: marking.objects_scanned,
            freed_objects: sweep.freed_objects,
            freed_bytes: sweep.freed_bytes,
            live_objects: sweep.live_objects,
            live_bytes: sweep.live_bytes,
            bytes_before,
            pause: start.elapsed(),
        };
        logln_if!(
            self.config.verbose >= 1,
            "[gc] GC({}) Pause MarkSweep {}->{} ({} objects freed) {:.4}ms",
            cycle,
            formatted_size(bytes_before),
            formatted_size(self.heap.bytes_allocated()),
            stats.freed_objects,
            stats.pause.as_micros() as f64 / 1000.0
        );
        self.collector.finish_cycle(stats);
        stats
    }

    pub fn type_feedback(&self) -> &TypeFeedback {
        &self.type_feedback
    }

    pub fn set_type_feedback_enabled(&self, enabled: bool) {
        self.type_feedback.set_enabled(enabled);
    }

    pub fn recorder_for_site(&mut self, site: SiteId) -> &mut TypeRecorder {
        self.type_feedback.recorder_for_site(site)
    }

    pub fn record_type<T: Classify>(&mut self, site: SiteId, obj: T) -> T {
        self.type_feedback.record_type(site, obj)
    }

    pub fn predict_class_for(&self, site: SiteId) -> Option<ClassId> {
        self.type_feedback.predict_class_for(site)
    }
}
