use std::time::Duration;

use crate::util::formatted_size;

/// `Collection #n` prefix shared by the verbose log and the stats report. Cycles count from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleLabel(pub usize);

impl std::fmt::Display for CycleLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Collection #{}", self.0)
    }
}

/// Counters collected over a single collection cycle.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct CollectionStats {
    /// Zero-based index of the cycle.
    pub cycle: usize,
    pub static_roots: usize,
    /// Addresses pushed by root scanners, after conservative filtering.
    pub transient_roots: usize,
    pub objects_marked: usize,
    /// How many times a kind scan function ran. Untracked objects are marked but never scanned.
    pub objects_scanned: usize,
    pub freed_objects: usize,
    pub freed_bytes: usize,
    pub live_objects: usize,
    pub live_bytes: usize,
    pub bytes_before: usize,
    pub pause: Duration,
}

impl std::fmt::Display for CollectionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}:", CycleLabel(self.cycle))?;
        writeln!(
            f,
            "  Roots: {} static, {} transient",
            self.static_roots, self.transient_roots
        )?;
        writeln!(
            f,
            "  Marked: {} objects ({} scanned)",
            self.objects_marked, self.objects_scanned
        )?;
        writeln!(
            f,
            "  Freed: {} objects ({})",
            self.freed_objects,
            formatted_size(self.freed_bytes)
        )?;
        writeln!(
            f,
            "  Live: {} objects ({})",
            self.live_objects,
            formatted_size(self.live_bytes)
        )?;
        write!(f, "  Pause: {:.4}ms", self.pause.as_micros() as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_and_log_share_numbering() {
        let stats = CollectionStats {
            cycle: 3,
            freed_bytes: 2048,
            ..Default::default()
        };
        let report = stats.to_string();
        assert!(report.starts_with(&format!("{}:", CycleLabel(3))));
        assert!(report.starts_with("Collection #3:"));
        assert!(report.contains("Freed: 0 objects"));
    }
}
