use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected during a dump run. Recoverable failures (dropped edges,
/// failed pages, failed records and tables) land here as well as in the log.
#[derive(Default)]
pub struct DumpStats {
    pub vertices_ingested: AtomicU64,
    pub edges_attached: AtomicU64,
    pub missing_sources: AtomicU64,
    pub missing_targets: AtomicU64,
    pub pages_fetched: AtomicU64,
    pub pages_failed: AtomicU64,
    pub records_written: AtomicU64,
    pub format_errors: AtomicU64,
    pub tables_written: AtomicU64,
    pub tables_failed: AtomicU64,
}

impl DumpStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_vertices(&self) {
        self.vertices_ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_edges(&self) {
        self.edges_attached.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_missing_sources(&self) {
        self.missing_sources.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_missing_targets(&self) {
        self.missing_targets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pages(&self) -> u64 {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn inc_failed_pages(&self) {
        self.pages_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_records(&self, count: u64) {
        self.records_written.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_format_errors(&self, count: u64) {
        self.format_errors.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_tables(&self) {
        self.tables_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed_tables(&self) {
        self.tables_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn vertices(&self) -> u64 {
        self.vertices_ingested.load(Ordering::Relaxed)
    }

    pub fn edges(&self) -> u64 {
        self.edges_attached.load(Ordering::Relaxed)
    }

    pub fn missing_sources(&self) -> u64 {
        self.missing_sources.load(Ordering::Relaxed)
    }

    pub fn missing_targets(&self) -> u64 {
        self.missing_targets.load(Ordering::Relaxed)
    }

    /// Edges dropped because an endpoint was never ingested
    pub fn dropped_edges(&self) -> u64 {
        self.missing_sources() + self.missing_targets()
    }

    pub fn pages(&self) -> u64 {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn failed_pages(&self) -> u64 {
        self.pages_failed.load(Ordering::Relaxed)
    }

    pub fn records(&self) -> u64 {
        self.records_written.load(Ordering::Relaxed)
    }

    pub fn format_errors(&self) -> u64 {
        self.format_errors.load(Ordering::Relaxed)
    }

    pub fn tables(&self) -> u64 {
        self.tables_written.load(Ordering::Relaxed)
    }

    pub fn failed_tables(&self) -> u64 {
        self.tables_failed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values_are_zero() {
        let stats = DumpStats::new();
        assert_eq!(stats.vertices(), 0);
        assert_eq!(stats.edges(), 0);
        assert_eq!(stats.missing_sources(), 0);
        assert_eq!(stats.missing_targets(), 0);
        assert_eq!(stats.pages(), 0);
        assert_eq!(stats.failed_pages(), 0);
        assert_eq!(stats.records(), 0);
        assert_eq!(stats.format_errors(), 0);
        assert_eq!(stats.tables(), 0);
        assert_eq!(stats.failed_tables(), 0);
    }

    #[test]
    fn inc_pages_returns_running_total() {
        let stats = DumpStats::new();
        assert_eq!(stats.inc_pages(), 1);
        assert_eq!(stats.inc_pages(), 2);
        assert_eq!(stats.pages(), 2);
    }

    #[test]
    fn dropped_edges_sums_both_endpoints() {
        let stats = DumpStats::new();
        stats.inc_missing_sources();
        stats.inc_missing_targets();
        stats.inc_missing_targets();
        assert_eq!(stats.dropped_edges(), 3);
    }

    #[test]
    fn mixed_operations() {
        let stats = DumpStats::new();
        stats.inc_vertices();
        stats.inc_vertices();
        stats.inc_edges();
        stats.add_records(10);
        stats.add_records(5);
        stats.add_format_errors(2);
        stats.inc_tables();
        stats.inc_failed_tables();
        stats.inc_failed_pages();

        assert_eq!(stats.vertices(), 2);
        assert_eq!(stats.edges(), 1);
        assert_eq!(stats.records(), 15);
        assert_eq!(stats.format_errors(), 2);
        assert_eq!(stats.tables(), 1);
        assert_eq!(stats.failed_tables(), 1);
        assert_eq!(stats.failed_pages(), 1);
    }
}
