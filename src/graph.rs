use crate::config::INIT_VERTEX_CAPACITY;
use crate::models::{EdgeRecord, RawEdge, RawVertex, VertexId, VertexRecord};
use crate::stats::DumpStats;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use tracing::{trace, warn};

/// Vertices of a single label, keyed by id
pub type VertexTable = DashMap<VertexId, VertexRecord, FxBuildHasher>;

/// Concurrent table-of-tables assembling the vertex-centric view of a graph.
///
/// Vertices are ingested first; edges are then attached to both endpoints by a
/// point-in-time lookup. An edge whose source or target has not been ingested is
/// dropped and reported, never deferred. Callers must therefore finish every
/// vertex ingestion before the first edge ingestion.
pub struct GraphAccumulator {
    tables: DashMap<String, Arc<VertexTable>, FxBuildHasher>,
    stats: Arc<DumpStats>,
}

impl GraphAccumulator {
    pub fn new() -> Self {
        Self::with_stats(Arc::new(DumpStats::new()))
    }

    pub fn with_stats(stats: Arc<DumpStats>) -> Self {
        Self {
            tables: DashMap::with_hasher(FxBuildHasher),
            stats,
        }
    }

    pub fn stats(&self) -> &Arc<DumpStats> {
        &self.stats
    }

    /// Inserts a vertex into the table of its label. A vertex already stored
    /// under the same id is replaced, along with any edges attached to it.
    pub fn ingest_vertex(&self, vertex: RawVertex) {
        let table = self.table_for(&vertex.label);
        let id = vertex.id.clone();
        table.insert(id, VertexRecord::from_raw(vertex));
        self.stats.inc_vertices();
    }

    /// Attaches an edge to its source and target vertices.
    ///
    /// Returns `false` when the edge was dropped because an endpoint is unknown.
    /// The source is checked first, so an edge missing both endpoints is reported
    /// once, as missing its source.
    pub fn ingest_edge(&self, edge: RawEdge) -> bool {
        let Some(sources) = self.resolve(&edge.source_label, &edge.source) else {
            warn!(
                edge = %edge.id,
                label = %edge.label,
                source = %edge.source,
                source_label = %edge.source_label,
                "Invalid edge without source vertex"
            );
            self.stats.inc_missing_sources();
            return false;
        };

        let Some(targets) = self.resolve(&edge.target_label, &edge.target) else {
            warn!(
                edge = %edge.id,
                label = %edge.label,
                target = %edge.target,
                target_label = %edge.target_label,
                "Invalid edge without target vertex"
            );
            self.stats.inc_missing_targets();
            return false;
        };

        let record = Arc::new(EdgeRecord::from_raw(&edge));

        // Guards are released between the two lookups so a self-loop or two
        // endpoints in the same shard never deadlock.
        if let Some(mut source) = sources.get_mut(&edge.source) {
            source.add_edge(Arc::clone(&record));
        }
        if let Some(mut target) = targets.get_mut(&edge.target) {
            target.add_edge(record);
        }

        trace!(edge = %edge.id, "Edge attached");
        self.stats.inc_edges();
        true
    }

    /// Known labels, sorted
    pub fn tables(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.tables.iter().map(|t| t.key().clone()).collect();
        labels.sort_unstable();
        labels
    }

    /// Returns the table for `label`, creating it empty on first reference.
    /// Every call for the same label yields the same underlying map.
    pub fn table_for(&self, label: &str) -> Arc<VertexTable> {
        if let Some(table) = self.tables.get(label) {
            return Arc::clone(table.value());
        }
        let entry = self.tables.entry(label.to_string()).or_insert_with(|| {
            Arc::new(DashMap::with_capacity_and_hasher(
                INIT_VERTEX_CAPACITY,
                FxBuildHasher,
            ))
        });
        Arc::clone(entry.value())
    }

    /// Number of distinct vertices held across all tables
    pub fn vertex_count(&self) -> usize {
        self.tables.iter().map(|t| t.value().len()).sum()
    }

    /// Number of logical edges attached (each one sits in two edge lists)
    pub fn edge_count(&self) -> u64 {
        self.stats.edges()
    }

    /// Looks up an endpoint without creating a table for an unseen label.
    fn resolve(&self, label: &str, id: &VertexId) -> Option<Arc<VertexTable>> {
        let table = Arc::clone(self.tables.get(label)?.value());
        if table.contains_key(id) {
            Some(table)
        } else {
            None
        }
    }
}

impl Default for GraphAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
