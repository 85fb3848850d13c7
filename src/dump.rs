use crate::config::{PROGRESS_INTERVAL, RECORD_TERMINATOR, WRITE_BUFFER_SIZE};
use crate::format::{Formatter, JsonFormatter};
use crate::graph::{GraphAccumulator, VertexTable};
use crate::source::{for_each_page, GraphSource, Page, Shard};
use crate::stats::DumpStats;
use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Default)]
pub struct DumpConfig {
    /// Worker threads for fetching and writing (0 = one per core)
    pub threads: usize,
    /// Show a spinner on stderr while the dump runs
    pub progress: bool,
}

/// Outcome of a dump run. Recoverable failures only show up in the counters
/// and the log; they never fail the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpSummary {
    pub elapsed: Duration,
    pub vertices: u64,
    pub edges: u64,
    pub missing_sources: u64,
    pub missing_targets: u64,
    pub pages: u64,
    pub failed_pages: u64,
    pub tables_written: u64,
    pub tables_failed: u64,
    pub records: u64,
    pub format_errors: u64,
}

impl DumpSummary {
    fn collect(elapsed: Duration, graph: &GraphAccumulator) -> Self {
        let stats = graph.stats();
        Self {
            elapsed,
            vertices: graph.vertex_count() as u64,
            edges: stats.edges(),
            missing_sources: stats.missing_sources(),
            missing_targets: stats.missing_targets(),
            pages: stats.pages(),
            failed_pages: stats.failed_pages(),
            tables_written: stats.tables(),
            tables_failed: stats.failed_tables(),
            records: stats.records(),
            format_errors: stats.format_errors(),
        }
    }

    pub fn dropped_edges(&self) -> u64 {
        self.missing_sources + self.missing_targets
    }
}

impl fmt::Display for DumpSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Summary ===")?;
        writeln!(f, "Elapsed time:       {:.2}s", self.elapsed.as_secs_f64())?;
        writeln!(f, "Vertices:           {}", self.vertices)?;
        writeln!(f, "Edges:              {}", self.edges)?;
        writeln!(f, "Dropped edges:      {}", self.dropped_edges())?;
        writeln!(f, "Pages fetched:      {}", self.pages)?;
        writeln!(f, "Failed pages:       {}", self.failed_pages)?;
        writeln!(f, "Tables written:     {}", self.tables_written)?;
        writeln!(f, "Failed tables:      {}", self.tables_failed)?;
        writeln!(f, "Records written:    {}", self.records)?;
        write!(f, "Format errors:      {}", self.format_errors)
    }
}

/// Dumps a graph into one file per vertex label, each line holding one vertex
/// together with its incident edges.
pub struct DumpGraph<S> {
    source: S,
    formatter: Arc<dyn Formatter>,
    config: DumpConfig,
}

impl<S: GraphSource> DumpGraph<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            formatter: Arc::new(JsonFormatter),
            config: DumpConfig::default(),
        }
    }

    pub fn with_config(mut self, config: DumpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Installs `formatter` for subsequent runs and returns the one it replaces.
    pub fn set_formatter(&mut self, formatter: Arc<dyn Formatter>) -> Arc<dyn Formatter> {
        std::mem::replace(&mut self.formatter, formatter)
    }

    pub fn formatter(&self) -> &Arc<dyn Formatter> {
        &self.formatter
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Runs a full dump into `output_dir`.
    ///
    /// Only failing to create the output directory (or the worker pool) is an
    /// error; every later failure is logged, counted and skipped.
    pub fn dump(&self, output_dir: impl AsRef<Path>) -> Result<DumpSummary> {
        let output_dir = output_dir.as_ref();
        fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;

        let start = Instant::now();
        let pool = self.build_pool()?;
        let pb = self.progress_bar();

        let graph = self.ingest_with(&pool, &pb);
        self.write_with(&pool, &graph, output_dir, &pb);
        pb.finish_and_clear();

        let summary = DumpSummary::collect(start.elapsed(), &graph);
        info!(
            duration_secs = summary.elapsed.as_secs_f64(),
            vertices = summary.vertices,
            edges = summary.edges,
            dropped_edges = summary.dropped_edges(),
            tables = summary.tables_written,
            failed_tables = summary.tables_failed,
            formatter = self.formatter.name(),
            "Dump graph complete"
        );
        Ok(summary)
    }

    /// Runs both ingest phases and returns the assembled graph without writing it.
    pub fn ingest(&self) -> Result<GraphAccumulator> {
        let pool = self.build_pool()?;
        Ok(self.ingest_with(&pool, &ProgressBar::hidden()))
    }

    fn build_pool(&self) -> Result<ThreadPool> {
        ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|i| format!("graphdump-worker-{i}"))
            .build()
            .context("Failed to build worker pool")
    }

    fn progress_bar(&self) -> ProgressBar {
        if self.config.progress {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        }
    }

    /// Vertices then edges. Each phase joins all of its shards before returning,
    /// which is what lets edge lookups see every vertex.
    fn ingest_with(&self, pool: &ThreadPool, pb: &ProgressBar) -> GraphAccumulator {
        let graph = GraphAccumulator::new();

        info!("Fetching vertices");
        self.run_phase(
            pool,
            "vertex",
            self.source.vertex_shards(),
            |shard, page| self.source.fetch_vertices(shard, page),
            |vertex| graph.ingest_vertex(vertex),
            graph.stats(),
            pb,
        );
        info!(vertices = graph.vertex_count(), "Vertices ingested");

        info!("Fetching edges");
        self.run_phase(
            pool,
            "edge",
            self.source.edge_shards(),
            |shard, page| self.source.fetch_edges(shard, page),
            |edge| {
                graph.ingest_edge(edge);
            },
            graph.stats(),
            pb,
        );
        info!(
            edges = graph.edge_count(),
            dropped = graph.stats().dropped_edges(),
            "Edges ingested"
        );

        graph
    }

    #[allow(clippy::too_many_arguments)]
    fn run_phase<T, F, I>(
        &self,
        pool: &ThreadPool,
        kind: &'static str,
        shards: Result<Vec<Shard>>,
        fetch: F,
        ingest: I,
        stats: &DumpStats,
        pb: &ProgressBar,
    ) where
        T: Send,
        F: Fn(&Shard, Option<&str>) -> Result<Page<T>> + Sync,
        I: Fn(T) + Sync,
    {
        let shards = match shards {
            Ok(shards) => shards,
            Err(e) => {
                error!(kind, error = %format!("{e:#}"), "Failed to list shards");
                stats.inc_failed_pages();
                return;
            }
        };
        debug!(kind, shards = shards.len(), "Fetching shards");

        pool.install(|| {
            shards.par_iter().for_each(|shard| {
                let result = for_each_page(
                    shard,
                    |s, token| fetch(s, token),
                    |items| {
                        for item in items {
                            ingest(item);
                        }
                        let pages = stats.inc_pages();
                        if pages % PROGRESS_INTERVAL == 0 {
                            pb.set_message(format!("{pages} pages fetched"));
                            pb.tick();
                        }
                    },
                );
                // The rest of the shard is abandoned; other shards carry on.
                if let Err(e) = result {
                    error!(
                        kind,
                        shard = %shard.name,
                        error = %format!("{e:#}"),
                        "Failed to fetch page"
                    );
                    stats.inc_failed_pages();
                }
            });
        });
    }

    fn write_with(
        &self,
        pool: &ThreadPool,
        graph: &GraphAccumulator,
        output_dir: &Path,
        pb: &ProgressBar,
    ) {
        let tables = graph.tables();
        info!(tables = tables.len(), "Writing tables");
        let stats = graph.stats();

        pool.install(|| {
            tables.par_iter().for_each(|table| {
                let vertices = graph.table_for(table);
                match self.write_table(output_dir, table, &vertices, stats) {
                    Ok(records) => {
                        debug!(table = %table, records, "Table written");
                        stats.inc_tables();
                    }
                    Err(e) => {
                        error!(table = %table, error = %format!("{e:#}"), "Failed to write table");
                        stats.inc_failed_tables();
                    }
                }
                pb.tick();
            });
        });
    }

    /// Writes one table file. A vertex the formatter rejects is skipped; an I/O
    /// error abandons the file. The file is closed on every path.
    fn write_table(
        &self,
        output_dir: &Path,
        table: &str,
        vertices: &VertexTable,
        stats: &DumpStats,
    ) -> Result<u64> {
        let path = table_path(output_dir, table)?;
        let file = File::create(&path)
            .with_context(|| format!("Failed to create table file: {}", path.display()))?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);

        let mut written = 0u64;
        let mut failed = 0u64;
        for entry in vertices.iter() {
            match self.formatter.format(entry.value()) {
                Ok(bytes) => {
                    writer
                        .write_all(&bytes)
                        .and_then(|_| writer.write_all(RECORD_TERMINATOR))
                        .with_context(|| format!("Failed to write vertex to {}", path.display()))?;
                    written += 1;
                }
                Err(e) => {
                    warn!(table, vertex = %entry.key(), error = %e, "Failed to format vertex");
                    failed += 1;
                }
            }
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;

        stats.add_records(written);
        stats.add_format_errors(failed);
        Ok(written)
    }
}

/// Maps a table name to its file, refusing names that would escape the
/// output directory or are not a single plain file name.
fn table_path(output_dir: &Path, table: &str) -> Result<PathBuf> {
    let mut components = Path::new(table).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == table => Ok(output_dir.join(name)),
        _ => bail!("Table name {:?} is not a valid file name", table),
    }
}
