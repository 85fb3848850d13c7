//! Graphdump: vertex-centric dumps of a property graph
//!
//! Vertices and edges are pulled page by page from a graph store and folded into
//! a denormalized view where every vertex carries the edges incident to it. The
//! view is then written out as one file per vertex label, one record per line.
//!
//! # Pipeline
//!
//! 1. **Vertex Pass** -- Fetch every vertex shard in parallel and insert each
//!    vertex into the table of its label
//! 2. **Edge Pass** -- Fetch every edge shard in parallel and attach each edge to
//!    both of its endpoints; edges whose endpoints were never seen are dropped
//! 3. **Write Pass** -- Write every table concurrently through the active
//!    [`format::Formatter`]; a failing table never affects the others
//!
//! Each pass joins all of its work before the next starts.
//!
//! # Key Modules
//!
//! - [`graph`] -- Concurrent table-of-tables with edge cross-linking
//! - [`dump`] -- Pass orchestration, table writing and the run summary
//! - [`format`] -- Formatter contract and the default JSON formatter
//! - [`source`] -- Paginated graph sources (in-memory and JSON-lines exports)
//! - [`models`] -- Raw store elements and the vertex/edge records
//! - [`stats`] -- Thread-safe atomic counters for run metrics
//! - [`config`] -- Constants for capacities, buffers and paging
//!
//! # Example Usage
//!
//! ```bash
//! # Dump a JSON-lines export (vertices*.jsonl, edges*.jsonl) to out/
//! graphdump dump -i export/ -o out/ --threads 8
//! ```

pub mod config;
pub mod dump;
pub mod format;
pub mod graph;
pub mod models;
pub mod source;
pub mod stats;

pub use dump::{DumpConfig, DumpGraph, DumpSummary};
pub use format::{FormatError, Formatter, JsonFormatter};
pub use graph::GraphAccumulator;
