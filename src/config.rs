/// Initial capacity of a per-label vertex table
pub const INIT_VERTEX_CAPACITY: usize = 1024;

/// Initial capacity of a vertex's edge list
pub const INIT_VERTEX_EDGES_CAPACITY: usize = 10;

/// Buffer size for table file writers (128KB)
pub const WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// Number of elements per page served by the bundled sources
pub const PAGE_SIZE: usize = 500;

/// Progress update interval (tick every N pages)
pub const PROGRESS_INTERVAL: u64 = 16;

/// Record terminator written after every formatted vertex
pub const RECORD_TERMINATOR: &[u8] = b"\n";
