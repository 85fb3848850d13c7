use crate::config::PAGE_SIZE;
use crate::models::{RawEdge, RawVertex};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A slice of the graph that can be paged independently of the others.
/// `start`/`end` are interpreted by the source that produced the shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub name: String,
    pub start: u64,
    pub end: u64,
}

/// One page of elements plus the token of the following page, if any
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Paginated access to the vertices and edges of a graph store.
///
/// Shards are fetched concurrently from worker threads; pages within a shard
/// are fetched in order, each call receiving the token of the previous page.
pub trait GraphSource: Send + Sync {
    fn vertex_shards(&self) -> Result<Vec<Shard>>;

    fn edge_shards(&self) -> Result<Vec<Shard>>;

    fn fetch_vertices(&self, shard: &Shard, page: Option<&str>) -> Result<Page<RawVertex>>;

    fn fetch_edges(&self, shard: &Shard, page: Option<&str>) -> Result<Page<RawEdge>>;
}

/// Serves an in-memory graph in fixed-size pages
pub struct MemorySource {
    vertices: Vec<RawVertex>,
    edges: Vec<RawEdge>,
    page_size: usize,
    shard_count: usize,
}

impl MemorySource {
    pub fn new(vertices: Vec<RawVertex>, edges: Vec<RawEdge>) -> Self {
        Self {
            vertices,
            edges,
            page_size: PAGE_SIZE,
            shard_count: 1,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count.max(1);
        self
    }

    fn shards(&self, kind: &str, len: usize) -> Vec<Shard> {
        if len == 0 {
            return Vec::new();
        }
        let per_shard = len.div_ceil(self.shard_count);
        (0..len)
            .step_by(per_shard)
            .map(|start| {
                let end = (start + per_shard).min(len);
                Shard {
                    name: format!("{kind}[{start}..{end}]"),
                    start: start as u64,
                    end: end as u64,
                }
            })
            .collect()
    }

    fn page<T: Clone>(&self, items: &[T], shard: &Shard, token: Option<&str>) -> Result<Page<T>> {
        let start = match token {
            Some(token) => token
                .parse::<usize>()
                .with_context(|| format!("Invalid page token {:?} for {}", token, shard.name))?,
            None => shard.start as usize,
        };
        let end = (shard.end as usize).min(items.len());
        let stop = start.saturating_add(self.page_size).min(end);
        let page = items
            .get(start..stop)
            .with_context(|| format!("Page {}..{} out of range for {}", start, stop, shard.name))?;

        Ok(Page {
            items: page.to_vec(),
            next: (stop < end).then(|| stop.to_string()),
        })
    }
}

impl GraphSource for MemorySource {
    fn vertex_shards(&self) -> Result<Vec<Shard>> {
        Ok(self.shards("vertices", self.vertices.len()))
    }

    fn edge_shards(&self) -> Result<Vec<Shard>> {
        Ok(self.shards("edges", self.edges.len()))
    }

    fn fetch_vertices(&self, shard: &Shard, page: Option<&str>) -> Result<Page<RawVertex>> {
        self.page(&self.vertices, shard, page)
    }

    fn fetch_edges(&self, shard: &Shard, page: Option<&str>) -> Result<Page<RawEdge>> {
        self.page(&self.edges, shard, page)
    }
}

/// Reads newline-delimited JSON exports from a directory.
///
/// Every `vertices*.jsonl` file is a vertex shard and every `edges*.jsonl` file
/// an edge shard. Page tokens are byte offsets into the shard's file.
pub struct JsonlSource {
    dir: PathBuf,
    page_size: usize,
}

impl JsonlSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn shards(&self, prefix: &str) -> Result<Vec<Shard>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read input directory: {}", self.dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let matches = path.is_file()
                && path.extension().is_some_and(|ext| ext == "jsonl")
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(prefix));
            if matches {
                files.push(path);
            }
        }
        files.sort();

        debug!(prefix, files = files.len(), "Discovered input shards");
        Ok(files
            .into_iter()
            .map(|path| Shard {
                name: path.to_string_lossy().to_string(),
                start: 0,
                end: u64::MAX,
            })
            .collect())
    }

    fn page<T: DeserializeOwned>(&self, shard: &Shard, token: Option<&str>) -> Result<Page<T>> {
        let path = Path::new(&shard.name);
        let offset = match token {
            Some(token) => token
                .parse::<u64>()
                .with_context(|| format!("Invalid page token {:?} for {}", token, shard.name))?,
            None => shard.start,
        };

        let mut file =
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::new(file);

        let mut items = Vec::with_capacity(self.page_size);
        let mut line = String::new();
        let mut pos = offset;
        while items.len() < self.page_size {
            line.clear();
            let read = reader.read_line(&mut line)?;
            if read == 0 {
                return Ok(Page { items, next: None });
            }
            let line_start = pos;
            pos += read as u64;

            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            let item = serde_json::from_str(text).with_context(|| {
                format!(
                    "Invalid element at byte {} of {}",
                    line_start,
                    path.display()
                )
            })?;
            items.push(item);
        }

        let more = !reader.fill_buf()?.is_empty();
        Ok(Page {
            items,
            next: more.then(|| pos.to_string()),
        })
    }
}

impl GraphSource for JsonlSource {
    fn vertex_shards(&self) -> Result<Vec<Shard>> {
        self.shards("vertices")
    }

    fn edge_shards(&self) -> Result<Vec<Shard>> {
        self.shards("edges")
    }

    fn fetch_vertices(&self, shard: &Shard, page: Option<&str>) -> Result<Page<RawVertex>> {
        self.page(shard, page)
    }

    fn fetch_edges(&self, shard: &Shard, page: Option<&str>) -> Result<Page<RawEdge>> {
        self.page(shard, page)
    }
}

/// Drains every page of a shard, handing each page to `sink`.
/// Returns the number of pages read.
pub fn for_each_page<T, F, S>(shard: &Shard, mut fetch: F, mut sink: S) -> Result<u64>
where
    F: FnMut(&Shard, Option<&str>) -> Result<Page<T>>,
    S: FnMut(Vec<T>),
{
    let mut token: Option<String> = None;
    let mut pages = 0u64;
    loop {
        let page = fetch(shard, token.as_deref())?;
        pages += 1;
        sink(page.items);
        match page.next {
            Some(next) if token.as_deref() == Some(next.as_str()) => {
                bail!("Source returned the same page token twice for {}", shard.name)
            }
            Some(next) => token = Some(next),
            None => return Ok(pages),
        }
    }
}
