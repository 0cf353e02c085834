use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use super::Inspection;

const MAX_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
struct CachedEntry {
    inspection: Inspection,
    timestamp: u64,
    file_size: u64,
}

/// Thread-safe in-memory cache of per-file inspections, keyed by path and
/// validated against modification time and size. Lets repeated `build`
/// calls in one process skip unchanged files; a `build` itself never
/// touches the disk beyond reading sources.
pub struct InspectionCache {
    entries: DashMap<PathBuf, CachedEntry>,
}

impl InspectionCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_capacity(MAX_ENTRIES),
        }
    }

    /// Cached inspection for `path` if the file is unchanged since it was
    /// stored.
    pub fn get_fresh(&self, path: &Path) -> Option<Inspection> {
        let (timestamp, file_size) = stat(path)?;
        let entry = self.entries.get(path)?;
        if entry.timestamp == timestamp && entry.file_size == file_size {
            Some(entry.inspection.clone())
        } else {
            None
        }
    }

    /// Record the inspection for `path`. Silently a no-op when the file
    /// cannot be stat'ed or the cache is full.
    pub fn store(&self, path: &Path, inspection: &Inspection) {
        let Some((timestamp, file_size)) = stat(path) else {
            return;
        };
        if self.entries.len() >= MAX_ENTRIES && !self.entries.contains_key(path) {
            return;
        }
        self.entries.insert(
            path.to_path_buf(),
            CachedEntry {
                inspection: inspection.clone(),
                timestamp,
                file_size,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for InspectionCache {
    fn default() -> Self {
        Self::new()
    }
}

fn stat(path: &Path) -> Option<(u64, u64)> {
    let metadata = fs::metadata(path).ok()?;
    let timestamp = metadata
        .modified()
        .ok()?
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    Some((timestamp, metadata.len()))
}
