// Memory accounting (/proc/meminfo)

use crate::error::{Result, StatError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::instrument;

/// Memory quantities captured from one read of the memory accounting source.
/// All values are bytes; the source reports kibibytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemorySnapshot {
    pub total: u64,
    pub used: u64,
    pub buffers: u64,
    pub cached: u64,
    pub free: u64,
    pub available: u64,
    pub active: u64,
    pub inactive: u64,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_cached: u64,
    pub swap_free: u64,
    pub mapped: u64,
    pub shmem: u64,
    pub slab: u64,
    pub page_tables: u64,
    pub committed: u64,
    pub vmalloc_used: u64,
    /// `used` was derived from `MemAvailable` rather than free/buffers/cached.
    pub mem_available_enabled: bool,
}

impl MemorySnapshot {
    /// Destination for a recognized label; unknown labels have none.
    fn slot(&mut self, label: &str) -> Option<&mut u64> {
        let slot = match label {
            "MemTotal" => &mut self.total,
            "MemFree" => &mut self.free,
            "MemAvailable" => &mut self.available,
            "Buffers" => &mut self.buffers,
            "Cached" => &mut self.cached,
            "Active" => &mut self.active,
            "Inactive" => &mut self.inactive,
            "SwapCached" => &mut self.swap_cached,
            "SwapTotal" => &mut self.swap_total,
            "SwapFree" => &mut self.swap_free,
            "Mapped" => &mut self.mapped,
            "Shmem" => &mut self.shmem,
            "Slab" => &mut self.slab,
            "PageTables" => &mut self.page_tables,
            "Committed_AS" => &mut self.committed,
            "VmallocUsed" => &mut self.vmalloc_used,
            _ => return None,
        };
        Some(slot)
    }
}

/// Open `path` and parse it. Each call performs one full read; nothing is cached.
#[instrument(skip_all, fields(operation = "read_meminfo", path = %path.display()))]
pub fn read(path: &Path) -> Result<MemorySnapshot> {
    let file = File::open(path)?;
    collect(BufReader::new(file))
}

/// Parse a stream of `Label: value kB` lines.
pub fn collect<R: BufRead>(reader: R) -> Result<MemorySnapshot> {
    let mut memory = MemorySnapshot::default();

    for line in reader.lines() {
        let line = line.map_err(StatError::from_read)?;
        let Some((label, raw)) = line.split_once(':') else {
            continue;
        };
        if label == "MemAvailable" {
            memory.mem_available_enabled = true;
        }
        // Unparsable values keep their zero default.
        if let Some(slot) = memory.slot(label)
            && let Some(bytes) = parse_kib(raw)
        {
            *slot = bytes;
        }
    }

    memory.swap_used = memory.swap_total.wrapping_sub(memory.swap_free);
    memory.used = if memory.mem_available_enabled {
        memory.total.wrapping_sub(memory.available)
    } else {
        memory
            .total
            .wrapping_sub(memory.free)
            .wrapping_sub(memory.buffers)
            .wrapping_sub(memory.cached)
    };
    if memory.used > memory.total || memory.swap_used > memory.swap_total {
        tracing::warn!(
            total = memory.total,
            used = memory.used,
            swap_total = memory.swap_total,
            swap_used = memory.swap_used,
            "inconsistent memory accounting; derived values wrapped"
        );
    }

    Ok(memory)
}

/// `"  16318480 kB"` -> bytes.
fn parse_kib(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let raw = raw.strip_suffix("kB").unwrap_or(raw).trim_end();
    raw.parse::<u64>().ok()?.checked_mul(1024)
}
