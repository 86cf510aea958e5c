// Disk collaborator: per-device records, opaque to the sampler

use crate::models::DiskStat;
use std::sync::Mutex;
use sysinfo::Disks;
use tracing::instrument;

/// Source of per-device records. Called from a blocking thread once per tick.
pub trait DiskSource: Send + Sync {
    fn disk_stats(&self) -> anyhow::Result<Vec<DiskStat>>;
}

/// Mounted filesystems as reported by `sysinfo`.
pub struct SysinfoDisks {
    disks: Mutex<Disks>,
}

impl Default for SysinfoDisks {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoDisks {
    pub fn new() -> Self {
        Self {
            disks: Mutex::new(Disks::new_with_refreshed_list()),
        }
    }
}

impl DiskSource for SysinfoDisks {
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "disk_stats"))]
    fn disk_stats(&self) -> anyhow::Result<Vec<DiskStat>> {
        let mut disks = self
            .disks
            .lock()
            .map_err(|e| anyhow::anyhow!("sysinfo disks lock poisoned: {}", e))?;
        disks.refresh(true);
        Ok(disks
            .list()
            .iter()
            .map(|d| DiskStat {
                name: d.name().to_string_lossy().into_owned(),
                mount_point: d.mount_point().to_string_lossy().into_owned(),
                file_system: d.file_system().to_string_lossy().into_owned(),
                total_bytes: d.total_space(),
                available_bytes: d.available_space(),
            })
            .collect())
    }
}

/// Used when disk collection is disabled.
pub struct NoDisks;

impl DiskSource for NoDisks {
    fn disk_stats(&self) -> anyhow::Result<Vec<DiskStat>> {
        Ok(Vec::new())
    }
}
