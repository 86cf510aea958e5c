// Derived record built once per sampler tick

use serde::{Deserialize, Serialize};

use super::DiskStat;

/// Memory block, in whole megabytes (floor of bytes / 1 MiB).
/// All-zero with `collected = false` when the memory source failed that tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetrics {
    pub collected: bool,
    pub total: u64,
    pub used: u64,
    pub cached: u64,
    pub buffers: u64,
    pub free: u64,
    pub available: u64,
    pub swap_used: u64,
}

/// CPU block.
///
/// `used_percent`, `idle_percent` and `system_percent` are ratios against the
/// cumulative total since boot, i.e. a long-run average. The `interval_*`
/// fields are the same ratios over the ticks elapsed since the previous
/// successful sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuMetrics {
    pub collected: bool,
    pub used_percent: f64,
    pub idle_percent: f64,
    pub system_percent: f64,
    pub interval_used_percent: f64,
    pub interval_idle_percent: f64,
    pub interval_system_percent: f64,
    pub procs_running: f64,
    pub procs_blocked: f64,
    pub cpu_count: u32,
}

/// One sampler tick, handed off to the consumer and never touched again.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedMetrics {
    /// Unix milliseconds at sampling time.
    pub timestamp: u64,
    pub memory: MemoryMetrics,
    pub cpu: CpuMetrics,
    pub disks: Vec<DiskStat>,
}
