// Published metric records

mod disk;
mod metrics;

pub use disk::DiskStat;
pub use metrics::{CpuMetrics, DerivedMetrics, MemoryMetrics};
