// Parsers for kernel-exposed text accounting files

pub mod cpu;
pub mod memory;

pub use cpu::CpuSnapshot;
pub use memory::MemorySnapshot;

/// Default location of the aggregate processor-time accounting file.
pub const DEFAULT_STAT_PATH: &str = "/proc/stat";

/// Default location of the memory accounting file.
pub const DEFAULT_MEMINFO_PATH: &str = "/proc/meminfo";
