// Sampler loop: read the kernel accounting sources every tick, derive metrics,
// hand one record to the consumer. Fixed delay between ticks, one record in flight.

use crate::disk_repo::{DiskSource, SysinfoDisks};
use crate::error::StatError;
use crate::models::{CpuMetrics, DerivedMetrics, DiskStat, MemoryMetrics};
use crate::procfs::{self, CpuSnapshot, MemorySnapshot};
use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Duration, Instant, sleep};
use tracing::Instrument;

/// Rate limit for repeated "source failed" warnings while a source stays broken.
const FAILURE_WARN_INTERVAL: Duration = Duration::from_secs(60);

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Single-slot hand-off: at most one record waits for the consumer.
pub fn output_channel() -> (mpsc::Sender<DerivedMetrics>, mpsc::Receiver<DerivedMetrics>) {
    mpsc::channel(1)
}

/// Collaborators, output and shutdown for the sampler.
pub struct SamplerDeps {
    pub disks: Arc<dyn DiskSource>,
    pub tx: mpsc::Sender<DerivedMetrics>,
    /// Resolving (or dropping the sender) stops the loop at its next suspension point.
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub struct SamplerConfig {
    /// Delay between the end of one delivery and the next sample.
    pub interval: Duration,
    pub stat_path: PathBuf,
    pub meminfo_path: PathBuf,
}

impl SamplerConfig {
    /// Default `/proc` sources with the given interval.
    pub fn with_interval_secs(interval_secs: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval_secs),
            stat_path: PathBuf::from(procfs::DEFAULT_STAT_PATH),
            meminfo_path: PathBuf::from(procfs::DEFAULT_MEMINFO_PATH),
        }
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplerStats {
    pub ticks: u64,
    pub delivered: u64,
    pub cpu_failures: u64,
    pub memory_failures: u64,
    pub disk_failures: u64,
}

/// Sample forever with the default sources, one record per `interval_seconds`
/// into `tx`. Returns only on shutdown or when the consumer goes away.
pub async fn start(
    interval_seconds: u64,
    tx: mpsc::Sender<DerivedMetrics>,
    shutdown_rx: oneshot::Receiver<()>,
) -> SamplerStats {
    run(
        SamplerDeps {
            disks: Arc::new(SysinfoDisks::new()),
            tx,
            shutdown_rx,
        },
        SamplerConfig::with_interval_secs(interval_seconds),
    )
    .await
}

/// Spawns the sampler on its own task.
pub fn spawn(deps: SamplerDeps, config: SamplerConfig) -> tokio::task::JoinHandle<SamplerStats> {
    let span = tracing::debug_span!(
        "sampler",
        interval_ms = config.interval.as_millis() as u64
    );
    tokio::spawn(run(deps, config).instrument(span))
}

/// Runs the loop on the current task until shutdown.
pub async fn run(deps: SamplerDeps, config: SamplerConfig) -> SamplerStats {
    let SamplerDeps {
        disks,
        tx,
        mut shutdown_rx,
    } = deps;
    let interval = config.interval;
    let mut sampler = Sampler::new(disks, config);

    loop {
        tokio::select! {
            _ = sleep(interval) => {}
            _ = &mut shutdown_rx => {
                tracing::debug!("Sampler shutting down");
                break;
            }
        }

        let record = sampler.tick().await;

        tokio::select! {
            sent = tx.send(record) => {
                if sent.is_err() {
                    tracing::debug!("Metrics consumer closed; sampler stopping");
                    break;
                }
                sampler.stats.delivered += 1;
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("Sampler shutting down while waiting for consumer");
                break;
            }
        }
    }

    tracing::debug!(
        ticks = sampler.stats.ticks,
        delivered = sampler.stats.delivered,
        "Sampler stopped"
    );
    sampler.stats
}

/// Loop state carried between ticks. Only the previous CPU snapshot survives a
/// tick, for the interval percentages; every tick re-reads both sources.
struct Sampler {
    disks: Arc<dyn DiskSource>,
    config: SamplerConfig,
    previous_cpu: Option<CpuSnapshot>,
    cpu_health: SourceHealth,
    memory_health: SourceHealth,
    disk_health: SourceHealth,
    stats: SamplerStats,
}

impl Sampler {
    fn new(disks: Arc<dyn DiskSource>, config: SamplerConfig) -> Self {
        Self {
            disks,
            config,
            previous_cpu: None,
            cpu_health: SourceHealth::new("read_cpu_stat"),
            memory_health: SourceHealth::new("read_meminfo"),
            disk_health: SourceHealth::new("disk_stats"),
            stats: SamplerStats::default(),
        }
    }

    async fn tick(&mut self) -> DerivedMetrics {
        self.stats.ticks += 1;
        let timestamp = unix_millis();

        let stat_path = self.config.stat_path.clone();
        let meminfo_path = self.config.meminfo_path.clone();
        let disks = self.disks.clone();
        let (cpu, memory, disk_list) = tokio::join!(
            blocking(move || procfs::cpu::read(&stat_path)),
            blocking(move || procfs::memory::read(&meminfo_path)),
            async move {
                tokio::task::spawn_blocking(move || disks.disk_stats())
                    .await
                    .unwrap_or_else(|e| Err(anyhow::anyhow!("disk task join: {}", e)))
            },
        );

        let cpu = match cpu {
            Ok(snapshot) => {
                self.cpu_health.succeeded();
                let metrics = derive_cpu(&snapshot, self.previous_cpu.as_ref());
                self.previous_cpu = Some(snapshot);
                metrics
            }
            Err(e) => {
                self.stats.cpu_failures += 1;
                self.cpu_health.failed(&e);
                self.previous_cpu = None;
                CpuMetrics::default()
            }
        };

        let memory = match memory {
            Ok(snapshot) => {
                self.memory_health.succeeded();
                derive_memory(&snapshot)
            }
            Err(e) => {
                self.stats.memory_failures += 1;
                self.memory_health.failed(&e);
                MemoryMetrics::default()
            }
        };

        let disks: Vec<DiskStat> = match disk_list {
            Ok(list) => {
                self.disk_health.succeeded();
                list
            }
            Err(e) => {
                self.stats.disk_failures += 1;
                self.disk_health.failed(&e);
                Vec::new()
            }
        };

        tracing::debug!(
            tick = self.stats.ticks,
            cpu_collected = cpu.collected,
            memory_collected = memory.collected,
            disks = disks.len(),
            "sampled"
        );

        DerivedMetrics {
            timestamp,
            memory,
            cpu,
            disks,
        }
    }
}

/// Run a parser on the blocking pool; a panicked parser counts as an I/O failure.
async fn blocking<T, F>(f: F) -> Result<T, StatError>
where
    F: FnOnce() -> Result<T, StatError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .unwrap_or_else(|e| Err(StatError::Io(std::io::Error::other(e))))
}

/// Tracks one metric family so a persistently broken source warns once a minute, not every tick.
struct SourceHealth {
    operation: &'static str,
    failing: bool,
    last_warn: Option<Instant>,
}

impl SourceHealth {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            failing: false,
            last_warn: None,
        }
    }

    fn failed(&mut self, error: &dyn Display) {
        self.failing = true;
        let should_warn = self
            .last_warn
            .is_none_or(|t| t.elapsed() >= FAILURE_WARN_INTERVAL);
        if should_warn {
            tracing::warn!(
                error = %error,
                operation = self.operation,
                "source failed; reporting zeroed metrics"
            );
            self.last_warn = Some(Instant::now());
        }
    }

    fn succeeded(&mut self) {
        if self.failing {
            tracing::info!(operation = self.operation, "source recovered");
        }
        self.failing = false;
        self.last_warn = None;
    }
}

fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                operation = "get_timestamp",
                "system time error"
            );
            0
        })
}

/// `part / total * 100`, or 0 when `total` is 0.
pub fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Floor division to whole megabytes.
pub fn bytes_to_mb(bytes: u64) -> u64 {
    bytes / BYTES_PER_MB
}

/// CPU block from a snapshot. Lifetime percentages use the cumulative total;
/// interval percentages use the difference against `previous`, if any.
pub fn derive_cpu(cpu: &CpuSnapshot, previous: Option<&CpuSnapshot>) -> CpuMetrics {
    let (interval_used_percent, interval_idle_percent, interval_system_percent) = match previous {
        Some(prev) => {
            let total = cpu.total.saturating_sub(prev.total);
            (
                percent(cpu.user.saturating_sub(prev.user), total),
                percent(cpu.idle.saturating_sub(prev.idle), total),
                percent(cpu.system.saturating_sub(prev.system), total),
            )
        }
        None => (0.0, 0.0, 0.0),
    };

    CpuMetrics {
        collected: true,
        used_percent: percent(cpu.user, cpu.total),
        idle_percent: percent(cpu.idle, cpu.total),
        system_percent: percent(cpu.system, cpu.total),
        interval_used_percent,
        interval_idle_percent,
        interval_system_percent,
        procs_running: cpu.procs_running as f64,
        procs_blocked: cpu.procs_blocked as f64,
        cpu_count: cpu.cpu_count,
    }
}

pub fn derive_memory(memory: &MemorySnapshot) -> MemoryMetrics {
    MemoryMetrics {
        collected: true,
        total: bytes_to_mb(memory.total),
        used: bytes_to_mb(memory.used),
        cached: bytes_to_mb(memory.cached),
        buffers: bytes_to_mb(memory.buffers),
        free: bytes_to_mb(memory.free),
        available: bytes_to_mb(memory.available),
        swap_used: bytes_to_mb(memory.swap_used),
    }
}
