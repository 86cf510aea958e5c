// Shared test helpers: /proc-shaped fixtures written to a temp dir

#![allow(dead_code)]

use procmon::disk_repo::NoDisks;
use procmon::models::DerivedMetrics;
use procmon::sampler::{SamplerConfig, SamplerDeps, SamplerStats};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// Four processors, procs_* on their own lines, guest time present.
pub const STAT_FIXTURE: &str = "\
cpu  10132153 290696 3084719 46828483 16683 0 25195 0 175628 0
cpu0 1393280 32966 572056 13343292 6130 0 17875 0 23933 0
cpu1 1335678 34041 518470 13372834 2933 0 3290 0 47560 0
cpu2 1283734 59437 501498 13447311 3577 0 1762 0 48061 0
cpu3 1271612 55752 493612 13457125 4043 0 2268 0 56074 0
intr 114930548 113199788 3 0 5 263 0 4 [... lots more numbers ...]
ctxt 1990473
btime 1062191376
processes 2915
procs_running 3
procs_blocked 1
softirq 183433 0 21755 12 39 1137 231 21459 2263
";

/// Sum of the ten tick fields of STAT_FIXTURE's aggregate line minus guest and guest_nice.
pub const STAT_FIXTURE_TOTAL: u64 =
    10132153 + 290696 + 3084719 + 46828483 + 16683 + 25195;

pub const MEMINFO_FIXTURE: &str = "\
MemTotal:       16318480 kB
MemFree:         1230992 kB
MemAvailable:    9803148 kB
Buffers:          532664 kB
Cached:          7800540 kB
SwapCached:         1024 kB
Active:          8214316 kB
Inactive:        5317964 kB
SwapTotal:       2097148 kB
SwapFree:        2096124 kB
Dirty:               412 kB
Mapped:           903812 kB
Shmem:            615872 kB
Slab:             738412 kB
PageTables:        54844 kB
Committed_AS:   12931592 kB
VmallocUsed:       38356 kB
HugePages_Total:       0
Hugepagesize:       2048 kB
";

pub struct ProcDir {
    pub dir: TempDir,
    pub stat_path: PathBuf,
    pub meminfo_path: PathBuf,
}

impl ProcDir {
    pub fn new(stat: &str, meminfo: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let stat_path = dir.path().join("stat");
        let meminfo_path = dir.path().join("meminfo");
        std::fs::write(&stat_path, stat).unwrap();
        std::fs::write(&meminfo_path, meminfo).unwrap();
        Self {
            dir,
            stat_path,
            meminfo_path,
        }
    }

    pub fn missing(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn config(&self, interval: Duration) -> SamplerConfig {
        SamplerConfig {
            interval,
            stat_path: self.stat_path.clone(),
            meminfo_path: self.meminfo_path.clone(),
        }
    }
}

/// Replace a fixture file atomically so the sampler never sees a partial write.
pub fn replace_file(path: &Path, contents: &str) {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents).unwrap();
    std::fs::rename(&tmp, path).unwrap();
}

pub struct RunningSampler {
    pub rx: mpsc::Receiver<DerivedMetrics>,
    pub shutdown_tx: oneshot::Sender<()>,
    pub handle: JoinHandle<SamplerStats>,
}

pub fn spawn_sampler(config: SamplerConfig) -> RunningSampler {
    let (tx, rx) = procmon::sampler::output_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle = procmon::sampler::spawn(
        SamplerDeps {
            disks: Arc::new(NoDisks),
            tx,
            shutdown_rx,
        },
        config,
    );
    RunningSampler {
        rx,
        shutdown_tx,
        handle,
    }
}

pub async fn recv_within(rx: &mut mpsc::Receiver<DerivedMetrics>, secs: u64) -> DerivedMetrics {
    tokio::time::timeout(Duration::from_secs(secs), rx.recv())
        .await
        .expect("timed out waiting for a record")
        .expect("sampler closed the channel")
}
