// Aggregate processor-time accounting (/proc/stat)

use crate::error::{Result, StatError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::instrument;

/// Cumulative counters captured from one read of the processor accounting source.
///
/// Tick counters are totals since boot; this type only records them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
    pub guest: u64,
    pub guest_nice: u64,
    pub procs_running: u64,
    pub procs_blocked: u64,
    /// Sum of the ten tick counters minus `guest` and `guest_nice`.
    pub total: u64,
    /// Lines naming an individual processor (`cpu0`, `cpu1`, ...).
    pub cpu_count: u32,
    /// Numeric fields present on the aggregate line.
    pub stat_count: usize,
}

impl CpuSnapshot {
    /// Positional layout of the aggregate line, in kernel order.
    fn slots(&mut self) -> [(&'static str, &mut u64); 12] {
        [
            ("user", &mut self.user),
            ("nice", &mut self.nice),
            ("system", &mut self.system),
            ("idle", &mut self.idle),
            ("iowait", &mut self.iowait),
            ("irq", &mut self.irq),
            ("softirq", &mut self.softirq),
            ("steal", &mut self.steal),
            ("guest", &mut self.guest),
            ("guest_nice", &mut self.guest_nice),
            ("procs_running", &mut self.procs_running),
            ("procs_blocked", &mut self.procs_blocked),
        ]
    }

    fn ticks(&self) -> [u64; 10] {
        [
            self.user,
            self.nice,
            self.system,
            self.idle,
            self.iowait,
            self.irq,
            self.softirq,
            self.steal,
            self.guest,
            self.guest_nice,
        ]
    }
}

/// Open `path` and parse it. Each call performs one full read; nothing is cached.
#[instrument(skip_all, fields(operation = "read_cpu_stat", path = %path.display()))]
pub fn read(path: &Path) -> Result<CpuSnapshot> {
    let file = File::open(path)?;
    collect(BufReader::new(file))
}

/// Parse a stream shaped like `/proc/stat`.
pub fn collect<R: BufRead>(reader: R) -> Result<CpuSnapshot> {
    let mut lines = reader.lines();
    let first = match lines.next() {
        Some(line) => line.map_err(StatError::from_read)?,
        None => return Err(StatError::Format("no data".into())),
    };

    let mut fields = first.split_whitespace();
    match fields.next() {
        Some("cpu") => {}
        Some(label) => {
            return Err(StatError::Format(format!(
                "expected aggregate cpu line, found `{label}`"
            )));
        }
        None => return Err(StatError::Format("no data".into())),
    }

    let values: Vec<&str> = fields.collect();
    let mut cpu = CpuSnapshot {
        stat_count: values.len(),
        ..Default::default()
    };
    // Older kernels expose fewer fields; anything past the known layout is ignored.
    for ((field, slot), raw) in cpu.slots().into_iter().zip(values) {
        *slot = raw.parse().map_err(|_| StatError::Parse {
            field,
            value: raw.to_string(),
        })?;
    }

    // guest and guest_nice are already accounted in user and nice.
    // https://github.com/torvalds/linux/blob/4ec9f7a18/kernel/sched/cputime.c#L151-L158
    cpu.total = cpu
        .ticks()
        .into_iter()
        .fold(0u64, u64::saturating_add)
        .saturating_sub(cpu.guest)
        .saturating_sub(cpu.guest_nice);

    for line in lines {
        let line = line.map_err(StatError::from_read)?;
        let mut parts = line.split_whitespace();
        let Some(label) = parts.next() else {
            continue;
        };
        if is_per_cpu_label(label) {
            cpu.cpu_count += 1;
            continue;
        }
        let slot = match label {
            "procs_running" => &mut cpu.procs_running,
            "procs_blocked" => &mut cpu.procs_blocked,
            _ => continue,
        };
        if let Some(v) = parts.next().and_then(|s| s.parse().ok()) {
            *slot = v;
        }
    }

    Ok(cpu)
}

fn is_per_cpu_label(label: &str) -> bool {
    label
        .strip_prefix("cpu")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}
