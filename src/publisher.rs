// Consumer of the sampler hand-off: logs each record, keeps the latest for
// GET /api/metrics and re-broadcasts it to /ws/metrics clients.
// Drains promptly so slow HTTP clients never stall sampling.

use crate::models::DerivedMetrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Duration, Instant, interval};

/// Rate limit for "no receivers" message (avoid logging every tick when no one is on /ws/metrics)
const NO_RECEIVERS_LOG_INTERVAL: Duration = Duration::from_secs(60);

pub struct PublisherDeps {
    pub rx: mpsc::Receiver<DerivedMetrics>,
    pub latest_tx: watch::Sender<Option<DerivedMetrics>>,
    pub broadcast_tx: broadcast::Sender<DerivedMetrics>,
    pub ws_connections: Arc<AtomicUsize>,
}

/// Spawns the consumer. Exits when the sampler drops its sender; returns records received.
pub fn spawn(deps: PublisherDeps, stats_log_interval: Duration) -> tokio::task::JoinHandle<u64> {
    let PublisherDeps {
        mut rx,
        latest_tx,
        broadcast_tx,
        ws_connections,
    } = deps;

    tokio::spawn(async move {
        let mut records_received: u64 = 0;
        let mut last_no_receivers_log: Option<Instant> = None;
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some(record) = received else {
                        break;
                    };
                    records_received += 1;
                    tracing::debug!(
                        timestamp = record.timestamp,
                        cpu_used_percent = record.cpu.used_percent,
                        cpu_interval_used_percent = record.cpu.interval_used_percent,
                        memory_used_mb = record.memory.used,
                        memory_total_mb = record.memory.total,
                        disks = record.disks.len(),
                        "metrics"
                    );
                    latest_tx.send_replace(Some(record.clone()));
                    if broadcast_tx.send(record).is_err() {
                        let should_log = last_no_receivers_log
                            .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_LOG_INTERVAL);
                        if should_log {
                            tracing::debug!(
                                operation = "broadcast_metrics",
                                "No active WebSocket clients; broadcast channel has no receivers"
                            );
                            last_no_receivers_log = Some(Instant::now());
                        }
                    }
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ws_metrics_clients = ws_connections.load(Ordering::Relaxed),
                        records_received,
                        "app stats"
                    );
                }
            }
        }
        tracing::debug!(records_received, "Publisher shutting down");
        records_received
    })
}
