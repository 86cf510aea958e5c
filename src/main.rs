use anyhow::Result;
use procmon::disk_repo::{DiskSource, NoDisks, SysinfoDisks};
use procmon::*;
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{broadcast, watch};
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let (metrics_tx, _) =
        broadcast::channel::<models::DerivedMetrics>(app_config.publishing.broadcast_capacity);
    let (latest_tx, latest_rx) = watch::channel(None);
    let ws_connections = Arc::new(AtomicUsize::new(0));

    let disks: Arc<dyn DiskSource> = if app_config.sampler.collect_disks {
        Arc::new(SysinfoDisks::new())
    } else {
        Arc::new(NoDisks)
    };

    let (sample_tx, sample_rx) = sampler::output_channel();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let sampler_handle = sampler::spawn(
        sampler::SamplerDeps {
            disks,
            tx: sample_tx,
            shutdown_rx,
        },
        app_config.sampler.sampler_config(),
    );
    let publisher_handle = publisher::spawn(
        publisher::PublisherDeps {
            rx: sample_rx,
            latest_tx,
            broadcast_tx: metrics_tx.clone(),
            ws_connections: ws_connections.clone(),
        },
        Duration::from_secs(app_config.monitoring.stats_log_interval_secs),
    );
    tracing::info!(
        interval_secs = app_config.sampler.interval_secs,
        stat_path = %app_config.sampler.stat_path.display(),
        meminfo_path = %app_config.sampler.meminfo_path.display(),
        collect_disks = app_config.sampler.collect_disks,
        "Sampler started"
    );

    let app = routes::app(latest_rx, metrics_tx, ws_connections);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal");
            let _ = shutdown_tx.send(());
            match sampler_handle.await {
                Ok(stats) => tracing::info!(
                    ticks = stats.ticks,
                    delivered = stats.delivered,
                    cpu_failures = stats.cpu_failures,
                    memory_failures = stats.memory_failures,
                    disk_failures = stats.disk_failures,
                    "Sampler stopped"
                ),
                Err(e) => tracing::warn!(error = %e, "sampler task failed"),
            }
            let _ = publisher_handle.await;
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match tokio::signal::unix::signal(
            tokio::signal::unix::SignalKind::terminate(),
        ) {
            Ok(s) => s,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
