use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::broadcast::{Envelope, SyncBroadcast};
use super::crash::detect;
use super::error::PipelineError;
use super::flatten::{flatten, Measurement};
use super::merge::merge;
use super::stats::{PipelineStats, StatsSnapshot};
use crate::config::Config;
use crate::sink::{AppendWriter, CollisionSink, CrashSink, RawSink};
use crate::source::{PollSchedule, Poller, Snapshot};

/// Running pipeline: pollers, flattener, the three consumers and the writer.
pub struct Pipeline {
    stop_tx: watch::Sender<bool>,
    pollers: Vec<JoinHandle<()>>,
    downstream: Vec<(&'static str, JoinHandle<()>)>,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    /// Spawn every task. Must be called from within a tokio runtime.
    pub fn start(config: &Config) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.source.request_timeout)
            .build()?;
        let stats = Arc::new(PipelineStats::default());

        let (writer, writer_join) = AppendWriter::spawn(
            config.results.root.clone(),
            config.results.max_open_files,
        );

        let capacity = config.pipeline.consumer_buffer;
        let mut broadcast = SyncBroadcast::new();
        let raw_rx = broadcast.subscribe("raw", capacity);
        let crash_rx = broadcast.subscribe("crash", capacity);
        let collision_rx = broadcast.subscribe("collision", capacity);

        let mut downstream = vec![
            (
                "raw",
                tokio::spawn(run_raw(raw_rx, RawSink::new(writer.clone()), stats.clone())),
            ),
            (
                "crash",
                tokio::spawn(run_crash(
                    crash_rx,
                    CrashSink::new(writer.clone()),
                    stats.clone(),
                )),
            ),
            (
                "collision",
                tokio::spawn(run_collision(
                    collision_rx,
                    CollisionSink::new(writer),
                    stats.clone(),
                )),
            ),
        ];

        let schedule = PollSchedule {
            initial_delay: config.source.initial_delay,
            period: config.source.period,
        };
        let pollers = (0..config.source.channels)
            .map(|channel| {
                Poller::new(
                    channel,
                    config.channel_url(channel),
                    client.clone(),
                    schedule,
                )
            })
            .collect();

        let (stop_tx, _) = watch::channel(false);
        let (merged, poller_handles) =
            merge(pollers, config.pipeline.merge_buffer, &stop_tx, &stats);

        // Upstream first so shutdown drains in order: flattener, consumers, writer.
        downstream.insert(
            0,
            (
                "flatten",
                tokio::spawn(run_flatten(merged, broadcast, stats.clone())),
            ),
        );
        downstream.push(("writer", writer_join));

        info!(
            "Pipeline started: {} channels, results in {}",
            config.source.channels,
            config.results.root.display()
        );

        Ok(Self {
            stop_tx,
            pollers: poller_handles,
            downstream,
            stats,
        })
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stop polling, then let every queued measurement reach the sinks.
    pub async fn stop(self) -> StatsSnapshot {
        let _ = self.stop_tx.send(true);

        for handle in self.pollers {
            if let Err(e) = handle.await {
                error!("Poller task failed: {}", e);
            }
        }
        for (name, handle) in self.downstream {
            if let Err(e) = handle.await {
                error!("{} task failed: {}", name, e);
            }
        }

        let stats = self.stats.snapshot();
        info!(
            "Pipeline stopped: {} snapshots, {} failed polls, {} measurements, {} crash alerts, {} write failures",
            stats.snapshots,
            stats.failed_polls,
            stats.measurements,
            stats.crash_alerts,
            stats.write_failures
        );
        stats
    }
}

async fn run_flatten(
    mut rx: mpsc::Receiver<Snapshot>,
    broadcast: SyncBroadcast<Measurement>,
    stats: Arc<PipelineStats>,
) {
    while let Some(snapshot) = rx.recv().await {
        for measurement in flatten(&snapshot) {
            stats.record_measurement();
            if let Err(e) = broadcast.send(measurement).await {
                error!("Stopping flattener: {}", e);
                return;
            }
        }
    }
    debug!("Flattener drained");
}

async fn run_raw(
    mut rx: mpsc::Receiver<Envelope<Measurement>>,
    sink: RawSink,
    stats: Arc<PipelineStats>,
) {
    while let Some(envelope) = rx.recv().await {
        let (measurement, ack) = envelope.into_parts();
        match sink.append(&measurement).await {
            Ok(()) => stats.record_raw_line(),
            Err(e) => {
                error!("Raw write failed for {}: {}", measurement.satellite_id, e);
                stats.record_write_failures(1);
            }
        }
        ack.done();
    }
}

async fn run_crash(
    mut rx: mpsc::Receiver<Envelope<Measurement>>,
    sink: CrashSink,
    stats: Arc<PipelineStats>,
) {
    while let Some(envelope) = rx.recv().await {
        let (measurement, ack) = envelope.into_parts();
        if let Some(alert) = detect(&measurement) {
            stats.record_crash_alert();
            info!(
                "Satellite {} below atmosphere at ({}, {})",
                alert.satellite_id, alert.coordinate.latitude, alert.coordinate.longitude
            );
            match sink.append(&alert).await {
                Ok(()) => stats.record_crash_line(),
                Err(e) => {
                    error!("Crash write failed for {}: {}", alert.satellite_id, e);
                    stats.record_write_failures(1);
                }
            }
        }
        ack.done();
    }
}

async fn run_collision(
    mut rx: mpsc::Receiver<Envelope<Measurement>>,
    sink: CollisionSink,
    stats: Arc<PipelineStats>,
) {
    while let Some(envelope) = rx.recv().await {
        let (measurement, ack) = envelope.into_parts();
        let outcome = sink.append(&measurement).await;
        stats.record_collision_lines(outcome.written as u64);
        if let Some(first) = outcome.errors.first() {
            error!(
                "{} bucket writes failed for {}: {}",
                outcome.errors.len(),
                measurement.satellite_id,
                first
            );
            stats.record_write_failures(outcome.errors.len() as u64);
        }
        ack.done();
    }
}
