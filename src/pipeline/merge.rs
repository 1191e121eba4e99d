use std::sync::Arc;

use log::info;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::stats::PipelineStats;
use crate::source::{Poller, Snapshot};

/// Fan the pollers into one stream.
///
/// Every poller owns a clone of the same bounded sender, so each channel's
/// snapshots stay in order while channels interleave freely. The stream ends
/// once all pollers have stopped.
pub fn merge(
    pollers: Vec<Poller>,
    capacity: usize,
    shutdown: &watch::Sender<bool>,
    stats: &Arc<PipelineStats>,
) -> (mpsc::Receiver<Snapshot>, Vec<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel(capacity);

    let handles = pollers
        .into_iter()
        .map(|poller| {
            info!("Starting poller for channel {}", poller.channel());
            tokio::spawn(poller.run(tx.clone(), shutdown.subscribe(), stats.clone()))
        })
        .collect();

    (rx, handles)
}
