use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use reqwest::header::ACCEPT;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::decode::decode_snapshot;
use super::error::PollError;
use super::types::Snapshot;
use crate::pipeline::PipelineStats;

#[derive(Debug, Clone, Copy)]
pub struct PollSchedule {
    pub initial_delay: Duration,
    pub period: Duration,
}

impl PollSchedule {
    /// First tick after `initial_delay`, then every `period`. A tick missed
    /// behind a slow request fires once, and the next is a full period later.
    fn ticker(&self) -> Interval {
        let mut ticker = interval_at(Instant::now() + self.initial_delay, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

/// Periodically fetches snapshots from one telescope channel.
pub struct Poller {
    channel: u32,
    url: String,
    client: reqwest::Client,
    schedule: PollSchedule,
}

impl Poller {
    pub fn new(channel: u32, url: String, client: reqwest::Client, schedule: PollSchedule) -> Self {
        Self {
            channel,
            url,
            client,
            schedule,
        }
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    pub async fn poll_once(&self) -> Result<Snapshot, PollError> {
        let response = self
            .client
            .get(&self.url)
            .header(ACCEPT, "text/*")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(decode_snapshot(&body)?)
    }

    /// Poll until shutdown is signalled or the merge side goes away.
    ///
    /// Ticks that fire while a request is outstanding are delayed rather
    /// than stacked, so a channel never has two requests in flight.
    pub async fn run(
        self,
        tx: mpsc::Sender<Snapshot>,
        mut shutdown: watch::Receiver<bool>,
        stats: Arc<PipelineStats>,
    ) {
        let mut ticker = self.schedule.ticker();

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }

            let snapshot = match self.poll_once().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Channel {} poll failed: {}", self.channel, e);
                    stats.record_failed_poll();
                    continue;
                }
            };

            debug!(
                "Channel {} snapshot at {} with {} satellites",
                self.channel,
                snapshot.time,
                snapshot.satellites.len()
            );
            stats.record_snapshot();

            let sent = tokio::select! {
                res = tx.send(snapshot) => res.is_ok(),
                _ = shutdown.changed() => false,
            };
            if !sent {
                break;
            }
        }

        debug!("Channel {} poller stopped", self.channel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{snapshot_json, MockTelescope};

    fn poller(url: String) -> Poller {
        Poller::new(
            3,
            url,
            reqwest::Client::new(),
            PollSchedule {
                initial_delay: Duration::from_millis(10),
                period: Duration::from_millis(20),
            },
        )
    }

    #[tokio::test]
    async fn poll_once_decodes_response() {
        let mock = MockTelescope::start(|channel, _| Some(snapshot_json(channel, 100.0, 2))).await;
        let snapshot = poller(mock.channel_url(3)).poll_once().await.unwrap();
        assert_eq!(snapshot.telescope.id, "T3");
        assert_eq!(snapshot.satellites.len(), 2);
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mock = MockTelescope::start(|_, _| None).await;
        let err = poller(mock.channel_url(3)).poll_once().await.unwrap_err();
        assert!(matches!(err, PollError::Status(500)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let mock = MockTelescope::start(|_, _| Some("{\"time\": 1}".to_string())).await;
        let err = poller(mock.channel_url(3)).poll_once().await.unwrap_err();
        assert!(matches!(err, PollError::Decode(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let err = poller("http://127.0.0.1:1/telescope/3".into())
            .poll_once()
            .await
            .unwrap_err();
        assert!(matches!(err, PollError::Http(_)));
    }

    #[tokio::test]
    async fn run_keeps_polling_after_failures() {
        let mock = MockTelescope::start(|_, _| None).await;
        let stats = Arc::new(PipelineStats::default());
        let (tx, mut rx) = mpsc::channel(4);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(poller(mock.channel_url(3)).run(tx, stop_rx, stats.clone()));
        tokio::time::sleep(Duration::from_millis(120)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(stats.snapshot().failed_polls >= 2);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn run_forwards_snapshots_in_order() {
        let mock =
            MockTelescope::start(|channel, seq| Some(snapshot_json(channel, seq as f64, 1))).await;
        let stats = Arc::new(PipelineStats::default());
        let (tx, mut rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(poller(mock.channel_url(3)).run(tx, stop_rx, stats.clone()));
        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(first.telescope.id, "T3");
        assert_eq!(second.telescope.id, "T3");
        assert!(first.time < second.time);
        assert!(mock.requests() >= 2);
    }
    #[tokio::test(start_paused = true)]
    async fn ticker_waits_initial_delay_then_period() {
        let schedule = PollSchedule {
            initial_delay: Duration::from_secs(1),
            period: Duration::from_secs(5),
        };
        let start = Instant::now();
        let mut ticker = schedule.ticker();

        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(6));

        // A request that outlasts two periods.
        tokio::time::sleep(Duration::from_secs(12)).await;
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(18));
        ticker.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(23));
    }

    #[tokio::test]
    async fn run_waits_for_initial_delay() {
        let mock =
            MockTelescope::start(|channel, seq| Some(snapshot_json(channel, seq as f64, 1))).await;
        let stats = Arc::new(PipelineStats::default());
        let (tx, mut rx) = mpsc::channel(16);
        let (stop_tx, stop_rx) = watch::channel(false);
        let poller = Poller::new(
            3,
            mock.channel_url(3),
            reqwest::Client::new(),
            PollSchedule {
                initial_delay: Duration::from_millis(300),
                period: Duration::from_millis(20),
            },
        );

        let handle = tokio::spawn(poller.run(tx, stop_rx, stats));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(mock.requests(), 0);

        rx.recv().await.unwrap();
        stop_tx.send(true).unwrap();
        handle.await.unwrap();
        assert!(mock.requests() >= 1);
    }

    #[tokio::test]
    async fn slow_responses_never_overlap() {
        let mock = MockTelescope::start_slow(Duration::from_millis(70), |channel, seq| {
            Some(snapshot_json(channel, seq as f64, 1))
        })
        .await;
        let stats = Arc::new(PipelineStats::default());
        let (tx, mut rx) = mpsc::channel(64);
        let (stop_tx, stop_rx) = watch::channel(false);
        let poller = Poller::new(
            3,
            mock.channel_url(3),
            reqwest::Client::new(),
            PollSchedule {
                initial_delay: Duration::from_millis(1),
                period: Duration::from_millis(10),
            },
        );

        let handle = tokio::spawn(poller.run(tx, stop_rx, stats.clone()));
        tokio::time::sleep(Duration::from_millis(400)).await;
        stop_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(mock.max_in_flight(), 1);
        assert!(mock.requests() >= 3);
        // 400ms of 70ms responses, far fewer than one per 10ms period.
        assert!(mock.requests() <= 7);

        let mut received = 0;
        while rx.recv().await.is_some() {
            received += 1;
        }
        assert!(received >= 2);
        assert!(received as u64 <= stats.snapshot().snapshots);
    }
}
