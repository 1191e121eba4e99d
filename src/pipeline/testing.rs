//! Stand-in telescope service for poller and pipeline tests.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::task::JoinHandle;

type Respond = dyn Fn(u32, usize) -> Option<String> + Send + Sync;

#[derive(Clone)]
struct MockState {
    respond: Arc<Respond>,
    requests: Arc<Mutex<HashMap<u32, usize>>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

/// Serves `/telescope/{channel}`. The responder receives the channel and a
/// per-channel request counter; `None` answers with a 500.
pub struct MockTelescope {
    addr: SocketAddr,
    requests: Arc<Mutex<HashMap<u32, usize>>>,
    max_in_flight: Arc<AtomicUsize>,
    server: JoinHandle<()>,
}

impl MockTelescope {
    pub async fn start<F>(respond: F) -> Self
    where
        F: Fn(u32, usize) -> Option<String> + Send + Sync + 'static,
    {
        Self::start_slow(Duration::ZERO, respond).await
    }

    /// Like [`MockTelescope::start`], but every response is held back for
    /// `delay`.
    pub async fn start_slow<F>(delay: Duration, respond: F) -> Self
    where
        F: Fn(u32, usize) -> Option<String> + Send + Sync + 'static,
    {
        let requests = Arc::new(Mutex::new(HashMap::new()));
        let max_in_flight = Arc::new(AtomicUsize::new(0));
        let state = MockState {
            respond: Arc::new(respond),
            requests: requests.clone(),
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: max_in_flight.clone(),
        };

        let app = Router::new()
            .route("/telescope/{channel}", get(telescope))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            requests,
            max_in_flight,
            server,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn channel_url(&self, channel: u32) -> String {
        format!("{}/telescope/{}", self.base_url(), channel)
    }

    pub fn requests(&self) -> usize {
        self.requests.lock().unwrap().values().sum()
    }

    /// Highest number of requests the server was handling at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for MockTelescope {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn telescope(
    State(state): State<MockState>,
    Path(channel): Path<u32>,
) -> (StatusCode, String) {
    let seq = {
        let mut requests = state.requests.lock().unwrap();
        let count = requests.entry(channel).or_insert(0);
        let seq = *count;
        *count += 1;
        seq
    };

    let now = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    state.in_flight.fetch_sub(1, Ordering::SeqCst);

    match (state.respond)(channel, seq) {
        Some(body) => (StatusCode::OK, body),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "simulator error".into()),
    }
}

/// A snapshot body for telescope `T{channel}` with `satellites` high-orbit
/// satellites.
pub fn snapshot_json(channel: u32, time: f64, satellites: usize) -> String {
    let satellites: Vec<serde_json::Value> = (0..satellites)
        .map(|i| {
            serde_json::json!({
                "id": format!("S{}_{}", channel, i),
                "altitude": 500_000.0 + i as f64,
                "coordinate": {"latitude": 10.0, "longitude": 20.0},
            })
        })
        .collect();

    serde_json::json!({
        "time": time,
        "telescope": {
            "id": format!("T{}", channel),
            "coordinate": {"latitude": 0.0, "longitude": 0.0},
        },
        "satellites": satellites,
    })
    .to_string()
}

/// Body shaped like the placeholder a failed poll used to produce.
pub fn sentinel_json() -> String {
    serde_json::json!({
        "time": -1,
        "telescope": {"id": "nil", "coordinate": {"latitude": 0, "longitude": 0}},
        "satellites": [],
    })
    .to_string()
}
