use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::debug;

/// Per-server request counter.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicU64>);

impl Hits {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Returns the count and resets it to zero.
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

/// A mock service running in the background on an ephemeral port.
pub struct MockService {
    pub addr: SocketAddr,
    pub hits: Hits,
}

impl MockService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn router(hits: Hits) -> Router {
    Router::new()
        .route("/ok", get(ok))
        .route("/status/:code", get(status))
        .route("/delay/ms/:delay_ms", get(delay))
        .layer(TraceLayer::new_for_http())
        .with_state(hits)
}

pub async fn run(addr: SocketAddr, hits: Hits) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(hits)).await?;
    Ok(())
}

/// Binds `127.0.0.1:0` and serves in a background task.
pub async fn spawn() -> anyhow::Result<MockService> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let hits = Hits::default();

    let app = router(hits.clone());
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("Mock service stopped: {err}");
        }
    });

    debug!("Mock service listening on {addr}");
    Ok(MockService { addr, hits })
}

#[debug_handler]
async fn ok(State(hits): State<Hits>) -> &'static str {
    hits.hit();
    "ok"
}

#[debug_handler]
async fn status(
    State(hits): State<Hits>,
    Path(code): Path<u16>,
) -> Result<&'static str, StatusCode> {
    hits.hit();
    match StatusCode::from_u16(code) {
        Ok(code) if code == StatusCode::OK => Ok("ok"),
        Ok(code) => Err(code),
        Err(_) => Err(StatusCode::BAD_REQUEST),
    }
}

#[debug_handler]
async fn delay(State(hits): State<Hits>, Path(delay_ms): Path<u64>) -> &'static str {
    hits.hit();
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    "ok"
}

/** TPS Printer **/

pub async fn tps_measure_task(hits: Hits) {
    loop {
        tokio::time::sleep(Duration::from_millis(1000)).await;
        println!("{} TPS", hits.take());
    }
}
