use mock_service::{run, tps_measure_task, Hits};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "mock_service=info".into()),
        )
        .init();

    let hits = Hits::default();
    tokio::task::spawn(tps_measure_task(hits.clone()));

    let addr: SocketAddr = "0.0.0.0:3000".parse()?;
    run(addr, hits).await
}
