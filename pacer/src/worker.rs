use crate::aggregator::Writer;
use crate::error::RequestError;
use crate::http::{read_response, Target};
use pacer_core::RequestOutcome;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::Instant;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Exchange {
    pub connect: Duration,
    pub response: Duration,
    pub status: u16,
}

/// Connects, sends the GET and reads the whole response.
///
/// Connect latency runs from the start of the attempt (name resolution included) to the
/// established connection; response latency from there to the last byte of the body.
pub(crate) async fn exchange(target: &Target) -> Result<Exchange, RequestError> {
    let start = Instant::now();
    let stream = TcpStream::connect(&target.addr)
        .await
        .map_err(|source| RequestError::Connect {
            addr: target.addr.clone(),
            source,
        })?;
    let connected = Instant::now();

    if let Err(err) = stream.set_nodelay(true) {
        debug!("Cannot set TCP_NODELAY for {}: {err}", target.addr);
    }
    let mut stream = BufReader::new(stream);
    stream
        .get_mut()
        .write_all(&target.request)
        .await
        .map_err(RequestError::Write)?;

    let response = read_response(&mut stream).await?;
    let done = Instant::now();
    trace!(
        "{} answered {} with {} body bytes",
        target.addr,
        response.status,
        response.body_len
    );

    Ok(Exchange {
        connect: connected - start,
        response: done - connected,
        status: response.status,
    })
}

/// One scheduled attempt. Never retries and never propagates failure; every path ends in
/// exactly one write to the results sink, after which the writer is released.
pub(crate) async fn attempt(target: &Target, writer: Writer, deadline: Duration) {
    let res = tokio::time::timeout(deadline, exchange(target))
        .await
        .unwrap_or(Err(RequestError::Timeout(deadline)));

    match res {
        Ok(exchange) => {
            let outcome = RequestOutcome::new(
                target.index,
                exchange.connect,
                exchange.response,
                exchange.status,
            );

            if !outcome.success {
                warn!("HTTP error from {}: status {}", target.addr, outcome.status);
            }

            #[cfg(feature = "metrics")]
            record_metrics(&outcome);

            if let Err(err) = writer.record(outcome) {
                error!("Dropping outcome for {}: {err}", target.addr);
            }
        }
        Err(err) => {
            error!("Request to {} failed: {err}", target.addr);

            #[cfg(feature = "metrics")]
            metrics::counter!("pacer.requests.error", "kind" => err.kind().to_string())
                .increment(1);

            if let Err(record_err) = writer.record_error(err.kind()) {
                error!("Dropping error for {}: {record_err}", target.addr);
            }
        }
    }
}

#[cfg(feature = "metrics")]
fn record_metrics(outcome: &RequestOutcome) {
    if outcome.success {
        metrics::counter!("pacer.requests.success").increment(1);
    } else {
        metrics::counter!("pacer.requests.failure").increment(1);
    }

    metrics::histogram!("pacer.latency.connect").record(outcome.connect_latency.as_nanos() as f64);
    metrics::histogram!("pacer.latency.response")
        .record(outcome.response_latency.as_nanos() as f64);
}
