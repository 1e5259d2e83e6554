use pacer_core::RunResults;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Serialize)]
struct Dump<'a> {
    results: Vec<Entry<'a>>,
    issued: u64,
    late_ticks: u64,
    errors: u64,
}

/// Latencies are integer nanoseconds.
#[derive(Serialize)]
struct Entry<'a> {
    url: &'a str,
    connect_latency: u64,
    request_latency: u64,
    success: bool,
    status: u16,
}

/// Writes every recorded outcome to `path` as JSON.
pub fn write(path: &Path, urls: &[String], results: &RunResults) -> anyhow::Result<()> {
    let dump = Dump {
        results: results
            .outcomes
            .iter()
            .map(|o| Entry {
                url: &urls[o.url_index],
                connect_latency: o.connect_latency.as_nanos() as u64,
                request_latency: o.response_latency.as_nanos() as u64,
                success: o.success,
                status: o.status,
            })
            .collect(),
        issued: results.issued,
        late_ticks: results.late_ticks,
        errors: results.errored(),
    };

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &dump)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}
