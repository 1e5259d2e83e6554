//! Minimal HTTP/1.1 client side: one GET with `Connection: close`, one response read in full.
use crate::error::RequestError;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use url::{Host, Url};

const MAX_LINE_LEN: u64 = 16 * 1024;
const MAX_HEADERS: usize = 128;
const USER_AGENT: &str = concat!("pacer/", env!("CARGO_PKG_VERSION"));

/// Where and what to send for one target URL. Built once per URL before the run starts.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub index: usize,
    /// `host:port` suitable for `TcpStream::connect`.
    pub addr: String,
    pub request: Vec<u8>,
}

impl Target {
    pub fn new(index: usize, url: &Url) -> Self {
        let port = url.port_or_known_default().unwrap_or(80);
        let addr = match url.host() {
            Some(Host::Ipv6(ip)) => format!("[{ip}]:{port}"),
            Some(host) => format!("{host}:{port}"),
            None => format!("localhost:{port}"),
        };

        Self {
            index,
            addr,
            request: build_request(url),
        }
    }
}

pub(crate) fn build_request(url: &Url) -> Vec<u8> {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let host = url.host_str().unwrap_or_default();
    let host = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    format!(
        "GET {target} HTTP/1.1\r\nHost: {host}\r\nUser-Agent: {USER_AGENT}\r\nAccept: */*\r\nConnection: close\r\n\r\n"
    )
    .into_bytes()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Response {
    pub status: u16,
    pub body_len: u64,
}

/// Reads one full response, body included.
pub(crate) async fn read_response<R>(reader: &mut R) -> Result<Response, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let status_line = read_line(reader).await?;
    let status = parse_status_line(&status_line)?;

    let mut content_length = None;
    let mut chunked = false;
    let mut header_count = 0;
    loop {
        let line = read_line(reader).await?;
        if line.is_empty() {
            break;
        }

        header_count += 1;
        if header_count > MAX_HEADERS {
            return Err(RequestError::Malformed("too many headers".into()));
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| RequestError::Malformed(format!("bad header line `{line}`")))?;
        let value = value.trim();

        if name.eq_ignore_ascii_case("content-length") {
            let len = value
                .parse::<u64>()
                .map_err(|_| RequestError::Malformed(format!("bad content-length `{value}`")))?;
            content_length = Some(len);
        } else if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value
                .rsplit(',')
                .next()
                .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"));
        }
    }

    let body_len = if matches!(status, 100..=199 | 204 | 304) {
        0
    } else if chunked {
        read_chunked(reader).await?
    } else if let Some(len) = content_length {
        discard_exact(reader, len).await?
    } else {
        io::copy(reader, &mut io::sink())
            .await
            .map_err(RequestError::Read)?
    };

    Ok(Response { status, body_len })
}

fn parse_status_line(line: &str) -> Result<u16, RequestError> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let code = parts.next().unwrap_or_default();

    if !version.starts_with("HTTP/1.") {
        return Err(RequestError::Malformed(format!("bad status line `{line}`")));
    }

    match code.parse::<u16>() {
        Ok(status) if code.len() == 3 && (100..=999).contains(&status) => Ok(status),
        _ => Err(RequestError::Malformed(format!("bad status code `{code}`"))),
    }
}

async fn read_chunked<R>(reader: &mut R) -> Result<u64, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut total = 0;
    loop {
        let line = read_line(reader).await?;
        let size = line.split(';').next().unwrap_or_default().trim();
        let size = u64::from_str_radix(size, 16)
            .map_err(|_| RequestError::Malformed(format!("bad chunk size `{line}`")))?;

        if size == 0 {
            // Trailers, terminated by an empty line.
            while !read_line(reader).await?.is_empty() {}
            return Ok(total);
        }

        total += discard_exact(reader, size).await?;
        if !read_line(reader).await?.is_empty() {
            return Err(RequestError::Malformed("chunk not followed by CRLF".into()));
        }
    }
}

async fn discard_exact<R>(reader: &mut R, len: u64) -> Result<u64, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let copied = io::copy(&mut (&mut *reader).take(len), &mut io::sink())
        .await
        .map_err(RequestError::Read)?;

    if copied < len {
        return Err(RequestError::Read(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("body ended after {copied} of {len} bytes"),
        )));
    }
    Ok(copied)
}

/// Reads one line without its terminator. EOF before any terminator is an error.
async fn read_line<R>(reader: &mut R) -> Result<String, RequestError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    (&mut *reader)
        .take(MAX_LINE_LEN)
        .read_until(b'\n', &mut buf)
        .await
        .map_err(RequestError::Read)?;

    match buf.last() {
        Some(b'\n') => {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        }
        Some(_) if buf.len() as u64 >= MAX_LINE_LEN => {
            return Err(RequestError::Malformed("line too long".into()));
        }
        _ => {
            return Err(RequestError::Malformed(
                "connection closed mid-response".into(),
            ))
        }
    }

    String::from_utf8(buf).map_err(|_| RequestError::Malformed("non-UTF-8 header data".into()))
}
