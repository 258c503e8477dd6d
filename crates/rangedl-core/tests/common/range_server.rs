//! Minimal HTTP/1.1 server with HEAD and Range GET support for curl tests.
//!
//! Serves a single static body at `/file.bin`; `/moved` redirects there.
//! One request per connection.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405.
    pub head_allowed: bool,
    /// If false, HEAD omits Content-Length.
    pub send_length: bool,
    /// If false, GET ignores Range and returns 200 with the full body.
    pub support_ranges: bool,
    /// GET ranges starting at this offset answer 500.
    pub fail_range_start: Option<u64>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            send_length: true,
            support_ranges: true,
            fail_range_start: None,
        }
    }
}

pub struct RangeServer {
    pub base: String,
    gets: Arc<AtomicUsize>,
}

impl RangeServer {
    /// URL of the served file.
    pub fn url(&self) -> String {
        format!("{}file.bin", self.base)
    }

    /// URL that redirects to the served file.
    pub fn redirect_url(&self) -> String {
        format!("{}moved", self.base)
    }

    /// Number of ranged or plain GETs served so far.
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

pub fn start(body: Vec<u8>) -> RangeServer {
    start_with_options(body, RangeServerOptions::default())
}

pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let body = Arc::new(body);
    let gets = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&gets);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let body = Arc::clone(&body);
            let counter = Arc::clone(&counter);
            thread::spawn(move || handle(stream, &body, opts, &counter));
        }
    });
    RangeServer {
        base: format!("http://127.0.0.1:{}/", port),
        gets,
    }
}

fn handle(mut stream: TcpStream, body: &[u8], opts: RangeServerOptions, gets: &AtomicUsize) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let (method, path, range) = parse_request(request);
    let total = body.len() as u64;

    if path == "/moved" {
        let _ = stream.write_all(
            b"HTTP/1.1 302 Found\r\nLocation: /file.bin\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }
    if path != "/file.bin" {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    }

    if method.eq_ignore_ascii_case("HEAD") {
        if !opts.head_allowed {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
            return;
        }
        let length = if opts.send_length {
            format!("Content-Length: {}\r\n", total)
        } else {
            String::new()
        };
        let response = format!(
            "HTTP/1.1 200 OK\r\n{}Accept-Ranges: bytes\r\nConnection: close\r\n\r\n",
            length
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
        return;
    }

    gets.fetch_add(1, Ordering::SeqCst);
    let (status, content_range, slice) = match range.filter(|_| opts.support_ranges) {
        Some((start, _)) if opts.fail_range_start == Some(start) => {
            let _ = stream.write_all(
                b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 5\r\nConnection: close\r\n\r\noops!",
            );
            return;
        }
        Some((start, end_incl)) => {
            let end_incl = end_incl.min(total.saturating_sub(1));
            if start > end_incl {
                ("416 Range Not Satisfiable", Some(format!("bytes */{}", total)), &body[0..0])
            } else {
                let slice = &body[start as usize..=end_incl as usize];
                (
                    "206 Partial Content",
                    Some(format!("bytes {}-{}/{}", start, end_incl, total)),
                    slice,
                )
            }
        }
        None => ("200 OK", None, body),
    };
    let content_range = content_range
        .map(|v| format!("Content-Range: {}\r\n", v))
        .unwrap_or_default();
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        slice.len(),
        content_range
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.write_all(slice);
}

/// Returns (method, path, optional (start, end_inclusive) for `Range: bytes=X-Y`).
fn parse_request(request: &str) -> (&str, &str, Option<(u64, u64)>) {
    let mut lines = request.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("");
    let path = first.next().unwrap_or("");
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case("range") {
            continue;
        }
        if let Some(spec) = value.trim().strip_prefix("bytes=") {
            if let Some((a, b)) = spec.split_once('-') {
                let start = a.trim().parse::<u64>().unwrap_or(0);
                let end = b.trim().parse::<u64>().unwrap_or(u64::MAX);
                range = Some((start, end));
            }
        }
    }
    (method, path, range)
}
