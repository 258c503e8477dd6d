//! Easy2 handler for one chunk in the curl multi transport.
//!
//! Validates the response (2xx, and a `Content-Range` matching the request)
//! before accepting body bytes, then buffers them until the transport hands
//! them to the scheduler. A full buffer pauses the transfer.

use std::str;

use crate::error::TransferFailure;
use crate::transport::RangeRequest;

/// Per-transfer state owned by the curl easy handle.
pub(super) struct ChunkHandler {
    pub(super) request: RangeRequest,
    /// Header lines of the current response; reset at each `HTTP/` status line
    /// so only the final response after redirects counts.
    pub(super) response_headers: Vec<String>,
    /// Set once the first body bytes arrive.
    pub(super) checked: bool,
    /// Validation failure; the transfer is aborted by returning 0 from `write`.
    pub(super) failure: Option<TransferFailure>,
    /// Body bytes not yet handed to the scheduler.
    pub(super) buffer: Vec<u8>,
    pub(super) max_buffered: usize,
    pub(super) paused: bool,
    /// A plain `200` is acceptable when this request spans the whole resource.
    pub(super) whole_resource: bool,
}

impl ChunkHandler {
    pub(super) fn new(request: RangeRequest, total_bytes: u64, max_buffered: usize) -> Self {
        Self {
            request,
            response_headers: Vec::new(),
            checked: false,
            failure: None,
            buffer: Vec::new(),
            max_buffered,
            paused: false,
            whole_resource: request.start == 0 && request.length == total_bytes,
        }
    }

    fn validate(&self) -> Result<(), TransferFailure> {
        let status = parse_http_status(&self.response_headers).unwrap_or(0);
        if !(200..300).contains(&status) {
            return Err(TransferFailure::Http(status));
        }
        if status == 200 && self.whole_resource {
            return Ok(());
        }
        let content_range = find_header(&self.response_headers, "content-range");
        let matches = content_range
            .and_then(parse_content_range)
            .map(|(s, e)| {
                s == self.request.start && e == self.request.start + self.request.length - 1
            })
            .unwrap_or(false);
        if status == 206 && matches {
            Ok(())
        } else {
            Err(TransferFailure::BadRange {
                status,
                content_range: content_range.map(str::to_string),
            })
        }
    }
}

impl curl::easy::Handler for ChunkHandler {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                self.response_headers.clear();
            }
            if !line.is_empty() {
                self.response_headers.push(line.to_string());
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        if !self.checked {
            self.checked = true;
            if let Err(f) = self.validate() {
                self.failure = Some(f);
            }
        }
        if self.failure.is_some() {
            return Ok(0);
        }
        if !self.buffer.is_empty() && self.buffer.len() + data.len() > self.max_buffered {
            self.paused = true;
            return Err(curl::easy::WriteError::Pause);
        }
        self.buffer.extend_from_slice(data);
        Ok(data.len())
    }
}

/// Status code of the last status line in `lines`.
pub(super) fn parse_http_status(lines: &[String]) -> Option<u32> {
    lines
        .iter()
        .rev()
        .find(|l| l.starts_with("HTTP/"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
}

fn find_header<'a>(lines: &'a [String], name: &str) -> Option<&'a str> {
    lines.iter().find_map(|l| {
        let (n, v) = l.split_once(':')?;
        n.trim().eq_ignore_ascii_case(name).then(|| v.trim())
    })
}

/// Parses `bytes START-END/TOTAL` (TOTAL may be `*`) into inclusive bounds.
pub(super) fn parse_content_range(value: &str) -> Option<(u64, u64)> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, _total) = rest.split_once('/')?;
    let (start, end) = range.split_once('-')?;
    Some((start.trim().parse().ok()?, end.trim().parse().ok()?))
}
