//! Curl multi transport: one multi handle, one Easy2 handle per open chunk.
//!
//! `poll` is `curl_multi_wait` + `curl_multi_perform`; body bytes collected by
//! the easy handlers are then handed to the scheduler on the same thread.

mod handler;

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{DownloadError, NetworkErrorKind, TransferFailure};

use super::{Flow, RangeRequest, Transport, TransportEvent};
use handler::ChunkHandler;

/// Per-request settings shared by every easy handle of a run.
#[derive(Debug, Clone)]
pub struct CurlOptions {
    pub url: String,
    /// Size of the resource, used to accept `200` for a whole-resource request.
    pub total_bytes: u64,
    pub cookie: Option<String>,
    pub user_agent: String,
    pub max_redirects: u32,
    /// Connect timeout, and the low-speed window (below 1 B/s) per connection.
    pub network_timeout: Duration,
    /// Body bytes buffered per transfer before it is paused.
    pub max_buffered: usize,
    /// libcurl's own trace on stderr.
    pub verbose: bool,
}

impl CurlOptions {
    pub fn new(url: &str, total_bytes: u64) -> Self {
        Self {
            url: url.to_string(),
            total_bytes,
            cookie: None,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            max_redirects: 20,
            network_timeout: Duration::from_secs(60),
            max_buffered: 256 * 1024,
            verbose: false,
        }
    }
}

struct Active {
    index: usize,
    handle: curl::multi::Easy2Handle<ChunkHandler>,
}

/// Transport backed by libcurl's multi interface.
pub struct CurlTransport {
    // Declared before `multi`: easy handles must be detached before the multi
    // handle is cleaned up.
    active: Vec<Active>,
    completed: VecDeque<(usize, Result<(), curl::Error>)>,
    multi: curl::multi::Multi,
    options: CurlOptions,
}

impl CurlTransport {
    pub fn new(options: CurlOptions) -> Self {
        Self {
            active: Vec::new(),
            completed: VecDeque::new(),
            multi: curl::multi::Multi::new(),
            options,
        }
    }

    fn has_undelivered(&self) -> bool {
        !self.completed.is_empty()
            || self
                .active
                .iter()
                .any(|a| !a.handle.get_ref().buffer.is_empty())
    }

    fn build_easy(&self, request: &RangeRequest) -> Result<curl::easy::Easy2<ChunkHandler>, curl::Error> {
        let o = &self.options;
        let handler = ChunkHandler::new(*request, o.total_bytes, o.max_buffered);
        let mut easy = curl::easy::Easy2::new(handler);
        easy.verbose(o.verbose)?;
        easy.url(&o.url)?;
        easy.follow_location(true)?;
        easy.max_redirections(o.max_redirects)?;
        easy.connect_timeout(o.network_timeout)?;
        easy.low_speed_limit(1)?;
        easy.low_speed_time(o.network_timeout)?;
        easy.useragent(&o.user_agent)?;
        if let Some(cookie) = &o.cookie {
            easy.cookie(cookie)?;
        }
        easy.range(&request.range_spec())?;
        Ok(easy)
    }
}

fn multi_error(what: &str, e: impl std::fmt::Display) -> DownloadError {
    DownloadError::Transport(format!("curl multi {}: {}", what, e))
}

/// Map a curl error onto the transport-neutral failure kinds.
pub(crate) fn classify_curl_error(e: &curl::Error) -> NetworkErrorKind {
    if e.is_operation_timedout() {
        return NetworkErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return NetworkErrorKind::Connection;
    }
    NetworkErrorKind::Other
}

/// Terminal outcome from curl's result, the response code and handler state.
fn finish_outcome(
    result: Result<(), curl::Error>,
    code: u32,
    handler: &mut ChunkHandler,
) -> Result<(), TransferFailure> {
    if let Some(f) = handler.failure.take() {
        return Err(f);
    }
    if let Err(e) = result {
        return Err(TransferFailure::Network {
            kind: classify_curl_error(&e),
            message: e.to_string(),
        });
    }
    if !(200..300).contains(&code) {
        return Err(TransferFailure::Http(code));
    }
    Ok(())
}

impl Transport for CurlTransport {
    fn open(&mut self, request: &RangeRequest) -> Result<(), TransferFailure> {
        let easy = self
            .build_easy(request)
            .map_err(|e| TransferFailure::Request(format!("curl setup: {}", e)))?;
        let handle = self
            .multi
            .add2(easy)
            .map_err(|e| TransferFailure::Request(format!("curl multi add: {}", e)))?;
        self.active.push(Active {
            index: request.index,
            handle,
        });
        Ok(())
    }

    fn poll(
        &mut self,
        timeout: Duration,
        on_event: &mut dyn FnMut(TransportEvent<'_>) -> Flow,
    ) -> Result<usize, DownloadError> {
        if !self.has_undelivered() {
            self.multi
                .wait(&mut [], timeout)
                .map_err(|e| multi_error("wait", e))?;
        }
        self.multi.perform().map_err(|e| multi_error("perform", e))?;

        let active = &self.active;
        let completed = &mut self.completed;
        self.multi.messages(|msg| {
            for a in active.iter() {
                if let Some(res) = msg.result_for2(&a.handle) {
                    completed.push_back((a.index, res));
                    break;
                }
            }
        });

        let mut delivered = 0usize;
        for a in self.active.iter_mut() {
            let state = a.handle.get_mut();
            if state.buffer.is_empty() {
                continue;
            }
            let data = std::mem::take(&mut state.buffer);
            let was_paused = std::mem::replace(&mut state.paused, false);
            delivered += 1;
            let flow = on_event(TransportEvent::Data {
                index: a.index,
                bytes: &data,
            });
            if was_paused {
                a.handle
                    .unpause_write()
                    .map_err(|e| DownloadError::Transport(format!("curl unpause: {}", e)))?;
            }
            if flow == Flow::Stop {
                return Ok(delivered);
            }
        }

        while let Some((index, result)) = self.completed.pop_front() {
            let Some(pos) = self.active.iter().position(|a| a.index == index) else {
                continue;
            };
            let a = self.active.remove(pos);
            let mut easy = self
                .multi
                .remove2(a.handle)
                .map_err(|e| multi_error("remove", e))?;
            let code = easy.response_code().unwrap_or(0);
            let outcome = finish_outcome(result, code, easy.get_mut());
            delivered += 1;
            if on_event(TransportEvent::Finished { index, outcome }) == Flow::Stop {
                return Ok(delivered);
            }
        }
        Ok(delivered)
    }

    fn cancel(&mut self, index: usize) {
        self.completed.retain(|(i, _)| *i != index);
        if let Some(pos) = self.active.iter().position(|a| a.index == index) {
            let a = self.active.remove(pos);
            if let Err(e) = self.multi.remove2(a.handle) {
                tracing::debug!(index, "curl multi remove on cancel failed: {}", e);
            }
        }
    }
}
