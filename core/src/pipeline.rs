//! Lazy, pull-based consumption of streamed endpoint responses.
//!
//! # Design
//! A `Pipeline` is an `Iterator` over `Result<E::Response, ApiError>`. It
//! opens the transport stream on the first pull, then requests one transport
//! chunk at a time and only when no complete frame is already buffered, so
//! the consumer drives backpressure. Frames are newline-delimited; each
//! non-blank frame goes through `PipelineEndpoint::map_chunk`.
//!
//! ```text
//! AwaitingConnection --headers ok--> Streaming --eos / terminal value--> Completed
//!         |                              |
//!         +--------- error -------> Failed <--- error / bad frame / cancel
//! ```
//!
//! After `Completed` or `Failed` the iterator yields `None` forever. A
//! consumed pipeline cannot be restarted; dispatch a fresh endpoint instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use strum::Display;
use tracing::{debug, trace};

use crate::dispatcher::status_error;
use crate::endpoint::PipelineEndpoint;
use crate::error::{ApiError, TransportError};
use crate::http::{is_success, HttpRequest, Transport};

/// Longest frame, or error body, a pipeline buffers in memory.
pub const MAX_FRAME_LEN: usize = 1 << 20;

/// Lifecycle of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PipelineState {
    AwaitingConnection,
    Streaming,
    Completed,
    Failed,
}

/// Cancels an in-flight pipeline from outside the consuming loop.
///
/// Clones share one flag. The next pull after `cancel` fails with
/// `ApiError::Cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Streamed response of a `PipelineEndpoint`.
pub struct Pipeline<'t, E, T>
where
    E: PipelineEndpoint,
    T: Transport,
{
    endpoint: E,
    transport: &'t T,
    request: HttpRequest,
    chunks: Option<T::Chunks>,
    frames: FrameBuffer,
    state: PipelineState,
    cancel: CancelHandle,
}

impl<'t, E, T> Pipeline<'t, E, T>
where
    E: PipelineEndpoint,
    T: Transport,
{
    pub(crate) fn new(endpoint: E, transport: &'t T, request: HttpRequest) -> Self {
        Self {
            endpoint,
            transport,
            request,
            chunks: None,
            frames: FrameBuffer::new(MAX_FRAME_LEN),
            state: PipelineState::AwaitingConnection,
            cancel: CancelHandle::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn endpoint(&self) -> &E {
        &self.endpoint
    }

    fn connect(&mut self) -> Result<(), ApiError> {
        let response = self.transport.open(&self.request)?;
        if !is_success(response.status) {
            let body = read_error_body(response.chunks);
            return Err(status_error(response.status, &body));
        }
        debug!(url = %self.request.url, status = response.status, "pipeline streaming");
        self.chunks = Some(response.chunks);
        self.transition(PipelineState::Streaming);
        Ok(())
    }

    fn map_frame(&mut self, frame: Vec<u8>) -> Result<E::Response, ApiError> {
        trace!(len = frame.len(), "pipeline frame");
        let text = String::from_utf8(frame).map_err(|e| ApiError::Mapping(e.to_string()))?;
        let response = self.endpoint.map_chunk(text.trim_end_matches(['\r', '\n']))?;
        if self.endpoint.is_terminal(&response) {
            self.chunks = None;
            self.transition(PipelineState::Completed);
        }
        Ok(response)
    }

    fn fail(&mut self, err: ApiError) -> ApiError {
        debug!(error = %err, "pipeline failed");
        self.chunks = None;
        self.transition(PipelineState::Failed);
        err
    }

    fn transition(&mut self, next: PipelineState) {
        debug!(from = %self.state, to = %next, "pipeline state");
        self.state = next;
    }

    /// Produces the next frame, pulling from the transport only when needed.
    /// `Ok(None)` means the stream ended cleanly.
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ApiError> {
        loop {
            if let Some(frame) = self.frames.next_frame()? {
                return Ok(Some(frame));
            }
            let Some(chunks) = self.chunks.as_mut() else {
                return Ok(self.frames.finish());
            };
            if self.cancel.is_cancelled() {
                return Err(ApiError::Cancelled);
            }
            match chunks.next() {
                Some(Ok(bytes)) => self.frames.push(&bytes),
                Some(Err(err)) => return Err(err.into()),
                None => self.chunks = None,
            }
        }
    }
}

impl<E, T> Iterator for Pipeline<'_, E, T>
where
    E: PipelineEndpoint,
    T: Transport,
{
    type Item = Result<E::Response, ApiError>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, PipelineState::Completed | PipelineState::Failed) {
            return None;
        }
        if self.cancel.is_cancelled() {
            return Some(Err(self.fail(ApiError::Cancelled)));
        }
        if self.state == PipelineState::AwaitingConnection {
            if let Err(err) = self.connect() {
                return Some(Err(self.fail(err)));
            }
        }
        match self.next_frame() {
            Ok(Some(frame)) => match self.map_frame(frame) {
                Ok(response) => Some(Ok(response)),
                Err(err) => Some(Err(self.fail(err))),
            },
            Ok(None) => {
                self.transition(PipelineState::Completed);
                None
            }
            Err(err) => Some(Err(self.fail(err))),
        }
    }
}

/// Collects the body of an error response, up to `MAX_FRAME_LEN` bytes.
///
/// The status is already known from the headers, so a body that breaks off
/// or runs long keeps whatever was read.
fn read_error_body<C>(chunks: C) -> Vec<u8>
where
    C: Iterator<Item = Result<Vec<u8>, TransportError>>,
{
    let mut body = Vec::new();
    for chunk in chunks {
        match chunk {
            Ok(bytes) => {
                let room = MAX_FRAME_LEN - body.len();
                body.extend_from_slice(&bytes[..bytes.len().min(room)]);
                if body.len() == MAX_FRAME_LEN {
                    debug!(limit = MAX_FRAME_LEN, "error body truncated");
                    break;
                }
            }
            Err(err) => {
                debug!(error = %err, "error body interrupted");
                break;
            }
        }
    }
    body
}

/// Reassembles arbitrary byte chunks into newline-delimited frames.
#[derive(Debug)]
struct FrameBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
    max_len: usize,
}

impl FrameBuffer {
    fn new(max_len: usize) -> Self {
        Self {
            pending: Vec::new(),
            scanned: 0,
            max_len,
        }
    }

    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete non-blank frame. Fails with `Mapping` once a frame
    /// outgrows `max_len`.
    fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ApiError> {
        while let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            if end > self.max_len {
                return Err(self.oversized());
            }
            let frame: Vec<u8> = self.pending.drain(..=end).collect();
            self.scanned = 0;
            if !is_blank(&frame) {
                return Ok(Some(frame));
            }
        }
        self.scanned = self.pending.len();
        if self.pending.len() > self.max_len {
            return Err(self.oversized());
        }
        Ok(None)
    }

    /// Flushes an unterminated trailing frame at end-of-stream.
    fn finish(&mut self) -> Option<Vec<u8>> {
        self.scanned = 0;
        let rest = std::mem::take(&mut self.pending);
        (!is_blank(&rest)).then_some(rest)
    }

    fn oversized(&self) -> ApiError {
        ApiError::Mapping(format!("stream frame exceeds {} bytes", self.max_len))
    }
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}
