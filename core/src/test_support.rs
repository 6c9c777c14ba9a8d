//! In-memory transport for unit tests.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, StreamingResponse, Transport};

type Chunk = Result<Vec<u8>, TransportError>;

/// Replays a fixed response and records every request it receives.
pub(crate) struct ScriptedTransport {
    status: u16,
    headers: Vec<(String, String)>,
    chunks: Vec<Chunk>,
    refuse: Option<TransportError>,
    requests: RefCell<Vec<HttpRequest>>,
    pulls: Rc<Cell<usize>>,
}

impl ScriptedTransport {
    pub(crate) fn ok(chunks: &[&str]) -> Self {
        Self::with_chunks(200, chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect())
    }

    pub(crate) fn json(status: u16, body: &str) -> Self {
        let mut transport = Self::with_chunks(status, vec![Ok(body.as_bytes().to_vec())]);
        transport.headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        transport
    }

    pub(crate) fn with_chunks(status: u16, chunks: Vec<Chunk>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            chunks,
            refuse: None,
            requests: RefCell::new(Vec::new()),
            pulls: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn refusing(err: TransportError) -> Self {
        let mut transport = Self::with_chunks(200, Vec::new());
        transport.refuse = Some(err);
        transport
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub(crate) fn last_request(&self) -> HttpRequest {
        self.requests.borrow().last().cloned().expect("no request was sent")
    }

    /// Number of body chunks handed out through `open`.
    pub(crate) fn pulls(&self) -> usize {
        self.pulls.get()
    }

    fn record(&self, request: &HttpRequest) -> Result<(), TransportError> {
        self.requests.borrow_mut().push(request.clone());
        match &self.refuse {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

pub(crate) struct CountingChunks {
    inner: std::vec::IntoIter<Chunk>,
    pulls: Rc<Cell<usize>>,
}

impl Iterator for CountingChunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let chunk = self.inner.next()?;
        self.pulls.set(self.pulls.get() + 1);
        Some(chunk)
    }
}

impl Transport for ScriptedTransport {
    type Chunks = CountingChunks;

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.record(request)?;
        let mut body = Vec::new();
        for chunk in &self.chunks {
            body.extend_from_slice(&chunk.clone()?);
        }
        Ok(HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body,
        })
    }

    fn open(
        &self,
        request: &HttpRequest,
    ) -> Result<StreamingResponse<CountingChunks>, TransportError> {
        self.record(request)?;
        Ok(StreamingResponse {
            status: self.status,
            headers: self.headers.clone(),
            chunks: CountingChunks {
                inner: self.chunks.clone().into_iter(),
                pulls: Rc::clone(&self.pulls),
            },
        })
    }
}
