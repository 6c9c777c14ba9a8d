//! End-to-end dispatch against the live mock engine.
//!
//! # Design
//! Starts the mock server on a random port, then drives the dispatcher over
//! real HTTP through a ureq-backed `Transport`. Simple endpoints go through
//! `Transport::send`; the wait endpoint goes through `Transport::open` and is
//! read chunk by chunk from the socket.

use std::io::Read;
use std::net::SocketAddr;

use engine_core::{
    ApiError, Connection, CreateContainerEndpoint, Dispatcher, ExitCondition, HostConfig,
    HttpMethod, HttpRequest, HttpResponse, NoAuthenticator, PasswordAuthenticator, PipelineState,
    StreamingResponse, Transport, TransportError, WaitContainerEndpoint,
};

/// Blocking transport backed by ureq.
///
/// Disables ureq's status-code-as-error behavior so 4xx/5xx responses come
/// back as data and the core interprets them.
struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }

    fn call(&self, req: &HttpRequest) -> Result<ureq::http::Response<ureq::Body>, TransportError> {
        fn with_headers<B>(
            mut builder: ureq::RequestBuilder<B>,
            headers: &[(String, String)],
        ) -> ureq::RequestBuilder<B> {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder
        }

        let url = req.url.as_str();
        let headers = req.headers.as_slice();
        let body = req.body.as_deref();
        match (req.method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), headers).call(),
            (HttpMethod::Head, _) => with_headers(self.agent.head(url), headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), headers).send(body)
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(self.agent.put(url), headers).send(body),
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), headers).send_empty(),
            (HttpMethod::Patch, Some(body)) => {
                with_headers(self.agent.patch(url), headers).send(body)
            }
            (HttpMethod::Patch, None) => with_headers(self.agent.patch(url), headers).send_empty(),
        }
        .map_err(|e| TransportError::Connection(e.to_string()))
    }
}

fn response_headers(response: &ureq::http::Response<ureq::Body>) -> Vec<(String, String)> {
    response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
        })
        .collect()
}

/// Reads the response body in socket-sized pieces.
struct ReaderChunks {
    reader: Box<dyn Read>,
    done: bool,
}

impl Iterator for ReaderChunks {
    type Item = Result<Vec<u8>, TransportError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; 8192];
        match self.reader.read(&mut buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(n) => {
                buf.truncate(n);
                Some(Ok(buf))
            }
            Err(e) => {
                self.done = true;
                Some(Err(TransportError::Io(e.to_string())))
            }
        }
    }
}

impl Transport for UreqTransport {
    type Chunks = ReaderChunks;

    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut response = self.call(request)?;
        let status = response.status().as_u16();
        let headers = response_headers(&response);
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(HttpResponse { status, headers, body })
    }

    fn open(
        &self,
        request: &HttpRequest,
    ) -> Result<StreamingResponse<ReaderChunks>, TransportError> {
        let response = self.call(request)?;
        let status = response.status().as_u16();
        let headers = response_headers(&response);
        let reader = Box::new(response.into_body().into_reader());
        Ok(StreamingResponse {
            status,
            headers,
            chunks: ReaderChunks { reader, done: false },
        })
    }
}

fn start_mock_engine() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn dispatcher(addr: SocketAddr) -> Dispatcher<UreqTransport> {
    let connection = Connection::new(&format!("http://{addr}")).unwrap();
    Dispatcher::new(connection, UreqTransport::new())
}

#[test]
fn container_lifecycle() {
    let client = dispatcher(start_mock_engine());

    // Step 1: create a container with a command and a bind mount.
    let create = CreateContainerEndpoint::new(
        "alpine:3.19",
        Some(vec!["true".to_string()]),
        Some(HostConfig {
            binds: vec!["/tmp:/data".to_string()],
        }),
    );
    let created = client.dispatch(&create).unwrap();
    assert_eq!(created.id.len(), 32);
    assert!(created.warnings.is_empty());

    // Step 2: wait for it through the streaming path.
    let mut pipeline = client
        .stream(WaitContainerEndpoint::with_condition(&created.id, ExitCondition::NotRunning))
        .unwrap();
    let status = pipeline.next().unwrap().unwrap();
    assert_eq!(status.status_code, 0);
    assert!(status.error.is_none());
    assert!(pipeline.next().is_none());
    assert_eq!(pipeline.state(), PipelineState::Completed);

    // Step 3: a failing command reports a non-zero status.
    let failing =
        CreateContainerEndpoint::new("alpine:3.19", Some(vec!["false".to_string()]), None)
            .with_name("job");
    client.dispatch(&failing).unwrap();
    let statuses: Vec<_> = client
        .stream(WaitContainerEndpoint::with_condition("job", ExitCondition::NextExit))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(statuses.len(), 1);
    assert_eq!(statuses[0].status_code, 1);

    // Step 4: a name already in use is a conflict with the engine's message.
    let err = client.dispatch(&failing).unwrap_err();
    match err {
        ApiError::HttpStatus { status, message } => {
            assert_eq!(status, 409);
            assert!(message.unwrap().contains("already in use"));
        }
        other => panic!("expected HttpStatus, got {other:?}"),
    }

    // Step 5: the wait endpoint also works as a simple dispatch.
    let status = client.dispatch(&WaitContainerEndpoint::new(&created.id)).unwrap();
    assert_eq!(status.status_code, 0);
}

#[test]
fn waiting_on_unknown_container_fails_with_404() {
    let client = dispatcher(start_mock_engine());

    let mut pipeline = client.stream(WaitContainerEndpoint::new("nope")).unwrap();
    let err = pipeline.next().unwrap().unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        ApiError::HttpStatus { message: Some(ref m), .. } if m == "No such container: nope"
    ));
    assert_eq!(pipeline.state(), PipelineState::Failed);
    assert!(pipeline.next().is_none());

    let err = client.dispatch(&WaitContainerEndpoint::new("nope")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn registry_auth_header_is_accepted_by_engine() {
    let client = dispatcher(start_mock_engine());
    let create = CreateContainerEndpoint::new("registry.example.com/team/app:1.0", None, None);

    let auth = PasswordAuthenticator::new("alice", "s3cret", "registry.example.com")
        .with_email("alice@example.com");
    let created = client.dispatch_with_auth(&create, &auth).unwrap();
    assert!(!created.id.is_empty());

    let created = client.dispatch_with_auth(&create, &NoAuthenticator::new()).unwrap();
    assert!(!created.id.is_empty());
}

#[test]
fn wrong_api_version_is_not_found() {
    let addr = start_mock_engine();
    let connection = Connection::new(&format!("http://{addr}"))
        .unwrap()
        .with_api_version("1.99");
    let client = Dispatcher::new(connection, UreqTransport::new());

    let err = client
        .dispatch(&CreateContainerEndpoint::new("alpine", None, None))
        .unwrap_err();
    assert!(matches!(err, ApiError::HttpStatus { status: 404, .. }));
}

#[test]
fn unreachable_engine_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let client = dispatcher(addr);

    let err = client
        .dispatch(&CreateContainerEndpoint::new("alpine", None, None))
        .unwrap_err();
    assert!(matches!(err, ApiError::Transport(TransportError::Connection(_))));

    let mut pipeline = client.stream(WaitContainerEndpoint::new("abc")).unwrap();
    assert!(matches!(
        pipeline.next(),
        Some(Err(ApiError::Transport(TransportError::Connection(_))))
    ));
}
