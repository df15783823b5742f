//! Sync server for packsync.
//!
//! Serves the published manifest and the files it lists:
//!
//! - `GET /manifest`: manifest JSON
//! - `GET /file/{name}`: raw bytes of a listed file, `404` otherwise
//! - `GET /health`: liveness probe
//!
//! A fixed pool of worker threads pulls requests from one listener. The
//! [`ServerFileRegistry`] is the only shared state and is read-only while
//! serving. TLS is provided by tiny_http's rustls backend.
//!
//! The [`TestServer`] helper starts a server on a random port for integration testing.

pub mod registry;

pub use registry::{PublishedManifest, RegistryError, ServerFileRegistry};

use packsync_schema::TlsFiles;
use std::fs;
use std::io::Cursor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tiny_http::{Header, Method, Response, Server, SslConfig, StatusCode};
use tracing::{debug, error, info, warn};

/// Protocol version sent as `X-Packsync-Protocol` on every response.
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_HEADER: &str = "X-Packsync-Protocol";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind sync server on {addr}: {reason}")]
    Bind { addr: String, reason: String },
    #[error("sync server I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn protocol_header() -> Header {
    Header::from_bytes(PROTOCOL_HEADER, PROTOCOL_VERSION.to_string()).expect("valid header")
}

fn respond(req: tiny_http::Request, code: u16, content_type: &str, body: Vec<u8>) {
    let content_type = Header::from_bytes("Content-Type", content_type).expect("valid header");
    let response: Response<Cursor<Vec<u8>>> = Response::from_data(body)
        .with_status_code(StatusCode(code))
        .with_header(content_type)
        .with_header(protocol_header());
    if let Err(e) = req.respond(response) {
        debug!("failed to send response: {e}");
    }
}

fn respond_err(req: tiny_http::Request, code: u16, msg: &str) {
    respond(req, code, "text/plain; charset=utf-8", msg.as_bytes().to_vec());
}

/// Percent-decode one URL path component. Returns `None` on malformed
/// escapes or non-UTF-8 output.
pub fn decode_path_component(input: &str) -> Option<String> {
    if !input.contains('%') {
        return Some(input.to_owned());
    }
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = bytes.get(i + 1).copied().and_then(hex_value)?;
            let lo = bytes.get(i + 2).copied().and_then(hex_value)?;
            decoded.push((hi << 4) | lo);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// A parsed request route.
#[derive(Debug, PartialEq, Eq)]
pub enum Route {
    Manifest,
    File(String),
    Health,
    Unknown,
}

/// Map a request URL (query string ignored) to a [`Route`].
pub fn parse_route(url: &str) -> Route {
    let path = url.split_once('?').map_or(url, |(p, _)| p);
    match path {
        "/manifest" => Route::Manifest,
        "/health" => Route::Health,
        _ => match path.strip_prefix("/file/") {
            Some(raw) if !raw.is_empty() => {
                decode_path_component(raw).map_or(Route::Unknown, Route::File)
            }
            _ => Route::Unknown,
        },
    }
}

/// Handle a single HTTP request, dispatching to the appropriate route handler.
pub fn handle_request(registry: &ServerFileRegistry, req: tiny_http::Request) {
    let method = req.method().clone();
    let url = req.url().to_owned();
    debug!("{method} {url}");

    let route = parse_route(&url);
    if route == Route::Unknown {
        respond_err(req, 404, "not found");
        return;
    }
    if !matches!(method, Method::Get | Method::Head) {
        respond_err(req, 405, "method not allowed");
        return;
    }

    match route {
        Route::Manifest => {
            let snapshot = registry.snapshot();
            respond(req, 200, "application/json", snapshot.json().to_vec());
        }
        Route::File(name) => match registry.resolve_file_bytes(&name) {
            Ok(data) => {
                info!("serving {name} ({} bytes)", data.len());
                respond(req, 200, "application/octet-stream", data);
            }
            Err(_) => respond_err(req, 404, "not found"),
        },
        Route::Health => {
            let body = serde_json::json!({ "status": "ok" }).to_string();
            respond(req, 200, "application/json", body.into_bytes());
        }
        Route::Unknown => respond_err(req, 404, "not found"),
    }
}

fn load_ssl_config(tls: &TlsFiles) -> Result<SslConfig, std::io::Error> {
    Ok(SslConfig {
        certificate: fs::read(&tls.certificate_chain_file)?,
        private_key: fs::read(&tls.key_file)?,
    })
}

/// A bound, not yet serving, sync server.
pub struct SyncServer {
    server: Arc<Server>,
    registry: Arc<ServerFileRegistry>,
    addr: SocketAddr,
    tls: bool,
}

impl SyncServer {
    /// Bind `addr`. When `tls` is given but the PEM files cannot be read or the
    /// TLS listener cannot be built, the error is logged and the server falls
    /// back to plain HTTP.
    pub fn bind(
        addr: &str,
        registry: Arc<ServerFileRegistry>,
        tls: Option<&TlsFiles>,
    ) -> Result<Self, ServerError> {
        let bind_err = |reason: String| ServerError::Bind {
            addr: addr.to_owned(),
            reason,
        };

        let tls_server = tls.and_then(|files| {
            let config = match load_ssl_config(files) {
                Ok(config) => config,
                Err(e) => {
                    error!(
                        "failed to read TLS files {} / {}: {e}; serving without TLS",
                        files.certificate_chain_file.display(),
                        files.key_file.display()
                    );
                    return None;
                }
            };
            match Server::https(addr, config) {
                Ok(server) => Some(server),
                Err(e) => {
                    error!("failed to initialize TLS for sync server: {e}; serving without TLS");
                    None
                }
            }
        });

        let tls_enabled = tls_server.is_some();
        let server = match tls_server {
            Some(server) => server,
            None => Server::http(addr).map_err(|e| bind_err(e.to_string()))?,
        };
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| bind_err("not an IP address".to_owned()))?;

        Ok(Self {
            server: Arc::new(server),
            registry,
            addr,
            tls: tls_enabled,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Start `workers` threads serving requests until [`ServerHandle::shutdown`].
    pub fn spawn(self, workers: usize) -> Result<ServerHandle, ServerError> {
        let workers = workers.max(1);
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let server = Arc::clone(&self.server);
            let registry = Arc::clone(&self.registry);
            let handle = std::thread::Builder::new()
                .name(format!("packsync-http-{i}"))
                .spawn(move || {
                    for request in server.incoming_requests() {
                        handle_request(&registry, request);
                    }
                })?;
            handles.push(handle);
        }

        let scheme = if self.tls { "https" } else { "http" };
        info!(
            "sync server listening on {scheme}://{} with {workers} workers",
            self.addr
        );
        Ok(ServerHandle {
            server: self.server,
            addr: self.addr,
            tls: self.tls,
            workers: handles,
        })
    }
}

/// Handle to a running sync server.
pub struct ServerHandle {
    server: Arc<Server>,
    addr: SocketAddr,
    tls: bool,
    workers: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.addr)
            .field("tls", &self.tls)
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    pub fn url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{}", self.addr)
    }

    /// Wake every worker so it stops accepting requests.
    pub fn shutdown(&self) {
        for _ in 0..self.workers.len() {
            self.server.unblock();
        }
    }

    /// Block until every worker has exited.
    pub fn join(self) {
        for handle in self.workers {
            if handle.join().is_err() {
                warn!("sync server worker panicked");
            }
        }
    }
}

/// A test helper that starts a sync server on a random port in background threads.
///
/// The server listens on `127.0.0.1:{port}` over plain HTTP. Drop the
/// `TestServer` to stop it.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    pub registry: Arc<ServerFileRegistry>,
    handle: ServerHandle,
}

impl TestServer {
    pub fn start(registry: Arc<ServerFileRegistry>) -> Self {
        let server = SyncServer::bind("127.0.0.1:0", Arc::clone(&registry), None)
            .expect("failed to bind test HTTP server");
        let handle = server.spawn(2).expect("failed to spawn test server workers");
        Self {
            url: handle.url(),
            port: handle.local_addr().port(),
            registry,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}
