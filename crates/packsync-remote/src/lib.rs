//! Client side of packsync.
//!
//! This crate fetches a server's manifest over HTTP(S), works out which files
//! are missing or stale in a local directory, downloads and verifies them, and
//! reports which local files belong to the synced pack.

pub mod config;
pub mod http;
pub mod lock;
pub mod transfer;

pub use config::RemoteConfig;
pub use http::HttpBackend;
pub use lock::SyncLock;
pub use transfer::{exposed_files, pull_pack, sync, PullResult, SyncResult};

use packsync_schema::Manifest;
use std::path::PathBuf;
use thiserror::Error;

/// Protocol version sent as `X-Packsync-Protocol` header on all HTTP requests.
pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("store error: {0}")]
    Store(#[from] packsync_store::StoreError),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("remote config error: {0}")]
    Config(String),
    #[error("integrity failure for '{file}': expected {expected}, got {actual}")]
    IntegrityFailure {
        file: String,
        expected: String,
        actual: String,
    },
    #[error("server manifest lists an unsafe file name: {0:?}")]
    UnsafeFileName(String),
    #[error("another sync is already running for {0}")]
    SyncInProgress(PathBuf),
}

/// Source of a server pack.
pub trait RemoteBackend: Send + Sync {
    /// Download and parse the server's current manifest.
    fn get_manifest(&self) -> Result<Manifest, RemoteError>;

    /// Download the bytes of one listed file.
    fn get_file(&self, file_name: &str) -> Result<Vec<u8>, RemoteError>;
}
