//! Local mod storage for packsync: directory layout, content hashing, pack
//! resolution, and manifest building.
//!
//! `PackLayout` locates the `servermods/` and `clientmods/` roots under a game
//! directory, `hash_file` computes the blake3 digest used for integrity checks,
//! `PackResolver` keeps one winner per mod id, and `build_manifest` turns a
//! resolved file list into a [`packsync_schema::Manifest`].

pub mod builder;
pub mod hash;
pub mod layout;
pub mod resolve;

pub use builder::build_manifest;
pub use hash::hash_file;
pub use layout::{list_jars, PackLayout};
pub use resolve::PackResolver;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot build manifest, checksum failed for {file}: {source}")]
    ManifestBuild {
        file: String,
        #[source]
        source: Box<StoreError>,
    },
    #[error("manifest error: {0}")]
    Manifest(#[from] packsync_schema::ManifestError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
