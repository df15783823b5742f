//! Authoritative file registry for one sync session.
//!
//! The registry answers "give me the bytes for file X" only for files the
//! currently published manifest lists, and only when the name resolves to a
//! regular file directly inside one of the configured roots.

use packsync_schema::{resolve_direct_child, Manifest, ManifestError};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("file not served: {0}")]
    NotFound(String),
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),
}

/// An immutable, pre-serialized manifest as handed to request handlers.
#[derive(Debug, Default)]
pub struct PublishedManifest {
    manifest: Manifest,
    json: Vec<u8>,
    names: HashSet<String>,
}

impl PublishedManifest {
    fn new(manifest: Manifest) -> Result<Self, ManifestError> {
        let json = manifest.to_bytes()?;
        let names = manifest
            .files()
            .iter()
            .map(|e| e.file_name.to_string())
            .collect();
        Ok(Self {
            manifest,
            json,
            names,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn json(&self) -> &[u8] {
        &self.json
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.names.contains(file_name)
    }
}

pub struct ServerFileRegistry {
    roots: Vec<PathBuf>,
    current: RwLock<Arc<PublishedManifest>>,
}

impl ServerFileRegistry {
    /// Create a registry over `roots` (searched in order) with an empty manifest.
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let empty = PublishedManifest::new(Manifest::empty()).unwrap_or_default();
        Self {
            roots,
            current: RwLock::new(Arc::new(empty)),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Replace the served manifest. The new value is fully serialized before
    /// the swap, so readers see either the old or the new manifest.
    pub fn publish(&self, manifest: Manifest) -> Result<(), RegistryError> {
        let published = Arc::new(PublishedManifest::new(manifest)?);
        debug!("publishing manifest with {} files", published.manifest.len());
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = published;
        Ok(())
    }

    /// The manifest currently being served.
    pub fn snapshot(&self) -> Arc<PublishedManifest> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Read the bytes of `file_name`, failing closed.
    pub fn resolve_file_bytes(&self, file_name: &str) -> Result<Vec<u8>, RegistryError> {
        let Some(path) = self.find_file_path(file_name) else {
            debug!("requested file not in manifest or not found: {file_name}");
            return Err(RegistryError::NotFound(file_name.to_owned()));
        };
        fs::read(&path).map_err(|e| {
            warn!("failed to read {}: {e}", path.display());
            RegistryError::NotFound(file_name.to_owned())
        })
    }

    fn find_file_path(&self, file_name: &str) -> Option<PathBuf> {
        if !self.snapshot().contains(file_name) {
            return None;
        }
        self.roots
            .iter()
            .filter_map(|root| resolve_direct_child(root, file_name))
            .find(|path| is_regular_file(path))
    }
}

fn is_regular_file(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_file())
}
