//! Wire manifest: the list of files a server commits to sharing for a session.

use crate::types::{ContentHash, FileName, ModId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to write manifest: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate file name in manifest: {0}")]
    DuplicateFileName(String),
}

/// One shared file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    pub mod_id: ModId,
    pub checksum: ContentHash,
    pub file_name: FileName,
}

impl FileEntry {
    pub fn new(mod_id: impl Into<ModId>, checksum: ContentHash, file_name: impl Into<FileName>) -> Self {
        Self {
            mod_id: mod_id.into(),
            checksum,
            file_name: file_name.into(),
        }
    }
}

/// Ordered, duplicate-free list of [`FileEntry`] values.
///
/// Construct through [`Manifest::new`] or [`Manifest::from_bytes`]; both reject
/// repeated file names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    files: Vec<FileEntry>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    files: Vec<FileEntry>,
}

impl Manifest {
    pub fn new(files: Vec<FileEntry>) -> Result<Self, ManifestError> {
        let mut seen = HashSet::with_capacity(files.len());
        for entry in &files {
            if !seen.insert(entry.file_name.as_str()) {
                return Err(ManifestError::DuplicateFileName(entry.file_name.to_string()));
            }
        }
        Ok(Self { files })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn get(&self, file_name: &str) -> Option<&FileEntry> {
        self.files.iter().find(|e| e.file_name == file_name)
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.get(file_name).is_some()
    }

    pub fn file_names(&self) -> BTreeSet<&str> {
        self.files.iter().map(|e| e.file_name.as_str()).collect()
    }

    /// Copy of this manifest without any entry whose mod id is excluded.
    #[must_use]
    pub fn without_mod_ids(&self, excluded: &BTreeSet<ModId>) -> Self {
        Self {
            files: self
                .files
                .iter()
                .filter(|e| !excluded.contains(&e.mod_id))
                .cloned()
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, ManifestError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, ManifestError> {
        let raw: RawManifest = serde_json::from_slice(data)?;
        Self::new(raw.files)
    }

    /// Write a pretty-printed snapshot, replacing `path` atomically.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;
        let json = serde_json::to_vec_pretty(self)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| ManifestError::Io(e.error))?;
        Ok(())
    }
}
