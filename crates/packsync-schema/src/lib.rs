//! Manifest model, mod file metadata, version ordering, and configuration for packsync.
//!
//! This crate defines the schema layer: the wire manifest shared between the
//! sync server and its clients (`Manifest`, `FileEntry`), the discovery-side
//! view of a candidate file (`ModFile`), Maven-style version ordering
//! (`ArtifactVersion`), and `serverpacklocator.toml` loading with per-side
//! validation (`PackConfig`).

pub mod config;
pub mod manifest;
pub mod modfile;
pub mod types;
pub mod version;

pub use config::{
    ClientSettings, ConfigError, PackConfig, ServerSettings, TlsFiles, CLIENT_TEMPLATE,
    CONFIG_FILE_NAME, SERVER_TEMPLATE,
};
pub use manifest::{FileEntry, Manifest, ManifestError};
pub use modfile::{ModFile, ModFileKind, ModInfo};
pub use types::{ContentHash, FileName, ModId};
pub use version::ArtifactVersion;

use std::path::{Component, Path, PathBuf};

/// Returns `true` when `name` is a single plain path component, safe to join
/// onto a directory without escaping it.
pub fn is_plain_file_name(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Join `name` onto `root` only if the result is a direct child of `root`.
pub fn resolve_direct_child(root: &Path, name: &str) -> Option<PathBuf> {
    if !is_plain_file_name(name) {
        return None;
    }
    let path = root.join(name);
    (path.parent() == Some(root)).then_some(path)
}
