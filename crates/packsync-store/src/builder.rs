use crate::hash::hash_file;
use crate::StoreError;
use packsync_schema::{FileEntry, Manifest, ModFile};
use tracing::debug;

/// Build a manifest from an already-resolved file list.
///
/// Every file is hashed now; a single unreadable file aborts the build so a
/// partial manifest is never published.
pub fn build_manifest(files: &[ModFile]) -> Result<Manifest, StoreError> {
    debug!("generating manifest for {} files", files.len());
    let mut entries = Vec::with_capacity(files.len());
    for file in files {
        let checksum = hash_file(file.path()).map_err(|e| StoreError::ManifestBuild {
            file: file.file_name().to_string(),
            source: Box::new(e),
        })?;
        entries.push(FileEntry::new(
            file.root_mod_id(),
            checksum,
            file.file_name().clone(),
        ));
    }
    Ok(Manifest::new(entries)?)
}
