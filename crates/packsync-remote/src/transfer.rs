use crate::{RemoteBackend, RemoteError, SyncLock};
use packsync_schema::{is_plain_file_name, resolve_direct_child, ContentHash, Manifest, ModId};
use packsync_store::hash_file;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const STAGING_PREFIX: &str = ".packsync-staging-";

/// Result of a pull operation.
#[derive(Debug)]
pub struct PullResult {
    /// Server manifest after the exclusion filter.
    pub manifest: Manifest,
    pub files_downloaded: usize,
    pub files_skipped: usize,
}

/// Outcome of [`sync`]: either a completed pull or the reason it failed.
#[derive(Debug)]
pub struct SyncResult {
    pub ok: bool,
    pub manifest: Option<Manifest>,
    pub report: Option<PullResult>,
    pub error: Option<String>,
}

impl SyncResult {
    fn success(report: PullResult) -> Self {
        Self {
            ok: true,
            manifest: Some(report.manifest.clone()),
            report: Some(report),
            error: None,
        }
    }

    fn failure(error: &RemoteError) -> Self {
        Self {
            ok: false,
            manifest: None,
            report: None,
            error: Some(error.to_string()),
        }
    }
}

/// Bring `local_dir` in line with the server's manifest.
///
/// Files already present with a matching checksum are kept. Everything else
/// is downloaded into a staging directory, verified, and moved into place
/// only once every download has succeeded. Local files the manifest does not
/// list are left alone.
pub fn pull_pack(
    backend: &dyn RemoteBackend,
    excluded: &BTreeSet<ModId>,
    local_dir: &Path,
) -> Result<PullResult, RemoteError> {
    let _lock = SyncLock::try_acquire(local_dir)?;

    // 1. Fetch the manifest and drop excluded mods
    let manifest = backend.get_manifest()?.without_mod_ids(excluded);
    tracing::info!("server manifest lists {} files", manifest.len());

    // 2. Reject names that would land outside local_dir
    if let Some(bad) = manifest
        .files()
        .iter()
        .find(|e| !is_plain_file_name(e.file_name.as_str()))
    {
        return Err(RemoteError::UnsafeFileName(bad.file_name.to_string()));
    }

    // 3. Work out which entries are missing or stale
    let mut pending = Vec::new();
    let mut files_skipped = 0;
    for entry in manifest.files() {
        let target = local_dir.join(entry.file_name.as_str());
        if local_matches(&target, &entry.checksum) {
            tracing::debug!("{} is up to date", entry.file_name);
            files_skipped += 1;
        } else {
            pending.push(entry);
        }
    }

    if pending.is_empty() {
        return Ok(PullResult {
            manifest,
            files_downloaded: 0,
            files_skipped,
        });
    }

    // 4. Download and verify into staging
    let staging = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .tempdir_in(local_dir)?;
    for entry in &pending {
        let name = entry.file_name.as_str();
        tracing::info!("downloading {name}");
        let data = backend.get_file(name)?;
        let actual = ContentHash::from_bytes(&data);
        if actual != entry.checksum {
            return Err(RemoteError::IntegrityFailure {
                file: name.to_owned(),
                expected: entry.checksum.to_hex(),
                actual: actual.to_hex(),
            });
        }
        fs::write(staging.path().join(name), &data)?;
    }

    // 5. Move everything into place
    for entry in &pending {
        let name = entry.file_name.as_str();
        fs::rename(staging.path().join(name), local_dir.join(name))?;
    }

    Ok(PullResult {
        files_downloaded: pending.len(),
        manifest,
        files_skipped,
    })
}

fn local_matches(path: &Path, expected: &ContentHash) -> bool {
    if !path.is_file() {
        return false;
    }
    match hash_file(path) {
        Ok(actual) if actual == *expected => true,
        Ok(_) => {
            tracing::info!("{} differs from the server copy", path.display());
            false
        }
        Err(e) => {
            tracing::warn!("cannot hash {}: {e}", path.display());
            false
        }
    }
}

/// Run [`pull_pack`], turning any error into a failed [`SyncResult`].
pub fn sync(
    backend: &dyn RemoteBackend,
    excluded: &BTreeSet<ModId>,
    local_dir: &Path,
) -> SyncResult {
    match pull_pack(backend, excluded, local_dir) {
        Ok(report) => {
            tracing::info!(
                "pack sync complete: {} downloaded, {} up to date",
                report.files_downloaded,
                report.files_skipped
            );
            SyncResult::success(report)
        }
        Err(e) => {
            tracing::warn!("pack sync failed: {e}");
            SyncResult::failure(&e)
        }
    }
}

/// Files in `local_dir` that belong to `manifest`, in manifest order.
pub fn exposed_files(local_dir: &Path, manifest: &Manifest) -> Vec<PathBuf> {
    manifest
        .files()
        .iter()
        .filter_map(|e| resolve_direct_child(local_dir, e.file_name.as_str()))
        .filter(|p| p.is_file())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use packsync_schema::FileEntry;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory backend with optional per-file failures.
    struct MockRemote {
        manifest: Manifest,
        files: HashMap<String, Vec<u8>>,
        failing: BTreeSet<String>,
        fetched: Mutex<Vec<String>>,
        manifest_calls: AtomicUsize,
    }

    impl MockRemote {
        fn new(files: &[(&str, &str, &str)]) -> Self {
            let manifest = Manifest::new(
                files
                    .iter()
                    .map(|(id, name, data)| {
                        FileEntry::new(*id, ContentHash::from_bytes(data.as_bytes()), *name)
                    })
                    .collect(),
            )
            .unwrap();
            Self {
                manifest,
                files: files
                    .iter()
                    .map(|(_, name, data)| ((*name).to_owned(), data.as_bytes().to_vec()))
                    .collect(),
                failing: BTreeSet::new(),
                fetched: Mutex::new(Vec::new()),
                manifest_calls: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, name: &str) -> Self {
            self.failing.insert(name.to_owned());
            self
        }

        fn corrupt(mut self, name: &str) -> Self {
            self.files.insert(name.to_owned(), b"tampered".to_vec());
            self
        }

        fn fetched(&self) -> Vec<String> {
            self.fetched.lock().unwrap().clone()
        }
    }

    impl RemoteBackend for MockRemote {
        fn get_manifest(&self) -> Result<Manifest, RemoteError> {
            self.manifest_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.manifest.clone())
        }

        fn get_file(&self, file_name: &str) -> Result<Vec<u8>, RemoteError> {
            self.fetched.lock().unwrap().push(file_name.to_owned());
            if self.failing.contains(file_name) {
                return Err(RemoteError::Http(format!("connection reset on {file_name}")));
            }
            self.files
                .get(file_name)
                .cloned()
                .ok_or_else(|| RemoteError::NotFound(file_name.to_owned()))
        }
    }

    fn no_exclusions() -> BTreeSet<ModId> {
        BTreeSet::new()
    }

    fn dir_listing(dir: &Path) -> BTreeSet<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| !n.starts_with(".packsync"))
            .collect()
    }

    #[test]
    fn pull_downloads_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "aaa"), ("b", "b.jar", "bbb")]);
        let result = pull_pack(&remote, &no_exclusions(), dir.path()).unwrap();
        assert_eq!(result.files_downloaded, 2);
        assert_eq!(result.files_skipped, 0);
        assert_eq!(fs::read(dir.path().join("a.jar")).unwrap(), b"aaa");
        assert_eq!(fs::read(dir.path().join("b.jar")).unwrap(), b"bbb");
    }

    #[test]
    fn pull_skips_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jar"), b"aaa").unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "aaa"), ("b", "b.jar", "bbb")]);
        let result = pull_pack(&remote, &no_exclusions(), dir.path()).unwrap();
        assert_eq!(result.files_downloaded, 1);
        assert_eq!(result.files_skipped, 1);
        assert_eq!(remote.fetched(), vec!["b.jar".to_owned()]);
    }

    #[test]
    fn pull_refetches_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jar"), b"old build").unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "new build")]);
        let result = pull_pack(&remote, &no_exclusions(), dir.path()).unwrap();
        assert_eq!(result.files_downloaded, 1);
        assert_eq!(fs::read(dir.path().join("a.jar")).unwrap(), b"new build");
    }

    #[test]
    fn exposed_files_follow_manifest_not_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jar"), b"aaa").unwrap();
        fs::write(dir.path().join("c.jar"), b"ccc").unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "aaa"), ("b", "b.jar", "bbb")]);

        let result = sync(&remote, &no_exclusions(), dir.path());
        assert!(result.ok);
        let manifest = result.manifest.unwrap();
        let exposed = exposed_files(dir.path(), &manifest);
        assert_eq!(
            exposed,
            vec![dir.path().join("a.jar"), dir.path().join("b.jar")]
        );
        // extraneous files are left on disk, just not exposed
        assert!(dir.path().join("c.jar").exists());
    }

    #[test]
    fn failure_mid_pull_leaves_directory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.jar"), b"stale a").unwrap();
        let before = dir_listing(dir.path());
        let remote = MockRemote::new(&[
            ("a", "a.jar", "aaa"),
            ("b", "b.jar", "bbb"),
            ("c", "c.jar", "ccc"),
        ])
        .failing_on("b.jar");

        let result = sync(&remote, &no_exclusions(), dir.path());
        assert!(!result.ok);
        assert!(result.manifest.is_none());
        assert!(result.error.unwrap().contains("b.jar"));
        assert_eq!(remote.fetched(), vec!["a.jar".to_owned(), "b.jar".to_owned()]);
        assert_eq!(dir_listing(dir.path()), before);
        assert_eq!(fs::read(dir.path().join("a.jar")).unwrap(), b"stale a");
    }

    #[test]
    fn staging_directory_removed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "aaa")]).failing_on("a.jar");
        assert!(pull_pack(&remote, &no_exclusions(), dir.path()).is_err());
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(STAGING_PREFIX))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn checksum_mismatch_is_integrity_failure() {
        let dir = tempfile::tempdir().unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "aaa")]).corrupt("a.jar");
        let err = pull_pack(&remote, &no_exclusions(), dir.path()).unwrap_err();
        assert!(matches!(err, RemoteError::IntegrityFailure { ref file, .. } if file == "a.jar"));
        assert!(!dir.path().join("a.jar").exists());
    }

    #[test]
    fn unsafe_names_rejected_before_download() {
        let dir = tempfile::tempdir().unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "aaa"), ("x", "../x.jar", "x")]);
        let err = pull_pack(&remote, &no_exclusions(), dir.path()).unwrap_err();
        assert!(matches!(err, RemoteError::UnsafeFileName(ref n) if n == "../x.jar"));
        assert!(remote.fetched().is_empty());
    }

    #[test]
    fn excluded_mods_are_neither_fetched_nor_exposed() {
        let dir = tempfile::tempdir().unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "aaa"), ("shaders", "shaders.jar", "s")]);
        let excluded = BTreeSet::from([ModId::new("shaders")]);
        let result = pull_pack(&remote, &excluded, dir.path()).unwrap();
        assert_eq!(result.manifest.len(), 1);
        assert_eq!(remote.fetched(), vec!["a.jar".to_owned()]);
        assert_eq!(
            exposed_files(dir.path(), &result.manifest),
            vec![dir.path().join("a.jar")]
        );
    }

    #[test]
    fn overlapping_sync_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let _held = SyncLock::try_acquire(dir.path()).unwrap();
        let remote = MockRemote::new(&[("a", "a.jar", "aaa")]);
        let err = pull_pack(&remote, &no_exclusions(), dir.path()).unwrap_err();
        assert!(matches!(err, RemoteError::SyncInProgress(_)));
        assert_eq!(remote.manifest_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_manifest_syncs_and_exposes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("local.jar"), b"x").unwrap();
        let remote = MockRemote::new(&[]);
        let result = sync(&remote, &no_exclusions(), dir.path());
        assert!(result.ok);
        assert!(exposed_files(dir.path(), &result.manifest.unwrap()).is_empty());
    }
}
