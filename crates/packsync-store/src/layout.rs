use crate::StoreError;
use packsync_schema::CONFIG_FILE_NAME;
use std::fs;
use std::path::{Path, PathBuf};

pub const SERVER_MODS_DIR: &str = "servermods";
pub const CLIENT_MODS_DIR: &str = "clientmods";
pub const MANIFEST_SNAPSHOT: &str = "servermanifest.json";

/// Directory layout under a game directory.
///
/// `servermods/` holds the config, the manifest snapshot and the files the
/// server loads (or, on a client, the files downloaded from the server).
/// `clientmods/` holds files the server only shares.
#[derive(Debug, Clone)]
pub struct PackLayout {
    game_dir: PathBuf,
}

impl PackLayout {
    pub fn new(game_dir: impl Into<PathBuf>) -> Self {
        Self {
            game_dir: game_dir.into(),
        }
    }

    #[inline]
    pub fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    #[inline]
    pub fn server_mods_dir(&self) -> PathBuf {
        self.game_dir.join(SERVER_MODS_DIR)
    }

    #[inline]
    pub fn client_mods_dir(&self) -> PathBuf {
        self.game_dir.join(CLIENT_MODS_DIR)
    }

    #[inline]
    pub fn config_path(&self) -> PathBuf {
        self.server_mods_dir().join(CONFIG_FILE_NAME)
    }

    #[inline]
    pub fn manifest_snapshot_path(&self) -> PathBuf {
        self.server_mods_dir().join(MANIFEST_SNAPSHOT)
    }

    /// Create `servermods/` and return its path.
    pub fn ensure_server_mods_dir(&self) -> Result<PathBuf, StoreError> {
        create_or_get_directory(&self.server_mods_dir())
    }

    /// Create `clientmods/` and return its path.
    pub fn ensure_client_mods_dir(&self) -> Result<PathBuf, StoreError> {
        create_or_get_directory(&self.client_mods_dir())
    }
}

fn create_or_get_directory(path: &Path) -> Result<PathBuf, StoreError> {
    fs::create_dir_all(path).map_err(|e| StoreError::io(path, e))?;
    Ok(path.to_path_buf())
}

/// List `*.jar` entries of `dir` (case-insensitive extension), sorted by
/// lowercase file name. Non-regular entries are included so callers can
/// report them.
pub fn list_jars(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut jars = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let name = entry.file_name().to_string_lossy().to_lowercase();
        if name.ends_with(".jar") {
            jars.push((name, entry.path()));
        }
    }
    jars.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(jars.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = PackLayout::new("/game");
        assert_eq!(layout.server_mods_dir(), PathBuf::from("/game/servermods"));
        assert_eq!(layout.client_mods_dir(), PathBuf::from("/game/clientmods"));
        assert_eq!(
            layout.config_path(),
            PathBuf::from("/game/servermods/serverpacklocator.toml")
        );
        assert_eq!(
            layout.manifest_snapshot_path(),
            PathBuf::from("/game/servermods/servermanifest.json")
        );
    }

    #[test]
    fn ensure_dirs_creates_them() {
        let dir = tempfile::tempdir().unwrap();
        let layout = PackLayout::new(dir.path());
        let server = layout.ensure_server_mods_dir().unwrap();
        let client = layout.ensure_client_mods_dir().unwrap();
        assert!(server.is_dir());
        assert!(client.is_dir());
        // idempotent
        layout.ensure_server_mods_dir().unwrap();
    }

    #[test]
    fn list_jars_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jar", "A.JAR", "c.txt", "serverpacklocator.toml"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let jars = list_jars(dir.path()).unwrap();
        let names: Vec<_> = jars
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["A.JAR", "b.jar"]);
    }

    #[test]
    fn list_jars_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_jars(&dir.path().join("nope")).is_err());
    }
}
