use crate::types::{FileName, ModId};
use crate::version::ArtifactVersion;
use std::fmt;
use std::path::{Path, PathBuf};

/// Artifact type declared by a jar (`FMLModType` in its manifest, or `Mod`
/// when it carries mod metadata).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModFileKind {
    Mod,
    Library,
    GameLibrary,
}

impl ModFileKind {
    /// Parse an `FMLModType` manifest attribute value.
    pub fn from_fml_type(value: &str) -> Option<Self> {
        match value.trim() {
            "MOD" => Some(Self::Mod),
            "LIBRARY" => Some(Self::Library),
            "GAMELIBRARY" => Some(Self::GameLibrary),
            _ => None,
        }
    }
}

impl fmt::Display for ModFileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mod => write!(f, "mod"),
            Self::Library => write!(f, "library"),
            Self::GameLibrary => write!(f, "game library"),
        }
    }
}

/// One `[[mods]]` entry of a jar's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModInfo {
    pub mod_id: ModId,
    pub version: ArtifactVersion,
}

impl ModInfo {
    pub fn new(mod_id: impl Into<ModId>, version: &str) -> Self {
        Self {
            mod_id: mod_id.into(),
            version: ArtifactVersion::parse(version),
        }
    }
}

/// A candidate file accepted by the discovery pipeline.
///
/// The resolver and manifest builder only read these handles; file contents
/// are touched solely by the content hasher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModFile {
    path: PathBuf,
    file_name: FileName,
    kind: ModFileKind,
    mod_infos: Vec<ModInfo>,
}

impl ModFile {
    pub fn new(path: impl Into<PathBuf>, kind: ModFileKind, mod_infos: Vec<ModInfo>) -> Self {
        let path = path.into();
        let file_name = FileName::new(
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        );
        Self {
            path,
            file_name,
            kind,
            mod_infos,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &FileName {
        &self.file_name
    }

    pub fn kind(&self) -> ModFileKind {
        self.kind
    }

    pub fn mod_infos(&self) -> &[ModInfo] {
        &self.mod_infos
    }

    /// Grouping identity: first declared mod id for mod artifacts, the file
    /// name for everything else.
    pub fn root_mod_id(&self) -> ModId {
        match (self.kind, self.mod_infos.first()) {
            (ModFileKind::Mod, Some(info)) => info.mod_id.clone(),
            _ => ModId::new(self.file_name.as_str()),
        }
    }

    /// Version of the first declared mod, if any.
    pub fn root_version(&self) -> Option<&ArtifactVersion> {
        self.mod_infos.first().map(|info| &info.version)
    }
}
