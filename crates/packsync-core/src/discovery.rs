//! Built-in discovery pipeline that reads NeoForge/Forge jar metadata.
//!
//! A jar is accepted as a `Mod` when it carries `META-INF/neoforge.mods.toml`
//! (or the older `META-INF/mods.toml`); otherwise the `FMLModType` attribute
//! of `META-INF/MANIFEST.MF` decides its kind. Jars with neither are reported
//! and skipped.

use crate::environment::{DiscoveryAttributes, DiscoveryPipeline, Issue, IssueSeverity};
use packsync_schema::{ModFile, ModFileKind, ModInfo};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

const MODS_TOML_PATHS: [&str; 2] = ["META-INF/neoforge.mods.toml", "META-INF/mods.toml"];
const JAR_MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const JAR_VERSION_PLACEHOLDER: &str = "${file.jarVersion}";
const DEFAULT_MOD_VERSION: &str = "1";
const UNKNOWN_JAR_VERSION: &str = "0.0NONE";

#[derive(Deserialize)]
struct ModsToml {
    #[serde(default)]
    mods: Vec<ModsTomlEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModsTomlEntry {
    mod_id: String,
    version: Option<String>,
}

/// Parse `Key: Value` attributes from the main section of a jar manifest,
/// joining continuation lines.
fn parse_jar_manifest(content: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut current: Option<(String, String)> = None;
    for line in content.lines() {
        if line.is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(rest);
            }
            continue;
        }
        if let Some((key, value)) = current.take() {
            attributes.insert(key, value);
        }
        if let Some((key, value)) = line.split_once(':') {
            current = Some((key.trim().to_owned(), value.trim_start().to_owned()));
        }
    }
    if let Some((key, value)) = current {
        attributes.insert(key, value);
    }
    attributes
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<String>, ZipError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(Some(content))
}

/// Read the metadata of one jar.
///
/// Returns `Ok(None)` for a jar that is neither a mod nor a declared library.
pub fn read_jar(path: &Path) -> Result<Option<ModFile>, Issue> {
    let broken = |cause: &dyn std::fmt::Display| {
        Issue::error("broken mod file")
            .with_path(path)
            .with_cause(cause)
    };

    let file = File::open(path).map_err(|e| broken(&e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| broken(&e))?;

    let attributes = read_entry(&mut archive, JAR_MANIFEST_PATH)
        .map_err(|e| broken(&e))?
        .map(|content| parse_jar_manifest(&content))
        .unwrap_or_default();

    let mut mods_toml = None;
    for candidate in MODS_TOML_PATHS {
        if let Some(content) = read_entry(&mut archive, candidate).map_err(|e| broken(&e))? {
            mods_toml = Some(content);
            break;
        }
    }

    if let Some(content) = mods_toml {
        let parsed: ModsToml = toml::from_str(&content).map_err(|e| {
            Issue::error("invalid mod metadata")
                .with_path(path)
                .with_cause(e)
        })?;
        let jar_version = attributes
            .get("Implementation-Version")
            .map_or(UNKNOWN_JAR_VERSION, String::as_str);
        let infos = parsed
            .mods
            .into_iter()
            .map(|entry| {
                let version = match entry.version.as_deref() {
                    Some(JAR_VERSION_PLACEHOLDER) => jar_version,
                    Some(v) => v,
                    None => DEFAULT_MOD_VERSION,
                };
                ModInfo::new(entry.mod_id, version)
            })
            .collect();
        return Ok(Some(ModFile::new(path, ModFileKind::Mod, infos)));
    }

    match attributes.get("FMLModType") {
        Some(value) => match ModFileKind::from_fml_type(value) {
            Some(kind) => Ok(Some(ModFile::new(path, kind, Vec::new()))),
            None => Err(Issue::error(format!("unsupported FMLModType '{value}'")).with_path(path)),
        },
        None => Ok(None),
    }
}

/// Collects accepted files and issues, reading jars from disk.
#[derive(Debug, Default)]
pub struct JarDiscovery {
    accepted: Vec<ModFile>,
    issues: Vec<Issue>,
}

impl JarDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepted(&self) -> &[ModFile] {
        &self.accepted
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error)
    }

    pub fn into_parts(self) -> (Vec<ModFile>, Vec<Issue>) {
        (self.accepted, self.issues)
    }
}

impl DiscoveryPipeline for JarDiscovery {
    fn read_mod_file(
        &mut self,
        path: &Path,
        _attributes: DiscoveryAttributes,
    ) -> Result<Option<ModFile>, Issue> {
        match read_jar(path)? {
            Some(file) => Ok(Some(file)),
            None => Err(
                Issue::warning("not a mod file: no mod metadata or FMLModType").with_path(path)
            ),
        }
    }

    fn add_mod_file(&mut self, file: ModFile) {
        tracing::debug!("accepted {} ({})", file.file_name(), file.kind());
        self.accepted.push(file);
    }

    fn add_issue(&mut self, issue: Issue) {
        match issue.severity {
            IssueSeverity::Warning => tracing::warn!("{issue}"),
            IssueSeverity::Error => tracing::error!("{issue}"),
        }
        self.issues.push(issue);
    }
}
