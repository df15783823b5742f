//! `serverpacklocator.toml` loading and per-side validation.

use crate::types::ModId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "serverpacklocator.toml";
pub const CLIENT_TEMPLATE: &str = include_str!("../templates/defaultclientconfig.toml");
pub const SERVER_TEMPLATE: &str = include_str!("../templates/defaultserverconfig.toml");

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration file {path}: {source}. Repair or delete this file to continue")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error(
        "invalid configuration file {path}: missing required field '{field}'. Repair or delete this file to continue"
    )]
    MissingField { path: PathBuf, field: &'static str },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PackConfig {
    #[serde(default)]
    pub client: Option<ClientSection>,
    #[serde(default)]
    pub server: Option<ServerSection>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientSection {
    #[serde(default)]
    pub remote_server: Option<String>,
    #[serde(default)]
    pub excluded_mod_ids: Vec<String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default)]
    pub trusted_certificate_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSection {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub excluded_mod_ids: Vec<String>,
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default)]
    pub ssl: Option<SslSection>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SslSection {
    #[serde(default)]
    pub certificate_chain_file: Option<PathBuf>,
    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

/// Validated client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub remote_server: String,
    pub excluded_mod_ids: BTreeSet<ModId>,
    pub timeout: Duration,
    pub trusted_certificate_file: Option<PathBuf>,
}

/// PEM files for the sync server's TLS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub certificate_chain_file: PathBuf,
    pub key_file: PathBuf,
}

/// Validated server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    pub port: u16,
    pub excluded_mod_ids: BTreeSet<ModId>,
    pub workers: usize,
    /// Present only when both PEM paths are configured.
    pub tls: Option<TlsFiles>,
    /// Set when exactly one of the two PEM paths is configured.
    pub tls_incomplete: bool,
}

fn to_mod_ids(ids: &[String]) -> BTreeSet<ModId> {
    ids.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ModId::from)
        .collect()
}

impl PackConfig {
    pub fn parse_str(input: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content, path)
    }

    /// Load `path`, first writing `template` there if the file does not exist.
    ///
    /// Returns the config and whether the template was installed.
    pub fn load_or_install(path: &Path, template: &str) -> Result<(Self, bool), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let installed = if path.exists() {
            false
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
            fs::write(path, template).map_err(io_err)?;
            true
        };
        Ok((Self::load(path)?, installed))
    }

    pub fn client_settings(&self, path: &Path) -> Result<ClientSettings, ConfigError> {
        let missing = |field| ConfigError::MissingField {
            path: path.to_path_buf(),
            field,
        };
        let section = self.client.as_ref().ok_or_else(|| missing("client"))?;
        let remote_server = section
            .remote_server
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("client.remoteServer"))?;

        Ok(ClientSettings {
            remote_server: remote_server.trim_end_matches('/').to_owned(),
            excluded_mod_ids: to_mod_ids(&section.excluded_mod_ids),
            timeout: Duration::from_secs(section.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            trusted_certificate_file: section.trusted_certificate_file.clone(),
        })
    }

    pub fn server_settings(&self, path: &Path) -> Result<ServerSettings, ConfigError> {
        let missing = |field| ConfigError::MissingField {
            path: path.to_path_buf(),
            field,
        };
        let section = self.server.as_ref().ok_or_else(|| missing("server"))?;
        let port = section.port.ok_or_else(|| missing("server.port"))?;

        let (tls, tls_incomplete) = match section.ssl.as_ref() {
            Some(SslSection {
                certificate_chain_file: Some(cert),
                key_file: Some(key),
            }) => (
                Some(TlsFiles {
                    certificate_chain_file: cert.clone(),
                    key_file: key.clone(),
                }),
                false,
            ),
            Some(SslSection {
                certificate_chain_file: None,
                key_file: None,
            })
            | None => (None, false),
            Some(_) => (None, true),
        };

        Ok(ServerSettings {
            port,
            excluded_mod_ids: to_mod_ids(&section.excluded_mod_ids),
            workers: section.workers.unwrap_or(DEFAULT_WORKERS).max(1),
            tls,
            tls_incomplete,
        })
    }
}
