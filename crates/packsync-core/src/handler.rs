//! Side handlers: what each install side does with its pack during a launch.

use crate::environment::{DiscoveryAttributes, DiscoveryPipeline, Issue, ProgressReporter, Side};
use crate::lifecycle::{validate_transition, HandlerState};
use crate::CoreError;
use packsync_remote::{exposed_files, sync, HttpBackend, RemoteBackend, RemoteConfig};
use packsync_schema::{
    ClientSettings, FileName, ModFile, PackConfig, ServerSettings, CLIENT_TEMPLATE,
    SERVER_TEMPLATE,
};
use packsync_server::{ServerFileRegistry, ServerHandle, SyncServer};
use packsync_store::{build_manifest, list_jars, PackLayout, PackResolver};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Whether server-provided files were handed to the discovery pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackStatus {
    Loaded { files: Vec<FileName> },
    NotLoaded { reason: String },
}

/// Outcome of activating a side handler.
#[derive(Debug)]
pub struct Activation {
    pub side: Side,
    pub status: PackStatus,
    /// The running sync server, on the server side only.
    pub server: Option<ServerHandle>,
}

impl Activation {
    pub fn is_loaded(&self) -> bool {
        matches!(self.status, PackStatus::Loaded { .. })
    }

    /// One-line status for the progress reporter.
    pub fn message(&self) -> String {
        match (&self.status, &self.server) {
            (PackStatus::Loaded { files }, Some(server)) => format!(
                "Loaded {} server pack files, sharing on {}",
                files.len(),
                server.url()
            ),
            (PackStatus::Loaded { files }, None) if self.side == Side::DedicatedServer => {
                format!("Loaded {} server pack files, not sharing", files.len())
            }
            (PackStatus::Loaded { files }, None) => {
                format!("Loaded {} server pack files", files.len())
            }
            (PackStatus::NotLoaded { reason }, _) => {
                format!("Server pack not loaded: {reason}")
            }
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Load `serverpacklocator.toml`, installing `template` first when missing.
fn load_config(layout: &PackLayout, template: &str) -> Result<PackConfig, CoreError> {
    let path = layout.config_path();
    let (config, installed) = PackConfig::load_or_install(&path, template)?;
    if installed {
        info!("wrote default configuration to {}", path.display());
    }
    Ok(config)
}

/// Run the validating transitions around `check`, landing in `Valid` or
/// `Invalid`.
fn run_validation<T>(
    state: &mut HandlerState,
    check: impl FnOnce() -> Result<T, CoreError>,
) -> Result<T, CoreError> {
    validate_transition(*state, HandlerState::Validating)?;
    *state = HandlerState::Validating;
    match check() {
        Ok(value) => {
            *state = HandlerState::Valid;
            Ok(value)
        }
        Err(e) => {
            error!("{e}");
            *state = HandlerState::Invalid;
            Err(e)
        }
    }
}

fn enter_active(state: &mut HandlerState) -> Result<(), CoreError> {
    validate_transition(*state, HandlerState::Active)?;
    *state = HandlerState::Active;
    Ok(())
}

/// Client side: pull the server's pack into `servermods/` and deliver
/// exactly the manifest's files.
#[derive(Debug)]
pub struct ClientPackHandler {
    layout: PackLayout,
    state: HandlerState,
    settings: Option<ClientSettings>,
}

impl ClientPackHandler {
    pub fn new(layout: PackLayout) -> Self {
        Self {
            layout,
            state: HandlerState::Unconfigured,
            settings: None,
        }
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn settings(&self) -> Option<&ClientSettings> {
        self.settings.as_ref()
    }

    pub fn validate(&mut self) -> Result<(), CoreError> {
        let layout = &self.layout;
        let settings = run_validation(&mut self.state, || {
            let config = load_config(layout, CLIENT_TEMPLATE)?;
            Ok(config.client_settings(&layout.config_path())?)
        })?;
        debug!("client configured for {}", settings.remote_server);
        self.settings = Some(settings);
        Ok(())
    }

    /// Validate if needed, then sync over HTTP(S) and deliver the result.
    pub fn activate(
        &mut self,
        pipeline: &mut dyn DiscoveryPipeline,
        progress: &dyn ProgressReporter,
    ) -> Result<Activation, CoreError> {
        if self.state == HandlerState::Unconfigured {
            self.validate()?;
        }
        let config = RemoteConfig::from_settings(self.valid_settings()?);
        match HttpBackend::new(config) {
            Ok(backend) => self.activate_with(&backend, pipeline, progress),
            Err(e) => {
                enter_active(&mut self.state)?;
                let status = not_loaded(pipeline, &self.layout.server_mods_dir(), e.to_string());
                Ok(client_activation(status, progress))
            }
        }
    }

    /// Like [`activate`](Self::activate) with an explicit backend.
    pub fn activate_with(
        &mut self,
        backend: &dyn RemoteBackend,
        pipeline: &mut dyn DiscoveryPipeline,
        progress: &dyn ProgressReporter,
    ) -> Result<Activation, CoreError> {
        if self.state == HandlerState::Unconfigured {
            self.validate()?;
        }
        let excluded = self.valid_settings()?.excluded_mod_ids.clone();
        enter_active(&mut self.state)?;

        let local_dir = self.layout.server_mods_dir();
        progress.add("Syncing mods from server");
        let result = sync(backend, &excluded, &local_dir);

        let status = match result.manifest {
            Some(manifest) if result.ok => {
                let files = exposed_files(&local_dir, &manifest);
                let delivered = deliver(pipeline, &files, DiscoveryAttributes::ServerPack);
                PackStatus::Loaded { files: delivered }
            }
            _ => {
                let reason = result
                    .error
                    .unwrap_or_else(|| "unknown sync failure".to_owned());
                not_loaded(pipeline, &local_dir, reason)
            }
        };
        Ok(client_activation(status, progress))
    }

    fn valid_settings(&self) -> Result<&ClientSettings, CoreError> {
        match (&self.settings, self.state) {
            (Some(settings), HandlerState::Valid) => Ok(settings),
            _ => Err(CoreError::InvalidTransition {
                from: self.state.to_string(),
                to: HandlerState::Active.to_string(),
            }),
        }
    }
}

/// Warn the pipeline that no server files will be delivered this session.
fn not_loaded(
    pipeline: &mut dyn DiscoveryPipeline,
    local_dir: &Path,
    reason: String,
) -> PackStatus {
    warn!("problem syncing with the server, there will not be any server mods");
    pipeline.add_issue(
        Issue::warning("could not sync mods from the server, starting without them")
            .with_path(local_dir)
            .with_cause(&reason),
    );
    PackStatus::NotLoaded { reason }
}

fn client_activation(status: PackStatus, progress: &dyn ProgressReporter) -> Activation {
    let activation = Activation {
        side: Side::Client,
        status,
        server: None,
    };
    progress.add(&activation.message());
    activation
}

/// Hand `files` to the pipeline, returning the names it accepted.
fn deliver(
    pipeline: &mut dyn DiscoveryPipeline,
    files: &[impl AsRef<Path>],
    attributes: DiscoveryAttributes,
) -> Vec<FileName> {
    let mut delivered = Vec::with_capacity(files.len());
    for path in files {
        match pipeline.read_mod_file(path.as_ref(), attributes) {
            Ok(Some(file)) => {
                delivered.push(file.file_name().clone());
                pipeline.add_mod_file(file);
            }
            Ok(None) => debug!("pipeline skipped {}", path.as_ref().display()),
            Err(issue) => pipeline.add_issue(issue),
        }
    }
    delivered
}

/// Server side: resolve and publish the pack, serve it, and load the
/// server's own files.
#[derive(Debug)]
pub struct ServerPackHandler {
    layout: PackLayout,
    state: HandlerState,
    settings: Option<ServerSettings>,
    bind_host: String,
}

impl ServerPackHandler {
    pub fn new(layout: PackLayout) -> Self {
        Self {
            layout,
            state: HandlerState::Unconfigured,
            settings: None,
            bind_host: DEFAULT_BIND_HOST.to_owned(),
        }
    }

    /// Listen on `host` instead of all interfaces.
    #[must_use]
    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    pub fn state(&self) -> HandlerState {
        self.state
    }

    pub fn settings(&self) -> Option<&ServerSettings> {
        self.settings.as_ref()
    }

    pub fn validate(&mut self) -> Result<(), CoreError> {
        let layout = &self.layout;
        let settings = run_validation(&mut self.state, || {
            let config = load_config(layout, SERVER_TEMPLATE)?;
            Ok(config.server_settings(&layout.config_path())?)
        })?;
        if settings.tls_incomplete {
            warn!("server.ssl needs both certificateChainFile and keyFile; serving without TLS");
        }
        self.settings = Some(settings);
        Ok(())
    }

    /// Discover candidates on both roots and resolve them into the set the
    /// server loads and the set it shares.
    pub fn resolve_pack(
        &self,
        pipeline: &mut dyn DiscoveryPipeline,
    ) -> Result<(Vec<ModFile>, Vec<ModFile>), CoreError> {
        let excluded = self
            .settings
            .as_ref()
            .map(|s| s.excluded_mod_ids.clone())
            .unwrap_or_default();
        let resolver = PackResolver::new(excluded);

        let server_mods = discover_mods(&self.layout.server_mods_dir(), pipeline)?;
        let client_mods = discover_mods(&self.layout.client_mods_dir(), pipeline)?;

        let mut to_share = server_mods.clone();
        to_share.extend(client_mods);

        Ok((resolver.resolve(server_mods), resolver.resolve(to_share)))
    }

    pub fn activate(
        &mut self,
        pipeline: &mut dyn DiscoveryPipeline,
        progress: &dyn ProgressReporter,
    ) -> Result<Activation, CoreError> {
        if self.state == HandlerState::Unconfigured {
            self.validate()?;
        }
        let settings = match (&self.settings, self.state) {
            (Some(settings), HandlerState::Valid) => settings.clone(),
            _ => {
                return Err(CoreError::InvalidTransition {
                    from: self.state.to_string(),
                    to: HandlerState::Active.to_string(),
                })
            }
        };

        progress.add("Building server pack");
        let (to_load, to_share) = self.resolve_pack(pipeline)?;
        enter_active(&mut self.state)?;

        // the server's own mods load even when sharing fails below
        let mut files = Vec::with_capacity(to_load.len());
        for file in to_load {
            files.push(file.file_name().clone());
            pipeline.add_mod_file(file);
        }

        let server = match self.share(&settings, &to_share) {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!("failed to share the server pack: {e}");
                pipeline.add_issue(
                    Issue::error("could not share the server pack, clients will not be able to sync")
                        .with_path(self.layout.server_mods_dir())
                        .with_cause(&e),
                );
                None
            }
        };
        info!("loading {} server pack files", files.len());

        let activation = Activation {
            side: Side::DedicatedServer,
            status: PackStatus::Loaded { files },
            server,
        };
        progress.add(&activation.message());
        Ok(activation)
    }

    /// Build and publish the manifest, write its snapshot and start serving.
    fn share(
        &self,
        settings: &ServerSettings,
        to_share: &[ModFile],
    ) -> Result<ServerHandle, CoreError> {
        let manifest = build_manifest(to_share)?;
        let registry = Arc::new(ServerFileRegistry::new(vec![
            self.layout.server_mods_dir(),
            self.layout.client_mods_dir(),
        ]));
        registry.publish(manifest.clone())?;
        let snapshot = self.layout.manifest_snapshot_path();
        if let Err(e) = manifest.save(&snapshot) {
            warn!("failed to write manifest snapshot {}: {e}", snapshot.display());
        }

        let addr = format!("{}:{}", self.bind_host, settings.port);
        let server = SyncServer::bind(&addr, registry, settings.tls.as_ref())?;
        let handle = server.spawn(settings.workers)?;
        info!("sharing {} files", manifest.len());
        Ok(handle)
    }
}

/// Read every jar in `dir` through the pipeline. Unreadable entries become
/// issues; an unlistable directory is an error.
fn discover_mods(
    dir: &Path,
    pipeline: &mut dyn DiscoveryPipeline,
) -> Result<Vec<ModFile>, CoreError> {
    let mut found = Vec::new();
    for path in list_jars(dir)? {
        if !path.is_file() {
            pipeline.add_issue(Issue::warning("not a regular file").with_path(&path));
            continue;
        }
        match pipeline.read_mod_file(&path, DiscoveryAttributes::Default) {
            Ok(Some(file)) => found.push(file),
            Ok(None) => debug!("pipeline skipped {}", path.display()),
            Err(issue) => pipeline.add_issue(issue),
        }
    }
    Ok(found)
}

/// The handler for one install side.
#[derive(Debug)]
pub enum SidedPackHandler {
    Client(ClientPackHandler),
    Server(ServerPackHandler),
}

impl SidedPackHandler {
    pub fn for_side(side: Side, layout: PackLayout) -> Self {
        match side {
            Side::Client => Self::Client(ClientPackHandler::new(layout)),
            Side::DedicatedServer => Self::Server(ServerPackHandler::new(layout)),
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Self::Client(_) => Side::Client,
            Self::Server(_) => Side::DedicatedServer,
        }
    }

    pub fn state(&self) -> HandlerState {
        match self {
            Self::Client(h) => h.state(),
            Self::Server(h) => h.state(),
        }
    }

    pub fn validate(&mut self) -> Result<(), CoreError> {
        match self {
            Self::Client(h) => h.validate(),
            Self::Server(h) => h.validate(),
        }
    }

    pub fn activate(
        &mut self,
        pipeline: &mut dyn DiscoveryPipeline,
        progress: &dyn ProgressReporter,
    ) -> Result<Activation, CoreError> {
        match self {
            Self::Client(h) => h.activate(pipeline, progress),
            Self::Server(h) => h.activate(pipeline, progress),
        }
    }
}
