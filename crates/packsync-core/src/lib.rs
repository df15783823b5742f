//! Launch-time orchestration for packsync.
//!
//! This crate ties together configuration, local storage, the sync server and
//! the sync client into the side handlers that run before the host's mod
//! discovery: the server handler resolves and publishes its pack and starts
//! serving it, the client handler pulls that pack and hands exactly the
//! manifest's files to the discovery pipeline. It also provides the handler
//! state machine, a jar-reading discovery pipeline, and signal handling.

pub mod concurrency;
pub mod discovery;
pub mod environment;
pub mod handler;
pub mod lifecycle;
pub mod locator;

pub use concurrency::{install_signal_handler, shutdown_requested, wait_for_shutdown};
pub use discovery::{read_jar, JarDiscovery};
pub use environment::{
    DiscoveryAttributes, DiscoveryPipeline, Issue, IssueSeverity, LaunchEnvironment,
    ProgressReporter, Side, TracingProgress,
};
pub use handler::{Activation, ClientPackHandler, PackStatus, ServerPackHandler, SidedPackHandler};
pub use lifecycle::{validate_transition, HandlerState};
pub use locator::find_candidates;
pub use packsync_server::ServerHandle;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] packsync_schema::ConfigError),
    #[error("manifest error: {0}")]
    Manifest(#[from] packsync_schema::ManifestError),
    #[error("store error: {0}")]
    Store(#[from] packsync_store::StoreError),
    #[error("registry error: {0}")]
    Registry(#[from] packsync_server::RegistryError),
    #[error("server error: {0}")]
    Server(#[from] packsync_server::ServerError),
    #[error("remote error: {0}")]
    Remote(#[from] packsync_remote::RemoteError),
    #[error("invalid state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Configuration problems the operator has to fix by hand.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn config_error_is_transparent() {
        let err = CoreError::from(packsync_schema::ConfigError::MissingField {
            path: PathBuf::from("/game/servermods/serverpacklocator.toml"),
            field: "client.remoteServer",
        });
        assert!(err.is_config());
        let msg = err.to_string();
        assert!(msg.contains("serverpacklocator.toml"));
        assert!(msg.contains("Repair or delete"));
    }

    #[test]
    fn transition_error_names_states() {
        let err = CoreError::InvalidTransition {
            from: "invalid".to_owned(),
            to: "active".to_owned(),
        };
        assert!(!err.is_config());
        assert_eq!(err.to_string(), "invalid state transition: invalid -> active");
    }
}
