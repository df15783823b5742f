use crate::environment::{DiscoveryPipeline, LaunchEnvironment, ProgressReporter, Side};
use crate::handler::{Activation, SidedPackHandler};
use crate::CoreError;
use packsync_store::PackLayout;
use tracing::{info, warn};

/// Entry point called by the host before mod discovery.
///
/// Prepares the pack directories for the launch side, validates the side's
/// configuration, and activates its handler. Configuration errors are
/// returned before any network or discovery activity.
pub fn find_candidates(
    env: &LaunchEnvironment,
    pipeline: &mut dyn DiscoveryPipeline,
    progress: &dyn ProgressReporter,
) -> Result<Activation, CoreError> {
    info!(
        "loading server pack locator {} for {} in {}",
        env!("CARGO_PKG_VERSION"),
        env.side(),
        env.game_dir().display()
    );

    let layout = PackLayout::new(env.game_dir());
    layout.ensure_server_mods_dir()?;
    if env.side() == Side::DedicatedServer {
        layout.ensure_client_mods_dir()?;
    }

    let mut handler = SidedPackHandler::for_side(env.side(), layout);
    if let Err(e) = handler.validate() {
        warn!("the server pack locator is not in a valid state, it will not load any mods");
        progress.add("Server pack configuration is invalid, no server mods will be loaded");
        return Err(e);
    }
    handler.activate(pipeline, progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::JarDiscovery;
    use crate::environment::TracingProgress;
    use std::fs;

    #[test]
    fn invalid_client_config_stops_before_sync() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("servermods")).unwrap();
        fs::write(
            dir.path().join("servermods/serverpacklocator.toml"),
            "[client]\nexcludedModIds = []\n",
        )
        .unwrap();

        let env = LaunchEnvironment::new(dir.path(), Side::Client);
        let mut discovery = JarDiscovery::new();
        let err = find_candidates(&env, &mut discovery, &TracingProgress).unwrap_err();
        assert!(err.is_config());
        assert!(dir.path().join("servermods").is_dir());
        assert!(!dir.path().join("clientmods").exists());
        assert!(discovery.accepted().is_empty());
    }

    #[test]
    fn invalid_server_config_creates_clientmods_but_does_not_serve() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("servermods")).unwrap();
        fs::write(
            dir.path().join("servermods/serverpacklocator.toml"),
            "[server]\n",
        )
        .unwrap();

        let env = LaunchEnvironment::new(dir.path(), Side::DedicatedServer);
        let mut discovery = JarDiscovery::new();
        let err = find_candidates(&env, &mut discovery, &TracingProgress).unwrap_err();
        assert!(err.to_string().contains("server.port"));
        assert!(dir.path().join("clientmods").is_dir());
        assert!(!dir.path().join("servermods/servermanifest.json").exists());
    }
}
