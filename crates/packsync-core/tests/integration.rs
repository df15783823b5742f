//! Server and client handlers talking over a real sync server.

use packsync_core::{
    find_candidates, HandlerState, JarDiscovery, LaunchEnvironment, PackStatus,
    ServerPackHandler, Side, TracingProgress,
};
use packsync_schema::Manifest;
use packsync_store::PackLayout;
use std::fs;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn write_mod_jar(path: &Path, mod_id: &str, version: &str) {
    let file = fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    zip.start_file("META-INF/neoforge.mods.toml", options).unwrap();
    write!(
        zip,
        "modLoader = \"javafml\"\nloaderVersion = \"[1,)\"\n\n[[mods]]\nmodId = \"{mod_id}\"\nversion = \"{version}\"\n"
    )
    .unwrap();
    zip.finish().unwrap();
}

fn write_config(game_dir: &Path, content: &str) {
    let dir = game_dir.join("servermods");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("serverpacklocator.toml"), content).unwrap();
}

/// A server game dir with two versions of `core`, a server-only mod, and a
/// client-only mod.
fn server_game_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        "[server]\nport = 0\nexcludedModIds = [\"serverutils\"]\nworkers = 2\n",
    );
    let server_mods = dir.path().join("servermods");
    let client_mods = dir.path().join("clientmods");
    fs::create_dir_all(&client_mods).unwrap();
    write_mod_jar(&server_mods.join("core-1.0.jar"), "core", "1.0");
    write_mod_jar(&server_mods.join("serverutils-2.0.jar"), "serverutils", "2.0");
    write_mod_jar(&client_mods.join("core-1.1.jar"), "core", "1.1");
    write_mod_jar(&client_mods.join("minimap-3.0.jar"), "minimap", "3.0");
    dir
}

fn names(status: &PackStatus) -> Vec<String> {
    match status {
        PackStatus::Loaded { files } => files.iter().map(ToString::to_string).collect(),
        PackStatus::NotLoaded { reason } => panic!("not loaded: {reason}"),
    }
}

#[test]
fn server_to_client_end_to_end() {
    let server_dir = server_game_dir();
    let mut server = ServerPackHandler::new(PackLayout::new(server_dir.path()))
        .with_bind_host("127.0.0.1");
    let mut server_discovery = JarDiscovery::new();
    let server_activation = server
        .activate(&mut server_discovery, &TracingProgress)
        .unwrap();
    assert_eq!(server.state(), HandlerState::Active);
    // the server loads only servermods, minus excluded ids
    assert_eq!(names(&server_activation.status), vec!["core-1.0.jar"]);

    let snapshot =
        fs::read(server_dir.path().join("servermods/servermanifest.json")).unwrap();
    let shared = Manifest::from_bytes(&snapshot).unwrap();
    assert_eq!(
        shared.file_names().into_iter().collect::<Vec<_>>(),
        vec!["core-1.1.jar", "minimap-3.0.jar"]
    );

    let url = server_activation.server.as_ref().unwrap().url();
    let client_dir = tempfile::tempdir().unwrap();
    write_config(
        client_dir.path(),
        &format!("[client]\nremoteServer = \"{url}\"\ntimeoutSeconds = 5\n"),
    );
    let stray = client_dir.path().join("servermods/stray-0.1.jar");
    write_mod_jar(&stray, "stray", "0.1");

    let env = LaunchEnvironment::new(client_dir.path(), Side::Client);
    let mut client_discovery = JarDiscovery::new();
    let client_activation =
        find_candidates(&env, &mut client_discovery, &TracingProgress).unwrap();

    assert_eq!(
        names(&client_activation.status),
        vec!["core-1.1.jar", "minimap-3.0.jar"]
    );
    let accepted: Vec<_> = client_discovery
        .accepted()
        .iter()
        .map(|f| f.file_name().to_string())
        .collect();
    assert_eq!(accepted, vec!["core-1.1.jar", "minimap-3.0.jar"]);
    assert!(stray.exists(), "extraneous local files are hidden, not deleted");
    assert!(client_discovery.issues().is_empty());

    let handle = server_activation.server.unwrap();
    handle.shutdown();
    handle.join();
}

#[test]
fn client_without_server_starts_degraded() {
    let client_dir = tempfile::tempdir().unwrap();
    write_config(
        client_dir.path(),
        "[client]\nremoteServer = \"http://127.0.0.1:1\"\ntimeoutSeconds = 2\n",
    );
    let env = LaunchEnvironment::new(client_dir.path(), Side::Client);
    let mut discovery = JarDiscovery::new();
    let activation = find_candidates(&env, &mut discovery, &TracingProgress).unwrap();

    assert!(!activation.is_loaded());
    assert!(discovery.accepted().is_empty());
    assert_eq!(discovery.issues().len(), 1);
}

#[test]
fn missing_remote_server_is_fatal_before_connecting() {
    let client_dir = tempfile::tempdir().unwrap();
    write_config(client_dir.path(), "[client]\nexcludedModIds = []\n");
    let env = LaunchEnvironment::new(client_dir.path(), Side::Client);
    let mut discovery = JarDiscovery::new();

    let err = find_candidates(&env, &mut discovery, &TracingProgress).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("Repair or delete"));
    assert!(discovery.issues().is_empty());
    assert!(!client_dir.path().join("servermods/.packsync.lock").exists());
}

#[test]
fn missing_port_is_fatal_before_serving() {
    let server_dir = tempfile::tempdir().unwrap();
    write_config(server_dir.path(), "[server]\nexcludedModIds = []\n");
    let env = LaunchEnvironment::new(server_dir.path(), Side::DedicatedServer);
    let mut discovery = JarDiscovery::new();

    let err = find_candidates(&env, &mut discovery, &TracingProgress).unwrap_err();
    assert!(err.is_config());
    assert!(err.to_string().contains("server.port"));
    assert!(!server_dir.path().join("servermods/servermanifest.json").exists());
}

#[test]
fn fresh_client_install_writes_default_config() {
    let client_dir = tempfile::tempdir().unwrap();
    let env = LaunchEnvironment::new(client_dir.path(), Side::Client);
    let mut discovery = JarDiscovery::new();

    // the default points at a placeholder server, so the sync itself fails
    let result = find_candidates(&env, &mut discovery, &TracingProgress);
    let config = client_dir.path().join("servermods/serverpacklocator.toml");
    assert!(config.exists());
    assert!(fs::read_to_string(config).unwrap().contains("remoteServer"));
    if let Ok(activation) = result {
        assert!(!activation.is_loaded());
    }
}
