use super::{core_error, issue_json, json_pretty, EXIT_SUCCESS};
use packsync_core::{JarDiscovery, ServerPackHandler};
use packsync_store::{build_manifest, PackLayout};
use std::path::Path;

/// Print the manifest a server in `game_dir` would publish, without serving it.
pub fn run(game_dir: &Path, json: bool) -> Result<u8, String> {
    let layout = PackLayout::new(game_dir);
    layout
        .ensure_server_mods_dir()
        .and_then(|_| layout.ensure_client_mods_dir())
        .map_err(|e| e.to_string())?;

    let mut handler = ServerPackHandler::new(layout);
    handler.validate().map_err(|e| core_error(&e))?;

    let mut discovery = JarDiscovery::new();
    let (_, to_share) = handler
        .resolve_pack(&mut discovery)
        .map_err(|e| core_error(&e))?;
    let manifest = build_manifest(&to_share).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "manifest": manifest,
            "issues": discovery.issues().iter().map(issue_json).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("{}", json_pretty(&manifest)?);
        for issue in discovery.issues() {
            eprintln!("{issue}");
        }
    }
    Ok(EXIT_SUCCESS)
}
