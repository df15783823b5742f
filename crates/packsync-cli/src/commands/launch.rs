use super::{core_error, issue_json, json_pretty, Progress, EXIT_FAILURE, EXIT_SUCCESS};
use packsync_core::{
    find_candidates, shutdown_requested, wait_for_shutdown, JarDiscovery, LaunchEnvironment,
    PackStatus, ServerHandle, Side,
};
use std::path::Path;

pub fn run(game_dir: &Path, side: Side, json: bool) -> Result<u8, String> {
    let env = LaunchEnvironment::new(game_dir, side);
    let mut discovery = JarDiscovery::new();
    let progress = Progress::new(json, &format!("starting {side} pack sync..."));

    let activation = match find_candidates(&env, &mut discovery, &progress) {
        Ok(a) => a,
        Err(e) => {
            progress.finish(false, "pack sync failed");
            return Err(core_error(&e));
        }
    };
    progress.finish(activation.is_loaded(), &activation.message());

    let (accepted, issues) = discovery.into_parts();
    if json {
        let (status, reason) = match &activation.status {
            PackStatus::Loaded { .. } => ("loaded", None),
            PackStatus::NotLoaded { reason } => ("not_loaded", Some(reason.as_str())),
        };
        let payload = serde_json::json!({
            "side": side.to_string(),
            "status": status,
            "reason": reason,
            "files": accepted
                .iter()
                .map(|f| serde_json::json!({
                    "file_name": f.file_name().as_str(),
                    "mod_id": f.root_mod_id().as_str(),
                    "kind": f.kind().to_string(),
                }))
                .collect::<Vec<_>>(),
            "issues": issues.iter().map(issue_json).collect::<Vec<_>>(),
            "server": activation.server.as_ref().map(ServerHandle::url),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        for file in &accepted {
            println!("  {} ({}, {})", file.file_name(), file.root_mod_id(), file.kind());
        }
        for issue in &issues {
            eprintln!("{issue}");
        }
    }

    // a server that could not start sharing still loaded its own mods
    let ok = activation.is_loaded()
        && (side == Side::Client || activation.server.is_some());
    if let Some(handle) = activation.server {
        if !json {
            println!("serving pack on {}, press Ctrl-C to stop", handle.url());
        }
        wait_for_shutdown(handle, shutdown_requested);
    }

    Ok(if ok { EXIT_SUCCESS } else { EXIT_FAILURE })
}

