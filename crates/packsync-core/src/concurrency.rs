use packsync_server::ServerHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub fn install_signal_handler() {
    let _ = ctrlc::set_handler(move || {
        if SHUTDOWN_REQUESTED.load(Ordering::SeqCst) {
            std::process::exit(1);
        }
        SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
        eprintln!("\nshutdown requested, stopping sync server...");
    });
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Block until `stop` returns true, then stop the server and wait for its
/// workers to exit.
pub fn wait_for_shutdown(handle: ServerHandle, stop: impl Fn() -> bool) {
    while !stop() {
        std::thread::sleep(POLL_INTERVAL);
    }
    tracing::info!("stopping sync server on {}", handle.local_addr());
    handle.shutdown();
    handle.join();
}
