pub mod launch;
pub mod manifest;

use indicatif::{ProgressBar, ProgressStyle};
use packsync_core::{CoreError, Issue, ProgressReporter, TracingProgress};
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;

pub const CONFIG_ERROR_PREFIX: &str = "configuration error:";

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

/// Render a core error, tagging configuration problems so `main` can map them
/// to [`EXIT_CONFIG_ERROR`].
pub fn core_error(e: &CoreError) -> String {
    if e.is_config() {
        format!("{CONFIG_ERROR_PREFIX} {e}")
    } else {
        e.to_string()
    }
}

pub fn issue_json(issue: &Issue) -> serde_json::Value {
    serde_json::json!({
        "severity": issue.severity.to_string(),
        "message": issue.message,
        "path": issue.path.as_ref().map(|p| p.display().to_string()),
        "cause": issue.cause,
    })
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Progress sink for launches: a spinner on a terminal, the log under `--json`.
pub enum Progress {
    Spinner(ProgressBar),
    Log(TracingProgress),
}

impl Progress {
    pub fn new(json: bool, initial: &str) -> Self {
        if json {
            Self::Log(TracingProgress)
        } else {
            Self::Spinner(spinner(initial))
        }
    }

    pub fn finish(&self, ok: bool, msg: &str) {
        if let Self::Spinner(pb) = self {
            if ok {
                spin_ok(pb, msg);
            } else {
                spin_fail(pb, msg);
            }
        }
    }
}

impl ProgressReporter for Progress {
    fn add(&self, message: &str) {
        match self {
            Self::Spinner(pb) => pb.set_message(message.to_owned()),
            Self::Log(log) => log.add(message),
        }
    }
}
