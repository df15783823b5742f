//! Boundary types shared with the host launcher: where the game lives, which
//! side is starting, how progress is shown, and the discovery pipeline that
//! receives candidate files.

use packsync_schema::ModFile;
use std::fmt;
use std::path::{Path, PathBuf};

/// Install side of the running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Client,
    DedicatedServer,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client"),
            Self::DedicatedServer => write!(f, "dedicated server"),
        }
    }
}

/// What the host exposes about the current launch.
#[derive(Debug, Clone)]
pub struct LaunchEnvironment {
    game_dir: PathBuf,
    side: Side,
}

impl LaunchEnvironment {
    pub fn new(game_dir: impl Into<PathBuf>, side: Side) -> Self {
        Self {
            game_dir: game_dir.into(),
            side,
        }
    }

    pub fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

/// Sink for short, user-facing status lines shown during launch.
pub trait ProgressReporter {
    fn add(&self, message: &str);
}

/// Reporter that forwards every message to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressReporter for TracingProgress {
    fn add(&self, message: &str) {
        tracing::info!("{message}");
    }
}

/// Opaque tag passed along with each file handed to the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiscoveryAttributes {
    #[default]
    Default,
    /// The file was downloaded from a sync server during this launch.
    ServerPack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueSeverity {
    Warning,
    Error,
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A problem reported to the discovery pipeline instead of aborting the launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub message: String,
    pub path: Option<PathBuf>,
    pub cause: Option<String>,
}

impl Issue {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(IssueSeverity::Error, message)
    }

    fn new(severity: IssueSeverity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            path: None,
            cause: None,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// The host's module-discovery step.
pub trait DiscoveryPipeline {
    /// Parse `path` into a candidate. `Ok(None)` means the file is not
    /// something the pipeline loads; `Err` carries the problem to report.
    fn read_mod_file(
        &mut self,
        path: &Path,
        attributes: DiscoveryAttributes,
    ) -> Result<Option<ModFile>, Issue>;

    /// Accept a candidate for loading.
    fn add_mod_file(&mut self, file: ModFile);

    fn add_issue(&mut self, issue: Issue);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_display_includes_path_and_cause() {
        let issue = Issue::error("broken file")
            .with_path("/game/servermods/a.jar")
            .with_cause("invalid zip header");
        assert_eq!(
            issue.to_string(),
            "error: broken file (/game/servermods/a.jar): invalid zip header"
        );
    }

    #[test]
    fn issue_display_message_only() {
        assert_eq!(Issue::warning("no mods").to_string(), "warning: no mods");
    }

    #[test]
    fn launch_environment_accessors() {
        let env = LaunchEnvironment::new("/game", Side::Client);
        assert_eq!(env.game_dir(), Path::new("/game"));
        assert_eq!(env.side(), Side::Client);
        assert_eq!(Side::DedicatedServer.to_string(), "dedicated server");
    }
}
