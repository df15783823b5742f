use packsync_schema::ClientSettings;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for one sync server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    /// Bound on every request, including reading the response body.
    pub timeout: Duration,
    /// PEM certificate to trust instead of the public web PKI roots, for
    /// servers using a self-signed certificate.
    pub trusted_certificate: Option<PathBuf>,
}

impl RemoteConfig {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_owned(),
            timeout: DEFAULT_TIMEOUT,
            trusted_certificate: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_trusted_certificate(mut self, path: impl Into<PathBuf>) -> Self {
        self.trusted_certificate = Some(path.into());
        self
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        let config = Self::new(&settings.remote_server).with_timeout(settings.timeout);
        match &settings.trusted_certificate_file {
            Some(path) => config.with_trusted_certificate(path),
            None => config,
        }
    }
}
