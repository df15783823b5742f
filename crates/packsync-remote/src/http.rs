use crate::{RemoteBackend, RemoteConfig, RemoteError};
use packsync_schema::Manifest;
use std::io::Read;
use ureq::tls::{Certificate, RootCerts, TlsConfig};

/// HTTP(S) backend talking to a packsync sync server.
///
/// Expects:
/// - `GET /manifest`: manifest JSON
/// - `GET /file/<name>`: raw file bytes, `404` if not served
pub struct HttpBackend {
    config: RemoteConfig,
    agent: ureq::Agent,
}

impl HttpBackend {
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        let mut builder = ureq::Agent::config_builder().timeout_global(Some(config.timeout));
        if let Some(path) = &config.trusted_certificate {
            let pem = std::fs::read(path).map_err(|e| {
                RemoteError::Config(format!("cannot read certificate {}: {e}", path.display()))
            })?;
            let cert = Certificate::from_pem(&pem).map_err(|e| {
                RemoteError::Config(format!("invalid certificate {}: {e}", path.display()))
            })?;
            let tls = TlsConfig::builder()
                .root_certs(RootCerts::new_with_certs(&[cert]))
                .build();
            builder = builder.tls_config(tls);
        }
        let agent: ureq::Agent = builder.build().into();
        Ok(Self { config, agent })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn file_url(&self, file_name: &str) -> String {
        format!("{}/file/{}", self.config.url, encode_path_component(file_name))
    }

    fn do_get(&self, url: &str) -> Result<Vec<u8>, RemoteError> {
        let req = self
            .agent
            .get(url)
            .header("X-Packsync-Protocol", &crate::PROTOCOL_VERSION.to_string());
        let resp = match req.call() {
            Ok(r) => r,
            Err(ureq::Error::StatusCode(404)) => {
                return Err(RemoteError::NotFound(url.to_owned()));
            }
            Err(ureq::Error::StatusCode(code)) => {
                return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
            }
            Err(e) => {
                return Err(RemoteError::Http(format!("{url}: {e}")));
            }
        };

        let code = resp.status().as_u16();
        if code == 404 {
            return Err(RemoteError::NotFound(url.to_owned()));
        }
        if code >= 400 {
            return Err(RemoteError::Http(format!("HTTP {code} for {url}")));
        }

        let mut reader = resp.into_body().into_reader();
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .map_err(|e| RemoteError::Http(format!("{url}: {e}")))?;
        Ok(body)
    }
}

impl RemoteBackend for HttpBackend {
    fn get_manifest(&self) -> Result<Manifest, RemoteError> {
        let url = format!("{}/manifest", self.config.url);
        tracing::debug!("GET {url}");
        let body = self.do_get(&url)?;
        Manifest::from_bytes(&body)
            .map_err(|e| RemoteError::Serialization(format!("invalid manifest from {url}: {e}")))
    }

    fn get_file(&self, file_name: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.file_url(file_name);
        tracing::debug!("GET {url}");
        self.do_get(&url)
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
pub fn encode_path_component(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}
