use std::io::Write;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::MirrorError;
use crate::remote::RemoteSession;

/// Reads the same archive tree over HTTPS. Public archive hosts such as
/// `ftp.ebi.ac.uk` serve their FTP tree at `https://<host>/<path>`.
pub struct HttpsSession {
    client: Client,
    base_url: String,
}

impl HttpsSession {
    /// Builds the client and checks that the remote directory answers.
    pub fn connect(config: &RemoteConfig) -> Result<Self, MirrorError> {
        let session = Self::new(config)?;
        debug!(url = %session.base_url, "checking remote directory");
        let response = session
            .client
            .head(&session.base_url)
            .send()
            .map_err(|err| MirrorError::Connection {
                host: config.host.clone(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(MirrorError::Connection {
                host: config.host.clone(),
                message: format!("{} returned status {}", session.base_url, response.status()),
            });
        }
        Ok(session)
    }

    /// Builds the client without contacting the host. Transfers are not
    /// time-limited, matching the FTP session.
    pub fn new(config: &RemoteConfig) -> Result<Self, MirrorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("mtbls-mirror/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MirrorError::Filesystem(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(None::<Duration>)
            .build()
            .map_err(|err| MirrorError::Connection {
                host: config.host.clone(),
                message: err.to_string(),
            })?;
        Ok(Self {
            client,
            base_url: Self::base_url(config),
        })
    }

    pub fn base_url(config: &RemoteConfig) -> String {
        let host = config.host.trim_end_matches('/');
        let dir = config.remote_dir.trim_matches('/');
        if dir.is_empty() {
            format!("https://{host}")
        } else {
            format!("https://{host}/{dir}")
        }
    }

    pub fn file_url(&self, remote_path: &str) -> String {
        format!("{}/{}", self.base_url, remote_path.trim_start_matches('/'))
    }
}

impl RemoteSession for HttpsSession {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, MirrorError> {
        let url = self.file_url(remote_path);
        debug!(%url, "requesting file");
        let mut response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| MirrorError::Transfer {
                path: remote_path.to_string(),
                message: err.to_string(),
            })?;
        if !response.status().is_success() {
            return Err(MirrorError::RemoteStatus {
                status: response.status().as_u16(),
                path: remote_path.to_string(),
            });
        }
        response.copy_to(sink).map_err(|err| MirrorError::Transfer {
            path: remote_path.to_string(),
            message: err.to_string(),
        })
    }

    fn close(&mut self) -> Result<(), MirrorError> {
        Ok(())
    }
}
