use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::domain::Transport;
use crate::error::MirrorError;

pub const DEFAULT_CONFIG_FILE: &str = "mtbls-mirror.json";
pub const DEFAULT_HOST: &str = "ftp.ebi.ac.uk";
pub const DEFAULT_PORT: u16 = 21;
pub const DEFAULT_REMOTE_DIR: &str =
    "pub/databases/metabolights/studies/public/MTBLS1919/Applications";
pub const DEFAULT_DATA_DIR: &str = "data";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub remote_dir: Option<String>,
    #[serde(default)]
    pub transport: Option<Transport>,
    #[serde(default)]
    pub data_dir: Option<String>,
}

/// Where the remote archive lives. Passed to `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub remote_dir: String,
    pub transport: Transport,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            remote_dir: DEFAULT_REMOTE_DIR.to_string(),
            transport: Transport::Ftp,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub remote: RemoteConfig,
    pub data_dir: Utf8PathBuf,
}

/// Command-line values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub remote_dir: Option<String>,
    pub transport: Option<Transport>,
    pub data_dir: Option<String>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `mtbls-mirror.json` if present. Without either the
    /// built-in defaults apply.
    pub fn resolve(
        path: Option<&str>,
        overrides: ConfigOverrides,
    ) -> Result<ResolvedConfig, MirrorError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| MirrorError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| MirrorError::ConfigParse(err.to_string()))?
        } else if path.is_some() {
            return Err(MirrorError::MissingConfig(config_path));
        } else {
            Config::default()
        };

        Ok(Self::resolve_config(config, overrides))
    }

    pub fn resolve_config(config: Config, overrides: ConfigOverrides) -> ResolvedConfig {
        let defaults = RemoteConfig::default();
        let remote = RemoteConfig {
            host: overrides.host.or(config.host).unwrap_or(defaults.host),
            port: config.port.unwrap_or(defaults.port),
            remote_dir: overrides
                .remote_dir
                .or(config.remote_dir)
                .map(|dir| dir.trim_matches('/').to_string())
                .unwrap_or(defaults.remote_dir),
            transport: overrides
                .transport
                .or(config.transport)
                .unwrap_or(defaults.transport),
        };
        let data_dir = overrides
            .data_dir
            .or(config.data_dir)
            .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());

        ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            remote,
            data_dir: Utf8PathBuf::from(data_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_study_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default(), ConfigOverrides::default());
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.remote, RemoteConfig::default());
        assert_eq!(resolved.data_dir, Utf8PathBuf::from("data"));
    }

    #[test]
    fn overrides_beat_file_values() {
        let config = Config {
            host: Some("mirror.example.org".to_string()),
            transport: Some(Transport::Ftp),
            remote_dir: Some("/pub/study/".to_string()),
            ..Config::default()
        };
        let overrides = ConfigOverrides {
            transport: Some(Transport::Https),
            ..ConfigOverrides::default()
        };
        let resolved = ConfigLoader::resolve_config(config, overrides);
        assert_eq!(resolved.remote.host, "mirror.example.org");
        assert_eq!(resolved.remote.transport, Transport::Https);
        assert_eq!(resolved.remote.remote_dir, "pub/study");
    }
}
