//! TOML configuration for the service and for the sync tool.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unknown server: {0}")]
    UnknownServer(String),

    #[error("no server given and no {0} configured")]
    MissingServer(&'static str),

    #[error("{0}: [server] ssl_cert and ssl_key must be set together")]
    IncompleteTls(PathBuf),
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, text: &str) -> Result<T, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Service configuration (`depot.toml`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
    /// User name to PHC password hash. Absent means no authentication.
    pub auth: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("depot.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// PEM certificate chain; serving is HTTPS when set with `ssl_key`.
    pub ssl_cert: Option<PathBuf>,
    /// PEM private key.
    pub ssl_key: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            ssl_cert: None,
            ssl_key: None,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Certificate and key paths when HTTPS is configured.
    #[must_use]
    pub fn tls(&self) -> Option<(&Path, &Path)> {
        match (&self.ssl_cert, &self.ssl_key) {
            (Some(cert), Some(key)) => Some((cert, key)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Directory for daily log files; console only when unset.
    pub dir: Option<PathBuf>,
    /// Number of daily files kept.
    pub retention: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            retention: 5,
        }
    }
}

impl Config {
    /// Parses configuration text. Relative paths (database, certificate,
    /// key and log directory) are resolved against `base`.
    pub fn from_toml(text: &str, base: &Path, origin: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = parse(origin, text)?;
        if config.server.ssl_cert.is_some() != config.server.ssl_key.is_some() {
            return Err(ConfigError::IncompleteTls(origin.to_path_buf()));
        }

        let paths = [
            Some(&mut config.database.path),
            config.server.ssl_cert.as_mut(),
            config.server.ssl_key.as_mut(),
            config.log.dir.as_mut(),
        ];
        for path in paths.into_iter().flatten() {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        if !path.exists() {
            return Self::from_toml("", base, path);
        }
        Self::from_toml(&read(path)?, base, path)
    }
}

/// One remote service in the sync tool configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerEntry {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Sync tool configuration (`depot-servers.toml`).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServersConfig {
    #[serde(rename = "default-1")]
    pub default_1: Option<String>,
    #[serde(rename = "default-2")]
    pub default_2: Option<String>,
    pub servers: BTreeMap<String, ServerEntry>,
}

impl ServersConfig {
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        parse(origin, text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&read(path)?, path)
    }

    /// Looks up a configured server.
    pub fn server(&self, name: &str) -> Result<&ServerEntry, ConfigError> {
        self.servers
            .get(name)
            .ok_or_else(|| ConfigError::UnknownServer(name.to_string()))
    }

    /// Picks the two servers to sync, falling back to `default-1` and
    /// `default-2` for names not given.
    pub fn pair<'a>(
        &'a self,
        first: Option<&'a str>,
        second: Option<&'a str>,
    ) -> Result<((&'a str, &'a ServerEntry), (&'a str, &'a ServerEntry)), ConfigError> {
        let first = first
            .or(self.default_1.as_deref())
            .ok_or(ConfigError::MissingServer("default-1"))?;
        let second = second
            .or(self.default_2.as_deref())
            .ok_or(ConfigError::MissingServer("default-2"))?;
        Ok(((first, self.server(first)?), (second, self.server(second)?)))
    }
}
