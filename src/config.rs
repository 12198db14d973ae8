//! Configuration management for trino-query.
//!
//! Handles loading named connections from TOML files, parsing connection
//! strings and resolving session settings against environment variables.

use crate::error::{Result, TrinoError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

/// Host used when neither an explicit value nor `TRINO_HOST` is set.
pub const DEFAULT_HOST: &str = "localhost";

/// Port used when neither an explicit value nor `TRINO_PORT` is set.
pub const DEFAULT_PORT: u16 = 8080;

/// Default port for https coordinators.
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Principal used when neither an explicit value nor `TRINO_USER` is set.
pub const DEFAULT_USER: &str = "trino";

/// Client tag sent as `X-Trino-Source`.
pub const DEFAULT_SOURCE: &str = "trino-query";

/// Main configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Named engine connections.
    #[serde(default)]
    pub connections: HashMap<String, SessionConfig>,
}

/// Transport scheme used to reach the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpScheme {
    #[default]
    Http,
    Https,
}

impl HttpScheme {
    /// Returns the scheme as used in URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for HttpScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session connection parameters.
///
/// Every field is optional. Unset fields are filled from the environment by
/// [`SessionConfig::apply_env_defaults`] and from engine defaults by the
/// `resolved_*` accessors, so an explicit value always wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Coordinator host.
    pub host: Option<String>,

    /// Coordinator port.
    pub port: Option<u16>,

    /// Principal sent as `X-Trino-User`.
    pub user: Option<String>,

    /// Default catalog for unqualified names.
    pub catalog: Option<String>,

    /// Default schema for unqualified names.
    pub schema: Option<String>,

    /// Client tag sent as `X-Trino-Source`.
    pub source: Option<String>,

    /// http or https.
    pub http_scheme: Option<HttpScheme>,
}

impl SessionConfig {
    /// Creates a config from the four core parameters.
    pub fn new(
        host: Option<String>,
        port: Option<u16>,
        user: Option<String>,
        catalog: Option<String>,
    ) -> Self {
        Self {
            host,
            port,
            user,
            catalog,
            ..Default::default()
        }
    }

    /// Creates a config with every unset field taken from the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_defaults();
        config
    }

    /// Parses a connection string.
    ///
    /// Format: `trino://user@host:port/catalog/schema`. The `http` and `https`
    /// schemes are accepted too and select the transport; `trino` means http.
    pub fn from_connection_string(conn_str: &str) -> Result<Self> {
        let url = Url::parse(conn_str)
            .map_err(|e| TrinoError::config(format!("Invalid connection string: {e}")))?;

        let http_scheme = match url.scheme() {
            "trino" | "http" => HttpScheme::Http,
            "https" => HttpScheme::Https,
            other => {
                return Err(TrinoError::config(format!(
                    "Invalid scheme '{other}'. Expected 'trino', 'http' or 'https'"
                )))
            }
        };

        let mut segments = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(String::from).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter();

        let user = if url.username().is_empty() {
            None
        } else {
            Some(url.username().to_string())
        };

        Ok(Self {
            host: url.host_str().map(String::from),
            port: url.port(),
            user,
            catalog: segments.next(),
            schema: segments.next(),
            source: None,
            http_scheme: Some(http_scheme),
        })
    }

    /// Merges another config into this one, with the other taking precedence.
    pub fn merge(&mut self, other: &SessionConfig) {
        if other.host.is_some() {
            self.host = other.host.clone();
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.user.is_some() {
            self.user = other.user.clone();
        }
        if other.catalog.is_some() {
            self.catalog = other.catalog.clone();
        }
        if other.schema.is_some() {
            self.schema = other.schema.clone();
        }
        if other.source.is_some() {
            self.source = other.source.clone();
        }
        if other.http_scheme.is_some() {
            self.http_scheme = other.http_scheme;
        }
    }

    /// Applies `TRINO_HOST`, `TRINO_PORT`, `TRINO_USER`, `TRINO_CATALOG` and
    /// `TRINO_SCHEMA` to fields that are still unset.
    pub fn apply_env_defaults(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env_defaults`](Self::apply_env_defaults) with a custom lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.host.is_none() {
            self.host = lookup("TRINO_HOST");
        }
        if self.port.is_none() {
            if let Some(port_str) = lookup("TRINO_PORT") {
                match port_str.parse() {
                    Ok(port) => self.port = Some(port),
                    Err(_) => warn!("Ignoring invalid TRINO_PORT value: {port_str}"),
                }
            }
        }
        if self.user.is_none() {
            self.user = lookup("TRINO_USER");
        }
        if self.catalog.is_none() {
            self.catalog = lookup("TRINO_CATALOG");
        }
        if self.schema.is_none() {
            self.schema = lookup("TRINO_SCHEMA");
        }
    }

    /// Host after engine defaults.
    pub fn resolved_host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    /// Port after engine defaults. An https coordinator without a port uses 443,
    /// which is also what `https://host:443` parses to.
    pub fn resolved_port(&self) -> u16 {
        self.port.unwrap_or(match self.resolved_scheme() {
            HttpScheme::Http => DEFAULT_PORT,
            HttpScheme::Https => DEFAULT_HTTPS_PORT,
        })
    }

    /// Principal after engine defaults.
    pub fn resolved_user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    /// Client tag after defaults.
    pub fn resolved_source(&self) -> &str {
        self.source.as_deref().unwrap_or(DEFAULT_SOURCE)
    }

    /// Scheme after defaults.
    pub fn resolved_scheme(&self) -> HttpScheme {
        self.http_scheme.unwrap_or_default()
    }

    /// Base URL of the coordinator, e.g. `http://localhost:8080`.
    pub fn base_url(&self) -> Result<Url> {
        let raw = format!(
            "{}://{}:{}",
            self.resolved_scheme(),
            self.resolved_host(),
            self.resolved_port()
        );
        Url::parse(&raw).map_err(|e| TrinoError::config(format!("Invalid coordinator URL {raw}: {e}")))
    }

    /// Returns a display string for logs and messages.
    pub fn display_string(&self) -> String {
        let mut out = format!(
            "{}@{}:{}",
            self.resolved_user(),
            self.resolved_host(),
            self.resolved_port()
        );
        if let Some(catalog) = &self.catalog {
            out.push('/');
            out.push_str(catalog);
            if let Some(schema) = &self.schema {
                out.push('/');
                out.push_str(schema);
            }
        }
        out
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trino-query")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields the default config.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| TrinoError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            TrinoError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named connection, or the default connection if name is None.
    pub fn get_connection(&self, name: Option<&str>) -> Option<&SessionConfig> {
        let key = name.unwrap_or("default");
        self.connections.get(key)
    }
}
