//! Command-line argument parsing for trino-query.

use crate::config::{Config, SessionConfig};
use crate::error::{Result, TrinoError};
use crate::output::OutputFormat;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

/// Run one SQL statement against Trino and print the typed result.
#[derive(Parser, Debug)]
#[command(name = "trino-query")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Connection string (e.g., trino://user@host:8080/catalog/schema)
    #[arg(value_name = "CONNECTION_STRING")]
    pub connection_string: Option<String>,

    /// Statement to execute (read from stdin when omitted)
    #[arg(short = 'e', long, value_name = "SQL")]
    pub execute: Option<String>,

    /// Coordinator host
    #[arg(short = 'H', long, value_name = "HOST")]
    pub host: Option<String>,

    /// Coordinator port
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// User (principal)
    #[arg(short = 'U', long, value_name = "USER")]
    pub user: Option<String>,

    /// Default catalog
    #[arg(short = 'C', long, value_name = "CATALOG")]
    pub catalog: Option<String>,

    /// Default schema
    #[arg(short = 'S', long, value_name = "SCHEMA")]
    pub schema: Option<String>,

    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME")]
    pub connection: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub format: String,

    /// Print the engine and value types of each column before the rows
    #[arg(long)]
    pub show_schema: bool,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Converts CLI arguments to a SessionConfig.
    ///
    /// Returns None when no connection argument was given at all.
    pub fn to_session_config(&self) -> Result<Option<SessionConfig>> {
        let mut config = match &self.connection_string {
            Some(conn_str) => Some(SessionConfig::from_connection_string(conn_str)?),
            None => None,
        };

        let flags = SessionConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            ..Default::default()
        };

        if flags != SessionConfig::default() {
            config.get_or_insert_with(SessionConfig::default).merge(&flags);
        }

        Ok(config)
    }

    /// Resolves the session config with precedence: CLI arguments, named or
    /// default connection from the config file. Environment and engine
    /// defaults are applied later by the session.
    pub fn resolve_session_config(&self, file: &Config) -> Result<SessionConfig> {
        let mut resolved = match self.connection.as_deref() {
            Some(name) => file.get_connection(Some(name)).cloned().ok_or_else(|| {
                TrinoError::config(format!("Connection '{name}' not found in config file"))
            })?,
            None => file.get_connection(None).cloned().unwrap_or_default(),
        };

        if let Some(cli) = self.to_session_config()? {
            resolved.merge(&cli);
        }

        Ok(resolved)
    }

    /// Returns the config file path to use.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Parses the output format from the --format argument.
    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format.parse().map_err(TrinoError::config)
    }

    /// Returns the statement from `-e` or, failing that, from stdin.
    pub fn statement(&self) -> Result<String> {
        let sql = match &self.execute {
            Some(sql) => sql.clone(),
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(|e| TrinoError::config(format!("Failed to read SQL from stdin: {e}")))?;
                buf
            }
        };

        let trimmed = sql.trim().trim_end_matches(';').trim();
        if trimmed.is_empty() {
            return Err(TrinoError::config("No SQL statement given"));
        }
        Ok(trimmed.to_string())
    }
}
