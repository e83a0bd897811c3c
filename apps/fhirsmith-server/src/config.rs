//! Configuration: defaults, layered with an optional YAML file and
//! `FHIRSMITH_*` environment overrides, then CLI flags (spec §2.3).

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::error::{Error, Result};

/// One HTTP endpoint the dispatcher registers routes under (spec §4.8):
/// a mount path, the FHIR version it serves, and the library YAML
/// describing the terminology sources it composes.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    pub path: String,
    #[serde(rename = "fhirVersion")]
    pub fhir_version: String,
    /// Inline YAML source descriptor (spec §4.6/§6). Mutually exclusive
    /// with `library_file` in practice, but either is accepted.
    #[serde(default, rename = "library")]
    pub library_yaml: Option<String>,
    #[serde(default, rename = "libraryFile")]
    pub library_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_resource_cache_timeout_secs")]
    pub resource_cache_timeout_secs: u64,
    #[serde(default = "default_expansion_cache_capacity")]
    pub expansion_cache_capacity: usize,
    #[serde(default)]
    pub expansion_cache_memory_mb: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            resource_cache_timeout_secs: default_resource_cache_timeout_secs(),
            expansion_cache_capacity: default_expansion_cache_capacity(),
            expansion_cache_memory_mb: None,
        }
    }
}

fn default_resource_cache_timeout_secs() -> u64 {
    30 * 60
}

fn default_expansion_cache_capacity() -> usize {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// File-level shape deserialized from the YAML config document; every
/// field layers over the hardcoded defaults below.
#[derive(Debug, Clone, Deserialize, Default)]
struct FileConfig {
    listen_addr: Option<String>,
    data_dir: Option<PathBuf>,
    servers: Option<Vec<String>>,
    endpoints: Option<Vec<EndpointConfig>>,
    cache: Option<CacheConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Parser)]
#[command(name = "fhirsmith-server")]
struct Cli {
    /// Path to a YAML config file.
    #[arg(long, env = "FHIRSMITH_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "FHIRSMITH_LISTEN_ADDR")]
    listen_addr: Option<String>,

    #[arg(long, env = "FHIRSMITH_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub data_dir: Option<PathBuf>,
    pub servers: Vec<String>,
    pub endpoints: Vec<EndpointConfig>,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Layer defaults -> optional YAML file -> environment -> CLI flags
    /// (spec §2.3), the way the teacher's `apps/server` loads `Config`
    /// in `main.rs`, minus the config crate it used for nesting: this
    /// workspace has no ambient config-file format dependency beyond
    /// `serde_yaml`, already pulled in for the library descriptor, so
    /// the config file uses the same format instead of introducing TOML.
    pub fn load() -> Result<Self> {
        let cli = Cli::parse();

        let file_config = match &cli.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("reading {}: {e}", path.display())))?;
                serde_yaml::from_str(&text)
                    .map_err(|e| Error::Config(format!("parsing {}: {e}", path.display())))?
            }
            None => FileConfig::default(),
        };

        let listen_addr = cli
            .listen_addr
            .or(file_config.listen_addr)
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen_addr: {e}")))?;

        let data_dir = cli.data_dir.or(file_config.data_dir);

        Ok(Self {
            listen_addr,
            data_dir,
            servers: file_config
                .servers
                .unwrap_or_else(|| vec!["https://packages.simplifier.net".to_string()]),
            endpoints: file_config.endpoints.unwrap_or_default(),
            cache: file_config.cache.unwrap_or_default(),
            logging: file_config.logging.unwrap_or_default(),
        })
    }

    /// Fail fast on a fatal configuration error (spec §4.8): duplicate
    /// endpoint paths, or no endpoints registered at all.
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::Config("no endpoints configured".to_string()));
        }
        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.endpoints {
            if !seen.insert(endpoint.path.trim_end_matches('/').to_string()) {
                return Err(Error::Config(format!(
                    "duplicate endpoint path '{}'",
                    endpoint.path
                )));
            }
            if endpoint.library_yaml.is_none() && endpoint.library_file.is_none() {
                return Err(Error::Config(format!(
                    "endpoint '{}' has no library source",
                    endpoint.path
                )));
            }
        }
        Ok(())
    }
}
