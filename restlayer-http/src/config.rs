//! Service configuration.
//!
//! Configuration is layered, later sources overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A TOML file: `restlayer.toml` in the working directory, or the path in `RESTLAYER_CONFIG`
//! 3. Environment variables prefixed with `RESTLAYER_`, nested keys separated by `__`
//!    (`RESTLAYER_API__ENVELOPE=true`)

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::{error::ServiceError, query::{Pagination, PaginationStyle}};

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "RESTLAYER_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "restlayer.toml";
const ENV_PREFIX: &str = "RESTLAYER_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Loads the configuration from the default file location and the environment.
    pub fn load() -> Result<Self, ServiceError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        Self::load_from(path)
    }

    /// Loads the configuration from a specific file and the environment.
    ///
    /// A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        Ok(Self::figment(path).extract()?)
    }

    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Tracing filter directive, such as `info` or `restlayer_http=debug`
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Maximum request body size in kilobytes
    #[serde(default = "default_body_limit_kb")]
    pub body_limit_kb: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            body_limit_kb: default_body_limit_kb(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Path the collections are served under
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Envelope responses unless a request opts out
    #[serde(default)]
    pub envelope: bool,

    #[serde(default)]
    pub pagination: PaginationStyle,

    #[serde(default)]
    pub default_limit: Option<u64>,

    #[serde(default)]
    pub max_limit: Option<u64>,
}

impl ApiConfig {
    pub fn pagination_policy(&self) -> Pagination {
        Pagination {
            style: self.pagination,
            default_limit: self.default_limit,
            max_limit: self.max_limit,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            envelope: false,
            pagination: PaginationStyle::default(),
            default_limit: None,
            max_limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Memory,
    Mongodb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreKind,

    /// Connection string of the database server
    #[serde(default = "default_store_url")]
    pub url: String,

    #[serde(default = "default_database")]
    pub database: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreKind::default(),
            url: default_store_url(),
            database: default_database(),
        }
    }
}

fn default_name() -> String {
    "restlayer".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_body_limit_kb() -> usize {
    1024
}

fn default_prefix() -> String {
    "/api/v1".to_string()
}

fn default_store_url() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_database() -> String {
    "restlayer".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_apply_without_sources() {
        Jail::expect_with(|_jail| {
            let config: Config = Config::figment("missing.toml").extract()?;

            assert_eq!(config.service.port, 3000);
            assert_eq!(config.api.prefix, "/api/v1");
            assert!(!config.api.envelope);
            assert_eq!(config.store.backend, StoreKind::Memory);

            Ok(())
        });
    }

    #[test]
    fn environment_overrides_the_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "restlayer.toml",
                r#"
                [service]
                port = 8080
                log_format = "json"

                [api]
                prefix = "/v2"
                pagination = "page_number"
                max_limit = 100

                [store]
                backend = "mongodb"
                "#,
            )?;
            jail.set_env("RESTLAYER_SERVICE__PORT", "9090");
            jail.set_env("RESTLAYER_API__ENVELOPE", "true");

            let config = Config::load()
                .map_err(|e| figment::Error::from(e.to_string()))?;

            assert_eq!(config.service.port, 9090);
            assert_eq!(config.service.log_format, LogFormat::Json);
            assert_eq!(config.api.prefix, "/v2");
            assert!(config.api.envelope);
            assert_eq!(config.api.pagination_policy().style, PaginationStyle::PageNumber);
            assert_eq!(config.api.pagination_policy().max_limit, Some(100));
            assert_eq!(config.store.backend, StoreKind::Mongodb);
            assert_eq!(config.store.database, "restlayer");

            Ok(())
        });
    }
}
