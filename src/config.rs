//! Configuration loader and validator for the promo-code reconciliation run.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Environment variable selecting the Elasticsearch endpoint.
pub const HOST_ENV: &str = "host_elastic";
/// Environment variable selecting the target index.
pub const INDEX_ENV: &str = "index_elastic";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub elastic: Elastic,
    pub queries: Queries,
    pub output: Output,
}

/// Search backend settings. `host` and `index` are usually injected from the
/// environment and are passed through as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Elastic {
    pub host: String,
    pub index: String,
    pub max_hits: u32,
}

impl Default for Elastic {
    fn default() -> Self {
        Self {
            host: String::new(),
            index: String::new(),
            max_hits: 10_000,
        }
    }
}

/// The two `query_string` expressions whose results get correlated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Queries {
    /// Failed promo-code amount requests.
    pub requests: String,
    /// Promo-code validation events.
    pub validations: String,
}

impl Default for Queries {
    fn default() -> Self {
        Self {
            requests: "appname:api-promocodes AND category:LOG_RESPONSE_BODY AND \
                       requestUri:/api/promocodes/promocodes/promo-codes-amounts AND NOT \
                       status:200 AND promocodeId:UNIVERSALDIC AND errorCode:40903001"
                .to_string(),
            validations: "appname:api-promocodes AND category:VALIDATE_PROMOCODE_APPLY AND \
                          logger_name:com.almundo.promocodes.service.ValidationPromocodeService \
                          AND promocodeId:UNIVERSALDIC"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Output {
    pub path: String,
}

impl Default for Output {
    fn default() -> Self {
        Self {
            path: "result.csv".to_string(),
        }
    }
}

impl Config {
    /// Override `elastic.host` / `elastic.index` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Same as [`Config::apply_env`] with an injectable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup(HOST_ENV) {
            self.elastic.host = host;
        }
        if let Some(index) = lookup(INDEX_ENV) {
            self.elastic.index = index;
        }
    }
}

/// Load configuration.
/// - If `path` is None, the built-in defaults are used.
/// - Otherwise the YAML file is read; omitted keys keep their defaults.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let cfg = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        }
        None => Config::default(),
    };
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance. Host and index are not checked here;
/// a bad endpoint surfaces when the search client connects.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.elastic.max_hits == 0 {
        return Err(ConfigError::Invalid("elastic.max_hits must be > 0"));
    }
    if cfg.queries.requests.trim().is_empty() {
        return Err(ConfigError::Invalid("queries.requests must be non-empty"));
    }
    if cfg.queries.validations.trim().is_empty() {
        return Err(ConfigError::Invalid("queries.validations must be non-empty"));
    }
    if cfg.output.path.trim().is_empty() {
        return Err(ConfigError::Invalid("output.path must be non-empty"));
    }
    Ok(())
}

/// Example YAML accepted by [`load`].
pub fn example() -> &'static str {
    r#"elastic:
  host: "http://localhost:9200"
  index: "logs-promocodes"
  max_hits: 10000

queries:
  requests: >-
    appname:api-promocodes AND category:LOG_RESPONSE_BODY AND
    requestUri:/api/promocodes/promocodes/promo-codes-amounts AND NOT
    status:200 AND promocodeId:UNIVERSALDIC AND errorCode:40903001
  validations: >-
    appname:api-promocodes AND category:VALIDATE_PROMOCODE_APPLY AND
    logger_name:com.almundo.promocodes.service.ValidationPromocodeService
    AND promocodeId:UNIVERSALDIC

output:
  path: "result.csv"
"#
}
