use reqwest::Url;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing config file {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file: {0}")]
    Malformed(#[from] toml::de::Error),

    #[error("missing value for `{0}`")]
    MissingValue(&'static str),

    #[error("webhook url `{0}` is not a valid url")]
    InvalidWebhook(String),
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub credentials: Credentials,
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub general: General,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub roblosecurity: String,
}

#[derive(Debug, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct General {
    #[serde(default)]
    pub debug: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for General {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load `path`, apply `ROBLOSECURITY` / `WEBHOOK_URL` overrides, then validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;

        let mut config = Self::parse(&contents)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Replace file values with `ROBLOSECURITY` / `WEBHOOK_URL` when `lookup` has them.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(cookie) = lookup("ROBLOSECURITY") {
            self.credentials.roblosecurity = cookie;
        }
        if let Some(url) = lookup("WEBHOOK_URL") {
            self.webhook.url = url;
        }
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Both values can be present but blank, which is as bad as missing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.roblosecurity.trim().is_empty() {
            return Err(ConfigError::MissingValue("credentials.roblosecurity"));
        }
        if self.webhook.url.trim().is_empty() {
            return Err(ConfigError::MissingValue("webhook.url"));
        }
        self.webhook_url()?;
        Ok(())
    }

    pub fn webhook_url(&self) -> Result<Url, ConfigError> {
        Url::parse(self.webhook.url.trim())
            .map_err(|_| ConfigError::InvalidWebhook(self.webhook.url.clone()))
    }

    /// Filter directive for the log subscriber. `debug = true` always wins.
    pub fn log_filter(&self) -> &str {
        if self.general.debug {
            "debug"
        } else {
            &self.general.log_level
        }
    }
}
