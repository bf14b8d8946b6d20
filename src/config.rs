use crate::exceptions::ExceptionSet;
use crate::options::RetryOptions;
use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

/// Accepts either a single value or a list in TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

/// File form of [`RetryOptions`]. Closures (`retry_if`, callbacks, header
/// parser) cannot be written in a file and are attached in code.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySettings {
    pub max: Option<i64>,
    pub interval: Option<f64>,
    pub max_interval: Option<f64>,
    pub backoff_factor: Option<f64>,
    pub interval_randomness: Option<f64>,
    pub exceptions: Option<OneOrMany<String>>,
    pub retry_statuses: Option<OneOrMany<u16>>,
    pub methods: Option<Vec<String>>,
    pub rate_limit_retry_header: Option<String>,
    pub rate_limit_reset_header: Option<String>,
}

/// `retry = 3` (legacy) or a full `[retry]` table
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RetrySection {
    Legacy(i64),
    Settings(RetrySettings),
}

impl Default for RetrySection {
    fn default() -> Self {
        RetrySection::Settings(RetrySettings::default())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retry: RetrySection,
}

impl Config {
    /// Load `config.toml` from the working directory
    pub fn new() -> Result<Self> {
        Self::from_file("config.toml")
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::from_toml_str(&config_str)?;
        info!("Config: {:?}", config);
        Ok(config)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        Ok(toml::from_str(config_str)?)
    }

    pub fn retry_options(&self) -> Result<RetryOptions> {
        match &self.retry {
            RetrySection::Legacy(max) => Ok(RetryOptions::from(*max)),
            RetrySection::Settings(settings) => settings.to_options(),
        }
    }
}

impl RetrySettings {
    pub fn to_options(&self) -> Result<RetryOptions> {
        let mut options = RetryOptions::default();

        if let Some(max) = self.max {
            options.max = max;
        }
        if let Some(interval) = self.interval {
            options.interval = interval;
        }
        if let Some(max_interval) = self.max_interval {
            options.max_interval = Some(max_interval);
        }
        if let Some(factor) = self.backoff_factor {
            options.backoff_factor = factor;
        }
        if let Some(randomness) = self.interval_randomness {
            options.interval_randomness = randomness;
        }
        if let Some(names) = &self.exceptions {
            options.exceptions = ExceptionSet::from_names(names.clone().into_vec());
        }
        if let Some(statuses) = &self.retry_statuses {
            options.retry_statuses = statuses
                .clone()
                .into_vec()
                .into_iter()
                .map(|code| {
                    StatusCode::from_u16(code)
                        .with_context(|| format!("invalid retry status {}", code))
                })
                .collect::<Result<_>>()?;
        }
        if let Some(methods) = &self.methods {
            options.methods = methods
                .iter()
                .map(|name| {
                    Method::from_bytes(name.to_ascii_uppercase().as_bytes())
                        .with_context(|| format!("invalid retry method {:?}", name))
                })
                .collect::<Result<_>>()?;
        }
        if let Some(header) = &self.rate_limit_retry_header {
            options.rate_limit_retry_header = header.clone();
        }
        if let Some(header) = &self.rate_limit_reset_header {
            options.rate_limit_reset_header = header.clone();
        }

        Ok(options)
    }
}
