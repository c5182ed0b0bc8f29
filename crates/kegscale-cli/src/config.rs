//! Configuration file (`kegscale.toml`) and its resolution against flags.

use kegscale_client::{ClientOptions, ReconnectPolicy};
use kegscale_core::{ApplianceEndpoint, EndpointError, ScaleDescriptor};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "kegscale.toml";
pub const DEFAULT_APPLIANCE: &str = "http://keg-scale.local";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// HTTP origin of the appliance.
    pub appliance: String,
    pub command_timeout_secs: u64,
    pub reconnect: ReconnectConfig,
    /// Scale labels, in appliance order. Fetched from `/config` when empty.
    pub scales: Vec<ScaleEntry>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            appliance: DEFAULT_APPLIANCE.to_string(),
            command_timeout_secs: 10,
            reconnect: ReconnectConfig::default(),
            scales: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconnectConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 10_000,
            factor: 1.3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScaleEntry {
    pub label: String,
}

/// Fully resolved settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoint: ApplianceEndpoint,
    pub options: ClientOptions,
    pub reconnect: ReconnectPolicy,
    /// Empty when the scales have to be discovered from the appliance.
    pub scales: Vec<ScaleDescriptor>,
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid appliance address: {0}")]
    Endpoint(#[from] EndpointError),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("reconnect.max_delay_ms must not be below reconnect.min_delay_ms")]
    DelayRange,
}

impl FileConfig {
    pub fn parse(text: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Load the explicit file, else `./kegscale.toml` if present, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply command-line overrides and validate.
    pub fn resolve(
        self,
        appliance: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Settings, SettingsError> {
        let endpoint = ApplianceEndpoint::parse(appliance.unwrap_or(&self.appliance))?;

        let timeout = timeout_secs.unwrap_or(self.command_timeout_secs);
        if timeout == 0 {
            return Err(SettingsError::Zero("command timeout"));
        }
        if self.reconnect.min_delay_ms == 0 {
            return Err(SettingsError::Zero("reconnect.min_delay_ms"));
        }
        if self.reconnect.max_delay_ms < self.reconnect.min_delay_ms {
            return Err(SettingsError::DelayRange);
        }

        let scales = self
            .scales
            .into_iter()
            .enumerate()
            .map(|(index, entry)| ScaleDescriptor::new(index, entry.label))
            .collect();

        Ok(Settings {
            endpoint,
            options: ClientOptions {
                command_timeout: Duration::from_secs(timeout),
            },
            reconnect: ReconnectPolicy {
                min_delay: Duration::from_millis(self.reconnect.min_delay_ms),
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
                factor: self.reconnect.factor,
            },
            scales,
        })
    }
}
