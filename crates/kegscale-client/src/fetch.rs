//! Static configuration served by the appliance over HTTP.

use crate::error::ConfigError;
use kegscale_core::{ApplianceConfig, ApplianceEndpoint};

/// GET `/config` and decode it.
pub async fn fetch_config(endpoint: &ApplianceEndpoint) -> Result<ApplianceConfig, ConfigError> {
    fetch_config_with(&reqwest::Client::new(), endpoint).await
}

pub async fn fetch_config_with(
    client: &reqwest::Client,
    endpoint: &ApplianceEndpoint,
) -> Result<ApplianceConfig, ConfigError> {
    let url = endpoint.config_url();
    tracing::debug!(%url, "fetching appliance config");

    let response = client.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ConfigError::Status(status));
    }
    Ok(response.json().await?)
}
