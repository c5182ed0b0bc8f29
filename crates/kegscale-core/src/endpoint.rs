//! Appliance address handling.
//!
//! The appliance is addressed by its HTTP origin (e.g. `http://keg-scale.local`).
//! The command socket lives at `/scales` on the same host.

use std::fmt;
use std::str::FromStr;

/// Origin of an appliance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplianceEndpoint {
    secure: bool,
    /// `host[:port]` plus any path prefix, without trailing slash.
    authority: String,
}

impl ApplianceEndpoint {
    pub fn parse(origin: &str) -> Result<Self, EndpointError> {
        origin.parse()
    }

    /// HTTP URL for a path on the appliance. `path` must start with `/`.
    pub fn http_url(&self, path: &str) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}{path}", self.authority)
    }

    /// WebSocket URL for a path on the appliance.
    pub fn ws_url(&self, path: &str) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{scheme}://{}{path}", self.authority)
    }

    /// The command socket.
    pub fn scales_url(&self) -> String {
        self.ws_url("/scales")
    }

    /// The static configuration document.
    pub fn config_url(&self) -> String {
        self.http_url("/config")
    }
}

impl fmt::Display for ApplianceEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.http_url(""))
    }
}

impl FromStr for ApplianceEndpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (scheme, rest) = s
            .split_once("://")
            .ok_or_else(|| EndpointError::MissingScheme(s.to_string()))?;

        let secure = match scheme {
            "http" | "ws" => false,
            "https" | "wss" => true,
            other => return Err(EndpointError::UnsupportedScheme(other.to_string())),
        };

        let authority = rest.trim_end_matches('/');
        if authority.is_empty() || authority.starts_with('/') {
            return Err(EndpointError::EmptyHost);
        }

        Ok(Self {
            secure,
            authority: authority.to_string(),
        })
    }
}

/// Error parsing an appliance origin.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EndpointError {
    #[error("appliance address must contain a scheme, got: {0}")]
    MissingScheme(String),
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),
    #[error("appliance address has no host")]
    EmptyHost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_urls() {
        let endpoint = ApplianceEndpoint::parse("http://keg-scale.local").unwrap();
        assert_eq!(endpoint.scales_url(), "ws://keg-scale.local/scales");
        assert_eq!(endpoint.config_url(), "http://keg-scale.local/config");
    }

    #[test]
    fn secure_and_trailing_slash() {
        let endpoint = ApplianceEndpoint::parse("https://scale.example:8443/").unwrap();
        assert_eq!(endpoint.scales_url(), "wss://scale.example:8443/scales");
        assert_eq!(endpoint.to_string(), "https://scale.example:8443");
    }

    #[test]
    fn path_prefix_is_kept() {
        let endpoint = ApplianceEndpoint::parse("http://localhost:3000/mock").unwrap();
        assert_eq!(endpoint.scales_url(), "ws://localhost:3000/mock/scales");
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            ApplianceEndpoint::parse("keg-scale.local"),
            Err(EndpointError::MissingScheme(_))
        ));
        assert!(matches!(
            ApplianceEndpoint::parse("ftp://keg-scale.local"),
            Err(EndpointError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            ApplianceEndpoint::parse("http://"),
            Err(EndpointError::EmptyHost)
        ));
    }
}
