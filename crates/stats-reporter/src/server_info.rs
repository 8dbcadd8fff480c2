//! Server description announced to the backend at initialization.

use serde::{Deserialize, Serialize};
use sysinfo::System;

/// Application name announced when none is configured.
pub const DEFAULT_APP_NAME: &str = "stats-reporter";

/// Role of the reporting process in the media path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointType {
    /// A media server relaying other participants' streams.
    Middlebox,
    /// An end-user client.
    Browser,
}

impl EndpointType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EndpointType::Middlebox => "middlebox",
            EndpointType::Browser => "browser",
        }
    }
}

/// Operating system, application identity and endpoint role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub os: String,
    pub name: String,
    pub version: String,
    pub endpoint_type: EndpointType,
}

impl ServerInfo {
    /// Describe this process.
    ///
    /// `is_client` selects [`EndpointType::Browser`]; otherwise the process
    /// reports itself as a middlebox.
    #[must_use]
    pub fn current(name: &str, version: &str, is_client: bool) -> Self {
        Self {
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            name: name.to_string(),
            version: version.to_string(),
            endpoint_type: if is_client {
                EndpointType::Browser
            } else {
                EndpointType::Middlebox
            },
        }
    }

    /// Describe this process using the crate's own name and version.
    #[must_use]
    pub fn for_this_crate(is_client: bool) -> Self {
        Self::current(DEFAULT_APP_NAME, env!("CARGO_PKG_VERSION"), is_client)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_middlebox() {
        let info = ServerInfo::current("bridge", "2.3.1", false);
        assert_eq!(info.endpoint_type, EndpointType::Middlebox);
        assert_eq!(info.name, "bridge");
        assert_eq!(info.version, "2.3.1");
        assert!(!info.os.is_empty());
    }

    #[test]
    fn test_client_is_browser() {
        let info = ServerInfo::for_this_crate(true);
        assert_eq!(info.endpoint_type, EndpointType::Browser);
        assert_eq!(info.endpoint_type.as_str(), "browser");
        assert_eq!(info.name, DEFAULT_APP_NAME);
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_serialized_shape() {
        let info = ServerInfo {
            os: "Linux".to_string(),
            name: "bridge".to_string(),
            version: "1.0".to_string(),
            endpoint_type: EndpointType::Middlebox,
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["endpointType"], "middlebox");
        assert_eq!(json["os"], "Linux");
    }
}
