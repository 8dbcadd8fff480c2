//! Backend credential resolution.
//!
//! A key pair (key id + private key path) is preferred over the shared
//! application secret. Token generation from the key pair is the backend
//! client's job; this module only decides which material is handed over.

use crate::errors::ReporterError;
use common::secret::SecretString;
use std::path::PathBuf;
use tracing::warn;

/// Credential material as configured. Any field may be missing.
#[derive(Debug, Clone, Default)]
pub struct CredentialConfig {
    /// Key id used for key-pair token generation.
    pub key_id: Option<String>,
    /// Path to the private key for key-pair token generation.
    pub private_key_path: Option<PathBuf>,
    /// Shared application secret.
    pub app_secret: Option<SecretString>,
}

/// Credentials chosen for backend initialization.
#[derive(Debug, Clone)]
pub enum ResolvedCredentials {
    /// Key-pair authentication.
    KeyPair {
        key_id: String,
        private_key_path: PathBuf,
    },
    /// Shared-secret authentication.
    SharedSecret(SecretString),
}

impl ResolvedCredentials {
    /// Short label for logs ("key_pair" / "shared_secret").
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            ResolvedCredentials::KeyPair { .. } => "key_pair",
            ResolvedCredentials::SharedSecret(_) => "shared_secret",
        }
    }
}

impl CredentialConfig {
    /// Pick the credentials to initialize with.
    ///
    /// # Errors
    ///
    /// Returns `ReporterError::MissingCredentials` when neither a complete
    /// key pair nor a shared secret is present.
    pub fn resolve(&self) -> Result<ResolvedCredentials, ReporterError> {
        if let (Some(key_id), Some(path)) = (&self.key_id, &self.private_key_path) {
            return Ok(ResolvedCredentials::KeyPair {
                key_id: key_id.clone(),
                private_key_path: path.clone(),
            });
        }

        warn!(
            target: "sr.registry",
            has_key_id = self.key_id.is_some(),
            has_key_path = self.private_key_path.is_some(),
            "Key id or key path missing, falling back to app secret"
        );

        match &self.app_secret {
            Some(secret) => Ok(ResolvedCredentials::SharedSecret(secret.clone())),
            None => Err(ReporterError::MissingCredentials(
                "appSecret missing".to_string(),
            )),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    #[test]
    fn test_key_pair_preferred_over_secret() {
        let config = CredentialConfig {
            key_id: Some("key-1".to_string()),
            private_key_path: Some(PathBuf::from("/etc/stats/ecdsa.pem")),
            app_secret: Some(SecretString::from("secret")),
        };

        let resolved = config.resolve().unwrap();
        assert!(matches!(
            &resolved,
            ResolvedCredentials::KeyPair { key_id, private_key_path }
                if key_id == "key-1" && private_key_path == &PathBuf::from("/etc/stats/ecdsa.pem")
        ));
        assert_eq!(resolved.kind(), "key_pair");
    }

    #[test]
    fn test_incomplete_key_pair_falls_back_to_secret() {
        let config = CredentialConfig {
            key_id: Some("key-1".to_string()),
            private_key_path: None,
            app_secret: Some(SecretString::from("fallback")),
        };

        let resolved = config.resolve().unwrap();
        assert!(matches!(
            &resolved,
            ResolvedCredentials::SharedSecret(secret) if secret.expose_secret() == "fallback"
        ));
    }

    #[test]
    fn test_no_credentials_is_missing_credentials() {
        let result = CredentialConfig::default().resolve();
        assert!(matches!(result, Err(ReporterError::MissingCredentials(_))));
    }

    #[test]
    fn test_resolved_debug_redacts_secret() {
        let resolved = ResolvedCredentials::SharedSecret(SecretString::from("hidden-value"));
        let debug = format!("{resolved:?}");
        assert!(!debug.contains("hidden-value"));
        assert_eq!(resolved.kind(), "shared_secret");
    }
}
