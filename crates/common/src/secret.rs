//! Secret types for backend credentials.
//!
//! Re-exports the [`secrecy`] types used for the monitoring backend's shared
//! application secret. `SecretString` redacts itself in `Debug`, so a config
//! struct or credential enum that derives `Debug` can be logged through
//! `tracing` without leaking the secret.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct AppCredentials {
//!     app_id: u32,
//!     app_secret: SecretString,
//! }
//!
//! let creds = AppCredentials {
//!     app_id: 42,
//!     app_secret: SecretString::from("s3cr3t"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("s3cr3t"));
//! assert_eq!(creds.app_secret.expose_secret(), "s3cr3t");
//! ```
//!
//! Only the backend client should call `expose_secret()`, at the point where
//! it authenticates.

pub use secrecy::{ExposeSecret, SecretString};

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_app_secret_debug_is_redacted() {
        let secret = SecretString::from("app-secret-value");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("app-secret-value"));
    }

    #[test]
    fn test_credentials_struct_is_safe_to_log() {
        #[allow(dead_code)]
        #[derive(Debug)]
        struct KeyMaterial {
            key_id: String,
            app_secret: SecretString,
        }

        let material = KeyMaterial {
            key_id: "key-7".to_string(),
            app_secret: SecretString::from("do-not-print"),
        };

        let debug_str = format!("{material:?}");
        assert!(debug_str.contains("key-7"));
        assert!(!debug_str.contains("do-not-print"));
    }

    #[test]
    fn test_deserialize_secret_from_json() {
        #[derive(Debug, Deserialize)]
        struct SecretOnly {
            app_secret: SecretString,
        }

        let json = r#"{"app_secret": "from-json"}"#;
        let parsed: SecretOnly = serde_json::from_str(json).expect("deserialize");

        assert_eq!(parsed.app_secret.expose_secret(), "from-json");
        assert!(!format!("{parsed:?}").contains("from-json"));
    }
}
