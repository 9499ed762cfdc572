//! Venafi credentials
//!
//! Resolves the secret referenced by an issuer's Venafi block into typed
//! credentials. Concrete client builders call [`load_credentials`] with the
//! lister and namespace they receive in [`BuildParams`](crate::BuildParams).

use certgate_common::crd::VenafiIssuer;
use certgate_common::secrets::{secret_value, SecretLister};

use crate::client::ClientError;

/// Secret key holding the TPP username
pub const TPP_USERNAME_KEY: &str = "username";
/// Secret key holding the TPP password
pub const TPP_PASSWORD_KEY: &str = "password";
/// Secret key holding a TPP OAuth access token
pub const TPP_ACCESS_TOKEN_KEY: &str = "access-token";
/// Default secret key holding the Venafi Cloud API key
pub const DEFAULT_CLOUD_API_KEY_KEY: &str = "api-key";

/// Credentials for a Trust Protection Platform connection
#[derive(Clone, PartialEq, Eq)]
pub enum TppCredentials {
    /// Username and password
    Password {
        /// TPP username
        username: String,
        /// TPP password
        password: String,
    },
    /// OAuth access token
    AccessToken(String),
}

/// Resolved credentials for either Venafi connection type
#[derive(Clone, PartialEq, Eq)]
pub enum VenafiCredentials {
    /// Trust Protection Platform credentials
    Tpp(TppCredentials),
    /// Venafi Cloud API key
    Cloud {
        /// API key
        api_key: String,
    },
}

impl std::fmt::Debug for VenafiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tpp(TppCredentials::Password { username, .. }) => f
                .debug_struct("Tpp")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Tpp(TppCredentials::AccessToken(_)) => {
                f.debug_tuple("TppAccessToken").field(&"<redacted>").finish()
            }
            Self::Cloud { .. } => f
                .debug_struct("Cloud")
                .field("api_key", &"<redacted>")
                .finish(),
        }
    }
}

/// Load the credentials referenced by a Venafi issuer
///
/// TPP secrets may hold either `access-token` or `username`/`password`; the
/// token wins when both are present. Cloud secrets hold the API key under
/// the referenced key, `api-key` by default.
pub fn load_credentials(
    secrets: &dyn SecretLister,
    namespace: &str,
    venafi: &VenafiIssuer,
) -> Result<VenafiCredentials, ClientError> {
    venafi.validate()?;

    if let Some(tpp) = &venafi.tpp {
        let name = &tpp.credentials_ref.name;
        let secret = secrets
            .get(namespace, name)
            .ok_or_else(|| ClientError::SecretNotFound {
                namespace: namespace.to_string(),
                name: name.clone(),
            })?;

        if let Some(token) = secret_value(&secret, TPP_ACCESS_TOKEN_KEY) {
            return Ok(VenafiCredentials::Tpp(TppCredentials::AccessToken(token)));
        }

        let username = secret_value(&secret, TPP_USERNAME_KEY);
        let password = secret_value(&secret, TPP_PASSWORD_KEY);
        return match (username, password) {
            (Some(username), Some(password)) => {
                Ok(VenafiCredentials::Tpp(TppCredentials::Password { username, password }))
            }
            _ => Err(ClientError::Config(format!(
                "secret {namespace}/{name} must contain '{TPP_ACCESS_TOKEN_KEY}' or both '{TPP_USERNAME_KEY}' and '{TPP_PASSWORD_KEY}'"
            ))),
        };
    }

    // validate() guarantees cloud is set when tpp is not
    let Some(cloud) = &venafi.cloud else {
        return Err(ClientError::Config(
            "one of tpp or cloud must be configured".to_string(),
        ));
    };
    let secret_ref = &cloud.api_token_secret_ref;
    let secret = secrets
        .get(namespace, &secret_ref.name)
        .ok_or_else(|| ClientError::SecretNotFound {
            namespace: namespace.to_string(),
            name: secret_ref.name.clone(),
        })?;
    let key = secret_ref
        .key
        .as_deref()
        .unwrap_or(DEFAULT_CLOUD_API_KEY_KEY);

    secret_value(&secret, key)
        .map(|api_key| VenafiCredentials::Cloud { api_key })
        .ok_or_else(|| {
            ClientError::Config(format!(
                "secret {namespace}/{} has no key '{key}'",
                secret_ref.name
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use certgate_common::crd::{SecretRef, VenafiCloud, VenafiTpp};
    use certgate_common::secrets::StaticSecretLister;

    fn tpp_issuer() -> VenafiIssuer {
        VenafiIssuer {
            zone: "devops\\cert-manager".to_string(),
            tpp: Some(VenafiTpp {
                url: "https://tpp.example.com/vedsdk".to_string(),
                credentials_ref: SecretRef::named("tpp-credentials"),
                ca_bundle: None,
            }),
            cloud: None,
        }
    }

    fn cloud_issuer(key: Option<&str>) -> VenafiIssuer {
        VenafiIssuer {
            zone: "My Application\\Default".to_string(),
            tpp: None,
            cloud: Some(VenafiCloud {
                url: None,
                api_token_secret_ref: SecretRef {
                    name: "cloud-key".to_string(),
                    key: key.map(String::from),
                },
            }),
        }
    }

    #[test]
    fn tpp_username_and_password() {
        let lister = StaticSecretLister::new().with_secret(
            "payments",
            "tpp-credentials",
            [("username", "admin"), ("password", "hunter2")],
        );

        let creds = load_credentials(&lister, "payments", &tpp_issuer()).unwrap();
        assert_eq!(
            creds,
            VenafiCredentials::Tpp(TppCredentials::Password {
                username: "admin".to_string(),
                password: "hunter2".to_string(),
            })
        );
    }

    #[test]
    fn tpp_access_token_takes_precedence() {
        let lister = StaticSecretLister::new().with_secret(
            "payments",
            "tpp-credentials",
            [("username", "admin"), ("password", "hunter2"), ("access-token", "tok")],
        );

        let creds = load_credentials(&lister, "payments", &tpp_issuer()).unwrap();
        assert_eq!(
            creds,
            VenafiCredentials::Tpp(TppCredentials::AccessToken("tok".to_string()))
        );
    }

    #[test]
    fn tpp_secret_missing_password() {
        let lister = StaticSecretLister::new().with_secret(
            "payments",
            "tpp-credentials",
            [("username", "admin")],
        );

        let err = load_credentials(&lister, "payments", &tpp_issuer()).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn missing_secret_is_reported_with_namespace() {
        let lister = StaticSecretLister::new();
        let err = load_credentials(&lister, "payments", &tpp_issuer()).unwrap_err();
        assert_eq!(err.to_string(), "secret payments/tpp-credentials not found");
    }

    #[test]
    fn cloud_uses_default_key() {
        let lister = StaticSecretLister::new().with_secret(
            "certgate-system",
            "cloud-key",
            [("api-key", "k-123")],
        );

        let creds = load_credentials(&lister, "certgate-system", &cloud_issuer(None)).unwrap();
        assert_eq!(
            creds,
            VenafiCredentials::Cloud {
                api_key: "k-123".to_string()
            }
        );
    }

    #[test]
    fn cloud_honours_custom_key() {
        let lister = StaticSecretLister::new().with_secret(
            "certgate-system",
            "cloud-key",
            [("apikey", "k-456")],
        );

        assert!(load_credentials(&lister, "certgate-system", &cloud_issuer(None)).is_err());
        let creds =
            load_credentials(&lister, "certgate-system", &cloud_issuer(Some("apikey"))).unwrap();
        assert_eq!(
            creds,
            VenafiCredentials::Cloud {
                api_key: "k-456".to_string()
            }
        );
    }

    #[test]
    fn invalid_configuration_is_rejected_before_lookup() {
        let mut venafi = tpp_issuer();
        venafi.cloud = cloud_issuer(None).cloud;

        let err = load_credentials(&StaticSecretLister::new(), "payments", &venafi).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let creds = VenafiCredentials::Tpp(TppCredentials::Password {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        });
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));

        let cloud = VenafiCredentials::Cloud {
            api_key: "k-123".to_string(),
        };
        assert!(!format!("{cloud:?}").contains("k-123"));
    }
}
