//! Backend client capability
//!
//! A backend client must answer a liveness probe. Verifying credentials is an
//! optional capability: clients that support it return a
//! [`CredentialVerifier`] from [`IssuerClient::credential_verifier`], others
//! keep the default `None` and setup skips that stage.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by client builders and backend clients
///
/// The `Display` text of each variant is embedded verbatim in the issuer's
/// `Ready` condition, after a stage prefix.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Backend-reported or otherwise unclassified failure
    #[error("{0}")]
    Other(String),

    /// Backend rejected the supplied credentials
    #[error("{0}")]
    Unauthorized(String),

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// The operation did not finish within the per-call deadline
    #[error("context deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    /// A referenced credentials secret is not in the lister cache
    #[error("secret {namespace}/{name} not found")]
    SecretNotFound {
        /// Namespace that was searched
        namespace: String,
        /// Secret name
        name: String,
    },

    /// Issuer configuration cannot produce a client
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Create an unclassified error with the given message
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create a credentials rejection error with the given message
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Returns true if the failure was caused by cancellation or a deadline
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded(_))
    }
}

impl From<certgate_common::Error> for ClientError {
    fn from(e: certgate_common::Error) -> Self {
        match e {
            certgate_common::Error::Validation { message, field } => match field {
                Some(field) => Self::Config(format!("{field}: {message}")),
                None => Self::Config(message),
            },
            other => Self::Other(other.to_string()),
        }
    }
}

/// Minimal operation set a PKI backend client exposes to issuer setup
#[async_trait]
pub trait IssuerClient: Send + Sync {
    /// Check that the backend API is reachable
    async fn ping(&self) -> Result<(), ClientError>;

    /// Narrow to the credential verification capability, if supported
    fn credential_verifier(&self) -> Option<&dyn CredentialVerifier> {
        None
    }
}

/// Optional capability: check that configured credentials are accepted
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Authenticate against the backend without issuing anything
    async fn verify_credentials(&self) -> Result<(), ClientError>;
}
