//! Issuer readiness verification for certgate
//!
//! Given an `Issuer` or `ClusterIssuer`, [`IssuerSetup::setup`] builds a
//! backend client, pings the backend, verifies credentials when the client
//! supports it, and records the verdict as the issuer's `Ready` condition.

#![deny(missing_docs)]

pub mod builder;
pub mod client;
pub mod config;
pub mod credentials;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod setup;

pub use builder::{BuildParams, ClientBuilder};
pub use client::{ClientError, CredentialVerifier, IssuerClient};
pub use config::{SetupConfig, VENAFI_BACKEND};
pub use credentials::{load_credentials, TppCredentials, VenafiCredentials};
pub use setup::{IssuerSetup, IssuerSetupBuilder, SetupError, SetupStage, REASON_ERROR_SETUP};
