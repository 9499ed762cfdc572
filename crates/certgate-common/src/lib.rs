//! Common types for certgate: CRDs, conditions, events, and telemetry

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod events;
pub mod metrics;
pub mod secrets;
pub mod telemetry;

pub use error::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Default namespace holding secrets for cluster-scoped issuers
pub const DEFAULT_CLUSTER_RESOURCE_NAMESPACE: &str = "certgate-system";

/// Default controller name reported on published events
pub const DEFAULT_CONTROLLER_NAME: &str = "certgate-issuer-controller";
