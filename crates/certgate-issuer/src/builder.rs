//! Client builder contract
//!
//! Setup never constructs backend clients itself. It asks an injected
//! [`ClientBuilder`] for a fresh client on every call, which keeps the
//! verification path independent of any particular backend protocol and lets
//! tests substitute fakes.

use std::sync::Arc;

use async_trait::async_trait;
use certgate_common::crd::GenericIssuer;
use certgate_common::metrics::IssuerMetrics;
use certgate_common::secrets::SecretLister;

use crate::client::{ClientError, IssuerClient};

/// Everything a builder needs to construct a client for one issuer
///
/// Setup passes these through unmodified.
pub struct BuildParams<'a> {
    /// Namespace the issuer's secrets are read from
    pub namespace: &'a str,
    /// Cached secret lookup
    pub secrets: Arc<dyn SecretLister>,
    /// The issuer being verified
    pub issuer: &'a dyn GenericIssuer,
    /// Metrics sink for backend request accounting
    pub metrics: Arc<IssuerMetrics>,
    /// Span of the setup call, for client-side log correlation
    pub span: tracing::Span,
    /// Namespace holding secrets for cluster-scoped issuers
    pub cluster_resource_namespace: &'a str,
}

/// Factory producing a backend client for an issuer
///
/// Builders must not mutate issuer status or publish events; any failure is
/// reported as a build-stage failure by setup.
#[async_trait]
pub trait ClientBuilder: Send + Sync {
    /// Construct a client for the issuer described by `params`
    async fn build(&self, params: BuildParams<'_>) -> Result<Box<dyn IssuerClient>, ClientError>;
}
