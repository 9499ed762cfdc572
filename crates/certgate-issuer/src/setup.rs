//! Issuer setup: verify that a PKI backend is reachable and credentials work
//!
//! One call to [`IssuerSetup::setup`] walks a fixed sequence:
//!
//! 1. build a client through the injected [`ClientBuilder`]
//! 2. ping the backend
//! 3. verify credentials, when the client supports it
//!
//! The first failing stage stops the sequence. Whatever the outcome, the
//! issuer ends up with exactly one `Ready` condition describing it. A
//! `Normal` event is published only on success; failures are visible through
//! the condition and the returned [`SetupError`], whose text matches the
//! condition message.
//!
//! Retrying is the caller's job. Every blocking stage races the caller's
//! [`CancellationToken`] and the configured per-call deadline.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use certgate_common::crd::{set_ready_condition, ConditionStatus, GenericIssuer};
use certgate_common::events::{
    actions, reasons, EventPublisher, KubeEventPublisher, NoopEventPublisher,
};
use certgate_common::metrics::IssuerMetrics;
use certgate_common::secrets::{SecretLister, StaticSecretLister};
use kube::runtime::events::EventType;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::builder::{BuildParams, ClientBuilder};
use crate::client::ClientError;
use crate::config::SetupConfig;

/// Condition reason recorded when any setup stage fails
pub const REASON_ERROR_SETUP: &str = "ErrorSetup";

/// Stage of the setup sequence that failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupStage {
    /// Client construction
    Build,
    /// Backend liveness probe
    Ping,
    /// Credential verification
    VerifyCredentials,
}

impl SetupStage {
    /// Stable label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Ping => "ping",
            Self::VerifyCredentials => "verify_credentials",
        }
    }
}

impl std::fmt::Display for SetupStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Setup failure, tagged with the stage that failed
#[derive(Debug, Error)]
pub enum SetupError {
    /// The client builder failed; nothing was sent to the backend
    #[error("Failed to setup {backend} issuer: error building client: {source}")]
    Build {
        /// Backend display name
        backend: String,
        /// Underlying cause
        source: ClientError,
    },

    /// The backend was unreachable or rejected the liveness probe
    #[error("Failed to setup {backend} issuer: error pinging {backend} API: {source}")]
    Ping {
        /// Backend display name
        backend: String,
        /// Underlying cause
        source: ClientError,
    },

    /// The backend was reachable but rejected the credentials
    #[error("Failed to setup {backend} issuer: client.VerifyCredentials: {source}")]
    VerifyCredentials {
        /// Backend display name
        backend: String,
        /// Underlying cause
        source: ClientError,
    },
}

impl SetupError {
    fn at(stage: SetupStage, backend: &str, source: ClientError) -> Self {
        let backend = backend.to_string();
        match stage {
            SetupStage::Build => Self::Build { backend, source },
            SetupStage::Ping => Self::Ping { backend, source },
            SetupStage::VerifyCredentials => Self::VerifyCredentials { backend, source },
        }
    }

    /// The stage that failed
    pub fn stage(&self) -> SetupStage {
        match self {
            Self::Build { .. } => SetupStage::Build,
            Self::Ping { .. } => SetupStage::Ping,
            Self::VerifyCredentials { .. } => SetupStage::VerifyCredentials,
        }
    }

    /// Text recorded on the issuer's `Ready` condition
    pub fn condition_message(&self) -> String {
        self.to_string()
    }

    /// The underlying client error
    pub fn cause(&self) -> &ClientError {
        match self {
            Self::Build { source, .. }
            | Self::Ping { source, .. }
            | Self::VerifyCredentials { source, .. } => source,
        }
    }
}

/// Readiness verification for issuers
///
/// Holds only shared, immutable dependencies; concurrent calls for
/// different issuers are fine, calls for the same issuer must be serialized
/// by the caller.
pub struct IssuerSetup {
    config: SetupConfig,
    builder: Arc<dyn ClientBuilder>,
    secrets: Arc<dyn SecretLister>,
    events: Arc<dyn EventPublisher>,
    metrics: Arc<IssuerMetrics>,
}

impl IssuerSetup {
    /// Start building an `IssuerSetup` around the given client builder
    pub fn builder(client_builder: Arc<dyn ClientBuilder>) -> IssuerSetupBuilder {
        IssuerSetupBuilder::new(client_builder)
    }

    /// Configuration in effect
    pub fn config(&self) -> &SetupConfig {
        &self.config
    }

    /// Namespace an issuer's secrets are read from
    ///
    /// Namespaced issuers use their own namespace; cluster-scoped issuers use
    /// the configured cluster resource namespace. A namespaced issuer with no
    /// namespace is a configuration error.
    pub fn resource_namespace(&self, issuer: &dyn GenericIssuer) -> Result<String, ClientError> {
        if issuer.is_cluster_scoped() {
            return Ok(self.config.cluster_resource_namespace.clone());
        }
        issuer.issuer_namespace().ok_or_else(|| {
            ClientError::Config(format!(
                "issuer {} has no namespace",
                issuer.issuer_name()
            ))
        })
    }

    /// Verify the issuer's backend and record the verdict on its status
    ///
    /// Returns `Err` exactly when the issuer's `Ready` condition was set to
    /// `False`.
    #[instrument(
        skip_all,
        fields(
            issuer = %issuer.issuer_name(),
            namespace = ?issuer.issuer_namespace(),
            backend = %self.config.backend,
        )
    )]
    pub async fn setup(
        &self,
        cancel: &CancellationToken,
        issuer: &mut dyn GenericIssuer,
    ) -> Result<(), SetupError> {
        let started = Instant::now();
        let backend = self.config.backend.as_str();

        let result = self.verify(cancel, &*issuer).await;

        let outcome = match &result {
            Ok(()) => {
                let reason = self.config.started_reason();
                set_ready_condition(issuer, ConditionStatus::True, reason.clone(), reason);
                self.events
                    .publish(
                        &issuer.reference(),
                        EventType::Normal,
                        reasons::READY,
                        actions::SETUP,
                        Some(format!("Verified issuer with {backend} server")),
                    )
                    .await;
                info!("Issuer verified and ready");
                "ready"
            }
            Err(e) => {
                set_ready_condition(
                    issuer,
                    ConditionStatus::False,
                    REASON_ERROR_SETUP,
                    e.to_string(),
                );
                warn!(stage = %e.stage(), error = %e, "Issuer setup failed");
                e.stage().as_str()
            }
        };

        self.metrics.record_setup(
            &issuer_key(&*issuer),
            outcome,
            started.elapsed().as_secs_f64(),
        );

        result
    }

    /// Run the stages in order, stopping at the first failure
    ///
    /// The client is dropped before returning on every path.
    async fn verify(
        &self,
        cancel: &CancellationToken,
        issuer: &dyn GenericIssuer,
    ) -> Result<(), SetupError> {
        let backend = self.config.backend.as_str();
        let namespace = self
            .resource_namespace(issuer)
            .map_err(|e| SetupError::at(SetupStage::Build, backend, e))?;

        let params = BuildParams {
            namespace: &namespace,
            secrets: Arc::clone(&self.secrets),
            issuer,
            metrics: Arc::clone(&self.metrics),
            span: tracing::Span::current(),
            cluster_resource_namespace: &self.config.cluster_resource_namespace,
        };
        let client = self
            .bounded(cancel, self.builder.build(params))
            .await
            .map_err(|e| SetupError::at(SetupStage::Build, backend, e))?;
        debug!(resource_namespace = %namespace, "Client built");

        self.bounded(cancel, client.ping())
            .await
            .map_err(|e| SetupError::at(SetupStage::Ping, backend, e))?;
        debug!("Backend ping succeeded");

        match client.credential_verifier() {
            Some(verifier) => {
                self.bounded(cancel, verifier.verify_credentials())
                    .await
                    .map_err(|e| SetupError::at(SetupStage::VerifyCredentials, backend, e))?;
                debug!("Credentials verified");
            }
            None => debug!("Client cannot verify credentials, skipping"),
        }

        Ok(())
    }

    /// Await a stage, giving up on cancellation or when the deadline passes
    async fn bounded<T>(
        &self,
        cancel: &CancellationToken,
        call: impl Future<Output = Result<T, ClientError>>,
    ) -> Result<T, ClientError> {
        let limited = async {
            match self.config.call_timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::DeadlineExceeded(limit)),
                },
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = limited => result,
        }
    }
}

fn issuer_key(issuer: &dyn GenericIssuer) -> String {
    match issuer.issuer_namespace() {
        Some(ns) => format!("{}/{}", ns, issuer.issuer_name()),
        None => issuer.issuer_name(),
    }
}

/// Builder for [`IssuerSetup`]
///
/// Defaults: [`SetupConfig::default`], an empty secret lister, a no-op event
/// publisher and metrics registered on the global meter provider.
pub struct IssuerSetupBuilder {
    config: SetupConfig,
    builder: Arc<dyn ClientBuilder>,
    secrets: Option<Arc<dyn SecretLister>>,
    events: Option<Arc<dyn EventPublisher>>,
    kube_client: Option<kube::Client>,
    metrics: Option<Arc<IssuerMetrics>>,
}

impl IssuerSetupBuilder {
    fn new(builder: Arc<dyn ClientBuilder>) -> Self {
        Self {
            config: SetupConfig::default(),
            builder,
            secrets: None,
            events: None,
            kube_client: None,
            metrics: None,
        }
    }

    /// Use the given configuration
    pub fn config(mut self, config: SetupConfig) -> Self {
        self.config = config;
        self
    }

    /// Secret lister handed to the client builder
    pub fn secrets(mut self, secrets: Arc<dyn SecretLister>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    /// Event publisher for success events
    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Publish events through the Kubernetes API as the configured controller
    ///
    /// The publisher is created in [`build`](Self::build), so the controller
    /// name comes from the final configuration. An explicit
    /// [`events`](Self::events) publisher takes precedence.
    pub fn kube_events(mut self, client: kube::Client) -> Self {
        self.kube_client = Some(client);
        self
    }

    /// Metrics sink
    pub fn metrics(mut self, metrics: Arc<IssuerMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn kube_event_publisher(&self) -> Option<KubeEventPublisher> {
        self.kube_client
            .clone()
            .map(|client| KubeEventPublisher::new(client, &self.config.controller_name))
    }

    /// Build the `IssuerSetup`
    pub fn build(self) -> IssuerSetup {
        let events: Arc<dyn EventPublisher> = match (&self.events, self.kube_event_publisher()) {
            (Some(events), _) => Arc::clone(events),
            (None, Some(publisher)) => Arc::new(publisher),
            (None, None) => Arc::new(NoopEventPublisher),
        };

        IssuerSetup {
            config: self.config,
            builder: self.builder,
            secrets: self
                .secrets
                .unwrap_or_else(|| Arc::new(StaticSecretLister::new())),
            events,
            metrics: self
                .metrics
                .unwrap_or_else(|| Arc::new(IssuerMetrics::global())),
        }
    }
}
