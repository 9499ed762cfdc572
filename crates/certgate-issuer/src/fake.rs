//! Fake client and builder for exercising setup without a backend
//!
//! [`FakeClient`] answers `ping` and, optionally, `verify_credentials` from
//! injected closures and counts the calls it receives. [`FakeClientBuilder`]
//! hands out clients from a factory closure and records the namespace each
//! build was asked for.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::builder::{BuildParams, ClientBuilder};
use crate::client::{ClientError, CredentialVerifier, IssuerClient};

type ResultFn = Box<dyn Fn() -> Result<(), ClientError> + Send + Sync>;
type BuildFn =
    Box<dyn Fn(&BuildParams<'_>) -> Result<Box<dyn IssuerClient>, ClientError> + Send + Sync>;

/// Call counters shared between a fake client and the test holding it
#[derive(Debug, Default)]
pub struct FakeCalls {
    ping: AtomicUsize,
    verify_credentials: AtomicUsize,
}

impl FakeCalls {
    /// Number of `ping` calls that started
    pub fn ping(&self) -> usize {
        self.ping.load(Ordering::SeqCst)
    }

    /// Number of `verify_credentials` calls that started
    pub fn verify_credentials(&self) -> usize {
        self.verify_credentials.load(Ordering::SeqCst)
    }
}

/// Backend client driven by closures
pub struct FakeClient {
    ping_fn: ResultFn,
    verify_credentials_fn: Option<ResultFn>,
    ping_delay: Option<Duration>,
    verify_delay: Option<Duration>,
    calls: Arc<FakeCalls>,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClient {
    /// A client whose ping succeeds and which cannot verify credentials
    pub fn new() -> Self {
        Self {
            ping_fn: Box::new(|| Ok(())),
            verify_credentials_fn: None,
            ping_delay: None,
            verify_delay: None,
            calls: Arc::new(FakeCalls::default()),
        }
    }

    /// Set the ping outcome
    pub fn with_ping(
        mut self,
        f: impl Fn() -> Result<(), ClientError> + Send + Sync + 'static,
    ) -> Self {
        self.ping_fn = Box::new(f);
        self
    }

    /// Enable credential verification with the given outcome
    pub fn with_verify_credentials(
        mut self,
        f: impl Fn() -> Result<(), ClientError> + Send + Sync + 'static,
    ) -> Self {
        self.verify_credentials_fn = Some(Box::new(f));
        self
    }

    /// Sleep this long inside every call before answering
    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_ping_delay(delay).with_verify_delay(delay)
    }

    /// Sleep this long inside `ping` before answering
    pub fn with_ping_delay(mut self, delay: Duration) -> Self {
        self.ping_delay = Some(delay);
        self
    }

    /// Sleep this long inside `verify_credentials` before answering
    pub fn with_verify_delay(mut self, delay: Duration) -> Self {
        self.verify_delay = Some(delay);
        self
    }

    /// Share call counters with an existing handle
    pub fn with_calls(mut self, calls: Arc<FakeCalls>) -> Self {
        self.calls = calls;
        self
    }

    /// Handle to this client's call counters
    pub fn calls(&self) -> Arc<FakeCalls> {
        Arc::clone(&self.calls)
    }

}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

#[async_trait]
impl IssuerClient for FakeClient {
    async fn ping(&self) -> Result<(), ClientError> {
        self.calls.ping.fetch_add(1, Ordering::SeqCst);
        pause(self.ping_delay).await;
        (self.ping_fn)()
    }

    fn credential_verifier(&self) -> Option<&dyn CredentialVerifier> {
        self.verify_credentials_fn
            .as_ref()
            .map(|_| self as &dyn CredentialVerifier)
    }
}

#[async_trait]
impl CredentialVerifier for FakeClient {
    async fn verify_credentials(&self) -> Result<(), ClientError> {
        self.calls.verify_credentials.fetch_add(1, Ordering::SeqCst);
        pause(self.verify_delay).await;
        match &self.verify_credentials_fn {
            Some(f) => f(),
            None => Ok(()),
        }
    }
}

/// Builder handing out clients from a factory closure
pub struct FakeClientBuilder {
    build_fn: BuildFn,
    delay: Option<Duration>,
    namespaces: Mutex<Vec<String>>,
}

impl FakeClientBuilder {
    /// Build clients with full access to the build parameters
    pub fn new(
        f: impl Fn(&BuildParams<'_>) -> Result<Box<dyn IssuerClient>, ClientError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            build_fn: Box::new(f),
            delay: None,
            namespaces: Mutex::new(Vec::new()),
        }
    }

    /// Always return a fresh client from `factory`
    pub fn returning(factory: impl Fn() -> FakeClient + Send + Sync + 'static) -> Self {
        Self::new(move |_| Ok(Box::new(factory()) as Box<dyn IssuerClient>))
    }

    /// Always fail with the given message
    pub fn failing(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        Self::new(move |_| Err(ClientError::other(msg.clone())))
    }

    /// Sleep this long inside every build before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of build calls received
    pub fn builds(&self) -> usize {
        self.namespaces.lock().len()
    }

    /// Resource namespace passed to each build call, oldest first
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.lock().clone()
    }
}

#[async_trait]
impl ClientBuilder for FakeClientBuilder {
    async fn build(&self, params: BuildParams<'_>) -> Result<Box<dyn IssuerClient>, ClientError> {
        self.namespaces.lock().push(params.namespace.to_string());
        pause(self.delay).await;
        (self.build_fn)(&params)
    }
}
