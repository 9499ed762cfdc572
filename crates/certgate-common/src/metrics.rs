//! Metrics sink for issuer setup and backend clients
//!
//! [`IssuerMetrics`] is constructed once from a [`Meter`] and handed to
//! issuer setup and client builders explicitly, so tests can run against an
//! isolated meter.

use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

/// Instrumentation scope name for certgate meters
pub const METER_NAME: &str = "certgate";

/// OpenTelemetry instruments used during issuer setup
#[derive(Clone)]
pub struct IssuerMetrics {
    /// Counter of completed setup calls
    ///
    /// Labels:
    /// - `issuer`: namespace/name of the issuer
    /// - `result`: ready, or the failing stage (build, ping, verify_credentials)
    pub setup_total: Counter<u64>,

    /// Histogram of setup call duration in seconds
    ///
    /// Labels:
    /// - `issuer`: namespace/name of the issuer
    pub setup_duration: Histogram<f64>,

    /// Counter of requests made by backend clients
    ///
    /// Labels:
    /// - `backend`: backend display name
    /// - `operation`: ping, verify_credentials, ...
    pub backend_requests_total: Counter<u64>,
}

impl IssuerMetrics {
    /// Register the instruments on the given meter
    pub fn new(meter: &Meter) -> Self {
        Self {
            setup_total: meter
                .u64_counter("certgate_issuer_setup_total")
                .with_description("Total number of issuer setup calls by result")
                .with_unit("{calls}")
                .build(),
            setup_duration: meter
                .f64_histogram("certgate_issuer_setup_duration_seconds")
                .with_description("Duration of issuer setup calls in seconds")
                .with_unit("s")
                .build(),
            backend_requests_total: meter
                .u64_counter("certgate_backend_requests_total")
                .with_description("Total number of requests sent to PKI backends")
                .with_unit("{requests}")
                .build(),
        }
    }

    /// Register the instruments on the global meter provider
    pub fn global() -> Self {
        Self::new(&global::meter(METER_NAME))
    }

    /// Record the outcome of one setup call
    pub fn record_setup(&self, issuer: &str, result: &str, elapsed_secs: f64) {
        self.setup_total.add(
            1,
            &[
                KeyValue::new("issuer", issuer.to_string()),
                KeyValue::new("result", result.to_string()),
            ],
        );
        self.setup_duration
            .record(elapsed_secs, &[KeyValue::new("issuer", issuer.to_string())]);
    }

    /// Record one request made by a backend client
    pub fn record_backend_request(&self, backend: &str, operation: &str) {
        self.backend_requests_total.add(
            1,
            &[
                KeyValue::new("backend", backend.to_string()),
                KeyValue::new("operation", operation.to_string()),
            ],
        );
    }
}
