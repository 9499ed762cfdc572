//! Setup configuration
//!
//! [`SetupConfig::default`] uses built-in defaults; [`SetupConfig::from_env`]
//! overlays the `CERTGATE_*` environment variables set on the controller
//! Deployment.

use std::time::Duration;

use certgate_common::{Error, DEFAULT_CLUSTER_RESOURCE_NAMESPACE, DEFAULT_CONTROLLER_NAME};

/// Display name of the Venafi backend, used in conditions and events
pub const VENAFI_BACKEND: &str = "Venafi";

/// Env var overriding the cluster resource namespace
pub const ENV_CLUSTER_RESOURCE_NAMESPACE: &str = "CERTGATE_CLUSTER_RESOURCE_NAMESPACE";
/// Env var overriding the controller name
pub const ENV_CONTROLLER_NAME: &str = "CERTGATE_CONTROLLER_NAME";
/// Env var setting the per-call deadline in seconds (0 disables it)
pub const ENV_SETUP_TIMEOUT_SECS: &str = "CERTGATE_SETUP_TIMEOUT_SECS";

/// Default per-call deadline for build, ping and credential verification
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for issuer setup
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SetupConfig {
    /// Backend display name used in condition and event text
    pub backend: String,
    /// Controller name reported on events
    pub controller_name: String,
    /// Namespace holding secrets for cluster-scoped issuers
    pub cluster_resource_namespace: String,
    /// Deadline applied to each blocking stage; `None` waits indefinitely
    pub call_timeout: Option<Duration>,
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            backend: VENAFI_BACKEND.to_string(),
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
            cluster_resource_namespace: DEFAULT_CLUSTER_RESOURCE_NAMESPACE.to_string(),
            call_timeout: Some(DEFAULT_CALL_TIMEOUT),
        }
    }
}

impl SetupConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let mut config = Self::default();

        if let Some(ns) = lookup(ENV_CLUSTER_RESOURCE_NAMESPACE).filter(|v| !v.is_empty()) {
            config.cluster_resource_namespace = ns;
        }
        if let Some(name) = lookup(ENV_CONTROLLER_NAME).filter(|v| !v.is_empty()) {
            config.controller_name = name;
        }
        if let Some(raw) = lookup(ENV_SETUP_TIMEOUT_SECS) {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                Error::config(
                    ENV_SETUP_TIMEOUT_SECS,
                    format!("expected a whole number of seconds, got '{raw}'"),
                )
            })?;
            config.call_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Set the backend display name
    pub fn backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = backend.into();
        self
    }

    /// Set the cluster resource namespace
    pub fn cluster_resource_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.cluster_resource_namespace = namespace.into();
        self
    }

    /// Set the per-call deadline
    pub fn call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Condition reason and message used when the issuer is ready
    pub fn started_reason(&self) -> String {
        format!("{} issuer started", self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = SetupConfig::default();
        assert_eq!(config.backend, "Venafi");
        assert_eq!(config.cluster_resource_namespace, DEFAULT_CLUSTER_RESOURCE_NAMESPACE);
        assert_eq!(config.call_timeout, Some(DEFAULT_CALL_TIMEOUT));
        assert_eq!(config.started_reason(), "Venafi issuer started");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = SetupConfig::from_lookup(lookup(&[
            (ENV_CLUSTER_RESOURCE_NAMESPACE, "cert-manager"),
            (ENV_CONTROLLER_NAME, "venafi-controller"),
            (ENV_SETUP_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();

        assert_eq!(config.cluster_resource_namespace, "cert-manager");
        assert_eq!(config.controller_name, "venafi-controller");
        assert_eq!(config.call_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let config = SetupConfig::from_lookup(lookup(&[(ENV_SETUP_TIMEOUT_SECS, "0")])).unwrap();
        assert_eq!(config.call_timeout, None);
    }

    #[test]
    fn malformed_timeout_is_a_config_error() {
        let err = SetupConfig::from_lookup(lookup(&[(ENV_SETUP_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert_eq!(err.field(), Some(ENV_SETUP_TIMEOUT_SECS));
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn empty_values_keep_defaults() {
        let config =
            SetupConfig::from_lookup(lookup(&[(ENV_CLUSTER_RESOURCE_NAMESPACE, "")])).unwrap();
        assert_eq!(config.cluster_resource_namespace, DEFAULT_CLUSTER_RESOURCE_NAMESPACE);
    }

    #[test]
    fn builder_setters() {
        let config = SetupConfig::default()
            .backend("Vault")
            .cluster_resource_namespace("pki")
            .call_timeout(None);
        assert_eq!(config.started_reason(), "Vault issuer started");
        assert_eq!(config.cluster_resource_namespace, "pki");
        assert!(config.call_timeout.is_none());
    }
}
