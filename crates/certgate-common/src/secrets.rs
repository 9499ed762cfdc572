//! Secret lookup for issuer credentials
//!
//! Client builders resolve credentials through [`SecretLister`] rather than
//! the API server so a readiness check never issues its own GET requests.
//! In production the lister is a reflector [`Store`] kept warm by a watcher;
//! tests use [`StaticSecretLister`].

use std::collections::BTreeMap;
use std::sync::Arc;

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::runtime::reflector::{ObjectRef, Store};

/// Read-only, cache-backed lookup of Secrets
#[cfg_attr(test, mockall::automock)]
pub trait SecretLister: Send + Sync {
    /// Get a secret by namespace and name, `None` if it is not cached
    fn get(&self, namespace: &str, name: &str) -> Option<Arc<Secret>>;
}

impl SecretLister for Store<Secret> {
    fn get(&self, namespace: &str, name: &str) -> Option<Arc<Secret>> {
        Store::get(self, &ObjectRef::new(name).within(namespace))
    }
}

/// Fixed set of secrets keyed by `(namespace, name)`
#[derive(Clone, Debug, Default)]
pub struct StaticSecretLister {
    secrets: BTreeMap<(String, String), Arc<Secret>>,
}

impl StaticSecretLister {
    /// Create an empty lister
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret built from string key/value pairs
    pub fn with_secret<'a>(
        mut self,
        namespace: &str,
        name: &str,
        data: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let string_data = data
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            string_data: Some(string_data),
            ..Default::default()
        };
        self.secrets
            .insert((namespace.to_string(), name.to_string()), Arc::new(secret));
        self
    }
}

impl SecretLister for StaticSecretLister {
    fn get(&self, namespace: &str, name: &str) -> Option<Arc<Secret>> {
        self.secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

/// Read a UTF-8 value from a secret, checking `data` before `stringData`
///
/// Returns `None` when the key is absent or the bytes are not valid UTF-8.
pub fn secret_value(secret: &Secret, key: &str) -> Option<String> {
    if let Some(bytes) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return String::from_utf8(bytes.0.clone()).ok();
    }
    secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .cloned()
}
