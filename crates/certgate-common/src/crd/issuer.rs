//! Issuer and ClusterIssuer CRDs
//!
//! An issuer describes how to reach and authenticate to an external PKI
//! backend. `Issuer` is namespaced and reads its secrets from its own
//! namespace; `ClusterIssuer` is cluster-scoped and reads its secrets from the
//! controller's cluster resource namespace.
//!
//! Both kinds share [`IssuerStatus`], whose condition list is maintained with
//! replace-by-type semantics: there is never more than one condition of a
//! given type.

use k8s_openapi::api::core::v1::ObjectReference;
use kube::{CustomResource, Resource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::{Condition, ConditionStatus, SecretRef, CONDITION_READY};
use crate::Error;

/// Desired state of a namespaced Issuer
///
/// Example:
/// ```yaml
/// apiVersion: certgate.dev/v1alpha1
/// kind: Issuer
/// metadata:
///   name: venafi-tpp
///   namespace: payments
/// spec:
///   venafi:
///     zone: "devops\\cert-manager"
///     tpp:
///       url: https://tpp.example.com/vedsdk
///       credentialsRef:
///         name: tpp-credentials
/// ```
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "certgate.dev",
    version = "v1alpha1",
    kind = "Issuer",
    plural = "issuers",
    namespaced,
    status = "IssuerStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IssuerSpec {
    /// Venafi backend configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venafi: Option<VenafiIssuer>,
}

/// Desired state of a cluster-scoped ClusterIssuer
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "certgate.dev",
    version = "v1alpha1",
    kind = "ClusterIssuer",
    plural = "clusterissuers",
    status = "IssuerStatus",
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterIssuerSpec {
    /// Venafi backend configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venafi: Option<VenafiIssuer>,
}

/// Venafi backend configuration
///
/// Exactly one of `tpp` or `cloud` must be set.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VenafiIssuer {
    /// Policy zone certificates are requested in
    pub zone: String,

    /// Trust Protection Platform connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tpp: Option<VenafiTpp>,

    /// Venafi Cloud connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud: Option<VenafiCloud>,
}

/// Trust Protection Platform connection settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VenafiTpp {
    /// Base URL of the TPP WebSDK (e.g., https://tpp.example.com/vedsdk)
    pub url: String,

    /// Secret holding `username`/`password` or `access-token`
    pub credentials_ref: SecretRef,

    /// PEM bundle used to verify the TPP server certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
}

/// Venafi Cloud connection settings
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VenafiCloud {
    /// API base URL, defaults to the public Venafi Cloud endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Secret holding the API key
    pub api_token_secret_ref: SecretRef,
}

impl VenafiIssuer {
    /// Validate that exactly one connection type is configured
    pub fn validate(&self) -> Result<(), Error> {
        if self.zone.trim().is_empty() {
            return Err(Error::validation_for_field("spec.venafi.zone", "zone must be set"));
        }
        match (&self.tpp, &self.cloud) {
            (Some(_), Some(_)) => Err(Error::validation_for_field(
                "spec.venafi",
                "tpp and cloud are mutually exclusive",
            )),
            (None, None) => Err(Error::validation_for_field(
                "spec.venafi",
                "one of tpp or cloud must be configured",
            )),
            (Some(tpp), None) if tpp.url.trim().is_empty() => Err(Error::validation_for_field(
                "spec.venafi.tpp.url",
                "url must be set",
            )),
            _ => Ok(()),
        }
    }
}

/// Status shared by Issuer and ClusterIssuer
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerStatus {
    /// Conditions representing the issuer state, at most one per type
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl IssuerStatus {
    /// Upsert a condition by type
    ///
    /// The first condition of the same type is overwritten in place and any
    /// later duplicates are dropped, so unrelated conditions keep their
    /// position. The transition time of the existing entry survives when the
    /// status itself did not change.
    pub fn set_condition(&mut self, mut condition: Condition) {
        let Some(first) = self
            .conditions
            .iter()
            .position(|c| c.type_ == condition.type_)
        else {
            self.conditions.push(condition);
            return;
        };

        let existing = &self.conditions[first];
        if existing.status == condition.status && existing.last_transition_time.is_some() {
            condition.last_transition_time = existing.last_transition_time;
        }
        self.conditions[first] = condition;

        let mut index = 0;
        let type_ = self.conditions[first].type_.clone();
        self.conditions.retain(|c| {
            let keep = index <= first || c.type_ != type_;
            index += 1;
            keep
        });
    }

    /// Look up a condition by type
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// The `Ready` condition, if one has been recorded
    pub fn ready_condition(&self) -> Option<&Condition> {
        self.condition(CONDITION_READY)
    }
}

/// Common view over Issuer and ClusterIssuer
///
/// Setup code works against this trait so the same verification path serves
/// both scopes.
pub trait GenericIssuer: Send + Sync {
    /// Resource name
    fn issuer_name(&self) -> String;

    /// Namespace for namespaced issuers, `None` for cluster-scoped ones and
    /// for namespaced issuers whose namespace is not yet set
    fn issuer_namespace(&self) -> Option<String>;

    /// `metadata.generation`, if set by the API server
    fn generation(&self) -> Option<i64>;

    /// Venafi backend configuration
    fn venafi(&self) -> Option<&VenafiIssuer>;

    /// Current status, if any
    fn issuer_status(&self) -> Option<&IssuerStatus>;

    /// Mutable status, created empty on first access
    fn issuer_status_mut(&mut self) -> &mut IssuerStatus;

    /// Object reference used when publishing events
    fn reference(&self) -> ObjectReference;

    /// Returns true for ClusterIssuer
    fn is_cluster_scoped(&self) -> bool;
}

impl GenericIssuer for Issuer {
    fn issuer_name(&self) -> String {
        self.metadata.name.clone().unwrap_or_default()
    }

    fn issuer_namespace(&self) -> Option<String> {
        // Unset until the API server defaults it
        self.metadata.namespace.clone().filter(|ns| !ns.is_empty())
    }

    fn generation(&self) -> Option<i64> {
        self.metadata.generation
    }

    fn venafi(&self) -> Option<&VenafiIssuer> {
        self.spec.venafi.as_ref()
    }

    fn issuer_status(&self) -> Option<&IssuerStatus> {
        self.status.as_ref()
    }

    fn issuer_status_mut(&mut self) -> &mut IssuerStatus {
        self.status.get_or_insert_with(IssuerStatus::default)
    }

    fn reference(&self) -> ObjectReference {
        self.object_ref(&())
    }

    fn is_cluster_scoped(&self) -> bool {
        false
    }
}

impl GenericIssuer for ClusterIssuer {
    fn issuer_name(&self) -> String {
        self.metadata.name.clone().unwrap_or_default()
    }

    fn issuer_namespace(&self) -> Option<String> {
        None
    }

    fn generation(&self) -> Option<i64> {
        self.metadata.generation
    }

    fn venafi(&self) -> Option<&VenafiIssuer> {
        self.spec.venafi.as_ref()
    }

    fn issuer_status(&self) -> Option<&IssuerStatus> {
        self.status.as_ref()
    }

    fn issuer_status_mut(&mut self) -> &mut IssuerStatus {
        self.status.get_or_insert_with(IssuerStatus::default)
    }

    fn reference(&self) -> ObjectReference {
        self.object_ref(&())
    }

    fn is_cluster_scoped(&self) -> bool {
        true
    }
}

/// Set the issuer's `Ready` condition, replacing any previous one
pub fn set_ready_condition(
    issuer: &mut dyn GenericIssuer,
    status: ConditionStatus,
    reason: impl Into<String>,
    message: impl Into<String>,
) {
    let condition = Condition::new(CONDITION_READY, status, reason, message)
        .observed_generation(issuer.generation());
    issuer.issuer_status_mut().set_condition(condition);
}
