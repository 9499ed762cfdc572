//! Custom Resource Definitions for certgate
//!
//! This module contains the issuer CRDs and the condition types reported on
//! their status.

mod issuer;
mod types;

pub use issuer::{
    set_ready_condition, ClusterIssuer, ClusterIssuerSpec, GenericIssuer, Issuer, IssuerSpec,
    IssuerStatus, VenafiCloud, VenafiIssuer, VenafiTpp,
};
pub use types::{Condition, ConditionStatus, SecretRef, CONDITION_READY};
