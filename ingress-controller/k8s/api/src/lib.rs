//! Kubernetes-facing types for the override CRDs.
//!
//! `HostRule` overrides a virtual host by FQDN, `HTTPRule` overrides pools by
//! FQDN + path, and `AviInfraSetting` selects placement infrastructure. Specs
//! deliberately mirror the upstream API shapes; everything the graph needs is
//! re-modeled as plain values in the graph crate so this crate stays a thin
//! API binding.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod host_rule;
mod http_rule;
mod infra_setting;

pub use self::{
    host_rule::{HostRule, HostRuleSpec, HostRuleTls, HttpPolicyOverride, VirtualHostSpec},
    http_rule::{
        HttpRule, HttpRulePath, HttpRulePathTls, HttpRuleSpec, LoadBalancerPolicy, TLS_REENCRYPT,
    },
    infra_setting::{InfraSetting, InfraSettingNetwork, InfraSettingSeGroup, InfraSettingSpec},
};

pub use k8s_openapi::api::core::v1::Secret;
pub use kube::{Client, Resource, ResourceExt};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const STATUS_ACCEPTED: &str = "Accepted";
pub const STATUS_REJECTED: &str = "Rejected";

/// Shared status sub-resource for all three CRDs.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CrdObjectStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl CrdObjectStatus {
    pub fn is_rejected(&self) -> bool {
        self.status == STATUS_REJECTED
    }
}
