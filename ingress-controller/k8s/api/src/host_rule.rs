use crate::CrdObjectStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Overrides virtual-host level properties of the child VS serving one FQDN.
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "adc.ingress.dev",
    version = "v1alpha1",
    kind = "HostRule",
    status = "CrdObjectStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HostRuleSpec {
    pub virtual_host: VirtualHostSpec,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VirtualHostSpec {
    pub fqdn: String,
    #[serde(default)]
    pub tls: HostRuleTls,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub waf_policy: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub application_profile: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub analytics_profile: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_page_profile: String,
    #[serde(default)]
    pub http_policy: HttpPolicyOverride,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datascripts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_virtual_host: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostRuleTls {
    /// Name of an `sslkeyandcertificate` object on the ADC. When set, the
    /// locally-built certificates of the child VS are dropped in favour of
    /// the reference.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssl_key_certificate: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssl_profile: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpPolicyOverride {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_sets: Vec<String>,
    /// When true, all HTTP policies auto-built by the controller are dropped
    /// from the child VS.
    #[serde(default)]
    pub overwrite: bool,
}
