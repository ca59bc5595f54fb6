use crate::CrdObjectStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Overrides pool-level properties for the paths of one FQDN.
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "adc.ingress.dev",
    version = "v1alpha1",
    kind = "HttpRule",
    status = "CrdObjectStatus",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct HttpRuleSpec {
    pub fqdn: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<HttpRulePath>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRulePath {
    /// Path this rule applies to, e.g. `/foo`.
    pub target: String,
    #[serde(default)]
    pub tls: HttpRulePathTls,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_monitors: Vec<String>,
    #[serde(default)]
    pub load_balancer_policy: LoadBalancerPolicy,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HttpRulePathTls {
    /// Only `reencrypt` is honored; other values leave the pool untouched.
    #[serde(default, rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ssl_profile: String,
    /// PEM CA bundle used to validate the backend; materializes a PKI
    /// profile sub-node on the pool.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub destination_ca: String,
}

pub const TLS_REENCRYPT: &str = "reencrypt";

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerPolicy {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub algorithm: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
    /// Required for `LB_ALGORITHM_CONSISTENT_HASH_CUSTOM_HEADER`; must be
    /// empty otherwise.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub host_header: String,
}
