use crate::CrdObjectStatus;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Selects placement infrastructure (network, service-engine group) for the
/// virtual services built by this controller.
#[derive(Clone, Debug, CustomResource, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "adc.ingress.dev",
    version = "v1alpha1",
    kind = "InfraSetting",
    status = "CrdObjectStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct InfraSettingSpec {
    #[serde(default)]
    pub network: InfraSettingNetwork,
    #[serde(default)]
    pub se_group: InfraSettingSeGroup,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfraSettingNetwork {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct InfraSettingSeGroup {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
}
