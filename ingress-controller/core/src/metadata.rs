use serde::{Deserialize, Serialize};

/// Lifecycle of a CRD override recorded on a node.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrdState {
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "INACTIVE")]
    Inactive,
}

/// Which CRD last touched a node, so that status can be reconciled back to
/// the originating object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrdMetadata {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// `namespace/name` of the CRD object.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(default)]
    pub status: CrdState,
}

/// Opaque blob stored on ADC objects so the controller can reconcile them
/// back to the originating Kubernetes resources. Travels as a JSON string
/// field on the VS and pool payloads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMetadata {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ingress_name: String,
    /// Set for L4 load-balancer services instead of `ingress_name`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,
    /// `namespace/ingress` pairs for hosts claimed by several ingresses.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespace_ingress_name: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hostnames: Vec<String>,
    #[serde(default, skip_serializing_if = "crd_status_is_unset")]
    pub crd_status: CrdMetadata,
}

fn crd_status_is_unset(m: &CrdMetadata) -> bool {
    m.kind.is_empty() && m.value.is_empty() && m.status == CrdState::Unset
}

impl ServiceMetadata {
    pub fn for_ingress(ingress: &str, namespace: &str, hostnames: Vec<String>) -> Self {
        Self {
            ingress_name: ingress.to_string(),
            namespace: namespace.to_string(),
            hostnames,
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
