use crate::checksum;
use std::collections::BTreeMap;

/// Which layout the builder produces for shared virtual services.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Parent VS plus SNI children; insecure hosts attach to the parent.
    Sni,
    /// Parent VS plus EVH children; every host gets a child.
    Evh,
}

/// How pool servers are resolved from a Kubernetes service.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ServiceType {
    ClusterIp,
    NodePort,
    NodePortLocal,
}

/// Fixed bucket counts for the shared-VS shard space.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShardSize {
    Small,
    Medium,
    Large,
}

impl ShardSize {
    pub fn buckets(self) -> u32 {
        match self {
            ShardSize::Small => 1,
            ShardSize::Medium => 4,
            ShardSize::Large => 8,
        }
    }
}

impl std::str::FromStr for ShardSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "small" => Ok(ShardSize::Small),
            "medium" => Ok(ShardSize::Medium),
            "large" => Ok(ShardSize::Large),
            _ => Err(format!("unrecognized shard size: {}", s)),
        }
    }
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sni" => Ok(Layout::Sni),
            "evh" => Ok(Layout::Evh),
            _ => Err(format!("unrecognized layout: {}", s)),
        }
    }
}

impl std::str::FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clusterip" => Ok(ServiceType::ClusterIp),
            "nodeport" => Ok(ServiceType::NodePort),
            "nodeportlocal" => Ok(ServiceType::NodePortLocal),
            _ => Err(format!("unrecognized service type: {}", s)),
        }
    }
}

/// Immutable controller configuration, shared as `Arc<Settings>` with every
/// component. Nothing in the graph or REST layers reads configuration from
/// anywhere else.
#[derive(Clone, Debug)]
pub struct Settings {
    pub tenant: String,
    pub cloud_name: String,
    pub name_prefix: String,
    pub shard_size: ShardSize,
    pub layout: Layout,
    pub vrf: String,
    pub se_group: String,
    pub service_type: ServiceType,
    pub network_name: Option<String>,
    pub subnet_ip: Option<String>,
    pub subnet_prefix: Option<u8>,
    pub enable_rhi: Option<bool>,
    /// IPAM-DNS subdomain of the cloud; seeds the default FQDN of every
    /// shared VSVIP when present.
    pub default_sub_domain: Option<String>,
    /// Labels identifying this cluster on the ADC. Folded into every VS
    /// checksum so that relabeling forces a full resync.
    pub cluster_labels: BTreeMap<String, String>,
    /// `created_by` identity stamped on every object this controller writes.
    pub controller_identity: String,
}

impl Settings {
    pub fn cluster_label_checksum(&self) -> u64 {
        if self.cluster_labels.is_empty() {
            return 0;
        }
        checksum::hash_json(&self.cluster_labels)
    }

    pub fn non_default_se_group(&self) -> Option<&str> {
        if self.se_group == DEFAULT_SE_GROUP {
            None
        } else {
            Some(&self.se_group)
        }
    }
}

pub const DEFAULT_SE_GROUP: &str = "Default-Group";

impl Default for Settings {
    fn default() -> Self {
        Self {
            tenant: "admin".to_string(),
            cloud_name: "Default-Cloud".to_string(),
            name_prefix: "cluster--".to_string(),
            shard_size: ShardSize::Small,
            layout: Layout::Sni,
            vrf: "global".to_string(),
            se_group: DEFAULT_SE_GROUP.to_string(),
            service_type: ServiceType::ClusterIp,
            network_name: None,
            subnet_ip: None,
            subnet_prefix: None,
            enable_rhi: None,
            default_sub_domain: None,
            cluster_labels: BTreeMap::new(),
            controller_identity: "adc-ingress-controller".to_string(),
        }
    }
}
