use crate::{checksum, ServiceMetadata};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "HTTP")]
    Http,
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
}

/// A listener on a virtual service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortProtocol {
    pub port: u16,
    pub protocol: Protocol,
    #[serde(default)]
    pub enable_ssl: bool,
}

impl PortProtocol {
    pub fn http(port: u16) -> Self {
        Self {
            port,
            protocol: Protocol::Http,
            enable_ssl: false,
        }
    }

    pub fn https(port: u16) -> Self {
        Self {
            port,
            protocol: Protocol::Http,
            enable_ssl: true,
        }
    }
}

/// A single backend endpoint of a pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolServer {
    pub addr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Load-balancing selection for a pool, set by the http-rule overlay.
pub const LB_CONSISTENT_HASH: &str = "LB_ALGORITHM_CONSISTENT_HASH";
pub const LB_CONSISTENT_HASH_CUSTOM_HEADER: &str = "LB_ALGORITHM_CONSISTENT_HASH_CUSTOM_HEADER";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolNode {
    pub name: String,
    pub tenant: String,
    pub vrf_context: String,
    pub port_name: String,
    pub ingress_name: String,
    pub servers: Vec<PoolServer>,
    pub service_metadata: ServiceMetadata,
    pub sni_enabled: bool,
    pub ssl_profile_ref: String,
    pub pki_profile: Option<PkiProfileNode>,
    pub health_monitors: Vec<String>,
    pub lb_algorithm: String,
    pub lb_algorithm_hash: String,
    pub lb_algorithm_consistent_hash_hdr: String,
}

impl PoolNode {
    pub fn checksum(&self) -> u64 {
        let mut sum = checksum::hash_json(&self.servers)
            .wrapping_add(checksum::hash_str(&self.port_name))
            .wrapping_add(checksum::hash_str(&self.vrf_context))
            .wrapping_add(checksum::hash_json(&self.service_metadata))
            .wrapping_add(checksum::hash_sorted(&self.health_monitors));
        if self.sni_enabled {
            sum = sum
                .wrapping_add(checksum::hash_str("sni"))
                .wrapping_add(checksum::hash_str(&self.ssl_profile_ref));
        }
        if let Some(pki) = &self.pki_profile {
            sum = sum.wrapping_add(pki.checksum());
        }
        if !self.lb_algorithm.is_empty() {
            sum = sum
                .wrapping_add(checksum::hash_str(&self.lb_algorithm))
                .wrapping_add(checksum::hash_str(&self.lb_algorithm_hash))
                .wrapping_add(checksum::hash_str(&self.lb_algorithm_consistent_hash_hdr));
        }
        sum
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolGroupMember {
    /// `/api/pool?name=<n>` form.
    pub pool_ref: String,
    pub ratio: u32,
}

/// One pool group per (ingress, namespace, host, path). Alternate backends on
/// the same path become additional members; member order is semantic and
/// mirrors the order the backends appeared in the ingress rule.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolGroupNode {
    pub name: String,
    pub tenant: String,
    pub members: Vec<PoolGroupMember>,
}

impl PoolGroupNode {
    pub fn checksum(&self) -> u64 {
        checksum::hash_json(&self.members)
    }

    pub fn remove_member(&mut self, pool_ref: &str) {
        self.members.retain(|m| m.pool_ref != pool_ref);
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertKind {
    #[serde(rename = "SSL_CERTIFICATE_TYPE_VIRTUALSERVICE")]
    Vs,
    #[serde(rename = "SSL_CERTIFICATE_TYPE_CA")]
    Ca,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsKeyCertNode {
    pub name: String,
    pub tenant: String,
    pub kind: CertKind,
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
    /// Name of the CA cert node backing this leaf, when the TLS data declared
    /// a CA.
    pub ca_cert_name: Option<String>,
}

impl TlsKeyCertNode {
    pub fn checksum(&self) -> u64 {
        let mut sum = checksum::hash_bytes(&self.cert)
            .wrapping_add(checksum::hash_bytes(&self.key))
            .wrapping_add(checksum::hash_json(&self.kind));
        if let Some(ca) = &self.ca_cert_name {
            sum = sum.wrapping_add(checksum::hash_str(ca));
        }
        sum
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PkiProfileNode {
    pub name: String,
    pub tenant: String,
    pub ca_cert: String,
}

impl PkiProfileNode {
    pub fn checksum(&self) -> u64 {
        checksum::hash_str(&self.ca_cert)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VsVipNode {
    pub name: String,
    pub tenant: String,
    pub vrf_context: String,
    pub fqdns: Vec<String>,
    pub east_west: bool,
    pub network_name: Option<String>,
    pub subnet_ip: Option<String>,
    pub subnet_prefix: Option<u8>,
}

impl VsVipNode {
    pub fn checksum(&self) -> u64 {
        let mut sum = checksum::hash_sorted(&self.fqdns);
        if self.east_west {
            sum = sum.wrapping_add(checksum::hash_str("east-west"));
        }
        if let Some(net) = &self.network_name {
            sum = sum.wrapping_add(checksum::hash_str(net));
        }
        sum
    }

    /// Idempotently records an FQDN served by this VIP.
    pub fn add_fqdn(&mut self, fqdn: &str) {
        if !self.fqdns.iter().any(|f| f == fqdn) {
            self.fqdns.push(fqdn.to_string());
        }
    }

    pub fn remove_fqdns(&mut self, hosts: &[String]) {
        self.fqdns.retain(|f| !hosts.contains(f));
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathMatch {
    #[serde(rename = "EQUALS")]
    Equals,
    #[serde(rename = "BEGINS_WITH")]
    BeginsWith,
}

/// One host/path switching rule targeting a pool group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostPathPoolGroup {
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub match_criteria: PathMatch,
    pub pool_group: String,
}

/// An insecure-to-secure redirect rule. `hosts` accumulates every host the
/// policy redirects; the policy is deleted when the list drains.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectPort {
    pub hosts: Vec<String>,
    pub vs_port: u16,
    pub redirect_port: u16,
    pub status_code: String,
}

pub const REDIRECT_STATUS_CODE: &str = "HTTP_REDIRECT_STATUS_CODE_302";

impl RedirectPort {
    pub fn to_https(host: &str) -> Self {
        Self {
            hosts: vec![host.to_string()],
            vs_port: 80,
            redirect_port: 443,
            status_code: REDIRECT_STATUS_CODE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HttpPolicySetNode {
    pub name: String,
    pub tenant: String,
    pub hpp_map: Vec<HostPathPoolGroup>,
    pub redirect_ports: Vec<RedirectPort>,
}

impl HttpPolicySetNode {
    pub fn checksum(&self) -> u64 {
        let mut rules = self.hpp_map.clone();
        rules.sort_by(|a, b| (&a.host, &a.path).cmp(&(&b.host, &b.path)));
        let mut redirects = self.redirect_ports.clone();
        for r in &mut redirects {
            r.hosts.sort_unstable();
        }
        checksum::hash_json(&rules).wrapping_add(checksum::hash_json(&redirects))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataScriptNode {
    pub name: String,
    pub tenant: String,
    pub script: String,
    pub pool_group_refs: Vec<String>,
}

impl DataScriptNode {
    pub fn checksum(&self) -> u64 {
        checksum::hash_str(&self.script).wrapping_add(checksum::hash_sorted(&self.pool_group_refs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsvip_fqdn_accumulation_is_idempotent() {
        let mut vip = VsVipNode {
            name: "cluster--Shared-L7-0".to_string(),
            tenant: "admin".to_string(),
            ..VsVipNode::default()
        };
        vip.add_fqdn("foo.com");
        vip.add_fqdn("foo.com");
        assert_eq!(vip.fqdns, vec!["foo.com"]);
    }

    #[test]
    fn vsvip_checksum_ignores_fqdn_order() {
        let mk = |fqdns: &[&str]| VsVipNode {
            name: "vip".to_string(),
            tenant: "admin".to_string(),
            fqdns: fqdns.iter().map(|s| s.to_string()).collect(),
            ..VsVipNode::default()
        };
        assert_eq!(
            mk(&["a.com", "b.com"]).checksum(),
            mk(&["b.com", "a.com"]).checksum()
        );
    }

    #[test]
    fn pool_group_member_order_is_semantic() {
        let mk = |refs: &[(&str, u32)]| PoolGroupNode {
            name: "pg".to_string(),
            tenant: "admin".to_string(),
            members: refs
                .iter()
                .map(|(r, w)| PoolGroupMember {
                    pool_ref: r.to_string(),
                    ratio: *w,
                })
                .collect(),
        };
        assert_ne!(
            mk(&[("a", 60), ("b", 40)]).checksum(),
            mk(&[("b", 40), ("a", 60)]).checksum()
        );
    }

    #[test]
    fn redirect_checksum_ignores_host_order() {
        let mk = |hosts: &[&str]| HttpPolicySetNode {
            name: "redir".to_string(),
            tenant: "admin".to_string(),
            redirect_ports: vec![RedirectPort {
                hosts: hosts.iter().map(|s| s.to_string()).collect(),
                vs_port: 80,
                redirect_port: 443,
                status_code: REDIRECT_STATUS_CODE.to_string(),
            }],
            ..HttpPolicySetNode::default()
        };
        assert_eq!(
            mk(&["a.com", "b.com"]).checksum(),
            mk(&["b.com", "a.com"]).checksum()
        );
    }
}
