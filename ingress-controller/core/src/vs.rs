use crate::{
    checksum, DataScriptNode, HttpPolicySetNode, PoolGroupNode, PoolNode, PortProtocol,
    ServiceMetadata, TlsKeyCertNode, VsVipNode,
};

pub const DEFAULT_L7_SECURE_APP_PROFILE: &str = "System-Secure-HTTP";
pub const DEFAULT_TCP_NETWORK_PROFILE: &str = "System-TCP-Proxy";

/// A virtual-service node. One struct covers all four roles: SNI parent, SNI
/// child, EVH parent, EVH child. `shared_vs` marks a parent; `evh_parent`
/// distinguishes the EVH layout; children carry `vh_parent_name` as a weak
/// back-reference (resolved by lookup, never by pointer).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct VsNode {
    pub name: String,
    pub tenant: String,
    pub vrf_context: String,
    /// Empty means the ADC default SE group.
    pub service_engine_group: String,
    pub application_profile: String,
    pub network_profile: String,
    pub port_proto: Vec<PortProtocol>,
    pub shared_vs: bool,
    pub evh_parent: bool,
    pub vh_parent_name: String,
    pub vh_domain_names: Vec<String>,
    pub evh_host_name: String,
    pub children: Vec<VsNode>,
    pub vsvip_refs: Vec<VsVipNode>,
    pub pool_refs: Vec<PoolNode>,
    pub pool_group_refs: Vec<PoolGroupNode>,
    pub http_policy_refs: Vec<HttpPolicySetNode>,
    pub ssl_key_cert_refs: Vec<TlsKeyCertNode>,
    pub ca_cert_refs: Vec<TlsKeyCertNode>,
    pub http_ds_refs: Vec<DataScriptNode>,
    pub service_metadata: ServiceMetadata,
    pub enabled: Option<bool>,
    pub enable_rhi: Option<bool>,

    // Remote refs attached by the host-rule overlay, in
    // `/api/<kind>?name=<n>` string form.
    pub ssl_key_cert_ref: String,
    pub waf_policy_ref: String,
    pub app_profile_ref: String,
    pub analytics_profile_ref: String,
    pub error_page_profile_ref: String,
    pub ssl_profile_ref: String,
    pub http_policy_set_refs: Vec<String>,
    pub vs_datascript_refs: Vec<String>,

    /// Folded into the checksum so that relabeling the cluster resyncs
    /// every VS.
    pub cluster_label_checksum: u64,
    /// Cached by `calculate_checksum`.
    pub cloud_config_cksum: u64,
}

impl VsNode {
    pub fn is_child(&self) -> bool {
        !self.vh_parent_name.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&VsNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut VsNode> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    /// Replaces the named child only when its checksum differs; appends when
    /// no child of that name exists. Returns true when the parent changed.
    pub fn replace_child(&mut self, mut child: VsNode) -> bool {
        child.calculate_checksum();
        if let Some(existing) = self.children.iter_mut().find(|c| c.name == child.name) {
            if existing.checksum() == child.cloud_config_cksum {
                return false;
            }
            *existing = child;
            return true;
        }
        self.children.push(child);
        true
    }

    pub fn remove_child(&mut self, name: &str) -> bool {
        let before = self.children.len();
        self.children.retain(|c| c.name != name);
        before != self.children.len()
    }

    pub fn pool_group_mut(&mut self, name: &str) -> Option<&mut PoolGroupNode> {
        self.pool_group_refs.iter_mut().find(|pg| pg.name == name)
    }

    /// Checksum-gated replace of an owned pool; appends when absent.
    pub fn replace_pool(&mut self, pool: PoolNode) {
        if let Some(existing) = self.pool_refs.iter_mut().find(|p| p.name == pool.name) {
            if existing.checksum() != pool.checksum() {
                *existing = pool;
            }
            return;
        }
        self.pool_refs.push(pool);
    }

    pub fn replace_pool_group(&mut self, pg: PoolGroupNode) {
        if let Some(existing) = self.pool_group_refs.iter_mut().find(|p| p.name == pg.name) {
            if existing.checksum() != pg.checksum() {
                *existing = pg;
            }
            return;
        }
        self.pool_group_refs.push(pg);
    }

    pub fn replace_http_policy(&mut self, policy: HttpPolicySetNode) {
        if let Some(existing) = self
            .http_policy_refs
            .iter_mut()
            .find(|p| p.name == policy.name)
        {
            if existing.checksum() != policy.checksum() {
                *existing = policy;
            }
            return;
        }
        self.http_policy_refs.push(policy);
    }

    pub fn replace_ssl_ref(&mut self, cert: TlsKeyCertNode) {
        if let Some(existing) = self
            .ssl_key_cert_refs
            .iter_mut()
            .find(|c| c.name == cert.name)
        {
            if existing.checksum() != cert.checksum() {
                *existing = cert;
            }
            return;
        }
        self.ssl_key_cert_refs.push(cert);
    }

    /// A child holds at most one CA cert; a second secret declaring a CA for
    /// the same child overwrites it.
    pub fn replace_ca_cert(&mut self, cert: TlsKeyCertNode) {
        if let Some(existing) = self.ca_cert_refs.iter_mut().find(|c| c.name == cert.name) {
            if existing.checksum() != cert.checksum() {
                *existing = cert;
            }
            return;
        }
        if self.ca_cert_refs.len() == 1 {
            self.ca_cert_refs[0] = cert;
            return;
        }
        self.ca_cert_refs.push(cert);
    }

    pub fn remove_pool(&mut self, name: &str) {
        self.pool_refs.retain(|p| p.name != name);
    }

    pub fn remove_pool_group(&mut self, name: &str) {
        self.pool_group_refs.retain(|pg| pg.name != name);
    }

    pub fn remove_http_policy(&mut self, name: &str) {
        self.http_policy_refs.retain(|p| p.name != name);
    }

    pub fn remove_ssl_ref(&mut self, name: &str) {
        self.ssl_key_cert_refs.retain(|c| c.name != name);
    }

    pub fn remove_ca_cert(&mut self, name: &str) {
        self.ca_cert_refs.retain(|c| c.name != name);
    }

    pub fn add_vh_domain(&mut self, host: &str) {
        if !self.vh_domain_names.iter().any(|h| h == host) {
            self.vh_domain_names.push(host.to_string());
        }
    }

    /// Recomputes the rolling checksum over semantic fields and owned
    /// children, caching the result. Unordered collections are sorted first
    /// so insertion order never leaks into the sum.
    pub fn calculate_checksum(&mut self) -> u64 {
        for child in &mut self.children {
            child.calculate_checksum();
        }

        let mut ports = self.port_proto.clone();
        ports.sort_by_key(|p| p.port);

        let mut sum: u64 = 0;
        for ds in &self.http_ds_refs {
            sum = sum.wrapping_add(ds.checksum());
        }
        for pol in &self.http_policy_refs {
            sum = sum.wrapping_add(pol.checksum());
        }
        for child in &self.children {
            sum = sum.wrapping_add(child.cloud_config_cksum);
        }
        for cert in self.ca_cert_refs.iter().chain(&self.ssl_key_cert_refs) {
            sum = sum.wrapping_add(cert.checksum());
        }
        for vip in &self.vsvip_refs {
            sum = sum.wrapping_add(vip.checksum());
        }
        for pool in &self.pool_refs {
            sum = sum.wrapping_add(pool.checksum());
        }
        for pg in &self.pool_group_refs {
            sum = sum.wrapping_add(pg.checksum());
        }

        let refs = format!(
            "{}{}{}{}{}{}",
            self.waf_policy_ref,
            self.app_profile_ref,
            self.analytics_profile_ref,
            self.error_page_profile_ref,
            self.ssl_profile_ref,
            self.ssl_key_cert_ref,
        );
        sum = sum
            .wrapping_add(checksum::hash_str(&refs))
            .wrapping_add(checksum::hash_sorted(&self.http_policy_set_refs))
            .wrapping_add(checksum::hash_str(&self.application_profile))
            .wrapping_add(checksum::hash_str(&self.network_profile))
            .wrapping_add(checksum::hash_json(&ports))
            .wrapping_add(checksum::hash_str(&self.service_engine_group))
            .wrapping_add(checksum::hash_str(&self.evh_host_name))
            .wrapping_add(checksum::hash_sorted(&self.vh_domain_names));
        if !self.vs_datascript_refs.is_empty() {
            sum = sum.wrapping_add(checksum::hash_sorted(&self.vs_datascript_refs));
        }
        if let Some(enabled) = self.enabled {
            sum = sum.wrapping_add(checksum::hash_json(&enabled));
        }
        if let Some(rhi) = self.enable_rhi {
            sum = sum.wrapping_add(checksum::hash_json(&rhi));
        }
        sum = sum.wrapping_add(self.cluster_label_checksum);

        self.cloud_config_cksum = sum;
        sum
    }

    /// Checksum without mutating the cache; used when comparing a candidate
    /// against a node already in the graph.
    pub fn checksum(&self) -> u64 {
        let mut copy = self.clone();
        copy.calculate_checksum()
    }
}

/// The capability set shared by SNI and EVH virtual hosts. The CRD overlay is
/// written once against this trait, so layout differences never reach it.
pub trait VirtualHostModel {
    fn name(&self) -> &str;
    fn pools_mut(&mut self) -> &mut Vec<PoolNode>;
    fn service_metadata(&self) -> &ServiceMetadata;
    fn set_service_metadata(&mut self, meta: ServiceMetadata);
    fn clear_ssl_key_certs(&mut self);
    fn clear_http_policies(&mut self);
    fn set_ssl_key_cert_ref(&mut self, r: String);
    fn set_waf_policy_ref(&mut self, r: String);
    fn set_app_profile_ref(&mut self, r: String);
    fn set_analytics_profile_ref(&mut self, r: String);
    fn set_error_page_profile_ref(&mut self, r: String);
    fn set_ssl_profile_ref(&mut self, r: String);
    fn set_http_policy_set_refs(&mut self, refs: Vec<String>);
    fn set_vs_datascript_refs(&mut self, refs: Vec<String>);
    fn set_enabled(&mut self, enabled: Option<bool>);
}

impl VirtualHostModel for VsNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn pools_mut(&mut self) -> &mut Vec<PoolNode> {
        &mut self.pool_refs
    }

    fn service_metadata(&self) -> &ServiceMetadata {
        &self.service_metadata
    }

    fn set_service_metadata(&mut self, meta: ServiceMetadata) {
        self.service_metadata = meta;
    }

    fn clear_ssl_key_certs(&mut self) {
        self.ssl_key_cert_refs.clear();
    }

    fn clear_http_policies(&mut self) {
        self.http_policy_refs.clear();
    }

    fn set_ssl_key_cert_ref(&mut self, r: String) {
        self.ssl_key_cert_ref = r;
    }

    fn set_waf_policy_ref(&mut self, r: String) {
        self.waf_policy_ref = r;
    }

    fn set_app_profile_ref(&mut self, r: String) {
        self.app_profile_ref = r;
    }

    fn set_analytics_profile_ref(&mut self, r: String) {
        self.analytics_profile_ref = r;
    }

    fn set_error_page_profile_ref(&mut self, r: String) {
        self.error_page_profile_ref = r;
    }

    fn set_ssl_profile_ref(&mut self, r: String) {
        self.ssl_profile_ref = r;
    }

    fn set_http_policy_set_refs(&mut self, refs: Vec<String>) {
        self.http_policy_set_refs = refs;
    }

    fn set_vs_datascript_refs(&mut self, refs: Vec<String>) {
        self.vs_datascript_refs = refs;
    }

    fn set_enabled(&mut self, enabled: Option<bool>) {
        self.enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_child(name: &str, host: &str) -> VsNode {
        VsNode {
            name: name.to_string(),
            tenant: "admin".to_string(),
            vh_parent_name: "parent".to_string(),
            evh_host_name: host.to_string(),
            ..VsNode::default()
        }
    }

    #[test]
    fn checksum_independent_of_child_order() {
        let mut a = VsNode {
            name: "parent".to_string(),
            shared_vs: true,
            ..VsNode::default()
        };
        let mut b = a.clone();
        a.children = vec![mk_child("c1", "a.com"), mk_child("c2", "b.com")];
        b.children = vec![mk_child("c2", "b.com"), mk_child("c1", "a.com")];
        assert_eq!(a.calculate_checksum(), b.calculate_checksum());
    }

    #[test]
    fn checksum_independent_of_port_order() {
        let mut a = VsNode::default();
        let mut b = VsNode::default();
        a.port_proto = vec![PortProtocol::http(80), PortProtocol::https(443)];
        b.port_proto = vec![PortProtocol::https(443), PortProtocol::http(80)];
        assert_eq!(a.calculate_checksum(), b.calculate_checksum());
    }

    #[test]
    fn tri_state_contributes_only_when_set() {
        let mut unset = VsNode::default();
        let mut on = VsNode::default();
        let mut off = VsNode::default();
        on.enabled = Some(true);
        off.enabled = Some(false);
        let base = unset.calculate_checksum();
        assert_ne!(base, on.calculate_checksum());
        assert_ne!(base, off.calculate_checksum());
        assert_ne!(on.cloud_config_cksum, off.cloud_config_cksum);
    }

    #[test]
    fn replace_child_is_checksum_gated() {
        let mut parent = VsNode {
            name: "parent".to_string(),
            shared_vs: true,
            ..VsNode::default()
        };
        assert!(parent.replace_child(mk_child("c1", "a.com")));
        assert!(!parent.replace_child(mk_child("c1", "a.com")));

        let mut updated = mk_child("c1", "a.com");
        updated.enabled = Some(false);
        assert!(parent.replace_child(updated));
        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].enabled, Some(false));
    }
}
