use adc_ingress_controller_k8s_api::{HttpRulePath, VirtualHostSpec};
use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    /// FQDN → `namespace/name` of the host-rule claiming it.
    fqdn_to_host_rule: HashMap<String, String>,
    /// `namespace/name` → accepted spec. Rejected rules never land here.
    host_rules: HashMap<String, VirtualHostSpec>,
    /// FQDN → path → `namespace/name` of the http-rule covering it.
    fqdn_to_http_rules: HashMap<String, HashMap<String, String>>,
    /// `namespace/name` → accepted per-path specs keyed by target path.
    http_rules: HashMap<String, HashMap<String, HttpRulePath>>,
}

/// Concurrency-safe store of the accepted CRD overrides. The builder reads
/// it synchronously while holding a graph lock; validation populates it after
/// the ADC ref checks pass.
#[derive(Clone, Default)]
pub struct SharedCrdLister {
    inner: Arc<RwLock<Inner>>,
}

impl SharedCrdLister {
    /// The host-rule (if any) currently claiming `fqdn`.
    pub fn host_rule_for_fqdn(&self, fqdn: &str) -> Option<(String, VirtualHostSpec)> {
        let inner = self.inner.read();
        let ns_name = inner.fqdn_to_host_rule.get(fqdn)?;
        let spec = inner.host_rules.get(ns_name)?;
        Some((ns_name.clone(), spec.clone()))
    }

    /// Which FQDN a host-rule claims, for duplicate detection.
    pub fn fqdn_claimed_by(&self, fqdn: &str) -> Option<String> {
        self.inner.read().fqdn_to_host_rule.get(fqdn).cloned()
    }

    pub fn save_host_rule(&self, ns_name: &str, spec: VirtualHostSpec) {
        let mut inner = self.inner.write();
        // The rule may have moved to a new FQDN; unbind the old one.
        if let Some(old) = inner.host_rules.get(ns_name).map(|s| s.fqdn.clone()) {
            if old != spec.fqdn {
                inner.fqdn_to_host_rule.remove(&old);
            }
        }
        inner
            .fqdn_to_host_rule
            .insert(spec.fqdn.clone(), ns_name.to_string());
        inner.host_rules.insert(ns_name.to_string(), spec);
    }

    pub fn delete_host_rule(&self, ns_name: &str) {
        let mut inner = self.inner.write();
        if let Some(spec) = inner.host_rules.remove(ns_name) {
            inner.fqdn_to_host_rule.remove(&spec.fqdn);
        }
    }

    /// Path → (rule `namespace/name`, per-path spec) for one FQDN.
    pub fn http_rules_for_fqdn(&self, fqdn: &str) -> HashMap<String, (String, HttpRulePath)> {
        let inner = self.inner.read();
        let mut out = HashMap::default();
        if let Some(paths) = inner.fqdn_to_http_rules.get(fqdn) {
            for (path, ns_name) in paths {
                if let Some(rule_paths) = inner.http_rules.get(ns_name) {
                    if let Some(spec) = rule_paths.get(path) {
                        out.insert(path.clone(), (ns_name.clone(), spec.clone()));
                    }
                }
            }
        }
        out
    }

    pub fn save_http_rule(&self, ns_name: &str, fqdn: &str, paths: Vec<HttpRulePath>) {
        let mut inner = self.inner.write();
        let by_path = inner.fqdn_to_http_rules.entry(fqdn.to_string()).or_default();
        for p in &paths {
            by_path.insert(p.target.clone(), ns_name.to_string());
        }
        inner.http_rules.insert(
            ns_name.to_string(),
            paths.into_iter().map(|p| (p.target.clone(), p)).collect(),
        );
    }

    pub fn delete_http_rule(&self, ns_name: &str) {
        let mut inner = self.inner.write();
        inner.http_rules.remove(ns_name);
        for by_path in inner.fqdn_to_http_rules.values_mut() {
            by_path.retain(|_, owner| owner != ns_name);
        }
        inner.fqdn_to_http_rules.retain(|_, m| !m.is_empty());
    }
}
