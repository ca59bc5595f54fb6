use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// What one ingress contributes to a secure host: its paths and the secret
/// that terminates them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HostNamePathSecret {
    pub paths: Vec<String>,
    pub secret_name: String,
}

/// FQDN → the ingresses claiming it. A secure host may be claimed by several
/// ingresses; the child VS's service metadata carries the full list.
#[derive(Clone, Default)]
pub struct SharedHostNameLister {
    hosts: Arc<RwLock<HashMap<String, HashMap<String, HostNamePathSecret>>>>,
}

impl SharedHostNameLister {
    /// Records `namespace/ingress` as claiming `host`.
    pub fn save(&self, host: &str, namespace: &str, ingress: &str, entry: HostNamePathSecret) {
        self.hosts
            .write()
            .entry(host.to_string())
            .or_default()
            .insert(format!("{}/{}", namespace, ingress), entry);
    }

    pub fn remove_ingress(&self, host: &str, namespace: &str, ingress: &str) {
        let mut hosts = self.hosts.write();
        if let Some(map) = hosts.get_mut(host) {
            map.remove(&format!("{}/{}", namespace, ingress));
        }
    }

    pub fn delete(&self, host: &str) {
        self.hosts.write().remove(host);
    }

    /// Sorted `namespace/ingress` names claiming the host; sorted so the
    /// service-metadata blob (and thus the VS checksum) is stable.
    pub fn ingresses_for_host(&self, host: &str) -> Vec<String> {
        let hosts = self.hosts.read();
        let mut ings: Vec<String> = hosts
            .get(host)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        ings.sort_unstable();
        ings
    }
}
