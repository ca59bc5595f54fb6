use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// How a host was (or is being) materialized.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum HostPolicy {
    #[default]
    None,
    /// Plain insecure exposure.
    Allow,
    /// Insecure traffic redirected to the secure listener.
    Redirect,
    /// Edge-terminated TLS.
    EdgeTerm,
    /// TLS passed through to the backend by SNI.
    Passthrough,
}

pub type PathSvcMap = HashMap<String, Vec<String>>;

/// Per-host memory of what a resource previously materialized, used to
/// compute removals on update and delete.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HostState {
    pub secure: HostPolicy,
    pub insecure: HostPolicy,
    pub path_svc: PathSvcMap,
}

/// FQDN → state for one ingress-like resource.
pub type StoredHosts = HashMap<String, HostState>;

#[derive(Default)]
struct Inner {
    /// `namespace/ingress` → previously materialized hosts.
    ing_to_hosts: HashMap<String, StoredHosts>,
    /// `namespace/secret` → ingress names referencing it.
    secret_to_ing: HashMap<String, Vec<String>>,
}

/// Concurrency-safe store of each resource's previously materialized
/// (host, path, service) tuples plus the secret↔ingress relationship.
#[derive(Clone, Default)]
pub struct SharedIngressHostsLister {
    inner: Arc<RwLock<Inner>>,
}

impl SharedIngressHostsLister {
    pub fn hosts_for_ingress(&self, namespace: &str, ingress: &str) -> Option<StoredHosts> {
        self.inner
            .read()
            .ing_to_hosts
            .get(&key(namespace, ingress))
            .cloned()
    }

    pub fn save_hosts_for_ingress(&self, namespace: &str, ingress: &str, hosts: StoredHosts) {
        self.inner
            .write()
            .ing_to_hosts
            .insert(key(namespace, ingress), hosts);
    }

    pub fn delete_hosts_for_ingress(&self, namespace: &str, ingress: &str) {
        self.inner.write().ing_to_hosts.remove(&key(namespace, ingress));
    }

    pub fn save_secret_to_ingress(&self, secret_ns: &str, secret: &str, ingress: &str) {
        let mut inner = self.inner.write();
        let ings = inner.secret_to_ing.entry(key(secret_ns, secret)).or_default();
        if !ings.iter().any(|i| i == ingress) {
            ings.push(ingress.to_string());
        }
    }

    pub fn ingresses_for_secret(&self, secret_ns: &str, secret: &str) -> Option<Vec<String>> {
        self.inner.read().secret_to_ing.get(&key(secret_ns, secret)).cloned()
    }

    pub fn delete_secret_mapping(&self, secret_ns: &str, secret: &str) {
        self.inner.write().secret_to_ing.remove(&key(secret_ns, secret));
    }

    /// Drops every secret relationship held by one ingress.
    pub fn remove_ingress_secret_mappings(&self, ingress: &str) {
        let mut inner = self.inner.write();
        for ings in inner.secret_to_ing.values_mut() {
            ings.retain(|i| i != ingress);
        }
        inner.secret_to_ing.retain(|_, ings| !ings.is_empty());
    }
}

fn key(namespace: &str, name: &str) -> String {
    format!("{}/{}", namespace, name)
}
