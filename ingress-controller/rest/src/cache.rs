use adc_ingress_controller_core::{ServiceMetadata, TenantName};
use ahash::AHashMap as HashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Cache row for leaf objects (pool, pool group, vsvip, certs, policies).
#[derive(Clone, Debug, Default)]
pub struct ObjCacheEntry {
    pub uuid: String,
    pub cksum: String,
    pub last_modified: String,
    /// Set when `_last_modified` was absent from the response; forces a
    /// re-read on the next cycle.
    pub invalid_data: bool,
    pub service_metadata: ServiceMetadata,
}

/// Cache row for virtual services. Back-references are weak: children are
/// recorded by uuid and the VSVIP by key, resolved by table lookup. The child
/// collection carries its own lock because parent rows are updated from the
/// reconciliation of every child.
#[derive(Clone, Debug, Default)]
pub struct VsCacheEntry {
    pub uuid: String,
    pub cksum: String,
    pub last_modified: String,
    pub invalid_data: bool,
    pub vip: String,
    pub service_metadata: ServiceMetadata,
    pub parent_ref: Option<TenantName>,
    pub vh_child_uuids: Arc<Mutex<Vec<String>>>,
    pub vsvip_keys: Vec<TenantName>,
    /// Keys of the leaf objects this VS owns, recorded as they are synced so
    /// that removals can be computed without re-reading the ADC.
    pub pool_keys: Vec<TenantName>,
    pub pool_group_keys: Vec<TenantName>,
    pub http_policy_keys: Vec<TenantName>,
    pub ssl_cert_keys: Vec<TenantName>,
}

impl VsCacheEntry {
    pub fn add_child_uuid(&self, uuid: &str) {
        let mut children = self.vh_child_uuids.lock();
        if !children.iter().any(|c| c == uuid) {
            children.push(uuid.to_string());
        }
    }

    pub fn remove_child_uuid(&self, uuid: &str) {
        self.vh_child_uuids.lock().retain(|c| c != uuid);
    }
}

/// One lock per logical cache table.
pub struct CacheTable<T: Clone> {
    rows: RwLock<HashMap<TenantName, T>>,
}

impl<T: Clone> Default for CacheTable<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::default()),
        }
    }
}

impl<T: Clone> CacheTable<T> {
    pub fn get(&self, key: &TenantName) -> Option<T> {
        self.rows.read().get(key).cloned()
    }

    pub fn insert(&self, key: TenantName, row: T) {
        self.rows.write().insert(key, row);
    }

    pub fn remove(&self, key: &TenantName) {
        self.rows.write().remove(key);
    }

    pub fn update(&self, key: &TenantName, f: impl FnOnce(&mut T)) {
        if let Some(row) = self.rows.write().get_mut(key) {
            f(row);
        }
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<(TenantName, T)> {
        self.rows
            .read()
            .iter()
            .find(|(_, row)| pred(row))
            .map(|(k, v)| (k.clone(), v.clone()))
    }

    pub fn keys(&self) -> Vec<TenantName> {
        self.rows.read().keys().cloned().collect()
    }
}

/// The full cache mirror of ADC state, one table per kind.
#[derive(Default)]
pub struct AdcCache {
    pub vs: CacheTable<VsCacheEntry>,
    pub vsvip: CacheTable<ObjCacheEntry>,
    pub pool: CacheTable<ObjCacheEntry>,
    pub pool_group: CacheTable<ObjCacheEntry>,
    pub http_policy: CacheTable<ObjCacheEntry>,
    pub ssl_key_cert: CacheTable<ObjCacheEntry>,
    pub pki_profile: CacheTable<ObjCacheEntry>,
    pub datascript: CacheTable<ObjCacheEntry>,
}

impl AdcCache {
    pub fn vs_key_by_uuid(&self, uuid: &str) -> Option<TenantName> {
        self.vs.find(|row| row.uuid == uuid).map(|(k, _)| k)
    }
}
