//! Turns graph diffs into REST operations against the ADC.
//!
//! For each changed model the reconciler snapshots the graph under its lock,
//! serializes nodes in dependency order (VSVIP, pools, TLS leaves, pool
//! groups, HTTP policies, virtual services), picks PUT when the cache holds a
//! uuid and POST-via-macro otherwise, and finally deletes whatever the cache
//! still holds that the graph no longer wants. On every response the cache
//! row and the weak back-references (parent ↔ child uuid, VS ↔ VSVIP key)
//! are refreshed.

use crate::{
    cache::{AdcCache, CacheTable, ObjCacheEntry, VsCacheEntry},
    serialize, AdcError, AdcSession,
};
use adc_ingress_controller_core::{
    ServiceMetadata, Settings, StatusSink, TenantName, VsNode,
};
use adc_ingress_controller_k8s_graph::SharedGraphLister;
use ahash::AHashSet as HashSet;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

const KIND_VS: &str = "VirtualService";
const KIND_VSVIP: &str = "VsVip";
const KIND_POOL: &str = "Pool";
const KIND_POOL_GROUP: &str = "PoolGroup";
const KIND_HTTP_POLICY: &str = "HTTPPolicySet";
const KIND_SSL_CERT: &str = "SSLKeyAndCertificate";
const KIND_PKI: &str = "PKIProfile";
const KIND_DATASCRIPT: &str = "VSDataScriptSet";

pub struct RestReconciler {
    settings: Arc<Settings>,
    graphs: SharedGraphLister,
    cache: Arc<AdcCache>,
    session: Arc<dyn AdcSession>,
    status: Arc<dyn StatusSink>,
}

impl RestReconciler {
    pub fn new(
        settings: Arc<Settings>,
        graphs: SharedGraphLister,
        cache: Arc<AdcCache>,
        session: Arc<dyn AdcSession>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            settings,
            graphs,
            cache,
            session,
            status,
        }
    }

    /// Seeds the cache from a full list of every kind the controller
    /// manages. Called once at startup before any model is processed.
    pub async fn populate_cache(&self) -> Result<(), AdcError> {
        let tenant = self.settings.tenant.clone();
        let query = format!(
            "fields=name,uuid,cloud_config_cksum,_last_modified&created_by={}&page_size=200",
            self.settings.controller_identity
        );

        for row in self.session.list(&tenant, KIND_VS, &query).await? {
            if let (Some(name), Some(uuid)) = (str_field(&row, "name"), str_field(&row, "uuid")) {
                self.cache.vs.insert(
                    TenantName::new(&tenant, name),
                    VsCacheEntry {
                        uuid: uuid.to_string(),
                        cksum: str_field(&row, "cloud_config_cksum").unwrap_or_default().to_string(),
                        last_modified: str_field(&row, "_last_modified").unwrap_or_default().to_string(),
                        ..VsCacheEntry::default()
                    },
                );
            }
        }

        for (kind, table) in [
            (KIND_VSVIP, &self.cache.vsvip),
            (KIND_POOL, &self.cache.pool),
            (KIND_POOL_GROUP, &self.cache.pool_group),
            (KIND_SSL_CERT, &self.cache.ssl_key_cert),
            (KIND_HTTP_POLICY, &self.cache.http_policy),
        ] {
            for row in self.session.list(&tenant, kind, &query).await? {
                if let (Some(name), Some(uuid)) = (str_field(&row, "name"), str_field(&row, "uuid"))
                {
                    table.insert(
                        TenantName::new(&tenant, name),
                        ObjCacheEntry {
                            uuid: uuid.to_string(),
                            cksum: str_field(&row, "cloud_config_cksum")
                                .unwrap_or_default()
                                .to_string(),
                            last_modified: str_field(&row, "_last_modified")
                                .unwrap_or_default()
                                .to_string(),
                            ..ObjCacheEntry::default()
                        },
                    );
                }
            }
        }
        info!("seeded cache from ADC");
        Ok(())
    }

    /// Reconciles one model. Returns transient errors so the controller can
    /// requeue; everything else is handled (or logged) here.
    pub async fn sync_model(&self, model: &str) -> Result<(), AdcError> {
        let Some((tenant, vs_name)) = model.split_once('/') else {
            warn!(%model, "malformed model name");
            return Ok(());
        };

        let snapshot = self.graphs.get(model).and_then(|graph| {
            let graph = graph.lock();
            graph.parent().cloned()
        });

        match snapshot {
            Some(mut parent) => {
                parent.calculate_checksum();
                self.sync_parent(tenant, &parent).await
            }
            None => self.delete_parent(tenant, vs_name).await,
        }
    }

    async fn sync_parent(&self, tenant: &str, parent: &VsNode) -> Result<(), AdcError> {
        let parent_key = TenantName::new(tenant, &parent.name);

        for vip in &parent.vsvip_refs {
            self.sync_vsvip(tenant, &parent_key, vip).await?;
        }
        self.sync_vs_leaves(tenant, parent).await?;

        // A child VS references its parent by name, so on first creation the
        // parent must reach the ADC before its children; on updates the
        // parent is written last so children never reference stale state.
        let parent_created = self
            .cache
            .vs
            .get(&parent_key)
            .map(|row| !row.uuid.is_empty())
            .unwrap_or(false);
        if !parent_created {
            self.sync_vs_object(tenant, parent).await?;
        }

        for child in &parent.children {
            self.sync_vs_leaves(tenant, child).await?;
            self.sync_vs_object(tenant, child).await?;
        }

        self.prune_stale_children(tenant, parent).await?;

        if parent_created {
            self.sync_vs_object(tenant, parent).await?;
        }
        Ok(())
    }

    /// Syncs the leaf objects owned by one VS, then deletes the owned leaves
    /// the cache remembers but the graph no longer carries.
    async fn sync_vs_leaves(&self, tenant: &str, vs: &VsNode) -> Result<(), AdcError> {
        let vs_key = TenantName::new(tenant, &vs.name);

        let mut pool_keys = Vec::new();
        for pool in &vs.pool_refs {
            if let Some(pki) = &pool.pki_profile {
                let payload = serialize::pki_profile_payload(&self.settings, pki);
                self.sync_object(
                    tenant,
                    KIND_PKI,
                    &self.cache.pki_profile,
                    &pki.name,
                    pki.checksum().to_string(),
                    payload,
                    ServiceMetadata::default(),
                )
                .await?;
            }
            let payload = serialize::pool_payload(&self.settings, pool);
            self.sync_object(
                tenant,
                KIND_POOL,
                &self.cache.pool,
                &pool.name,
                pool.checksum().to_string(),
                payload,
                pool.service_metadata.clone(),
            )
            .await?;
            pool_keys.push(TenantName::new(tenant, &pool.name));
        }

        let mut ssl_keys = Vec::new();
        for cert in vs.ca_cert_refs.iter().chain(&vs.ssl_key_cert_refs) {
            let payload = serialize::ssl_cert_payload(&self.settings, cert);
            self.sync_object(
                tenant,
                KIND_SSL_CERT,
                &self.cache.ssl_key_cert,
                &cert.name,
                cert.checksum().to_string(),
                payload,
                ServiceMetadata::default(),
            )
            .await?;
            ssl_keys.push(TenantName::new(tenant, &cert.name));
        }

        let mut pg_keys = Vec::new();
        for pg in &vs.pool_group_refs {
            let payload = serialize::pool_group_payload(&self.settings, pg);
            self.sync_object(
                tenant,
                KIND_POOL_GROUP,
                &self.cache.pool_group,
                &pg.name,
                pg.checksum().to_string(),
                payload,
                ServiceMetadata::default(),
            )
            .await?;
            pg_keys.push(TenantName::new(tenant, &pg.name));
        }

        let mut policy_keys = Vec::new();
        for policy in &vs.http_policy_refs {
            let payload = serialize::http_policy_payload(&self.settings, policy);
            self.sync_object(
                tenant,
                KIND_HTTP_POLICY,
                &self.cache.http_policy,
                &policy.name,
                policy.checksum().to_string(),
                payload,
                ServiceMetadata::default(),
            )
            .await?;
            policy_keys.push(TenantName::new(tenant, &policy.name));
        }

        for ds in &vs.http_ds_refs {
            let payload = serialize::datascript_payload(&self.settings, ds);
            self.sync_object(
                tenant,
                KIND_DATASCRIPT,
                &self.cache.datascript,
                &ds.name,
                ds.checksum().to_string(),
                payload,
                ServiceMetadata::default(),
            )
            .await?;
        }

        // Stale owned leaves go referencing-objects first.
        let prev = self.cache.vs.get(&vs_key).unwrap_or_default();
        self.prune_owned(tenant, KIND_HTTP_POLICY, &self.cache.http_policy, &prev.http_policy_keys, &policy_keys)
            .await?;
        self.prune_owned(tenant, KIND_POOL_GROUP, &self.cache.pool_group, &prev.pool_group_keys, &pg_keys)
            .await?;
        self.prune_owned(tenant, KIND_POOL, &self.cache.pool, &prev.pool_keys, &pool_keys)
            .await?;
        self.prune_owned(tenant, KIND_SSL_CERT, &self.cache.ssl_key_cert, &prev.ssl_cert_keys, &ssl_keys)
            .await?;

        if self.cache.vs.get(&vs_key).is_none() {
            self.cache.vs.insert(vs_key.clone(), VsCacheEntry::default());
        }
        self.cache.vs.update(&vs_key, |row| {
            row.pool_keys = pool_keys;
            row.pool_group_keys = pg_keys;
            row.http_policy_keys = policy_keys;
            row.ssl_cert_keys = ssl_keys;
        });
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn sync_object(
        &self,
        tenant: &str,
        kind: &'static str,
        table: &CacheTable<ObjCacheEntry>,
        name: &str,
        cksum: String,
        payload: Value,
        meta: ServiceMetadata,
    ) -> Result<(), AdcError> {
        let key = TenantName::new(tenant, name);
        let resp = match table.get(&key) {
            Some(row) if !row.uuid.is_empty() => {
                if row.cksum == cksum && !row.invalid_data {
                    debug!(%kind, %name, "no change");
                    return Ok(());
                }
                match self.session.update(tenant, kind, &row.uuid, payload.clone()).await {
                    Err(AdcError::NotFound) => {
                        info!(%kind, %name, "object gone from ADC, re-creating");
                        self.session.create(tenant, kind, payload).await?
                    }
                    other => other?,
                }
            }
            _ => self.session.create(tenant, kind, payload).await?,
        };

        match str_field(&resp, "uuid") {
            Some(uuid) => {
                let last_modified = str_field(&resp, "_last_modified").unwrap_or_default();
                table.insert(
                    key,
                    ObjCacheEntry {
                        uuid: uuid.to_string(),
                        cksum: str_field(&resp, "cloud_config_cksum")
                            .map(str::to_string)
                            .unwrap_or(cksum),
                        last_modified: last_modified.to_string(),
                        invalid_data: last_modified.is_empty(),
                        service_metadata: meta,
                    },
                );
            }
            None => {
                warn!(%kind, %name, "uuid missing in response, skipping cache update");
                table.update(&key, |row| row.invalid_data = true);
                return Err(AdcError::ResponseMalformed("uuid"));
            }
        }
        Ok(())
    }

    async fn sync_vsvip(
        &self,
        tenant: &str,
        vs_key: &TenantName,
        vip: &adc_ingress_controller_core::VsVipNode,
    ) -> Result<(), AdcError> {
        let key = TenantName::new(tenant, &vip.name);
        let payload = serialize::vsvip_payload(&self.settings, vip);

        let resp = match self.cache.vsvip.get(&key) {
            Some(row) if !row.uuid.is_empty() => {
                match self.session.get(tenant, KIND_VSVIP, &row.uuid).await {
                    Ok(mut remote) => {
                        // Only the DNS names and VRF are ours to change on an
                        // existing VIP; the allocated address is preserved.
                        remote["dns_info"] = payload["dns_info"].clone();
                        remote["vrf_context_ref"] = payload["vrf_context_ref"].clone();
                        self.session.update(tenant, KIND_VSVIP, &row.uuid, remote).await?
                    }
                    Err(AdcError::VsVipNotFound) => {
                        warn!(vsvip = %vip.name, "vsvip externally deleted, evicting cache row");
                        self.cache.vsvip.remove(&key);
                        self.session.create(tenant, KIND_VSVIP, payload).await?
                    }
                    Err(error) => return Err(error),
                }
            }
            _ => self.session.create(tenant, KIND_VSVIP, payload).await?,
        };

        match str_field(&resp, "uuid") {
            Some(uuid) => {
                let last_modified = str_field(&resp, "_last_modified").unwrap_or_default();
                self.cache.vsvip.insert(
                    key.clone(),
                    ObjCacheEntry {
                        uuid: uuid.to_string(),
                        cksum: String::new(),
                        last_modified: last_modified.to_string(),
                        invalid_data: last_modified.is_empty(),
                        service_metadata: ServiceMetadata::default(),
                    },
                );
                if self.cache.vs.get(vs_key).is_none() {
                    self.cache.vs.insert(vs_key.clone(), VsCacheEntry::default());
                }
                self.cache.vs.update(vs_key, |row| {
                    if !row.vsvip_keys.contains(&key) {
                        row.vsvip_keys.push(key.clone());
                    }
                });
            }
            None => {
                warn!(vsvip = %vip.name, "uuid missing in response, skipping cache update");
                self.cache.vsvip.update(&key, |row| row.invalid_data = true);
                return Err(AdcError::ResponseMalformed("uuid"));
            }
        }
        Ok(())
    }

    async fn sync_vs_object(&self, tenant: &str, vs: &VsNode) -> Result<(), AdcError> {
        let key = TenantName::new(tenant, &vs.name);
        let cksum = vs.cloud_config_cksum.to_string();
        let payload = serialize::vs_payload(&self.settings, vs);

        let resp = match self.cache.vs.get(&key) {
            Some(row) if !row.uuid.is_empty() => {
                if row.cksum == cksum && !row.invalid_data {
                    debug!(vs = %vs.name, "no change");
                    return Ok(());
                }
                match self.session.update(tenant, KIND_VS, &row.uuid, payload.clone()).await {
                    Err(AdcError::NotFound) => {
                        info!(vs = %vs.name, "VS gone from ADC, re-creating");
                        self.session.create(tenant, KIND_VS, payload).await?
                    }
                    other => other?,
                }
            }
            _ => self.session.create(tenant, KIND_VS, payload).await?,
        };
        self.cache_vs_add(tenant, &key, &resp)
    }

    /// Mirrors one VS response into the cache: uuid, checksum, VIP, service
    /// metadata, and the parent↔child back-references. Also surfaces ingress
    /// and L4 status transitions.
    fn cache_vs_add(&self, tenant: &str, key: &TenantName, resp: &Value) -> Result<(), AdcError> {
        let Some(uuid) = str_field(resp, "uuid") else {
            warn!(vs = %key.name, "uuid missing in response, skipping cache update");
            self.cache.vs.update(key, |row| row.invalid_data = true);
            return Err(AdcError::ResponseMalformed("uuid"));
        };
        let Some(cksum) = str_field(resp, "cloud_config_cksum") else {
            warn!(vs = %key.name, "checksum missing in response, skipping cache update");
            self.cache.vs.update(key, |row| row.invalid_data = true);
            return Err(AdcError::ResponseMalformed("cloud_config_cksum"));
        };
        let last_modified = str_field(resp, "_last_modified").unwrap_or_default().to_string();
        if last_modified.is_empty() {
            warn!(vs = %key.name, "last_modified missing in response");
        }

        let meta: ServiceMetadata = str_field(resp, "service_metadata")
            .and_then(|s| serde_json::from_str(s).ok())
            .unwrap_or_default();
        let vip = resp["vip"][0]["ip_address"]["addr"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        // Resolve the parent by uuid from the back-reference the ADC echoes.
        let mut parent_key = None;
        let mut parent_vip = String::new();
        if let Some(parent_ref) = str_field(resp, "vh_parent_vs_ref") {
            let pk = extract_vs_uuid(parent_ref)
                .and_then(|parent_uuid| self.cache.vs_key_by_uuid(&parent_uuid))
                .unwrap_or_else(|| TenantName::new(tenant, extract_vs_name(parent_ref)));
            if self.cache.vs.get(&pk).is_none() {
                self.cache.vs.insert(pk.clone(), VsCacheEntry::default());
            }
            if let Some(parent_row) = self.cache.vs.get(&pk) {
                parent_row.add_child_uuid(uuid);
                parent_vip = parent_row.vip.clone();
            }
            parent_key = Some(pk);
        }

        if self.cache.vs.get(key).is_none() {
            self.cache.vs.insert(key.clone(), VsCacheEntry::default());
        }
        self.cache.vs.update(key, |row| {
            row.uuid = uuid.to_string();
            row.cksum = cksum.to_string();
            row.invalid_data = last_modified.is_empty();
            row.last_modified = last_modified.clone();
            row.service_metadata = meta.clone();
            if !vip.is_empty() {
                row.vip = vip.clone();
            }
            if parent_key.is_some() {
                row.parent_ref = parent_key.clone();
            }
        });
        debug!(vs = %key.name, %uuid, "updated VS cache");

        if !meta.service_name.is_empty() && !meta.namespace.is_empty() {
            self.status.l4_vip(&meta, &vip);
        } else if (!meta.ingress_name.is_empty() || !meta.namespace_ingress_name.is_empty())
            && !meta.namespace.is_empty()
        {
            let effective = if vip.is_empty() { &parent_vip } else { &vip };
            self.status.ingress_vip(&meta, effective);
        }
        Ok(())
    }

    // === deletion ===

    /// Deletes children the cache still holds under this parent but the
    /// graph no longer wants.
    async fn prune_stale_children(&self, tenant: &str, parent: &VsNode) -> Result<(), AdcError> {
        let parent_key = TenantName::new(tenant, &parent.name);
        let Some(parent_row) = self.cache.vs.get(&parent_key) else {
            return Ok(());
        };
        let desired: HashSet<&str> = parent.children.iter().map(|c| c.name.as_str()).collect();
        let child_uuids = parent_row.vh_child_uuids.lock().clone();
        for child_uuid in child_uuids {
            let Some(child_key) = self.cache.vs_key_by_uuid(&child_uuid) else {
                continue;
            };
            if !desired.contains(child_key.name.as_str()) {
                self.delete_vs(tenant, &child_key).await?;
            }
        }
        Ok(())
    }

    async fn delete_parent(&self, tenant: &str, vs_name: &str) -> Result<(), AdcError> {
        let key = TenantName::new(tenant, vs_name);
        let Some(row) = self.cache.vs.get(&key) else {
            debug!(vs = %vs_name, "nothing cached for deleted model");
            return Ok(());
        };
        let child_uuids = row.vh_child_uuids.lock().clone();
        for child_uuid in child_uuids {
            if let Some(child_key) = self.cache.vs_key_by_uuid(&child_uuid) {
                self.delete_vs(tenant, &child_key).await?;
            }
        }
        self.delete_vs(tenant, &key).await
    }

    /// DELETE one VS and unwind its cache state: the parent's child-uuid
    /// collection, the VSVIP rows, the owned leaves, and the status
    /// transitions for whatever the VS served.
    async fn delete_vs(&self, tenant: &str, key: &TenantName) -> Result<(), AdcError> {
        let Some(row) = self.cache.vs.get(key) else {
            return Ok(());
        };
        if row.uuid.is_empty() {
            warn!(vs = %key.name, "empty uuid for VS, skipping delete");
            return Ok(());
        }

        match self.session.delete(tenant, KIND_VS, &row.uuid).await {
            Ok(()) | Err(AdcError::NotFound) => {}
            Err(error) => return Err(error),
        }
        info!(vs = %key.name, "deleted VS from ADC");

        if let Some(parent_key) = &row.parent_ref {
            if let Some(parent_row) = self.cache.vs.get(parent_key) {
                parent_row.remove_child_uuid(&row.uuid);
            }
        }
        for vsvip_key in &row.vsvip_keys {
            self.cache.vsvip.remove(vsvip_key);
        }

        for (kind, table, keys) in [
            (KIND_HTTP_POLICY, &self.cache.http_policy, &row.http_policy_keys),
            (KIND_POOL_GROUP, &self.cache.pool_group, &row.pool_group_keys),
            (KIND_POOL, &self.cache.pool, &row.pool_keys),
            (KIND_SSL_CERT, &self.cache.ssl_key_cert, &row.ssl_cert_keys),
        ] {
            self.prune_owned(tenant, kind, table, keys, &[]).await?;
        }

        if !row.service_metadata.service_name.is_empty() {
            self.status.l4_deleted(&row.service_metadata);
        }
        if !row.service_metadata.hostnames.is_empty() {
            self.status.ingress_deleted(&row.service_metadata);
        }
        self.cache.vs.remove(key);
        Ok(())
    }

    async fn prune_owned(
        &self,
        tenant: &str,
        kind: &'static str,
        table: &CacheTable<ObjCacheEntry>,
        previous: &[TenantName],
        desired: &[TenantName],
    ) -> Result<(), AdcError> {
        for key in previous {
            if desired.contains(key) {
                continue;
            }
            let Some(row) = table.get(key) else {
                continue;
            };
            match self.session.delete(tenant, kind, &row.uuid).await {
                Ok(()) | Err(AdcError::NotFound) => {
                    debug!(%kind, name = %key.name, "deleted stale object");
                    table.remove(key);
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }
}

fn str_field<'a>(obj: &'a Value, field: &str) -> Option<&'a str> {
    obj.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Extracts the uuid from a back-reference like
/// `https://host/api/virtualservice/virtualservice-<uuid>#<name>`.
fn extract_vs_uuid(vs_ref: &str) -> Option<String> {
    let start = vs_ref.rfind("virtualservice-")?;
    let tail = &vs_ref[start..];
    Some(tail.split('#').next().unwrap_or(tail).to_string())
}

/// The trailing `#<name>` of a back-reference, or the last path segment.
fn extract_vs_name(vs_ref: &str) -> &str {
    if let Some((_, name)) = vs_ref.rsplit_once('#') {
        return name;
    }
    vs_ref.rsplit('/').next().unwrap_or(vs_ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_uuid_and_name_from_parent_ref() {
        let r = "https://10.0.0.1/api/virtualservice/virtualservice-88fd9718-f4f9-4e2b-9552-d31336330e0e#cluster--Shared-L7-0";
        assert_eq!(
            extract_vs_uuid(r).as_deref(),
            Some("virtualservice-88fd9718-f4f9-4e2b-9552-d31336330e0e")
        );
        assert_eq!(extract_vs_name(r), "cluster--Shared-L7-0");
    }
}
