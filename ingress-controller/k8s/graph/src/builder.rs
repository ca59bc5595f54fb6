//! Mutates per-shard object graphs to reflect the desired state of one
//! ingress-like resource.
//!
//! Entry points cover the three host classes (insecure, edge-terminated
//! secure, passthrough) plus stale-state deletion. Every entry point follows
//! the same shape: derive the shard, take the graph lock, mutate, save, and
//! report the model name when the graph checksum moved.

use crate::{
    crd_store::SharedCrdLister,
    endpoints::EndpointLister,
    hostname::{HostNamePathSecret, SharedHostNameLister},
    ingress::{
        to_path_svc_map, IngressLike, ParsedIngress, PathService, PathType, TlsSettings,
        HOSTRULE_SECRET_PREFIX, ROUTE_SECRET_PREFIX,
    },
    names, overlay,
    secrets::{SecretLister, TlsCertData},
    shard::{passthrough_vs_name, shard_vs_name},
    stored::{HostPolicy, PathSvcMap, SharedIngressHostsLister, StoredHosts},
    SharedGraphLister,
};
use adc_ingress_controller_core::{
    CertKind, DataScriptNode, HostPathPoolGroup, HttpPolicySetNode, Layout, ObjectGraph, PathMatch,
    PoolGroupMember, PoolGroupNode, PoolNode, PortProtocol, Protocol, RedirectPort,
    ServiceMetadata, Settings, TlsKeyCertNode, VsNode, VsVipNode, DEFAULT_L7_SECURE_APP_PROFILE,
    DEFAULT_TCP_NETWORK_PROFILE,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

const PASSTHROUGH_APP_PROFILE: &str = "System-L4-Application";

/// How the TLS material for a secure host was resolved, decided before any
/// graph lock is taken.
enum CertSource {
    /// Certificate is supplied out of band (host-rule ref or already built);
    /// nothing to construct locally.
    Prevalidated,
    Resolved(TlsCertData),
    /// Secret missing or malformed; the host must be torn down.
    Failed,
}

pub struct GraphBuilder {
    settings: Arc<Settings>,
    graphs: SharedGraphLister,
    host_names: SharedHostNameLister,
    crds: SharedCrdLister,
    ingress_hosts: SharedIngressHostsLister,
    endpoints: Arc<dyn EndpointLister>,
    secrets: Arc<dyn SecretLister>,
}

impl GraphBuilder {
    pub fn new(
        settings: Arc<Settings>,
        graphs: SharedGraphLister,
        host_names: SharedHostNameLister,
        crds: SharedCrdLister,
        ingress_hosts: SharedIngressHostsLister,
        endpoints: Arc<dyn EndpointLister>,
        secrets: Arc<dyn SecretLister>,
    ) -> Self {
        Self {
            settings,
            graphs,
            host_names,
            crds,
            ingress_hosts,
            endpoints,
            secrets,
        }
    }

    /// Processes one create/update event end to end and returns the changed
    /// model names, ready for the reconciliation queue.
    pub async fn handle_ingress(
        &self,
        resource: &dyn IngressLike,
        parsed: &ParsedIngress,
    ) -> Vec<String> {
        let mut models = Vec::new();
        let mut stored = self
            .ingress_hosts
            .hosts_for_ingress(resource.namespace(), resource.name())
            .unwrap_or_default();
        let mut hosts = StoredHosts::default();

        self.process_insecure_hosts(resource, parsed, &mut stored, &mut hosts, &mut models);
        self.process_secure_hosts(resource, parsed, &mut stored, &mut hosts, &mut models)
            .await;
        self.process_passthrough_hosts(resource, parsed, &mut stored, &mut hosts, &mut models);
        self.delete_stale_data(resource, &stored, &hosts, &mut models);

        self.ingress_hosts
            .save_hosts_for_ingress(resource.namespace(), resource.name(), hosts);
        models
    }

    /// Tears down everything a deleted resource materialized.
    pub fn handle_ingress_delete(&self, resource: &dyn IngressLike) -> Vec<String> {
        let mut models = Vec::new();
        self.delete_pools_by_hostname(resource, &mut models);
        models
    }

    pub fn process_insecure_hosts(
        &self,
        resource: &dyn IngressLike,
        parsed: &ParsedIngress,
        stored: &mut StoredHosts,
        hosts: &mut StoredHosts,
        models: &mut Vec<String>,
    ) {
        for (host, paths) in &parsed.host_map {
            // An accepted host-rule carrying a certificate ref promotes the
            // host onto its own child VS in the SNI layout.
            if self.settings.layout == Layout::Sni && self.host_rule_carries_cert(host) {
                self.promote_host_rule_secured_host(resource, host, paths, stored, hosts, models);
                continue;
            }

            if let Some(data) = stored.get_mut(host) {
                if data.insecure != HostPolicy::None {
                    let diff = resource.diff_path_svc(&data.path_svc, &to_path_svc_map(paths));
                    if diff.is_empty() {
                        // Fully re-materialized below; nothing stale remains.
                        data.insecure = HostPolicy::None;
                        data.secure = HostPolicy::None;
                    } else {
                        data.path_svc = diff;
                    }
                }
            }
            let entry = hosts.entry(host.clone()).or_default();
            entry.insecure = HostPolicy::Allow;
            entry.path_svc = to_path_svc_map(paths);

            let vs_name = match shard_vs_name(&self.settings, host) {
                Ok(name) => name,
                Err(error) => {
                    warn!(%host, %error, "skipping event");
                    return;
                }
            };
            let model = names::model_name(&self.settings, &vs_name);
            let graph = self.graphs.get_or_create(&model);
            let mut graph = graph.lock();
            self.ensure_shared_parent(&mut graph, &vs_name);

            match self.settings.layout {
                Layout::Evh => {
                    let meta = ServiceMetadata::for_ingress(
                        resource.name(),
                        resource.namespace(),
                        vec![host.clone()],
                    );
                    self.build_child_for_host(&mut graph, resource, host, paths, meta, false, None);
                }
                Layout::Sni => self.build_on_parent(&mut graph, resource, host, paths),
            }

            if graph.save() && !models.contains(&model) {
                models.push(model);
            }
        }
    }

    pub async fn process_secure_hosts(
        &self,
        resource: &dyn IngressLike,
        parsed: &ParsedIngress,
        stored: &mut StoredHosts,
        hosts: &mut StoredHosts,
        models: &mut Vec<String>,
    ) {
        for tls in &parsed.tls {
            let source = self.resolve_certs(resource, tls).await;
            for (host, paths) in &tls.hosts {
                self.build_secure_host(resource, tls, &source, host, paths, models);

                if let Some(data) = stored.get_mut(host) {
                    if data.insecure == HostPolicy::Allow {
                        // Transitioning from insecure to secure.
                        data.insecure = HostPolicy::None;
                    }
                    if data.secure == HostPolicy::EdgeTerm {
                        let diff = resource.diff_path_svc(&data.path_svc, &to_path_svc_map(paths));
                        if diff.is_empty() {
                            data.secure = HostPolicy::None;
                            data.insecure = HostPolicy::None;
                        } else {
                            data.path_svc = diff;
                        }
                    }
                }
                let entry = hosts.entry(host.clone()).or_default();
                entry.secure = HostPolicy::EdgeTerm;
                if tls.redirect {
                    entry.insecure = HostPolicy::Redirect;
                }
                entry.path_svc = to_path_svc_map(paths);
            }
        }
    }

    pub fn process_passthrough_hosts(
        &self,
        resource: &dyn IngressLike,
        parsed: &ParsedIngress,
        stored: &mut StoredHosts,
        hosts: &mut StoredHosts,
        models: &mut Vec<String>,
    ) {
        for (host, paths) in &parsed.passthrough {
            if let Some(data) = stored.get_mut(host) {
                if data.secure == HostPolicy::Passthrough {
                    let diff = resource.diff_path_svc(&data.path_svc, &to_path_svc_map(paths));
                    if diff.is_empty() {
                        data.secure = HostPolicy::None;
                        data.insecure = HostPolicy::None;
                    } else {
                        data.path_svc = diff;
                    }
                }
            }
            let entry = hosts.entry(host.clone()).or_default();
            entry.secure = HostPolicy::Passthrough;
            entry.path_svc = to_path_svc_map(paths);

            let vs_name = match passthrough_vs_name(&self.settings, host) {
                Ok(name) => name,
                Err(error) => {
                    warn!(%host, %error, "skipping event");
                    return;
                }
            };
            let model = names::model_name(&self.settings, &vs_name);
            let graph = self.graphs.get_or_create(&model);
            let mut graph = graph.lock();
            self.ensure_passthrough_parent(&mut graph, &vs_name);

            let parent = graph.parent_mut().expect("parent was just ensured");
            parent.vsvip_refs[0].add_fqdn(host);
            let pg_name = names::child_vs_name(&self.settings, host);
            let mut pg = PoolGroupNode {
                name: pg_name.clone(),
                tenant: self.settings.tenant.clone(),
                members: Vec::new(),
            };
            for path in paths {
                let pool = self.mk_pool(resource, host, path, false);
                pg.members.push(PoolGroupMember {
                    pool_ref: names::pool_ref(&pool.name),
                    ratio: path.weight,
                });
                parent.replace_pool(pool);
            }
            parent.replace_pool_group(pg);
            if let Some(ds) = parent.http_ds_refs.first_mut() {
                if !ds.pool_group_refs.contains(&pg_name) {
                    ds.pool_group_refs.push(pg_name);
                }
            }

            if graph.save() && !models.contains(&model) {
                models.push(model);
            }
        }
    }

    /// Removes whatever remains in `stored` after the incoming state was
    /// processed, applying the host-transition rules.
    pub fn delete_stale_data(
        &self,
        resource: &dyn IngressLike,
        stored: &StoredHosts,
        hosts: &StoredHosts,
        models: &mut Vec<String>,
    ) {
        for (host, data) in stored {
            let shard = if data.secure == HostPolicy::Passthrough {
                passthrough_vs_name(&self.settings, host)
            } else {
                shard_vs_name(&self.settings, host)
            };
            let vs_name = match shard {
                Ok(name) => name,
                Err(error) => {
                    warn!(%host, %error, "skipping event");
                    return;
                }
            };
            let model = names::model_name(&self.settings, &vs_name);
            let Some(graph) = self.graphs.get(&model) else {
                warn!(%model, "model not found during delete");
                continue;
            };

            // Hosts still present (and not crossing the passthrough boundary)
            // keep their FQDN; their redirect entry survives only if the new
            // state still redirects.
            let mut remove_fqdn = true;
            let mut remove_redirect = true;
            if let Some(current) = hosts.get(host) {
                if data.secure != HostPolicy::Passthrough
                    && current.secure != HostPolicy::Passthrough
                {
                    remove_fqdn = false;
                    if current.insecure == HostPolicy::Redirect {
                        remove_redirect = false;
                    }
                }
            }

            let mut graph = graph.lock();
            if data.secure == HostPolicy::EdgeTerm {
                self.delete_host_paths(
                    &mut graph,
                    resource,
                    host,
                    &data.path_svc,
                    remove_fqdn,
                    remove_redirect,
                    true,
                );
            }
            if data.secure == HostPolicy::Passthrough {
                self.delete_passthrough_host(&mut graph, resource, host, &data.path_svc);
            }
            if data.insecure != HostPolicy::None {
                self.delete_host_paths(
                    &mut graph,
                    resource,
                    host,
                    &data.path_svc,
                    remove_fqdn,
                    remove_redirect,
                    false,
                );
            }
            if graph.save() && !models.contains(&model) {
                models.push(model.clone());
            }
        }
    }

    pub fn delete_pools_by_hostname(&self, resource: &dyn IngressLike, models: &mut Vec<String>) {
        let namespace = resource.namespace();
        let name = resource.name();
        let Some(host_map) = self.ingress_hosts.hosts_for_ingress(namespace, name) else {
            warn!(ingress = %name, "nothing to delete");
            return;
        };
        debug!(ingress = %name, hosts = host_map.len(), "deleting hosts");

        for (host, data) in &host_map {
            let shard = if data.secure == HostPolicy::Passthrough {
                passthrough_vs_name(&self.settings, host)
            } else {
                shard_vs_name(&self.settings, host)
            };
            let vs_name = match shard {
                Ok(vs_name) => vs_name,
                Err(error) => {
                    warn!(%host, %error, "skipping event");
                    return;
                }
            };
            let model = names::model_name(&self.settings, &vs_name);
            let Some(graph) = self.graphs.get(&model) else {
                warn!(%model, "model not found during delete");
                continue;
            };
            let mut graph = graph.lock();
            if data.secure == HostPolicy::EdgeTerm {
                self.delete_host_paths(&mut graph, resource, host, &data.path_svc, true, true, true);
            }
            if data.secure == HostPolicy::Passthrough {
                self.delete_passthrough_host(&mut graph, resource, host, &data.path_svc);
            }
            if data.insecure == HostPolicy::Allow {
                self.delete_host_paths(
                    &mut graph,
                    resource,
                    host,
                    &data.path_svc,
                    true,
                    true,
                    false,
                );
            }
            if graph.save() && !models.contains(&model) {
                models.push(model);
            }
        }

        self.ingress_hosts.remove_ingress_secret_mappings(name);
        self.ingress_hosts.delete_hosts_for_ingress(namespace, name);
        info!(ingress = %name, "removed ingress mappings");
    }

    // === secure hosts ===

    async fn resolve_certs(&self, resource: &dyn IngressLike, tls: &TlsSettings) -> CertSource {
        if tls.secret_name.starts_with(HOSTRULE_SECRET_PREFIX) {
            return CertSource::Prevalidated;
        }
        if tls.secret_name.starts_with(ROUTE_SECRET_PREFIX) {
            return match (&tls.cert, &tls.key) {
                (Some(cert), Some(key)) => CertSource::Resolved(TlsCertData {
                    cert: cert.clone().into_bytes(),
                    key: key.clone().into_bytes(),
                    ca_cert: tls.ca_cert.clone().map(String::into_bytes),
                }),
                _ => {
                    info!(secret = %tls.secret_name, "no cert/key specified for TLS route");
                    CertSource::Failed
                }
            };
        }
        let namespace = tls
            .secret_namespace
            .as_deref()
            .unwrap_or_else(|| resource.namespace());
        match self.secrets.get(namespace, &tls.secret_name).await {
            Ok(data) => CertSource::Resolved(data),
            Err(error) => {
                info!(secret = %tls.secret_name, %error, "cannot build certificate");
                CertSource::Failed
            }
        }
    }

    fn build_secure_host(
        &self,
        resource: &dyn IngressLike,
        tls: &TlsSettings,
        source: &CertSource,
        host: &str,
        paths: &[PathService],
        models: &mut Vec<String>,
    ) {
        let namespace = resource.namespace();
        let ingress = resource.name();
        let secret_ns = tls.secret_namespace.as_deref().unwrap_or(namespace);

        self.host_names.save(
            host,
            namespace,
            ingress,
            HostNamePathSecret {
                paths: paths.iter().map(|p| p.path.clone()).collect(),
                secret_name: tls.secret_name.clone(),
            },
        );
        self.ingress_hosts
            .save_secret_to_ingress(secret_ns, &tls.secret_name, ingress);

        let vs_name = match shard_vs_name(&self.settings, host) {
            Ok(name) => name,
            Err(error) => {
                warn!(%host, %error, "skipping event");
                return;
            }
        };
        let model = names::model_name(&self.settings, &vs_name);
        let graph = self.graphs.get_or_create(&model);
        let mut graph = graph.lock();
        self.ensure_shared_parent(&mut graph, &vs_name);

        let meta = ServiceMetadata {
            namespace_ingress_name: self.host_names.ingresses_for_host(host),
            namespace: namespace.to_string(),
            hostnames: vec![host.to_string()],
            ..ServiceMetadata::default()
        };

        // In the EVH layout certificates terminate on the parent; SNI
        // children own their certificates.
        let child_name = names::child_vs_name(&self.settings, host);
        let certs_on_parent = self.settings.layout == Layout::Evh;
        let already_referenced = graph
            .parent()
            .and_then(|p| p.child(&child_name))
            .map(|c| !c.ssl_key_cert_ref.is_empty())
            .unwrap_or(false);

        let mut child_certs = None;
        let certs_built = match source {
            CertSource::Prevalidated => true,
            _ if already_referenced => true,
            CertSource::Resolved(data) => {
                let certs = self.mk_cert_nodes(namespace, &tls.secret_name, host, data);
                if certs_on_parent {
                    let parent = graph.parent_mut().expect("parent was just ensured");
                    if let Some(ca) = certs.1.clone() {
                        parent.replace_ca_cert(ca);
                    } else {
                        parent.remove_ca_cert(&names::ca_cert_name(&certs.0.name));
                    }
                    parent.replace_ssl_ref(certs.0.clone());
                } else {
                    child_certs = Some(certs);
                }
                true
            }
            CertSource::Failed => false,
        };

        if certs_built {
            self.build_child_for_host(&mut graph, resource, host, paths, meta, true, child_certs);
            let parent = graph.parent_mut().expect("parent was just ensured");
            remove_redirect_host(parent, host);
            if tls.redirect {
                build_redirect_policy(parent, host);
            }
        } else {
            // A half-built child must not survive a missing secret.
            self.host_names.remove_ingress(host, namespace, ingress);
            if let Some(ingresses) = self.ingress_hosts.ingresses_for_secret(secret_ns, &tls.secret_name)
            {
                if ingresses.is_empty() {
                    self.ingress_hosts.delete_secret_mapping(secret_ns, &tls.secret_name);
                }
            }
            if self.host_names.ingresses_for_host(host).is_empty() {
                let cert_name = names::tls_cert_name(&self.settings, namespace, &tls.secret_name, host);
                let parent = graph.parent_mut().expect("parent was just ensured");
                parent.remove_ssl_ref(&cert_name);
                parent.remove_ca_cert(&names::ca_cert_name(&cert_name));
                parent.remove_child(&child_name);
                remove_redirect_host(parent, host);
                self.host_names.delete(host);
            }
        }

        if graph.save() && !models.contains(&model) {
            models.push(model);
        }
    }

    fn mk_cert_nodes(
        &self,
        namespace: &str,
        secret: &str,
        host: &str,
        data: &TlsCertData,
    ) -> (TlsKeyCertNode, Option<TlsKeyCertNode>) {
        let name = names::tls_cert_name(&self.settings, namespace, secret, host);
        let ca = data.ca_cert.as_ref().map(|ca| TlsKeyCertNode {
            name: names::ca_cert_name(&name),
            tenant: self.settings.tenant.clone(),
            kind: CertKind::Ca,
            cert: ca.clone(),
            key: Vec::new(),
            ca_cert_name: None,
        });
        let cert = TlsKeyCertNode {
            name,
            tenant: self.settings.tenant.clone(),
            kind: CertKind::Vs,
            cert: data.cert.clone(),
            key: data.key.clone(),
            ca_cert_name: ca.as_ref().map(|c| c.name.clone()),
        };
        (cert, ca)
    }

    // === host-rule promotion (SNI layout) ===

    fn host_rule_carries_cert(&self, host: &str) -> bool {
        self.crds
            .host_rule_for_fqdn(host)
            .map(|(_, spec)| !spec.tls.ssl_key_certificate.is_empty())
            .unwrap_or(false)
    }

    /// Builds an insecure host as a secure child because a host-rule supplies
    /// its certificate by reference.
    fn promote_host_rule_secured_host(
        &self,
        resource: &dyn IngressLike,
        host: &str,
        paths: &[PathService],
        stored: &mut StoredHosts,
        hosts: &mut StoredHosts,
        models: &mut Vec<String>,
    ) {
        debug!(%host, "host-rule certificate promotes host to its own child VS");
        if let Some(data) = stored.get_mut(host) {
            if data.secure == HostPolicy::EdgeTerm {
                let diff = resource.diff_path_svc(&data.path_svc, &to_path_svc_map(paths));
                if diff.is_empty() {
                    data.secure = HostPolicy::None;
                    // `insecure` is left untouched: a host moving from the
                    // parent onto a child still owes the parent its pool
                    // cleanup.
                } else {
                    data.path_svc = diff;
                }
            }
        }
        let entry = hosts.entry(host.to_string()).or_default();
        entry.secure = HostPolicy::EdgeTerm;
        entry.path_svc = to_path_svc_map(paths);

        let tls = TlsSettings {
            secret_name: format!("{}{}", HOSTRULE_SECRET_PREFIX, host),
            hosts: [(host.to_string(), paths.to_vec())].into_iter().collect(),
            ..TlsSettings::default()
        };
        self.build_secure_host(resource, &tls, &CertSource::Prevalidated, host, paths, models);
    }

    // === graph construction ===

    fn ensure_shared_parent<'a>(&self, graph: &'a mut ObjectGraph, vs_name: &str) -> &'a mut VsNode {
        if graph.parent().is_none() {
            let vip = self.mk_vsvip(vs_name, true);
            let parent = VsNode {
                name: vs_name.to_string(),
                tenant: self.settings.tenant.clone(),
                vrf_context: self.settings.vrf.clone(),
                service_engine_group: self
                    .settings
                    .non_default_se_group()
                    .unwrap_or_default()
                    .to_string(),
                application_profile: DEFAULT_L7_SECURE_APP_PROFILE.to_string(),
                network_profile: DEFAULT_TCP_NETWORK_PROFILE.to_string(),
                port_proto: vec![PortProtocol::http(80), PortProtocol::https(443)],
                shared_vs: true,
                evh_parent: self.settings.layout == Layout::Evh,
                enable_rhi: self.settings.enable_rhi,
                vsvip_refs: vec![vip],
                cluster_label_checksum: self.settings.cluster_label_checksum(),
                ..VsNode::default()
            };
            info!(vs = %vs_name, "creating shared parent VS");
            graph.set_parent(parent);
        }
        graph.parent_mut().expect("parent was just ensured")
    }

    fn ensure_passthrough_parent<'a>(
        &self,
        graph: &'a mut ObjectGraph,
        vs_name: &str,
    ) -> &'a mut VsNode {
        if graph.parent().is_none() {
            let vip = self.mk_vsvip(vs_name, false);
            let parent = VsNode {
                name: vs_name.to_string(),
                tenant: self.settings.tenant.clone(),
                vrf_context: self.settings.vrf.clone(),
                service_engine_group: self
                    .settings
                    .non_default_se_group()
                    .unwrap_or_default()
                    .to_string(),
                application_profile: PASSTHROUGH_APP_PROFILE.to_string(),
                network_profile: DEFAULT_TCP_NETWORK_PROFILE.to_string(),
                port_proto: vec![PortProtocol {
                    port: 443,
                    protocol: Protocol::Tcp,
                    enable_ssl: false,
                }],
                shared_vs: true,
                vsvip_refs: vec![vip],
                http_ds_refs: vec![DataScriptNode {
                    name: format!("{}-datascript", vs_name),
                    tenant: self.settings.tenant.clone(),
                    script: String::new(),
                    pool_group_refs: Vec::new(),
                }],
                cluster_label_checksum: self.settings.cluster_label_checksum(),
                ..VsNode::default()
            };
            info!(vs = %vs_name, "creating passthrough parent VS");
            graph.set_parent(parent);
        }
        graph.parent_mut().expect("parent was just ensured")
    }

    fn mk_vsvip(&self, vs_name: &str, seed_default_fqdn: bool) -> VsVipNode {
        let mut fqdns = Vec::new();
        if seed_default_fqdn {
            match &self.settings.default_sub_domain {
                Some(sub) if sub.starts_with('.') => {
                    fqdns.push(format!("{}.{}{}", vs_name, self.settings.tenant, sub));
                }
                Some(sub) => {
                    fqdns.push(format!("{}.{}.{}", vs_name, self.settings.tenant, sub));
                }
                None => {
                    warn!("no ipam-dns subdomain configured, skipping the default fqdn");
                }
            }
        }
        VsVipNode {
            name: names::vsvip_name(vs_name),
            tenant: self.settings.tenant.clone(),
            vrf_context: self.settings.vrf.clone(),
            fqdns,
            east_west: false,
            network_name: self.settings.network_name.clone(),
            subnet_ip: self.settings.subnet_ip.clone(),
            subnet_prefix: self.settings.subnet_prefix,
        }
    }

    /// SNI-layout insecure hosts: pools, pool groups and switching policies
    /// attach directly to the shared parent.
    fn build_on_parent(
        &self,
        graph: &mut ObjectGraph,
        resource: &dyn IngressLike,
        host: &str,
        paths: &[PathService],
    ) {
        let parent = graph.parent_mut().expect("parent was just ensured");
        parent.vsvip_refs[0].add_fqdn(host);
        self.build_host_paths(parent, resource, host, paths, false);
        overlay::apply_http_rules(
            &self.settings,
            &self.crds,
            host,
            resource.name(),
            parent,
            false,
        );
    }

    /// Gets or creates the per-host child, rebuilds its paths, runs the CRD
    /// overlay, and swaps it into the parent when its checksum moved.
    #[allow(clippy::too_many_arguments)]
    fn build_child_for_host(
        &self,
        graph: &mut ObjectGraph,
        resource: &dyn IngressLike,
        host: &str,
        paths: &[PathService],
        meta: ServiceMetadata,
        secure: bool,
        certs: Option<(TlsKeyCertNode, Option<TlsKeyCertNode>)>,
    ) {
        let parent = graph.parent_mut().expect("parent was just ensured");
        parent.vsvip_refs[0].add_fqdn(host);

        let child_name = names::child_vs_name(&self.settings, host);
        let mut child = match parent.child(&child_name) {
            Some(existing) => {
                let mut child = existing.clone();
                child.service_metadata = meta;
                child
            }
            None => VsNode {
                name: child_name,
                tenant: self.settings.tenant.clone(),
                vh_parent_name: parent.name.clone(),
                evh_host_name: host.to_string(),
                service_metadata: meta,
                cluster_label_checksum: self.settings.cluster_label_checksum(),
                ..VsNode::default()
            },
        };
        child.vrf_context = self.settings.vrf.clone();
        child.service_engine_group = self
            .settings
            .non_default_se_group()
            .unwrap_or_default()
            .to_string();
        child.add_vh_domain(host);

        if let Some((cert, ca)) = certs {
            if let Some(ca) = ca {
                child.replace_ca_cert(ca);
            } else {
                child.remove_ca_cert(&names::ca_cert_name(&cert.name));
            }
            child.replace_ssl_ref(cert);
        }

        let secure_naming = secure && self.settings.layout == Layout::Sni;
        self.build_host_paths(&mut child, resource, host, paths, secure_naming);
        overlay::apply_http_rules(
            &self.settings,
            &self.crds,
            host,
            resource.name(),
            &mut child,
            secure_naming,
        );
        overlay::apply_host_rule(&self.crds, host, &mut child);

        if parent.replace_child(child) {
            debug!(%host, "replaced child VS in model");
        }
    }

    /// Builds one pool per (path, service), one pool group per path, and one
    /// switching-policy entry per pool group on the given virtual host.
    fn build_host_paths(
        &self,
        vs: &mut VsNode,
        resource: &dyn IngressLike,
        host: &str,
        paths: &[PathService],
        secure_naming: bool,
    ) {
        let mut local_pgs: Vec<PoolGroupNode> = Vec::new();
        let mut policies: Vec<HttpPolicySetNode> = Vec::new();
        let mut pools: Vec<PoolNode> = Vec::new();

        for path in paths {
            let pg_name = names::pool_name(
                &self.settings,
                resource.name(),
                resource.namespace(),
                host,
                &path.path,
                secure_naming,
            );

            // Alternate backends on one path share a single pool group.
            if !local_pgs.iter().any(|pg| pg.name == pg_name) {
                local_pgs.push(PoolGroupNode {
                    name: pg_name.clone(),
                    tenant: self.settings.tenant.clone(),
                    members: Vec::new(),
                });
                policies.push(HttpPolicySetNode {
                    name: pg_name.clone(),
                    tenant: self.settings.tenant.clone(),
                    hpp_map: vec![HostPathPoolGroup {
                        host: host.to_string(),
                        path: (!path.path.is_empty()).then(|| path.path.clone()),
                        match_criteria: match path.path_type {
                            PathType::Exact => PathMatch::Equals,
                            // Prefix and ImplementationSpecific both fall back
                            // to a begins-with match.
                            _ => PathMatch::BeginsWith,
                        },
                        pool_group: pg_name.clone(),
                    }],
                    redirect_ports: Vec::new(),
                });
            }

            let pool = self.mk_pool(resource, host, path, secure_naming);
            let pg = local_pgs
                .iter_mut()
                .find(|pg| pg.name == pg_name)
                .expect("pool group was just ensured");
            pg.members.push(PoolGroupMember {
                pool_ref: names::pool_ref(&pool.name),
                ratio: path.weight,
            });
            pools.push(pool);
        }

        for pool in pools {
            vs.replace_pool(pool);
        }
        for pg in local_pgs {
            vs.replace_pool_group(pg);
        }
        for policy in policies {
            vs.replace_http_policy(policy);
        }
        debug!(vs = %vs.name, %host, "added pools and pool groups");
    }

    fn mk_pool(
        &self,
        resource: &dyn IngressLike,
        host: &str,
        path: &PathService,
        secure_naming: bool,
    ) -> PoolNode {
        let name = names::pool_name(
            &self.settings,
            resource.name(),
            resource.namespace(),
            host,
            &path.path,
            secure_naming,
        );
        PoolNode {
            name,
            tenant: self.settings.tenant.clone(),
            vrf_context: self.settings.vrf.clone(),
            port_name: path.port_name.clone(),
            ingress_name: resource.name().to_string(),
            servers: self.endpoints.servers(
                resource.namespace(),
                &path.service_name,
                &path.port_name,
                self.settings.service_type,
            ),
            service_metadata: ServiceMetadata::for_ingress(
                resource.name(),
                resource.namespace(),
                vec![host.to_string()],
            ),
            ..PoolNode::default()
        }
    }

    // === deletion ===

    /// Removes one host's (path, service) tuples; drops the child VS, its
    /// certificates, the FQDN and the redirect entry once nothing keeps the
    /// host alive.
    #[allow(clippy::too_many_arguments)]
    fn delete_host_paths(
        &self,
        graph: &mut ObjectGraph,
        resource: &dyn IngressLike,
        host: &str,
        path_svc: &PathSvcMap,
        remove_fqdn: bool,
        remove_redirect: bool,
        secure: bool,
    ) {
        let namespace = resource.namespace();
        let ingress = resource.name();
        self.host_names.remove_ingress(host, namespace, ingress);

        let Some(parent) = graph.parent_mut() else {
            return;
        };
        let secure_naming = secure && self.settings.layout == Layout::Sni;
        let on_child = secure || self.settings.layout == Layout::Evh;

        let keep_host;
        if on_child {
            let child_name = names::child_vs_name(&self.settings, host);
            info!(child = %child_name, "child VS to prune");
            let mut child_drained = false;
            if let Some(child) = parent.child_mut(&child_name) {
                for path in path_svc.keys() {
                    let pool_name = names::pool_name(
                        &self.settings,
                        ingress,
                        namespace,
                        host,
                        path,
                        secure_naming,
                    );
                    remove_path_objects(child, &pool_name);
                }
                child_drained = child.pool_refs.is_empty();
                keep_host = !child_drained;
            } else {
                keep_host = false;
            }
            if child_drained {
                parent.remove_child(&child_name);
                self.host_names.delete(host);
                let host_suffix = format!("-{}", host);
                parent
                    .ssl_key_cert_refs
                    .retain(|c| !c.name.ends_with(&host_suffix));
            }
        } else {
            for path in path_svc.keys() {
                let pool_name =
                    names::pool_name(&self.settings, ingress, namespace, host, path, false);
                remove_path_objects(parent, &pool_name);
            }
            let host_prefix = format!("{}{}", self.settings.name_prefix, host);
            keep_host = parent
                .pool_refs
                .iter()
                .any(|p| p.name.starts_with(&host_prefix));
        }

        if remove_fqdn && !keep_host {
            parent.vsvip_refs[0].remove_fqdns(&[host.to_string()]);
        }
        if remove_redirect && !keep_host {
            remove_redirect_host(parent, host);
        }
    }

    fn delete_passthrough_host(
        &self,
        graph: &mut ObjectGraph,
        resource: &dyn IngressLike,
        host: &str,
        path_svc: &PathSvcMap,
    ) {
        let Some(parent) = graph.parent_mut() else {
            return;
        };
        for path in path_svc.keys() {
            let pool_name = names::pool_name(
                &self.settings,
                resource.name(),
                resource.namespace(),
                host,
                path,
                false,
            );
            parent.remove_pool(&pool_name);
            let pool_ref = names::pool_ref(&pool_name);
            let pg_name = names::child_vs_name(&self.settings, host);
            if let Some(pg) = parent.pool_group_mut(&pg_name) {
                pg.remove_member(&pool_ref);
                if pg.members.is_empty() {
                    parent.remove_pool_group(&pg_name);
                    if let Some(ds) = parent.http_ds_refs.first_mut() {
                        ds.pool_group_refs.retain(|r| r != &pg_name);
                    }
                }
            }
        }
        parent.vsvip_refs[0].remove_fqdns(&[host.to_string()]);
    }
}

/// Drops a pool, its pool-group membership, and the pool group plus its
/// switching policy when the group drains.
fn remove_path_objects(vs: &mut VsNode, pool_name: &str) {
    vs.remove_pool(pool_name);
    let pool_ref = names::pool_ref(pool_name);
    if let Some(pg) = vs.pool_group_mut(pool_name) {
        pg.remove_member(&pool_ref);
        if pg.members.is_empty() {
            vs.remove_pool_group(pool_name);
            vs.remove_http_policy(pool_name);
        }
    }
}

/// Adds `host` to the parent's single redirect policy, creating the policy on
/// first use.
fn build_redirect_policy(parent: &mut VsNode, host: &str) {
    let name = names::redirect_policy_name(&parent.name);
    if let Some(policy) = parent.http_policy_refs.iter_mut().find(|p| p.name == name) {
        let redirect = &mut policy.redirect_ports[0];
        if !redirect.hosts.iter().any(|h| h == host) {
            redirect.hosts.push(host.to_string());
        }
        return;
    }
    parent.http_policy_refs.push(HttpPolicySetNode {
        name,
        tenant: parent.tenant.clone(),
        hpp_map: Vec::new(),
        redirect_ports: vec![RedirectPort::to_https(host)],
    });
}

/// Removes `host` from the redirect policy; deletes the policy when its host
/// list drains.
fn remove_redirect_host(parent: &mut VsNode, host: &str) {
    let name = names::redirect_policy_name(&parent.name);
    let mut drained = false;
    if let Some(policy) = parent.http_policy_refs.iter_mut().find(|p| p.name == name) {
        let redirect = &mut policy.redirect_ports[0];
        redirect.hosts.retain(|h| h != host);
        drained = redirect.hosts.is_empty();
    }
    if drained {
        parent.remove_http_policy(&name);
    }
}
