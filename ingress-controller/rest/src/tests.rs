use crate::{AdcCache, AdcError, AdcSession, RestReconciler};
use adc_ingress_controller_core::{
    HttpPolicySetNode, NoopStatusSink, PoolGroupMember, PoolGroupNode, PoolNode, PortProtocol,
    ServiceMetadata, Settings, TenantName, VsNode, VsVipNode, DEFAULT_L7_SECURE_APP_PROFILE,
    DEFAULT_TCP_NETWORK_PROFILE,
};
use adc_ingress_controller_k8s_graph::SharedGraphLister;
use ahash::AHashMap as HashMap;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

/// Records every REST call and answers with plausible ADC responses.
#[derive(Default)]
struct FakeSession {
    ops: Mutex<Vec<String>>,
    uuids: Mutex<HashMap<String, String>>,
    seq: AtomicU64,
    vsvip_missing: AtomicBool,
}

impl FakeSession {
    fn ops(&self) -> Vec<String> {
        self.ops.lock().clone()
    }

    fn uuid_for(&self, kind: &str, name: &str) -> String {
        let mut uuids = self.uuids.lock();
        uuids
            .entry(format!("{}/{}", kind, name))
            .or_insert_with(|| {
                format!(
                    "{}-uuid-{}",
                    kind.to_ascii_lowercase(),
                    self.seq.fetch_add(1, Ordering::Relaxed)
                )
            })
            .clone()
    }

    fn respond(&self, kind: &str, obj: &Value) -> Value {
        let name = obj["name"].as_str().unwrap_or_default().to_string();
        let uuid = self.uuid_for(kind, &name);
        let mut resp = json!({
            "name": name,
            "uuid": uuid,
            "cloud_config_cksum": obj.get("cloud_config_cksum").cloned().unwrap_or_else(|| "0".into()),
            "_last_modified": "1700000000000000",
        });
        if kind == "VirtualService" {
            resp["vip"] = json!([{ "ip_address": { "addr": "10.10.10.1", "type": "V4" } }]);
            if let Some(meta) = obj.get("service_metadata") {
                resp["service_metadata"] = meta.clone();
            }
            if let Some(parent_ref) = obj.get("vh_parent_vs_ref").and_then(Value::as_str) {
                let parent_name = parent_ref.rsplit('=').next().unwrap_or_default();
                let parent_uuid = self.uuid_for(kind, parent_name);
                resp["vh_parent_vs_ref"] = format!(
                    "https://adc.example.com/api/virtualservice/{}#{}",
                    parent_uuid, parent_name
                )
                .into();
            }
        }
        resp
    }
}

#[async_trait::async_trait]
impl AdcSession for FakeSession {
    async fn create(&self, _tenant: &str, kind: &str, obj: Value) -> Result<Value, AdcError> {
        let name = obj["name"].as_str().unwrap_or_default();
        self.ops.lock().push(format!("POST {} {}", kind, name));
        Ok(self.respond(kind, &obj))
    }

    async fn update(
        &self,
        _tenant: &str,
        kind: &str,
        uuid: &str,
        obj: Value,
    ) -> Result<Value, AdcError> {
        let name = obj["name"].as_str().unwrap_or_default();
        self.ops.lock().push(format!("PUT {} {}", kind, name));
        let mut resp = self.respond(kind, &obj);
        resp["uuid"] = uuid.into();
        Ok(resp)
    }

    async fn delete(&self, _tenant: &str, kind: &str, uuid: &str) -> Result<(), AdcError> {
        self.ops.lock().push(format!("DELETE {} {}", kind, uuid));
        Ok(())
    }

    async fn get(&self, _tenant: &str, kind: &str, uuid: &str) -> Result<Value, AdcError> {
        if kind == "VsVip" && self.vsvip_missing.load(Ordering::Relaxed) {
            return Err(AdcError::VsVipNotFound);
        }
        Ok(json!({ "uuid": uuid, "dns_info": [] }))
    }

    async fn list(&self, _tenant: &str, _kind: &str, _query: &str) -> Result<Vec<Value>, AdcError> {
        Ok(Vec::new())
    }
}

fn mk_parent(name: &str) -> VsNode {
    VsNode {
        name: name.to_string(),
        tenant: "admin".to_string(),
        shared_vs: true,
        application_profile: DEFAULT_L7_SECURE_APP_PROFILE.to_string(),
        network_profile: DEFAULT_TCP_NETWORK_PROFILE.to_string(),
        port_proto: vec![PortProtocol::http(80), PortProtocol::https(443)],
        vsvip_refs: vec![VsVipNode {
            name: name.to_string(),
            tenant: "admin".to_string(),
            fqdns: vec!["foo.com".to_string()],
            ..VsVipNode::default()
        }],
        ..VsNode::default()
    }
}

fn mk_child(parent: &str, host: &str) -> VsNode {
    let pool_name = format!("cluster--default-{}_foo-ing", host);
    VsNode {
        name: format!("cluster--{}", host),
        tenant: "admin".to_string(),
        vh_parent_name: parent.to_string(),
        evh_host_name: host.to_string(),
        vh_domain_names: vec![host.to_string()],
        service_metadata: ServiceMetadata {
            namespace_ingress_name: vec!["default/ing".to_string()],
            namespace: "default".to_string(),
            hostnames: vec![host.to_string()],
            ..ServiceMetadata::default()
        },
        pool_refs: vec![PoolNode {
            name: pool_name.clone(),
            tenant: "admin".to_string(),
            ..PoolNode::default()
        }],
        pool_group_refs: vec![PoolGroupNode {
            name: pool_name.clone(),
            tenant: "admin".to_string(),
            members: vec![PoolGroupMember {
                pool_ref: format!("/api/pool?name={}", pool_name),
                ratio: 100,
            }],
        }],
        http_policy_refs: vec![HttpPolicySetNode {
            name: pool_name,
            tenant: "admin".to_string(),
            ..HttpPolicySetNode::default()
        }],
        ..VsNode::default()
    }
}

struct Harness {
    graphs: SharedGraphLister,
    cache: Arc<AdcCache>,
    session: Arc<FakeSession>,
    reconciler: RestReconciler,
}

fn mk_harness() -> Harness {
    let settings = Arc::new(Settings::default());
    let graphs = SharedGraphLister::default();
    let cache = Arc::new(AdcCache::default());
    let session = Arc::new(FakeSession::default());
    let reconciler = RestReconciler::new(
        settings,
        graphs.clone(),
        cache.clone(),
        session.clone(),
        Arc::new(NoopStatusSink),
    );
    Harness {
        graphs,
        cache,
        session,
        reconciler,
    }
}

fn save_model(harness: &Harness, model: &str, parent: VsNode) {
    let graph = harness.graphs.get_or_create(model);
    let mut graph = graph.lock();
    if graph.is_empty() {
        graph.set_parent(parent);
    } else {
        *graph.parent_mut().unwrap() = parent;
    }
    graph.save();
}

#[tokio::test]
async fn first_sync_creates_in_dependency_order() {
    let harness = mk_harness();
    let model = "admin/cluster--Shared-L7-0";
    let mut parent = mk_parent("cluster--Shared-L7-0");
    parent.children.push(mk_child("cluster--Shared-L7-0", "foo.com"));
    save_model(&harness, model, parent);

    harness.reconciler.sync_model(model).await.unwrap();

    let ops = harness.session.ops();
    let pos = |needle: &str| {
        ops.iter()
            .position(|op| op.contains(needle))
            .unwrap_or_else(|| panic!("{} not in {:?}", needle, ops))
    };
    // VSVIP first, then the parent (so children can reference it), then the
    // child's leaves, then the child VS.
    assert!(pos("POST VsVip") < pos("POST VirtualService cluster--Shared-L7-0"));
    assert!(pos("POST VirtualService cluster--Shared-L7-0") < pos("POST VirtualService cluster--foo.com"));
    assert!(pos("POST Pool ") < pos("POST VirtualService cluster--foo.com"));
    assert!(pos("POST PoolGroup") < pos("POST VirtualService cluster--foo.com"));
    assert!(pos("POST HTTPPolicySet") < pos("POST VirtualService cluster--foo.com"));

    // The parent cache row carries the child's uuid as a weak reference.
    let parent_row = harness
        .cache
        .vs
        .get(&TenantName::new("admin", "cluster--Shared-L7-0"))
        .unwrap();
    assert_eq!(parent_row.vh_child_uuids.lock().len(), 1);
    let child_row = harness
        .cache
        .vs
        .get(&TenantName::new("admin", "cluster--foo.com"))
        .unwrap();
    assert_eq!(child_row.parent_ref.as_ref().unwrap().name, "cluster--Shared-L7-0");
}

#[tokio::test]
async fn unchanged_model_is_a_noop() {
    let harness = mk_harness();
    let model = "admin/cluster--Shared-L7-0";
    save_model(&harness, model, mk_parent("cluster--Shared-L7-0"));

    harness.reconciler.sync_model(model).await.unwrap();
    let first = harness.session.ops().len();
    harness.reconciler.sync_model(model).await.unwrap();
    // The VSVIP GET/PUT pair still runs (DNS info is reasserted); no VS
    // operation is repeated.
    let ops = harness.session.ops();
    assert!(
        !ops[first..].iter().any(|op| op.contains("VirtualService")),
        "unexpected VS ops: {:?}",
        &ops[first..]
    );
}

#[tokio::test]
async fn changed_model_puts_with_cached_uuid() {
    let harness = mk_harness();
    let model = "admin/cluster--Shared-L7-0";
    save_model(&harness, model, mk_parent("cluster--Shared-L7-0"));
    harness.reconciler.sync_model(model).await.unwrap();

    let mut updated = mk_parent("cluster--Shared-L7-0");
    updated.enable_rhi = Some(true);
    save_model(&harness, model, updated);
    harness.reconciler.sync_model(model).await.unwrap();

    let ops = harness.session.ops();
    assert!(
        ops.iter().any(|op| op == "PUT VirtualService cluster--Shared-L7-0"),
        "no PUT in {:?}",
        ops
    );
}

#[tokio::test]
async fn externally_deleted_vsvip_is_recreated() {
    let harness = mk_harness();
    let model = "admin/cluster--Shared-L7-0";
    save_model(&harness, model, mk_parent("cluster--Shared-L7-0"));
    harness.reconciler.sync_model(model).await.unwrap();

    harness.session.vsvip_missing.store(true, Ordering::Relaxed);
    let mut updated = mk_parent("cluster--Shared-L7-0");
    updated.vsvip_refs[0].fqdns.push("bar.com".to_string());
    save_model(&harness, model, updated);
    harness.reconciler.sync_model(model).await.unwrap();

    let ops = harness.session.ops();
    let posts = ops.iter().filter(|op| op.starts_with("POST VsVip")).count();
    assert_eq!(posts, 2, "expected a fresh POST after eviction: {:?}", ops);
}

#[tokio::test]
async fn removed_child_is_deleted_with_backrefs() {
    let harness = mk_harness();
    let model = "admin/cluster--Shared-L7-0";
    let mut parent = mk_parent("cluster--Shared-L7-0");
    parent.children.push(mk_child("cluster--Shared-L7-0", "foo.com"));
    save_model(&harness, model, parent);
    harness.reconciler.sync_model(model).await.unwrap();

    let child_key = TenantName::new("admin", "cluster--foo.com");
    let child_uuid = harness.cache.vs.get(&child_key).unwrap().uuid;

    // The secure host went away: same parent, no children.
    save_model(&harness, model, mk_parent("cluster--Shared-L7-0"));
    harness.reconciler.sync_model(model).await.unwrap();

    let ops = harness.session.ops();
    assert!(
        ops.iter().any(|op| *op == format!("DELETE VirtualService {}", child_uuid)),
        "no child delete in {:?}",
        ops
    );
    assert!(harness.cache.vs.get(&child_key).is_none());
    let parent_row = harness
        .cache
        .vs
        .get(&TenantName::new("admin", "cluster--Shared-L7-0"))
        .unwrap();
    assert!(parent_row.vh_child_uuids.lock().is_empty());
}

#[tokio::test]
async fn empty_graph_deletes_the_parent_tree() {
    let harness = mk_harness();
    let model = "admin/cluster--Shared-L7-0";
    let mut parent = mk_parent("cluster--Shared-L7-0");
    parent.children.push(mk_child("cluster--Shared-L7-0", "foo.com"));
    save_model(&harness, model, parent);
    harness.reconciler.sync_model(model).await.unwrap();

    harness.graphs.delete(model);
    harness.reconciler.sync_model(model).await.unwrap();

    let ops = harness.session.ops();
    let deletes = ops.iter().filter(|op| op.starts_with("DELETE VirtualService")).count();
    assert_eq!(deletes, 2, "expected child and parent deletes: {:?}", ops);
    assert!(harness.cache.vs.get(&TenantName::new("admin", "cluster--Shared-L7-0")).is_none());
}
