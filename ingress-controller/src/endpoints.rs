use adc_ingress_controller_core::{PoolServer, ServiceType};
use adc_ingress_controller_k8s_graph::EndpointLister;
use ahash::AHashMap as HashMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Backend servers resolved for one service, per resolution mode and port
/// name. The external watch machinery keeps this current; the builder reads
/// snapshots synchronously.
#[derive(Clone, Debug, Default)]
pub struct ServiceEndpoints {
    pub cluster_ip: HashMap<String, Vec<PoolServer>>,
    pub node_port: HashMap<String, Vec<PoolServer>>,
    pub node_port_local: HashMap<String, Vec<PoolServer>>,
}

#[derive(Clone, Default)]
pub struct EndpointState {
    inner: Arc<RwLock<HashMap<(String, String), ServiceEndpoints>>>,
}

impl EndpointState {
    pub fn apply(&self, namespace: &str, service: &str, endpoints: ServiceEndpoints) {
        self.inner
            .write()
            .insert((namespace.to_string(), service.to_string()), endpoints);
    }

    pub fn delete(&self, namespace: &str, service: &str) {
        self.inner
            .write()
            .remove(&(namespace.to_string(), service.to_string()));
    }
}

impl EndpointLister for EndpointState {
    fn servers(
        &self,
        namespace: &str,
        service: &str,
        port_name: &str,
        mode: ServiceType,
    ) -> Vec<PoolServer> {
        let inner = self.inner.read();
        let Some(eps) = inner.get(&(namespace.to_string(), service.to_string())) else {
            return Vec::new();
        };
        let by_port = match mode {
            ServiceType::ClusterIp => &eps.cluster_ip,
            ServiceType::NodePort => &eps.node_port,
            ServiceType::NodePortLocal => &eps.node_port_local,
        };
        by_port.get(port_name).cloned().unwrap_or_default()
    }
}
