use adc_ingress_controller_core::{PoolServer, ServiceType};

/// Read side of the endpoint state maintained by the upstream watch
/// machinery. Lookups are synchronous snapshot reads; nothing here suspends,
/// so the builder may call it while holding a graph lock.
pub trait EndpointLister: Send + Sync {
    /// Resolves the backend servers of a service port under the configured
    /// resolution mode: endpoint IPs for `ClusterIp`, node addresses plus the
    /// allocated node port for `NodePort`, and per-pod node-local bindings
    /// for `NodePortLocal`.
    fn servers(
        &self,
        namespace: &str,
        service: &str,
        port_name: &str,
        mode: ServiceType,
    ) -> Vec<PoolServer>;
}
