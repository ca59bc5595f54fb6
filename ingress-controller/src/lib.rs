//! ADC Ingress Controller
//!
//! Translates Kubernetes ingress-like resources into a declarative object
//! graph and reconciles that graph against an application-delivery controller
//! over REST. The crates compose as:
//!
//! - `core`: graph node value types and checksums
//! - `k8s-api`: the override CRDs (HostRule, HTTPRule, InfraSetting)
//! - `k8s-graph`: sharding, the graph builder, and the CRD overlay
//! - `rest`: the reconciler, its cache mirror, and the ADC session
//!
//! This crate wires them together and hosts the Kubernetes-backed
//! implementations of the collaborator traits (secret lookup, endpoint
//! snapshots). The informer machinery that feeds events is external; it
//! drives [`GraphBuilder::handle_ingress`] and pushes the returned model
//! names onto the [`ModelQueue`].

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod endpoints;
mod secrets;

pub use self::{
    endpoints::{EndpointState, ServiceEndpoints},
    secrets::KubeSecretLister,
};
pub use adc_ingress_controller_core::{
    NoopStatusSink, ObjectGraph, Settings, ShardSize, StatusSink,
};
pub use adc_ingress_controller_k8s_graph::{
    CrdValidator, GraphBuilder, SharedCrdLister, SharedGraphLister, SharedHostNameLister,
    SharedIngressHostsLister,
};
pub use adc_ingress_controller_rest::{
    AdcCache, AdcRestClient, Controller, ModelQueue, RestReconciler,
};

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;

/// Everything a running controller needs, assembled once at startup.
pub struct System {
    pub settings: Arc<Settings>,
    pub graphs: SharedGraphLister,
    pub crds: SharedCrdLister,
    pub builder: Arc<GraphBuilder>,
    pub validator: Arc<CrdValidator>,
    pub reconciler: Arc<RestReconciler>,
    pub queue: ModelQueue,
}

impl System {
    pub fn new(
        settings: Arc<Settings>,
        session: Arc<AdcRestClient>,
        secrets: Arc<KubeSecretLister>,
        endpoints: EndpointState,
        status: Arc<dyn StatusSink>,
    ) -> (Self, UnboundedReceiver<String>) {
        let graphs = SharedGraphLister::default();
        let crds = SharedCrdLister::default();
        let host_names = SharedHostNameLister::default();
        let ingress_hosts = SharedIngressHostsLister::default();
        let cache = Arc::new(AdcCache::default());

        let builder = Arc::new(GraphBuilder::new(
            settings.clone(),
            graphs.clone(),
            host_names,
            crds.clone(),
            ingress_hosts,
            Arc::new(endpoints),
            secrets,
        ));
        let validator = Arc::new(CrdValidator::new(
            settings.clone(),
            crds.clone(),
            session.clone(),
            status.clone(),
        ));
        let reconciler = Arc::new(RestReconciler::new(
            settings.clone(),
            graphs.clone(),
            cache,
            session,
            status,
        ));
        let (queue, updates) = ModelQueue::new();

        (
            Self {
                settings,
                graphs,
                crds,
                builder,
                validator,
                reconciler,
                queue,
            },
            updates,
        )
    }
}
