//! Builds per-shard object graphs from parsed ingress-like resources.
//!
//! Each external FQDN is hashed onto one of a fixed set of shared parent
//! virtual services; the builder mutates the corresponding graph under its
//! lock and reports the set of changed model names so the REST layer can
//! reconcile them. The flow for one resource event:
//!
//! ```ignore
//! [ ParsedIngress ] -> insecure hosts -> [ shard graph ] -> changed models
//!                   -> secure hosts   ->      ...
//!                   -> stale deletion ->      ...
//! ```
//!
//! Secret fetches happen before any graph lock is taken; nothing suspends
//! while a lock is held.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod builder;
mod crd_store;
mod endpoints;
mod hostname;
mod ingress;
pub mod names;
mod overlay;
mod secrets;
mod shard;
mod stored;
#[cfg(test)]
mod tests;
mod validation;

pub use self::{
    builder::GraphBuilder,
    crd_store::SharedCrdLister,
    endpoints::EndpointLister,
    hostname::{HostNamePathSecret, SharedHostNameLister},
    ingress::{
        IngressKind, IngressLike, ParsedIngress, PathService, PathType, TlsSettings,
        HOSTRULE_SECRET_PREFIX, ROUTE_SECRET_PREFIX,
    },
    secrets::{SecretError, SecretLister, TlsCertData},
    shard::{shard_vs_name, ShardError},
    stored::{HostPolicy, HostState, PathSvcMap, SharedIngressHostsLister, StoredHosts},
    validation::{AdcObjectSummary, AdcRefChecker, CrdValidator, ValidationError},
};

use adc_ingress_controller_core::ObjectGraph;
use ahash::AHashMap as HashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// Process-wide model-name → graph map. Every graph is wrapped in its own
/// mutex; builder entry points and reconciler snapshots both go through it.
#[derive(Clone, Default)]
pub struct SharedGraphLister {
    graphs: Arc<RwLock<HashMap<String, Arc<Mutex<ObjectGraph>>>>>,
}

impl SharedGraphLister {
    pub fn get(&self, model: &str) -> Option<Arc<Mutex<ObjectGraph>>> {
        self.graphs.read().get(model).cloned()
    }

    pub fn get_or_create(&self, model: &str) -> Arc<Mutex<ObjectGraph>> {
        if let Some(graph) = self.graphs.read().get(model) {
            return graph.clone();
        }
        self.graphs
            .write()
            .entry(model.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ObjectGraph::new(model))))
            .clone()
    }

    pub fn delete(&self, model: &str) {
        self.graphs.write().remove(model);
    }

    pub fn models(&self) -> Vec<String> {
        self.graphs.read().keys().cloned().collect()
    }
}
