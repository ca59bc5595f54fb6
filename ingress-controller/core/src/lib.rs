//! Value types for the ADC object graph.
//!
//! The controller translates ingress-like resources into a tree of
//! virtual-service, pool-group, pool, TLS-certificate and HTTP-policy nodes
//! that an external application-delivery controller understands. Everything in
//! this crate is a plain value: nodes carry no locks and no references to the
//! Kubernetes API. Each node computes a stable checksum over its semantic
//! fields so that the builder can replace only the nodes whose content
//! actually changed, and the reconciler can compare local state against the
//! `cloud_config_cksum` echoed back by the ADC.
//!
//! ```ignore
//! [ ObjectGraph ] -> [ parent VsNode ] -> [ VsVipNode ]
//!                                      -> [ child VsNode ] -> [ PoolNode ]
//!                                                          -> [ PoolGroupNode ]
//!                                                          -> [ TlsKeyCertNode ]
//!                                                          -> [ HttpPolicySetNode ]
//! ```

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod checksum;
mod graph;
mod metadata;
mod node;
mod settings;
mod status;
mod vs;

pub use self::{
    graph::ObjectGraph,
    metadata::{CrdMetadata, CrdState, ServiceMetadata},
    status::{NoopStatusSink, StatusSink},
    node::{
        CertKind, DataScriptNode, HostPathPoolGroup, HttpPolicySetNode, PathMatch, PkiProfileNode,
        PoolGroupMember, PoolGroupNode, PoolNode, PoolServer, PortProtocol, Protocol, RedirectPort,
        TlsKeyCertNode, VsVipNode, LB_CONSISTENT_HASH, LB_CONSISTENT_HASH_CUSTOM_HEADER,
        REDIRECT_STATUS_CODE,
    },
    settings::{Layout, ServiceType, Settings, ShardSize},
    vs::{
        VirtualHostModel, VsNode, DEFAULT_L7_SECURE_APP_PROFILE, DEFAULT_TCP_NETWORK_PROFILE,
    },
};

/// A tenant-scoped object name, the key shape used by the reconciler's cache
/// tables and by the model queue.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TenantName {
    pub tenant: String,
    pub name: String,
}

impl TenantName {
    pub fn new(tenant: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for TenantName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.tenant, self.name)
    }
}
