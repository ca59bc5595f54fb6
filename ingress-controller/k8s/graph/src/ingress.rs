use crate::stored::PathSvcMap;
use ahash::AHashMap as HashMap;

/// Synthetic secret-name prefix for Route objects that embed key/cert values
/// inline instead of referencing a Secret.
pub const ROUTE_SECRET_PREFIX: &str = "route-secret-";

/// Synthetic secret-name prefix marking hosts whose certificate is supplied
/// as a host-rule reference; no local certificate is built for them.
pub const HOSTRULE_SECRET_PREFIX: &str = "hostrule-secret-";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IngressKind {
    Ingress,
    Route,
}

/// The parsed view of an ingress-like resource. Rule parsing happens
/// upstream; the builder only consumes this shape.
pub trait IngressLike: Send + Sync {
    fn name(&self) -> &str;
    fn namespace(&self) -> &str;
    fn kind(&self) -> IngressKind;

    /// Returns the stored paths (with their services) that the incoming state
    /// no longer carries and which therefore must be torn down.
    fn diff_path_svc(&self, stored: &PathSvcMap, incoming: &PathSvcMap) -> PathSvcMap {
        stored
            .iter()
            .filter(|(path, services)| match incoming.get(*path) {
                None => true,
                Some(new_services) => services.iter().any(|s| !new_services.contains(s)),
            })
            .map(|(path, services)| (path.clone(), services.clone()))
            .collect()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PathType {
    Exact,
    Prefix,
    ImplementationSpecific,
}

/// One (path, backend) entry of a host rule, with the relative weight used
/// for alternate backends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathService {
    pub path: String,
    pub path_type: PathType,
    pub service_name: String,
    pub port_name: String,
    pub weight: u32,
}

impl PathService {
    pub fn new(path: &str, service: &str) -> Self {
        Self {
            path: path.to_string(),
            path_type: PathType::Prefix,
            service_name: service.to_string(),
            port_name: String::new(),
            weight: 100,
        }
    }
}

/// One TLS stanza of the resource: a secret applied to a set of hosts.
#[derive(Clone, Debug, Default)]
pub struct TlsSettings {
    pub secret_name: String,
    /// Defaults to the resource namespace when unset.
    pub secret_namespace: Option<String>,
    pub hosts: HashMap<String, Vec<PathService>>,
    pub redirect: bool,
    /// Inline material for Route-style resources.
    pub cert: Option<String>,
    pub key: Option<String>,
    pub ca_cert: Option<String>,
}

/// The fully parsed resource: insecure hosts, edge-terminated TLS stanzas and
/// passthrough hosts.
#[derive(Clone, Debug, Default)]
pub struct ParsedIngress {
    pub host_map: HashMap<String, Vec<PathService>>,
    pub tls: Vec<TlsSettings>,
    pub passthrough: HashMap<String, Vec<PathService>>,
}

pub(crate) fn to_path_svc_map(paths: &[PathService]) -> PathSvcMap {
    let mut map = PathSvcMap::default();
    for p in paths {
        map.entry(p.path.clone())
            .or_default()
            .push(p.service_name.clone());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub;
    impl IngressLike for Stub {
        fn name(&self) -> &str {
            "ing"
        }
        fn namespace(&self) -> &str {
            "default"
        }
        fn kind(&self) -> IngressKind {
            IngressKind::Ingress
        }
    }

    #[test]
    fn diff_reports_removed_paths_and_services() {
        let stub = Stub;
        let mut stored = PathSvcMap::default();
        stored.insert("/foo".to_string(), vec!["svc1".to_string()]);
        stored.insert("/bar".to_string(), vec!["svc2".to_string()]);

        let mut incoming = PathSvcMap::default();
        incoming.insert("/foo".to_string(), vec!["svc1".to_string()]);

        let diff = stub.diff_path_svc(&stored, &incoming);
        assert_eq!(diff.len(), 1);
        assert!(diff.contains_key("/bar"));

        // A service swap on a surviving path is also a removal.
        incoming.insert("/foo".to_string(), vec!["svc3".to_string()]);
        let diff = stub.diff_path_svc(&stored, &incoming);
        assert!(diff.contains_key("/foo"));
    }
}
