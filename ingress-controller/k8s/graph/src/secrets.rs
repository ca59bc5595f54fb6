use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret {namespace}/{name} not found")]
    Missing { namespace: String, name: String },
    /// The secret exists but lacks `tls.crt` or `tls.key`.
    #[error("secret {namespace}/{name} is missing {field}")]
    Malformed {
        namespace: String,
        name: String,
        field: &'static str,
    },
    #[error("secret lookup failed: {0}")]
    Lookup(anyhow::Error),
}

/// TLS material resolved for one secure host, fetched before any graph lock
/// is taken.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsCertData {
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
    pub ca_cert: Option<Vec<u8>>,
}

/// Kubernetes secret lookup, the only suspension point on the secure build
/// path.
#[async_trait::async_trait]
pub trait SecretLister: Send + Sync {
    async fn get(&self, namespace: &str, name: &str) -> Result<TlsCertData, SecretError>;
}
