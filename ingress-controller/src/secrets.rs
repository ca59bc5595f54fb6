use adc_ingress_controller_k8s_api::Secret;
use adc_ingress_controller_k8s_graph::{SecretError, SecretLister, TlsCertData};
use kube::{api::Api, Client};

const TLS_CERT_KEY: &str = "tls.crt";
const TLS_KEY_KEY: &str = "tls.key";
const CA_CERT_KEY: &str = "ca.crt";

/// Secret lookup backed by the Kubernetes API.
pub struct KubeSecretLister {
    client: Client,
}

impl KubeSecretLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SecretLister for KubeSecretLister {
    async fn get(&self, namespace: &str, name: &str) -> Result<TlsCertData, SecretError> {
        let api = Api::<Secret>::namespaced(self.client.clone(), namespace);
        let secret = api
            .get_opt(name)
            .await
            .map_err(|e| SecretError::Lookup(e.into()))?
            .ok_or_else(|| SecretError::Missing {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;

        let data = secret.data.unwrap_or_default();
        let cert = data
            .get(TLS_CERT_KEY)
            .map(|b| b.0.clone())
            .ok_or_else(|| SecretError::Malformed {
                namespace: namespace.to_string(),
                name: name.to_string(),
                field: TLS_CERT_KEY,
            })?;
        let key = data
            .get(TLS_KEY_KEY)
            .map(|b| b.0.clone())
            .ok_or_else(|| SecretError::Malformed {
                namespace: namespace.to_string(),
                name: name.to_string(),
                field: TLS_KEY_KEY,
            })?;
        Ok(TlsCertData {
            cert,
            key,
            ca_cert: data.get(CA_CERT_KEY).map(|b| b.0.clone()),
        })
    }
}
