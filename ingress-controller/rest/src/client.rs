use crate::{AdcError, AdcSession};
use adc_ingress_controller_k8s_graph::{AdcObjectSummary, AdcRefChecker};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest-backed ADC session. Authentication is HTTP basic; the tenant
/// travels as the `X-Avi-Tenant` header on every call.
pub struct AdcRestClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    /// Cluster labels applied to unlabeled SE groups on acceptance.
    labels: BTreeMap<String, String>,
}

impl AdcRestClient {
    /// Builds the client and verifies connectivity with an initial version
    /// probe. Initial connectivity failure is the only fatal error in the
    /// system.
    pub async fn connect(
        base_url: &str,
        username: &str,
        password: &str,
        insecure_skip_verify: bool,
        labels: BTreeMap<String, String>,
    ) -> Result<Self, AdcError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(insecure_skip_verify)
            .build()?;
        let client = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            labels,
        };
        client.list("admin", "cloud", "fields=name").await?;
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, tenant: &str, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .basic_auth(&self.username, Some(&self.password))
            .header("X-Avi-Tenant", tenant)
    }

    async fn parse(&self, kind: &str, resp: reqwest::Response) -> Result<Value, AdcError> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AdcError::NotFound);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, %kind, %body, "ADC call failed");
            return Err(AdcError::Transient(status.as_u16()));
        }
        let body: Value = resp.json().await?;
        Ok(unwrap_macro_response(kind, body))
    }
}

/// A macro POST answers with a map of model-name → created objects; a plain
/// PUT answers with the object itself. Normalize both to the single object
/// of interest.
fn unwrap_macro_response(kind: &str, body: Value) -> Value {
    if body.get("uuid").is_some() {
        return body;
    }
    for key in [kind, &kind.to_ascii_lowercase()] {
        if let Some(arr) = body.get(key).and_then(Value::as_array) {
            if let Some(first) = arr.first() {
                return first.clone();
            }
        }
    }
    body
}

#[async_trait::async_trait]
impl AdcSession for AdcRestClient {
    async fn create(&self, tenant: &str, kind: &str, obj: Value) -> Result<Value, AdcError> {
        debug!(%kind, "POST /api/macro");
        let macro_body = json!({ "model_name": kind, "data": obj });
        let resp = self
            .request(reqwest::Method::POST, tenant, "/api/macro")
            .json(&macro_body)
            .send()
            .await?;
        self.parse(kind, resp).await
    }

    async fn update(
        &self,
        tenant: &str,
        kind: &str,
        uuid: &str,
        obj: Value,
    ) -> Result<Value, AdcError> {
        let path = format!("/api/{}/{}", kind.to_ascii_lowercase(), uuid);
        debug!(%kind, %uuid, "PUT {}", path);
        let resp = self
            .request(reqwest::Method::PUT, tenant, &path)
            .json(&obj)
            .send()
            .await?;
        self.parse(kind, resp).await
    }

    async fn delete(&self, tenant: &str, kind: &str, uuid: &str) -> Result<(), AdcError> {
        let path = format!("/api/{}/{}", kind.to_ascii_lowercase(), uuid);
        debug!(%kind, %uuid, "DELETE {}", path);
        let resp = self
            .request(reqwest::Method::DELETE, tenant, &path)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AdcError::NotFound);
        }
        if !status.is_success() {
            return Err(AdcError::Transient(status.as_u16()));
        }
        Ok(())
    }

    async fn get(&self, tenant: &str, kind: &str, uuid: &str) -> Result<Value, AdcError> {
        let path = format!("/api/{}/{}", kind.to_ascii_lowercase(), uuid);
        let resp = self.request(reqwest::Method::GET, tenant, &path).send().await?;
        let lowered = kind.to_ascii_lowercase();
        match self.parse(kind, resp).await {
            // The ADC reports a dangling VSVIP with a plain 404 on its uuid;
            // surface that as the typed stale-cache signal.
            Err(AdcError::NotFound) if lowered == "vsvip" => Err(AdcError::VsVipNotFound),
            other => other,
        }
    }

    async fn list(&self, tenant: &str, kind: &str, query: &str) -> Result<Vec<Value>, AdcError> {
        let path = if query.is_empty() {
            format!("/api/{}", kind.to_ascii_lowercase())
        } else {
            format!("/api/{}?{}", kind.to_ascii_lowercase(), query)
        };
        let resp = self.request(reqwest::Method::GET, tenant, &path).send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AdcError::NotFound);
        }
        if !status.is_success() {
            return Err(AdcError::Transient(status.as_u16()));
        }
        let body: Value = resp.json().await?;
        Ok(body
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl AdcRefChecker for AdcRestClient {
    async fn lookup(
        &self,
        kind: &str,
        name: &str,
    ) -> Result<Option<AdcObjectSummary>, anyhow::Error> {
        let query = format!("name={}&fields=name,type,labels,created_by", name);
        let results = self.list("admin", kind, &query).await?;
        let Some(obj) = results.first() else {
            return Ok(None);
        };
        let labels = obj
            .get("labels")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|l| {
                        Some((
                            l.get("key")?.as_str()?.to_string(),
                            l.get("value")?.as_str()?.to_string(),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(AdcObjectSummary {
            name: obj
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(name)
                .to_string(),
            obj_type: obj.get("type").and_then(Value::as_str).map(str::to_string),
            labels,
            created_by: obj
                .get("created_by")
                .and_then(Value::as_str)
                .map(str::to_string),
        }))
    }

    async fn ensure_se_group_labels(&self, name: &str) -> Result<(), anyhow::Error> {
        let results = self
            .list("admin", "serviceenginegroup", &format!("name={}", name))
            .await?;
        let Some(obj) = results.first() else {
            anyhow::bail!("serviceenginegroup {} not found", name);
        };
        let already_labeled = obj
            .get("labels")
            .and_then(Value::as_array)
            .map(|l| !l.is_empty())
            .unwrap_or(false);
        if already_labeled || self.labels.is_empty() {
            return Ok(());
        }
        let uuid = obj
            .get("uuid")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow::anyhow!("serviceenginegroup {} has no uuid", name))?;
        let mut labeled = obj.clone();
        labeled["labels"] = Value::Array(
            self.labels
                .iter()
                .map(|(k, v)| json!({ "key": k, "value": v }))
                .collect(),
        );
        self.update("admin", "serviceenginegroup", uuid, labeled)
            .await?;
        Ok(())
    }
}
