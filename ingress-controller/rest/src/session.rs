use crate::AdcError;
use serde_json::Value;

/// The REST surface of the ADC that the reconciler consumes. `create` is
/// POST-via-macro: the ADC creates the root object and its owned sub-objects
/// in a single call. Implementations return the created/updated object's JSON
/// body so the caller can harvest `uuid`, `cloud_config_cksum` and the
/// back-reference fields.
#[async_trait::async_trait]
pub trait AdcSession: Send + Sync {
    async fn create(&self, tenant: &str, kind: &str, obj: Value) -> Result<Value, AdcError>;

    async fn update(
        &self,
        tenant: &str,
        kind: &str,
        uuid: &str,
        obj: Value,
    ) -> Result<Value, AdcError>;

    async fn delete(&self, tenant: &str, kind: &str, uuid: &str) -> Result<(), AdcError>;

    async fn get(&self, tenant: &str, kind: &str, uuid: &str) -> Result<Value, AdcError>;

    /// GET `/api/<kind>?<query>`, returning the `results` array.
    async fn list(&self, tenant: &str, kind: &str, query: &str) -> Result<Vec<Value>, AdcError>;
}
