use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdcError {
    /// 404 on a PUT/GET; the reconciler demotes the operation to a create.
    #[error("object not found on the ADC")]
    NotFound,

    /// The ADC reports the VSVIP referenced by a VS no longer exists; the
    /// cache row is stale and must be evicted.
    #[error("vsvip object not found on the ADC")]
    VsVipNotFound,

    /// Any non-404 HTTP error; retried by requeuing the model.
    #[error("ADC returned status {0}")]
    Transient(u16),

    /// A response is missing a field the cache requires; the operation is
    /// logged and skipped.
    #[error("ADC response missing field {0}")]
    ResponseMalformed(&'static str),

    #[error("operation canceled")]
    Canceled,

    #[error("ADC request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl AdcError {
    pub fn is_transient(&self) -> bool {
        matches!(self, AdcError::Transient(_) | AdcError::Http(_))
    }
}
