use crate::ServiceMetadata;

/// Collaborator interface for status writers. The core reports transitions
/// through this trait; the actual sub-resource writers live outside the core
/// and may queue the updates however they like. Implementations must be cheap
/// and non-blocking.
pub trait StatusSink: Send + Sync {
    /// The parent VS serving `meta`'s ingresses acquired a VIP.
    fn ingress_vip(&self, meta: &ServiceMetadata, vip: &str);

    /// A child VS backing `meta`'s ingresses was deleted from the ADC.
    fn ingress_deleted(&self, meta: &ServiceMetadata);

    /// An L4 service object acquired a VIP.
    fn l4_vip(&self, meta: &ServiceMetadata, vip: &str);

    fn l4_deleted(&self, meta: &ServiceMetadata);

    /// Validation verdict for a CRD, `status` being `Accepted` or `Rejected`.
    fn crd_status(&self, kind: &str, namespace_name: &str, status: &str, error: &str);
}

/// Discards every update; used in tests and when no status writer is wired.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopStatusSink;

impl StatusSink for NoopStatusSink {
    fn ingress_vip(&self, _: &ServiceMetadata, _: &str) {}
    fn ingress_deleted(&self, _: &ServiceMetadata) {}
    fn l4_vip(&self, _: &ServiceMetadata, _: &str) {}
    fn l4_deleted(&self, _: &ServiceMetadata) {}
    fn crd_status(&self, _: &str, _: &str, _: &str, _: &str) {}
}
