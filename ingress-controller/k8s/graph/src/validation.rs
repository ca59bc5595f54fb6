//! Validates CRD overrides against the ADC before acceptance.
//!
//! Every remote ref named by a CRD is looked up on the ADC; a rule with any
//! unresolvable or unusable ref is rejected and never reaches the shared CRD
//! store, so the builder keeps applying the last accepted state.

use crate::crd_store::SharedCrdLister;
use adc_ingress_controller_core::{Settings, StatusSink};
use adc_ingress_controller_k8s_api::{
    HostRuleSpec, HttpRuleSpec, InfraSettingSpec, STATUS_ACCEPTED, STATUS_REJECTED,
};
use std::{collections::BTreeMap, sync::Arc};
use thiserror::Error;
use tracing::{info, warn};

const ALLOWED_APPLICATION_PROFILE_TYPE: &str = "APPLICATION_PROFILE_TYPE_HTTP";

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{kind} \"{name}\" not found on controller")]
    RefNotFound { kind: String, name: String },
    #[error("duplicate fqdn {fqdn} found in {owner}")]
    DuplicateFqdn { fqdn: String, owner: String },
    #[error("{kind} \"{name}\" is created by this controller instance")]
    SelfOwnedRef { kind: String, name: String },
    #[error("applicationprofile \"{name}\" must be of type {expected}")]
    WrongProfileType { name: String, expected: &'static str },
    #[error("serviceenginegroup \"{name}\" has mismatched labels")]
    LabelMismatch { name: String },
    #[error("ref lookup failed: {0}")]
    Lookup(anyhow::Error),
}

/// The fields the ADC returns for `?fields=name,type,labels,created_by`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AdcObjectSummary {
    pub name: String,
    pub obj_type: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub created_by: Option<String>,
}

/// Ref-check surface of the ADC session. Implemented by the REST layer's
/// client; stubbed in tests.
#[async_trait::async_trait]
pub trait AdcRefChecker: Send + Sync {
    async fn lookup(&self, kind: &str, name: &str)
        -> Result<Option<AdcObjectSummary>, anyhow::Error>;

    /// Labels the SE group with the cluster labels if it carries none yet.
    async fn ensure_se_group_labels(&self, name: &str) -> Result<(), anyhow::Error>;
}

/// Validates CRDs, updates the shared CRD store on acceptance, and reports
/// the verdict through the status sink.
pub struct CrdValidator {
    settings: Arc<Settings>,
    crds: SharedCrdLister,
    checker: Arc<dyn AdcRefChecker>,
    status: Arc<dyn StatusSink>,
}

impl CrdValidator {
    pub fn new(
        settings: Arc<Settings>,
        crds: SharedCrdLister,
        checker: Arc<dyn AdcRefChecker>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            settings,
            crds,
            checker,
            status,
        }
    }

    pub async fn validate_host_rule(
        &self,
        namespace: &str,
        name: &str,
        spec: &HostRuleSpec,
    ) -> Result<(), ValidationError> {
        let ns_name = format!("{}/{}", namespace, name);
        let vh = &spec.virtual_host;

        if let Some(owner) = self.crds.fqdn_claimed_by(&vh.fqdn) {
            if owner != ns_name {
                let err = ValidationError::DuplicateFqdn {
                    fqdn: vh.fqdn.clone(),
                    owner,
                };
                return self.reject("HostRule", &ns_name, err);
            }
        }

        let mut refs: Vec<(&str, &str)> = vec![
            ("wafpolicy", vh.waf_policy.as_str()),
            ("applicationprofile", vh.application_profile.as_str()),
            ("sslkeyandcertificate", vh.tls.ssl_key_certificate.as_str()),
            ("sslprofile", vh.tls.ssl_profile.as_str()),
            ("analyticsprofile", vh.analytics_profile.as_str()),
            ("errorpageprofile", vh.error_page_profile.as_str()),
        ];
        for policy in &vh.http_policy.policy_sets {
            refs.push(("httppolicyset", policy));
        }
        for script in &vh.datascripts {
            refs.push(("vsdatascriptset", script));
        }

        if let Err(err) = self.check_refs(&refs).await {
            return self.reject("HostRule", &ns_name, err);
        }

        self.crds.save_host_rule(&ns_name, vh.clone());
        self.status
            .crd_status("HostRule", &ns_name, STATUS_ACCEPTED, "");
        info!(rule = %ns_name, fqdn = %vh.fqdn, "accepted host-rule");
        Ok(())
    }

    pub fn delete_host_rule(&self, namespace: &str, name: &str) {
        self.crds.delete_host_rule(&format!("{}/{}", namespace, name));
    }

    pub async fn validate_http_rule(
        &self,
        namespace: &str,
        name: &str,
        spec: &HttpRuleSpec,
    ) -> Result<(), ValidationError> {
        let ns_name = format!("{}/{}", namespace, name);

        let mut refs: Vec<(&str, &str)> = Vec::new();
        for path in &spec.paths {
            refs.push(("sslprofile", path.tls.ssl_profile.as_str()));
            for hm in &path.health_monitors {
                refs.push(("healthmonitor", hm));
            }
        }

        if let Err(err) = self.check_refs(&refs).await {
            return self.reject("HTTPRule", &ns_name, err);
        }

        self.crds
            .save_http_rule(&ns_name, &spec.fqdn, spec.paths.clone());
        self.status
            .crd_status("HTTPRule", &ns_name, STATUS_ACCEPTED, "");
        info!(rule = %ns_name, fqdn = %spec.fqdn, "accepted http-rule");
        Ok(())
    }

    pub fn delete_http_rule(&self, namespace: &str, name: &str) {
        self.crds.delete_http_rule(&format!("{}/{}", namespace, name));
    }

    pub async fn validate_infra_setting(
        &self,
        name: &str,
        spec: &InfraSettingSpec,
    ) -> Result<(), ValidationError> {
        let mut refs: Vec<(&str, &str)> = vec![("network", spec.network.name.as_str())];
        if !spec.se_group.name.is_empty() {
            refs.push(("serviceenginegroup", spec.se_group.name.as_str()));
        }

        if let Err(err) = self.check_refs(&refs).await {
            return self.reject("InfraSetting", name, err);
        }

        if !spec.se_group.name.is_empty() {
            if let Err(error) = self.checker.ensure_se_group_labels(&spec.se_group.name).await {
                warn!(%error, se_group = %spec.se_group.name, "failed to label SE group");
            }
        }

        self.status
            .crd_status("InfraSetting", name, STATUS_ACCEPTED, "");
        Ok(())
    }

    async fn check_refs(&self, refs: &[(&str, &str)]) -> Result<(), ValidationError> {
        for (kind, name) in refs {
            if name.is_empty() {
                continue;
            }
            self.check_ref(kind, name).await?;
        }
        Ok(())
    }

    async fn check_ref(&self, kind: &str, name: &str) -> Result<(), ValidationError> {
        let summary = self
            .checker
            .lookup(kind, name)
            .await
            .map_err(ValidationError::Lookup)?
            .ok_or_else(|| ValidationError::RefNotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            })?;

        if kind == "applicationprofile" {
            if let Some(ty) = &summary.obj_type {
                if ty != ALLOWED_APPLICATION_PROFILE_TYPE {
                    return Err(ValidationError::WrongProfileType {
                        name: name.to_string(),
                        expected: ALLOWED_APPLICATION_PROFILE_TYPE,
                    });
                }
            }
        }

        if kind == "serviceenginegroup" && !summary.labels.is_empty() {
            if summary.labels != self.settings.cluster_labels {
                return Err(ValidationError::LabelMismatch {
                    name: name.to_string(),
                });
            }
        }

        if summary.created_by.as_deref() == Some(self.settings.controller_identity.as_str()) {
            return Err(ValidationError::SelfOwnedRef {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }

        Ok(())
    }

    fn reject(
        &self,
        kind: &str,
        ns_name: &str,
        err: ValidationError,
    ) -> Result<(), ValidationError> {
        warn!(rule = %ns_name, error = %err, "rejecting {}", kind);
        self.status
            .crd_status(kind, ns_name, STATUS_REJECTED, &err.to_string());
        Err(err)
    }
}
