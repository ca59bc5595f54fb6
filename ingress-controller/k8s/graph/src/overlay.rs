//! Applies accepted host-rule and http-rule overrides onto built nodes.
//!
//! Only accepted CRDs reach the shared store, so a rejected update leaves the
//! previously accepted override in force and the graph untouched by the bad
//! update.

use crate::{crd_store::SharedCrdLister, names};
use adc_ingress_controller_core::{
    CrdMetadata, CrdState, PkiProfileNode, Settings, VirtualHostModel, LB_CONSISTENT_HASH,
    LB_CONSISTENT_HASH_CUSTOM_HEADER,
};
use adc_ingress_controller_k8s_api::TLS_REENCRYPT;
use tracing::{debug, info, warn};

const DEFAULT_POOL_SSL_PROFILE: &str = "System-Standard";

/// Attaches (or detaches) the host-rule overrides for `host` onto the virtual
/// host. Detachment flips the recorded CRD status to INACTIVE and clears
/// every ref field.
pub fn apply_host_rule(crds: &SharedCrdLister, host: &str, vs: &mut dyn VirtualHostModel) {
    let rule = crds.host_rule_for_fqdn(host);

    let mut ssl_key_cert = String::new();
    let mut ssl_profile = String::new();
    let mut waf_policy = String::new();
    let mut app_profile = String::new();
    let mut analytics_profile = String::new();
    let mut error_page_profile = String::new();
    let mut policy_sets = Vec::new();
    let mut datascripts = Vec::new();
    let mut enabled = None;
    let mut crd_status = CrdMetadata::default();

    match rule {
        Some((ns_name, spec)) => {
            if !spec.tls.ssl_key_certificate.is_empty() {
                ssl_key_cert = names::api_ref("sslkeyandcertificate", &spec.tls.ssl_key_certificate);
                // The reference supersedes any locally built certificate.
                vs.clear_ssl_key_certs();
            }
            if !spec.tls.ssl_profile.is_empty() {
                ssl_profile = names::api_ref("sslprofile", &spec.tls.ssl_profile);
            }
            if !spec.waf_policy.is_empty() {
                waf_policy = names::api_ref("wafpolicy", &spec.waf_policy);
            }
            if !spec.application_profile.is_empty() {
                app_profile = names::api_ref("applicationprofile", &spec.application_profile);
            }
            if !spec.analytics_profile.is_empty() {
                analytics_profile = names::api_ref("analyticsprofile", &spec.analytics_profile);
            }
            if !spec.error_page_profile.is_empty() {
                error_page_profile = names::api_ref("errorpageprofile", &spec.error_page_profile);
            }
            for policy in &spec.http_policy.policy_sets {
                let r = names::api_ref("httppolicyset", policy);
                if !policy_sets.contains(&r) {
                    policy_sets.push(r);
                }
            }
            if spec.http_policy.overwrite {
                vs.clear_http_policies();
            }
            for script in &spec.datascripts {
                let r = names::api_ref("vsdatascriptset", script);
                if !datascripts.contains(&r) {
                    datascripts.push(r);
                }
            }
            enabled = spec.enable_virtual_host;
            crd_status = CrdMetadata {
                kind: "HostRule".to_string(),
                value: ns_name.clone(),
                status: CrdState::Active,
            };
            info!(%host, rule = %ns_name, vs = %vs.name(), "attached host-rule");
        }
        None => {
            debug!(%host, "no host-rule for virtual host");
            let prior = vs.service_metadata().crd_status.clone();
            if !prior.value.is_empty() {
                crd_status = CrdMetadata {
                    status: CrdState::Inactive,
                    ..prior
                };
            }
        }
    }

    vs.set_ssl_key_cert_ref(ssl_key_cert);
    vs.set_ssl_profile_ref(ssl_profile);
    vs.set_waf_policy_ref(waf_policy);
    vs.set_app_profile_ref(app_profile);
    vs.set_analytics_profile_ref(analytics_profile);
    vs.set_error_page_profile_ref(error_page_profile);
    vs.set_http_policy_set_refs(policy_sets);
    vs.set_vs_datascript_refs(datascripts);
    vs.set_enabled(enabled);

    let mut meta = vs.service_metadata().clone();
    meta.crd_status = crd_status;
    vs.set_service_metadata(meta);
}

/// Applies every http-rule covering `host` to the pools the rules' target
/// paths select. Pool selection is by name regex so a rule on `/` reaches all
/// pools of the host.
pub fn apply_http_rules(
    settings: &Settings,
    crds: &SharedCrdLister,
    host: &str,
    ingress: &str,
    vs: &mut dyn VirtualHostModel,
    secure_child: bool,
) {
    let rules = crds.http_rules_for_fqdn(host);
    if rules.is_empty() {
        return;
    }

    for (path, (rule_ns_name, rule_path)) in &rules {
        if !rule_path.tls.kind.is_empty() && rule_path.tls.kind != TLS_REENCRYPT {
            continue;
        }
        let rule_namespace = rule_ns_name.split('/').next().unwrap_or_default();
        let rgx = names::pool_match_regex(settings, ingress, rule_namespace, host, path, secure_child);

        for pool in vs.pools_mut().iter_mut() {
            if !rgx.is_match(&pool.name) {
                continue;
            }
            debug!(pool = %pool.name, target = %path, "applying http-rule to pool");

            if !rule_path.tls.kind.is_empty() {
                pool.sni_enabled = true;
                pool.ssl_profile_ref = if rule_path.tls.ssl_profile.is_empty() {
                    names::api_ref("sslprofile", DEFAULT_POOL_SSL_PROFILE)
                } else {
                    names::api_ref("sslprofile", &rule_path.tls.ssl_profile)
                };
                pool.pki_profile = if rule_path.tls.destination_ca.is_empty() {
                    None
                } else {
                    Some(PkiProfileNode {
                        name: names::pki_profile_name(&pool.name),
                        tenant: settings.tenant.clone(),
                        ca_cert: rule_path.tls.destination_ca.clone(),
                    })
                };
            }

            for hm in &rule_path.health_monitors {
                let r = names::api_ref("healthmonitor", hm);
                if !pool.health_monitors.contains(&r) {
                    pool.health_monitors.push(r);
                }
            }

            let lb = &rule_path.load_balancer_policy;
            pool.lb_algorithm = lb.algorithm.clone();
            if lb.algorithm == LB_CONSISTENT_HASH {
                pool.lb_algorithm_hash = lb.hash.clone();
                if lb.hash == LB_CONSISTENT_HASH_CUSTOM_HEADER {
                    if lb.host_header.is_empty() {
                        warn!(pool = %pool.name, "host header required for consistent-hash-by-header");
                    } else {
                        pool.lb_algorithm_consistent_hash_hdr = lb.host_header.clone();
                    }
                } else if !lb.host_header.is_empty() {
                    warn!(pool = %pool.name, "host header only applies to consistent-hash-by-header");
                }
            }

            pool.service_metadata.crd_status = CrdMetadata {
                kind: "HTTPRule".to_string(),
                value: rule_ns_name.clone(),
                status: CrdState::Active,
            };
            info!(rule = %rule_ns_name, pool = %pool.name, "attached http-rule");
        }
    }
}
