//! Renders graph nodes into the ADC's JSON payload shapes.
//!
//! Every object carries `tenant_ref`, `cloud_ref` and (where applicable)
//! `vrf_context_ref` in the documented `/api/<kind>?name=<n>` string form.
//! Checksums travel as decimal strings in `cloud_config_cksum`.

use adc_ingress_controller_core::{
    CertKind, DataScriptNode, HttpPolicySetNode, PkiProfileNode, PoolGroupNode, PoolNode,
    Settings, TlsKeyCertNode, VsNode, VsVipNode,
};
use serde_json::{json, Value};

const VS_TYPE_VH_PARENT: &str = "VS_TYPE_VH_PARENT";
const VS_TYPE_VH_CHILD: &str = "VS_TYPE_VH_CHILD";

/// HTTP-policy indices on a VS start at this offset.
const HTTP_POLICY_BASE_INDEX: i64 = 11;

fn api_ref(kind: &str, name: &str) -> String {
    format!("/api/{}?name={}", kind, name)
}

fn common_refs(settings: &Settings, obj: &mut Value) {
    obj["cloud_ref"] = Value::String(api_ref("cloud", &settings.cloud_name));
    obj["tenant_ref"] = Value::String(api_ref("tenant", &settings.tenant));
}

pub fn vs_payload(settings: &Settings, vs: &VsNode) -> Value {
    let mut obj = json!({
        "name": vs.name,
        "cloud_config_cksum": vs.cloud_config_cksum.to_string(),
        "created_by": settings.controller_identity,
        "vrf_context_ref": api_ref("vrfcontext", &vs.vrf_context),
        "service_metadata": vs.service_metadata.to_json(),
    });
    common_refs(settings, &mut obj);

    if vs.is_child() {
        obj["type"] = VS_TYPE_VH_CHILD.into();
        obj["vh_parent_vs_ref"] = api_ref("virtualservice", &vs.vh_parent_name).into();
        obj["vh_domain_name"] = json!(vs.vh_domain_names);
        obj["east_west_placement"] = false.into();
        obj["application_profile_ref"] = app_profile_ref(vs).into();
        obj["network_profile_ref"] = api_ref("networkprofile", network_profile(vs)).into();
        obj["ign_pool_net_reach"] = true.into();
    } else {
        obj["application_profile_ref"] = app_profile_ref(vs).into();
        obj["network_profile_ref"] = api_ref("networkprofile", network_profile(vs)).into();
        if let Some(vip) = vs.vsvip_refs.first() {
            obj["vsvip_ref"] = api_ref("vsvip", &vip.name).into();
        }
        if vs.shared_vs {
            obj["type"] = VS_TYPE_VH_PARENT.into();
        }
        obj["services"] = Value::Array(
            vs.port_proto
                .iter()
                .map(|pp| json!({ "port": pp.port, "enable_ssl": pp.enable_ssl }))
                .collect(),
        );
        if let Some(rhi) = vs.enable_rhi {
            obj["enable_rhi"] = rhi.into();
        }
        if !vs.http_ds_refs.is_empty() {
            obj["vs_datascripts"] = Value::Array(
                vs.http_ds_refs
                    .iter()
                    .enumerate()
                    .map(|(i, ds)| {
                        json!({
                            "index": i as i64,
                            "vs_datascript_set_ref": api_ref("vsdatascriptset", &ds.name),
                        })
                    })
                    .collect(),
            );
        }
    }

    if !vs.service_engine_group.is_empty() {
        obj["se_group_ref"] = api_ref("serviceenginegroup", &vs.service_engine_group).into();
    }
    if let Some(enabled) = vs.enabled {
        obj["enabled"] = enabled.into();
    }

    // Locally built certificates, unless a host-rule ref supersedes them.
    if !vs.ssl_key_cert_ref.is_empty() {
        obj["ssl_key_and_certificate_refs"] = json!([vs.ssl_key_cert_ref]);
    } else if !vs.ssl_key_cert_refs.is_empty() {
        obj["ssl_key_and_certificate_refs"] = Value::Array(
            vs.ssl_key_cert_refs
                .iter()
                .map(|c| api_ref("sslkeyandcertificate", &c.name).into())
                .collect(),
        );
    }
    if !vs.ssl_profile_ref.is_empty() {
        obj["ssl_profile_ref"] = vs.ssl_profile_ref.clone().into();
    }
    if !vs.waf_policy_ref.is_empty() {
        obj["waf_policy_ref"] = vs.waf_policy_ref.clone().into();
    }
    if !vs.analytics_profile_ref.is_empty() {
        obj["analytics_profile_ref"] = vs.analytics_profile_ref.clone().into();
    }
    if !vs.error_page_profile_ref.is_empty() {
        obj["error_page_profile_ref"] = vs.error_page_profile_ref.clone().into();
    }

    let mut policies: Vec<Value> = vs
        .http_policy_refs
        .iter()
        .enumerate()
        .map(|(i, p)| {
            json!({
                "index": HTTP_POLICY_BASE_INDEX + i as i64,
                "http_policy_set_ref": api_ref("httppolicyset", &p.name),
            })
        })
        .collect();
    for (i, r) in vs.http_policy_set_refs.iter().enumerate() {
        policies.push(json!({
            "index": HTTP_POLICY_BASE_INDEX + (vs.http_policy_refs.len() + i) as i64,
            "http_policy_set_ref": r,
        }));
    }
    if !policies.is_empty() {
        obj["http_policies"] = Value::Array(policies);
    }

    obj
}

/// A host-rule application-profile ref wins over the locally configured
/// profile; children fall back to the shared secure-HTTP profile.
fn app_profile_ref(vs: &VsNode) -> String {
    if !vs.app_profile_ref.is_empty() {
        return vs.app_profile_ref.clone();
    }
    let profile = if vs.application_profile.is_empty() {
        adc_ingress_controller_core::DEFAULT_L7_SECURE_APP_PROFILE
    } else {
        &vs.application_profile
    };
    api_ref("applicationprofile", profile)
}

fn network_profile(vs: &VsNode) -> &str {
    if vs.network_profile.is_empty() {
        adc_ingress_controller_core::DEFAULT_TCP_NETWORK_PROFILE
    } else {
        &vs.network_profile
    }
}

pub fn vsvip_payload(settings: &Settings, vip: &VsVipNode) -> Value {
    let mut obj = json!({
        "name": vip.name,
        "east_west_placement": vip.east_west,
        "vrf_context_ref": api_ref("vrfcontext", &vip.vrf_context),
        "dns_info": Value::Array(
            vip.fqdns.iter().map(|f| json!({ "fqdn": f })).collect(),
        ),
    });
    common_refs(settings, &mut obj);

    let mut vip_obj = json!({ "auto_allocate_ip": true });
    match (&vip.network_name, &vip.subnet_ip, vip.subnet_prefix) {
        (Some(network), Some(addr), Some(mask)) => {
            vip_obj["ipam_network_subnet"] = json!({
                "network_ref": api_ref("network", network),
                "subnet": {
                    "ip_addr": { "addr": addr, "type": "V4" },
                    "mask": mask,
                },
            });
        }
        _ => {
            tracing::debug!(vsvip = %vip.name, "no subnet/network configured, auto-allocating only");
        }
    }
    obj["vip"] = json!([vip_obj]);
    obj
}

pub fn pool_payload(settings: &Settings, pool: &PoolNode) -> Value {
    let mut obj = json!({
        "name": pool.name,
        "cloud_config_cksum": pool.checksum().to_string(),
        "created_by": settings.controller_identity,
        "vrf_context_ref": api_ref("vrfcontext", &pool.vrf_context),
        "service_metadata": pool.service_metadata.to_json(),
        "servers": Value::Array(
            pool.servers
                .iter()
                .map(|s| {
                    let mut server = json!({ "ip": { "addr": s.addr, "type": "V4" } });
                    if let Some(port) = s.port {
                        server["port"] = port.into();
                    }
                    server
                })
                .collect(),
        ),
    });
    common_refs(settings, &mut obj);

    if pool.sni_enabled {
        obj["sni_enabled"] = true.into();
        if !pool.ssl_profile_ref.is_empty() {
            obj["ssl_profile_ref"] = pool.ssl_profile_ref.clone().into();
        }
    }
    if let Some(pki) = &pool.pki_profile {
        obj["pki_profile_ref"] = api_ref("pkiprofile", &pki.name).into();
    }
    if !pool.health_monitors.is_empty() {
        obj["health_monitor_refs"] = json!(pool.health_monitors);
    }
    if !pool.lb_algorithm.is_empty() {
        obj["lb_algorithm"] = pool.lb_algorithm.clone().into();
        if !pool.lb_algorithm_hash.is_empty() {
            obj["lb_algorithm_hash"] = pool.lb_algorithm_hash.clone().into();
        }
        if !pool.lb_algorithm_consistent_hash_hdr.is_empty() {
            obj["lb_algorithm_consistent_hash_hdr"] =
                pool.lb_algorithm_consistent_hash_hdr.clone().into();
        }
    }
    obj
}

pub fn pool_group_payload(settings: &Settings, pg: &PoolGroupNode) -> Value {
    let mut obj = json!({
        "name": pg.name,
        "cloud_config_cksum": pg.checksum().to_string(),
        "created_by": settings.controller_identity,
        "members": Value::Array(
            pg.members
                .iter()
                .map(|m| json!({ "pool_ref": m.pool_ref, "ratio": m.ratio }))
                .collect(),
        ),
    });
    common_refs(settings, &mut obj);
    obj
}

pub fn http_policy_payload(settings: &Settings, policy: &HttpPolicySetNode) -> Value {
    let mut obj = json!({
        "name": policy.name,
        "cloud_config_cksum": policy.checksum().to_string(),
        "created_by": settings.controller_identity,
    });
    common_refs(settings, &mut obj);

    if !policy.hpp_map.is_empty() {
        obj["http_request_policy"] = json!({
            "rules": Value::Array(
                policy
                    .hpp_map
                    .iter()
                    .enumerate()
                    .map(|(i, rule)| {
                        let mut r = json!({
                            "index": i as i64,
                            "name": format!("{}-{}", policy.name, i),
                            "match": {
                                "host_hdr": {
                                    "match_criteria": "HDR_EQUALS",
                                    "value": [rule.host],
                                },
                            },
                            "switching_action": {
                                "action": "HTTP_SWITCHING_SELECT_POOLGROUP",
                                "pool_group_ref": api_ref("poolgroup", &rule.pool_group),
                            },
                        });
                        if let Some(path) = &rule.path {
                            r["match"]["path"] = json!({
                                "match_criteria": rule.match_criteria,
                                "match_str": [path],
                            });
                        }
                        r
                    })
                    .collect(),
            ),
        });
    }

    if !policy.redirect_ports.is_empty() {
        obj["http_request_policy"] = json!({
            "rules": Value::Array(
                policy
                    .redirect_ports
                    .iter()
                    .enumerate()
                    .map(|(i, redirect)| {
                        json!({
                            "index": i as i64,
                            "name": format!("{}-{}", policy.name, i),
                            "match": {
                                "host_hdr": {
                                    "match_criteria": "HDR_EQUALS",
                                    "value": redirect.hosts,
                                },
                                "vs_port": { "match_criteria": "IS_IN", "ports": [redirect.vs_port] },
                            },
                            "redirect_action": {
                                "port": redirect.redirect_port,
                                "protocol": "HTTPS",
                                "status_code": redirect.status_code,
                            },
                        })
                    })
                    .collect(),
            ),
        });
    }
    obj
}

pub fn ssl_cert_payload(settings: &Settings, cert: &TlsKeyCertNode) -> Value {
    let mut obj = json!({
        "name": cert.name,
        "created_by": settings.controller_identity,
        "certificate": { "certificate": String::from_utf8_lossy(&cert.cert) },
    });
    common_refs(settings, &mut obj);
    match cert.kind {
        CertKind::Vs => {
            obj["type"] = "SSL_CERTIFICATE_TYPE_VIRTUALSERVICE".into();
            obj["key"] = String::from_utf8_lossy(&cert.key).into_owned().into();
            if let Some(ca) = &cert.ca_cert_name {
                obj["ca_certs"] = json!([{ "name": ca }]);
            }
        }
        CertKind::Ca => {
            obj["type"] = "SSL_CERTIFICATE_TYPE_CA".into();
        }
    }
    obj
}

pub fn datascript_payload(settings: &Settings, ds: &DataScriptNode) -> Value {
    let mut obj = json!({
        "name": ds.name,
        "created_by": settings.controller_identity,
        "datascript": [{ "evt": "VS_DATASCRIPT_EVT_HTTP_REQ", "script": ds.script }],
        "pool_group_refs": Value::Array(
            ds.pool_group_refs
                .iter()
                .map(|pg| api_ref("poolgroup", pg).into())
                .collect(),
        ),
    });
    common_refs(settings, &mut obj);
    obj
}

pub fn pki_profile_payload(settings: &Settings, pki: &PkiProfileNode) -> Value {
    let mut obj = json!({
        "name": pki.name,
        "created_by": settings.controller_identity,
        "ca_certs": [{ "certificate": pki.ca_cert }],
        "crl_check": false,
    });
    common_refs(settings, &mut obj);
    obj
}
