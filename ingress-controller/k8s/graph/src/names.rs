//! The naming scheme for every generated ADC object.
//!
//! The http-rule overlay matches pools by regex over these names, so the
//! regex constructors live here next to the name constructors; a change to
//! one is a change to both.

use adc_ingress_controller_core::{Layout, Settings};
use regex::Regex;

pub fn model_name(settings: &Settings, vs_name: &str) -> String {
    format!("{}/{}", settings.tenant, vs_name)
}

/// The VSVIP of a shared VS carries the same name as the VS itself.
pub fn vsvip_name(vs_name: &str) -> String {
    vs_name.to_string()
}

/// Child virtual services are keyed by host alone: every ingress claiming the
/// host lands on the same child.
pub fn child_vs_name(settings: &Settings, host: &str) -> String {
    format!("{}{}", settings.name_prefix, host)
}

pub fn redirect_policy_name(parent_vs_name: &str) -> String {
    format!("{}-redirect", parent_vs_name)
}

fn path_suffix(path: &str) -> String {
    path.replace('/', "_")
}

/// Pool, pool-group and per-path http-policy share one name per
/// (ingress, namespace, host, path). Shared-parent and EVH objects embed the
/// host first; SNI-child objects embed the namespace first.
pub fn pool_name(
    settings: &Settings,
    ingress: &str,
    namespace: &str,
    host: &str,
    path: &str,
    secure_child: bool,
) -> String {
    let sfx = path_suffix(path);
    if secure_child && settings.layout == Layout::Sni {
        format!("{}{}-{}{}-{}", settings.name_prefix, namespace, host, sfx, ingress)
    } else {
        format!("{}{}{}-{}-{}", settings.name_prefix, host, sfx, namespace, ingress)
    }
}

pub fn pool_ref(pool_name: &str) -> String {
    format!("/api/pool?name={}", pool_name)
}

pub fn tls_cert_name(settings: &Settings, namespace: &str, secret: &str, host: &str) -> String {
    format!("{}{}-{}-{}", settings.name_prefix, namespace, secret, host)
}

pub fn ca_cert_name(cert_name: &str) -> String {
    format!("{}-cacert", cert_name)
}

pub fn pki_profile_name(pool_name: &str) -> String {
    format!("{}-pki", pool_name)
}

pub fn api_ref(kind: &str, name: &str) -> String {
    format!("/api/{}?name={}", kind, name)
}

/// Matches the pools a path-level override applies to. `path` qualifies every
/// pool whose path begins with it, so `/` reaches both `_foo` and `_bar`
/// pools of the same host.
pub fn pool_match_regex(
    settings: &Settings,
    ingress: &str,
    namespace: &str,
    host: &str,
    path: &str,
    secure_child: bool,
) -> Regex {
    let sfx = path_suffix(path);
    let pattern = if secure_child && settings.layout == Layout::Sni {
        format!(
            "^{}{}-{}{}.*-{}",
            regex::escape(&settings.name_prefix),
            regex::escape(namespace),
            regex::escape(host),
            regex::escape(&sfx),
            regex::escape(ingress),
        )
    } else {
        format!(
            "^{}{}{}.*-{}-{}",
            regex::escape(&settings.name_prefix),
            regex::escape(host),
            regex::escape(&sfx),
            regex::escape(namespace),
            regex::escape(ingress),
        )
    };
    Regex::new(&pattern).expect("escaped pool pattern must compile")
}

#[cfg(test)]
mod tests {
    use super::*;
    use adc_ingress_controller_core::Layout;

    #[test]
    fn shared_pool_name_embeds_host_then_ingress() {
        let settings = Settings::default();
        assert_eq!(
            pool_name(&settings, "foo-with-targets", "default", "foo.com", "/foo", false),
            "cluster--foo.com_foo-default-foo-with-targets"
        );
    }

    #[test]
    fn sni_child_pool_name_embeds_namespace_first() {
        let settings = Settings::default();
        assert_eq!(
            pool_name(&settings, "foo-with-targets", "default", "foo.com", "/foo", true),
            "cluster--default-foo.com_foo-foo-with-targets"
        );
    }

    #[test]
    fn evh_layout_uses_shared_scheme_for_secure_pools() {
        let settings = Settings {
            layout: Layout::Evh,
            ..Settings::default()
        };
        assert_eq!(
            pool_name(&settings, "ing", "ns", "foo.com", "/foo", true),
            "cluster--foo.com_foo-ns-ing"
        );
    }

    #[test]
    fn root_path_regex_matches_all_pools_of_host() {
        let settings = Settings::default();
        let rgx = pool_match_regex(&settings, "foo-with-targets", "default", "foo.com", "/", false);
        assert!(rgx.is_match("cluster--foo.com_foo-default-foo-with-targets"));
        assert!(rgx.is_match("cluster--foo.com_bar-default-foo-with-targets"));
        assert!(!rgx.is_match("cluster--bar.com_foo-default-foo-with-targets"));
    }

    #[test]
    fn regex_tracks_pool_name() {
        let settings = Settings::default();
        for secure in [false, true] {
            let name = pool_name(&settings, "ing", "ns", "foo.com", "/foo", secure);
            let rgx = pool_match_regex(&settings, "ing", "ns", "foo.com", "/foo", secure);
            assert!(rgx.is_match(&name), "{} must match {}", rgx, name);
        }
    }
}
