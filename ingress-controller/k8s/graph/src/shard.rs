use adc_ingress_controller_core::{checksum, Layout, Settings};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShardError {
    /// The configured shard size resolves to zero buckets; the event must be
    /// skipped without mutating any graph.
    #[error("host {0} is unshardable: shard size is zero")]
    Unshardable(String),
}

fn bucket(fqdn: &str, size: u32) -> u32 {
    (checksum::hash_str(fqdn) % u64::from(size)) as u32
}

/// Maps an FQDN to its shared parent VS. Pure and stable for the life of a
/// configured shard size.
pub fn shard_vs_name(settings: &Settings, fqdn: &str) -> Result<String, ShardError> {
    let size = settings.shard_size.buckets();
    if size == 0 {
        return Err(ShardError::Unshardable(fqdn.to_string()));
    }
    let n = bucket(fqdn, size);
    let name = match settings.layout {
        Layout::Evh => format!("{}Shared-L7-EVH-{}", settings.name_prefix, n),
        Layout::Sni => format!("{}Shared-L7-{}", settings.name_prefix, n),
    };
    Ok(name)
}

/// Passthrough hosts live in a separate shard space with the same contract.
pub fn passthrough_vs_name(settings: &Settings, fqdn: &str) -> Result<String, ShardError> {
    let size = settings.shard_size.buckets();
    if size == 0 {
        return Err(ShardError::Unshardable(fqdn.to_string()));
    }
    Ok(format!(
        "{}Shared-Passthrough-{}",
        settings.name_prefix,
        bucket(fqdn, size)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adc_ingress_controller_core::ShardSize;

    #[test]
    fn sharding_is_stable() {
        let settings = Settings {
            shard_size: ShardSize::Large,
            ..Settings::default()
        };
        let a = shard_vs_name(&settings, "foo.com").unwrap();
        let b = shard_vs_name(&settings, "foo.com").unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("cluster--Shared-L7-"));
    }

    #[test]
    fn small_size_maps_everything_to_bucket_zero() {
        let settings = Settings::default();
        assert_eq!(shard_vs_name(&settings, "foo.com").unwrap(), "cluster--Shared-L7-0");
        assert_eq!(shard_vs_name(&settings, "voo.com").unwrap(), "cluster--Shared-L7-0");
    }

    #[test]
    fn evh_layout_changes_the_prefix() {
        let settings = Settings {
            layout: Layout::Evh,
            ..Settings::default()
        };
        assert_eq!(
            shard_vs_name(&settings, "foo.com").unwrap(),
            "cluster--Shared-L7-EVH-0"
        );
    }

    #[test]
    fn passthrough_uses_its_own_space() {
        let settings = Settings::default();
        assert_eq!(
            passthrough_vs_name(&settings, "foo.com").unwrap(),
            "cluster--Shared-Passthrough-0"
        );
    }
}
