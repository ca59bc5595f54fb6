#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

use adc_ingress_controller::{
    AdcRestClient, Controller, EndpointState, KubeSecretLister, NoopStatusSink, Settings, System,
};
use adc_ingress_controller_core::{Layout, ServiceType, ShardSize};
use anyhow::{Context, Result};
use clap::Parser;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{info, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(name = "adc-ingress-controller", about = "Programs an ADC from ingress-like resources")]
struct Args {
    #[clap(long, default_value = "info", env = "ADC_INGRESS_LOG")]
    log_level: String,

    /// Base URL of the ADC REST API.
    #[clap(long, env = "ADC_URL")]
    adc_url: String,

    #[clap(long, env = "ADC_USERNAME")]
    adc_username: String,

    #[clap(long, env = "ADC_PASSWORD", hide_env_values = true)]
    adc_password: String,

    #[clap(long)]
    adc_insecure_skip_verify: bool,

    #[clap(long, default_value = "admin")]
    tenant: String,

    #[clap(long, default_value = "Default-Cloud")]
    cloud_name: String,

    /// Applied to every generated object name.
    #[clap(long, default_value = "cluster--")]
    name_prefix: String,

    #[clap(long, default_value = "small")]
    shard_vs_size: ShardSize,

    #[clap(long, default_value = "sni")]
    layout: Layout,

    #[clap(long, default_value = "global")]
    vrf: String,

    #[clap(long, default_value = "Default-Group")]
    se_group: String,

    #[clap(long, default_value = "clusterip")]
    service_type: ServiceType,

    #[clap(long)]
    network_name: Option<String>,

    #[clap(long)]
    subnet_ip: Option<String>,

    #[clap(long)]
    subnet_prefix: Option<u8>,

    #[clap(long)]
    enable_rhi: Option<bool>,

    /// IPAM-DNS subdomain of the cloud; seeds the default VSVIP FQDNs.
    #[clap(long)]
    default_sub_domain: Option<String>,

    /// `key=value` pairs identifying this cluster on the ADC.
    #[clap(long, value_delimiter = ',')]
    cluster_labels: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&args.log_level))
        .init();

    let mut cluster_labels = BTreeMap::new();
    for pair in &args.cluster_labels {
        let (k, v) = pair
            .split_once('=')
            .with_context(|| format!("malformed cluster label: {}", pair))?;
        cluster_labels.insert(k.to_string(), v.to_string());
    }

    let settings = Arc::new(Settings {
        tenant: args.tenant,
        cloud_name: args.cloud_name,
        name_prefix: args.name_prefix,
        shard_size: args.shard_vs_size,
        layout: args.layout,
        vrf: args.vrf,
        se_group: args.se_group,
        service_type: args.service_type,
        network_name: args.network_name,
        subnet_ip: args.subnet_ip,
        subnet_prefix: args.subnet_prefix,
        enable_rhi: args.enable_rhi,
        default_sub_domain: args.default_sub_domain,
        cluster_labels: cluster_labels.clone(),
        ..Settings::default()
    });

    // Initial ADC connectivity is the only fatal error in the system.
    let session = Arc::new(
        AdcRestClient::connect(
            &args.adc_url,
            &args.adc_username,
            &args.adc_password,
            args.adc_insecure_skip_verify,
            cluster_labels,
        )
        .await
        .context("failed to reach the ADC")?,
    );
    info!(url = %args.adc_url, "connected to the ADC");

    let kube_client = kube::Client::try_default()
        .await
        .context("failed to build the Kubernetes client")?;
    let secrets = Arc::new(KubeSecretLister::new(kube_client));

    let (system, updates) = System::new(
        settings,
        session,
        secrets,
        EndpointState::default(),
        Arc::new(NoopStatusSink),
    );

    system
        .reconciler
        .populate_cache()
        .await
        .context("failed to seed the cache from the ADC")?;

    // The external watch machinery feeds the builder and pushes changed
    // model names; this task drains them against the ADC.
    let controller = Controller::new(system.reconciler.clone(), system.queue.clone(), updates);
    tokio::spawn(controller.process_updates().instrument(info_span!("reconciler")));

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
