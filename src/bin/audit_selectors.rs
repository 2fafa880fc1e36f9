use alloy::providers::ProviderBuilder;
use anyhow::Result;
use diamond_ops::{audit, inspector::ForgeInspector, telemetry, Config};
use dotenv::dotenv;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    telemetry::init();

    let config = Config::from_env()?;
    let rpc_url = config.require_endpoint()?.clone();
    info!(
        facets = %config.facets_root.display(),
        diamond = %config.diamond_address,
        "Auditing production facet selectors"
    );

    let provider = ProviderBuilder::new().on_http(rpc_url);
    let inspector = ForgeInspector::new(config.forge_bin.as_str());

    let report = audit::audit(
        &config.facets_root,
        config.diamond_address,
        &inspector,
        provider,
    )
    .await?;

    let missing: Vec<String> = report
        .missing
        .iter()
        .map(|entry| entry.selector.to_string())
        .collect();
    info!(
        local = report.local.len(),
        onchain = report.onchain,
        missing = missing.len(),
        "Missing sels {:?}",
        missing
    );
    Ok(())
}
