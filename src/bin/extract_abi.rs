use anyhow::Result;
use diamond_ops::{extractor, inspector::ForgeInspector, telemetry, Config};
use dotenv::dotenv;
use tracing::info;

fn main() -> Result<()> {
    dotenv().ok();
    telemetry::init();

    let config = Config::from_env()?;
    info!(
        root = %config.source_root.display(),
        output = %config.abi_output.display(),
        "Extracting diamond ABI"
    );

    let inspector = ForgeInspector::new(config.forge_bin.as_str());
    let report = extractor::extract_abi(&config, &inspector)?;

    info!(
        contracts = report.contracts,
        entries = report.new_len,
        "Wrote {}",
        report.output.display()
    );
    Ok(())
}
