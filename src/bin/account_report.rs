use alloy::{consensus::Transaction as _, primitives::Address, providers::ProviderBuilder};
use anyhow::{Context, Result};
use diamond_ops::{account, telemetry, Config};
use dotenv::dotenv;
use std::{env, str::FromStr};
use tracing::info;

const USAGE: &str = "Usage:
  account_report checksum <address>
  account_report balance <address>
  account_report history <address> [blocks]";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    telemetry::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        println!("{}", USAGE);
        return Ok(());
    }

    let raw_address = args[2].as_str();
    if args[1] == "checksum" {
        let checksummed = account::checksum(raw_address)?;
        if !account::has_valid_checksum(raw_address) {
            info!(input = raw_address, "Input has a bad checksum");
        }
        println!("{}", checksummed);
        return Ok(());
    }

    let config = Config::from_env()?;
    let address = Address::from_str(raw_address).context("Invalid address")?;
    let provider = ProviderBuilder::new().on_http(config.require_endpoint()?.clone());

    match args[1].as_str() {
        "balance" => {
            let balance = account::balance(&provider, address).await?;
            info!(%address, wei = %balance, "Fetched balance");
            println!("{}", account::format_wei(balance, 18));
        }
        "history" => {
            let blocks = match args.get(3) {
                Some(raw) => raw.parse().context("Invalid block count")?,
                None => account::DEFAULT_HISTORY_BLOCKS,
            };
            let txs = account::history(&provider, address, blocks).await?;
            if txs.is_empty() {
                info!("No transactions found");
            }
            for tx in &txs {
                println!(
                    "{} {} -> {} {}",
                    tx.inner.tx_hash(),
                    tx.from,
                    tx.to().map_or_else(|| "create".to_string(), |to| to.to_string()),
                    account::format_wei(tx.value(), 18)
                );
            }
        }
        _ => println!("{}", USAGE),
    }

    Ok(())
}
