use alloy::{
    network::EthereumWallet,
    primitives::{Address, Bytes, B256},
    providers::ProviderBuilder,
};
use anyhow::{bail, Context, Result};
use diamond_ops::{
    chain::{self, RAW_SEND_GAS_LIMIT},
    config, telemetry,
    tuple::{self, FUNCTION_CALL_TUPLE, STEP_TUPLE},
    Config,
};
use dotenv::dotenv;
use std::{env, str::FromStr};
use tracing::{info, warn};

const STEP_SAMPLE: &str = include_str!("../../samples/step.hex");
const FUNCTION_CALL_SAMPLE: &str = include_str!("../../samples/function_call.hex");

const USAGE: &str = "Usage:
  inspect decode <tuple-signature> <hex>
  inspect encode <tuple-signature> <value>
  inspect step
  inspect receipt <tx-hash> <topic0> [<tuple-signature>...]
  inspect send <to> <calldata-hex>
  inspect revert <hex>";

fn print_values(label: &str, signatures: &[&str], data: &str) -> Result<()> {
    let values = tuple::decode_params_hex(signatures, data)?;
    println!("{}:", label);
    for value in &values {
        println!("  {}", tuple::render(value));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    telemetry::init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("decode") if args.len() >= 4 => {
            print_values("decoded", &[args[2].as_str()], &args[3])
        }
        Some("encode") if args.len() >= 4 => {
            let encoded = tuple::encode_params_str(&[args[2].as_str()], &[args[3].as_str()])?;
            println!("0x{}", hex::encode(encoded));
            Ok(())
        }
        Some("step") => {
            print_values("step", &[STEP_TUPLE], STEP_SAMPLE)?;
            print_values("function call", &[FUNCTION_CALL_TUPLE], FUNCTION_CALL_SAMPLE)
        }
        Some("receipt") if args.len() >= 4 => {
            let tx_hash = B256::from_str(&args[2]).context("Invalid tx hash")?;
            let topic0 = B256::from_str(&args[3]).context("Invalid topic")?;
            let config = Config::from_env()?;
            let provider = ProviderBuilder::new().on_http(config.require_endpoint()?.clone());

            let log = chain::receipt_log(&provider, tx_hash, topic0).await?;
            info!(address = %log.address(), topics = log.topics().len(), "Matched log");

            let signatures: Vec<&str> = args[4..].iter().map(String::as_str).collect();
            let data = format!("0x{}", hex::encode(&log.data().data));
            if signatures.is_empty() {
                println!("{}", data);
                Ok(())
            } else {
                print_values("log data", &signatures, &data)
            }
        }
        Some("send") if args.len() >= 4 => {
            let to = Address::from_str(&args[2]).context("Invalid target address")?;
            let raw = args[3].trim();
            let calldata = Bytes::from(
                hex::decode(raw.strip_prefix("0x").unwrap_or(raw)).context("Invalid calldata hex")?,
            );

            let config = Config::from_env()?;
            let signer = config.require_signer()?.clone();
            info!(from = %signer.address(), %to, bytes = calldata.len(), "Sending raw calldata");
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(EthereumWallet::from(signer))
                .on_http(config.require_endpoint()?.clone());

            let receipt =
                chain::send_calldata(&provider, to, calldata, RAW_SEND_GAS_LIMIT).await?;
            info!(
                gas_used = receipt.gas_used,
                "Done: {}",
                config.explorer_tx_url(receipt.transaction_hash)
            );
            Ok(())
        }
        Some("revert") if args.len() >= 3 => {
            let raw = args[2].trim();
            let data = hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
                .context("Invalid revert data hex")?;

            if let Some(described) = chain::describe_builtin_revert(&data) {
                println!("{}", described);
                return Ok(());
            }

            match chain::load_abi(&config::abi_output_from_env()) {
                Ok(abi) => match chain::decode_custom_error(&abi, &data) {
                    Some((signature, values)) => {
                        let rendered: Vec<String> = values.iter().map(tuple::render).collect();
                        println!("{}: ({})", signature, rendered.join(", "));
                        Ok(())
                    }
                    None => bail!("Unknown revert data: 0x{}", hex::encode(&data)),
                },
                Err(e) => {
                    warn!("No ABI to match custom errors against: {:#}", e);
                    bail!("Unknown revert data: 0x{}", hex::encode(&data))
                }
            }
        }
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}
