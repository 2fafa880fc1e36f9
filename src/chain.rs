//! Live chain helpers used by the inspection programs.

use alloy::{
    dyn_abi::{DynSolValue, JsonAbiExt},
    json_abi::JsonAbi,
    primitives::{Address, Bytes, B256},
    providers::Provider,
    rpc::types::{Log, TransactionReceipt, TransactionRequest},
    sol_types::{Panic, Revert, SolError},
    transports::Transport,
};
use anyhow::{bail, Context, Result};
use std::{fs, path::Path};
use tracing::info;

/// Gas limit used for raw calldata sends.
pub const RAW_SEND_GAS_LIMIT: u64 = 12_000_000;

/// First log whose topic0 is `topic0`.
pub fn find_log(logs: &[Log], topic0: B256) -> Option<&Log> {
    logs.iter().find(|log| log.topics().first() == Some(&topic0))
}

/// Fetches the receipt of `tx_hash` and returns its first log matching `topic0`.
pub async fn receipt_log<T, P>(provider: &P, tx_hash: B256, topic0: B256) -> Result<Log>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let receipt = provider
        .get_transaction_receipt(tx_hash)
        .await
        .with_context(|| format!("Failed to fetch receipt {}", tx_hash))?
        .with_context(|| format!("No receipt for {}", tx_hash))?;

    info!(
        tx = %tx_hash,
        logs = receipt.inner.logs().len(),
        status = receipt.status(),
        "Fetched receipt"
    );

    find_log(receipt.inner.logs(), topic0)
        .cloned()
        .with_context(|| format!("No log with topic {} in {}", topic0, tx_hash))
}

/// Sends `calldata` to `to` and waits for the receipt. A reverted
/// transaction is an error.
pub async fn send_calldata<T, P>(
    provider: &P,
    to: Address,
    calldata: Bytes,
    gas_limit: u64,
) -> Result<TransactionReceipt>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let tx = TransactionRequest::default()
        .to(to)
        .input(calldata.into())
        .gas_limit(gas_limit);

    let pending = provider
        .send_transaction(tx)
        .await
        .context("Failed to send transaction")?;
    info!(tx = %pending.tx_hash(), "Transaction sent, waiting for confirmation");

    let receipt = pending
        .get_receipt()
        .await
        .context("Failed to fetch receipt")?;
    if !receipt.status() {
        bail!("transaction reverted: {}", receipt.transaction_hash);
    }
    Ok(receipt)
}

/// Human-readable form of `Error(string)` or `Panic(uint256)` revert data.
pub fn describe_builtin_revert(data: &[u8]) -> Option<String> {
    if let Ok(revert) = Revert::abi_decode(data, true) {
        return Some(format!("Error({:?})", revert.reason));
    }
    if let Ok(panic) = Panic::abi_decode(data, true) {
        return Some(match panic.kind() {
            Some(kind) => format!("Panic(0x{:x}): {:?}", panic.code, kind),
            None => format!("Panic(0x{:x})", panic.code),
        });
    }
    None
}

/// Matches revert data against the custom errors of `abi`.
pub fn decode_custom_error(abi: &JsonAbi, data: &[u8]) -> Option<(String, Vec<DynSolValue>)> {
    if data.len() < 4 {
        return None;
    }
    abi.errors().find_map(|error| {
        if error.selector().as_slice() != &data[..4] {
            return None;
        }
        error
            .abi_decode_input(&data[4..], true)
            .ok()
            .map(|values| (error.signature(), values))
    })
}

pub fn load_abi(path: &Path) -> Result<JsonAbi> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not a JSON ABI", path.display()))
}
