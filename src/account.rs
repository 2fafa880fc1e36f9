use alloy::{
    consensus::Transaction as _,
    primitives::{Address, U256},
    providers::Provider,
    rpc::types::{BlockTransactionsKind, Transaction},
    transports::Transport,
};
use anyhow::{Context, Result};
use std::str::FromStr;
use tracing::{debug, info};

pub const DEFAULT_HISTORY_BLOCKS: u64 = 1000;

/// EIP-55 form of `address`.
pub fn checksum(address: &str) -> Result<String> {
    let parsed = Address::from_str(address.trim())
        .with_context(|| format!("Invalid address '{}'", address))?;
    Ok(parsed.to_checksum(None))
}

/// All-lowercase and all-uppercase hex carry no checksum and are accepted;
/// mixed case must match EIP-55 exactly.
pub fn has_valid_checksum(address: &str) -> bool {
    let trimmed = address.trim();
    let hex = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if Address::from_str(hex).is_err() {
        return false;
    }
    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }
    Address::parse_checksummed(format!("0x{}", hex), None).is_ok()
}

/// `wei` as a decimal with trailing zeros dropped.
pub fn format_wei(wei: U256, decimals: usize) -> String {
    let raw = wei.to_string();

    let padded = if raw.len() <= decimals {
        format!("{:0>width$}", raw, width = decimals + 1)
    } else {
        raw
    };

    let split_at = padded.len().saturating_sub(decimals);
    let (whole, frac) = padded.split_at(split_at);
    let frac_trimmed = frac.trim_end_matches('0');

    if frac_trimmed.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, frac_trimmed)
    }
}

pub async fn balance<T, P>(provider: &P, address: Address) -> Result<U256>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    provider
        .get_balance(address)
        .await
        .with_context(|| format!("Failed to fetch balance of {}", address))
}

/// Block numbers to scan, newest first, stopping at genesis.
pub fn history_blocks(latest: u64, blocks: u64) -> impl Iterator<Item = u64> {
    let oldest = latest.saturating_sub(blocks.saturating_sub(1));
    let range = if blocks == 0 { 1..=0 } else { oldest..=latest };
    range.rev()
}

pub fn touches(tx: &Transaction, address: Address) -> bool {
    tx.from == address || tx.to() == Some(address)
}

/// Transactions sent from or to `address` in the last `blocks` blocks,
/// newest block first. One block request at a time.
pub async fn history<T, P>(provider: &P, address: Address, blocks: u64) -> Result<Vec<Transaction>>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let latest = provider
        .get_block_number()
        .await
        .context("Failed to fetch block number")?;
    info!(latest, blocks, %address, "Scanning history");

    let mut found = Vec::new();
    for number in history_blocks(latest, blocks) {
        debug!(block = number, "scanning block");
        let Some(block) = provider
            .get_block_by_number(number.into(), BlockTransactionsKind::Full)
            .await
            .with_context(|| format!("Failed to fetch block {}", number))?
        else {
            continue;
        };
        if let Some(txs) = block.transactions.as_transactions() {
            found.extend(txs.iter().filter(|tx| touches(tx, address)).cloned());
        }
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0x9492c313f500319e87937F1dA86b7938757627AD";

    #[test]
    fn test_checksum_round_trip() {
        let expected = checksum(ADDRESS).unwrap();
        assert_eq!(checksum(&ADDRESS.to_lowercase()).unwrap(), expected);
        assert!(has_valid_checksum(&expected));
        assert!(checksum("0x1234").is_err());
    }

    #[test]
    fn test_checksum_validation() {
        let good = checksum(ADDRESS).unwrap();
        assert!(has_valid_checksum(&good.to_lowercase()));
        assert!(has_valid_checksum(&format!("0x{}", good[2..].to_uppercase())));

        // flip the case of the first letter to break the checksum
        let idx = good[2..].find(|c: char| c.is_ascii_alphabetic()).unwrap() + 2;
        let mut broken = good.clone();
        let flipped = if good.as_bytes()[idx].is_ascii_uppercase() {
            good[idx..idx + 1].to_lowercase()
        } else {
            good[idx..idx + 1].to_uppercase()
        };
        broken.replace_range(idx..idx + 1, &flipped);
        let mixed = broken[2..].chars().any(|c| c.is_ascii_lowercase())
            && broken[2..].chars().any(|c| c.is_ascii_uppercase());
        assert!(!mixed || !has_valid_checksum(&broken));

        assert!(!has_valid_checksum("0xnot-an-address"));
    }

    #[test]
    fn test_format_wei() {
        assert_eq!(format_wei(U256::ZERO, 18), "0");
        assert_eq!(format_wei(U256::from(1_500_000_000_000_000_000u128), 18), "1.5");
        assert_eq!(format_wei(U256::from(1u64), 18), "0.000000000000000001");
        assert_eq!(format_wei(U256::from(2_000_000u64), 6), "2");
    }

    #[test]
    fn test_history_blocks() {
        assert_eq!(history_blocks(100, 3).collect::<Vec<_>>(), vec![100, 99, 98]);
        assert_eq!(history_blocks(1, 5).collect::<Vec<_>>(), vec![1, 0]);
        assert_eq!(history_blocks(100, 0).count(), 0);
    }
}
