use alloy::{
    primitives::{address, Address},
    signers::local::PrivateKeySigner,
};
use anyhow::{Context, Result};
use std::{env, path::PathBuf, str::FromStr};
use url::Url;

pub const DEFAULT_DIAMOND_ADDRESS: Address = address!("bAF45B60F69eCa4616CdE172D3961C156946e831");
pub const DEFAULT_EXPLORER_BASE_URL: &str = "https://arbiscan.io";
pub const DEFAULT_ABI_OUTPUT: &str = "ABIs/diamond.json";

/// Settings shared by every program. Loaded once in `main` and handed to the
/// operations that need it; nothing below reads the environment on its own.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON-RPC target. Only the programs that talk to a chain require it.
    pub endpoint: Option<Url>,
    /// Transaction signer, required by `inspect send`.
    pub signing_key: Option<PrivateKeySigner>,
    pub explorer_base_url: String,
    pub diamond_address: Address,
    pub source_root: PathBuf,
    pub facets_root: PathBuf,
    pub abi_output: PathBuf,
    pub forge_bin: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: None,
            signing_key: None,
            explorer_base_url: DEFAULT_EXPLORER_BASE_URL.to_string(),
            diamond_address: DEFAULT_DIAMOND_ADDRESS,
            source_root: PathBuf::from("src/diamond"),
            facets_root: PathBuf::from("src/diamond/facets"),
            abi_output: PathBuf::from(DEFAULT_ABI_OUTPUT),
            forge_bin: "forge".to_string(),
        }
    }
}

/// `ABI_OUTPUT` alone, for programs that read the extracted ABI without
/// needing the rest of the settings to parse.
pub fn abi_output_from_env() -> PathBuf {
    env::var("ABI_OUTPUT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_ABI_OUTPUT))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let endpoint = match env::var("RPC_URL").or_else(|_| env::var("ARBITRUM_RPC_URL")) {
            Ok(raw) => Some(Url::parse(&raw).with_context(|| format!("Invalid RPC_URL '{}'", raw))?),
            Err(_) => None,
        };

        let signing_key = match env::var("PRIVATE_KEY") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                PrivateKeySigner::from_str(raw.trim()).context("Invalid PRIVATE_KEY")?,
            ),
            _ => None,
        };

        let explorer_base_url = env::var("EXPLORER_BASE_URL")
            .unwrap_or(defaults.explorer_base_url)
            .trim_end_matches('/')
            .to_string();

        let diamond_address = match env::var("DIAMOND_ADDRESS") {
            Ok(raw) => Address::from_str(raw.trim())
                .with_context(|| format!("Invalid DIAMOND_ADDRESS '{}'", raw))?,
            Err(_) => defaults.diamond_address,
        };

        Ok(Self {
            endpoint,
            signing_key,
            explorer_base_url,
            diamond_address,
            source_root: env::var("SOURCE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.source_root),
            facets_root: env::var("FACETS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.facets_root),
            abi_output: abi_output_from_env(),
            forge_bin: env::var("FORGE_BIN").unwrap_or(defaults.forge_bin),
        })
    }

    pub fn require_endpoint(&self) -> Result<&Url> {
        self.endpoint
            .as_ref()
            .context("Missing RPC_URL (or ARBITRUM_RPC_URL) in .env")
    }

    pub fn require_signer(&self) -> Result<&PrivateKeySigner> {
        self.signing_key
            .as_ref()
            .context("Missing PRIVATE_KEY in .env")
    }

    pub fn explorer_tx_url(&self, tx_hash: impl std::fmt::LowerHex) -> String {
        format!("{}/tx/{:#x}", self.explorer_base_url, tx_hash)
    }
}
