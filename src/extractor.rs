//! Combined diamond ABI generation.

use crate::{
    config::Config,
    inspector::ContractInspector,
    sources::{self, DeclFilter},
};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub contracts: usize,
    pub new_len: usize,
    /// Entry count of the file that was overwritten, if there was one.
    pub old_len: Option<usize>,
    pub output: PathBuf,
}

/// Concatenated ABI fragments of every contract declared under `root`, in
/// discovery order. Fragments are not validated or deduplicated.
pub fn collect_abi(root: &Path, inspector: &impl ContractInspector) -> Result<(Vec<Value>, usize)> {
    let mut abi = Vec::new();
    let mut contracts = 0;

    for file in sources::solidity_files(root)? {
        for contract in sources::contracts_in_file(&file, DeclFilter::Any)? {
            let fragments = inspector
                .abi(&contract)
                .with_context(|| format!("Failed to inspect ABI of {}", contract))?;
            debug!(%contract, entries = fragments.len(), "collected ABI");
            abi.extend(fragments);
            contracts += 1;
        }
    }

    Ok((abi, contracts))
}

/// Rebuilds `config.abi_output` from the sources under `config.source_root`.
/// Nothing is written unless every contract was inspected successfully.
pub fn extract_abi(config: &Config, inspector: &impl ContractInspector) -> Result<ExtractReport> {
    extract_abi_with(config, inspector, write_abi)
}

/// [`extract_abi`] with the output step supplied by the caller. `write` runs
/// once, after collection succeeded.
pub fn extract_abi_with<W>(
    config: &Config,
    inspector: &impl ContractInspector,
    write: W,
) -> Result<ExtractReport>
where
    W: FnOnce(&Path, &[Value]) -> Result<()>,
{
    let old_len = previous_len(&config.abi_output)?;
    let (abi, contracts) = collect_abi(&config.source_root, inspector)?;

    write(&config.abi_output, &abi)?;

    info!(
        new_len = abi.len(),
        old_len = ?old_len,
        "New ABI length, old ABI length"
    );

    Ok(ExtractReport {
        contracts,
        new_len: abi.len(),
        old_len,
        output: config.abi_output.clone(),
    })
}

fn previous_len(path: &Path) -> Result<Option<usize>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
    };
    let previous: Vec<Value> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a JSON array", path.display()))?;
    Ok(Some(previous.len()))
}

/// Overwrites `path` with `abi`, pretty printed with a three space indent.
pub fn write_abi(path: &Path, abi: &[Value]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"   "));
    abi.serialize(&mut ser)?;

    fs::write(path, buf).with_context(|| format!("Failed to write {}", path.display()))
}
