//! Decoding and encoding against human-readable tuple signatures such as
//! `tuple(address target_address, bytes[] args, string signature)`.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use anyhow::{bail, Context, Result};

pub const FUNCTION_CALL_TUPLE: &str =
    "tuple(address target_address, bytes[] args, string signature)";

pub const STEP_TUPLE: &str =
    "tuple(bytes func, uint256[] childrenIndices, bytes[] conditions, bool isCallback, bytes mvc)";

/// Strips the `tuple` keyword, component names and data locations, leaving a
/// canonical type string: `(address,bytes[],string)`.
pub fn canonical_type(signature: &str) -> Result<String> {
    canonical(component_type(signature), signature)
}

fn canonical(ty: &str, signature: &str) -> Result<String> {
    let ty = match ty.strip_prefix("tuple") {
        Some(rest) if rest.trim_start().starts_with('(') => rest.trim_start(),
        _ => ty,
    };

    if !ty.starts_with('(') {
        if ty.is_empty() {
            bail!("Empty type in '{}'", signature);
        }
        return Ok(ty.split_whitespace().collect());
    }

    let close = matching_paren(ty)
        .with_context(|| format!("Unbalanced parentheses in '{}'", signature))?;
    let inner = &ty[1..close];
    let suffix: String = ty[close + 1..].split_whitespace().collect();
    if !suffix.chars().all(|c| c == '[' || c == ']' || c.is_ascii_digit()) {
        bail!("Unexpected '{}' after tuple in '{}'", suffix, signature);
    }

    let components = if inner.trim().is_empty() {
        Vec::new()
    } else {
        split_top_level(inner)
            .into_iter()
            .map(|component| canonical(component_type(component), signature))
            .collect::<Result<Vec<_>>>()?
    };

    Ok(format!("({}){}", components.join(","), suffix))
}

pub fn parse_type(signature: &str) -> Result<DynSolType> {
    let canonical = canonical_type(signature)?;
    DynSolType::parse(&canonical)
        .with_context(|| format!("Unsupported type '{}' (from '{}')", canonical, signature))
}

/// Decodes `data` as a parameter list of `signatures`, the way a call's
/// arguments are laid out.
pub fn decode_params(signatures: &[&str], data: &[u8]) -> Result<Vec<DynSolValue>> {
    let types = signatures
        .iter()
        .map(|sig| parse_type(sig))
        .collect::<Result<Vec<_>>>()?;
    let decoded = DynSolType::Tuple(types)
        .abi_decode_params(data)
        .context("ABI decode failed")?;

    match decoded {
        DynSolValue::Tuple(values) => Ok(values),
        other => Ok(vec![other]),
    }
}

/// Hex convenience over [`decode_params`]; `0x` is optional.
pub fn decode_params_hex(signatures: &[&str], data: &str) -> Result<Vec<DynSolValue>> {
    let trimmed = data.trim();
    let bytes = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
        .context("Payload is not valid hex")?;
    decode_params(signatures, &bytes)
}

pub fn encode_params(values: &[DynSolValue]) -> Vec<u8> {
    DynSolValue::Tuple(values.to_vec()).abi_encode_params()
}

/// Reads each of `values` as the type of the matching signature, e.g.
/// `(0x1231..., [], "lifiSwap")`, and encodes them as a parameter list.
pub fn encode_params_str(signatures: &[&str], values: &[&str]) -> Result<Vec<u8>> {
    if signatures.len() != values.len() {
        bail!(
            "Got {} values for {} types",
            values.len(),
            signatures.len()
        );
    }
    let values = signatures
        .iter()
        .zip(values)
        .map(|(sig, raw)| {
            parse_type(sig)?
                .coerce_str(raw)
                .with_context(|| format!("Cannot read '{}' as '{}'", raw, sig))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(encode_params(&values))
}

/// Compact, ethers-like rendering for console inspection.
pub fn render(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Address(addr) => addr.to_checksum(None),
        DynSolValue::Function(f) => format!("0x{}", hex::encode(f.as_slice())),
        DynSolValue::Bytes(b) => format!("0x{}", hex::encode(b)),
        DynSolValue::String(s) => format!("{:?}", s),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            format!("[{}]", items.iter().map(render).collect::<Vec<_>>().join(", "))
        }
        DynSolValue::Tuple(items) => {
            format!("({})", items.iter().map(render).collect::<Vec<_>>().join(", "))
        }
        #[allow(unreachable_patterns)]
        other => format!("{:?}", other),
    }
}

fn matching_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// The type part of `type [location] [name]`. Array suffixes may be separated
/// from the type by whitespace: `tuple(address a) [] legs`.
fn component_type(component: &str) -> &str {
    let component = component.trim();
    let mut depth = 0i32;
    for (i, c) in component.char_indices() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                let next = component[i..].trim_start();
                // `tuple (` and `T []` keep going; anything else ends the type.
                if &component[..i] != "tuple" && !next.starts_with('[') {
                    return &component[..i];
                }
            }
            _ => {}
        }
    }
    component
}
