//! Shifts the head offsets of an encoded call to make room for one extra
//! 32-byte word, then splices that word in.
//!
//! The defaults reproduce the deployment-args shape this was written for:
//! four dynamic head pointers, two static words after them, and an address
//! word inserted behind those.

use alloy::primitives::{b256, B256, U256};
use anyhow::{bail, Context, Result};
use tracing::debug;

const WORD: usize = 32;
const SELECTOR_LEN: usize = 4;

pub const DEFAULT_SPLICE: B256 =
    b256!("000000000000000000000000634176ecc95d326cae16829d923c1373df6ece95");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerPatch {
    /// Leading payload words holding offsets to shift.
    pub pointer_count: usize,
    /// Added to every offset; one word for the single spliced word.
    pub increment: U256,
    /// Words copied unchanged between the offsets and the splice point.
    pub passthrough_words: usize,
    pub splice: B256,
}

impl Default for PointerPatch {
    fn default() -> Self {
        Self {
            pointer_count: 4,
            increment: U256::from(WORD),
            passthrough_words: 2,
            splice: DEFAULT_SPLICE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchedCalldata {
    /// The stripped selector. It is not part of `payload`.
    pub selector: [u8; SELECTOR_LEN],
    /// `(old, new)` for every shifted offset.
    pub pointers: Vec<(U256, U256)>,
    pub payload: Vec<u8>,
}

impl PatchedCalldata {
    /// `0x`-prefixed payload without the selector.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.payload))
    }
}

impl PointerPatch {
    pub fn apply(&self, calldata: &str) -> Result<PatchedCalldata> {
        let trimmed = calldata.trim();
        let raw = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed))
            .context("Calldata is not valid hex")?;

        let head_words = self.pointer_count + self.passthrough_words;
        let needed = SELECTOR_LEN + head_words * WORD;
        if raw.len() < needed {
            bail!(
                "Calldata too short: {} bytes, need at least {} for selector + {} head words",
                raw.len(),
                needed,
                head_words
            );
        }

        let (selector, body) = raw.split_at(SELECTOR_LEN);
        let mut payload = Vec::with_capacity(body.len() + WORD);
        let mut pointers = Vec::with_capacity(self.pointer_count);

        for (i, word) in body.chunks_exact(WORD).take(self.pointer_count).enumerate() {
            let old = U256::from_be_slice(word);
            let new = old
                .checked_add(self.increment)
                .with_context(|| format!("Pointer {} overflows: {}", i, old))?;
            debug!(index = i, %old, %new, "shifted pointer");
            payload.extend_from_slice(&new.to_be_bytes::<WORD>());
            pointers.push((old, new));
        }

        let pointer_end = self.pointer_count * WORD;
        let splice_at = head_words * WORD;
        payload.extend_from_slice(&body[pointer_end..splice_at]);
        payload.extend_from_slice(self.splice.as_slice());
        payload.extend_from_slice(&body[splice_at..]);

        let mut sel = [0u8; SELECTOR_LEN];
        sel.copy_from_slice(selector);

        Ok(PatchedCalldata {
            selector: sel,
            pointers,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(n: u64) -> String {
        format!("{:064x}", n)
    }

    fn sample() -> String {
        let mut hex = String::from("0xa9fabe3b");
        for n in [0xc0, 0x100, 0x140, 0x180, 1, 0x2f969e0] {
            hex.push_str(&word(n));
        }
        // tail: four length/data words
        for n in [1, 7, 2, 9] {
            hex.push_str(&word(n));
        }
        hex
    }

    #[test]
    fn test_default_patch_on_sample() {
        let input = sample();
        let patched = PointerPatch::default().apply(&input).unwrap();

        let mut expected = String::from("0x");
        for n in [0xe0, 0x120, 0x160, 0x1a0, 1, 0x2f969e0] {
            expected.push_str(&word(n));
        }
        expected.push_str("000000000000000000000000634176ecc95d326cae16829d923c1373df6ece95");
        for n in [1, 7, 2, 9] {
            expected.push_str(&word(n));
        }

        assert_eq!(patched.to_hex(), expected);
        assert_eq!(patched.selector, [0xa9, 0xfa, 0xbe, 0x3b]);
        assert_eq!(
            patched.pointers,
            vec![
                (U256::from(0xc0), U256::from(0xe0)),
                (U256::from(0x100), U256::from(0x120)),
                (U256::from(0x140), U256::from(0x160)),
                (U256::from(0x180), U256::from(0x1a0)),
            ]
        );
        // selector dropped, one word added, nothing else lost
        assert_eq!(patched.to_hex().len(), input.len() - 8 + 64);
    }

    #[test]
    fn test_prefix_is_optional() {
        let input = sample();
        let with = PointerPatch::default().apply(&input).unwrap();
        let without = PointerPatch::default().apply(&input[2..]).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_exact_head_length_has_empty_tail() {
        let mut input = String::from("0x12345678");
        for n in [0, 0, 0, 0, 0, 0] {
            input.push_str(&word(n));
        }
        let patched = PointerPatch::default().apply(&input).unwrap();
        assert_eq!(patched.payload.len(), 7 * WORD);
        assert_eq!(&patched.payload[6 * WORD..], DEFAULT_SPLICE.as_slice());
    }

    #[test]
    fn test_custom_shape() {
        let patch = PointerPatch {
            pointer_count: 1,
            increment: U256::from(64),
            passthrough_words: 0,
            splice: B256::repeat_byte(0x11),
        };
        let input = format!("0xdeadbeef{}{}", word(0x20), word(5));
        let patched = patch.apply(&input).unwrap();
        assert_eq!(
            patched.to_hex(),
            format!("0x{}{}{}", word(0x60), "11".repeat(32), word(5))
        );
    }

    #[test]
    fn test_rejects_short_and_malformed_input() {
        let patch = PointerPatch::default();
        assert!(patch.apply("0x1234").is_err());
        assert!(patch.apply(&format!("0x12345678{}", word(0x20))).is_err());
        assert!(patch.apply("0xzz").is_err());
        assert!(patch.apply("0x123").is_err());
    }

    #[test]
    fn test_pointer_overflow_is_an_error() {
        let mut input = String::from("0x12345678");
        input.push_str(&"f".repeat(64));
        for _ in 0..5 {
            input.push_str(&word(0));
        }
        assert!(PointerPatch::default().apply(&input).is_err());
    }
}
