use crate::error::{EngineError, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use url::form_urlencoded;

/// Field carrying the digest. Excluded from the signing input.
pub const SIGNATURE_FIELD: &str = "signature";
/// Field carrying the shared merchant key. Excluded from the signing input.
const MERCHANT_KEY_FIELD: &str = "merchant_key";

fn encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Builds the canonical string shared by outbound signing and inbound
/// verification. Any divergence between the two paths breaks interoperability
/// with the gateway, so this is the only place the format lives.
fn canonical_string(fields: &BTreeMap<String, String>, passphrase: &str) -> Result<String> {
    if fields.is_empty() {
        return Err(EngineError::Signature(
            "cannot sign an empty field map".to_string(),
        ));
    }
    if passphrase.is_empty() {
        return Err(EngineError::Signature(
            "signing passphrase is empty".to_string(),
        ));
    }

    // BTreeMap iteration is already in lexicographic key order.
    let mut pairs = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        if key == SIGNATURE_FIELD || key == MERCHANT_KEY_FIELD {
            continue;
        }
        if value.is_empty() {
            continue;
        }
        pairs.push(format!("{}={}", key, encode(value)));
    }
    if pairs.is_empty() {
        return Err(EngineError::Signature(
            "no signable fields after filtering".to_string(),
        ));
    }

    Ok(format!("{}&passphrase={}", pairs.join("&"), encode(passphrase)))
}

/// Produces the keyed digest over the canonical form of `fields`.
pub fn sign(fields: &BTreeMap<String, String>, passphrase: &str) -> Result<String> {
    let canonical = canonical_string(fields, passphrase)?;
    let digest = Sha256::digest(canonical.as_bytes());
    Ok(hex::encode(digest))
}

/// Checks a claimed digest against the canonical form of `fields`.
///
/// The comparison is constant-time so a forger learns nothing from response
/// latency. The claimed digest is accepted in either hex case.
pub fn verify(fields: &BTreeMap<String, String>, passphrase: &str, claimed: &str) -> Result<bool> {
    let expected = sign(fields, passphrase)?;
    let claimed = claimed.to_ascii_lowercase();
    Ok(constant_time_eq(expected.as_bytes(), claimed.as_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
