//! crates/fd_io/src/hasher.rs
//!
//! Deterministic hashing and id builders.
//!
//! - Use `sha256_canonical(..)` for serializable values (goes through canonical JSON).
//! - Use `sha256_hex(..)` for raw bytes (scenario files are fingerprinted as read).
//! - Hex digests are lowercase, 64 chars.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::to_canonical_bytes;
use crate::{IoError, IoResult};

/// Prefix of recorded-result ids.
pub const RES_PREFIX: &str = "RES:";

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// SHA-256 over the canonical JSON bytes of `value`.
pub fn sha256_canonical<T: Serialize + ?Sized>(value: &T) -> IoResult<String> {
    Ok(sha256_hex(&to_canonical_bytes(value)?))
}

/// `RES:<hex64>` derived from canonical bytes.
pub fn res_id_from_canonical<T: Serialize + ?Sized>(value: &T) -> IoResult<String> {
    Ok(format!("{RES_PREFIX}{}", sha256_canonical(value)?))
}

/// Checks the `RES:<hex64>` shape (lowercase hex).
pub fn check_res_id(id: &str) -> IoResult<()> {
    let hex = id
        .strip_prefix(RES_PREFIX)
        .ok_or_else(|| IoError::Hash(format!("missing {RES_PREFIX} prefix: {id}")))?;
    if hex.len() != 64 || !hex.bytes().all(|c| matches!(c, b'0'..=b'9' | b'a'..=b'f')) {
        return Err(IoError::Hash(format!("expected lowercase 64-hex: {id}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_input_digest() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn key_order_does_not_change_the_id() {
        let a = json!({"b": 1, "a": [1.5, 2.0]});
        let b = json!({"a": [1.5, 2.0], "b": 1});
        let id = res_id_from_canonical(&a).unwrap();
        assert_eq!(id, res_id_from_canonical(&b).unwrap());
        assert!(check_res_id(&id).is_ok());
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(check_res_id("RES:abc").is_err());
        assert!(check_res_id(&format!("FR:{}", "0".repeat(64))).is_err());
        assert!(check_res_id(&format!("RES:{}", "A".repeat(64))).is_err());
    }
}
