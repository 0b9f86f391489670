//! Integrity checks for transferred media.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use sha2::Sha256;

/// Expected content hash published with a media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentHash {
    Md5(String),
    Sha256(String),
}

impl ContentHash {
    /// Pick the first usable hash among an item's hash-like fields.
    ///
    /// Only hex digests are recognized: 32 digits for MD5, 64 for SHA-256.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Option<Self> {
        fields.iter().find_map(|(key, value)| {
            let value = value.trim();
            if !value.chars().all(|c| c.is_ascii_hexdigit()) {
                return None;
            }
            let hex = value.to_ascii_lowercase();
            match hex.len() {
                32 => Some(ContentHash::Md5(hex)),
                64 => Some(ContentHash::Sha256(hex)),
                _ => {
                    tracing::debug!("Ignoring hash field '{}' of unknown length", key);
                    None
                }
            }
        })
    }

    pub fn expected_hex(&self) -> &str {
        match self {
            ContentHash::Md5(hex) | ContentHash::Sha256(hex) => hex,
        }
    }

    pub fn hasher(&self) -> ContentHasher {
        match self {
            ContentHash::Md5(_) => ContentHasher::Md5(Md5::new()),
            ContentHash::Sha256(_) => ContentHasher::Sha256(Sha256::new()),
        }
    }
}

/// Incremental digest fed while the body streams.
pub enum ContentHasher {
    Md5(Md5),
    Sha256(Sha256),
}

impl ContentHasher {
    pub fn update(&mut self, chunk: &[u8]) {
        match self {
            ContentHasher::Md5(h) => h.update(chunk),
            ContentHasher::Sha256(h) => h.update(chunk),
        }
    }

    pub fn finalize_hex(self) -> String {
        match self {
            ContentHasher::Md5(h) => format!("{:x}", h.finalize()),
            ContentHasher::Sha256(h) => format!("{:x}", h.finalize()),
        }
    }
}

/// What a finished transfer is checked against.
#[derive(Debug, Clone, Default)]
pub struct TransferExpectation {
    pub hash: Option<ContentHash>,
    /// `Content-Length` of the transfer response.
    pub transport_length: Option<u64>,
    /// Size announced in the feed. Informational only.
    pub declared_size: Option<u64>,
}

/// Check a finished transfer.
///
/// The strongest available evidence wins: a published hash, then the transport length.
/// A declared-size mismatch never fails the transfer, it is returned as a warning.
pub fn verify_transfer(
    expected: &TransferExpectation,
    written: u64,
    digest: Option<String>,
) -> std::result::Result<Option<String>, String> {
    match (&expected.hash, digest) {
        (Some(hash), Some(actual)) if hash.expected_hex() != actual => {
            return Err(format!(
                "hash mismatch: expected {}, got {}",
                hash.expected_hex(),
                actual
            ));
        }
        (Some(_), Some(_)) => {}
        _ => {
            if let Some(length) = expected.transport_length.filter(|&l| l != written) {
                return Err(format!(
                    "size mismatch: expected {} bytes, got {}",
                    length, written
                ));
            }
        }
    }

    match expected.declared_size {
        Some(declared) if declared != written => Ok(Some(format!(
            "declared size {} differs from received {} bytes",
            declared, written
        ))),
        _ => Ok(None),
    }
}

/// Whether a file of `actual` bytes is a truncated copy of an `expected`-byte original.
pub fn is_incomplete(actual: u64, expected: u64, threshold: f64) -> bool {
    (actual as f64) < (expected as f64) * threshold
}
