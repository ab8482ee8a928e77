//! Content fingerprints.
//!
//! A fingerprint is the SHA-1 digest of a file's bytes. It is the identity of
//! a stored file: two uploads with the same fingerprint are the same content.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};

use crate::{FilestoreError, Result};

/// Length of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 20;

/// Length of the hex text form.
pub const FINGERPRINT_HEX_LEN: usize = FINGERPRINT_LEN * 2;

/// 160-bit content fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Fingerprint a complete buffer.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Self::hasher();
        hasher.update(data);
        hasher.finalize()
    }

    /// Start an incremental fingerprint.
    pub fn hasher() -> FingerprintHasher {
        FingerprintHasher::new()
    }

    /// Parse the 40-character hex form. Upper-case digits are accepted.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.len() != FINGERPRINT_HEX_LEN {
            return Err(FilestoreError::Validation(format!(
                "fingerprint must be {FINGERPRINT_HEX_LEN} hex characters"
            )));
        }

        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|_| FilestoreError::Validation("fingerprint is not valid hex".to_string()))?;

        Ok(Self(bytes))
    }

    /// Lowercase hex form, as stored in the database.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = FilestoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental fingerprint over a byte stream.
#[derive(Clone, Default)]
pub struct FingerprintHasher {
    inner: Sha1,
    bytes_hashed: u64,
}

impl FingerprintHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the stream.
    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.bytes_hashed += chunk.len() as u64;
    }

    /// Total bytes fed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    pub fn finalize(self) -> Fingerprint {
        Fingerprint(self.inner.finalize().into())
    }
}
