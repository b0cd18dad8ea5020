use crate::FingerprintError;
use serde::Deserialize;
use sha2::{Digest, Sha256};

/// The digest primitive offered by the hosting environment.
///
/// `Unavailable` exists so deployments (and tests) can exercise the degraded
/// code paths: the JA4H derivation fails outright while composite identity
/// falls back to plain concatenation.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DigestBackend {
    #[default]
    Sha256,
    Unavailable,
}

impl DigestBackend {
    /// Full lowercase hex SHA-256 of `input`.
    pub fn hex(&self, input: &[u8]) -> Result<String, FingerprintError> {
        match self {
            DigestBackend::Sha256 => Ok(hex::encode(Sha256::digest(input))),
            DigestBackend::Unavailable => Err(FingerprintError::DigestUnavailable),
        }
    }

    /// First `len` hex characters of the SHA-256 of `input`.
    pub fn hex_prefix(&self, input: &[u8], len: usize) -> Result<String, FingerprintError> {
        let mut digest = self.hex(input)?;
        digest.truncate(len);
        Ok(digest)
    }
}
