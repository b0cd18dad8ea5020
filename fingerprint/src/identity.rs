use crate::FingerprintError;
use crate::address::coarsen;
use crate::context::RequestContext;
use crate::digest::DigestBackend;
use crate::ja4h;
use serde::Deserialize;
use std::fmt;

/// Which signals make up the composite identity.
///
/// The two policies produce unrelated keys for the same visitor, so a
/// deployment has to stick with one.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// Platform TLS fingerprint and the request's JA4H.
    Network,
    /// Client supplied fingerprint id and the coarsened client address.
    #[default]
    CoarseIp,
}

impl IdentityPolicy {
    pub const fn as_str(&self) -> &'static str {
        match self {
            IdentityPolicy::Network => "network",
            IdentityPolicy::CoarseIp => "coarse_ip",
        }
    }
}

/// Primary key of a stored device record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompositeId(String);

impl CompositeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes `inputs` joined with `|` into a full hex SHA-256.
///
/// Without a digest primitive the raw inputs are joined with `-` instead.
/// That key is neither fixed-length nor collision resistant.
pub fn composite_id(inputs: &[&str], digest: &DigestBackend) -> CompositeId {
    match digest.hex(inputs.join("|").as_bytes()) {
        Ok(hex) => CompositeId(hex),
        Err(FingerprintError::DigestUnavailable) => {
            tracing::warn!("digest unavailable, using concatenated composite id");
            CompositeId(inputs.join("-"))
        }
    }
}

/// Builds the composite identity for a request under `policy`.
///
/// Only the network policy derives the JA4H, so only it can fail.
pub fn build(
    policy: IdentityPolicy,
    ctx: &RequestContext,
    fingerprint_id: &str,
    digest: &DigestBackend,
) -> Result<CompositeId, FingerprintError> {
    match policy {
        IdentityPolicy::Network => {
            let ja4h = ja4h::derive(ctx, digest)?.to_string();
            tracing::debug!(ja4h = %ja4h, ja4 = %ctx.platform_fingerprint, "derived network identity");
            Ok(composite_id(&[ctx.platform_fingerprint.as_str(), ja4h.as_str()], digest))
        }
        IdentityPolicy::CoarseIp => {
            let network = coarsen(&ctx.client_address);
            Ok(composite_id(&[fingerprint_id, network.as_str()], digest))
        }
    }
}
