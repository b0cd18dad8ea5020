//! Request fingerprinting and composite identity derivation.
//!
//! Everything in this crate is a pure function of its inputs. Values that an
//! edge platform would normally inject implicitly (trusted proxy headers, a
//! TLS fingerprint) are extracted once into a [`RequestContext`] and threaded
//! through explicitly.

pub mod address;
pub mod context;
pub mod digest;
pub mod identity;
pub mod ja4h;

pub use context::{ContextOptions, HeaderOrder, RequestContext};
pub use digest::DigestBackend;
pub use identity::{CompositeId, IdentityPolicy};
pub use ja4h::Ja4h;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("no secure digest primitive is available")]
    DigestUnavailable,
}
