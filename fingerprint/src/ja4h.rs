//! JA4H-style descriptor of an HTTP request's shape.
//!
//! The fingerprint is three underscore-joined blocks, `a_b_c`:
//! - `a`: first letter of the method (lowercase) and the number of header
//!   names, zero padded to two digits, e.g. `g07`
//! - `b`: first 12 hex characters of the SHA-256 of the header names joined with `;`
//! - `c`: first 12 hex characters of the SHA-256 of the raw cookie header, or
//!   twelve zeros when there is no cookie
//!
//! Block `b` depends on header enumeration order. See [`crate::HeaderOrder`].

use crate::FingerprintError;
use crate::context::RequestContext;
use crate::digest::DigestBackend;
use std::fmt;

const HASH_LEN: usize = 12;
const NO_COOKIE: &str = "000000000000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ja4h {
    pub a: String,
    pub b: String,
    pub c: String,
}

impl fmt::Display for Ja4h {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.a, self.b, self.c)
    }
}

pub fn derive(ctx: &RequestContext, digest: &DigestBackend) -> Result<Ja4h, FingerprintError> {
    let method_char: String = ctx
        .method
        .chars()
        .take(1)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let a = format!("{}{:02}", method_char, ctx.header_names.len());

    let header_concat = ctx
        .header_names
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(";");
    let b = digest.hex_prefix(header_concat.as_bytes(), HASH_LEN)?;

    let c = if ctx.cookie_raw.is_empty() {
        NO_COOKIE.to_owned()
    } else {
        digest.hex_prefix(&ctx.cookie_raw, HASH_LEN)?
    };

    Ok(Ja4h { a, b, c })
}
