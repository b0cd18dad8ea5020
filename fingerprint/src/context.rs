use http::header::{COOKIE, HeaderMap, REFERER};
use http::request::Parts;
use indexmap::IndexSet;
use serde::Deserialize;

/// Client address used when no trusted address header is present.
pub const UNKNOWN_ADDRESS: &str = "0.0.0.0";

/// Platform fingerprint used when the edge did not supply one.
pub const UNKNOWN_FINGERPRINT: &str = "unknown";

/// Order in which header names are fed into the JA4H header block.
///
/// Edge runtimes built on fetch `Headers` enumerate names sorted, so JA4H
/// values computed there only match under [`HeaderOrder::Sorted`].
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HeaderOrder {
    /// Order in which the headers arrived on the wire.
    #[default]
    Received,
    /// Lexicographic order, the way fetch-style `Headers` objects enumerate.
    Sorted,
}

fn default_client_address_headers() -> Vec<String> {
    vec!["cf-connecting-ip".into(), "x-real-ip".into()]
}

/// Controls how a [`RequestContext`] is extracted from a request.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ContextOptions {
    /// Trusted headers carrying the client address, first present wins.
    #[serde(default = "default_client_address_headers")]
    pub client_address_headers: Vec<String>,
    /// Header the fronting edge uses to pass a pre-computed TLS fingerprint.
    #[serde(default)]
    pub platform_fingerprint_header: Option<String>,
    #[serde(default)]
    pub header_order: HeaderOrder,
}

impl Default for ContextOptions {
    fn default() -> Self {
        ContextOptions {
            client_address_headers: default_client_address_headers(),
            platform_fingerprint_header: None,
            header_order: HeaderOrder::default(),
        }
    }
}

/// Identity-relevant facts about a request, taken from the transport layer
/// rather than from the client payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestContext {
    pub method: String,
    /// Lowercase header names, each once, without `cookie` and `referer`.
    pub header_names: IndexSet<String>,
    /// Raw cookie bytes, possibly non-ASCII. Empty when absent.
    pub cookie_raw: Vec<u8>,
    pub client_address: String,
    pub platform_fingerprint: String,
}

impl RequestContext {
    pub fn from_parts(parts: &Parts, options: &ContextOptions) -> Self {
        let headers = &parts.headers;

        let mut header_names: IndexSet<String> = headers
            .keys()
            .filter(|name| **name != COOKIE && **name != REFERER)
            .map(|name| name.as_str().to_owned())
            .collect();
        if options.header_order == HeaderOrder::Sorted {
            header_names.sort_unstable();
        }

        let cookie_raw = cookie_bytes(headers);

        let client_address = options
            .client_address_headers
            .iter()
            .find_map(|name| header_str(headers, name).filter(|v| !v.is_empty()))
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_owned());

        let platform_fingerprint = options
            .platform_fingerprint_header
            .as_deref()
            .and_then(|name| header_str(headers, name))
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN_FINGERPRINT.to_owned());

        RequestContext {
            method: parts.method.as_str().to_owned(),
            header_names,
            cookie_raw,
            client_address,
            platform_fingerprint,
        }
    }
}

// h2 splits one cookie jar over several fields; rejoin them with "; " so the
// bytes match the single h1 header.
fn cookie_bytes(headers: &HeaderMap) -> Vec<u8> {
    let mut raw = Vec::new();
    for value in headers.get_all(COOKIE) {
        let value = value.as_bytes().trim_ascii();
        if value.is_empty() {
            continue;
        }
        if !raw.is_empty() {
            raw.extend_from_slice(b"; ");
        }
        raw.extend_from_slice(value);
    }
    raw
}

// Repeated headers are joined the way fetch `Headers::get` combines them.
fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().method("POST").uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_header_names() {
        let parts = parts(&[
            ("Host", "example.com"),
            ("User-Agent", "test"),
            ("Cookie", "a=1"),
            ("Accept", "*/*"),
            ("Referer", "https://example.com/"),
            ("accept", "text/html"),
        ]);
        let ctx = RequestContext::from_parts(&parts, &ContextOptions::default());

        let names: Vec<&str> = ctx.header_names.iter().map(String::as_str).collect();
        assert_eq!(names, ["host", "user-agent", "accept"]);
        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.cookie_raw, b"a=1");
    }

    #[test]
    fn test_sorted_header_order() {
        let parts = parts(&[("x-b", "1"), ("host", "h"), ("accept", "*/*")]);
        let options = ContextOptions {
            header_order: HeaderOrder::Sorted,
            ..Default::default()
        };
        let ctx = RequestContext::from_parts(&parts, &options);

        let names: Vec<&str> = ctx.header_names.iter().map(String::as_str).collect();
        assert_eq!(names, ["accept", "host", "x-b"]);
    }

    #[test]
    fn test_client_address() {
        let options = ContextOptions::default();

        let ctx = RequestContext::from_parts(
            &parts(&[("x-real-ip", "10.0.0.1"), ("CF-Connecting-IP", "203.0.113.42")]),
            &options,
        );
        assert_eq!(ctx.client_address, "203.0.113.42");

        let ctx = RequestContext::from_parts(&parts(&[("x-real-ip", " 10.0.0.1 ")]), &options);
        assert_eq!(ctx.client_address, "10.0.0.1");

        // Empty values do not shadow the next header
        let ctx = RequestContext::from_parts(
            &parts(&[("cf-connecting-ip", ""), ("x-real-ip", "10.0.0.1")]),
            &options,
        );
        assert_eq!(ctx.client_address, "10.0.0.1");

        let ctx = RequestContext::from_parts(&parts(&[("host", "h")]), &options);
        assert_eq!(ctx.client_address, UNKNOWN_ADDRESS);
    }

    #[test]
    fn test_platform_fingerprint() {
        let headers = [("cf-ja4", "t13d1516h2_8daaf6152771_b186095e22b6")];

        let ctx = RequestContext::from_parts(&parts(&headers), &ContextOptions::default());
        assert_eq!(ctx.platform_fingerprint, UNKNOWN_FINGERPRINT);

        let options = ContextOptions {
            platform_fingerprint_header: Some("cf-ja4".into()),
            ..Default::default()
        };
        let ctx = RequestContext::from_parts(&parts(&headers), &options);
        assert_eq!(
            ctx.platform_fingerprint,
            "t13d1516h2_8daaf6152771_b186095e22b6"
        );
    }

    #[test]
    fn test_split_cookie_rejoined() {
        let h1 = RequestContext::from_parts(
            &parts(&[("cookie", "a=1; b=2")]),
            &ContextOptions::default(),
        );
        let h2 = RequestContext::from_parts(
            &parts(&[("cookie", "a=1"), ("cookie", "b=2")]),
            &ContextOptions::default(),
        );
        assert_eq!(h2.cookie_raw, b"a=1; b=2");
        assert_eq!(h1.cookie_raw, h2.cookie_raw);
    }

    #[test]
    fn test_missing_cookie() {
        let ctx = RequestContext::from_parts(&parts(&[]), &ContextOptions::default());
        assert!(ctx.cookie_raw.is_empty());
        assert!(ctx.header_names.is_empty());
    }
}
