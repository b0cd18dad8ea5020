use crate::config::CorsConfig;
use crate::config::ValidationError;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    ACCESS_CONTROL_MAX_AGE, HeaderValue,
};
use hyper::{Response, StatusCode};
use shared::http::make_empty_response;

pub const ALLOWED_METHODS: &str = "POST, OPTIONS";

/// Pre-flight headers, parsed once at startup.
#[derive(Clone, Debug)]
pub struct Cors {
    allow_origin: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
}

impl TryFrom<&CorsConfig> for Cors {
    type Error = ValidationError;

    fn try_from(config: &CorsConfig) -> Result<Self, Self::Error> {
        let parse = |field, value: &str| {
            HeaderValue::from_str(value).map_err(|_| ValidationError::InvalidHeaderValue {
                field,
                value: value.to_owned(),
            })
        };

        Ok(Cors {
            allow_origin: parse("cors.allow_origin", &config.allow_origin)?,
            allow_headers: parse("cors.allow_headers", &config.allow_headers)?,
            max_age: HeaderValue::from(config.max_age_secs),
        })
    }
}

impl Cors {
    pub fn preflight<E: 'static>(&self) -> Response<BoxBody<Bytes, E>> {
        let mut response = make_empty_response(StatusCode::NO_CONTENT);
        let headers = response.headers_mut();
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        response
    }
}
