use crate::config::ValidationError;
use device_store::StoreError;
use fingerprint::FingerprintError;
use hyper::StatusCode;
use thiserror::Error;

/// Errors that can occur while handling a beacon
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read request body: {0}")]
    RequestBodyError(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::RequestBodyError(_) | IngestError::MalformedPayload(_) => {
                StatusCode::BAD_REQUEST
            }
            IngestError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            IngestError::Fingerprint(_)
            | IngestError::Persistence(_)
            | IngestError::Config(_)
            | IngestError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used to tag rejection metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            IngestError::RequestBodyError(_) => "body",
            IngestError::PayloadTooLarge(_) => "too_large",
            IngestError::MalformedPayload(_) => "malformed",
            IngestError::Fingerprint(FingerprintError::DigestUnavailable) => "digest_unavailable",
            IngestError::Persistence(_) => "persistence",
            IngestError::Config(_) => "config",
            IngestError::Io(_) => "io",
        }
    }
}
