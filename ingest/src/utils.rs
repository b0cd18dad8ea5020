use crate::errors::IngestError;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};

/// Collects a request body, refusing anything larger than `limit` bytes.
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, IngestError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(IngestError::PayloadTooLarge(limit)),
        Err(e) => Err(IngestError::RequestBodyError(e.to_string())),
    }
}
