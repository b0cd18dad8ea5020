use crate::errors::IngestError;
use serde::Deserialize;

/// Beacon body sent by the browser snippet: `{id, ua?, lang?, tz?}`.
///
/// Nothing here is trusted. Unknown fields are ignored.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct InboundPayload {
    pub id: String,
    #[serde(default)]
    pub ua: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub tz: Option<String>,
}

impl InboundPayload {
    /// Parses a beacon body. Beacons are usually sent as `text/plain`, so the
    /// content type is not checked.
    pub fn parse(body: &[u8]) -> Result<Self, IngestError> {
        let payload: InboundPayload = serde_json::from_slice(body)
            .map_err(|e| IngestError::MalformedPayload(e.to_string()))?;

        if payload.id.trim().is_empty() {
            return Err(IngestError::MalformedPayload("empty id".into()));
        }

        Ok(payload)
    }

    pub fn user_agent(&self) -> &str {
        self.ua.as_deref().unwrap_or_default()
    }

    pub fn language(&self) -> &str {
        self.lang.as_deref().unwrap_or_default()
    }

    pub fn timezone(&self) -> &str {
        self.tz.as_deref().unwrap_or_default()
    }
}
