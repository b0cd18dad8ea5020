//! Handling of a single fingerprint beacon: derive the identity from the
//! request, then record the sighting.

use crate::config::Config;
use crate::errors::IngestError;
use crate::payload::InboundPayload;
use crate::utils::read_body;
use device_store::{RecordStore, Sighting};
use fingerprint::{ContextOptions, DigestBackend, IdentityPolicy, RequestContext, identity};
use hyper::Request;
use hyper::body::{Body, Bytes};
use std::sync::Arc;
use time::OffsetDateTime;

pub struct BeaconHandler {
    policy: IdentityPolicy,
    digest: DigestBackend,
    context_options: ContextOptions,
    max_body_bytes: usize,
    store: Arc<dyn RecordStore>,
}

impl BeaconHandler {
    pub fn new(config: &Config, store: Arc<dyn RecordStore>) -> Self {
        BeaconHandler {
            policy: config.identity.policy,
            digest: config.identity.digest,
            context_options: config.client.clone(),
            max_body_bytes: config.max_body_bytes,
            store,
        }
    }

    pub fn policy(&self) -> IdentityPolicy {
        self.policy
    }

    /// Returns the composite id the sighting was stored under.
    pub async fn handle<B>(&self, request: Request<B>) -> Result<String, IngestError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = request.into_parts();
        let ctx = RequestContext::from_parts(&parts, &self.context_options);

        let body = read_body(body, self.max_body_bytes).await?;
        let payload = InboundPayload::parse(&body)?;

        let composite_id = identity::build(self.policy, &ctx, &payload.id, &self.digest)?;

        let sighting = Sighting {
            composite_id: composite_id.into_string(),
            fp_id: payload.id.clone(),
            ip: ctx.client_address,
            ua: payload.user_agent().to_owned(),
            lang: payload.language().to_owned(),
            tz: payload.timezone().to_owned(),
        };
        self.store
            .upsert(&sighting, OffsetDateTime::now_utc())
            .await?;

        tracing::debug!(
            composite_id = %sighting.composite_id,
            fp_id = %sighting.fp_id,
            policy = self.policy.as_str(),
            "recorded sighting"
        );
        Ok(sighting.composite_id)
    }
}
