pub mod beacon;
pub mod config;
pub mod cors;
pub mod errors;
pub mod metrics_defs;
pub mod payload;
mod utils;

use crate::beacon::BeaconHandler;
use crate::cors::{ALLOWED_METHODS, Cors};
use crate::errors::IngestError;
use crate::metrics_defs::{BEACON_ACCEPTED, BEACON_REJECTED, REQUEST_DURATION, STORE_READY};
use device_store::RecordStore;
use http_body_util::combinators::BoxBody;
use hyper::body::{Body, Bytes, Incoming};
use hyper::header::{ALLOW, HeaderValue};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use shared::admin_service::AdminService;
use shared::http::{make_boxed_error_response, make_empty_response, run_http_service};
use shared::{counter, gauge, histogram};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub type HandlerBody = BoxBody<Bytes, IngestError>;

const READINESS_INTERVAL: Duration = Duration::from_secs(10);

pub async fn run(config: config::Config, store: Arc<dyn RecordStore>) -> Result<(), IngestError> {
    let ready = Arc::new(AtomicBool::new(false));
    tokio::spawn(run_readiness_probe(
        store.clone(),
        ready.clone(),
        READINESS_INTERVAL,
    ));

    let service = IngestService::new(&config, store)?;
    tracing::info!(
        policy = service.beacon.policy().as_str(),
        host = %config.listener.host,
        port = config.listener.port,
        "starting ingest service"
    );

    let ingest_task = run_http_service(&config.listener.host, config.listener.port, service);
    let admin_task = run_http_service(
        &config.admin_listener.host,
        config.admin_listener.port,
        AdminService::<_, IngestError>::new(move || ready.load(Ordering::Relaxed)),
    );

    tokio::try_join!(ingest_task, admin_task)?;
    Ok(())
}

/// Keeps `ready` in line with the store's health.
pub async fn run_readiness_probe(
    store: Arc<dyn RecordStore>,
    ready: Arc<AtomicBool>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let healthy = match store.health_check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "device store health check failed");
                false
            }
        };
        if ready.swap(healthy, Ordering::Relaxed) != healthy {
            tracing::info!(ready = healthy, "readiness changed");
        }
        gauge!(STORE_READY).set(if healthy { 1.0 } else { 0.0 });
    }
}

pub struct IngestService {
    beacon: Arc<BeaconHandler>,
    cors: Cors,
}

impl IngestService {
    pub fn new(
        config: &config::Config,
        store: Arc<dyn RecordStore>,
    ) -> Result<Self, config::ValidationError> {
        config.validate()?;
        Ok(IngestService {
            beacon: Arc::new(BeaconHandler::new(config, store)),
            cors: Cors::try_from(&config.cors)?,
        })
    }

    /// Routes a request. Every failure is turned into a response here.
    pub fn handle<B>(
        &self,
        request: Request<B>,
    ) -> impl Future<Output = Response<HandlerBody>> + Send + use<B>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let beacon = self.beacon.clone();
        let cors = self.cors.clone();
        let start = Instant::now();

        async move {
            let method = request.method().clone();
            let response = if request.uri().path() != "/" {
                make_boxed_error_response(StatusCode::NOT_FOUND)
            } else if method == Method::OPTIONS {
                cors.preflight()
            } else if method == Method::POST {
                match beacon.handle(request).await {
                    Ok(_) => {
                        counter!(BEACON_ACCEPTED, "policy" => beacon.policy().as_str())
                            .increment(1);
                        make_empty_response(StatusCode::NO_CONTENT)
                    }
                    Err(e) => error_response(e),
                }
            } else {
                let mut response = make_boxed_error_response(StatusCode::METHOD_NOT_ALLOWED);
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
                response
            };

            histogram!(
                REQUEST_DURATION,
                "method" => method.to_string(),
                "status" => response.status().as_u16().to_string()
            )
            .record(start.elapsed().as_secs_f64());
            response
        }
    }
}

fn error_response(error: IngestError) -> Response<HandlerBody> {
    let status = error.status_code();
    if status.is_server_error() {
        tracing::error!(error = %error, "failed to record beacon");
    } else {
        tracing::info!(error = %error, "rejected beacon");
    }
    counter!(BEACON_REJECTED, "reason" => error.reason()).increment(1);
    make_boxed_error_response(status)
}

impl Service<Request<Incoming>> for IngestService {
    type Response = Response<HandlerBody>;
    type Error = IngestError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let response = self.handle(req);
        Box::pin(async move { Ok(response.await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, CorsConfig, IdentityConfig, Listener};
    use async_trait::async_trait;
    use device_store::{CompositeRecord, MemoryStore, Sighting, SqliteStore, StoreError};
    use fingerprint::{ContextOptions, DigestBackend, IdentityPolicy};
    use http_body_util::{BodyExt, Full};
    use time::OffsetDateTime;
    use tokio::net::TcpListener;

    fn test_config() -> Config {
        Config {
            listener: Listener {
                host: "127.0.0.1".into(),
                port: 8787,
            },
            admin_listener: Listener {
                host: "127.0.0.1".into(),
                port: 8788,
            },
            identity: IdentityConfig {
                policy: IdentityPolicy::CoarseIp,
                digest: DigestBackend::Sha256,
            },
            client: ContextOptions::default(),
            cors: CorsConfig::default(),
            max_body_bytes: 256,
        }
    }

    fn request(
        method: &str,
        path: &str,
        headers: &[(&str, &str)],
        body: &str,
    ) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Full::new(Bytes::from(body.to_owned()))).unwrap()
    }

    async fn body_bytes(response: Response<HandlerBody>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn upsert(
            &self,
            _sighting: &Sighting,
            _seen_at: OffsetDateTime,
        ) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("database is unreachable")))
        }

        async fn get(&self, _composite_id: &str) -> Result<Option<CompositeRecord>, StoreError> {
            Ok(None)
        }

        async fn health_check(&self) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("database is unreachable")))
        }
    }

    #[tokio::test]
    async fn test_preflight() {
        let service = IngestService::new(&test_config(), Arc::new(MemoryStore::new())).unwrap();
        let response = service.handle(request("OPTIONS", "/", &[], "")).await;

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers().clone();
        assert_eq!(headers["access-control-allow-origin"], "*");
        let methods = headers["access-control-allow-methods"].to_str().unwrap();
        assert!(methods.contains("POST"));
        assert!(methods.contains("OPTIONS"));
        assert_eq!(headers["access-control-max-age"], "86400");
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_beacon_scenario() {
        let store = Arc::new(MemoryStore::new());
        let service = IngestService::new(&test_config(), store.clone()).unwrap();

        let headers = [("host", "fp.example.com"), ("user-agent", "Mozilla/5.0")];

        // The request shape alone yields a POST, two-header, cookieless JA4H
        let (parts, _) = request("POST", "/", &headers, "").into_parts();
        let ctx = fingerprint::RequestContext::from_parts(&parts, &ContextOptions::default());
        let ja4h = fingerprint::ja4h::derive(&ctx, &DigestBackend::Sha256).unwrap();
        assert!(ja4h.to_string().starts_with("p02_"));
        assert!(ja4h.to_string().ends_with("_000000000000"));

        let mut beacon = request("POST", "/", &headers, r#"{"id":"abc123"}"#);
        beacon
            .headers_mut()
            .insert("cf-connecting-ip", HeaderValue::from_static("198.51.100.7"));
        let response = service.handle(beacon).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(response).await.is_empty());

        let composite_id = DigestBackend::Sha256.hex(b"abc123|198.51.100").unwrap();
        let record = store.get(&composite_id).await.unwrap().unwrap();
        assert_eq!(record.fp_id, "abc123");
        assert_eq!(record.ip, "198.51.100.7");
        assert_eq!(record.ua, "");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_rejections() {
        let store = Arc::new(MemoryStore::new());
        let service = IngestService::new(&test_config(), store.clone()).unwrap();

        let response = service.handle(request("POST", "/", &[], "not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = service.handle(request("POST", "/", &[], r#"{"ua":"x"}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let oversized = format!(r#"{{"id":"{}"}}"#, "a".repeat(300));
        let response = service.handle(request("POST", "/", &[], &oversized)).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let response = service.handle(request("GET", "/", &[], "")).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "POST, OPTIONS");

        let response = service
            .handle(request("POST", "/collect", &[], r#"{"id":"abc123"}"#))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure() {
        let service = IngestService::new(&test_config(), Arc::new(FailingStore)).unwrap();
        let response = service
            .handle(request("POST", "/", &[], r#"{"id":"abc123"}"#))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        // Store errors are logged, not echoed to the client
        let body = body_bytes(response).await;
        assert!(!String::from_utf8_lossy(&body).contains("unreachable"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.max_body_bytes = 0;
        assert!(IngestService::new(&config, Arc::new(MemoryStore::new())).is_err());
    }

    #[tokio::test]
    async fn test_readiness_probe() {
        let ready = Arc::new(AtomicBool::new(false));
        tokio::spawn(run_readiness_probe(
            Arc::new(MemoryStore::new()),
            ready.clone(),
            Duration::from_millis(10),
        ));
        for _ in 0..50 {
            if ready.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(ready.load(Ordering::Relaxed));

        let ready = Arc::new(AtomicBool::new(true));
        tokio::spawn(run_readiness_probe(
            Arc::new(FailingStore),
            ready.clone(),
            Duration::from_millis(10),
        ));
        for _ in 0..50 {
            if !ready.load(Ordering::Relaxed) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!ready.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_end_to_end_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(SqliteStore::open(dir.path().join("devices.db")).await.unwrap());
        let service = IngestService::new(&test_config(), store.clone()).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(shared::http::serve(listener, service));

        let client = reqwest::Client::new();
        let url = format!("http://127.0.0.1:{port}/");

        let response = client
            .request(reqwest::Method::OPTIONS, &url)
            .header("origin", "https://shop.example")
            .header("access-control-request-method", "POST")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 204);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");

        // Beacons arrive as text/plain
        let send_beacon = || {
            client
                .post(&url)
                .header("content-type", "text/plain;charset=UTF-8")
                .header("x-real-ip", "203.0.113.42")
                .body(r#"{"id":"visitor-1","ua":"Mozilla/5.0","lang":"en-US","tz":"UTC"}"#)
                .send()
        };
        let response = send_beacon().await.unwrap();
        assert_eq!(response.status(), 204);
        assert!(response.bytes().await.unwrap().is_empty());

        let composite_id = DigestBackend::Sha256.hex(b"visitor-1|203.0.113").unwrap();
        let first = store.get(&composite_id).await.unwrap().unwrap();
        assert_eq!(first.fp_id, "visitor-1");
        assert_eq!(first.ip, "203.0.113.42");
        assert_eq!(first.ua, "Mozilla/5.0");
        assert_eq!(first.lang, "en-US");
        assert_eq!(first.tz, "UTC");

        tokio::time::sleep(Duration::from_millis(5)).await;
        let response = send_beacon().await.unwrap();
        assert_eq!(response.status(), 204);

        let second = store.get(&composite_id).await.unwrap().unwrap();
        assert!(second.last_seen > first.last_seen);
        assert_eq!(
            CompositeRecord {
                last_seen: first.last_seen,
                ..second
            },
            first
        );
    }
}
