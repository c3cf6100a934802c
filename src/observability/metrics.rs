use anyhow::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::info;
use std::sync::Arc;
use tokio::sync::OnceCell;


// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE.get_or_init(|| async {
        info!("Initializing Metrics ...");
        Metrics::new()}
    ).await
}

/// Prometheus text exposition of everything recorded so far
pub async fn encode_text() -> Result<String> {
    let metrics = get_metrics().await;
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&metrics.registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}


#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Transport metrics
    pub api_requests: IntCounterVec,
    pub api_request_duration: HistogramVec,
    pub transport_failures: IntCounterVec,

    // Refresh metrics
    pub refresh_exchanges: IntCounterVec,
    pub refresh_retries: IntCounterVec,

    // Cache metrics
    pub cache_lookups: IntCounterVec,
    pub cache_invalidations: IntCounterVec,

    // Session
    pub session_events: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("civilens".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Transport
            api_requests: IntCounterVec::new(Opts::new("api_requests_total", "Backend requests by method and status"),&["method", "status"],).unwrap(),
            api_request_duration: HistogramVec::new(HistogramOpts::new("api_request_duration_seconds", "Backend request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),&["method"],).unwrap(),
            transport_failures: IntCounterVec::new(Opts::new("transport_failures_total", "Requests that never produced a usable response"),&["reason"],).unwrap(),

            // Refresh
            refresh_exchanges: IntCounterVec::new(Opts::new("refresh_exchanges_total", "Refresh token exchanges by outcome"),&["outcome"],).unwrap(),
            refresh_retries: IntCounterVec::new(Opts::new("refresh_retries_total", "Requests re-issued after a refresh, by outcome"),&["outcome"],).unwrap(),

            // Cache
            cache_lookups: IntCounterVec::new(Opts::new("cache_lookups_total", "Query cache lookups"),&["group", "result"],).unwrap(),
            cache_invalidations: IntCounterVec::new(Opts::new("cache_invalidations_total", "Cache group invalidations"),&["group", "reason"],).unwrap(),

            session_events: IntCounterVec::new(Opts::new("session_events_total", "Login, logout and expiry events"),&["event"],).unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.api_requests.clone())).unwrap();
        reg.register(Box::new(metrics.api_request_duration.clone())).unwrap();
        reg.register(Box::new(metrics.transport_failures.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_exchanges.clone())).unwrap();
        reg.register(Box::new(metrics.refresh_retries.clone())).unwrap();
        reg.register(Box::new(metrics.cache_lookups.clone())).unwrap();
        reg.register(Box::new(metrics.cache_invalidations.clone())).unwrap();
        reg.register(Box::new(metrics.session_events.clone())).unwrap();

        metrics
    }
}
