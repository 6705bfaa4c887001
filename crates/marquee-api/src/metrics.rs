//! Prometheus metrics for authentication traffic
//!
//! Collectors live in a dedicated registry so tests and embedders never
//! collide with the process-wide default one.
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthErrorKind;
use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

struct Collectors {
    registry: Registry,
    login_total: IntCounterVec,
    logout_total: IntCounterVec,
    token_rejections_total: IntCounterVec,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
}

impl Collectors {
    fn new() -> prometheus::Result<Self> {
        let registry = Registry::new_custom(Some("marquee".to_string()), None)?;

        let login_total = IntCounterVec::new(
            Opts::new("login_total", "Login attempts by outcome"),
            &["outcome"],
        )?;
        let logout_total = IntCounterVec::new(
            Opts::new("logout_total", "Logout attempts by outcome"),
            &["outcome"],
        )?;
        let token_rejections_total = IntCounterVec::new(
            Opts::new(
                "token_rejections_total",
                "Requests rejected by the authentication middleware",
            ),
            &["reason"],
        )?;
        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "HTTP requests by endpoint and status"),
            &["endpoint", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(exponential_buckets(0.001, 2.0, 14)?),
            &["endpoint"],
        )?;

        registry.register(Box::new(login_total.clone()))?;
        registry.register(Box::new(logout_total.clone()))?;
        registry.register(Box::new(token_rejections_total.clone()))?;
        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry,
            login_total,
            logout_total,
            token_rejections_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }
}

lazy_static! {
    static ref COLLECTORS: Option<Collectors> = match Collectors::new() {
        Ok(collectors) => Some(collectors),
        Err(e) => {
            tracing::error!(error = %e, "Failed to register metrics, recording disabled");
            None
        }
    };
}

/// Outcome label shared by the login and logout counters
pub fn outcome_label(result: Result<(), AuthErrorKind>) -> &'static str {
    match result {
        Ok(()) => "success",
        Err(kind) => kind.code(),
    }
}

pub fn record_login(result: Result<(), AuthErrorKind>) {
    if let Some(c) = COLLECTORS.as_ref() {
        c.login_total
            .with_label_values(&[outcome_label(result)])
            .inc();
    }
}

pub fn record_logout(result: Result<(), AuthErrorKind>) {
    if let Some(c) = COLLECTORS.as_ref() {
        c.logout_total
            .with_label_values(&[outcome_label(result)])
            .inc();
    }
}

pub fn record_token_rejection(kind: AuthErrorKind) {
    if let Some(c) = COLLECTORS.as_ref() {
        c.token_rejections_total
            .with_label_values(&[kind.code()])
            .inc();
    }
}

pub fn record_request(endpoint: &str, status: u16, elapsed_secs: f64) {
    if let Some(c) = COLLECTORS.as_ref() {
        let status = status.to_string();
        c.http_requests_total
            .with_label_values(&[endpoint, status.as_str()])
            .inc();
        c.http_request_duration_seconds
            .with_label_values(&[endpoint])
            .observe(elapsed_secs);
    }
}

/// Render every collector in the Prometheus text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let Some(c) = COLLECTORS.as_ref() else {
        return Ok(String::new());
    };

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&c.registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
